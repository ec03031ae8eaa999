//! Where the three CSV tables come from.
//!
//! The cache only sees the [`CsvSource`] trait. [`ConfiguredSource`] is the
//! production implementation: each table is either a local file or a
//! SharePoint/OneDrive link.

pub mod sharepoint;

use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::config::DirectoryConfig;
use crate::error::{ConfigError, SourceError, SourceResult};
use crate::models::SourceKind;
use crate::parser::decode_bytes;

/// Credentials forwarded to remote sources.
///
/// Opaque to the cache: it is handed to [`CsvSource::fetch`] untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    cookie: Option<String>,
}

impl AuthContext {
    /// Wrap a browser `Cookie` header. Blank headers carry no credentials.
    pub fn from_cookie_header(cookie: Option<&str>) -> Option<Self> {
        cookie
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| Self {
                cookie: Some(c.to_string()),
            })
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }
}

/// A provider of raw CSV text for each table.
pub trait CsvSource: Send + Sync {
    /// Read or download the CSV for `kind`.
    ///
    /// Must return [`SourceError::AuthRequired`] when a remote source wants
    /// an interactive sign-in.
    fn fetch<'a>(
        &'a self,
        kind: SourceKind,
        auth: Option<&'a AuthContext>,
    ) -> BoxFuture<'a, SourceResult<String>>;

    /// Last modification time, for sources that have one (local files).
    fn modified<'a>(&'a self, _kind: SourceKind) -> BoxFuture<'a, Option<SystemTime>> {
        async { None }.boxed()
    }

    /// Human-readable location, for logs.
    fn describe(&self, kind: SourceKind) -> String {
        kind.to_string()
    }
}

/// Where one table lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    Url(String),
}

/// Production source: per-table local file or remote link.
pub struct ConfiguredSource {
    locations: [Location; 3],
    client: reqwest::Client,
}

impl ConfiguredSource {
    /// Resolve each table's location from configuration.
    ///
    /// Tables with a configured URL are downloaded; the rest are read from
    /// the data directory.
    pub fn from_config(config: &DirectoryConfig) -> Result<Self, ConfigError> {
        let locations = SourceKind::ALL.map(|kind| match config.remote_url(kind) {
            Some(url) => Location::Url(url.to_string()),
            None => Location::File(config.data_dir.join(kind.file_name())),
        });
        Self::new(locations, config.fetch_timeout)
    }

    /// Build from explicit locations, ordered as [`SourceKind::ALL`].
    pub fn new(locations: [Location; 3], timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { locations, client })
    }

    /// Read every table from `dir`.
    pub fn local(dir: &Path) -> Result<Self, ConfigError> {
        let locations = SourceKind::ALL.map(|kind| Location::File(dir.join(kind.file_name())));
        Self::new(locations, Duration::from_secs(30))
    }

    pub fn location(&self, kind: SourceKind) -> &Location {
        &self.locations[kind.index()]
    }
}

impl CsvSource for ConfiguredSource {
    fn fetch<'a>(
        &'a self,
        kind: SourceKind,
        auth: Option<&'a AuthContext>,
    ) -> BoxFuture<'a, SourceResult<String>> {
        async move {
            match self.location(kind) {
                Location::File(path) => read_file(path, kind).await,
                Location::Url(url) => sharepoint::fetch_csv(&self.client, url, kind, auth).await,
            }
        }
        .boxed()
    }

    fn modified<'a>(&'a self, kind: SourceKind) -> BoxFuture<'a, Option<SystemTime>> {
        async move {
            match self.location(kind) {
                Location::File(path) => tokio::fs::metadata(path)
                    .await
                    .and_then(|m| m.modified())
                    .ok(),
                Location::Url(_) => None,
            }
        }
        .boxed()
    }

    fn describe(&self, kind: SourceKind) -> String {
        match self.location(kind) {
            Location::File(path) => path.display().to_string(),
            Location::Url(_) => format!("{} (remote)", kind),
        }
    }
}

async fn read_file(path: &Path, kind: SourceKind) -> SourceResult<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| SourceError::unavailable(kind, format!("{}: {}", path.display(), e)))?;
    Ok(decode_bytes(&bytes))
}
