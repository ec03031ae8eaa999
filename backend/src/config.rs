//! Runtime configuration.
//!
//! Read from the environment (after loading `.env` if present). CLI flags
//! override individual values in `main.rs`.
//!
//! | Variable                         | Default                               |
//! |----------------------------------|---------------------------------------|
//! | `DATA_DIR`                       | `Data`                                |
//! | `ONEDRIVE_EMPLOYEES_URL`         | unset (read `employees.csv`)          |
//! | `ONEDRIVE_PROJECTS_URL`          | unset (read `projects.csv`)           |
//! | `ONEDRIVE_PROJECT_EMPLOYEES_URL` | unset (read `project_employees.csv`)  |
//! | `OPENASSET_BASE_URL`             | `https://perkinseastman.openasset.com` |
//! | `CSV_FETCH_TIMEOUT_SECS`         | `30`                                  |
//! | `PORT`                           | `3000`                                |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::SourceKind;

pub const DEFAULT_DATA_DIR: &str = "Data";
pub const DEFAULT_OPENASSET_BASE_URL: &str = "https://perkinseastman.openasset.com";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PORT: u16 = 3000;

/// Directory service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryConfig {
    /// Folder holding the local CSV files.
    pub data_dir: PathBuf,
    pub employees_url: Option<String>,
    pub projects_url: Option<String>,
    pub assignments_url: Option<String>,
    /// Base for project links when the CSV has no `openasset_url`.
    pub openasset_base_url: String,
    /// Per-request timeout for remote CSV downloads.
    pub fetch_timeout: Duration,
    pub port: u16,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            employees_url: None,
            projects_url: None,
            assignments_url: None,
            openasset_base_url: DEFAULT_OPENASSET_BASE_URL.to_string(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            port: DEFAULT_PORT,
        }
    }
}

impl DirectoryConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let fetch_timeout = match get("CSV_FETCH_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(v.parse().map_err(|_| ConfigError::InvalidValue {
                name: "CSV_FETCH_TIMEOUT_SECS",
                value: v.clone(),
            })?),
            None => defaults.fetch_timeout,
        };

        let port = match get("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                value: v.clone(),
            })?,
            None => defaults.port,
        };

        Ok(Self {
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            employees_url: get("ONEDRIVE_EMPLOYEES_URL"),
            projects_url: get("ONEDRIVE_PROJECTS_URL"),
            assignments_url: get("ONEDRIVE_PROJECT_EMPLOYEES_URL"),
            openasset_base_url: get("OPENASSET_BASE_URL").unwrap_or(defaults.openasset_base_url),
            fetch_timeout,
            port,
        })
    }

    /// Remote link configured for `kind`, if any.
    pub fn remote_url(&self, kind: SourceKind) -> Option<&str> {
        match kind {
            SourceKind::Employees => self.employees_url.as_deref(),
            SourceKind::Projects => self.projects_url.as_deref(),
            SourceKind::Assignments => self.assignments_url.as_deref(),
        }
    }

    /// True if at least one table is downloaded instead of read from disk.
    pub fn uses_remote(&self) -> bool {
        SourceKind::ALL.iter().any(|k| self.remote_url(*k).is_some())
    }
}
