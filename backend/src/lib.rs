//! # Directory - searchable employee directory over CSV exports
//!
//! Three CSV tables (employees, projects, project/employee links) are read
//! from disk or from SharePoint/OneDrive links, cached in memory and
//! queried with multi-criteria filters. Results can be exported as CSV.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV source │────▶│   Parser    │────▶│    Cache    │────▶│ Query/Export│
//! │ (file/link) │     │  (auto-enc) │     │(single load)│     │ (filters)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use directory::{ConfiguredSource, DirectoryCache, EmployeeFilter};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = ConfiguredSource::local("Data".as_ref()).unwrap();
//!     let cache = DirectoryCache::new(Arc::new(source), "https://example.openasset.com");
//!     cache.ensure_loaded(None).await.unwrap();
//!     let found = cache.snapshot().search(&EmployeeFilter::default());
//!     println!("{} employees", found.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per concern
//! - [`models`] - Employee, Project, Assignment
//! - [`config`] - Environment configuration
//! - [`parser`] - CSV decoding and table mapping
//! - [`source`] - Local file / SharePoint CSV sources
//! - [`cache`] - Single-flight directory cache
//! - [`query`] - Filters, join and listings
//! - [`export`] - Spreadsheet rows and CSV writer
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Ingestion
pub mod parser;
pub mod source;

// Caching
pub mod cache;

// Querying
pub mod export;
pub mod query;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{
    ConfigError, LoadError, LoadResult, ServerError, ServerResult, SourceError, SourceResult,
};

// =============================================================================
// Re-exports - Models & configuration
// =============================================================================

pub use config::DirectoryConfig;
pub use models::{Assignment, Employee, Project, SourceKind};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{decode_bytes, detect_delimiter, parse_csv, CsvError, ParseResult, Record};

// =============================================================================
// Re-exports - Sources & cache
// =============================================================================

pub use cache::{DirectoryCache, DirectorySnapshot};
pub use source::{AuthContext, ConfiguredSource, CsvSource, Location};

// =============================================================================
// Re-exports - Query & export
// =============================================================================

pub use export::{export_filename, project_for_export, write_csv, ExportRow, EXPORT_COLUMNS};
pub use query::{sort_by_name, EmployeeFilter, ProjectFilter, YearsRange};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{EmployeeView, ProjectParams, ProjectView, SearchParams};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
