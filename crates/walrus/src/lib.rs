//! walrus: loads Parquet files from object storage into warehouse tables.
//!
//! This crate handles:
//! - Listing objects under a prefix and filtering them by extension
//! - Submitting one warehouse load job per object, strictly in sequence
//! - Running the configured table loads and reporting failures per table

pub mod cli;
pub mod config;
pub mod error;
pub mod listing;
pub mod loader;
pub mod metrics;
pub mod run;
pub mod warehouse;

// Re-export commonly used items
pub use config::Config;
pub use error::{LoadError, RunError, WarehouseError};
pub use listing::{ObjectLister, StorageObjectRef, has_extension, list_matching_objects};
pub use loader::{LoadReport, SOURCE_EXTENSION, WarehouseLoader};
pub use run::{LoadRun, TablePlan};
pub use warehouse::{LoadJob, LoadRequest, SourceFormat, TableRef, WarehouseService};

// Re-export from walrus-core
pub use walrus_core::{StorageProvider, init_tracing};
