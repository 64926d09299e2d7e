//! Warehouse load service abstraction.
//!
//! A [`WarehouseService`] accepts one [`LoadRequest`] at a time and hands back
//! a [`LoadJob`] the caller waits on. The BigQuery implementation talks to the
//! jobs REST API; the dry-run implementation only logs.

mod auth;
mod bigquery;
mod dry_run;

pub use auth::TokenSource;
pub use bigquery::BigQueryWarehouse;
pub use dry_run::DryRunWarehouse;

use async_trait::async_trait;
use std::fmt;

use crate::error::WarehouseError;
use crate::listing::StorageObjectRef;

/// Fully qualified destination table (`project.dataset.table`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// Format of the source files handed to the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Parquet,
}

impl SourceFormat {
    /// BigQuery `sourceFormat` label.
    pub fn as_bigquery(&self) -> &'static str {
        match self {
            SourceFormat::Parquet => "PARQUET",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_bigquery())
    }
}

/// One object to load into one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub source: StorageObjectRef,
    pub destination: TableRef,
    pub format: SourceFormat,
}

impl LoadRequest {
    /// A Parquet load of `source` into `destination`.
    pub fn parquet(source: StorageObjectRef, destination: TableRef) -> Self {
        Self {
            source,
            destination,
            format: SourceFormat::Parquet,
        }
    }
}

/// A warehouse that accepts bulk load requests.
#[async_trait]
pub trait WarehouseService: Send + Sync {
    /// Submit a load. Returns once the service has accepted the job, not
    /// when it has finished.
    async fn submit_load(&self, request: &LoadRequest) -> Result<Box<dyn LoadJob>, WarehouseError>;

    /// Service name for logging.
    fn name(&self) -> &str;
}

/// Handle to a submitted load.
#[async_trait]
pub trait LoadJob: Send {
    /// Service-assigned job identifier.
    fn id(&self) -> &str;

    /// Block until the job finishes. `Ok` means the data was loaded.
    async fn wait(&mut self) -> Result<(), WarehouseError>;
}
