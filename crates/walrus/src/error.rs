//! Error types for the warehouse loader.

use snafu::prelude::*;

// Re-export common errors
pub use walrus_core::error::{ConfigError, MetricsError, StorageError};

/// Errors raised by a warehouse load service.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WarehouseError {
    /// The HTTP request itself failed (connect, TLS, body decode).
    #[snafu(display("BigQuery {operation} request failed: {source}"))]
    Http {
        operation: &'static str,
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[snafu(display("BigQuery {operation} returned HTTP {status}: {message}"))]
    Api {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// The load job finished with an error result.
    #[snafu(display("Load job {job_id} failed ({reason}): {message}"))]
    JobFailed {
        job_id: String,
        reason: String,
        message: String,
    },

    /// No access token could be obtained.
    #[snafu(display("Failed to obtain access token: {message}"))]
    Auth { message: String },

    /// The HTTP client could not be built.
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild { source: reqwest::Error },
}

/// Errors that abort a single `load_to_table` call.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LoadError {
    /// Listing the source objects failed; nothing was loaded.
    #[snafu(display("Failed to list {location}/{prefix}: {source}"))]
    Listing {
        location: String,
        prefix: String,
        source: StorageError,
    },

    /// Submitting a load job failed; later objects were not attempted.
    #[snafu(display("Failed to submit load of {uri} into {table}: {source}"))]
    Submit {
        uri: String,
        table: String,
        source: WarehouseError,
    },

    /// A submitted load job did not complete successfully.
    #[snafu(display("Load of {uri} into {table} failed: {source}"))]
    Complete {
        uri: String,
        table: String,
        source: WarehouseError,
    },
}

/// Top-level errors of a CLI run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RunError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Storage provider could not be created.
    #[snafu(display("Storage error: {source}"))]
    Storage { source: StorageError },

    /// Warehouse client could not be created.
    #[snafu(display("Warehouse error: {source}"))]
    Warehouse { source: WarehouseError },

    /// A requested table is not part of `table_name_list`.
    #[snafu(display("Table '{table}' is not listed in table_name_list"))]
    UnknownTable { table: String },

    /// One or more table loads failed.
    #[snafu(display("Load failed for table(s): {}", tables.join(", ")))]
    TablesFailed { tables: Vec<String> },
}

impl From<ConfigError> for RunError {
    fn from(source: ConfigError) -> Self {
        RunError::Config { source }
    }
}

impl From<StorageError> for RunError {
    fn from(source: StorageError) -> Self {
        RunError::Storage { source }
    }
}

impl From<WarehouseError> for RunError {
    fn from(source: WarehouseError) -> Self {
        RunError::Warehouse { source }
    }
}
