//! Error types shared by the walrus crates.
//!
//! Storage, configuration and metrics failures each get their own enum so
//! callers can wrap them with context without losing the source.

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur while talking to object storage.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// The storage location could not be mapped to a backend.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// GCS client could not be built.
    #[snafu(display("GCS configuration error: {source}"))]
    GcsConfig { source: object_store::Error },

    /// S3 client could not be built.
    #[snafu(display("S3 configuration error: {source}"))]
    S3Config { source: object_store::Error },
}

// ============ Config Errors ============

/// Errors that can occur while reading and validating configuration.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file {}: {source}", path.display()))]
    ReadFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// Unsupported config file format.
    #[snafu(display("Unsupported config format for {}: only .yaml/.yml supported", path.display()))]
    UnsupportedFormat { path: std::path::PathBuf },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// A required field was left empty.
    #[snafu(display("'{field}' cannot be empty"))]
    EmptyField { field: String },

    /// A value is present but malformed.
    #[snafu(display("Invalid value for '{field}': {message}"))]
    InvalidValue { field: String, message: String },

    /// Multiple configuration errors occurred.
    #[snafu(display("Multiple config errors:\n{}", errors.join("\n")))]
    MultipleErrors { errors: Vec<String> },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics setup and export.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },

    /// Recorder already installed (double-init attempted).
    #[snafu(display("Metrics recorder already initialized"))]
    AlreadyInitialized,

    /// Recorder accessed before init.
    #[snafu(display("Metrics recorder not initialized"))]
    NotInitialized,

    /// Writing the exposition textfile failed.
    #[snafu(display("Failed to write metrics textfile {}: {source}", path.display()))]
    WriteTextfile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}
