//! walrus-core: shared plumbing for the walrus warehouse loader.
//!
//! - `storage/` - Object storage abstraction (GCS, S3, local)
//! - `config/` - YAML config loading with environment variable interpolation
//! - `metrics/` - Metric events and Prometheus textfile export
//! - `tracing` - Subscriber setup
//! - `error` - Common error types

pub mod config;
pub mod error;
pub mod metrics;
pub mod storage;
pub mod tracing;

// Re-export commonly used items
pub use error::{ConfigError, MetricsError, StorageError};
pub use crate::metrics::{MetricsController, init_global as init_metrics};
pub use storage::{BackendConfig, StorageProvider};
pub use crate::tracing::init_tracing;
