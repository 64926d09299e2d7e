//! Google Cloud Storage backend.

use object_store::ObjectStore;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path;
use snafu::prelude::*;
use std::sync::Arc;
use tracing::debug;

use crate::error::{GcsConfigSnafu, StorageError};

use super::{BackendConfig, StorageProvider};

/// Google Cloud Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsConfig {
    pub bucket: String,
    pub key: Option<Path>,
}

impl StorageProvider {
    /// Credentials come from the environment (`GOOGLE_SERVICE_ACCOUNT`,
    /// `GOOGLE_SERVICE_ACCOUNT_KEY`, ...) or application default credentials.
    pub(super) fn construct_gcs(config: GcsConfig) -> Result<Self, StorageError> {
        debug!(bucket = %config.bucket, "Constructing GCS client");

        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(&config.bucket)
            .build()
            .context(GcsConfigSnafu)?;
        let object_store: Arc<dyn ObjectStore> = Arc::new(store);

        Ok(Self::with_store(BackendConfig::Gcs(config), object_store))
    }
}
