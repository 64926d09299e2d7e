//! Amazon S3 (and S3-compatible) backend.

use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use snafu::prelude::*;
use std::sync::Arc;
use tracing::debug;

use crate::error::{S3ConfigSnafu, StorageError};

use super::{BackendConfig, StorageProvider};

/// S3 configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub bucket: String,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores (MinIO, LocalStack).
    pub endpoint: Option<String>,
    pub key: Option<Path>,
}

impl StorageProvider {
    pub(super) fn construct_s3(config: S3Config) -> Result<Self, StorageError> {
        debug!(bucket = %config.bucket, endpoint = ?config.endpoint, "Constructing S3 client");

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket);

        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }

        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"))
                .with_virtual_hosted_style_request(false);
        }

        let store = builder.build().context(S3ConfigSnafu)?;
        let object_store: Arc<dyn ObjectStore> = Arc::new(store);

        Ok(Self::with_store(BackendConfig::S3(config), object_store))
    }
}
