//! Object storage abstraction.
//!
//! Wraps an `object_store` client for GCS, S3 or the local filesystem behind
//! a single provider that knows its location root and can list object names
//! under a raw string prefix.

mod gcs;
mod local;
mod s3;
mod url_parser;

pub use gcs::GcsConfig;
pub use local::LocalConfig;
pub use s3::S3Config;
pub use url_parser::BackendConfig;

use futures::StreamExt;
use object_store::ObjectStore;
use object_store::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::emit;
use crate::error::StorageError;
use crate::metrics::events::{
    RequestStatus, StorageOperation, StorageRequest, StorageRequestDuration,
};

/// Storage provider bound to one location (bucket plus optional key prefix).
#[derive(Clone)]
pub struct StorageProvider {
    config: BackendConfig,
    object_store: Arc<dyn ObjectStore>,
    root_uri: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.root_uri)
    }
}

impl StorageProvider {
    /// Create a storage provider for a location such as `gs://de-porto`,
    /// `s3://bucket/key`, `/local/dir` or a bare GCS bucket name.
    pub fn for_url(url: &str) -> Result<Self, StorageError> {
        match BackendConfig::parse_url(url)? {
            BackendConfig::Gcs(config) => Self::construct_gcs(config),
            BackendConfig::S3(config) => Self::construct_s3(config),
            BackendConfig::Local(config) => Self::construct_local(config),
        }
    }

    /// Wrap an already built object store, e.g. an in-memory store in tests.
    pub fn with_store(config: BackendConfig, object_store: Arc<dyn ObjectStore>) -> Self {
        let root_uri = config.root_uri();
        Self {
            config,
            object_store,
            root_uri,
        }
    }

    /// Canonical URI of the location root (`gs://de-porto`).
    pub fn root_uri(&self) -> &str {
        &self.root_uri
    }

    /// List every object whose name starts with `prefix`.
    ///
    /// Unlike `ObjectStore::list`, the prefix is a raw string prefix:
    /// `qoala/movies.parquet` matches `qoala/movies.parquet/part-0.parquet`
    /// and `qoala/movies.parquet.bak` alike. Names are returned relative to
    /// the location root, in listing order. A prefix whose parent does not
    /// exist lists as empty.
    ///
    /// Cost is one non-recursive listing of the prefix's parent directory
    /// plus a recursive listing of each subdirectory that matches.
    pub async fn list_prefixed(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let start = Instant::now();
        let result = self.collect_prefixed(prefix).await;

        let status = if result.is_ok() {
            RequestStatus::Success
        } else {
            RequestStatus::Error
        };
        emit!(StorageRequest {
            operation: StorageOperation::List,
            status,
        });
        emit!(StorageRequestDuration {
            operation: StorageOperation::List,
            duration: start.elapsed(),
        });

        match result {
            Ok(names) => {
                debug!(location = %self.root_uri, prefix, count = names.len(), "Listed objects");
                Ok(names)
            }
            Err(source @ object_store::Error::NotFound { .. }) => {
                debug!(location = %self.root_uri, prefix, error = %source, "Prefix not found, treating as empty");
                Ok(Vec::new())
            }
            Err(source) => Err(StorageError::ObjectStore { source }),
        }
    }

    async fn collect_prefixed(&self, prefix: &str) -> Result<Vec<String>, object_store::Error> {
        // object_store lists by path segment. List the enclosing directory one
        // level deep, then descend only into subdirectories that share the
        // string prefix, so unrelated trees are never walked.
        let parent = prefix.rfind('/').map_or("", |idx| &prefix[..idx]);
        let listing_root: Path = self.qualify(parent);
        let root = if listing_root.parts().next().is_some() {
            Some(&listing_root)
        } else {
            None
        };

        let level = self.object_store.list_with_delimiter(root).await?;
        let mut names: Vec<String> = level
            .objects
            .iter()
            .map(|meta| self.relative(&meta.location))
            .filter(|name| name.starts_with(prefix))
            .collect();

        for dir in &level.common_prefixes {
            if !self.relative(dir).starts_with(prefix) {
                continue;
            }

            let mut stream = self.object_store.list(Some(dir));
            while let Some(meta) = stream.next().await {
                names.push(self.relative(&meta?.location));
            }
        }

        Ok(names)
    }

    /// Object name relative to the location root.
    fn relative(&self, location: &Path) -> String {
        let key_part_count = self
            .config
            .key()
            .map(|key| key.parts().count())
            .unwrap_or_default();
        let relative: Path = location.parts().skip(key_part_count).collect();
        relative.to_string()
    }

    /// Qualify a relative path with the configured key prefix.
    fn qualify(&self, relative: &str) -> Path {
        let relative = Path::from(relative);
        match self.config.key() {
            Some(key) => key.parts().chain(relative.parts()).collect(),
            None => relative,
        }
    }
}
