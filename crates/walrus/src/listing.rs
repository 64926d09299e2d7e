//! Source object discovery.
//!
//! Lists the objects under a prefix and keeps the ones whose final
//! dot-separated suffix equals the wanted extension.

use async_trait::async_trait;
use std::fmt;

use walrus_core::StorageProvider;

use crate::error::StorageError;

/// Reference to one object in storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageObjectRef {
    location: String,
    name: String,
}

impl StorageObjectRef {
    pub fn new(location: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            name: name.into(),
        }
    }

    /// Location root, e.g. `gs://de-porto`.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Object name relative to the location root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified source URI, e.g. `gs://de-porto/qoala/movies.parquet`.
    pub fn uri(&self) -> String {
        format!("{}/{}", self.location.trim_end_matches('/'), self.name)
    }
}

impl fmt::Display for StorageObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Something that can enumerate objects at one storage location.
#[async_trait]
pub trait ObjectLister: Send + Sync {
    /// Location root the listed names are relative to.
    fn location(&self) -> &str;

    /// Names of all objects whose name starts with `prefix`, in listing order.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

#[async_trait]
impl ObjectLister for StorageProvider {
    fn location(&self) -> &str {
        self.root_uri()
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.list_prefixed(prefix).await
    }
}

/// Whether the text after the last `.` of `name` is exactly `extension`.
///
/// Case-sensitive. A name without any `.` never matches.
///
/// ```
/// use walrus::listing::has_extension;
///
/// assert!(has_extension("qoala/movies.parquet", "parquet"));
/// assert!(has_extension("part-0.snappy.parquet", "parquet"));
/// assert!(!has_extension("qoala/movies.parquet.bak", "parquet"));
/// assert!(!has_extension("parquet", "parquet"));
/// ```
pub fn has_extension(name: &str, extension: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, suffix)| suffix == extension)
}

/// List every object under `prefix` whose extension is `extension`.
///
/// The listing order of the underlying service is preserved. Listing
/// failures are returned as-is; there is no partial result.
pub async fn list_matching_objects(
    lister: &dyn ObjectLister,
    prefix: &str,
    extension: &str,
) -> Result<Vec<StorageObjectRef>, StorageError> {
    let location = lister.location();

    let matching = lister
        .list_objects(prefix)
        .await?
        .into_iter()
        .filter(|name| has_extension(name, extension))
        .map(|name| StorageObjectRef::new(location, name))
        .collect();

    Ok(matching)
}
