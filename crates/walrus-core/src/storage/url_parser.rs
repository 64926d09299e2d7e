//! Storage location parsing.
//!
//! Maps the location strings found in config (`gs://bucket/key`,
//! `s3://bucket`, `/local/dir`, or a bare GCS bucket name) to a backend
//! configuration.

use object_store::path::Path;
use regex::Regex;
use std::sync::LazyLock;

use crate::error::{InvalidUrlSnafu, StorageError};

use super::{GcsConfig, LocalConfig, S3Config};

const GCS_URL: &str = r"^[gG][sS]://(?P<bucket>[a-z0-9\-_\.]+)(/(?P<key>.+?))?/?$";
const GCS_PATH: &str =
    r"^https://storage\.googleapis\.com/(?P<bucket>[a-z0-9\-_\.]+)(/(?P<key>.+?))?/?$";
const GCS_BARE_BUCKET: &str = r"^(?P<bucket>[a-z0-9][a-z0-9\-_\.]*[a-z0-9])$";

const S3_URL: &str = r"^[sS]3[aA]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+?))?/?$";
const S3_ENDPOINT_URL: &str = r"^[sS]3[aA]?::(?P<protocol>https?)://(?P<endpoint>[^:/]+):(?P<port>\d+)/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+?))?/?$";

const FILE_URI: &str = r"^file://(?P<path>/.*)$";
const FILE_URL: &str = r"^file:(?P<path>.*)$";
const FILE_PATH: &str = r"^(?P<path>/.*)$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Gcs,
    S3,
    Local,
}

/// Ordered matchers; the first pattern that matches wins.
static MATCHERS: LazyLock<Vec<(Backend, Regex)>> = LazyLock::new(|| {
    [
        (Backend::Gcs, GCS_URL),
        (Backend::Gcs, GCS_PATH),
        (Backend::S3, S3_ENDPOINT_URL),
        (Backend::S3, S3_URL),
        (Backend::Local, FILE_URI),
        (Backend::Local, FILE_URL),
        (Backend::Local, FILE_PATH),
        (Backend::Gcs, GCS_BARE_BUCKET),
    ]
    .into_iter()
    .map(|(backend, pattern)| {
        (
            backend,
            Regex::new(pattern).expect("storage URL pattern is valid"),
        )
    })
    .collect()
});

/// Backend configuration parsed from a storage location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Gcs(GcsConfig),
    S3(S3Config),
    Local(LocalConfig),
}

impl BackendConfig {
    /// Parse a storage location into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        let found = MATCHERS
            .iter()
            .find_map(|(backend, regex)| regex.captures(url).map(|caps| (*backend, caps)));

        match found {
            Some((Backend::Gcs, caps)) => Ok(Self::parse_gcs(&caps)),
            Some((Backend::S3, caps)) => Ok(Self::parse_s3(&caps)),
            Some((Backend::Local, caps)) => Ok(Self::parse_local(&caps)),
            None => InvalidUrlSnafu {
                url: url.to_string(),
            }
            .fail(),
        }
    }

    fn parse_gcs(caps: &regex::Captures) -> Self {
        BackendConfig::Gcs(GcsConfig {
            bucket: caps["bucket"].to_string(),
            key: key_of(caps),
        })
    }

    fn parse_s3(caps: &regex::Captures) -> Self {
        let endpoint = std::env::var("AWS_ENDPOINT").ok().or_else(|| {
            caps.name("endpoint").map(|endpoint| {
                let protocol = caps.name("protocol").map_or("https", |p| p.as_str());
                let port = caps.name("port").map_or("443", |p| p.as_str());
                format!("{protocol}://{}:{port}", endpoint.as_str())
            })
        });

        BackendConfig::S3(S3Config {
            bucket: caps["bucket"].to_string(),
            region: std::env::var("AWS_DEFAULT_REGION").ok(),
            endpoint,
            key: key_of(caps),
        })
    }

    fn parse_local(caps: &regex::Captures) -> Self {
        let path = &caps["path"];
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        let trimmed = path.trim_end_matches('/');

        BackendConfig::Local(LocalConfig {
            path: if trimmed.is_empty() {
                "/".to_string()
            } else {
                trimmed.to_string()
            },
        })
    }

    /// Key prefix inside the bucket that every object name is relative to.
    pub(crate) fn key(&self) -> Option<&Path> {
        match self {
            BackendConfig::Gcs(gcs) => gcs.key.as_ref(),
            BackendConfig::S3(s3) => s3.key.as_ref(),
            BackendConfig::Local(_) => None,
        }
    }

    /// Canonical URI of the location root, e.g. `gs://de-porto`.
    pub fn root_uri(&self) -> String {
        let (scheme_root, key) = match self {
            BackendConfig::Gcs(gcs) => (format!("gs://{}", gcs.bucket), gcs.key.as_ref()),
            BackendConfig::S3(s3) => (format!("s3://{}", s3.bucket), s3.key.as_ref()),
            BackendConfig::Local(local) => (format!("file://{}", local.path), None),
        };

        match key {
            Some(key) => format!("{scheme_root}/{key}"),
            None => scheme_root,
        }
    }
}

fn key_of(caps: &regex::Captures) -> Option<Path> {
    caps.name("key")
        .map(|m| m.as_str())
        .filter(|key| !key.is_empty())
        .map(Path::from)
}
