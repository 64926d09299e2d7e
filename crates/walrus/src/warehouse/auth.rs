//! OAuth access tokens for the BigQuery API.

use serde::Deserialize;
use snafu::prelude::*;
use tracing::debug;

use crate::error::{HttpSnafu, WarehouseError};

/// Environment variable consulted when no token is configured.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

/// Where bearer tokens come from.
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// A fixed token (config or environment).
    Static(String),
    /// The GCE / GKE metadata server of the instance walrus runs on.
    Metadata { url: String },
}

impl TokenSource {
    /// Pick a source: the configured token, then `GOOGLE_OAUTH_ACCESS_TOKEN`,
    /// then the metadata server.
    ///
    /// Blank values count as unset at each step, so an empty
    /// `access_token: ${BQ_TOKEN:-}` still defers to the environment.
    pub fn resolve(configured: Option<&str>) -> Self {
        Self::resolve_from(configured, std::env::var(ACCESS_TOKEN_ENV).ok())
    }

    fn resolve_from(configured: Option<&str>, from_env: Option<String>) -> Self {
        let non_blank = |token: &String| !token.trim().is_empty();

        match configured
            .map(str::to_string)
            .filter(non_blank)
            .or_else(|| from_env.filter(non_blank))
        {
            Some(token) => TokenSource::Static(token),
            None => TokenSource::Metadata {
                url: METADATA_TOKEN_URL.to_string(),
            },
        }
    }

    /// Obtain a bearer token.
    pub async fn token(&self, client: &reqwest::Client) -> Result<String, WarehouseError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Metadata { url } => {
                debug!("Requesting access token from metadata server");

                let response = client
                    .get(url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await
                    .context(HttpSnafu {
                        operation: "metadata token",
                    })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(WarehouseError::Auth {
                        message: format!("metadata server returned HTTP {}", status.as_u16()),
                    });
                }

                let token: MetadataToken = response.json().await.context(HttpSnafu {
                    operation: "metadata token",
                })?;
                Ok(token.access_token)
            }
        }
    }
}
