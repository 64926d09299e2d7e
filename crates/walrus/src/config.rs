//! Configuration for the warehouse loader.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walrus_core::config::{load_yaml_file, parse_yaml};

use crate::error::ConfigError;
use crate::warehouse::TableRef;

/// Placeholder replaced by the table name in `prefix_template`.
pub const TABLE_PLACEHOLDER: &str = "{table}";

fn default_prefix_template() -> String {
    "{table}.parquet".to_string()
}

fn default_bigquery_endpoint() -> String {
    "https://bigquery.googleapis.com".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

/// What a load does when the destination table already holds data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WriteDisposition {
    #[default]
    Append,
    Truncate,
    Empty,
}

impl WriteDisposition {
    pub fn as_bigquery(&self) -> &'static str {
        match self {
            WriteDisposition::Append => "WRITE_APPEND",
            WriteDisposition::Truncate => "WRITE_TRUNCATE",
            WriteDisposition::Empty => "WRITE_EMPTY",
        }
    }
}

/// Whether a load may create a missing destination table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CreateDisposition {
    #[default]
    IfNeeded,
    Never,
}

impl CreateDisposition {
    pub fn as_bigquery(&self) -> &'static str {
        match self {
            CreateDisposition::IfNeeded => "CREATE_IF_NEEDED",
            CreateDisposition::Never => "CREATE_NEVER",
        }
    }
}

/// BigQuery client settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BigQueryConfig {
    /// API root (overridable for emulators).
    #[serde(default = "default_bigquery_endpoint")]
    pub endpoint: String,
    /// Job location, e.g. "US". Left to the service when unset.
    #[serde(default)]
    pub location: Option<String>,
    /// Delay between job status polls while waiting on a load.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// OAuth access token. Falls back to `GOOGLE_OAUTH_ACCESS_TOKEN`, then
    /// the GCE metadata server.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub write_disposition: WriteDisposition,
    #[serde(default)]
    pub create_disposition: CreateDisposition,
}

impl Default for BigQueryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_bigquery_endpoint(),
            location: None,
            poll_interval_ms: default_poll_interval_ms(),
            access_token: None,
            write_disposition: WriteDisposition::default(),
            create_disposition: CreateDisposition::default(),
        }
    }
}

/// Metrics export settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Prometheus textfile written at exit.
    #[serde(default)]
    pub textfile: Option<PathBuf>,
}

/// Main configuration for walrus.
///
/// # Example
///
/// ```yaml
/// storage_location: gs://de-porto
/// warehouse_project: de-porto
/// dataset: tmdb
/// prefix_template: "qoala/{table}.parquet"
/// table_name_list: [movies, series, genres, companies]
///
/// bigquery:
///   location: US
///
/// metrics:
///   textfile: /var/lib/node_exporter/walrus.prom
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Bucket (or bucket URL) the Parquet datasets are written to.
    pub storage_location: String,
    /// Warehouse project that owns the dataset.
    pub warehouse_project: String,
    /// Dataset holding the destination tables.
    pub dataset: String,
    /// Tables loaded by a full run, in order.
    pub table_name_list: Vec<String>,
    /// Object prefix for a table; `{table}` is replaced by the table name.
    #[serde(default = "default_prefix_template")]
    pub prefix_template: String,
    #[serde(default)]
    pub bigquery: BigQueryConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load and validate configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = load_yaml_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = parse_yaml(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("storage_location", &self.storage_location),
            ("warehouse_project", &self.warehouse_project),
            ("dataset", &self.dataset),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("'{field}' cannot be empty"));
            }
        }

        if self.dataset.contains('.') {
            errors.push("'dataset' cannot contain '.'".to_string());
        }

        if self.table_name_list.is_empty() {
            errors.push("'table_name_list' cannot be empty".to_string());
        }

        let mut seen = HashSet::new();
        for table in &self.table_name_list {
            if table.trim().is_empty() || table.contains('.') {
                errors.push(format!("invalid table name '{table}' in table_name_list"));
            }
            if !seen.insert(table.as_str()) {
                errors.push(format!("table '{table}' is listed more than once"));
            }
        }

        if !self.prefix_template.contains(TABLE_PLACEHOLDER) {
            errors.push(format!(
                "'prefix_template' must contain {TABLE_PLACEHOLDER}, got '{}'",
                self.prefix_template
            ));
        }

        if self.bigquery.poll_interval_ms == 0 {
            errors.push("'bigquery.poll_interval_ms' must be greater than 0".to_string());
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(ConfigError::InvalidValue {
                field: "config".to_string(),
                message: errors.remove(0),
            }),
            _ => Err(ConfigError::MultipleErrors { errors }),
        }
    }

    /// Object prefix holding the files of `table`.
    pub fn prefix_for(&self, table: &str) -> String {
        self.prefix_template.replace(TABLE_PLACEHOLDER, table)
    }

    /// Fully qualified destination of `table`.
    pub fn table_ref(&self, table: &str) -> TableRef {
        TableRef::new(&self.warehouse_project, &self.dataset, table)
    }
}
