//! Configuration file loading shared by walrus binaries.
//!
//! Config documents are YAML. Environment variables are interpolated into the
//! raw text before parsing, so secrets such as access tokens can stay out of
//! the file.

mod vars;

pub use vars::{Interpolated, interpolate, interpolate_with};

use serde::de::DeserializeOwned;
use snafu::prelude::*;
use std::path::Path;

use crate::error::{
    ConfigError, EnvInterpolationSnafu, ReadFileSnafu, UnsupportedFormatSnafu, YamlParseSnafu,
};

/// Check if a path has a YAML extension.
pub fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "yaml" || ext == "yml")
        .unwrap_or(false)
}

/// Interpolate environment variables into `contents` and parse it as YAML.
pub fn parse_yaml<T: DeserializeOwned>(contents: &str) -> Result<T, ConfigError> {
    let result = interpolate(contents);
    ensure!(
        result.is_ok(),
        EnvInterpolationSnafu {
            message: result.errors.join("\n"),
        }
    );

    serde_yaml::from_str(&result.text).context(YamlParseSnafu)
}

/// Read a YAML config file from disk and parse it.
pub fn load_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    ensure!(
        is_yaml_file(path),
        UnsupportedFormatSnafu {
            path: path.to_path_buf(),
        }
    );

    let contents = std::fs::read_to_string(path).context(ReadFileSnafu {
        path: path.to_path_buf(),
    })?;

    parse_yaml(&contents)
}
