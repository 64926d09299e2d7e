//! Prometheus recorder with textfile export.
//!
//! walrus runs as a short-lived batch task, so instead of serving `/metrics`
//! it renders the exposition format once at exit into a file picked up by
//! the node-exporter textfile collector.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use snafu::prelude::*;
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

use crate::error::{
    AlreadyInitializedSnafu, MetricsError, NotInitializedSnafu, PrometheusInitSnafu,
    WriteTextfileSnafu,
};

/// Histogram buckets for duration metrics (in seconds). Warehouse loads
/// routinely take tens of seconds.
const DURATION_BUCKETS: &[f64] = &[
    0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0,
];

static CONTROLLER: OnceLock<MetricsController> = OnceLock::new();

/// Handle to the installed recorder.
pub struct MetricsController {
    handle: PrometheusHandle,
}

/// Install the global Prometheus recorder.
///
/// # Errors
///
/// Fails if a recorder is already installed or the builder is misconfigured.
pub fn init_global() -> Result<(), MetricsError> {
    ensure!(CONTROLLER.get().is_none(), AlreadyInitializedSnafu);

    let handle = PrometheusBuilder::new()
        .set_buckets(DURATION_BUCKETS)
        .context(PrometheusInitSnafu)?
        .install_recorder()
        .context(PrometheusInitSnafu)?;

    CONTROLLER
        .set(MetricsController { handle })
        .map_err(|_| AlreadyInitializedSnafu.build())?;

    Ok(())
}

impl MetricsController {
    /// Get the global metrics controller.
    pub fn get() -> Result<&'static Self, MetricsError> {
        CONTROLLER.get().context(NotInitializedSnafu)
    }

    /// Render metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Write the rendered metrics to `path`.
    ///
    /// The text is written to a sibling temp file and renamed into place so
    /// the collector never reads a partial file.
    pub fn write_textfile(&self, path: &Path) -> Result<(), MetricsError> {
        let staging = path.with_extension("prom.tmp");
        std::fs::write(&staging, self.render()).context(WriteTextfileSnafu { path })?;
        std::fs::rename(&staging, path).context(WriteTextfileSnafu { path })?;

        info!(path = %path.display(), "Wrote metrics textfile");
        Ok(())
    }
}
