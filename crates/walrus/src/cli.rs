//! Command-line arguments and the top-level run.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use walrus_core::{MetricsController, StorageProvider, init_metrics};

use crate::config::Config;
use crate::error::RunError;
use crate::listing::ObjectLister;
use crate::loader::{LoadReport, WarehouseLoader};
use crate::run::LoadRun;
use crate::warehouse::{BigQueryWarehouse, DryRunWarehouse, WarehouseService};

/// Load Parquet files from object storage into warehouse tables.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct CliArgs {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Table to load (can be specified multiple times; default: all tables)
    #[arg(short, long = "table")]
    pub tables: Vec<String>,

    /// List matching objects and log the loads without submitting them
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the loads described by `config`.
pub async fn run(config: &Config, args: &CliArgs) -> Result<Vec<LoadReport>, RunError> {
    if let Err(e) = init_metrics() {
        warn!(error = %e, "Metrics recorder unavailable");
    }

    let plan = LoadRun::plan(config, &args.tables)?;
    info!(
        tables = plan.plans().len(),
        location = %config.storage_location,
        dry_run = args.dry_run,
        "Starting walrus"
    );

    let lister: Arc<dyn ObjectLister> = Arc::new(StorageProvider::for_url(&config.storage_location)?);
    let warehouse: Arc<dyn WarehouseService> = if args.dry_run {
        Arc::new(DryRunWarehouse::new())
    } else {
        Arc::new(BigQueryWarehouse::new(config.bigquery.clone())?)
    };
    let loader = WarehouseLoader::new(lister, warehouse);

    let result = plan.execute(&loader).await;

    // Metrics export never changes the outcome of the loads.
    if let Some(path) = &config.metrics.textfile {
        if let Err(e) = MetricsController::get().and_then(|controller| controller.write_textfile(path)) {
            warn!(error = %e, path = %path.display(), "Failed to write metrics textfile");
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = CliArgs::try_parse_from([
            "walrus", "-c", "walrus.yaml", "--table", "movies", "-t", "series", "--dry-run",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from("walrus.yaml"));
        assert_eq!(args.tables, vec!["movies", "series"]);
        assert!(args.dry_run);
    }

    #[test]
    fn test_config_is_required() {
        assert!(CliArgs::try_parse_from(["walrus"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["walrus", "--config", "walrus.yaml"]).unwrap();
        assert!(args.tables.is_empty());
        assert!(!args.dry_run);
    }
}
