//! walrus CLI: loads the configured tables into the warehouse.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use walrus::cli::{CliArgs, run};
use walrus::{Config, init_tracing};

fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let config = match Config::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Loads are awaited one at a time; a single thread is all they need.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&config, &args)) {
        Ok(reports) => {
            let objects: usize = reports.iter().map(|r| r.objects_loaded).sum();
            info!(tables = reports.len(), objects, "All loads finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "walrus failed");
            eprintln!("walrus failed: {e}");
            ExitCode::FAILURE
        }
    }
}
