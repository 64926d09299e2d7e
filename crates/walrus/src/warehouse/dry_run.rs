//! A warehouse that only logs what it would load.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

use super::{LoadJob, LoadRequest, WarehouseService};
use crate::error::WarehouseError;

/// Accepts every load and reports immediate success.
#[derive(Debug, Default)]
pub struct DryRunWarehouse {
    submitted: AtomicUsize,
}

impl DryRunWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of loads accepted so far.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::Relaxed)
    }
}

struct DryRunJob {
    id: String,
}

#[async_trait]
impl LoadJob for DryRunJob {
    fn id(&self) -> &str {
        &self.id
    }

    async fn wait(&mut self) -> Result<(), WarehouseError> {
        Ok(())
    }
}

#[async_trait]
impl WarehouseService for DryRunWarehouse {
    async fn submit_load(&self, request: &LoadRequest) -> Result<Box<dyn LoadJob>, WarehouseError> {
        let n = self.submitted.fetch_add(1, Ordering::Relaxed) + 1;

        info!(
            source = %request.source,
            destination = %request.destination,
            format = %request.format,
            "Dry run: would load"
        );

        Ok(Box::new(DryRunJob {
            id: format!("dry-run-{n}"),
        }))
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}
