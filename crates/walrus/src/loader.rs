//! The warehouse loader: enumerate Parquet objects, then load them one by one.
//!
//! Loads are strictly sequential. Each job is awaited before the next is
//! submitted, and the first failure aborts the rest of the batch. Objects
//! loaded before the failure stay loaded; there is no rollback and no
//! tracking across runs, so running twice loads everything twice.

use snafu::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use walrus_core::emit;

use crate::error::{CompleteSnafu, ListingSnafu, LoadError, SubmitSnafu};
use crate::listing::{ObjectLister, StorageObjectRef, list_matching_objects};
use crate::metrics::events::{LoadJobCompleted, LoadStatus, ObjectsMatched};
use crate::warehouse::{LoadRequest, TableRef, WarehouseService};

/// Extension of the files handed to the warehouse.
pub const SOURCE_EXTENSION: &str = "parquet";

/// Summary of one `load_to_table` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub table: TableRef,
    pub objects_loaded: usize,
}

/// Loads objects from one storage location into warehouse tables.
pub struct WarehouseLoader {
    lister: Arc<dyn ObjectLister>,
    warehouse: Arc<dyn WarehouseService>,
}

impl WarehouseLoader {
    pub fn new(lister: Arc<dyn ObjectLister>, warehouse: Arc<dyn WarehouseService>) -> Self {
        Self { lister, warehouse }
    }

    /// Location the loader lists from.
    pub fn location(&self) -> &str {
        self.lister.location()
    }

    /// Objects under `prefix` whose extension is exactly `extension`.
    pub async fn list_matching_objects(
        &self,
        prefix: &str,
        extension: &str,
    ) -> Result<Vec<StorageObjectRef>, LoadError> {
        list_matching_objects(self.lister.as_ref(), prefix, extension)
            .await
            .context(ListingSnafu {
                location: self.lister.location(),
                prefix,
            })
    }

    /// Load every Parquet object under `prefix` into `table`.
    ///
    /// Zero matching objects is a no-op, not an error.
    pub async fn load_to_table(
        &self,
        prefix: &str,
        table: &TableRef,
    ) -> Result<LoadReport, LoadError> {
        let target = table.table.clone();
        let objects = self.list_matching_objects(prefix, SOURCE_EXTENSION).await?;

        emit!(ObjectsMatched {
            count: objects.len(),
            target: target.clone(),
        });

        if objects.is_empty() {
            info!(target = %target, location = %self.location(), prefix, "No matching objects, nothing to load");
            return Ok(LoadReport {
                table: table.clone(),
                objects_loaded: 0,
            });
        }

        info!(
            target = %target,
            count = objects.len(),
            destination = %table,
            warehouse = self.warehouse.name(),
            "Loading objects"
        );

        let total = objects.len();
        for (index, object) in objects.into_iter().enumerate() {
            let uri = object.uri();
            let request = LoadRequest::parquet(object, table.clone());
            let start = Instant::now();

            let mut job = match self.warehouse.submit_load(&request).await {
                Ok(job) => job,
                Err(source) => {
                    emit!(LoadJobCompleted {
                        status: LoadStatus::Failed,
                        duration: start.elapsed(),
                        target: target.clone(),
                    });
                    warn!(target = %target, uri = %uri, remaining = total - index - 1, "Load submission failed, aborting table");
                    return Err(source).context(SubmitSnafu {
                        uri,
                        table: table.to_string(),
                    });
                }
            };

            debug!(target = %target, uri = %uri, job_id = job.id(), "Waiting for load job");
            let outcome = job.wait().await;

            let status = if outcome.is_ok() {
                LoadStatus::Success
            } else {
                LoadStatus::Failed
            };
            emit!(LoadJobCompleted {
                status,
                duration: start.elapsed(),
                target: target.clone(),
            });

            if outcome.is_err() {
                warn!(target = %target, uri = %uri, remaining = total - index - 1, "Load job failed, aborting table");
            }
            outcome.context(CompleteSnafu {
                uri: uri.as_str(),
                table: table.to_string(),
            })?;

            info!(target = %target, uri = %uri, progress = %format!("{}/{}", index + 1, total), "Loaded object");
        }

        Ok(LoadReport {
            table: table.clone(),
            objects_loaded: total,
        })
    }
}
