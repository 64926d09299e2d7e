//! Per-table load runs.
//!
//! A run loads each selected table of the configuration in order. Tables are
//! independent: a failed table is logged and recorded, and the remaining
//! tables still load. The run fails if any table failed.

use tracing::{error, info};

use walrus_core::emit;

use crate::config::Config;
use crate::error::RunError;
use crate::loader::{LoadReport, WarehouseLoader};
use crate::metrics::events::{LoadStatus, TableLoadFinished};
use crate::warehouse::TableRef;

/// What to load for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePlan {
    pub name: String,
    pub prefix: String,
    pub target: TableRef,
}

/// The ordered set of table loads for one invocation.
#[derive(Debug, Clone)]
pub struct LoadRun {
    plans: Vec<TablePlan>,
}

impl LoadRun {
    /// Plan a run. An empty `selection` means every table in
    /// `table_name_list`; otherwise the selected tables, in selection order.
    pub fn plan(config: &Config, selection: &[String]) -> Result<Self, RunError> {
        let names: Vec<&String> = if selection.is_empty() {
            config.table_name_list.iter().collect()
        } else {
            selection.iter().collect()
        };

        let plans = names
            .into_iter()
            .map(|name| {
                if !config.table_name_list.contains(name) {
                    return Err(RunError::UnknownTable {
                        table: name.clone(),
                    });
                }
                Ok(TablePlan {
                    name: name.clone(),
                    prefix: config.prefix_for(name),
                    target: config.table_ref(name),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { plans })
    }

    pub fn plans(&self) -> &[TablePlan] {
        &self.plans
    }

    /// Load every planned table, one after another.
    pub async fn execute(&self, loader: &WarehouseLoader) -> Result<Vec<LoadReport>, RunError> {
        let mut reports = Vec::with_capacity(self.plans.len());
        let mut failed = Vec::new();

        for plan in &self.plans {
            info!(target = %plan.name, prefix = %plan.prefix, destination = %plan.target, "Starting table load");

            match loader.load_to_table(&plan.prefix, &plan.target).await {
                Ok(report) => {
                    emit!(TableLoadFinished {
                        status: LoadStatus::Success,
                        target: plan.name.clone(),
                    });
                    info!(target = %plan.name, objects = report.objects_loaded, "Table load finished");
                    reports.push(report);
                }
                Err(e) => {
                    emit!(TableLoadFinished {
                        status: LoadStatus::Failed,
                        target: plan.name.clone(),
                    });
                    error!(target = %plan.name, error = %e, "Table load failed");
                    failed.push(plan.name.clone());
                }
            }
        }

        if failed.is_empty() {
            Ok(reports)
        } else {
            Err(RunError::TablesFailed { tables: failed })
        }
    }
}
