//! Internal events for loader metrics.
//!
//! ## Target Labels
//!
//! Every event carries the destination table name as a `target` label so
//! each weekly load can be tracked separately.

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

use walrus_core::metrics::events::InternalEvent;

/// Outcome of a load job or a whole table load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Success,
    Failed,
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::Success => "success",
            LoadStatus::Failed => "failed",
        }
    }
}

/// Event emitted after listing, with the number of matching objects.
pub struct ObjectsMatched {
    pub count: usize,
    pub target: String,
}

impl InternalEvent for ObjectsMatched {
    fn emit(self) {
        trace!(count = self.count, target = %self.target, "Objects matched");
        counter!("walrus_objects_matched_total", "target" => self.target)
            .increment(self.count as u64);
    }
}

/// Event emitted when a load job finishes (or fails to start).
pub struct LoadJobCompleted {
    pub status: LoadStatus,
    pub duration: Duration,
    pub target: String,
}

impl InternalEvent for LoadJobCompleted {
    fn emit(self) {
        trace!(
            status = self.status.as_str(),
            duration_ms = self.duration.as_millis(),
            target = %self.target,
            "Load job completed"
        );
        counter!(
            "walrus_load_jobs_total",
            "status" => self.status.as_str(),
            "target" => self.target.clone()
        )
        .increment(1);
        histogram!("walrus_load_job_duration_seconds", "target" => self.target)
            .record(self.duration.as_secs_f64());
    }
}

/// Event emitted once per table at the end of its load.
pub struct TableLoadFinished {
    pub status: LoadStatus,
    pub target: String,
}

impl InternalEvent for TableLoadFinished {
    fn emit(self) {
        trace!(status = self.status.as_str(), target = %self.target, "Table load finished");
        counter!(
            "walrus_table_loads_total",
            "status" => self.status.as_str(),
            "target" => self.target
        )
        .increment(1);
    }
}
