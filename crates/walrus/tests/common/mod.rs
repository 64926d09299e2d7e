//! Test doubles for the storage and warehouse seams.

#![allow(dead_code)]

pub mod fake_bigquery;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use walrus::error::{StorageError, WarehouseError};
use walrus::{LoadJob, LoadRequest, ObjectLister, WarehouseService};

/// Lister over a fixed set of object names.
pub struct FakeLister {
    location: String,
    names: Vec<String>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeLister {
    pub fn new(location: &str, names: &[&str]) -> Self {
        Self {
            location: location.to_string(),
            names: names.iter().map(|n| n.to_string()).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A lister whose every call fails.
    pub fn failing(location: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(location, &[])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectLister for FakeLister {
    fn location(&self) -> &str {
        &self.location
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(StorageError::InvalidUrl {
                url: self.location.clone(),
            });
        }

        Ok(self
            .names
            .iter()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// What the recording warehouse saw, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Submitted(String),
    Finished(String),
}

#[derive(Default)]
struct Recorded {
    attempts: usize,
    events: Vec<Event>,
    requests: Vec<LoadRequest>,
}

/// Warehouse that records every request and can be told to fail.
///
/// Submission counters are 1-based and count across all tables.
#[derive(Clone, Default)]
pub struct RecordingWarehouse {
    recorded: Arc<Mutex<Recorded>>,
    fail_submit_at: Option<usize>,
    fail_job_at: Option<usize>,
    fail_table: Option<String>,
}

impl RecordingWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the `n`-th submission.
    pub fn fail_submit_at(mut self, n: usize) -> Self {
        self.fail_submit_at = Some(n);
        self
    }

    /// Accept the `n`-th submission but fail its job.
    pub fn fail_job_at(mut self, n: usize) -> Self {
        self.fail_job_at = Some(n);
        self
    }

    /// Fail every job loading into `table`.
    pub fn fail_table(mut self, table: &str) -> Self {
        self.fail_table = Some(table.to_string());
        self
    }

    pub fn requests(&self) -> Vec<LoadRequest> {
        self.recorded.lock().unwrap().requests.clone()
    }

    pub fn submitted_uris(&self) -> Vec<String> {
        self.requests().iter().map(|r| r.source.uri()).collect()
    }

    /// Submissions attempted, including rejected ones.
    pub fn attempts(&self) -> usize {
        self.recorded.lock().unwrap().attempts
    }

    pub fn events(&self) -> Vec<Event> {
        self.recorded.lock().unwrap().events.clone()
    }
}

#[async_trait]
impl WarehouseService for RecordingWarehouse {
    async fn submit_load(&self, request: &LoadRequest) -> Result<Box<dyn LoadJob>, WarehouseError> {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.attempts += 1;
        let n = recorded.attempts;

        if self.fail_submit_at == Some(n) {
            return Err(WarehouseError::Api {
                operation: "jobs.insert",
                status: 403,
                message: "Access Denied".to_string(),
            });
        }

        let uri = request.source.uri();
        recorded.requests.push(request.clone());
        recorded.events.push(Event::Submitted(uri.clone()));

        let fail = self.fail_job_at == Some(n)
            || self.fail_table.as_deref() == Some(request.destination.table.as_str());

        Ok(Box::new(RecordingJob {
            id: format!("job-{n}"),
            uri,
            fail,
            recorded: Arc::clone(&self.recorded),
        }))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct RecordingJob {
    id: String,
    uri: String,
    fail: bool,
    recorded: Arc<Mutex<Recorded>>,
}

#[async_trait]
impl LoadJob for RecordingJob {
    fn id(&self) -> &str {
        &self.id
    }

    async fn wait(&mut self) -> Result<(), WarehouseError> {
        tokio::task::yield_now().await;

        if self.fail {
            return Err(WarehouseError::JobFailed {
                job_id: self.id.clone(),
                reason: "invalid".to_string(),
                message: format!("Error while reading data from {}", self.uri),
            });
        }

        self.recorded
            .lock()
            .unwrap()
            .events
            .push(Event::Finished(self.uri.clone()));
        Ok(())
    }
}
