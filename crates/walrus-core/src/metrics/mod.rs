//! Metrics infrastructure.
//!
//! - `events`: the `InternalEvent` trait and storage-level events
//! - `recorder`: Prometheus recorder setup and textfile export

pub mod events;
pub mod recorder;

pub use recorder::{MetricsController, init_global};

/// Emit a metric event.
///
/// Calls `InternalEvent::emit()` on the given event, which records the
/// corresponding counter, gauge or histogram.
///
/// ```ignore
/// use walrus_core::emit;
/// use walrus_core::metrics::events::{RequestStatus, StorageOperation, StorageRequest};
///
/// emit!(StorageRequest { operation: StorageOperation::List, status: RequestStatus::Success });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
