use std::sync::Arc;

use crate::reconciler::{PassStatus, WorkloadOutcome};

/// Backend metrics collection interface.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record the end of a reconciliation pass.
    ///
    /// # Arguments
    /// - `status`: whether the pass completed or was cancelled
    /// - `duration_ms`: wall time of the pass in milliseconds
    fn record_pass(&self, status: PassStatus, duration_ms: u64);
    /// Record the outcome of one workload within a pass.
    fn record_workload(&self, outcome: WorkloadOutcome);
    /// Record a failed list call.
    ///
    /// `stage` is one of `"nodes"`, `"workloads"`, `"pods"`.
    fn record_fetch_error(&self, stage: &str);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
