use crate::metrics::backend::MetricsBackend;
use crate::reconciler::{PassStatus, WorkloadOutcome};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_pass(&self, _: PassStatus, _: u64) {}

    #[inline(always)]
    fn record_workload(&self, _: WorkloadOutcome) {}

    #[inline(always)]
    fn record_fetch_error(&self, _: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_metrics_is_zero_size() {
        assert_eq!(std::mem::size_of::<NoOpMetrics>(), 0);
    }

    #[test]
    fn noop_can_be_called_repeatedly() {
        let metrics = NoOpMetrics;
        for _ in 0..1000 {
            metrics.record_pass(PassStatus::Completed, 10);
            metrics.record_workload(WorkloadOutcome::Remediated);
            metrics.record_fetch_error("pods");
        }
    }
}
