use std::fmt;

/// Final state of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    /// Every workload was attempted.
    Completed,
    /// The pass was interrupted by the cancellation token.
    Cancelled,
    /// Nodes or workloads could not be listed.
    ///
    /// Only reported to metrics: the caller receives the error instead of a report.
    Aborted,
}

impl PassStatus {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            PassStatus::Completed => "completed",
            PassStatus::Cancelled => "cancelled",
            PassStatus::Aborted => "aborted",
        }
    }
}

/// Outcome of one workload within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadOutcome {
    /// Evaluated, no violation.
    Compliant,
    /// Violation found and the restart update was submitted.
    Remediated,
    /// Pod listing failed; skipped.
    FetchFailed,
    /// Violation found but the restart update failed; skipped.
    UpdateFailed,
    /// Stopped by cancellation before completion.
    Cancelled,
    /// The worker task died unexpectedly.
    Aborted,
}

impl WorkloadOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkloadOutcome::Compliant => "compliant",
            WorkloadOutcome::Remediated => "remediated",
            WorkloadOutcome::FetchFailed => "fetch_failed",
            WorkloadOutcome::UpdateFailed => "update_failed",
            WorkloadOutcome::Cancelled => "cancelled",
            WorkloadOutcome::Aborted => "aborted",
        }
    }
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub status: PassStatus,
    /// Workloads listed during loading.
    pub workloads: usize,
    pub compliant: usize,
    pub remediated: usize,
    /// Workloads skipped because of a per-workload error.
    pub skipped: usize,
    /// Workloads not finished because of cancellation (including never started).
    pub cancelled: usize,
}

impl PassReport {
    pub(crate) fn new(workloads: usize) -> Self {
        Self {
            status: PassStatus::Completed,
            workloads,
            compliant: 0,
            remediated: 0,
            skipped: 0,
            cancelled: 0,
        }
    }

    pub(crate) fn cancelled_before_processing() -> Self {
        Self {
            status: PassStatus::Cancelled,
            ..Self::new(0)
        }
    }

    pub(crate) fn record(&mut self, outcome: WorkloadOutcome) {
        match outcome {
            WorkloadOutcome::Compliant => self.compliant += 1,
            WorkloadOutcome::Remediated => self.remediated += 1,
            WorkloadOutcome::FetchFailed
            | WorkloadOutcome::UpdateFailed
            | WorkloadOutcome::Aborted => self.skipped += 1,
            WorkloadOutcome::Cancelled => self.cancelled += 1,
        }
    }

    /// Number of workloads whose sequence ran to an outcome other than cancellation.
    pub fn attempted(&self) -> usize {
        self.compliant + self.remediated + self.skipped
    }

    /// Returns `true` if every workload was attempted.
    pub fn is_complete(&self) -> bool {
        self.status == PassStatus::Completed
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PassReport(status={}, workloads={}, compliant={}, remediated={}, skipped={}, cancelled={})",
            self.status.as_label(),
            self.workloads,
            self.compliant,
            self.remediated,
            self.skipped,
            self.cancelled,
        )
    }
}
