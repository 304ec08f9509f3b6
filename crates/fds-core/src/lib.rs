pub mod cluster;
pub mod error;
pub mod evaluator;
pub mod metrics;
pub mod reconciler;
pub mod remediation;
pub mod topology;

#[cfg(test)]
mod testing;

pub use cluster::ClusterState;
pub use error::{FetchError, UpdateError};
pub use evaluator::{SelectorCache, Verdict, evaluate};
pub use metrics::{MetricsBackend, MetricsHandle, NoOpMetrics, noop_metrics};
pub use reconciler::{PassReport, PassStatus, Reconciler, ReconcilerConfig, WorkloadOutcome};
pub use remediation::{Clock, Remediator, SystemClock, restart_stamp};
pub use topology::{TopologyIndex, TopologyValue};

pub mod prelude {
    pub use crate::cluster::ClusterState;
    pub use crate::error::{FetchError, UpdateError};
    pub use crate::reconciler::{PassReport, Reconciler, ReconcilerConfig};
}
