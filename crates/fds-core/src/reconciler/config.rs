use serde::{Deserialize, Serialize};

/// Default number of workloads processed concurrently.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Reconciler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Namespace to reconcile; empty means all namespaces.
    pub namespace: String,
    /// Maximum number of workloads evaluated/remediated at the same time.
    ///
    /// Values below 1 are treated as 1.
    pub concurrency: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ReconcilerConfig {
    /// Effective worker pool size.
    pub fn workers(&self) -> usize {
        self.concurrency.max(1)
    }
}
