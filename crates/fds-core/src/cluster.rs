//! Read/write interface over live cluster state consumed by the reconciler.
//!
//! Concrete clients (the REST adapter, in-memory fakes) implement [`ClusterState`]
//! and are injected into [`crate::Reconciler`] as an explicit dependency.
use async_trait::async_trait;

use fds_model::{LabelSelector, Node, Pod, Workload};

use crate::error::{FetchError, UpdateError};

/// Cluster state collaborator.
///
/// Every call reads live state; implementations must not cache across calls.
#[async_trait]
pub trait ClusterState: Send + Sync + 'static {
    /// List every node in the cluster.
    async fn list_nodes(&self) -> Result<Vec<Node>, FetchError>;

    /// List workloads in `namespace` (`""` means all namespaces).
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<Workload>, FetchError>;

    /// List pods in `namespace` matched by `selector`.
    async fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Pod>, FetchError>;

    /// Submit a full update of the workload.
    async fn update_workload(&self, workload: &Workload) -> Result<(), UpdateError>;
}
