use fds_model::{Pod, Workload};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::{cluster::ClusterState, error::FetchError, topology::TopologyIndex};

/// Cluster-wide part of the snapshot, loaded once per pass.
#[derive(Debug)]
pub(crate) struct Snapshot {
    pub(crate) index: TopologyIndex,
    pub(crate) workloads: Vec<Workload>,
}

/// Load nodes and workloads.
///
/// Returns `Ok(None)` if cancelled before both lists were fetched.
pub(crate) async fn load_snapshot<C>(
    cluster: &C,
    namespace: &str,
    ctx: &CancellationToken,
) -> Result<Option<Snapshot>, FetchError>
where
    C: ClusterState + ?Sized,
{
    let nodes = tokio::select! {
        biased;
        _ = ctx.cancelled() => return Ok(None),
        res = cluster.list_nodes() => res,
    };
    let nodes = nodes.inspect_err(|e| error!(error = %e, "failed to list nodes"))?;

    let index = TopologyIndex::from_nodes(nodes);

    let workloads = tokio::select! {
        biased;
        _ = ctx.cancelled() => return Ok(None),
        res = cluster.list_workloads(namespace) => res,
    };
    let workloads =
        workloads.inspect_err(|e| error!(error = %e, "failed to list workloads"))?;

    debug!(
        nodes = index.len(),
        workloads = workloads.len(),
        "cluster snapshot loaded"
    );
    Ok(Some(Snapshot { index, workloads }))
}

/// Fetch the current pod set of one workload.
///
/// Returns `Ok(None)` if cancelled while the request was in flight.
pub(crate) async fn load_pods<C>(
    cluster: &C,
    workload: &Workload,
    ctx: &CancellationToken,
) -> Result<Option<Vec<Pod>>, FetchError>
where
    C: ClusterState + ?Sized,
{
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Ok(None),
        res = cluster.list_pods(&workload.namespace, &workload.selector) => res.map(Some),
    }
}
