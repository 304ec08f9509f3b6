//! In-memory collaborators for unit tests.
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use fds_model::{LabelSelector, Node, Pod, Workload};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::{
    cluster::ClusterState,
    error::{FetchError, UpdateError},
    metrics::MetricsBackend,
    reconciler::{PassStatus, WorkloadOutcome},
    remediation::Clock,
};

type PodKey = (String, String);

/// Scripted cluster: fixed lists, injectable failures, recorded updates.
#[derive(Default)]
pub(crate) struct FakeCluster {
    nodes: Vec<Node>,
    workloads: Vec<Workload>,
    pods: HashMap<PodKey, Vec<Pod>>,
    fail_nodes: bool,
    fail_workloads: bool,
    fail_pods: HashSet<PodKey>,
    fail_updates: HashSet<(String, String)>,
    cancel_on_pods: Option<CancellationToken>,
    pod_lists: AtomicUsize,
    updates: Mutex<Vec<Workload>>,
}

fn pod_key(namespace: &str, selector: &LabelSelector) -> PodKey {
    (namespace.to_string(), selector.to_query())
}

impl FakeCluster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_nodes(mut self, nodes: Vec<Node>) -> Self {
        self.nodes = nodes;
        self
    }

    /// Add a workload and the pods its selector resolves to.
    pub(crate) fn with_workload(mut self, workload: Workload, pods: Vec<Pod>) -> Self {
        self.pods
            .insert(pod_key(&workload.namespace, &workload.selector), pods);
        self.workloads.push(workload);
        self
    }

    pub(crate) fn fail_nodes(mut self) -> Self {
        self.fail_nodes = true;
        self
    }

    pub(crate) fn fail_workloads(mut self) -> Self {
        self.fail_workloads = true;
        self
    }

    pub(crate) fn fail_pods(mut self, workload: &Workload) -> Self {
        self.fail_pods
            .insert(pod_key(&workload.namespace, &workload.selector));
        self
    }

    pub(crate) fn fail_update(mut self, namespace: &str, name: &str) -> Self {
        self.fail_updates
            .insert((namespace.to_string(), name.to_string()));
        self
    }

    /// Cancel `token` as soon as the first pod list is served.
    pub(crate) fn cancel_on_first_pod_list(mut self, token: CancellationToken) -> Self {
        self.cancel_on_pods = Some(token);
        self
    }

    pub(crate) fn pod_lists(&self) -> usize {
        self.pod_lists.load(Ordering::SeqCst)
    }

    pub(crate) fn updates(&self) -> Vec<Workload> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterState for FakeCluster {
    async fn list_nodes(&self) -> Result<Vec<Node>, FetchError> {
        if self.fail_nodes {
            return Err(FetchError::Nodes("connection refused".into()));
        }
        Ok(self.nodes.clone())
    }

    async fn list_workloads(&self, namespace: &str) -> Result<Vec<Workload>, FetchError> {
        if self.fail_workloads {
            return Err(FetchError::Workloads("connection refused".into()));
        }
        Ok(self
            .workloads
            .iter()
            .filter(|w| namespace.is_empty() || w.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Pod>, FetchError> {
        self.pod_lists.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = &self.cancel_on_pods {
            token.cancel();
        }

        let key = pod_key(namespace, selector);
        if self.fail_pods.contains(&key) {
            return Err(FetchError::Pods {
                namespace: namespace.to_string(),
                selector: key.1,
                reason: "timeout".into(),
            });
        }
        Ok(self.pods.get(&key).cloned().unwrap_or_default())
    }

    async fn update_workload(&self, workload: &Workload) -> Result<(), UpdateError> {
        let id = (workload.namespace.clone(), workload.name.clone());
        if self.fail_updates.contains(&id) {
            return Err(UpdateError::Conflict(format!("{}/{}", id.0, id.1)));
        }
        self.updates.lock().unwrap().push(workload.clone());
        Ok(())
    }
}

/// Clock pinned to a unix timestamp in seconds.
pub(crate) struct FixedClock(pub(crate) i64);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.0).unwrap()
    }
}

/// Metrics backend that remembers every call.
#[derive(Default)]
pub(crate) struct RecordingMetrics {
    passes: Mutex<Vec<PassStatus>>,
    workloads: Mutex<Vec<WorkloadOutcome>>,
    fetch_errors: Mutex<Vec<String>>,
}

impl RecordingMetrics {
    pub(crate) fn passes(&self) -> Vec<PassStatus> {
        self.passes.lock().unwrap().clone()
    }

    pub(crate) fn workloads(&self) -> Vec<WorkloadOutcome> {
        self.workloads.lock().unwrap().clone()
    }

    pub(crate) fn fetch_errors(&self) -> Vec<String> {
        self.fetch_errors.lock().unwrap().clone()
    }
}

impl MetricsBackend for RecordingMetrics {
    fn record_pass(&self, status: PassStatus, _: u64) {
        self.passes.lock().unwrap().push(status);
    }

    fn record_workload(&self, outcome: WorkloadOutcome) {
        self.workloads.lock().unwrap().push(outcome);
    }

    fn record_fetch_error(&self, stage: &str) {
        self.fetch_errors.lock().unwrap().push(stage.to_string());
    }
}
