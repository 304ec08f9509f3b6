//! Supervised periodic reconciliation.
//!
//! One taskvisor attempt is one pass. After a completed pass the supervisor waits
//! `interval` before the next one; a pass aborted by a fetch error is retried after
//! the same delay. Shutdown signals are handled by the supervisor, which cancels the
//! running pass through its token.
use std::{sync::Arc, time::Duration};

use taskvisor::{
    BackoffPolicy, JitterPolicy, RestartPolicy, Subscribe, Supervisor, SupervisorConfig,
    TaskError, TaskFn, TaskRef, TaskSpec,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use fds_core::{ClusterState, FetchError, PassReport, Reconciler};
use fds_observe::PassEventLogger;

/// Name of the supervised reconciliation task.
pub const RECONCILE_TASK_NAME: &str = "fds-reconcile";

/// Build the supervised task running one pass per attempt.
pub fn reconcile_spec<C: ClusterState>(
    reconciler: Arc<Reconciler<C>>,
    interval: Duration,
    pass_timeout: Duration,
) -> TaskSpec {
    let task: TaskRef = TaskFn::arc(RECONCILE_TASK_NAME, move |ctx: CancellationToken| {
        let reconciler = Arc::clone(&reconciler);
        async move { attempt_result(reconciler.reconcile_once(&ctx).await) }
    });

    let backoff = BackoffPolicy {
        first: interval,
        max: interval,
        factor: 1.0,
        jitter: JitterPolicy::None,
    };
    TaskSpec::new(
        task,
        RestartPolicy::Always {
            interval: Some(interval),
        },
        backoff,
        Some(pass_timeout),
    )
}

/// Map a pass onto a supervised attempt.
///
/// A cancelled pass only happens on shutdown, and `Canceled` stops the task for good.
fn attempt_result(pass: Result<PassReport, FetchError>) -> Result<(), TaskError> {
    match pass {
        Ok(report) if report.is_complete() => Ok(()),
        Ok(_) => Err(TaskError::Canceled),
        Err(e) => Err(TaskError::Fail {
            reason: e.to_string(),
        }),
    }
}

/// Run passes until the process receives a shutdown signal.
pub async fn run<C: ClusterState>(
    reconciler: Arc<Reconciler<C>>,
    interval: Duration,
    pass_timeout: Duration,
) -> anyhow::Result<()> {
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(PassEventLogger)];
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_subscribers(subscribers)
        .build();

    info!(
        interval_secs = interval.as_secs(),
        timeout_secs = pass_timeout.as_secs(),
        "starting periodic reconciliation"
    );
    sup.run(vec![reconcile_spec(reconciler, interval, pass_timeout)])
        .await
        .map_err(|e| anyhow::anyhow!("supervisor exited with error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use fds_core::{ReconcilerConfig, UpdateError};
    use fds_model::{LabelSelector, Node, Pod, Workload};

    #[derive(Default)]
    struct EmptyCluster {
        fail_nodes: bool,
        node_lists: AtomicUsize,
    }

    #[async_trait]
    impl ClusterState for EmptyCluster {
        async fn list_nodes(&self) -> Result<Vec<Node>, FetchError> {
            self.node_lists.fetch_add(1, Ordering::SeqCst);
            if self.fail_nodes {
                return Err(FetchError::Nodes("connection refused".into()));
            }
            Ok(vec![Node::new("node1").with_label("zone", "z1")])
        }

        async fn list_workloads(&self, _namespace: &str) -> Result<Vec<Workload>, FetchError> {
            Ok(Vec::new())
        }

        async fn list_pods(
            &self,
            _namespace: &str,
            _selector: &LabelSelector,
        ) -> Result<Vec<Pod>, FetchError> {
            Ok(Vec::new())
        }

        async fn update_workload(&self, _workload: &Workload) -> Result<(), UpdateError> {
            Ok(())
        }
    }

    fn spec(cluster: EmptyCluster) -> (Arc<EmptyCluster>, TaskSpec) {
        let cluster = Arc::new(cluster);
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&cluster),
            ReconcilerConfig::default(),
        ));
        let spec = reconcile_spec(reconciler, Duration::from_secs(60), Duration::from_secs(5));
        (cluster, spec)
    }

    #[test]
    fn spec_repeats_every_interval() {
        let (_, spec) = spec(EmptyCluster::default());

        assert_eq!(spec.name(), RECONCILE_TASK_NAME);
        assert!(matches!(
            spec.restart(),
            RestartPolicy::Always { interval: Some(d) } if d == Duration::from_secs(60)
        ));
        assert_eq!(spec.backoff().first, Duration::from_secs(60));
        assert_eq!(spec.backoff().max, Duration::from_secs(60));
        assert_eq!(spec.timeout(), Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn completed_pass_is_a_successful_attempt() {
        let (cluster, spec) = spec(EmptyCluster::default());

        let res = spec.task().spawn(CancellationToken::new()).await;
        assert!(res.is_ok());
        assert_eq!(cluster.node_lists.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_error_fails_the_attempt() {
        let (_, spec) = spec(EmptyCluster {
            fail_nodes: true,
            ..Default::default()
        });

        match spec.task().spawn(CancellationToken::new()).await {
            Err(TaskError::Fail { reason }) => assert!(reason.contains("connection refused")),
            other => panic!("unexpected attempt result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_pass_is_a_cancelled_attempt() {
        let (cluster, spec) = spec(EmptyCluster::default());
        let ctx = CancellationToken::new();
        ctx.cancel();

        let res = spec.task().spawn(ctx).await;
        assert!(matches!(res, Err(TaskError::Canceled)));
        assert_eq!(cluster.node_lists.load(Ordering::SeqCst), 0);
    }
}
