//! Reconciliation driver: one complete load → index → evaluate → remediate pass.
//!
//! A pass has two stages:
//! - **Loading**: list nodes and workloads. A failure here aborts the pass and is the
//!   only error returned to the caller.
//! - **Processing**: for each workload, list its pods, evaluate, and restart it if
//!   violating. Workloads run on a bounded pool; any per-workload failure is logged
//!   and the workload skipped.
//!
//! The pass observes a [`CancellationToken`]: loading and pod fetches abort promptly,
//! no new workload is admitted, and the report is marked [`PassStatus::Cancelled`].
//! Updates already submitted are not rolled back.
mod config;
pub use config::{DEFAULT_CONCURRENCY, ReconcilerConfig};

mod report;
pub use report::{PassReport, PassStatus, WorkloadOutcome};

mod loader;

use std::{sync::Arc, time::Instant};

use fds_model::{WORKLOAD_KIND, Workload};
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::{
    cluster::ClusterState,
    error::FetchError,
    evaluator::{Verdict, evaluate},
    metrics::{MetricsHandle, noop_metrics},
    remediation::{Clock, Remediator},
    topology::TopologyIndex,
};

use loader::Snapshot;

/// Single-pass anti-affinity reconciler.
///
/// Holds no state between passes: every call to [`Reconciler::reconcile_once`]
/// re-reads the cluster.
pub struct Reconciler<C: ClusterState> {
    cluster: Arc<C>,
    cfg: ReconcilerConfig,
    remediator: Remediator,
    metrics: MetricsHandle,
}

impl<C: ClusterState> Reconciler<C> {
    /// Create a reconciler over the given cluster client.
    pub fn new(cluster: Arc<C>, cfg: ReconcilerConfig) -> Self {
        Self {
            cluster,
            cfg,
            remediator: Remediator::default(),
            metrics: noop_metrics(),
        }
    }

    /// Replace the metrics backend.
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replace the clock used for restart timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.remediator = Remediator::new(clock);
        self
    }

    /// Run one reconciliation pass.
    ///
    /// Returns `Err` only if nodes or workloads could not be listed.
    /// Per-workload failures are logged and counted in the report.
    #[instrument(level = "info", skip_all, fields(namespace = %self.cfg.namespace))]
    pub async fn reconcile_once(&self, ctx: &CancellationToken) -> Result<PassReport, FetchError> {
        let started = Instant::now();
        debug!("loading cluster state");

        let snapshot =
            match loader::load_snapshot(self.cluster.as_ref(), &self.cfg.namespace, ctx).await {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => {
                    warn!("pass cancelled while loading cluster state");
                    let report = PassReport::cancelled_before_processing();
                    self.finish(&report, started);
                    return Ok(report);
                }
                Err(e) => {
                    self.metrics.record_fetch_error(e.stage());
                    self.metrics
                        .record_pass(PassStatus::Aborted, elapsed_ms(started));
                    return Err(e);
                }
            };

        let report = self.process(snapshot, ctx).await;
        self.finish(&report, started);
        Ok(report)
    }

    async fn process(&self, snapshot: Snapshot, ctx: &CancellationToken) -> PassReport {
        let Snapshot { index, workloads } = snapshot;
        let total = workloads.len();
        let index = Arc::new(index);
        let permits = Arc::new(Semaphore::new(self.cfg.workers()));

        let mut report = PassReport::new(total);
        let mut tasks = JoinSet::new();
        let mut admitted = 0usize;

        for workload in workloads {
            let permit = tokio::select! {
                biased;
                _ = ctx.cancelled() => None,
                permit = Arc::clone(&permits).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                break;
            };
            admitted += 1;

            let job = WorkloadJob {
                cluster: Arc::clone(&self.cluster),
                index: Arc::clone(&index),
                remediator: self.remediator.clone(),
                metrics: Arc::clone(&self.metrics),
                ctx: ctx.clone(),
            };
            tasks.spawn(
                async move {
                    let outcome = job.run(workload).await;
                    drop(permit);
                    outcome
                }
                .in_current_span(),
            );
        }

        let never_started = total - admitted;
        if never_started > 0 {
            warn!(never_started, "pass cancelled before every workload was admitted");
        }
        report.cancelled += never_started;

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap_or_else(|e| {
                error!(error = %e, "workload task terminated unexpectedly");
                WorkloadOutcome::Aborted
            });
            self.metrics.record_workload(outcome);
            report.record(outcome);
        }

        if report.cancelled > 0 {
            report.status = PassStatus::Cancelled;
        }
        report
    }

    fn finish(&self, report: &PassReport, started: Instant) {
        let duration_ms = elapsed_ms(started);
        self.metrics.record_pass(report.status, duration_ms);
        info!(
            status = report.status.as_label(),
            workloads = report.workloads,
            compliant = report.compliant,
            remediated = report.remediated,
            skipped = report.skipped,
            cancelled = report.cancelled,
            duration_ms,
            "reconciliation pass finished"
        );
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Everything one workload's resolve → evaluate → remediate sequence needs.
///
/// Reads only the shared immutable index and writes only its own workload.
struct WorkloadJob<C: ClusterState> {
    cluster: Arc<C>,
    index: Arc<TopologyIndex>,
    remediator: Remediator,
    metrics: MetricsHandle,
    ctx: CancellationToken,
}

impl<C: ClusterState> WorkloadJob<C> {
    #[instrument(level = "debug", skip_all, fields(workload = %workload.reference()))]
    async fn run(self, workload: Workload) -> WorkloadOutcome {
        let pods = match loader::load_pods(self.cluster.as_ref(), &workload, &self.ctx).await {
            Ok(Some(pods)) => pods,
            Ok(None) => return WorkloadOutcome::Cancelled,
            Err(e) => {
                self.metrics.record_fetch_error(e.stage());
                warn!(
                    selector = %workload.selector,
                    error = %e,
                    "failed to list pods, skipping workload"
                );
                return WorkloadOutcome::FetchFailed;
            }
        };

        match evaluate(&pods, &self.index) {
            Verdict::Compliant => {
                debug!(pods = pods.len(), "no anti-affinity violation");
                WorkloadOutcome::Compliant
            }
            Verdict::Violating => {
                if self.ctx.is_cancelled() {
                    return WorkloadOutcome::Cancelled;
                }
                info!(kind = WORKLOAD_KIND, "anti-affinity violation found, restarting");

                match self
                    .remediator
                    .restart(self.cluster.as_ref(), &workload)
                    .await
                {
                    Ok(stamp) => {
                        info!(restarted_at = %stamp, "restart submitted");
                        WorkloadOutcome::Remediated
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to restart workload, skipping");
                        WorkloadOutcome::UpdateFailed
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCluster, FixedClock, RecordingMetrics};
    use fds_model::{
        AntiAffinityTerm, LabelSelector, Node, Pod, RESTARTED_AT_ANNOTATION, Workload,
    };

    fn selector(app: &str) -> LabelSelector {
        LabelSelector::from_labels([("app", app)].into_iter().collect())
    }

    fn workload(name: &str) -> Workload {
        Workload::new("default", name, selector(name))
    }

    fn guarded_pod(app: &str, name: &str, node: &str) -> Pod {
        Pod::new("default", name)
            .on_node(node)
            .with_label("app", app)
            .with_anti_affinity(AntiAffinityTerm::new(selector(app), "zone"))
    }

    fn nodes(node2_zone: &str) -> Vec<Node> {
        vec![
            Node::new("node1").with_label("zone", "z1"),
            Node::new("node2").with_label("zone", node2_zone),
        ]
    }

    fn reconciler(cluster: FakeCluster) -> (Arc<FakeCluster>, Reconciler<FakeCluster>) {
        let cluster = Arc::new(cluster);
        let r = Reconciler::new(Arc::clone(&cluster), ReconcilerConfig::default())
            .with_clock(Arc::new(FixedClock(1_700_000_000)));
        (cluster, r)
    }

    #[tokio::test]
    async fn scenario_a_same_zone_is_restarted_once() {
        let (cluster, r) = reconciler(
            FakeCluster::new().with_nodes(nodes("z1")).with_workload(
                workload("web"),
                vec![
                    guarded_pod("web", "a", "node1"),
                    Pod::new("default", "b").on_node("node2").with_label("app", "web"),
                ],
            ),
        );

        let report = r.reconcile_once(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.status, PassStatus::Completed);
        assert_eq!(report.remediated, 1);

        let updates = cluster.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].name, "web");
        assert_eq!(
            updates[0].template_annotations.get(RESTARTED_AT_ANNOTATION),
            Some("2023-11-14T22:13:20Z")
        );
    }

    #[tokio::test]
    async fn scenario_b_different_zones_is_left_alone() {
        let (cluster, r) = reconciler(
            FakeCluster::new().with_nodes(nodes("z2")).with_workload(
                workload("web"),
                vec![guarded_pod("web", "a", "node1"), guarded_pod("web", "b", "node2")],
            ),
        );

        let report = r.reconcile_once(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.compliant, 1);
        assert_eq!(report.remediated, 0);
        assert!(cluster.updates().is_empty());
    }

    #[tokio::test]
    async fn scenario_c_node_listing_failure_is_fatal() {
        let (cluster, r) = reconciler(
            FakeCluster::new()
                .with_nodes(nodes("z1"))
                .with_workload(
                    workload("web"),
                    vec![guarded_pod("web", "a", "node1"), guarded_pod("web", "b", "node2")],
                )
                .fail_nodes(),
        );

        let res = r.reconcile_once(&CancellationToken::new()).await;
        assert!(matches!(res, Err(FetchError::Nodes(_))));
        assert_eq!(cluster.pod_lists(), 0);
        assert!(cluster.updates().is_empty());
    }

    #[tokio::test]
    async fn workload_listing_failure_is_fatal() {
        let (cluster, r) = reconciler(FakeCluster::new().with_nodes(nodes("z1")).fail_workloads());

        let res = r.reconcile_once(&CancellationToken::new()).await;
        assert!(matches!(res, Err(FetchError::Workloads(_))));
        assert!(cluster.updates().is_empty());
    }

    #[tokio::test]
    async fn scenario_d_pod_listing_failure_skips_only_that_workload() {
        let w1 = workload("w1");
        let (cluster, r) = reconciler(
            FakeCluster::new()
                .with_nodes(nodes("z1"))
                .with_workload(w1.clone(), vec![])
                .fail_pods(&w1)
                .with_workload(
                    workload("w2"),
                    vec![guarded_pod("w2", "a", "node1"), guarded_pod("w2", "b", "node2")],
                ),
        );

        let report = r.reconcile_once(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.status, PassStatus::Completed);
        assert_eq!(report.workloads, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.remediated, 1);

        let updates = cluster.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].name, "w2");
    }

    #[tokio::test]
    async fn update_failure_does_not_fail_the_pass() {
        let (cluster, r) = reconciler(
            FakeCluster::new()
                .with_nodes(nodes("z1"))
                .with_workload(
                    workload("w1"),
                    vec![guarded_pod("w1", "a", "node1"), guarded_pod("w1", "b", "node2")],
                )
                .with_workload(
                    workload("w2"),
                    vec![guarded_pod("w2", "a", "node1"), guarded_pod("w2", "b", "node2")],
                )
                .fail_update("default", "w1"),
        );

        let report = r.reconcile_once(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.status, PassStatus::Completed);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.remediated, 1);
        assert_eq!(cluster.updates().len(), 1);
    }

    #[tokio::test]
    async fn update_called_exactly_once_per_flagged_workload() {
        let mut cluster = FakeCluster::new().with_nodes(nodes("z1"));
        for i in 0..10 {
            let app = format!("app{i}");
            let pods = if i % 2 == 0 {
                vec![guarded_pod(&app, "a", "node1"), guarded_pod(&app, "b", "node2")]
            } else {
                vec![guarded_pod(&app, "a", "node1")]
            };
            cluster = cluster.with_workload(workload(&app), pods);
        }
        let cluster = Arc::new(cluster);
        let r = Reconciler::new(
            Arc::clone(&cluster),
            ReconcilerConfig {
                concurrency: 3,
                ..Default::default()
            },
        );

        let report = r.reconcile_once(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.remediated, 5);
        assert_eq!(report.compliant, 5);

        let mut names: Vec<_> = cluster.updates().into_iter().map(|w| w.name).collect();
        names.sort();
        assert_eq!(names, vec!["app0", "app2", "app4", "app6", "app8"]);
    }

    #[tokio::test]
    async fn every_pass_re_reads_state_and_re_triggers() {
        let (cluster, r) = reconciler(
            FakeCluster::new().with_nodes(nodes("z1")).with_workload(
                workload("web"),
                vec![guarded_pod("web", "a", "node1"), guarded_pod("web", "b", "node2")],
            ),
        );

        r.reconcile_once(&CancellationToken::new()).await.unwrap();
        r.reconcile_once(&CancellationToken::new()).await.unwrap();
        assert_eq!(cluster.updates().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_before_start_touches_nothing() {
        let (cluster, r) = reconciler(
            FakeCluster::new().with_nodes(nodes("z1")).with_workload(
                workload("web"),
                vec![guarded_pod("web", "a", "node1"), guarded_pod("web", "b", "node2")],
            ),
        );
        let ctx = CancellationToken::new();
        ctx.cancel();

        let report = r.reconcile_once(&ctx).await.unwrap();
        assert_eq!(report.status, PassStatus::Cancelled);
        assert_eq!(report.attempted(), 0);
        assert_eq!(cluster.pod_lists(), 0);
        assert!(cluster.updates().is_empty());
    }

    #[tokio::test]
    async fn cancellation_mid_pass_stops_admitting_workloads() {
        let ctx = CancellationToken::new();
        let mut cluster = FakeCluster::new()
            .with_nodes(nodes("z1"))
            .cancel_on_first_pod_list(ctx.clone());
        for app in ["w1", "w2", "w3"] {
            cluster = cluster.with_workload(
                workload(app),
                vec![guarded_pod(app, "a", "node1"), guarded_pod(app, "b", "node2")],
            );
        }
        let cluster = Arc::new(cluster);
        let r = Reconciler::new(
            Arc::clone(&cluster),
            ReconcilerConfig {
                concurrency: 1,
                ..Default::default()
            },
        );

        let report = r.reconcile_once(&ctx).await.unwrap();
        assert_eq!(report.status, PassStatus::Cancelled);
        assert_eq!(report.workloads, 3);
        assert_eq!(report.cancelled, 3);
        assert_eq!(cluster.pod_lists(), 1);
        assert!(cluster.updates().is_empty());
    }

    #[tokio::test]
    async fn metrics_observe_pass_and_workloads() {
        let metrics = Arc::new(RecordingMetrics::default());
        let w1 = workload("w1");
        let cluster = Arc::new(
            FakeCluster::new()
                .with_nodes(nodes("z1"))
                .with_workload(w1.clone(), vec![])
                .fail_pods(&w1)
                .with_workload(
                    workload("w2"),
                    vec![guarded_pod("w2", "a", "node1"), guarded_pod("w2", "b", "node2")],
                ),
        );
        let r = Reconciler::new(cluster, ReconcilerConfig::default()).with_metrics(metrics.clone());

        r.reconcile_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(metrics.passes(), vec![PassStatus::Completed]);
        let mut outcomes = metrics.workloads();
        outcomes.sort_by_key(|o| o.as_label());
        assert_eq!(
            outcomes,
            vec![WorkloadOutcome::FetchFailed, WorkloadOutcome::Remediated]
        );
        assert_eq!(metrics.fetch_errors(), vec!["pods".to_string()]);
    }

    #[tokio::test]
    async fn aborted_pass_is_recorded() {
        let metrics = Arc::new(RecordingMetrics::default());
        let cluster = Arc::new(FakeCluster::new().with_nodes(nodes("z1")).fail_workloads());
        let r = Reconciler::new(cluster, ReconcilerConfig::default()).with_metrics(metrics.clone());

        assert!(r.reconcile_once(&CancellationToken::new()).await.is_err());

        assert_eq!(metrics.passes(), vec![PassStatus::Aborted]);
        assert_eq!(metrics.fetch_errors(), vec!["workloads".to_string()]);
        assert!(metrics.workloads().is_empty());
    }
}
