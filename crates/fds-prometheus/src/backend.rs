use std::sync::Arc;

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

use fds_core::{MetricsBackend, PassStatus, WorkloadOutcome};

const NAMESPACE: &str = "fds";

/// Prometheus metrics backend.
///
/// ## Label cardinality
/// All labels are bounded:
/// - `status`: "completed", "cancelled", "aborted"
/// - `outcome`: "compliant", "remediated", "fetch_failed", "update_failed", "cancelled", "aborted"
/// - `stage`: "nodes", "workloads", "pods"
#[derive(Clone)]
pub struct PrometheusMetrics {
    passes: CounterVec,
    pass_duration: HistogramVec,
    workloads: CounterVec,
    fetch_errors: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a backend registering its collectors in `registry`.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let passes = CounterVec::new(
            Opts::new("passes_total", "Reconciliation passes finished").namespace(NAMESPACE),
            &["status"],
        )?;
        registry.register(Box::new(passes.clone()))?;

        let pass_duration = HistogramVec::new(
            HistogramOpts::new("pass_duration_seconds", "Reconciliation pass wall time")
                .namespace(NAMESPACE)
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["status"],
        )?;
        registry.register(Box::new(pass_duration.clone()))?;

        let workloads = CounterVec::new(
            Opts::new("workloads_total", "Workloads processed, by outcome").namespace(NAMESPACE),
            &["outcome"],
        )?;
        registry.register(Box::new(workloads.clone()))?;

        let fetch_errors = CounterVec::new(
            Opts::new("fetch_errors_total", "Failed list calls, by stage").namespace(NAMESPACE),
            &["stage"],
        )?;
        registry.register(Box::new(fetch_errors.clone()))?;

        Ok(Self {
            passes,
            pass_duration,
            workloads,
            fetch_errors,
            registry,
        })
    }

    /// Create a backend with a private registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Gather all metric families.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render all metrics in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Underlying registry, for collectors registered next to these.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_pass(&self, status: PassStatus, duration_ms: u64) {
        let label = status.as_label();
        self.passes.with_label_values(&[label]).inc();
        self.pass_duration
            .with_label_values(&[label])
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_workload(&self, outcome: WorkloadOutcome) {
        self.workloads
            .with_label_values(&[outcome.as_label()])
            .inc();
    }

    fn record_fetch_error(&self, stage: &str) {
        self.fetch_errors.with_label_values(&[stage]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("metric {name} not found"))
    }

    #[test]
    fn record_pass_counts_and_observes_duration() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_pass(PassStatus::Completed, 150);
        metrics.record_pass(PassStatus::Completed, 50);
        metrics.record_pass(PassStatus::Cancelled, 10);

        let families = metrics.gather();
        assert_eq!(family(&families, "fds_passes_total").get_metric().len(), 2);
        assert_eq!(
            family(&families, "fds_pass_duration_seconds").get_metric().len(),
            2
        );
    }

    #[test]
    fn record_workload_labels_by_outcome() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_workload(WorkloadOutcome::Remediated);
        metrics.record_workload(WorkloadOutcome::Remediated);
        metrics.record_workload(WorkloadOutcome::Compliant);

        let families = metrics.gather();
        let workloads = family(&families, "fds_workloads_total");
        assert_eq!(workloads.get_metric().len(), 2);

        let body = metrics.encode().unwrap();
        assert!(body.contains("fds_workloads_total{outcome=\"remediated\"} 2"));
        assert!(body.contains("fds_workloads_total{outcome=\"compliant\"} 1"));
    }

    #[test]
    fn encode_renders_text_format() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_fetch_error("pods");
        metrics.record_pass(PassStatus::Aborted, 5);

        let body = metrics.encode().unwrap();
        assert!(body.contains("fds_fetch_errors_total{stage=\"pods\"} 1"));
        assert!(body.contains("fds_passes_total{status=\"aborted\"} 1"));
    }

    #[test]
    fn shared_registry_sees_collectors() {
        let registry = Arc::new(Registry::new());
        let metrics = PrometheusMetrics::new_with_registry(registry.clone()).unwrap();

        metrics.record_pass(PassStatus::Completed, 1);
        assert!(!registry.gather().is_empty());
        assert!(PrometheusMetrics::new_with_registry(registry).is_err());
    }
}
