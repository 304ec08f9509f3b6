use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;

use fds_core::{ReconcilerConfig, reconciler::DEFAULT_CONCURRENCY};
use fds_observe::LoggerTimeZone;

/// Restart deployments whose pods violate their required pod anti-affinity.
#[derive(Debug, Parser)]
#[command(name = "fds-agentd", version)]
pub struct Cli {
    /// Kubeconfig file; falls back to in-cluster, KUBECONFIG, then ~/.kube/config.
    #[arg(long, env = "FDS_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Namespace to reconcile; all namespaces when empty.
    #[arg(long, env = "FDS_NAMESPACE", default_value = "")]
    pub namespace: String,

    /// Workloads evaluated concurrently.
    #[arg(long, env = "FDS_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Seconds between passes. Runs a single pass and exits when absent.
    #[arg(long, env = "FDS_INTERVAL", value_parser = parse_secs)]
    pub interval: Option<Duration>,

    /// Upper bound for one pass in periodic mode, in seconds.
    #[arg(long, env = "FDS_PASS_TIMEOUT", value_parser = parse_secs, default_value = "300")]
    pub pass_timeout: Duration,

    /// Log output: text, json or journald.
    #[arg(long, env = "FDS_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log filter, e.g. `info` or `fds_core=debug,info`.
    #[arg(long, env = "FDS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Timezone of log timestamps: utc or local.
    #[arg(long, env = "FDS_LOG_TZ", default_value = "utc")]
    pub log_tz: LoggerTimeZone,

    /// Serve Prometheus metrics on this address (e.g. 0.0.0.0:9090).
    #[arg(long, env = "FDS_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            namespace: self.namespace.clone(),
            concurrency: self.concurrency,
        }
    }
}

fn parse_secs(s: &str) -> Result<Duration, String> {
    let secs: u64 = s
        .trim()
        .parse()
        .map_err(|e| format!("expected whole seconds: {e}"))?;
    if secs == 0 {
        return Err("must be at least 1 second".into());
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_once_across_all_namespaces() {
        let cli = Cli::try_parse_from(["fds-agentd"]).unwrap();
        assert!(cli.interval.is_none());
        assert!(cli.kubeconfig.is_none());
        assert!(cli.metrics_addr.is_none());
        assert_eq!(cli.pass_timeout, Duration::from_secs(300));
        assert_eq!(cli.log_tz, LoggerTimeZone::Utc);

        let cfg = cli.reconciler_config();
        assert_eq!(cfg.namespace, "");
        assert_eq!(cfg.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn periodic_flags() {
        let cli = Cli::try_parse_from([
            "fds-agentd",
            "--namespace",
            "prod",
            "--interval",
            "60",
            "--concurrency",
            "8",
            "--metrics-addr",
            "127.0.0.1:9090",
            "--log-format",
            "json",
            "--log-tz",
            "local",
        ])
        .unwrap();
        assert_eq!(cli.interval, Some(Duration::from_secs(60)));
        assert_eq!(cli.reconciler_config().namespace, "prod");
        assert_eq!(cli.reconciler_config().concurrency, 8);
        assert_eq!(cli.metrics_addr, Some("127.0.0.1:9090".parse().unwrap()));
        assert_eq!(cli.log_format, "json");
        assert_eq!(cli.log_tz, LoggerTimeZone::Local);
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(Cli::try_parse_from(["fds-agentd", "--interval", "0"]).is_err());
        assert!(Cli::try_parse_from(["fds-agentd", "--interval", "soon"]).is_err());
    }
}
