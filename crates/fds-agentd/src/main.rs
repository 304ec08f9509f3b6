use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use fds_core::{ClusterState, Reconciler};
use fds_kube::{KubeClient, KubeConfig};
use fds_observe::{LoggerConfig, LoggerTimeZone, init_local_offset, init_logger};
use fds_prometheus::PrometheusMetrics;

mod cli;
mod metrics_server;
mod periodic;

use cli::Cli;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // local offset detection only works while the process is single-threaded
    if cli.log_tz == LoggerTimeZone::Local {
        init_local_offset();
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    // 1) logger
    let mut log_cfg = LoggerConfig::from_args(&cli.log_format, &cli.log_level)?;
    log_cfg.tz = cli.log_tz;
    init_logger(&log_cfg)?;

    // 2) cluster client
    let kube_cfg = KubeConfig::resolve(cli.kubeconfig.as_deref())?;
    info!(source = %kube_cfg.source, server = %kube_cfg.server, "cluster credentials resolved");
    let client = Arc::new(KubeClient::new(kube_cfg)?);

    // 3) metrics
    let metrics = Arc::new(PrometheusMetrics::new()?);
    let shutdown = CancellationToken::new();
    if let Some(addr) = cli.metrics_addr {
        metrics_server::spawn(addr, Arc::clone(&metrics), shutdown.clone()).await?;
    }

    // 4) reconciler
    let reconciler = Arc::new(
        Reconciler::new(client, cli.reconciler_config()).with_metrics(metrics),
    );

    let code = match cli.interval {
        None => run_once(&reconciler, &shutdown).await,
        Some(interval) => {
            periodic::run(reconciler, interval, cli.pass_timeout).await?;
            ExitCode::SUCCESS
        }
    };

    shutdown.cancel();
    info!("descheduler stopped");
    Ok(code)
}

/// Single pass; the exit status is non-zero only if cluster state could not be loaded.
async fn run_once<C: ClusterState>(
    reconciler: &Reconciler<C>,
    shutdown: &CancellationToken,
) -> ExitCode {
    let ctx = shutdown.child_token();
    let on_signal = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling pass");
            on_signal.cancel();
        }
    });

    match reconciler.reconcile_once(&ctx).await {
        Ok(report) => {
            info!(%report, "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(stage = e.stage(), error = %e, "pass aborted");
            ExitCode::FAILURE
        }
    }
}
