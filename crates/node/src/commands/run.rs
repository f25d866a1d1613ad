//! `gridnode run`: boots storage, queue, and the engine; runs until
//! SIGINT/SIGTERM (SPEC_FULL §4.11).

use anyhow::Result;
use clap::Parser;
use gridnode_queue::Queue;
use tokio::sync::watch;
use tracing::info;

use crate::config::{ConfigOverrides, NodeConfig};
use crate::wiring;

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Forces boot-path recovery (§9, S6) for this run, regardless of the
    /// `rerun_all_on_boot` config value.
    #[clap(long)]
    pub rerun_all: bool,

    #[clap(flatten)]
    pub config: ConfigOverrides,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let cfg = NodeConfig::load(&args.config)?;
    let rerun_all = cfg.rerun_all_on_boot || args.rerun_all;

    if rerun_all && cfg.queue_dir().exists() {
        info!(dir = %cfg.queue_dir().display(), "rerun-all requested, rebuilding job queue from active deployments");
        std::fs::remove_dir_all(cfg.queue_dir())?;
    }

    let storage = wiring::open_storage(&cfg)?;
    let queue = wiring::open_queue(&cfg)?;
    let engine = wiring::build_engine(&cfg, storage, queue.clone());

    if rerun_all {
        engine.rerun_all().await?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(wait_for_shutdown_signal(shutdown_tx));

    info!(node_id = cfg.node_id, data_dir = %cfg.data_dir.display(), "engine starting");
    engine.run(shutdown_rx).await?;
    queue.close().await?;
    info!("engine stopped");

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal(tx: watch::Sender<bool>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to install SIGTERM handler");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
    let _ = tx.send(true);
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal(tx: watch::Sender<bool>) {
    let _ = tokio::signal::ctrl_c().await;
    let _ = tx.send(true);
}
