//! `gridnode deployment show`: prints a deployment's current snapshot from
//! storage (SPEC_FULL §4.11). Read-only, no reconciliation.

use anyhow::Result;
use clap::Parser;
use gridnode_storage::Storage;

use crate::config::{ConfigOverrides, NodeConfig};
use crate::wiring;

#[derive(Debug, Parser)]
pub struct DeploymentShowArgs {
    #[clap(long)]
    pub twin: u32,

    #[clap(long)]
    pub contract: u64,

    #[clap(flatten)]
    pub config: ConfigOverrides,
}

pub async fn run(args: DeploymentShowArgs) -> Result<()> {
    let cfg = NodeConfig::load(&args.config)?;
    let storage = wiring::open_storage(&cfg)?;

    let snapshot = storage.get(args.twin, args.contract)?;
    println!("twin:     {}", snapshot.deployment.twin_id);
    println!("contract: {}", snapshot.deployment.contract_id);
    println!("version:  {}", snapshot.deployment.version);
    if let Some(err) = &snapshot.global_error {
        println!("global_error: {err}");
    }
    println!("workloads:");
    for workload in &snapshot.deployment.workloads {
        let state = snapshot
            .result_of(&workload.name)
            .map(|r| format!("{:?}", r.state))
            .unwrap_or_else(|| "<no transaction recorded>".into());
        println!("  {} ({:?}): {}", workload.name, workload.workload_type, state);
    }

    Ok(())
}
