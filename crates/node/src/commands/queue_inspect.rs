//! `gridnode queue inspect`: an operational debug aid, not a public API
//! (SPEC_FULL §4.11). Peeks the head of the queue without dequeuing it;
//! `Queue` only exposes a blocking peek, so a short timeout stands in for
//! "nothing pending" when the queue is empty.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use gridnode_queue::Queue;

use crate::config::{ConfigOverrides, NodeConfig};
use crate::wiring;

const PEEK_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Parser)]
pub struct QueueInspectArgs {
    #[clap(flatten)]
    pub config: ConfigOverrides,
}

pub async fn run(args: QueueInspectArgs) -> Result<()> {
    let cfg = NodeConfig::load(&args.config)?;
    let queue = wiring::open_queue(&cfg)?;

    match tokio::time::timeout(PEEK_TIMEOUT, queue.peek_block()).await {
        Ok(Ok(job)) => {
            println!("pending job:");
            println!("  op:       {:?}", job.op);
            println!("  twin:     {}", job.twin());
            println!("  contract: {}", job.contract());
        }
        Ok(Err(e)) => println!("queue error: {e}"),
        Err(_) => println!("no job pending"),
    }

    Ok(())
}
