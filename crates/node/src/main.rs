//! Grid node agent entry point (SPEC_FULL §4.11).

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod gateway;
mod wiring;

use commands::*;

#[derive(Parser, Debug)]
#[clap(
    name = "gridnode",
    version,
    about = "Grid node agent: durable reconciliation of typed workload deployments."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Boots storage, queue, and the engine; runs until SIGINT/SIGTERM.
    Run(run::RunArgs),

    /// Queue operations.
    Queue {
        #[clap(subcommand)]
        command: QueueCommands,
    },

    /// Deployment operations.
    Deployment {
        #[clap(subcommand)]
        command: DeploymentCommands,
    },
}

#[derive(Subcommand, Debug)]
enum QueueCommands {
    /// Peeks the head of the queue without dequeuing it.
    Inspect(queue_inspect::QueueInspectArgs),
}

#[derive(Subcommand, Debug)]
enum DeploymentCommands {
    /// Prints a deployment's current snapshot from storage.
    Show(deployment_show::DeploymentShowArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    gridnode_telemetry::init_tracing().ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run::run(args).await,
        Commands::Queue { command } => match command {
            QueueCommands::Inspect(args) => queue_inspect::run(args).await,
        },
        Commands::Deployment { command } => match command {
            DeploymentCommands::Show(args) => deployment_show::run(args).await,
        },
    }
}
