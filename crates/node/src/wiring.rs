//! Builds the concrete storage/queue/engine stack from a [`NodeConfig`].
//! Kept separate from the CLI commands themselves so each subcommand wires
//! only what it needs (SPEC_FULL §4.11: subcommands are thin wrappers).

use std::sync::Arc;

use anyhow::{Context, Result};
use gridnode_chain::ContractValidator;
use gridnode_engine::Engine;
use gridnode_provisioner::ManagerRegistry;
use gridnode_queue::FileQueue;
use gridnode_storage::FileStore;

use crate::config::NodeConfig;
use crate::gateway::UnwiredGateway;

pub fn open_storage(cfg: &NodeConfig) -> Result<Arc<FileStore>> {
    Ok(Arc::new(
        FileStore::open(cfg.storage_dir()).context("opening storage")?,
    ))
}

pub fn open_queue(cfg: &NodeConfig) -> Result<Arc<FileQueue>> {
    Ok(Arc::new(
        FileQueue::open(cfg.queue_dir()).context("opening queue")?,
    ))
}

/// Workload managers are out of scope (SPEC_FULL §6): the registry is the
/// documented seam a real deployment plugs per-kind `WorkloadManager`
/// implementations into, one `register` call per `WorkloadType`.
pub fn empty_registry() -> ManagerRegistry {
    ManagerRegistry::new()
}

pub fn build_validator(cfg: &NodeConfig) -> Arc<ContractValidator> {
    let gateway = Arc::new(UnwiredGateway {
        url: cfg.substrate_gateway_url.clone(),
    });
    Arc::new(ContractValidator::new(gateway, cfg.node_id))
}

// `kyc_url`/`kyc_retry_attempts` on `NodeConfig` exist for the (out-of-scope,
// §1) RPC ingress that would construct a `gridnode_identity::HttpTwinVerifier`
// and a `gridnode_engine::Admission` from them; nothing in this binary does
// that yet, so no wiring helper for it lives here until that surface exists.

pub fn build_engine(cfg: &NodeConfig, storage: Arc<FileStore>, queue: Arc<FileQueue>) -> Engine {
    Engine::new(
        storage,
        queue,
        empty_registry(),
        build_validator(cfg),
        gridnode_types::order::CanonicalOrder::default(),
    )
    .with_job_timeout(std::time::Duration::from_secs(cfg.job_timeout_secs))
}
