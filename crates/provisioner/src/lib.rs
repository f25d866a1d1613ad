//! The seam between the engine and per-workload-type implementations (§6).
//!
//! Real managers (actually bringing up a VM, a mount, a gateway proxy) are
//! out of scope here, same as in `spec.md` §1 — this crate only defines the
//! trait the engine dispatches through, the registry that resolves a
//! [`gridnode_types::WorkloadType`] to its manager, and the canonical
//! install/uninstall ordering (§4.7) the engine walks a deployment's
//! workloads in.

mod null_manager;
mod order;
mod registry;

pub use null_manager::NullManager;
pub use order::sorted_for_install_within_type;
pub use registry::ManagerRegistry;

use async_trait::async_trait;
use gridnode_types::error::ProvisionerError;
use gridnode_types::workload::{Workload, WorkloadResult, WorkloadType};

/// Context a manager call receives, carrying what the contract validator
/// (§4.3) injected for this job. Deliberately thin: real managers may need
/// far more (node capacity, local network state), but that is their own
/// concern to source, not the engine's to thread through this call.
#[derive(Debug, Clone, Copy)]
pub struct ManagerContext {
    pub twin: u32,
    pub contract: u64,
    /// Set when the contract validator found a non-zero node rent contract
    /// (§4.3). Managers that gate a workload kind on node rental consult
    /// this rather than querying the chain themselves.
    pub node_rented: bool,
}

/// The result of one manager call that can legitimately do nothing (§4.6,
/// §7's `NoActionNeeded` sentinel). Modeling "no action needed" as its own
/// `Outcome` variant, rather than as a special error value a caller has to
/// recognize by comparison, makes the no-op case exhaustively handled at
/// the type level.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The manager did work and produced a new result to record.
    Applied(WorkloadResult),
    /// The manager determined no change was required; the engine must not
    /// append a transaction.
    NoActionNeeded,
    /// The manager call failed; the engine synthesizes an `Error`
    /// transaction from this.
    Failed(ProvisionerError),
}

/// Per-workload-type operations the engine dispatches through (§6).
#[async_trait]
pub trait WorkloadManager: Send + Sync {
    async fn provision(&self, ctx: &ManagerContext, workload: &Workload) -> Outcome;

    async fn deprovision(&self, ctx: &ManagerContext, workload: &Workload) -> Result<(), ProvisionerError>;

    async fn update(&self, ctx: &ManagerContext, workload: &Workload) -> Outcome;

    async fn pause(&self, ctx: &ManagerContext, workload: &Workload) -> Outcome;

    async fn resume(&self, ctx: &ManagerContext, workload: &Workload) -> Outcome;

    /// Whether this manager supports in-place `Update` for `ty` (§4.4). A
    /// manager may answer `false` for its own type if, say, only a subset
    /// of payload fields are updatable in practice — the planner takes this
    /// at face value and rejects the whole plan otherwise.
    fn can_update(&self, ty: WorkloadType) -> bool;
}
