//! The per-job context (§4.5 step 1, §9 "context propagation" design note).
//!
//! The source this was distilled from stashes the contract record and rent
//! flag in a dynamic/ambient context; here it is an explicit value built
//! once per job and threaded through every call that needs it.

use gridnode_chain::ValidationOutcome;
use gridnode_types::job::JobOp;

#[derive(Debug, Clone)]
pub struct JobContext {
    pub op: JobOp,
    pub twin: u32,
    pub contract: u64,
    /// Present only for ops that passed through the contract validator
    /// (§4.3); `ProvisionNoValidation` still runs the existence/rent checks
    /// so this is populated for it too.
    pub validation: Option<ValidationOutcome>,
}

impl JobContext {
    pub fn manager_context(&self) -> gridnode_provisioner::ManagerContext {
        gridnode_provisioner::ManagerContext {
            twin: self.twin,
            contract: self.contract,
            node_rented: self.validation.as_ref().map(|v| v.node_rented).unwrap_or(false),
        }
    }
}
