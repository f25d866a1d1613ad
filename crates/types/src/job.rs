//! Queue job model (§3, §4.2).

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::deployment::Deployment;

/// The operation a `Job` asks the engine to perform (§3).
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOp {
    Provision,
    Deprovision,
    Update,
    /// Boot-path re-provisioning that skips contract validation (§4.3, §9).
    ProvisionNoValidation,
    Pause,
    Resume,
}

impl JobOp {
    /// Whether this op must pass through the contract validator (§4.3).
    pub fn requires_validation(self) -> bool {
        matches!(self, JobOp::Provision | JobOp::Update)
            || matches!(self, JobOp::ProvisionNoValidation)
    }

    /// Whether the validator itself should perform the on-chain checks, as
    /// opposed to only the existence/rent lookups (§4.3 `noValidation`).
    pub fn skips_chain_validation(self) -> bool {
        matches!(self, JobOp::ProvisionNoValidation)
    }
}

/// A persisted unit of work on the engine queue (§3).
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub op: JobOp,
    pub target: Deployment,
    /// Only meaningful for `Update`: the previous deployment version.
    pub source: Option<Deployment>,
    /// Human-readable reason, used when deprovisioning.
    pub message: String,
}

impl Job {
    pub fn provision(target: Deployment) -> Self {
        Self {
            op: JobOp::Provision,
            target,
            source: None,
            message: String::new(),
        }
    }

    pub fn provision_no_validation(target: Deployment) -> Self {
        Self {
            op: JobOp::ProvisionNoValidation,
            target,
            source: None,
            message: String::new(),
        }
    }

    pub fn update(source: Deployment, target: Deployment) -> Self {
        Self {
            op: JobOp::Update,
            target,
            source: Some(source),
            message: String::new(),
        }
    }

    pub fn deprovision(target: Deployment, message: impl Into<String>) -> Self {
        Self {
            op: JobOp::Deprovision,
            target,
            source: None,
            message: message.into(),
        }
    }

    pub fn pause(target: Deployment) -> Self {
        Self {
            op: JobOp::Pause,
            target,
            source: None,
            message: String::new(),
        }
    }

    pub fn resume(target: Deployment) -> Self {
        Self {
            op: JobOp::Resume,
            target,
            source: None,
            message: String::new(),
        }
    }

    pub fn twin(&self) -> u32 {
        self.target.twin_id
    }

    pub fn contract(&self) -> u64 {
        self.target.contract_id
    }
}
