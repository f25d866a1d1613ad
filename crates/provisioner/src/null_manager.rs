//! A trivial `WorkloadManager` test double: no real infrastructure, just a
//! configurable outcome. Useful for exercising the engine's dispatch logic
//! without a real per-type manager, which is out of scope for this crate.

use async_trait::async_trait;
use gridnode_types::error::ProvisionerError;
use gridnode_types::workload::{Workload, WorkloadResult, WorkloadType};

use crate::{ManagerContext, Outcome, WorkloadManager};

#[derive(Clone, Copy, Debug)]
enum Behavior {
    Ok,
    NoAction,
    Fail,
}

pub struct NullManager {
    behavior: Behavior,
    supports_update: bool,
}

impl NullManager {
    pub fn always_ok() -> Self {
        Self {
            behavior: Behavior::Ok,
            supports_update: true,
        }
    }

    pub fn always_no_action() -> Self {
        Self {
            behavior: Behavior::NoAction,
            supports_update: true,
        }
    }

    pub fn always_fail() -> Self {
        Self {
            behavior: Behavior::Fail,
            supports_update: true,
        }
    }

    pub fn without_update_support(mut self) -> Self {
        self.supports_update = false;
        self
    }

    fn outcome(&self, workload: &Workload) -> Outcome {
        match self.behavior {
            Behavior::Ok => Outcome::Applied(WorkloadResult::ok(0, workload.data.clone())),
            Behavior::NoAction => Outcome::NoActionNeeded,
            Behavior::Fail => Outcome::Failed(ProvisionerError("null manager configured to fail".into())),
        }
    }
}

#[async_trait]
impl WorkloadManager for NullManager {
    async fn provision(&self, _ctx: &ManagerContext, workload: &Workload) -> Outcome {
        self.outcome(workload)
    }

    async fn deprovision(&self, _ctx: &ManagerContext, _workload: &Workload) -> Result<(), ProvisionerError> {
        match self.behavior {
            Behavior::Fail => Err(ProvisionerError("null manager configured to fail".into())),
            _ => Ok(()),
        }
    }

    async fn update(&self, _ctx: &ManagerContext, workload: &Workload) -> Outcome {
        self.outcome(workload)
    }

    async fn pause(&self, _ctx: &ManagerContext, workload: &Workload) -> Outcome {
        self.outcome(workload)
    }

    async fn resume(&self, _ctx: &ManagerContext, workload: &Workload) -> Outcome {
        self.outcome(workload)
    }

    fn can_update(&self, _ty: WorkloadType) -> bool {
        self.supports_update
    }
}
