//! Per-workload transition rules (§4.6).
//!
//! Each function here performs exactly one workload's worth of work for one
//! op and reports whether a transaction was appended. The caller (the
//! engine's dispatch loop) owns sequencing workloads in canonical order;
//! these functions don't know about their siblings.

use gridnode_provisioner::{ManagerContext, ManagerRegistry, Outcome};
use gridnode_types::error::StorageError;
use gridnode_types::workload::{Workload, WorkloadResult, WorkloadState};
use gridnode_storage::Storage;
use tracing::{debug, warn};

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Converts a manager `Outcome` into the transaction to append, re-labeling
/// a successful `Applied` result with `applied_state` — the state this
/// particular operation (provision/update/pause/resume) is responsible for
/// transitioning to — rather than trusting the manager to set it. Returns
/// `None` for `NoActionNeeded`, which must append nothing (§4.6, §7).
fn outcome_to_transaction(outcome: Outcome, applied_state: WorkloadState) -> Option<WorkloadResult> {
    match outcome {
        Outcome::NoActionNeeded => None,
        Outcome::Applied(result) => Some(WorkloadResult {
            state: applied_state,
            created_at: result.created_at,
            data: result.data,
            error: None,
        }),
        Outcome::Failed(e) => Some(WorkloadResult::error(now_secs(), e.0)),
    }
}

async fn append_if_some(
    storage: &dyn Storage,
    twin: u32,
    contract: u64,
    workload: &Workload,
    result: Option<WorkloadResult>,
) -> Result<(), StorageError> {
    let Some(result) = result else {
        debug!(workload = %workload.name, "manager reported no action needed");
        return Ok(());
    };
    storage.transaction(
        twin,
        contract,
        gridnode_types::transaction::Transaction {
            workload_name: workload.name.clone(),
            workload_type: workload.workload_type,
            data_snapshot: workload.data.clone(),
            result,
            timestamp: now_secs(),
        },
    )
}

/// Installs one workload (§4.6 "Install"). `declared` tells the caller
/// whether this name is already part of the deployment's declared workload
/// list (true during `Provision`, possibly false for a workload newly
/// introduced by `Update`'s plan).
pub async fn install_workload(
    storage: &dyn Storage,
    registry: &ManagerRegistry,
    manager_ctx: &ManagerContext,
    twin: u32,
    contract: u64,
    workload: &Workload,
    declared: bool,
) -> Result<(), StorageError> {
    if !declared {
        match storage.add(twin, contract, workload.clone()) {
            Ok(()) | Err(StorageError::WorkloadAlreadyExists { .. }) => {}
            Err(e) => return Err(e),
        }
    }

    let current = match storage.current(twin, contract, &workload.name) {
        Ok(r) => Some(r),
        Err(StorageError::WorkloadNotExist { .. }) => None,
        Err(e) => return Err(e),
    };

    if let Some(r) = &current {
        if r.state.is_sealed() {
            return Ok(());
        }
    }

    let Some(manager) = registry.get(workload.workload_type) else {
        warn!(ty = ?workload.workload_type, "no manager registered, recording error transaction");
        let result = WorkloadResult::error(now_secs(), "no manager registered for this workload type");
        return append_if_some(storage, twin, contract, workload, Some(result)).await;
    };

    let outcome = manager.provision(manager_ctx, workload).await;
    let result = outcome_to_transaction(outcome, WorkloadState::Ok);
    append_if_some(storage, twin, contract, workload, result).await
}

/// Tears down one workload (§4.6 "Uninstall"). Returns whether the
/// workload is now settled (either never existed or ended `Deleted`) for
/// the caller's all-deleted bookkeeping.
pub async fn uninstall_workload(
    storage: &dyn Storage,
    registry: &ManagerRegistry,
    manager_ctx: &ManagerContext,
    twin: u32,
    contract: u64,
    workload: &Workload,
    reason: &str,
) -> Result<bool, StorageError> {
    let current = match storage.current(twin, contract, &workload.name) {
        Ok(r) => Some(r),
        Err(StorageError::WorkloadNotExist { .. }) => None,
        Err(e) => return Err(e),
    };

    match current {
        None => Ok(true),
        Some(r) if r.state == WorkloadState::Deleted => Ok(true),
        Some(_) => {
            let Some(manager) = registry.get(workload.workload_type) else {
                let result = WorkloadResult::error(now_secs(), "no manager registered for this workload type");
                append_if_some(storage, twin, contract, workload, Some(result)).await?;
                return Ok(false);
            };

            match manager.deprovision(manager_ctx, workload).await {
                Ok(()) => {
                    let result = WorkloadResult::deleted(now_secs(), reason);
                    append_if_some(storage, twin, contract, workload, Some(result)).await?;
                    Ok(true)
                }
                Err(e) => {
                    let result = WorkloadResult::error(now_secs(), e.0);
                    append_if_some(storage, twin, contract, workload, Some(result)).await?;
                    Ok(false)
                }
            }
        }
    }
}

/// Applies an in-place update to one workload (§4.6 "Update").
pub async fn update_workload(
    storage: &dyn Storage,
    registry: &ManagerRegistry,
    manager_ctx: &ManagerContext,
    twin: u32,
    contract: u64,
    workload: &Workload,
) -> Result<(), StorageError> {
    let Some(manager) = registry.get(workload.workload_type) else {
        let result = WorkloadResult::error(now_secs(), "no manager registered for this workload type");
        return append_if_some(storage, twin, contract, workload, Some(result)).await;
    };

    if !manager.can_update(workload.workload_type) {
        let result = WorkloadResult::error(now_secs(), "manager does not support update for this type");
        return append_if_some(storage, twin, contract, workload, Some(result)).await;
    }

    let outcome = manager.update(manager_ctx, workload).await;
    let result = outcome_to_transaction(outcome, WorkloadState::Ok);
    append_if_some(storage, twin, contract, workload, result).await
}

/// Pause/resume share the same "only act if `IsOkay`" shape (§4.6).
async fn pause_or_resume(
    storage: &dyn Storage,
    registry: &ManagerRegistry,
    manager_ctx: &ManagerContext,
    twin: u32,
    contract: u64,
    workload: &Workload,
    target_state: WorkloadState,
    is_resume: bool,
) -> Result<(), StorageError> {
    let current = match storage.current(twin, contract, &workload.name) {
        Ok(r) => r,
        Err(StorageError::WorkloadNotExist { .. }) => return Ok(()),
        Err(e) => return Err(e),
    };

    let eligible = if is_resume {
        current.state == WorkloadState::Paused
    } else {
        current.state.is_okay()
    };
    if !eligible {
        return Ok(());
    }

    let Some(manager) = registry.get(workload.workload_type) else {
        return Ok(());
    };

    let outcome = if is_resume {
        manager.resume(manager_ctx, workload).await
    } else {
        manager.pause(manager_ctx, workload).await
    };
    let result = outcome_to_transaction(outcome, target_state);
    append_if_some(storage, twin, contract, workload, result).await
}

pub async fn pause_workload(
    storage: &dyn Storage,
    registry: &ManagerRegistry,
    manager_ctx: &ManagerContext,
    twin: u32,
    contract: u64,
    workload: &Workload,
) -> Result<(), StorageError> {
    pause_or_resume(
        storage,
        registry,
        manager_ctx,
        twin,
        contract,
        workload,
        WorkloadState::Paused,
        false,
    )
    .await
}

pub async fn resume_workload(
    storage: &dyn Storage,
    registry: &ManagerRegistry,
    manager_ctx: &ManagerContext,
    twin: u32,
    contract: u64,
    workload: &Workload,
) -> Result<(), StorageError> {
    pause_or_resume(
        storage,
        registry,
        manager_ctx,
        twin,
        contract,
        workload,
        WorkloadState::Ok,
        true,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemStorage;
    use gridnode_provisioner::NullManager;
    use gridnode_types::deployment::{Deployment, SignatureRequirement};
    use std::sync::Arc;

    const TWIN: u32 = 1;
    const CONTRACT: u64 = 1;

    fn ctx() -> ManagerContext {
        ManagerContext {
            twin: TWIN,
            contract: CONTRACT,
            node_rented: false,
        }
    }

    fn storage_with(workload: &Workload) -> MemStorage {
        let s = MemStorage::new();
        s.create(Deployment {
            twin_id: TWIN,
            contract_id: CONTRACT,
            version: 0,
            description: String::new(),
            metadata: String::new(),
            signature_requirement: SignatureRequirement {
                threshold: 0,
                keys: vec![],
                signatures: vec![],
            },
            workloads: vec![workload.clone()],
        })
        .unwrap();
        s
    }

    fn registry_with(ty: gridnode_types::workload::WorkloadType, manager: NullManager) -> ManagerRegistry {
        let mut r = ManagerRegistry::new();
        r.register(ty, Arc::new(manager));
        r
    }

    #[tokio::test]
    async fn install_with_no_manager_records_error_transaction() {
        let w = Workload::new("n", gridnode_types::workload::WorkloadType::Network, vec![]);
        let s = storage_with(&w);
        install_workload(&s, &ManagerRegistry::new(), &ctx(), TWIN, CONTRACT, &w, true)
            .await
            .unwrap();
        let current = s.current(TWIN, CONTRACT, "n").unwrap();
        assert_eq!(current.state, WorkloadState::Error);
    }

    #[tokio::test]
    async fn install_is_a_no_op_once_sealed_deleted() {
        let w = Workload::new("n", gridnode_types::workload::WorkloadType::Network, vec![]);
        let s = storage_with(&w);
        let reg = registry_with(gridnode_types::workload::WorkloadType::Network, NullManager::always_fail());
        s.transaction(
            TWIN,
            CONTRACT,
            gridnode_types::transaction::Transaction {
                workload_name: "n".into(),
                workload_type: w.workload_type,
                data_snapshot: vec![],
                result: WorkloadResult::deleted(0, "removed"),
                timestamp: 0,
            },
        )
        .unwrap();

        install_workload(&s, &reg, &ctx(), TWIN, CONTRACT, &w, true).await.unwrap();
        let current = s.current(TWIN, CONTRACT, "n").unwrap();
        assert_eq!(current.state, WorkloadState::Deleted, "sealed state must not be touched");
    }

    #[tokio::test]
    async fn install_is_a_no_op_once_sealed_error() {
        let w = Workload::new("n", gridnode_types::workload::WorkloadType::Network, vec![]);
        let s = storage_with(&w);
        let reg = registry_with(gridnode_types::workload::WorkloadType::Network, NullManager::always_ok());
        s.transaction(
            TWIN,
            CONTRACT,
            gridnode_types::transaction::Transaction {
                workload_name: "n".into(),
                workload_type: w.workload_type,
                data_snapshot: vec![],
                result: WorkloadResult::error(0, "boot drift"),
                timestamp: 0,
            },
        )
        .unwrap();

        install_workload(&s, &reg, &ctx(), TWIN, CONTRACT, &w, true).await.unwrap();
        let current = s.current(TWIN, CONTRACT, "n").unwrap();
        assert_eq!(current.state, WorkloadState::Error, "sealed state must not be touched");
    }

    #[tokio::test]
    async fn install_no_action_needed_appends_nothing() {
        let w = Workload::new("n", gridnode_types::workload::WorkloadType::Network, vec![]);
        let s = storage_with(&w);
        let reg = registry_with(gridnode_types::workload::WorkloadType::Network, NullManager::always_no_action());
        install_workload(&s, &reg, &ctx(), TWIN, CONTRACT, &w, true).await.unwrap();
        assert!(s.changes(TWIN, CONTRACT).unwrap().is_empty());
    }

    #[tokio::test]
    async fn uninstall_missing_workload_is_already_settled() {
        let w = Workload::new("n", gridnode_types::workload::WorkloadType::Network, vec![]);
        let s = storage_with(&w);
        s.remove(TWIN, CONTRACT, "missing").unwrap_err();
        let settled = uninstall_workload(&s, &ManagerRegistry::new(), &ctx(), TWIN, CONTRACT, &w, "gone")
            .await
            .unwrap();
        // no transaction ever recorded for "n" either, so it reads as settled
        assert!(settled);
    }

    #[tokio::test]
    async fn uninstall_failure_is_not_settled() {
        let w = Workload::new("n", gridnode_types::workload::WorkloadType::Network, vec![]);
        let s = storage_with(&w);
        let ok_reg = registry_with(gridnode_types::workload::WorkloadType::Network, NullManager::always_ok());
        install_workload(&s, &ok_reg, &ctx(), TWIN, CONTRACT, &w, true).await.unwrap();

        let fail_reg = registry_with(gridnode_types::workload::WorkloadType::Network, NullManager::always_fail());
        let settled = uninstall_workload(&s, &fail_reg, &ctx(), TWIN, CONTRACT, &w, "gone")
            .await
            .unwrap();
        assert!(!settled);
        assert_eq!(s.current(TWIN, CONTRACT, "n").unwrap().state, WorkloadState::Error);
    }

    #[tokio::test]
    async fn update_rejected_when_manager_lacks_support() {
        let w = Workload::new("n", gridnode_types::workload::WorkloadType::ZMount, vec![]);
        let s = storage_with(&w);
        let reg = registry_with(
            gridnode_types::workload::WorkloadType::ZMount,
            NullManager::always_ok().without_update_support(),
        );
        update_workload(&s, &reg, &ctx(), TWIN, CONTRACT, &w).await.unwrap();
        assert_eq!(s.current(TWIN, CONTRACT, "n").unwrap().state, WorkloadState::Error);
    }

    #[tokio::test]
    async fn pause_is_a_no_op_unless_currently_ok() {
        let w = Workload::new("n", gridnode_types::workload::WorkloadType::Network, vec![]);
        let s = storage_with(&w);
        let reg = registry_with(gridnode_types::workload::WorkloadType::Network, NullManager::always_ok());
        // no transaction recorded yet: pause must no-op, not error.
        pause_workload(&s, &reg, &ctx(), TWIN, CONTRACT, &w).await.unwrap();
        assert!(s.changes(TWIN, CONTRACT).unwrap().is_empty());
    }

    #[tokio::test]
    async fn resume_requires_paused_not_ok() {
        let w = Workload::new("n", gridnode_types::workload::WorkloadType::Network, vec![]);
        let s = storage_with(&w);
        let reg = registry_with(gridnode_types::workload::WorkloadType::Network, NullManager::always_ok());
        install_workload(&s, &reg, &ctx(), TWIN, CONTRACT, &w, true).await.unwrap();
        // currently Ok, not Paused: resume must no-op.
        resume_workload(&s, &reg, &ctx(), TWIN, CONTRACT, &w).await.unwrap();
        assert_eq!(s.changes(TWIN, CONTRACT).unwrap().len(), 1, "no resume transaction appended");

        pause_workload(&s, &reg, &ctx(), TWIN, CONTRACT, &w).await.unwrap();
        resume_workload(&s, &reg, &ctx(), TWIN, CONTRACT, &w).await.unwrap();
        assert_eq!(s.current(TWIN, CONTRACT, "n").unwrap().state, WorkloadState::Ok);
    }
}
