//! The Upgrade Planner (§4.4): diffs a `source` and `target` deployment
//! into a linear sequence of operations the engine replays per-workload.
//!
//! The planner only decides *what* changed; it never touches `Storage` or
//! calls a manager itself; sorting the resulting ops into the engine's
//! replay order is the engine's job (§4.4's note that sort order is
//! "applied by the engine, not the planner").

use gridnode_provisioner::ManagerRegistry;
use gridnode_types::deployment::Deployment;
use gridnode_types::error::UpgradeValidationError;
use gridnode_types::workload::Workload;

/// One step of an upgrade plan, tagged with the workload it affects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// A workload present only in `target`.
    Add(Workload),
    /// A workload present only in `source`, identified by name (its full
    /// spec is no longer needed once removal is decided).
    Remove(String),
    /// A workload present in both, with a changed spec, whose manager
    /// advertised `can_update`.
    Update(Workload),
}

impl Op {
    pub fn workload_name(&self) -> &str {
        match self {
            Op::Add(w) => &w.name,
            Op::Remove(name) => name,
            Op::Update(w) => &w.name,
        }
    }
}

/// The diff between `source` and `target`: the ops to apply, plus the names
/// that are unchanged and whose previous result should carry forward
/// verbatim (§4.4) without the engine touching them at all.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub ops: Vec<Op>,
    pub unchanged: Vec<String>,
}

fn workload_unchanged(a: &Workload, b: &Workload) -> bool {
    a.workload_type == b.workload_type && a.data == b.data && a.size_bytes == b.size_bytes
}

/// Computes the upgrade plan. Fails with `UpgradeValidationError` if any
/// changed workload's type does not support in-place update — per §4.4,
/// this rejects the *whole* plan rather than applying the updatable subset.
pub fn plan_upgrade(
    source: &Deployment,
    target: &Deployment,
    registry: &ManagerRegistry,
) -> Result<Plan, UpgradeValidationError> {
    let mut plan = Plan::default();

    for target_workload in &target.workloads {
        match source.workload(&target_workload.name) {
            None => plan.ops.push(Op::Add(target_workload.clone())),
            Some(source_workload) => {
                if workload_unchanged(source_workload, target_workload) {
                    plan.unchanged.push(target_workload.name.clone());
                } else {
                    let ty = target_workload.workload_type;
                    let updatable = registry
                        .get(ty)
                        .map(|m| m.can_update(ty))
                        .unwrap_or(false);
                    if !updatable {
                        return Err(UpgradeValidationError::NotUpdatable {
                            name: target_workload.name.clone(),
                            ty,
                        });
                    }
                    plan.ops.push(Op::Update(target_workload.clone()));
                }
            }
        }
    }

    for source_workload in &source.workloads {
        if target.workload(&source_workload.name).is_none() {
            plan.ops.push(Op::Remove(source_workload.name.clone()));
        }
    }

    Ok(plan)
}
