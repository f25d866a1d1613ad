//! The reconciliation loop itself (§4.5).
//!
//! `Engine` pulls one job at a time from the queue, validates it against the
//! chain when required, and replays its per-workload effects through
//! `transitions`. It is deliberately single-worker: the ordering guarantees
//! (FIFO per key, canonical type order within a job) only hold if exactly
//! one job is in flight at a time.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use gridnode_chain::ContractValidator;
use gridnode_provisioner::{sorted_for_install_within_type, ManagerRegistry};
use gridnode_queue::Queue;
use gridnode_storage::Storage;
use gridnode_types::job::{Job, JobOp};
use gridnode_types::order::CanonicalOrder;
use gridnode_types::workload::Workload;
use tokio::sync::watch;
use tracing::{error, info_span, warn, Instrument};

use crate::context::JobContext;
use crate::error::EngineError;
use crate::transitions;

/// Fired after a job finishes processing, before the next one is pulled.
/// `deleted` is true iff the deployment was fully torn down and removed
/// from storage by this job.
pub type JobCallback = Arc<dyn Fn(u32, u64, bool) + Send + Sync>;

/// Bounds "the whole job" per §5's default, absent an explicit
/// `with_job_timeout` call.
const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(300);

pub struct Engine {
    storage: Arc<dyn Storage>,
    queue: Arc<dyn Queue>,
    registry: ManagerRegistry,
    validator: Arc<ContractValidator>,
    order: CanonicalOrder,
    callback: Option<JobCallback>,
    job_timeout: Duration,
}

impl Engine {
    pub fn new(
        storage: Arc<dyn Storage>,
        queue: Arc<dyn Queue>,
        registry: ManagerRegistry,
        validator: Arc<ContractValidator>,
        order: CanonicalOrder,
    ) -> Self {
        Self {
            storage,
            queue,
            registry,
            validator,
            order,
            callback: None,
            job_timeout: DEFAULT_JOB_TIMEOUT,
        }
    }

    pub fn with_callback(mut self, callback: JobCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Overrides the per-job timeout (§4.10's `job_timeout_secs`).
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Runs until `shutdown` is signalled. Cancellation at the root stops
    /// the worker after it finishes the current job, never mid-step (§5).
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), EngineError> {
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(());
                    }
                }
                job = self.queue.peek_block() => {
                    let job = job?;
                    self.process_one(job).await?;
                }
            }
        }
    }

    /// Processes exactly one job already sitting at the head of the queue,
    /// blocking for it if none is pending yet. Exposed separately from
    /// `run` so tests can drive the engine deterministically.
    pub async fn process_one(&self, job: Job) -> Result<(), EngineError> {
        let span = info_span!("job", op = ?job.op, twin = job.twin(), contract = job.contract());
        let deleted = match tokio::time::timeout(self.job_timeout, self.dispatch(&job).instrument(span)).await {
            Ok(result) => result?,
            Err(_) => {
                error!(
                    twin = job.twin(),
                    contract = job.contract(),
                    timeout_secs = self.job_timeout.as_secs(),
                    "job exceeded its timeout, leaving it at the head of the queue"
                );
                return Err(EngineError::JobTimedOut(self.job_timeout.as_secs()));
            }
        };
        self.queue.dequeue().await?;
        self.fire_callback(job.twin(), job.contract(), deleted);
        Ok(())
    }

    /// Pulls and processes exactly one job, for callers (tests, the `run`
    /// subcommand) that want to drive the loop step by step.
    pub async fn step(&self) -> Result<(), EngineError> {
        let job = self.queue.peek_block().await?;
        self.process_one(job).await
    }

    /// Boot-path recovery (§4.11, S6): re-enqueues every deployment
    /// currently in storage as `ProvisionNoValidation`.
    pub async fn rerun_all(&self) -> Result<(), EngineError> {
        for twin in self.storage.twins()? {
            for snapshot in self.storage.by_twin(twin)? {
                self.queue
                    .enqueue(Job::provision_no_validation(snapshot.deployment))
                    .await?;
            }
        }
        Ok(())
    }

    fn fire_callback(&self, twin: u32, contract: u64, deleted: bool) {
        let Some(callback) = &self.callback else {
            return;
        };
        let callback = callback.clone();
        if std::panic::catch_unwind(AssertUnwindSafe(|| callback(twin, contract, deleted))).is_err() {
            warn!(twin, contract, "job callback panicked, ignoring");
        }
    }

    /// Returns whether the deployment was fully deleted by this job.
    async fn dispatch(&self, job: &Job) -> Result<bool, EngineError> {
        let twin = job.twin();
        let contract = job.contract();

        let validation = if job.op.requires_validation() {
            match self
                .validator
                .validate(&job.target, job.op.skips_chain_validation())
                .await
            {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    error!(twin, contract, error = %e, "contract validation failed, dropping job");
                    self.storage.error(twin, contract, e.to_string())?;
                    return Ok(false);
                }
            }
        } else {
            None
        };

        let ctx = JobContext {
            op: job.op,
            twin,
            contract,
            validation,
        };
        let manager_ctx = ctx.manager_context();
        let storage = self.storage.as_ref();

        match job.op {
            JobOp::Provision | JobOp::ProvisionNoValidation => {
                self.install_all(storage, &manager_ctx, twin, contract, &job.target.workloads)
                    .await?;
                Ok(false)
            }
            JobOp::Deprovision => {
                let mut all_settled = true;
                for ty in self.order.uninstall_order() {
                    for workload in job.target.workloads.iter().filter(|w| w.workload_type == ty) {
                        let settled = transitions::uninstall_workload(
                            storage,
                            &self.registry,
                            &manager_ctx,
                            twin,
                            contract,
                            workload,
                            &job.message,
                        )
                        .await?;
                        all_settled &= settled;
                    }
                }
                if all_settled {
                    storage.delete(twin, contract)?;
                }
                Ok(all_settled)
            }
            JobOp::Pause => {
                for ty in self.order.uninstall_order() {
                    for workload in job.target.workloads.iter().filter(|w| w.workload_type == ty) {
                        transitions::pause_workload(storage, &self.registry, &manager_ctx, twin, contract, workload)
                            .await?;
                    }
                }
                Ok(false)
            }
            JobOp::Resume => {
                for ty in self.order.install_order() {
                    for workload in job.target.workloads.iter().filter(|w| w.workload_type == *ty) {
                        transitions::resume_workload(storage, &self.registry, &manager_ctx, twin, contract, workload)
                            .await?;
                    }
                }
                Ok(false)
            }
            JobOp::Update => {
                self.dispatch_update(storage, &manager_ctx, job, twin, contract).await?;
                Ok(false)
            }
        }
    }

    async fn install_all(
        &self,
        storage: &dyn Storage,
        manager_ctx: &gridnode_provisioner::ManagerContext,
        twin: u32,
        contract: u64,
        workloads: &[Workload],
    ) -> Result<(), EngineError> {
        for ty in self.order.install_order() {
            let of_type: Vec<&Workload> = workloads.iter().filter(|w| w.workload_type == *ty).collect();
            for workload in sorted_for_install_within_type(&of_type) {
                transitions::install_workload(storage, &self.registry, manager_ctx, twin, contract, workload, true)
                    .await?;
            }
        }
        Ok(())
    }

    async fn dispatch_update(
        &self,
        storage: &dyn Storage,
        manager_ctx: &gridnode_provisioner::ManagerContext,
        job: &Job,
        twin: u32,
        contract: u64,
    ) -> Result<(), EngineError> {
        let Some(source) = job.source.as_ref() else {
            warn!(twin, contract, "update job carried no source deployment, skipping");
            return Ok(());
        };

        let plan = match gridnode_planner::plan_upgrade(source, &job.target, &self.registry) {
            Ok(plan) => plan,
            Err(e) => {
                error!(twin, contract, error = %e, "update plan rejected on replay");
                storage.error(twin, contract, e.to_string())?;
                return Ok(());
            }
        };

        let mut removes: Vec<&str> = plan
            .ops
            .iter()
            .filter_map(|op| match op {
                gridnode_planner::Op::Remove(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        removes.sort_by_key(|name| {
            let rank = source.workload(name).map(|w| self.order.rank(w.workload_type)).unwrap_or(0);
            std::cmp::Reverse(rank)
        });
        for name in removes {
            if let Some(workload) = source.workload(name) {
                transitions::uninstall_workload(
                    storage,
                    &self.registry,
                    manager_ctx,
                    twin,
                    contract,
                    workload,
                    "removed by update",
                )
                .await?;
            }
        }

        let mut rest: Vec<&gridnode_planner::Op> = plan
            .ops
            .iter()
            .filter(|op| !matches!(op, gridnode_planner::Op::Remove(_)))
            .collect();
        rest.sort_by_key(|op| {
            job.target
                .workload(op.workload_name())
                .map(|w| self.order.rank(w.workload_type))
                .unwrap_or(usize::MAX)
        });
        for op in rest {
            match op {
                gridnode_planner::Op::Add(workload) => {
                    transitions::install_workload(storage, &self.registry, manager_ctx, twin, contract, workload, true)
                        .await?;
                }
                gridnode_planner::Op::Update(workload) => {
                    transitions::update_workload(storage, &self.registry, manager_ctx, twin, contract, workload)
                        .await?;
                }
                gridnode_planner::Op::Remove(_) => unreachable!("removes filtered out above"),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemStorage;
    use gridnode_chain::testutil::ScriptedGateway;
    use gridnode_chain::{Contract, ContractKind, SubstrateError};
    use gridnode_provisioner::NullManager;
    use gridnode_types::codec::challenge_hash;
    use gridnode_types::deployment::{Deployment, SignatureRequirement};
    use gridnode_types::workload::{WorkloadResult, WorkloadState, WorkloadType};
    use std::sync::atomic::{AtomicU32, Ordering};

    const NODE_ID: u64 = 7;
    const TWIN: u32 = 1;
    const CONTRACT: u64 = 1;

    fn deployment(workloads: Vec<Workload>) -> Deployment {
        Deployment {
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
            workloads,
        }
    }

    fn matching_contract(d: &Deployment) -> Contract {
        Contract {
            contract_id: d.contract_id,
            kind: ContractKind::NodeContract,
            node_id: NODE_ID,
            deployment_hash: challenge_hash(d),
        }
    }

    fn full_registry() -> ManagerRegistry {
        let mut reg = ManagerRegistry::new();
        for ty in WorkloadType::ALL {
            reg.register(ty, Arc::new(NullManager::always_ok()));
        }
        reg
    }

    async fn engine_with(
        storage: Arc<MemStorage>,
        gateway: ScriptedGateway,
        registry: ManagerRegistry,
    ) -> (Engine, Arc<gridnode_queue::FileQueue>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(gridnode_queue::FileQueue::open(dir.path()).unwrap());
        let validator = Arc::new(ContractValidator::new(Arc::new(gateway), NODE_ID));
        let engine = Engine::new(storage, queue.clone(), registry, validator, CanonicalOrder::default());
        (engine, queue, dir)
    }

    #[tokio::test]
    async fn provision_installs_every_workload_in_canonical_order() {
        let d = deployment(vec![
            Workload::new("vm", WorkloadType::ZMachine, vec![]),
            Workload::new("net", WorkloadType::Network, vec![]),
        ]);
        let storage = Arc::new(MemStorage::new());
        storage.create(d.clone()).unwrap();
        let gateway = ScriptedGateway::new(Ok(matching_contract(&d)), Ok(d.contract_id));
        let (engine, queue, _dir) = engine_with(storage.clone(), gateway, full_registry()).await;

        queue.enqueue(Job::provision(d)).await.unwrap();
        engine.step().await.unwrap();

        assert_eq!(storage.current(TWIN, CONTRACT, "vm").unwrap().state, WorkloadState::Ok);
        assert_eq!(storage.current(TWIN, CONTRACT, "net").unwrap().state, WorkloadState::Ok);
    }

    #[tokio::test]
    async fn provision_fails_closed_on_validator_rejection() {
        let d = deployment(vec![Workload::new("net", WorkloadType::Network, vec![])]);
        let storage = Arc::new(MemStorage::new());
        storage.create(d.clone()).unwrap();
        let gateway = ScriptedGateway::new(Err(SubstrateError::NotFound), Ok(d.contract_id));
        let (engine, queue, _dir) = engine_with(storage.clone(), gateway, full_registry()).await;

        queue.enqueue(Job::provision(d)).await.unwrap();
        engine.step().await.unwrap();

        assert!(storage.current(TWIN, CONTRACT, "net").is_err(), "no workload should have been installed");
        assert!(storage.get(TWIN, CONTRACT).unwrap().global_error.is_some());
    }

    #[tokio::test]
    async fn provision_no_validation_skips_the_gateway() {
        let d = deployment(vec![Workload::new("net", WorkloadType::Network, vec![])]);
        let storage = Arc::new(MemStorage::new());
        storage.create(d.clone()).unwrap();
        let gateway = ScriptedGateway::new(Err(SubstrateError::NotFound), Err(SubstrateError::NotFound));
        let (engine, queue, _dir) = engine_with(storage.clone(), gateway, full_registry()).await;

        queue.enqueue(Job::provision_no_validation(d)).await.unwrap();
        engine.step().await.unwrap();

        assert_eq!(storage.current(TWIN, CONTRACT, "net").unwrap().state, WorkloadState::Ok);
    }

    #[tokio::test]
    async fn deprovision_deletes_deployment_once_every_workload_is_settled() {
        let d = deployment(vec![Workload::new("net", WorkloadType::Network, vec![])]);
        let storage = Arc::new(MemStorage::new());
        storage.create(d.clone()).unwrap();
        let gateway = ScriptedGateway::new(Ok(matching_contract(&d)), Ok(d.contract_id));
        let (engine, queue, _dir) = engine_with(storage.clone(), gateway, full_registry()).await;

        queue.enqueue(Job::provision(d.clone())).await.unwrap();
        engine.step().await.unwrap();

        queue.enqueue(Job::deprovision(d, "torn down")).await.unwrap();
        engine.step().await.unwrap();

        assert!(storage.get(TWIN, CONTRACT).is_err(), "deployment should be gone from storage");
    }

    #[tokio::test]
    async fn rerun_all_reenqueues_every_stored_deployment_without_validation() {
        let d = deployment(vec![Workload::new("net", WorkloadType::Network, vec![])]);
        let storage = Arc::new(MemStorage::new());
        storage.create(d.clone()).unwrap();
        storage
            .transaction(
                TWIN,
                CONTRACT,
                gridnode_types::transaction::Transaction {
                    workload_name: "net".into(),
                    workload_type: WorkloadType::Network,
                    data_snapshot: vec![],
                    result: WorkloadResult::error(0, "boot drift"),
                    timestamp: 0,
                },
            )
            .unwrap();

        let gateway = ScriptedGateway::new(Err(SubstrateError::NotFound), Err(SubstrateError::NotFound));
        let (engine, queue, _dir) = engine_with(storage.clone(), gateway, full_registry()).await;

        engine.rerun_all().await.unwrap();
        engine.step().await.unwrap();

        assert_eq!(storage.current(TWIN, CONTRACT, "net").unwrap().state, WorkloadState::Ok);
    }

    #[tokio::test]
    async fn job_exceeding_its_timeout_is_left_at_the_head_of_the_queue() {
        let d = deployment(vec![Workload::new("net", WorkloadType::Network, vec![])]);
        let storage = Arc::new(MemStorage::new());
        storage.create(d.clone()).unwrap();

        struct StuckGateway;
        #[async_trait::async_trait]
        impl gridnode_chain::SubstrateGateway for StuckGateway {
            async fn get_contract(&self, _: u64) -> Result<Contract, SubstrateError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("slept forever")
            }
            async fn get_node_rent_contract(&self, _: u64) -> Result<u64, SubstrateError> {
                Ok(0)
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(gridnode_queue::FileQueue::open(dir.path()).unwrap());
        let validator = Arc::new(ContractValidator::new(Arc::new(StuckGateway), NODE_ID));
        let engine = Engine::new(storage, queue.clone(), full_registry(), validator, CanonicalOrder::default())
            .with_job_timeout(Duration::from_millis(10));

        queue.enqueue(Job::provision(d.clone())).await.unwrap();
        let err = engine.step().await.unwrap_err();
        assert!(matches!(err, EngineError::JobTimedOut(_)));

        // still at the head: peeking again returns the same job.
        let peeked = queue.peek_block().await.unwrap();
        assert_eq!(peeked.twin(), d.twin_id);
    }

    #[tokio::test]
    async fn callback_fires_with_deleted_flag_and_panics_do_not_escape() {
        let d = deployment(vec![Workload::new("net", WorkloadType::Network, vec![])]);
        let storage = Arc::new(MemStorage::new());
        storage.create(d.clone()).unwrap();
        let gateway = ScriptedGateway::new(Ok(matching_contract(&d)), Ok(d.contract_id));
        let (engine, queue, _dir) = engine_with(storage, gateway, full_registry()).await;

        let calls = Arc::new(AtomicU32::new(0));
        let calls_for_cb = calls.clone();
        let engine = engine.with_callback(Arc::new(move |_twin, _contract, _deleted| {
            calls_for_cb.fetch_add(1, Ordering::SeqCst);
            panic!("callbacks must not be allowed to kill the worker");
        }));

        queue.enqueue(Job::provision(d)).await.unwrap();
        engine.step().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
