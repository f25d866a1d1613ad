//! Pre-queue admission checks (§4.8): everything that must pass before a
//! deployment is persisted and a job is enqueued. This is the boundary the
//! (out-of-scope) RPC ingress calls into.

use std::sync::Arc;

use gridnode_identity::TwinVerifier;
use gridnode_provisioner::ManagerRegistry;
use gridnode_queue::Queue;
use gridnode_storage::Storage;
use gridnode_types::deployment::{Deployment, DeploymentFields};
use gridnode_types::error::AdmissionError;
use gridnode_types::job::Job;

use crate::error::SubmissionError;

pub struct Admission {
    storage: Arc<dyn Storage>,
    queue: Arc<dyn Queue>,
    twin_verifier: Arc<dyn TwinVerifier>,
}

impl Admission {
    pub fn new(storage: Arc<dyn Storage>, queue: Arc<dyn Queue>, twin_verifier: Arc<dyn TwinVerifier>) -> Self {
        Self {
            storage,
            queue,
            twin_verifier,
        }
    }

    /// §4.8 checks 1, 2, 3, 4, in order — cheapest/local first.
    async fn check_common(&self, message_twin_id: u32, deployment: &Deployment) -> Result<(), SubmissionError> {
        deployment
            .validate_schema()
            .map_err(AdmissionError::InvalidSchema)?;

        if message_twin_id != deployment.twin_id {
            return Err(AdmissionError::TwinIdMismatch {
                message: message_twin_id,
                deployment: deployment.twin_id,
            }
            .into());
        }

        // A verifier call that fails after retries is treated the same as
        // an explicit "not verified" answer: fail closed rather than admit
        // a deployment we couldn't confirm KYC status for.
        let verified = self
            .twin_verifier
            .is_verified(deployment.twin_id)
            .await
            .unwrap_or(false);
        if !verified {
            return Err(AdmissionError::TwinNotVerified(deployment.twin_id).into());
        }

        let asserted_signers: Vec<u32> = deployment
            .signature_requirement
            .signatures
            .iter()
            .map(|(idx, _)| *idx)
            .collect();
        if !deployment.signature_requirement.is_satisfied_by(&asserted_signers) {
            return Err(AdmissionError::SignatureRequirementNotSatisfied(
                "attached signatures do not meet the threshold".into(),
            )
            .into());
        }

        Ok(())
    }

    pub async fn submit_provision(&self, message_twin_id: u32, deployment: Deployment) -> Result<(), SubmissionError> {
        self.check_common(message_twin_id, &deployment).await?;
        if deployment.version != 0 {
            return Err(AdmissionError::InvalidVersion(deployment.version).into());
        }
        self.storage.create(deployment.clone())?;
        self.queue.enqueue(Job::provision(deployment)).await?;
        Ok(())
    }

    pub async fn submit_update(
        &self,
        message_twin_id: u32,
        source: Deployment,
        target: Deployment,
        registry: &ManagerRegistry,
    ) -> Result<(), SubmissionError> {
        self.check_common(message_twin_id, &target).await?;

        if target.version <= source.version {
            return Err(AdmissionError::InvalidVersion(target.version).into());
        }

        let plan = gridnode_planner::plan_upgrade(&source, &target, registry).map_err(AdmissionError::from)?;

        self.storage.update(
            target.twin_id,
            target.contract_id,
            DeploymentFields {
                version: Some(target.version),
                description: Some(target.description.clone()),
                metadata: Some(target.metadata.clone()),
                signature_requirement: Some(target.signature_requirement.clone()),
            },
        )?;
        for op in &plan.ops {
            if let gridnode_planner::Op::Add(workload) = op {
                self.storage.add(target.twin_id, target.contract_id, workload.clone())?;
            }
        }

        self.queue.enqueue(Job::update(source, target)).await?;
        Ok(())
    }

    pub async fn submit_deprovision(&self, target: Deployment, message: String) -> Result<(), SubmissionError> {
        self.queue.enqueue(Job::deprovision(target, message)).await?;
        Ok(())
    }

    pub async fn submit_pause(&self, target: Deployment) -> Result<(), SubmissionError> {
        self.queue.enqueue(Job::pause(target)).await?;
        Ok(())
    }

    pub async fn submit_resume(&self, target: Deployment) -> Result<(), SubmissionError> {
        self.queue.enqueue(Job::resume(target)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemStorage;
    use gridnode_identity::testutil::ScriptedVerifier;
    use gridnode_queue::FileQueue;
    use gridnode_types::deployment::SignatureRequirement;
    use gridnode_types::workload::{Workload, WorkloadType};

    const TWIN: u32 = 7;
    const CONTRACT: u64 = 42;

    fn deployment(version: u32) -> Deployment {
        Deployment {
            twin_id: TWIN,
            contract_id: CONTRACT,
            version,
            description: String::new(),
            metadata: String::new(),
            signature_requirement: SignatureRequirement {
                threshold: 0,
                keys: vec![],
                signatures: vec![],
            },
            workloads: vec![Workload::new("n", WorkloadType::Network, vec![])],
        }
    }

    fn admission(verified: bool) -> (Admission, Arc<FileQueue>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(FileQueue::open(dir.path().join("jobs")).unwrap());
        let verifier: Arc<dyn gridnode_identity::TwinVerifier> = if verified {
            Arc::new(ScriptedVerifier::always_verified())
        } else {
            Arc::new(ScriptedVerifier::never_verified())
        };
        let storage: Arc<dyn Storage> = Arc::new(MemStorage::new());
        (Admission::new(storage, queue.clone(), verifier), queue, dir)
    }

    #[tokio::test]
    async fn submit_provision_enqueues_when_verified() {
        let (admission, queue, _dir) = admission(true);
        admission.submit_provision(TWIN, deployment(0)).await.unwrap();
        let job = queue.peek_block().await.unwrap();
        assert_eq!(job.op, gridnode_types::job::JobOp::Provision);
    }

    #[tokio::test]
    async fn submit_provision_rejects_unverified_twin() {
        let (admission, _queue, _dir) = admission(false);
        let err = admission.submit_provision(TWIN, deployment(0)).await.unwrap_err();
        assert!(matches!(
            err,
            SubmissionError::Admission(AdmissionError::TwinNotVerified(TWIN))
        ));
    }

    #[tokio::test]
    async fn submit_provision_rejects_twin_id_mismatch() {
        let (admission, _queue, _dir) = admission(true);
        let err = admission.submit_provision(TWIN + 1, deployment(0)).await.unwrap_err();
        assert!(matches!(
            err,
            SubmissionError::Admission(AdmissionError::TwinIdMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn submit_provision_rejects_nonzero_version() {
        let (admission, _queue, _dir) = admission(true);
        let err = admission.submit_provision(TWIN, deployment(1)).await.unwrap_err();
        assert!(matches!(
            err,
            SubmissionError::Admission(AdmissionError::InvalidVersion(1))
        ));
    }

    #[tokio::test]
    async fn submit_update_rejects_non_increasing_version() {
        let (admission, _queue, _dir) = admission(true);
        let source = deployment(1);
        let same_version = deployment(1);
        let err = admission
            .submit_update(TWIN, source.clone(), same_version, &ManagerRegistry::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmissionError::Admission(AdmissionError::InvalidVersion(1))
        ));

        let older_version = deployment(0);
        let err = admission
            .submit_update(TWIN, source, older_version, &ManagerRegistry::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmissionError::Admission(AdmissionError::InvalidVersion(0))
        ));
    }

    #[tokio::test]
    async fn submit_provision_rejects_duplicate_workload_names() {
        let (admission, _queue, _dir) = admission(true);
        let mut d = deployment(0);
        d.workloads.push(Workload::new("n", WorkloadType::ZDB, vec![]));
        let err = admission.submit_provision(TWIN, d).await.unwrap_err();
        assert!(matches!(
            err,
            SubmissionError::Admission(AdmissionError::InvalidSchema(_))
        ));
    }
}
