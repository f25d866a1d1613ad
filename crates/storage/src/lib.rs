//! Pure-Rust persistent storage for deployments and their append-only
//! per-workload transaction log (§4.1).
//!
//! The layout under the storage root is an implementation detail the rest
//! of the engine never inspects directly (§6): one subdirectory per
//! `(twin, contract)` pair, holding an atomically-rewritten state snapshot
//! and a write-ahead-log-style append-only transaction file.

mod file_store;
mod record;

pub use file_store::FileStore;

use std::collections::BTreeMap;

use gridnode_types::{
    deployment::DeploymentFields, Deployment, StorageError, Transaction, Workload, WorkloadResult,
};

/// A full snapshot of a deployment: its declared workloads plus the latest
/// observed result for each one that has ever had a transaction recorded
/// (§4.1 `Get`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSnapshot {
    pub deployment: Deployment,
    pub workload_results: BTreeMap<String, WorkloadResult>,
    /// Set by `Storage::error` when contract validation fails before any
    /// per-workload work begins (§4.3).
    pub global_error: Option<String>,
}

impl DeploymentSnapshot {
    pub fn result_of(&self, name: &str) -> Option<&WorkloadResult> {
        self.workload_results.get(name)
    }
}

/// Durable storage of deployment records and their transaction history
/// (§4.1). Implementations must make every mutator atomic: it either
/// commits fully or leaves no partial effect.
pub trait Storage: Send + Sync {
    /// Persists a fresh deployment at `version == 0`. Fails with
    /// `AlreadyExists` if `(twin, contract)` already has a record.
    fn create(&self, deployment: Deployment) -> Result<(), StorageError>;

    /// Partial update of `version`, `description`, `metadata`, and/or
    /// `signature_requirement`. No other field is ever patched in place.
    fn update(&self, twin: u32, contract: u64, fields: DeploymentFields) -> Result<(), StorageError>;

    /// The full snapshot, including the current state of every workload
    /// that has ever recorded a transaction.
    fn get(&self, twin: u32, contract: u64) -> Result<DeploymentSnapshot, StorageError>;

    /// The latest recorded result for one workload. `WorkloadNotExist` if no
    /// transaction has ever been recorded for that name.
    fn current(&self, twin: u32, contract: u64, name: &str) -> Result<WorkloadResult, StorageError>;

    /// Introduces a brand-new workload name to the deployment's declared
    /// workload list (used by Update when a workload is added). Fails if
    /// the name already exists.
    fn add(&self, twin: u32, contract: u64, workload: Workload) -> Result<(), StorageError>;

    /// Appends a new transaction, updating the workload's latest result.
    fn transaction(&self, twin: u32, contract: u64, tx: Transaction) -> Result<(), StorageError>;

    /// Drops a workload from the declared list once its terminal state is
    /// `Deleted`. Does not touch transaction history.
    fn remove(&self, twin: u32, contract: u64, name: &str) -> Result<(), StorageError>;

    /// Removes the deployment record entirely (used only once every
    /// workload has reached `Deleted`).
    fn delete(&self, twin: u32, contract: u64) -> Result<(), StorageError>;

    /// All twins with at least one stored deployment.
    fn twins(&self) -> Result<Vec<u32>, StorageError>;

    /// All deployment snapshots belonging to a twin.
    fn by_twin(&self, twin: u32) -> Result<Vec<DeploymentSnapshot>, StorageError>;

    /// Full transaction history across every workload of a deployment, in
    /// append order.
    fn changes(&self, twin: u32, contract: u64) -> Result<Vec<Transaction>, StorageError>;

    /// Sets a deployment-global error (used when contract validation fails
    /// before any per-workload work occurs, §4.3).
    fn error(&self, twin: u32, contract: u64, err: String) -> Result<(), StorageError>;
}
