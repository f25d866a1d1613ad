//! An in-memory `Storage` double, grounded on `gridnode-storage`'s
//! `FileStore` semantics but backed by a `HashMap` instead of a directory
//! tree. Not `cfg(test)`-gated so `tests/scenarios.rs` (a separate crate
//! target) can depend on it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use gridnode_storage::{DeploymentSnapshot, Storage};
use gridnode_types::deployment::DeploymentFields;
use gridnode_types::error::StorageError;
use gridnode_types::{Deployment, Transaction, Workload, WorkloadResult, WorkloadState};

struct Record {
    deployment: Deployment,
    workload_results: BTreeMap<String, WorkloadResult>,
    changes: Vec<Transaction>,
    global_error: Option<String>,
}

pub struct MemStorage {
    records: Mutex<HashMap<(u32, u64), Record>>,
}

impl Default for MemStorage {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemStorage {
    fn create(&self, deployment: Deployment) -> Result<(), StorageError> {
        let mut records = self.records.lock().unwrap();
        let key = (deployment.twin_id, deployment.contract_id);
        if records.contains_key(&key) {
            return Err(StorageError::AlreadyExists {
                twin: key.0,
                contract: key.1,
            });
        }
        records.insert(
            key,
            Record {
                deployment,
                workload_results: BTreeMap::new(),
                changes: Vec::new(),
                global_error: None,
            },
        );
        Ok(())
    }

    fn update(&self, twin: u32, contract: u64, fields: DeploymentFields) -> Result<(), StorageError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&(twin, contract))
            .ok_or(StorageError::NotFound { twin, contract })?;
        if let Some(v) = fields.version {
            record.deployment.version = v;
        }
        if let Some(d) = fields.description {
            record.deployment.description = d;
        }
        if let Some(m) = fields.metadata {
            record.deployment.metadata = m;
        }
        if let Some(sr) = fields.signature_requirement {
            record.deployment.signature_requirement = sr;
        }
        Ok(())
    }

    fn get(&self, twin: u32, contract: u64) -> Result<DeploymentSnapshot, StorageError> {
        let records = self.records.lock().unwrap();
        let record = records.get(&(twin, contract)).ok_or(StorageError::NotFound { twin, contract })?;
        Ok(DeploymentSnapshot {
            deployment: record.deployment.clone(),
            workload_results: record.workload_results.clone(),
            global_error: record.global_error.clone(),
        })
    }

    fn current(&self, twin: u32, contract: u64, name: &str) -> Result<WorkloadResult, StorageError> {
        let records = self.records.lock().unwrap();
        let record = records.get(&(twin, contract)).ok_or(StorageError::NotFound { twin, contract })?;
        record
            .workload_results
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::WorkloadNotExist {
                twin,
                contract,
                name: name.to_string(),
            })
    }

    fn add(&self, twin: u32, contract: u64, workload: Workload) -> Result<(), StorageError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&(twin, contract))
            .ok_or(StorageError::NotFound { twin, contract })?;
        if record.deployment.workload(&workload.name).is_some() {
            return Err(StorageError::WorkloadAlreadyExists {
                twin,
                contract,
                name: workload.name,
            });
        }
        record.deployment.workloads.push(workload);
        Ok(())
    }

    fn transaction(&self, twin: u32, contract: u64, tx: Transaction) -> Result<(), StorageError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&(twin, contract))
            .ok_or(StorageError::NotFound { twin, contract })?;
        record.workload_results.insert(tx.workload_name.clone(), tx.result.clone());
        record.changes.push(tx);
        Ok(())
    }

    fn remove(&self, twin: u32, contract: u64, name: &str) -> Result<(), StorageError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&(twin, contract))
            .ok_or(StorageError::NotFound { twin, contract })?;
        let sealed = record
            .workload_results
            .get(name)
            .map(|r| r.state == WorkloadState::Deleted)
            .unwrap_or(false);
        if !sealed {
            return Err(StorageError::WorkloadNotExist {
                twin,
                contract,
                name: name.to_string(),
            });
        }
        record.deployment.workloads.retain(|w| w.name != name);
        record.workload_results.remove(name);
        Ok(())
    }

    fn delete(&self, twin: u32, contract: u64) -> Result<(), StorageError> {
        let mut records = self.records.lock().unwrap();
        records
            .remove(&(twin, contract))
            .map(|_| ())
            .ok_or(StorageError::NotFound { twin, contract })
    }

    fn twins(&self) -> Result<Vec<u32>, StorageError> {
        let records = self.records.lock().unwrap();
        let mut out: Vec<u32> = records.keys().map(|(twin, _)| *twin).collect();
        out.sort_unstable();
        out.dedup();
        Ok(out)
    }

    fn by_twin(&self, twin: u32) -> Result<Vec<DeploymentSnapshot>, StorageError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|((t, _), _)| *t == twin)
            .map(|(_, record)| DeploymentSnapshot {
                deployment: record.deployment.clone(),
                workload_results: record.workload_results.clone(),
                global_error: record.global_error.clone(),
            })
            .collect())
    }

    fn changes(&self, twin: u32, contract: u64) -> Result<Vec<Transaction>, StorageError> {
        let records = self.records.lock().unwrap();
        let record = records.get(&(twin, contract)).ok_or(StorageError::NotFound { twin, contract })?;
        Ok(record.changes.clone())
    }

    fn error(&self, twin: u32, contract: u64, err: String) -> Result<(), StorageError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&(twin, contract))
            .ok_or(StorageError::NotFound { twin, contract })?;
        record.global_error = Some(err);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridnode_types::deployment::SignatureRequirement;
    use gridnode_types::workload::WorkloadType;

    fn sample(twin: u32, contract: u64) -> Deployment {
        Deployment {
            twin_id: twin,
            contract_id: contract,
            version: 0,
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

    #[test]
    fn create_then_get_round_trips() {
        let s = MemStorage::new();
        s.create(sample(7, 42)).unwrap();
        assert_eq!(s.get(7, 42).unwrap().deployment.twin_id, 7);
    }

    #[test]
    fn delete_removes_record() {
        let s = MemStorage::new();
        s.create(sample(7, 42)).unwrap();
        s.delete(7, 42).unwrap();
        assert!(matches!(s.get(7, 42).unwrap_err(), StorageError::NotFound { .. }));
    }
}
