//! File-backed `Storage` implementation.
//!
//! Layout under `root`: `root/<twin>/<contract>/state.bin` holds an
//! atomically-rewritten snapshot (declared workloads, latest per-workload
//! result, global error); `root/<twin>/<contract>/transactions.log` holds
//! the append-only transaction history. State mutations use a
//! write-to-temp-then-rename pattern: a crash mid-write must never leave a
//! half-written file behind.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use gridnode_types::{
    codec, deployment::DeploymentFields, Deployment, StorageError, Transaction, Workload,
    WorkloadResult, WorkloadState,
};
use parity_scale_codec::{Decode, Encode};

use crate::{record, DeploymentSnapshot, Storage};

#[derive(Encode, Decode, Clone)]
struct StateRecord {
    deployment: Deployment,
    workload_results: Vec<(String, WorkloadResult)>,
    global_error: Option<String>,
}

impl StateRecord {
    fn results_map(&self) -> BTreeMap<String, WorkloadResult> {
        self.workload_results.iter().cloned().collect()
    }
}

/// A durable, single-process, file-backed `Storage`. Concurrent mutators
/// are serialized by a single in-process mutex, satisfying §5's "Storage's
/// own API must serialize concurrent mutators on the same (twin, contract)
/// pair" with the simplest implementation that meets it; there is only ever
/// one process touching this root, so coarse-grained serialization costs
/// nothing observable under the engine's single-worker model.
pub struct FileStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    fn deployment_dir(&self, twin: u32, contract: u64) -> PathBuf {
        self.root.join(twin.to_string()).join(contract.to_string())
    }

    fn state_path(&self, twin: u32, contract: u64) -> PathBuf {
        self.deployment_dir(twin, contract).join("state.bin")
    }

    fn log_path(&self, twin: u32, contract: u64) -> PathBuf {
        self.deployment_dir(twin, contract).join("transactions.log")
    }

    fn read_state(&self, twin: u32, contract: u64) -> Result<StateRecord, StorageError> {
        let path = self.state_path(twin, contract);
        if !path.exists() {
            return Err(StorageError::NotFound { twin, contract });
        }
        let bytes = fs::read(&path).map_err(|e| StorageError::Backend(e.to_string()))?;
        codec::from_bytes_canonical(&bytes).map_err(StorageError::Decode)
    }

    fn write_state_atomic(
        &self,
        twin: u32,
        contract: u64,
        state: &StateRecord,
    ) -> Result<(), StorageError> {
        let dir = self.deployment_dir(twin, contract);
        fs::create_dir_all(&dir).map_err(|e| StorageError::Backend(e.to_string()))?;
        let tmp = dir.join("state.bin.tmp");
        let bytes = codec::to_bytes_canonical(state);
        fs::write(&tmp, &bytes).map_err(|e| StorageError::Backend(e.to_string()))?;
        fs::rename(&tmp, self.state_path(twin, contract))
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl Storage for FileStore {
    fn create(&self, deployment: Deployment) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap();
        let twin = deployment.twin_id;
        let contract = deployment.contract_id;
        if self.state_path(twin, contract).exists() {
            return Err(StorageError::AlreadyExists { twin, contract });
        }
        let state = StateRecord {
            deployment,
            workload_results: Vec::new(),
            global_error: None,
        };
        self.write_state_atomic(twin, contract, &state)
    }

    fn update(
        &self,
        twin: u32,
        contract: u64,
        fields: DeploymentFields,
    ) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap();
        let mut state = self.read_state(twin, contract)?;
        if let Some(v) = fields.version {
            state.deployment.version = v;
        }
        if let Some(d) = fields.description {
            state.deployment.description = d;
        }
        if let Some(m) = fields.metadata {
            state.deployment.metadata = m;
        }
        if let Some(sr) = fields.signature_requirement {
            state.deployment.signature_requirement = sr;
        }
        self.write_state_atomic(twin, contract, &state)
    }

    fn get(&self, twin: u32, contract: u64) -> Result<DeploymentSnapshot, StorageError> {
        let _guard = self.lock.lock().unwrap();
        let state = self.read_state(twin, contract)?;
        Ok(DeploymentSnapshot {
            deployment: state.deployment,
            workload_results: state.results_map(),
            global_error: state.global_error,
        })
    }

    fn current(&self, twin: u32, contract: u64, name: &str) -> Result<WorkloadResult, StorageError> {
        let _guard = self.lock.lock().unwrap();
        let state = self.read_state(twin, contract)?;
        state
            .workload_results
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
            .ok_or_else(|| StorageError::WorkloadNotExist {
                twin,
                contract,
                name: name.to_string(),
            })
    }

    fn add(&self, twin: u32, contract: u64, workload: Workload) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap();
        let mut state = self.read_state(twin, contract)?;
        if state.deployment.workload(&workload.name).is_some() {
            return Err(StorageError::WorkloadAlreadyExists {
                twin,
                contract,
                name: workload.name,
            });
        }
        state.deployment.workloads.push(workload);
        self.write_state_atomic(twin, contract, &state)
    }

    fn transaction(&self, twin: u32, contract: u64, tx: Transaction) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap();
        let mut state = self.read_state(twin, contract)?;
        let bytes = codec::to_bytes_canonical(&tx);
        record::append(&self.log_path(twin, contract), &bytes)?;
        if let Some(entry) = state
            .workload_results
            .iter_mut()
            .find(|(n, _)| *n == tx.workload_name)
        {
            entry.1 = tx.result;
        } else {
            state.workload_results.push((tx.workload_name, tx.result));
        }
        self.write_state_atomic(twin, contract, &state)
    }

    fn remove(&self, twin: u32, contract: u64, name: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap();
        let mut state = self.read_state(twin, contract)?;
        let sealed = state
            .workload_results
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r.state == WorkloadState::Deleted)
            .unwrap_or(false);
        if !sealed {
            return Err(StorageError::WorkloadNotExist {
                twin,
                contract,
                name: name.to_string(),
            });
        }
        state.deployment.workloads.retain(|w| w.name != name);
        state.workload_results.retain(|(n, _)| n != name);
        self.write_state_atomic(twin, contract, &state)
    }

    fn delete(&self, twin: u32, contract: u64) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap();
        let dir = self.deployment_dir(twin, contract);
        if !dir.exists() {
            return Err(StorageError::NotFound { twin, contract });
        }
        fs::remove_dir_all(&dir).map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    fn twins(&self) -> Result<Vec<u32>, StorageError> {
        let _guard = self.lock.lock().unwrap();
        let mut out = Vec::new();
        if !self.root.exists() {
            return Ok(out);
        }
        for entry in fs::read_dir(&self.root).map_err(|e| StorageError::Backend(e.to_string()))? {
            let entry = entry.map_err(|e| StorageError::Backend(e.to_string()))?;
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(twin) = name.parse::<u32>() {
                    out.push(twin);
                }
            }
        }
        out.sort_unstable();
        Ok(out)
    }

    fn by_twin(&self, twin: u32) -> Result<Vec<DeploymentSnapshot>, StorageError> {
        let twin_dir = self.root.join(twin.to_string());
        let mut out = Vec::new();
        if !twin_dir.exists() {
            return Ok(out);
        }
        let contracts: Vec<u64> = {
            let _guard = self.lock.lock().unwrap();
            fs::read_dir(&twin_dir)
                .map_err(|e| StorageError::Backend(e.to_string()))?
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().to_str().and_then(|s| s.parse::<u64>().ok()))
                .collect()
        };
        for contract in contracts {
            out.push(self.get(twin, contract)?);
        }
        Ok(out)
    }

    fn changes(&self, twin: u32, contract: u64) -> Result<Vec<Transaction>, StorageError> {
        let raw = record::read_all(&self.log_path(twin, contract))?;
        raw.iter()
            .map(|b| codec::from_bytes_canonical(b).map_err(StorageError::Decode))
            .collect()
    }

    fn error(&self, twin: u32, contract: u64, err: String) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap();
        let mut state = self.read_state(twin, contract)?;
        state.global_error = Some(err);
        self.write_state_atomic(twin, contract, &state)
    }
}
