//! Append-only transaction log entries (§3).

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::workload::{WorkloadResult, WorkloadType};

/// One append-only log entry recording a single observed result for a
/// single workload at a single point in time. Order within a workload is
/// strictly by append order (§3 invariant); order across workloads in the
/// same deployment is not required to be total.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub workload_name: String,
    pub workload_type: WorkloadType,
    /// Snapshot of the workload's `data` at the time this transaction was
    /// recorded, so replaying history shows what was actually installed.
    pub data_snapshot: Vec<u8>,
    pub result: WorkloadResult,
    pub timestamp: u64,
}
