//! Workload data model (§3, §6).

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The closed set of workload kinds the engine can reconcile, in canonical
/// install order (§4.7, §6). `Volume`/`ZMount` additionally tie-break on
/// declared size within the type (see `gridnode-provisioner::order`).
#[derive(
    Encode, Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum WorkloadType {
    Network,
    NetworkLight,
    PublicIP,
    /// Legacy alias for `PublicIP`, kept distinct in the wire format so
    /// existing deployments referencing it continue to decode.
    PublicIPv4,
    GatewayNameProxy,
    GatewayFQDNProxy,
    ZMount,
    Volume,
    ZDB,
    QuantumSafeFS,
    ZLogs,
    ZMachine,
    ZMachineLight,
}

impl WorkloadType {
    /// All tags, in the canonical top-to-bottom order defined by §6.
    /// This is the *default* order; callers may override the leading
    /// prefix (§4.7) via `gridnode_provisioner::order::CanonicalOrder`.
    pub const ALL: [WorkloadType; 13] = [
        WorkloadType::Network,
        WorkloadType::NetworkLight,
        WorkloadType::PublicIP,
        WorkloadType::PublicIPv4,
        WorkloadType::GatewayNameProxy,
        WorkloadType::GatewayFQDNProxy,
        WorkloadType::ZMount,
        WorkloadType::Volume,
        WorkloadType::ZDB,
        WorkloadType::QuantumSafeFS,
        WorkloadType::ZLogs,
        WorkloadType::ZMachine,
        WorkloadType::ZMachineLight,
    ];

    /// Whether this type participates in the disk-like size tie-break rule
    /// (§4.7, testable property 7).
    pub fn is_disk_like(self) -> bool {
        matches!(self, WorkloadType::ZMount | WorkloadType::Volume)
    }
}

/// The state machine a single workload's result moves through (§3, §4.6).
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadState {
    /// No transaction has ever been recorded (`Storage::Current` returns
    /// `WorkloadNotExist` in this state — it is not itself stored).
    Unchanged,
    Ok,
    Error,
    Deleted,
    Paused,
}

impl WorkloadState {
    /// §3 invariant: once `Deleted` or `Error`, no further state-changing
    /// operation is attempted for that workload during the same deployment
    /// lifetime.
    pub fn is_sealed(self) -> bool {
        matches!(self, WorkloadState::Deleted | WorkloadState::Error)
    }

    /// §4.6: pause/resume only act on workloads whose current state `IsOkay`.
    pub fn is_okay(self) -> bool {
        matches!(self, WorkloadState::Ok)
    }
}

/// The latest observed outcome of installing/updating/tearing down a
/// workload (§3).
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WorkloadResult {
    pub state: WorkloadState,
    /// Unix seconds; monotonic per workload because transactions are
    /// appended in order.
    pub created_at: u64,
    /// Type-specific output payload (e.g. an assigned IP, a mount path).
    /// Opaque to the engine.
    pub data: Vec<u8>,
    /// Populated when `state == Error`.
    pub error: Option<String>,
}

impl WorkloadResult {
    pub fn ok(created_at: u64, data: Vec<u8>) -> Self {
        Self {
            state: WorkloadState::Ok,
            created_at,
            data,
            error: None,
        }
    }

    pub fn error(created_at: u64, message: impl Into<String>) -> Self {
        Self {
            state: WorkloadState::Error,
            created_at,
            data: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn deleted(created_at: u64, reason: impl Into<String>) -> Self {
        Self {
            state: WorkloadState::Deleted,
            created_at,
            data: Vec::new(),
            error: Some(reason.into()),
        }
    }

    pub fn paused(created_at: u64) -> Self {
        Self {
            state: WorkloadState::Paused,
            created_at,
            data: Vec::new(),
            error: None,
        }
    }
}

/// A single resource inside a `Deployment` (§3).
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    /// Unique within its deployment.
    pub name: String,
    pub workload_type: WorkloadType,
    /// Type-specific opaque payload, validated at admission by the
    /// corresponding per-type manager (out of scope here, §1).
    pub data: Vec<u8>,
    /// The declared size in bytes, meaningful only for disk-like types
    /// (`ZMount`, `Volume`); used for the install-order tie-break (§4.7).
    /// Zero for other types.
    pub size_bytes: u64,
}

impl Workload {
    pub fn new(name: impl Into<String>, workload_type: WorkloadType, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            workload_type,
            data,
            size_bytes: 0,
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_covers_thirteen_distinct_tags() {
        let mut seen = std::collections::HashSet::new();
        for t in WorkloadType::ALL {
            assert!(seen.insert(t), "duplicate tag {t:?}");
        }
        assert_eq!(seen.len(), 13);
    }

    #[test]
    fn only_disk_like_types_tie_break_on_size() {
        for t in WorkloadType::ALL {
            let expect = matches!(t, WorkloadType::ZMount | WorkloadType::Volume);
            assert_eq!(t.is_disk_like(), expect, "{t:?}");
        }
    }

    #[test]
    fn sealed_states_are_exactly_deleted_and_error() {
        assert!(WorkloadState::Deleted.is_sealed());
        assert!(WorkloadState::Error.is_sealed());
        assert!(!WorkloadState::Ok.is_sealed());
        assert!(!WorkloadState::Paused.is_sealed());
        assert!(!WorkloadState::Unchanged.is_sealed());
    }
}
