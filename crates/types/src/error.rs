//! Error taxonomy for the provisioning engine.
//!
//! Every public error enum pairs with an [`ErrorCode`] impl so operational
//! tooling (logs, metrics labels) gets a stable string identifier that
//! survives message wording changes.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors surfaced by the `Storage` component (§4.1).
#[derive(Debug, Error)]
pub enum StorageError {
    /// `Create` was called for a `(twin, contract)` pair that already exists.
    #[error("deployment already exists for twin={twin}, contract={contract}")]
    AlreadyExists { twin: u32, contract: u64 },
    /// `Get`/`Update`/`Add`/`Remove`/`Delete` referenced a deployment that
    /// does not exist.
    #[error("deployment not found for twin={twin}, contract={contract}")]
    NotFound { twin: u32, contract: u64 },
    /// `Current`/`Transaction` referenced a workload name with no recorded
    /// transaction history.
    #[error("workload '{name}' has no recorded transaction for twin={twin}, contract={contract}")]
    WorkloadNotExist {
        twin: u32,
        contract: u64,
        name: String,
    },
    /// `Add` was called for a workload name that already exists.
    #[error("workload '{name}' already exists for twin={twin}, contract={contract}")]
    WorkloadAlreadyExists {
        twin: u32,
        contract: u64,
        name: String,
    },
    /// The backing store (file system, encoding) failed.
    #[error("storage backend error: {0}")]
    Backend(String),
    /// A record on disk failed to deserialize.
    #[error("storage decode error: {0}")]
    Decode(String),
}

impl ErrorCode for StorageError {
    fn code(&self) -> &'static str {
        match self {
            Self::AlreadyExists { .. } => "STORAGE_ALREADY_EXISTS",
            Self::NotFound { .. } => "STORAGE_NOT_FOUND",
            Self::WorkloadNotExist { .. } => "STORAGE_WORKLOAD_NOT_EXIST",
            Self::WorkloadAlreadyExists { .. } => "STORAGE_WORKLOAD_ALREADY_EXISTS",
            Self::Backend(_) => "STORAGE_BACKEND_ERROR",
            Self::Decode(_) => "STORAGE_DECODE_ERROR",
        }
    }
}

/// Errors surfaced by the durable `Queue` (§4.2).
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue directory or its files could not be opened.
    #[error("queue open failed: {0}")]
    Open(String),
    /// A queue record failed to encode or decode.
    #[error("queue codec error: {0}")]
    Codec(String),
    /// `Dequeue` was called without a preceding successful `PeekBlock`.
    #[error("dequeue called with no peeked record")]
    NothingPeeked,
    /// The underlying I/O operation failed.
    #[error("queue io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorCode for QueueError {
    fn code(&self) -> &'static str {
        match self {
            Self::Open(_) => "QUEUE_OPEN_FAILED",
            Self::Codec(_) => "QUEUE_CODEC_ERROR",
            Self::NothingPeeked => "QUEUE_NOTHING_PEEKED",
            Self::Io(_) => "QUEUE_IO_ERROR",
        }
    }
}

/// Errors from the on-chain contract validation gate (§4.3).
#[derive(Debug, Error)]
pub enum ContractValidationError {
    /// The Substrate Gateway has no contract with this id.
    #[error("contract {0} not found")]
    ContractNotFound(u64),
    /// The contract exists but is not a node contract.
    #[error("contract {0} is not a node contract")]
    NotANodeContract(u64),
    /// The contract's target node does not match this node's id.
    #[error("contract {contract} targets node {expected}, this node is {got}")]
    WrongNode {
        contract: u64,
        expected: u64,
        got: u64,
    },
    /// The computed challenge hash does not match the contract's recorded
    /// deployment hash.
    #[error("deployment hash mismatch for contract {contract}: expected {expected}, computed {got}")]
    HashMismatch {
        contract: u64,
        expected: String,
        got: String,
    },
    /// The Substrate Gateway returned a hard failure (anything other than
    /// `NotFound` on a rent-contract lookup, or any error on a contract
    /// lookup).
    #[error("substrate gateway error: {0}")]
    Gateway(String),
}

impl ErrorCode for ContractValidationError {
    fn code(&self) -> &'static str {
        match self {
            Self::ContractNotFound(_) => "CONTRACT_NOT_FOUND",
            Self::NotANodeContract(_) => "CONTRACT_NOT_NODE_CONTRACT",
            Self::WrongNode { .. } => "CONTRACT_WRONG_NODE",
            Self::HashMismatch { .. } => "CONTRACT_HASH_MISMATCH",
            Self::Gateway(_) => "CONTRACT_GATEWAY_ERROR",
        }
    }
}

/// Raised when an `Update` plan requires changing a workload whose manager
/// does not support in-place update (§4.4).
#[derive(Debug, Error)]
pub enum UpgradeValidationError {
    #[error("workload '{name}' of type {ty:?} changed but its manager does not support update")]
    NotUpdatable { name: String, ty: crate::workload::WorkloadType },
}

impl ErrorCode for UpgradeValidationError {
    fn code(&self) -> &'static str {
        "UPGRADE_VALIDATION_ERROR"
    }
}

/// Errors surfaced during pre-queue admission checks (§4.8).
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// `Deployment.Valid()` failed schema validation.
    #[error("deployment schema invalid: {0}")]
    InvalidSchema(String),
    /// The message's twin id does not match the deployment's twin id.
    #[error("twin id mismatch: message={message}, deployment={deployment}")]
    TwinIdMismatch { message: u32, deployment: u32 },
    /// The twin failed KYC verification after retries.
    #[error("twin {0} is not verified")]
    TwinNotVerified(u32),
    /// The deployment's signature requirement was not satisfied.
    #[error("signature requirement not satisfied: {0}")]
    SignatureRequirementNotSatisfied(String),
    /// `Create` was attempted with a non-zero version.
    #[error("invalid version: create must start at version 0, got {0}")]
    InvalidVersion(u32),
    /// The referenced deployment does not exist (surfaced from storage).
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The upgrade plan was rejected.
    #[error(transparent)]
    Upgrade(#[from] UpgradeValidationError),
}

impl ErrorCode for AdmissionError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidSchema(_) => "ADMISSION_INVALID_SCHEMA",
            Self::TwinIdMismatch { .. } => "ADMISSION_TWIN_ID_MISMATCH",
            Self::TwinNotVerified(_) => "ADMISSION_TWIN_NOT_VERIFIED",
            Self::SignatureRequirementNotSatisfied(_) => "ADMISSION_SIGNATURE_UNSATISFIED",
            Self::InvalidVersion(_) => "ADMISSION_INVALID_VERSION",
            Self::Storage(e) => e.code(),
            Self::Upgrade(e) => e.code(),
        }
    }
}

/// Errors from a per-workload manager call (§6, `ProvisionerError` in §7).
#[derive(Debug, Error, Clone)]
#[error("provisioner error: {0}")]
pub struct ProvisionerError(pub String);

impl ErrorCode for ProvisionerError {
    fn code(&self) -> &'static str {
        "PROVISIONER_ERROR"
    }
}
