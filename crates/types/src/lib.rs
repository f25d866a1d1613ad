//! Core data structures and error types for the grid node provisioning engine.
//!
//! This crate has minimal dependencies to remain stable: every other crate in
//! the workspace depends on it, so it must not pull in storage, networking,
//! or async runtime concerns.

pub mod codec;
pub mod deployment;
pub mod error;
pub mod job;
pub mod order;
pub mod transaction;
pub mod workload;

pub use deployment::{Deployment, SignatureRequirement, SignedKey};
pub use error::{ContractValidationError, ErrorCode, StorageError, UpgradeValidationError};
pub use job::{Job, JobOp};
pub use transaction::Transaction;
pub use workload::{Workload, WorkloadResult, WorkloadState, WorkloadType};
