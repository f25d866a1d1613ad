//! Substrate Gateway client contract and the on-chain Contract Validator
//! (§4.3, §6).
//!
//! The real gateway (an RPC client against a Substrate chain) is out of
//! scope (§1); this crate defines the trait the validator depends on plus
//! the validator itself, so the engine can be driven against a fake
//! gateway in tests and a real one in production without either side
//! changing.

mod validator;
pub mod testutil;

pub use validator::{ContractValidator, ValidationOutcome};

use async_trait::async_trait;

/// The recognized Substrate Gateway error codes (§6). Only `NotFound` is
/// ever treated as "absence" by the validator; every other code is a hard
/// failure regardless of which call produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstrateError {
    NoError,
    NotFound,
    BurnTransactionNotFound,
    RefundTransactionNotFound,
    MintTransactionNotFound,
    DecodeFailure,
    VersionMismatch,
    AccountNotFound,
    Usurped,
    /// A code the client doesn't yet recognize, carried through unchanged
    /// rather than discarded.
    Unknown(i32),
}

impl SubstrateError {
    pub fn code(self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::NotFound => 1,
            Self::BurnTransactionNotFound => 2,
            Self::RefundTransactionNotFound => 3,
            Self::MintTransactionNotFound => 4,
            Self::DecodeFailure => 5,
            Self::VersionMismatch => 6,
            Self::AccountNotFound => 7,
            Self::Usurped => 8,
            Self::Unknown(c) => c,
        }
    }
}

impl std::fmt::Display for SubstrateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?} (code {})", self.code())
    }
}

/// The kind of on-chain contract behind a contract id (§4.3 check 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    NodeContract,
    NameContract,
    RentContract,
}

/// The subset of an on-chain contract record the validator needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub contract_id: u64,
    pub kind: ContractKind,
    pub node_id: u64,
    /// Hex-encoded challenge hash recorded on-chain for this deployment.
    pub deployment_hash: String,
}

/// Read-only operations the validator consumes (§6).
#[async_trait]
pub trait SubstrateGateway: Send + Sync {
    async fn get_contract(&self, contract_id: u64) -> Result<Contract, SubstrateError>;

    /// The node's active rent contract id, or `NotFound` if it has none.
    async fn get_node_rent_contract(&self, node_id: u64) -> Result<u64, SubstrateError>;
}
