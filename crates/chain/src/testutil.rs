//! A scriptable `SubstrateGateway` for exercising callers of this crate
//! without a real chain connection. Not `cfg(test)`-gated so downstream
//! crates' own tests (e.g. the engine's scenario tests) can depend on it.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Contract, SubstrateError, SubstrateGateway};

/// Returns a fixed `Contract`/rent-contract-id pair for every call,
/// recording how many times each method was invoked.
pub struct ScriptedGateway {
    contract: Result<Contract, SubstrateError>,
    rent_contract_id: Result<u64, SubstrateError>,
    contract_calls: Mutex<u32>,
    rent_calls: Mutex<u32>,
}

impl ScriptedGateway {
    pub fn new(contract: Result<Contract, SubstrateError>, rent_contract_id: Result<u64, SubstrateError>) -> Self {
        Self {
            contract,
            rent_contract_id,
            contract_calls: Mutex::new(0),
            rent_calls: Mutex::new(0),
        }
    }

    pub fn contract_calls(&self) -> u32 {
        *self.contract_calls.lock().unwrap()
    }

    pub fn rent_calls(&self) -> u32 {
        *self.rent_calls.lock().unwrap()
    }
}

#[async_trait]
impl SubstrateGateway for ScriptedGateway {
    async fn get_contract(&self, _contract_id: u64) -> Result<Contract, SubstrateError> {
        *self.contract_calls.lock().unwrap() += 1;
        self.contract.clone()
    }

    async fn get_node_rent_contract(&self, _node_id: u64) -> Result<u64, SubstrateError> {
        *self.rent_calls.lock().unwrap() += 1;
        self.rent_contract_id.clone()
    }
}
