//! The on-chain client is explicitly out of scope (SPEC_FULL §1): nothing
//! in this repo speaks the Substrate RPC wire protocol. `UnwiredGateway` is
//! the documented seam a real deployment plugs a production
//! `gridnode_chain::SubstrateGateway` implementation into; until then every
//! contract lookup fails closed with `NotFound`, which the validator already
//! treats as a hard validation failure for `GetContract` and as "not rented"
//! for `GetNodeRentContract`.

use async_trait::async_trait;
use gridnode_chain::{Contract, SubstrateError, SubstrateGateway};

pub struct UnwiredGateway {
    pub url: String,
}

#[async_trait]
impl SubstrateGateway for UnwiredGateway {
    async fn get_contract(&self, _contract_id: u64) -> Result<Contract, SubstrateError> {
        tracing::warn!(url = %self.url, "no Substrate Gateway client is wired in, failing contract lookup");
        Err(SubstrateError::NotFound)
    }

    async fn get_node_rent_contract(&self, _node_id: u64) -> Result<u64, SubstrateError> {
        Err(SubstrateError::NotFound)
    }
}
