use std::sync::Arc;

use gridnode_types::codec::challenge_hash;
use gridnode_types::deployment::Deployment;
use gridnode_types::error::ContractValidationError;

use crate::{Contract, ContractKind, SubstrateError, SubstrateGateway};

/// What the contract validator injects into the job context for downstream
/// managers to consult (§4.3).
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub contract: Contract,
    pub node_rented: bool,
}

/// Runs the three on-chain checks of §4.3 ahead of `Provision`,
/// `ProvisionNoValidation`, and `Update` jobs.
pub struct ContractValidator {
    gateway: Arc<dyn SubstrateGateway>,
    node_id: u64,
}

impl ContractValidator {
    pub fn new(gateway: Arc<dyn SubstrateGateway>, node_id: u64) -> Self {
        Self { gateway, node_id }
    }

    /// `no_validation` corresponds to `JobOp::ProvisionNoValidation`: the
    /// existence and rent checks still run, but the node-match and
    /// challenge-hash checks are skipped (§4.3, §9).
    pub async fn validate(
        &self,
        deployment: &Deployment,
        no_validation: bool,
    ) -> Result<ValidationOutcome, ContractValidationError> {
        let contract = self
            .gateway
            .get_contract(deployment.contract_id)
            .await
            .map_err(|e| self.map_contract_error(deployment.contract_id, e))?;

        if contract.kind != ContractKind::NodeContract {
            return Err(ContractValidationError::NotANodeContract(deployment.contract_id));
        }

        let node_rented = match self.gateway.get_node_rent_contract(self.node_id).await {
            Ok(rent_contract_id) => rent_contract_id != 0,
            Err(SubstrateError::NotFound) => false,
            Err(e) => return Err(ContractValidationError::Gateway(e.to_string())),
        };

        if !no_validation {
            if contract.node_id != self.node_id {
                return Err(ContractValidationError::WrongNode {
                    contract: deployment.contract_id,
                    expected: contract.node_id,
                    got: self.node_id,
                });
            }
            let computed = challenge_hash(deployment);
            if computed != contract.deployment_hash {
                return Err(ContractValidationError::HashMismatch {
                    contract: deployment.contract_id,
                    expected: contract.deployment_hash.clone(),
                    got: computed,
                });
            }
        }

        Ok(ValidationOutcome { contract, node_rented })
    }

    fn map_contract_error(&self, contract_id: u64, e: SubstrateError) -> ContractValidationError {
        if matches!(e, SubstrateError::NotFound) {
            ContractValidationError::ContractNotFound(contract_id)
        } else {
            ContractValidationError::Gateway(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gridnode_types::deployment::SignatureRequirement;
    use std::sync::Mutex;

    struct FakeGateway {
        contract: Result<Contract, SubstrateError>,
        rent: Result<u64, SubstrateError>,
        rent_calls: Mutex<u32>,
    }

    #[async_trait]
    impl SubstrateGateway for FakeGateway {
        async fn get_contract(&self, _contract_id: u64) -> Result<Contract, SubstrateError> {
            self.contract.clone()
        }

        async fn get_node_rent_contract(&self, _node_id: u64) -> Result<u64, SubstrateError> {
            *self.rent_calls.lock().unwrap() += 1;
            self.rent.clone()
        }
    }

    fn deployment(contract_id: u64) -> Deployment {
        Deployment {
            twin_id: 1,
            contract_id,
            version: 0,
            description: String::new(),
            metadata: String::new(),
            signature_requirement: SignatureRequirement {
                threshold: 0,
                keys: vec![],
                signatures: vec![],
            },
            workloads: vec![],
        }
    }

    fn node_contract(node_id: u64, hash: &str) -> Contract {
        Contract {
            contract_id: 42,
            kind: ContractKind::NodeContract,
            node_id,
            deployment_hash: hash.to_string(),
        }
    }

    #[tokio::test]
    async fn missing_contract_is_contract_not_found() {
        let gw = FakeGateway {
            contract: Err(SubstrateError::NotFound),
            rent: Ok(0),
            rent_calls: Mutex::new(0),
        };
        let validator = ContractValidator::new(Arc::new(gw), 7);
        let err = validator.validate(&deployment(42), false).await.unwrap_err();
        assert!(matches!(err, ContractValidationError::ContractNotFound(42)));
    }

    #[tokio::test]
    async fn non_node_contract_is_rejected() {
        let gw = FakeGateway {
            contract: Ok(Contract {
                contract_id: 42,
                kind: ContractKind::NameContract,
                node_id: 7,
                deployment_hash: String::new(),
            }),
            rent: Ok(0),
            rent_calls: Mutex::new(0),
        };
        let validator = ContractValidator::new(Arc::new(gw), 7);
        let err = validator.validate(&deployment(42), false).await.unwrap_err();
        assert!(matches!(err, ContractValidationError::NotANodeContract(42)));
    }

    #[tokio::test]
    async fn wrong_node_fails_when_validation_is_required() {
        let d = deployment(42);
        let gw = FakeGateway {
            contract: Ok(node_contract(99, &challenge_hash(&d))),
            rent: Ok(0),
            rent_calls: Mutex::new(0),
        };
        let validator = ContractValidator::new(Arc::new(gw), 7);
        let err = validator.validate(&d, false).await.unwrap_err();
        assert!(matches!(err, ContractValidationError::WrongNode { expected: 99, got: 7, .. }));
    }

    #[tokio::test]
    async fn hash_mismatch_fails_when_validation_is_required() {
        let d = deployment(42);
        let gw = FakeGateway {
            contract: Ok(node_contract(7, "not-the-real-hash")),
            rent: Ok(0),
            rent_calls: Mutex::new(0),
        };
        let validator = ContractValidator::new(Arc::new(gw), 7);
        let err = validator.validate(&d, false).await.unwrap_err();
        assert!(matches!(err, ContractValidationError::HashMismatch { .. }));
    }

    #[tokio::test]
    async fn no_validation_skips_node_and_hash_checks() {
        let d = deployment(42);
        let gw = FakeGateway {
            contract: Ok(node_contract(99, "wrong-hash")),
            rent: Ok(0),
            rent_calls: Mutex::new(0),
        };
        let validator = ContractValidator::new(Arc::new(gw), 7);
        let outcome = validator.validate(&d, true).await.unwrap();
        assert!(!outcome.node_rented);
    }

    #[tokio::test]
    async fn not_found_rent_lookup_means_not_rented() {
        let d = deployment(42);
        let gw = FakeGateway {
            contract: Ok(node_contract(7, &challenge_hash(&d))),
            rent: Err(SubstrateError::NotFound),
            rent_calls: Mutex::new(0),
        };
        let validator = ContractValidator::new(Arc::new(gw), 7);
        let outcome = validator.validate(&d, false).await.unwrap();
        assert!(!outcome.node_rented);
    }

    #[tokio::test]
    async fn nonzero_rent_contract_means_rented() {
        let d = deployment(42);
        let gw = FakeGateway {
            contract: Ok(node_contract(7, &challenge_hash(&d))),
            rent: Ok(555),
            rent_calls: Mutex::new(0),
        };
        let validator = ContractValidator::new(Arc::new(gw), 7);
        let outcome = validator.validate(&d, false).await.unwrap();
        assert!(outcome.node_rented);
    }

    #[tokio::test]
    async fn hard_rent_gateway_error_propagates() {
        let d = deployment(42);
        let gw = FakeGateway {
            contract: Ok(node_contract(7, &challenge_hash(&d))),
            rent: Err(SubstrateError::DecodeFailure),
            rent_calls: Mutex::new(0),
        };
        let validator = ContractValidator::new(Arc::new(gw), 7);
        let err = validator.validate(&d, false).await.unwrap_err();
        assert!(matches!(err, ContractValidationError::Gateway(_)));
    }
}
