//! Deployment data model (§3).

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::workload::Workload;

/// One weighted signer key in a `SignatureRequirement`.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignedKey {
    pub public_key: Vec<u8>,
    pub weight: u32,
}

/// Policy over which signers must sign a deployment: the sum of weights of
/// signatures present must reach `threshold`.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignatureRequirement {
    pub threshold: u32,
    pub keys: Vec<SignedKey>,
    /// Signatures actually attached to this deployment, keyed by the index
    /// into `keys`.
    pub signatures: Vec<(u32, Vec<u8>)>,
}

impl SignatureRequirement {
    /// Whether the attached signatures meet `threshold`. Actual signature
    /// *verification* is an external collaborator (§1); this only checks
    /// weight accounting over signatures already asserted as valid.
    pub fn is_satisfied_by(&self, valid_signer_indices: &[u32]) -> bool {
        let total: u32 = self
            .keys
            .iter()
            .enumerate()
            .filter(|(i, _)| valid_signer_indices.contains(&(*i as u32)))
            .map(|(_, k)| k.weight)
            .sum();
        total >= self.threshold
    }
}

/// The fundamental unit submitted by a user (§3).
///
/// Encode/Decode (SCALE) is used for anything that must hash stably across
/// platforms and versions — notably the challenge hash (§6) — while Serde
/// covers in-process and config-file use. `result` is deliberately excluded
/// from this struct: results live per-workload in `Workload`/`Transaction`,
/// never inline on the deployment, matching §3's invariant that the
/// current state is always the most recent transaction.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub twin_id: u32,
    pub contract_id: u64,
    pub version: u32,
    pub description: String,
    pub metadata: String,
    pub signature_requirement: SignatureRequirement,
    pub workloads: Vec<Workload>,
}

impl Deployment {
    /// §4.8 schema validity: name uniqueness within the deployment.
    /// Per-type payload validity and capacity sanity are delegated to
    /// per-type validators (out of scope, §1); this enforces the one
    /// invariant that is the engine's own responsibility.
    pub fn validate_schema(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for w in &self.workloads {
            if w.name.is_empty() {
                return Err("workload name must not be empty".into());
            }
            if !seen.insert(w.name.as_str()) {
                return Err(format!("duplicate workload name '{}'", w.name));
            }
        }
        Ok(())
    }

    pub fn workload(&self, name: &str) -> Option<&Workload> {
        self.workloads.iter().find(|w| w.name == name)
    }
}

/// Recognized partial-update fields for `Storage::Update` (§4.1). Other
/// deployment fields are never patched in place.
#[derive(Debug, Clone, Default)]
pub struct DeploymentFields {
    pub version: Option<u32>,
    pub description: Option<String>,
    pub metadata: Option<String>,
    pub signature_requirement: Option<SignatureRequirement>,
}
