//! The canonical, deterministic binary codec for anything hashed or
//! persisted across process restarts and schema revisions.
//!
//! This wraps `parity-scale-codec` (SCALE), chosen for the same reason the
//! teacher kernel centralizes it in its own `types::codec`: it produces a
//! compact, deterministic encoding, so every component that needs a
//! byte-stable representation of the same value (the queue's on-disk
//! record, the challenge hash input) uses the exact same bytes rather than
//! each reinventing a serialization.

use parity_scale_codec::{Decode, DecodeAll, Encode};

use crate::deployment::Deployment;

/// Encodes a value into its canonical byte representation.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Vec<u8> {
    v.encode()
}

/// Decodes a value from its canonical byte representation, failing fast
/// (rather than silently ignoring trailing bytes) on any malformed input.
pub fn from_bytes_canonical<T: Decode>(b: &[u8]) -> Result<T, String> {
    T::decode_all(&mut &*b).map_err(|e| format!("canonical decode failed: {e}"))
}

/// The subset of a deployment that the user actually signs: everything
/// except `result` (which lives outside `Deployment` entirely, see
/// `deployment.rs`), `version`, and `signatures`. Computing the challenge
/// hash over exactly this subset — and nothing else — is what makes it
/// stable across an Update that only bumps `version` or attaches more
/// signatures.
#[derive(Encode)]
struct SignedPortion<'a> {
    twin_id: u32,
    contract_id: u64,
    description: &'a str,
    metadata: &'a str,
    threshold: u32,
    keys: &'a [crate::deployment::SignedKey],
    workloads: &'a [crate::workload::Workload],
}

/// Computes the stable, hex-encoded challenge hash of a deployment (§6).
/// Byte-exact and platform-independent: SCALE encoding has no
/// implementation-defined padding or byte order, and BLAKE3 is a fixed
/// portable digest.
pub fn challenge_hash(d: &Deployment) -> String {
    let signed = SignedPortion {
        twin_id: d.twin_id,
        contract_id: d.contract_id,
        description: &d.description,
        metadata: &d.metadata,
        threshold: d.signature_requirement.threshold,
        keys: &d.signature_requirement.keys,
        workloads: &d.workloads,
    };
    let bytes = to_bytes_canonical(&signed);
    hex::encode(blake3::hash(&bytes).as_bytes())
}
