//! A scripted `TwinVerifier` for callers that need a fixed answer without a
//! real KYC endpoint. Not `cfg(test)`-gated so other crates' own tests can
//! depend on it.

use async_trait::async_trait;

use crate::{IdentityError, TwinVerifier};

pub struct ScriptedVerifier {
    verified: bool,
}

impl ScriptedVerifier {
    pub fn always_verified() -> Self {
        Self { verified: true }
    }

    pub fn never_verified() -> Self {
        Self { verified: false }
    }
}

#[async_trait]
impl TwinVerifier for ScriptedVerifier {
    async fn is_verified(&self, _twin_id: u32) -> Result<bool, IdentityError> {
        Ok(self.verified)
    }
}
