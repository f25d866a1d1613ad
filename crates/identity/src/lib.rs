//! HTTP client for the external twin KYC/identity verification service
//! (§4.8, §6), retried with exponential backoff the same way other upstream
//! HTTP adapters in this codebase retry their own calls.

pub mod testutil;

use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the twin verifier HTTP client.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("twin verifier request failed after retries: {0}")]
    Request(String),
    #[error("twin verifier returned an unparsable response: {0}")]
    UnexpectedResponse(String),
}

/// Whether a twin is currently KYC-verified (§4.8 admission check 3).
#[async_trait]
pub trait TwinVerifier: Send + Sync {
    async fn is_verified(&self, twin_id: u32) -> Result<bool, IdentityError>;
}

#[derive(Deserialize)]
struct StatusEnvelope {
    result: StatusBody,
}

#[derive(Deserialize)]
struct StatusBody {
    status: String,
}

/// An `HttpTwinVerifier` against `{base_url}/api/v1/status?twin_id={id}`
/// (§6). Retries up to `max_attempts` times with exponential backoff; only
/// the final attempt's error is surfaced.
pub struct HttpTwinVerifier {
    client: reqwest::Client,
    base_url: String,
    max_attempts: u32,
}

impl HttpTwinVerifier {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(request_timeout)
                .build()
                .expect("reqwest client with a fixed timeout always builds"),
            base_url: base_url.into(),
            max_attempts: 5,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    async fn fetch_once(&self, twin_id: u32) -> Result<bool, IdentityError> {
        let url = format!("{}/api/v1/status", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("twin_id", twin_id.to_string())])
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| IdentityError::Request(e.to_string()))?;
        let envelope: StatusEnvelope = response
            .json()
            .await
            .map_err(|e| IdentityError::UnexpectedResponse(e.to_string()))?;
        Ok(envelope.result.status == "VERIFIED")
    }
}

#[async_trait]
impl TwinVerifier for HttpTwinVerifier {
    async fn is_verified(&self, twin_id: u32) -> Result<bool, IdentityError> {
        let mut backoff = ExponentialBackoff::default();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(twin_id).await {
                Ok(verified) => return Ok(verified),
                Err(e) if attempt < self.max_attempts => {
                    let delay = backoff.next_backoff().unwrap_or(Duration::from_secs(1));
                    warn!(twin_id, attempt, error = %e, "twin verifier call failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    debug!(twin_id, attempt, "twin verifier exhausted retries");
                    return Err(e);
                }
            }
        }
    }
}
