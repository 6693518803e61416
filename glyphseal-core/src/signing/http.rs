//! HTTP signing client.
//!
//! Thin client for the signing endpoint contract: one authenticated POST,
//! one classified outcome. 401/403 map to `AuthenticationRequired`, 5xx to
//! `Server`, transport failures and timeouts to `Network`. No retries:
//! a failure here is terminal and the caller decides what happens next.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::attestation::UnsignedAttestation;
use crate::error::{Result, SealError};
use crate::signing::{SigningResponse, SigningService};

/// Default request timeout for the signing call.
pub const DEFAULT_SIGNING_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`HttpSigningClient`].
#[derive(Debug, Clone)]
pub struct SigningClientConfig {
    /// Signing endpoint URL.
    pub endpoint: String,
    /// Bearer credential proving the authenticated identity.
    pub credential: Option<String>,
    /// Request timeout; expiry resolves to `Network`, never a hang.
    pub timeout: Duration,
}

impl SigningClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential: None,
            timeout: DEFAULT_SIGNING_TIMEOUT,
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for the external signing endpoint.
pub struct HttpSigningClient {
    client: Client,
    config: SigningClientConfig,
}

impl HttpSigningClient {
    pub fn new(config: SigningClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SealError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl SigningService for HttpSigningClient {
    async fn sign(&self, attestation: &UnsignedAttestation) -> Result<SigningResponse> {
        let mut request = self.client.post(&self.config.endpoint).json(attestation);
        if let Some(credential) = &self.config.credential {
            request = request.bearer_auth(credential);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Signing request failed");
            SealError::Network(format!("signing request failed: {e}"))
        })?;

        let status = response.status();
        debug!(status = %status, "Signing endpoint responded");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = response.text().await.unwrap_or_default();
            return Err(SealError::AuthenticationRequired(format!(
                "signing endpoint rejected the credential: {message}"
            )));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SealError::Server {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<SigningResponse>().await.map_err(|e| {
            warn!(error = %e, "Malformed signing response");
            SealError::Server {
                status: status.as_u16(),
                message: format!("malformed signing response: {e}"),
            }
        })
    }
}
