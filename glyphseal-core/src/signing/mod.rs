//! Signing client.
//!
//! The client assembles an [`UnsignedAttestation`], hands it to a
//! [`SigningService`], and merges the returned timestamp, signature, key,
//! and key id into a [`SignedAttestation`]. The timestamp always comes from
//! the service: the unsigned form has no timestamp field to leak one from,
//! and a response without a timestamp fails to parse.
//!
//! A single network or auth failure surfaces immediately; retrying is the
//! caller's decision, never the client's.

mod http;

pub use http::{HttpSigningClient, SigningClientConfig};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attestation::{SignedAttestation, UnsignedAttestation};
use crate::error::{Result, SealError};
use crate::verify::signature::signing_bytes_for;

/// Successful response from the signing endpoint.
///
/// `timestamp` is required: the endpoint always stamps its own, and a
/// response without one is a failed signing operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningResponse {
    pub timestamp: DateTime<Utc>,
    /// base64 detached signature bytes.
    pub signature: String,
    /// base64 raw public key.
    pub public_key: String,
    pub public_key_id: String,
}

/// A service that can countersign an attestation.
///
/// Implementations: [`HttpSigningClient`] for the real endpoint,
/// [`LocalSigner`] for offline use and tests.
#[async_trait]
pub trait SigningService: Send + Sync {
    async fn sign(&self, attestation: &UnsignedAttestation) -> Result<SigningResponse>;
}

/// Sign an attestation and merge the response into its final form.
pub async fn seal_attestation<S>(
    attestation: UnsignedAttestation,
    service: &S,
) -> Result<SignedAttestation>
where
    S: SigningService + ?Sized,
{
    let response = service.sign(&attestation).await?;

    let signature = BASE64.decode(&response.signature).map_err(|e| SealError::Server {
        status: 200,
        message: format!("malformed signature in signing response: {e}"),
    })?;
    let public_key = BASE64.decode(&response.public_key).map_err(|e| SealError::Server {
        status: 200,
        message: format!("malformed public key in signing response: {e}"),
    })?;

    debug!(
        public_key_id = %response.public_key_id,
        timestamp = %response.timestamp,
        "Merging signing response"
    );

    let UnsignedAttestation {
        version,
        hashes,
        identity,
        mut service,
        exclusion_zone,
        user_url,
    } = attestation;
    service.public_key_id = response.public_key_id;

    Ok(SignedAttestation {
        version,
        hashes,
        timestamp: response.timestamp,
        identity,
        service,
        exclusion_zone,
        user_url,
        signature: Some(signature),
        public_key: Some(public_key),
    })
}

/// In-memory Ed25519 signer.
///
/// Stands in for the signing endpoint when working offline; it stamps
/// `Utc::now()` and signs the same canonical bytes the endpoint would.
pub struct LocalSigner {
    signing_key: SigningKey,
    public_key_id: String,
}

impl LocalSigner {
    pub fn new(signing_key: SigningKey, public_key_id: impl Into<String>) -> Self {
        Self {
            signing_key,
            public_key_id: public_key_id.into(),
        }
    }

    /// Fresh random keypair with the given key id.
    pub fn generate(public_key_id: impl Into<String>) -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        Self::new(signing_key, public_key_id)
    }

    pub fn from_bytes(bytes: &[u8; 32], public_key_id: impl Into<String>) -> Self {
        Self::new(SigningKey::from_bytes(bytes), public_key_id)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("public_key_id", &self.public_key_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SigningService for LocalSigner {
    async fn sign(&self, attestation: &UnsignedAttestation) -> Result<SigningResponse> {
        let timestamp = Utc::now();
        let message = signing_bytes_for(attestation, &timestamp, &self.public_key_id)?;
        let signature = self.signing_key.sign(&message);

        Ok(SigningResponse {
            timestamp,
            signature: BASE64.encode(signature.to_bytes()),
            public_key: BASE64.encode(self.signing_key.verifying_key().as_bytes()),
            public_key_id: self.public_key_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::{DocumentHashes, Identity, IdentityProvider, ServiceInfo};
    use crate::verify::signature::verify_embedded;

    fn unsigned() -> UnsignedAttestation {
        UnsignedAttestation::new(
            DocumentHashes {
                cryptographic: "ab".repeat(32),
                perceptual: "cd".repeat(8),
                difference: None,
            },
            Identity {
                provider: IdentityProvider::Google,
                identifier: "user@example.com".into(),
                display_name: None,
            },
            ServiceInfo {
                name: "glyphseal".into(),
                public_key_id: "pending".into(),
            },
        )
    }

    #[tokio::test]
    async fn local_signer_produces_a_verifiable_attestation() {
        let signer = LocalSigner::from_bytes(&[42u8; 32], "2025-test");
        let signed = seal_attestation(unsigned(), &signer).await.unwrap();

        assert_eq!(signed.service.public_key_id, "2025-test");
        assert_eq!(signed.signature.as_ref().unwrap().len(), 64);
        assert_eq!(signed.public_key.as_ref().unwrap().len(), 32);
        assert!(verify_embedded(&signed).valid);
    }

    #[tokio::test]
    async fn key_id_from_response_overwrites_client_value() {
        let signer = LocalSigner::from_bytes(&[7u8; 32], "authoritative");
        let mut attestation = unsigned();
        attestation.service.public_key_id = "client-guess".into();

        let signed = seal_attestation(attestation, &signer).await.unwrap();
        assert_eq!(signed.service.public_key_id, "authoritative");
        assert!(verify_embedded(&signed).valid);
    }

    #[tokio::test]
    async fn malformed_base64_in_response_is_a_server_error() {
        struct BadService;

        #[async_trait]
        impl SigningService for BadService {
            async fn sign(&self, _: &UnsignedAttestation) -> Result<SigningResponse> {
                Ok(SigningResponse {
                    timestamp: Utc::now(),
                    signature: "!!not-base64!!".into(),
                    public_key: String::new(),
                    public_key_id: "k".into(),
                })
            }
        }

        let result = seal_attestation(unsigned(), &BadService).await;
        assert!(matches!(result, Err(SealError::Server { .. })));
    }

    #[test]
    fn debug_does_not_leak_the_signing_key() {
        let signer = LocalSigner::from_bytes(&[42u8; 32], "k1");
        let output = format!("{signer:?}");
        assert!(output.contains("k1"));
        assert!(!output.contains("2a2a2a"));
    }
}
