//! Detached signature verification.
//!
//! The canonical signing bytes are rebuilt here from the attestation's own
//! fields: the exact CBOR the signing endpoint signed, timestamp included,
//! signature and key excluded. Signer and verifier share this one
//! canonicalization; any drift between them would fail every valid seal.
//!
//! A cryptographically invalid signature is a normal outcome, reported as
//! `valid: false`, never as an error.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, VerifyingKey};
use serde::Serialize;
use tracing::debug;

use crate::attestation::{
    DocumentHashes, ExclusionZone, Identity, SignedAttestation, UnsignedAttestation,
};
use crate::error::{Result, SealError};

/// Outcome of a signature check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SignatureCheck {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// The signable portion of an attestation, in canonical field order.
#[derive(Serialize)]
struct SignablePayload<'a> {
    #[serde(rename = "v")]
    version: u8,
    #[serde(rename = "h")]
    hashes: &'a DocumentHashes,
    #[serde(rename = "t")]
    timestamp: &'a DateTime<Utc>,
    #[serde(rename = "i")]
    identity: &'a Identity,
    #[serde(rename = "s")]
    service: SignableService<'a>,
    #[serde(rename = "e", skip_serializing_if = "Option::is_none")]
    exclusion_zone: Option<&'a ExclusionZone>,
    #[serde(rename = "u", skip_serializing_if = "Option::is_none")]
    user_url: Option<&'a str>,
}

#[derive(Serialize)]
struct SignableService<'a> {
    #[serde(rename = "n")]
    name: &'a str,
    #[serde(rename = "k")]
    public_key_id: &'a str,
}

fn encode_signable(payload: &SignablePayload<'_>) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(payload, &mut bytes)
        .map_err(|e| SealError::InvalidFormat(format!("canonical encoding failed: {e}")))?;
    Ok(bytes)
}

/// Canonical byte sequence a signed attestation's signature covers.
pub fn canonical_signing_bytes(attestation: &SignedAttestation) -> Result<Vec<u8>> {
    encode_signable(&SignablePayload {
        version: attestation.version,
        hashes: &attestation.hashes,
        timestamp: &attestation.timestamp,
        identity: &attestation.identity,
        service: SignableService {
            name: &attestation.service.name,
            public_key_id: &attestation.service.public_key_id,
        },
        exclusion_zone: attestation.exclusion_zone.as_ref(),
        user_url: attestation.user_url.as_deref(),
    })
}

/// Canonical bytes for an unsigned attestation plus the server-side stamp.
/// This is what a signing service signs before the merge.
pub(crate) fn signing_bytes_for(
    attestation: &UnsignedAttestation,
    timestamp: &DateTime<Utc>,
    public_key_id: &str,
) -> Result<Vec<u8>> {
    encode_signable(&SignablePayload {
        version: attestation.version,
        hashes: &attestation.hashes,
        timestamp,
        identity: &attestation.identity,
        service: SignableService {
            name: &attestation.service.name,
            public_key_id,
        },
        exclusion_zone: attestation.exclusion_zone.as_ref(),
        user_url: attestation.user_url.as_deref(),
    })
}

/// Append-only cache of historical verification keys, keyed by key id.
///
/// Historical keys are never invalidated: once a key id resolves to a key,
/// that binding is permanent.
#[derive(Debug, Default)]
pub struct KeyStore {
    keys: HashMap<String, VerifyingKey>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key for an id unless one is already present.
    ///
    /// Returns `false` when the id was already bound; the existing key wins.
    pub fn insert(&mut self, public_key_id: impl Into<String>, key: VerifyingKey) -> bool {
        match self.keys.entry(public_key_id.into()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(key);
                true
            }
        }
    }

    pub fn get(&self, public_key_id: &str) -> Option<&VerifyingKey> {
        self.keys.get(public_key_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Fetches historical public keys by id from a distribution endpoint.
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    async fn fetch(&self, public_key_id: &str) -> Result<Vec<u8>>;
}

/// `GET {base_url}/{public_key_id}` returning raw key bytes.
pub struct HttpKeyFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpKeyFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SealError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    async fn fetch(&self, public_key_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), public_key_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SealError::Network(format!("key fetch failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SealError::Server {
                status: status.as_u16(),
                message: format!("key distribution returned {status} for {public_key_id}"),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SealError::Network(format!("key fetch failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

fn parse_verifying_key(bytes: &[u8]) -> std::result::Result<VerifyingKey, String> {
    let array: &[u8; 32] = bytes
        .try_into()
        .map_err(|_| format!("public key must be 32 bytes, got {}", bytes.len()))?;
    VerifyingKey::from_bytes(array).map_err(|e| format!("malformed public key: {e}"))
}

fn check_with_key(attestation: &SignedAttestation, key: &VerifyingKey) -> SignatureCheck {
    let Some(signature_bytes) = attestation.signature.as_deref() else {
        return SignatureCheck::failed("attestation carries no signature");
    };
    let signature_array: &[u8; 64] = match signature_bytes.try_into() {
        Ok(array) => array,
        Err(_) => {
            return SignatureCheck::failed(format!(
                "signature must be 64 bytes, got {}",
                signature_bytes.len()
            ))
        }
    };

    let message = match canonical_signing_bytes(attestation) {
        Ok(bytes) => bytes,
        Err(e) => return SignatureCheck::failed(e.to_string()),
    };

    match key.verify_strict(&message, &Signature::from_bytes(signature_array)) {
        Ok(()) => SignatureCheck::ok(),
        Err(_) => SignatureCheck::failed("signature does not match the attested content"),
    }
}

/// Verify against the embedded public key (offline path).
pub fn verify_embedded(attestation: &SignedAttestation) -> SignatureCheck {
    let Some(key_bytes) = attestation.public_key.as_deref() else {
        return SignatureCheck::failed("attestation carries no public key");
    };
    match parse_verifying_key(key_bytes) {
        Ok(key) => check_with_key(attestation, &key),
        Err(e) => SignatureCheck::failed(e),
    }
}

/// Verify, resolving the key from the embedded bytes, the store, or the
/// optional fetcher (online path), in that order. Fetched keys are
/// appended to the store under their key id.
pub async fn verify_resolved(
    attestation: &SignedAttestation,
    store: &mut KeyStore,
    fetcher: Option<&dyn KeyFetcher>,
) -> SignatureCheck {
    if attestation.public_key.is_some() {
        return verify_embedded(attestation);
    }

    let key_id = attestation.service.public_key_id.clone();
    if let Some(key) = store.get(&key_id).copied() {
        debug!(%key_id, "Resolved verification key from store");
        return check_with_key(attestation, &key);
    }

    let Some(fetcher) = fetcher else {
        return SignatureCheck::failed(format!(
            "no embedded key and no fetcher for key id {key_id}"
        ));
    };

    let fetched = match fetcher.fetch(&key_id).await {
        Ok(bytes) => bytes,
        Err(e) => return SignatureCheck::failed(format!("key fetch failed: {e}")),
    };
    let key = match parse_verifying_key(&fetched) {
        Ok(key) => key,
        Err(e) => return SignatureCheck::failed(e),
    };
    store.insert(key_id, key);
    check_with_key(attestation, &key)
}
