//! Attestation data model.
//!
//! All wire types carry compact single-letter serde keys so the same derives
//! drive both the CBOR payload embedded in the QR code and the JSON body sent
//! to the signing endpoint. The unsigned/signed split is type-level: an
//! [`UnsignedAttestation`] has no timestamp field at all, so a client-origin
//! timestamp cannot reach the signed payload by construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SealError};

/// Current attestation schema version. Decoding any other version is rejected.
pub const ATTESTATION_VERSION: u8 = 1;

/// Social identity providers accepted by the auth collaborator.
///
/// Wire form is a single-letter code to keep the QR payload small.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityProvider {
    #[serde(rename = "g")]
    Google,
    #[serde(rename = "h")]
    GitHub,
    #[serde(rename = "x")]
    Twitter,
    #[serde(rename = "f")]
    Facebook,
    #[serde(rename = "l")]
    LinkedIn,
    #[serde(rename = "e")]
    Email,
}

impl IdentityProvider {
    /// The compact wire code for this provider.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Google => "g",
            Self::GitHub => "h",
            Self::Twitter => "x",
            Self::Facebook => "f",
            Self::LinkedIn => "l",
            Self::Email => "e",
        }
    }

    /// Resolve a provider from its wire code or full name.
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "g" | "google" => Ok(Self::Google),
            "h" | "github" => Ok(Self::GitHub),
            "x" | "twitter" => Ok(Self::Twitter),
            "f" | "facebook" => Ok(Self::Facebook),
            "l" | "linkedin" => Ok(Self::LinkedIn),
            "e" | "email" => Ok(Self::Email),
            other => Err(SealError::InvalidFormat(format!(
                "unknown identity provider: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for IdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Google => "Google",
            Self::GitHub => "GitHub",
            Self::Twitter => "Twitter",
            Self::Facebook => "Facebook",
            Self::LinkedIn => "LinkedIn",
            Self::Email => "Email",
        };
        f.write_str(name)
    }
}

/// An authenticated identity as asserted by the auth collaborator.
///
/// The engine treats this as opaque apart from including it in the signed
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "pr")]
    pub provider: IdentityProvider,
    /// Email address or handle, depending on the provider.
    #[serde(rename = "id")]
    pub identifier: String,
    #[serde(rename = "dn", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// The sealing service and the key it signed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(rename = "n")]
    pub name: String,
    /// Selects which historical public key verifies this attestation.
    /// Mandatory once signed; the signing endpoint sets the final value.
    #[serde(rename = "k")]
    pub public_key_id: String,
}

/// Rectangular region reserved for the seal graphic, neutralized before
/// hashing so re-embedding the QR code does not change the measured hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionZone {
    #[serde(rename = "x")]
    pub x: u32,
    #[serde(rename = "y")]
    pub y: u32,
    #[serde(rename = "w")]
    pub width: u32,
    #[serde(rename = "ht")]
    pub height: u32,
    /// RGB fill applied to the zone before hashing.
    #[serde(rename = "f")]
    pub fill_color: [u8; 3],
}

impl ExclusionZone {
    /// White-filled zone from a pixel rectangle, the default for raster seals.
    pub fn white(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            fill_color: [0xFF, 0xFF, 0xFF],
        }
    }
}

/// Document fingerprint as hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHashes {
    /// SHA-256 over the neutralized canonical bytes, never the raw original.
    #[serde(rename = "c")]
    pub cryptographic: String,
    /// Fixed-length perceptual hash, compared by Hamming distance.
    #[serde(rename = "p")]
    pub perceptual: String,
    /// Optional gradient (difference) hash.
    #[serde(rename = "d", skip_serializing_if = "Option::is_none")]
    pub difference: Option<String>,
}

/// The attestation as assembled by the client, before signing.
///
/// There is deliberately no timestamp field here: only the signing endpoint
/// stamps time, and only [`SignedAttestation`] carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedAttestation {
    #[serde(rename = "v")]
    pub version: u8,
    #[serde(rename = "h")]
    pub hashes: DocumentHashes,
    #[serde(rename = "i")]
    pub identity: Identity,
    #[serde(rename = "s")]
    pub service: ServiceInfo,
    #[serde(rename = "e", skip_serializing_if = "Option::is_none")]
    pub exclusion_zone: Option<ExclusionZone>,
    #[serde(rename = "u", skip_serializing_if = "Option::is_none")]
    pub user_url: Option<String>,
}

impl UnsignedAttestation {
    pub fn new(hashes: DocumentHashes, identity: Identity, service: ServiceInfo) -> Self {
        Self {
            version: ATTESTATION_VERSION,
            hashes,
            identity,
            service,
            exclusion_zone: None,
            user_url: None,
        }
    }

    pub fn with_exclusion_zone(mut self, zone: ExclusionZone) -> Self {
        self.exclusion_zone = Some(zone);
        self
    }

    pub fn with_user_url(mut self, url: impl Into<String>) -> Self {
        self.user_url = Some(url.into());
        self
    }
}

/// The signed attestation embedded into the document as a QR payload.
///
/// `timestamp` is server-authoritative and required. `signature` and
/// `public_key` are optional only so the decoder can distinguish a payload
/// whose signature was stripped (a distinct verification outcome) from a
/// structurally malformed one; [`crate::signing::seal_attestation`] always
/// populates both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAttestation {
    #[serde(rename = "v")]
    pub version: u8,
    #[serde(rename = "h")]
    pub hashes: DocumentHashes,
    /// Stamped by the signing endpoint; client values are never trusted.
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "i")]
    pub identity: Identity,
    #[serde(rename = "s")]
    pub service: ServiceInfo,
    #[serde(rename = "e", skip_serializing_if = "Option::is_none")]
    pub exclusion_zone: Option<ExclusionZone>,
    #[serde(rename = "u", skip_serializing_if = "Option::is_none")]
    pub user_url: Option<String>,
    /// Detached Ed25519 signature over the canonical signing bytes.
    #[serde(rename = "sg", skip_serializing_if = "Option::is_none")]
    pub signature: Option<Vec<u8>>,
    /// Raw public key for offline verification.
    #[serde(rename = "pk", skip_serializing_if = "Option::is_none")]
    pub public_key: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_codes_roundtrip() {
        for provider in [
            IdentityProvider::Google,
            IdentityProvider::GitHub,
            IdentityProvider::Twitter,
            IdentityProvider::Facebook,
            IdentityProvider::LinkedIn,
            IdentityProvider::Email,
        ] {
            assert_eq!(IdentityProvider::parse(provider.code()).unwrap(), provider);
        }
    }

    #[test]
    fn provider_parse_full_names() {
        assert_eq!(
            IdentityProvider::parse("GitHub").unwrap(),
            IdentityProvider::GitHub
        );
        assert!(IdentityProvider::parse("myspace").is_err());
    }

    #[test]
    fn unsigned_attestation_has_no_timestamp_key() {
        let att = UnsignedAttestation::new(
            DocumentHashes {
                cryptographic: "00".into(),
                perceptual: "11".into(),
                difference: None,
            },
            Identity {
                provider: IdentityProvider::Email,
                identifier: "a@b.c".into(),
                display_name: None,
            },
            ServiceInfo {
                name: "glyphseal".into(),
                public_key_id: "k1".into(),
            },
        );
        let json = serde_json::to_value(&att).unwrap();
        assert!(json.get("t").is_none());
        assert_eq!(json.get("v").unwrap(), ATTESTATION_VERSION);
    }

    #[test]
    fn compact_keys_on_the_wire() {
        let zone = ExclusionZone::white(10, 20, 30, 40);
        let json = serde_json::to_value(zone).unwrap();
        assert_eq!(json.get("w").unwrap(), 30);
        assert_eq!(json.get("ht").unwrap(), 40);
        assert_eq!(json.get("f").unwrap(), &serde_json::json!([255, 255, 255]));
    }
}
