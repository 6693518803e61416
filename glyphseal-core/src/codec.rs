//! Attestation codec.
//!
//! Wire pipeline: compact-keyed struct → CBOR → base64url (no padding).
//! Decoding reverses each step and rejects anything that fails structural
//! validation with [`SealError::InvalidFormat`]. The codec also accounts for
//! payload size at each stage and selects the smallest QR version that fits.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;
use tracing::debug;

use crate::attestation::{SignedAttestation, ATTESTATION_VERSION};
use crate::error::{Result, SealError};

/// QR byte-mode capacities for versions 1..=40 at error-correction level M.
pub const QR_CAPACITY_BYTES_M: [usize; 40] = [
    14, 26, 42, 62, 84, 106, 122, 152, 180, 213, 251, 287, 331, 362, 412, 450, 504, 560, 624, 666,
    711, 779, 857, 911, 997, 1059, 1125, 1190, 1264, 1370, 1452, 1538, 1628, 1722, 1809, 1911,
    1989, 2099, 2213, 2331,
];

/// Preferred ceiling on capacity utilization; staying under it leaves
/// headroom and improves scan reliability.
pub const QR_UTILIZATION_HEADROOM: f64 = 0.75;

/// Compact wire key → descriptive field name, across all attestation types.
const KEY_TABLE: &[(&str, &str)] = &[
    ("v", "version"),
    ("h", "hashes"),
    ("t", "timestamp"),
    ("i", "identity"),
    ("s", "serviceInfo"),
    ("e", "exclusionZone"),
    ("u", "userUrl"),
    ("sg", "signature"),
    ("pk", "publicKey"),
    ("c", "cryptographic"),
    ("p", "perceptual"),
    ("d", "difference"),
    ("pr", "provider"),
    ("id", "identifier"),
    ("dn", "displayName"),
    ("n", "name"),
    ("k", "publicKeyId"),
    ("x", "x"),
    ("y", "y"),
    ("w", "width"),
    ("ht", "height"),
    ("f", "fillColor"),
];

/// Payload size at each stage of the encoding pipeline, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SizeBreakdown {
    /// JSON with descriptive field names.
    pub original_size: usize,
    /// JSON with compacted keys.
    pub compact_size: usize,
    /// CBOR binary form.
    pub binary_size: usize,
    /// base64url text embedded in the QR code.
    pub final_size: usize,
}

/// The QR version selected for a payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QrFit {
    /// QR version, 1..=40.
    pub version: u8,
    /// Byte capacity of that version at EC level M.
    pub capacity: usize,
    /// Fraction of the capacity the payload occupies.
    pub utilization: f64,
}

/// Encode a signed attestation into the QR payload string.
pub fn encode_payload(attestation: &SignedAttestation) -> Result<String> {
    let mut binary = Vec::new();
    ciborium::into_writer(attestation, &mut binary)
        .map_err(|e| SealError::InvalidFormat(format!("CBOR encoding failed: {e}")))?;
    let payload = URL_SAFE_NO_PAD.encode(&binary);
    debug!(
        binary_bytes = binary.len(),
        payload_chars = payload.len(),
        "Encoded attestation payload"
    );
    Ok(payload)
}

/// Decode a QR payload string back into a signed attestation.
///
/// Any structural failure (foreign payload, truncation, wrong types,
/// unknown version) is `InvalidFormat`; this function never panics on
/// malformed input.
pub fn decode_payload(payload: &str) -> Result<SignedAttestation> {
    let binary = URL_SAFE_NO_PAD
        .decode(payload.trim())
        .map_err(|e| SealError::InvalidFormat(format!("not base64url: {e}")))?;

    let attestation: SignedAttestation = ciborium::from_reader(binary.as_slice())
        .map_err(|e| SealError::InvalidFormat(format!("not a CBOR attestation: {e}")))?;

    if attestation.version != ATTESTATION_VERSION {
        return Err(SealError::InvalidFormat(format!(
            "unknown attestation version {}",
            attestation.version
        )));
    }

    Ok(attestation)
}

/// Pull the payload out of a shared link (`.../v/<payload>`) or pass a bare
/// payload through unchanged.
pub fn extract_payload(input: &str) -> &str {
    let trimmed = input.trim();
    let candidate = match trimmed.rfind("/v/") {
        Some(idx) => &trimmed[idx + 3..],
        None => trimmed,
    };
    let end = candidate
        .find(['?', '#'])
        .unwrap_or(candidate.len());
    &candidate[..end]
}

/// Size of the attestation at each pipeline stage.
pub fn size_breakdown(attestation: &SignedAttestation) -> Result<SizeBreakdown> {
    let compact_json = serde_json::to_vec(attestation)
        .map_err(|e| SealError::InvalidFormat(format!("JSON encoding failed: {e}")))?;

    let compact_value: Value = serde_json::from_slice(&compact_json)
        .map_err(|e| SealError::InvalidFormat(format!("JSON re-parse failed: {e}")))?;
    let original_json = serde_json::to_vec(&expand_keys(compact_value))
        .map_err(|e| SealError::InvalidFormat(format!("JSON encoding failed: {e}")))?;

    let mut binary = Vec::new();
    ciborium::into_writer(attestation, &mut binary)
        .map_err(|e| SealError::InvalidFormat(format!("CBOR encoding failed: {e}")))?;

    Ok(SizeBreakdown {
        original_size: original_json.len(),
        compact_size: compact_json.len(),
        binary_size: binary.len(),
        final_size: URL_SAFE_NO_PAD.encode(&binary).len(),
    })
}

/// Smallest QR version whose capacity fits the payload.
///
/// Prefers the smallest version keeping utilization at or under
/// [`QR_UTILIZATION_HEADROOM`]; falls back to the smallest version that
/// fits at all; fails with `PayloadTooLarge` when even version 40 cannot
/// hold the payload.
pub fn select_qr_version(payload_len: usize) -> Result<QrFit> {
    let fit = |version: usize, capacity: usize| QrFit {
        version: (version + 1) as u8,
        capacity,
        utilization: payload_len as f64 / capacity as f64,
    };

    for (idx, &capacity) in QR_CAPACITY_BYTES_M.iter().enumerate() {
        if payload_len as f64 <= capacity as f64 * QR_UTILIZATION_HEADROOM {
            return Ok(fit(idx, capacity));
        }
    }
    for (idx, &capacity) in QR_CAPACITY_BYTES_M.iter().enumerate() {
        if payload_len <= capacity {
            return Ok(fit(idx, capacity));
        }
    }

    Err(SealError::PayloadTooLarge {
        size: payload_len,
        max: QR_CAPACITY_BYTES_M[QR_CAPACITY_BYTES_M.len() - 1],
    })
}

fn expand_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| (descriptive_key(&key), expand_keys(inner)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(expand_keys).collect()),
        other => other,
    }
}

fn descriptive_key(compact: &str) -> String {
    KEY_TABLE
        .iter()
        .find(|(short, _)| *short == compact)
        .map(|(_, full)| (*full).to_string())
        .unwrap_or_else(|| compact.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::{
        DocumentHashes, ExclusionZone, Identity, IdentityProvider, ServiceInfo,
    };
    use chrono::{TimeZone, Utc};

    fn sample_attestation() -> SignedAttestation {
        SignedAttestation {
            version: ATTESTATION_VERSION,
            hashes: DocumentHashes {
                cryptographic: "aa".repeat(32),
                perceptual: "bb".repeat(8),
                difference: Some("cc".repeat(8)),
            },
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            identity: Identity {
                provider: IdentityProvider::GitHub,
                identifier: "octocat".into(),
                display_name: Some("The Octocat".into()),
            },
            service: ServiceInfo {
                name: "glyphseal".into(),
                public_key_id: "2025-a".into(),
            },
            exclusion_zone: Some(ExclusionZone::white(850, 850, 150, 150)),
            user_url: Some("https://example.com".into()),
            signature: Some(vec![7u8; 64]),
            public_key: Some(vec![9u8; 32]),
        }
    }

    #[test]
    fn payload_roundtrip() {
        let attestation = sample_attestation();
        let payload = encode_payload(&attestation).unwrap();
        let decoded = decode_payload(&payload).unwrap();
        assert_eq!(decoded, attestation);
    }

    #[test]
    fn foreign_payload_is_invalid_format() {
        // Valid base64url, but not CBOR of our schema.
        let foreign = URL_SAFE_NO_PAD.encode(b"{\"app\":\"somebody-else\"}");
        assert!(matches!(
            decode_payload(&foreign),
            Err(SealError::InvalidFormat(_))
        ));
        // Not even base64url.
        assert!(matches!(
            decode_payload("not/base64!!"),
            Err(SealError::InvalidFormat(_))
        ));
    }

    #[test]
    fn truncated_payload_is_invalid_format() {
        let payload = encode_payload(&sample_attestation()).unwrap();
        let truncated = &payload[..payload.len() / 2];
        assert!(matches!(
            decode_payload(truncated),
            Err(SealError::InvalidFormat(_))
        ));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut attestation = sample_attestation();
        attestation.version = 9;
        let payload = encode_payload(&attestation).unwrap();
        assert!(matches!(
            decode_payload(&payload),
            Err(SealError::InvalidFormat(_))
        ));
    }

    #[test]
    fn extract_payload_handles_links_and_bare_text() {
        assert_eq!(extract_payload("abc123"), "abc123");
        assert_eq!(
            extract_payload("https://glyphseal.example/v/abc123"),
            "abc123"
        );
        assert_eq!(
            extract_payload("https://glyphseal.example/v/abc123?utm=x"),
            "abc123"
        );
        assert_eq!(extract_payload("  abc123\n"), "abc123");
    }

    #[test]
    fn size_breakdown_shrinks_through_the_pipeline() {
        let sizes = size_breakdown(&sample_attestation()).unwrap();
        assert!(sizes.original_size > sizes.compact_size);
        assert!(sizes.final_size > sizes.binary_size);
        let payload = encode_payload(&sample_attestation()).unwrap();
        assert_eq!(sizes.final_size, payload.len());
    }

    #[test]
    fn qr_selection_prefers_headroom() {
        // 14 bytes fits version 1 exactly, but over the 75% bound; version 2
        // (26 * 0.75 = 19.5) is the smallest with headroom.
        let fit = select_qr_version(14).unwrap();
        assert_eq!(fit.version, 2);

        // 10 bytes is within 75% of version 1 (10.5).
        assert_eq!(select_qr_version(10).unwrap().version, 1);
    }

    #[test]
    fn qr_selection_falls_back_to_smallest_fit() {
        // Nothing at version 40 satisfies the 75% bound above 1748 bytes,
        // so the largest payloads fall back to plain fitting.
        let fit = select_qr_version(2331).unwrap();
        assert_eq!(fit.version, 40);
        assert!(fit.utilization > QR_UTILIZATION_HEADROOM);
    }

    #[test]
    fn qr_selection_fails_past_version_40() {
        assert!(matches!(
            select_qr_version(2332),
            Err(SealError::PayloadTooLarge { size: 2332, max: 2331 })
        ));
    }

    #[test]
    fn expanded_keys_are_descriptive() {
        let compact = serde_json::to_value(sample_attestation()).unwrap();
        let expanded = expand_keys(compact);
        assert!(expanded.get("hashes").is_some());
        assert!(expanded.get("serviceInfo").is_some());
        assert!(expanded["hashes"].get("cryptographic").is_some());
        assert!(expanded["exclusionZone"].get("fillColor").is_some());
        assert!(expanded.get("h").is_none());
    }
}
