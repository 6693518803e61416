//! Verification engine.
//!
//! Orchestrates decode → signature check → fingerprint recompute →
//! classification, and never lets a failure escape the closed set of
//! terminal statuses. The signature and hash checks run independently so a
//! caller can always report both axes (who asserted the content, and
//! whether the content still matches) even when one of them fails.

pub mod signature;

pub use signature::{
    canonical_signing_bytes, verify_embedded, verify_resolved, HttpKeyFetcher, KeyFetcher,
    KeyStore, SignatureCheck,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::attestation::Identity;
use crate::codec;
use crate::fingerprint::{self, perceptual, DocumentKind};

/// Progress of a verification run. Verification only moves forward; every
/// run ends in `Terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    Idle,
    Scanning,
    Decoded,
    SignatureChecked,
    HashChecked,
    Terminal(VerificationStatus),
}

/// The closed set of terminal verification outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    VerifiedExact,
    VerifiedVisual,
    Modified,
    ErrorSignatureInvalid,
    ErrorSignatureMissing,
    ErrorInvalidFormat,
    ErrorProcessing,
}

/// User-facing copy for a terminal status. Data, not control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub title: &'static str,
    pub description: &'static str,
    pub recommendation: &'static str,
}

impl VerificationStatus {
    pub const ALL: [VerificationStatus; 7] = [
        VerificationStatus::VerifiedExact,
        VerificationStatus::VerifiedVisual,
        VerificationStatus::Modified,
        VerificationStatus::ErrorSignatureInvalid,
        VerificationStatus::ErrorSignatureMissing,
        VerificationStatus::ErrorInvalidFormat,
        VerificationStatus::ErrorProcessing,
    ];

    /// Whether this outcome vouches for the document on any tier.
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::VerifiedExact | Self::VerifiedVisual)
    }

    /// The display triple for this outcome.
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::VerifiedExact => Verdict {
                title: "Verified: exact match",
                description: "The document is bit-identical to the one that was sealed, \
                              and the signature over the attestation is valid.",
                recommendation: "No action needed. This is the strongest possible result.",
            },
            Self::VerifiedVisual => Verdict {
                title: "Verified: visual match",
                description: "The document was re-encoded (for example saved as JPEG or \
                              resized) since sealing, but its visual content still matches \
                              the sealed fingerprint and the signature is valid.",
                recommendation: "Treat as authentic. Obtain the originally sealed file if \
                                 you need an exact-match guarantee.",
            },
            Self::Modified => Verdict {
                title: "Content modified",
                description: "The signature is valid, but the document no longer matches \
                              the sealed fingerprint: its content changed after sealing.",
                recommendation: "Do not trust this copy. Request the original document \
                                 from the sealer.",
            },
            Self::ErrorSignatureInvalid => Verdict {
                title: "Signature invalid",
                description: "The attestation's signature does not match its content. \
                              The attestation was tampered with or corrupted after signing.",
                recommendation: "Treat the seal as forged. None of the attested claims \
                                 can be relied on.",
            },
            Self::ErrorSignatureMissing => Verdict {
                title: "Signature missing",
                description: "The payload decodes as an attestation but carries no \
                              signature, so nothing binds it to a signing identity.",
                recommendation: "Treat the seal as unauthenticated. Ask the document \
                                 owner to re-seal it.",
            },
            Self::ErrorInvalidFormat => Verdict {
                title: "Not a recognized seal",
                description: "The scanned payload is not a valid attestation. It may \
                              come from an unrelated application or be damaged.",
                recommendation: "Re-scan the code. If the result repeats, the QR code \
                                 is not a seal this service can verify.",
            },
            Self::ErrorProcessing => Verdict {
                title: "Document could not be processed",
                description: "The attestation is readable, but the supplied document \
                              could not be fingerprinted (corrupt or unreadable file).",
                recommendation: "Check the file opens in a regular viewer, then try \
                                 verification again with an undamaged copy.",
            },
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::VerifiedExact => "verified_exact",
            Self::VerifiedVisual => "verified_visual",
            Self::Modified => "modified",
            Self::ErrorSignatureInvalid => "error_signature_invalid",
            Self::ErrorSignatureMissing => "error_signature_missing",
            Self::ErrorInvalidFormat => "error_invalid_format",
            Self::ErrorProcessing => "error_processing",
        };
        f.write_str(tag)
    }
}

/// Identity and timing attested by a checked signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureReport {
    pub identity: Identity,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Both verification axes, populated as far as the run reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct VerificationDetails {
    pub signature_valid: bool,
    pub cryptographic_match: bool,
    pub perceptual_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_kind: Option<DocumentKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_verification: Option<SignatureReport>,
}

/// Terminal status plus the detail record behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub status: VerificationStatus,
    pub details: VerificationDetails,
}

/// Stateless verification engine; one instance can serve any number of
/// concurrent documents.
#[derive(Debug, Clone, Copy)]
pub struct VerificationEngine {
    /// Maximum perceptual Hamming distance still counted as a visual match.
    pub similarity_threshold: u32,
}

impl Default for VerificationEngine {
    fn default() -> Self {
        Self {
            similarity_threshold: perceptual::DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl VerificationEngine {
    pub fn new(similarity_threshold: u32) -> Self {
        Self {
            similarity_threshold,
        }
    }

    /// Verify a document against a QR payload (or share link).
    ///
    /// Every input, however corrupt, lands on a terminal status; this
    /// function does not return errors.
    pub fn verify(&self, document: &[u8], mime: &str, payload: &str) -> VerificationReport {
        let mut state = VerificationState::Idle;
        advance(&mut state, VerificationState::Scanning);
        debug!(mime, payload_chars = payload.len(), "Verification started");

        let attestation = match codec::decode_payload(codec::extract_payload(payload)) {
            Ok(attestation) => attestation,
            Err(e) => {
                debug!(error = %e, "Payload decode failed");
                return terminal(
                    &mut state,
                    VerificationStatus::ErrorInvalidFormat,
                    VerificationDetails::default(),
                );
            }
        };
        advance(&mut state, VerificationState::Decoded);

        let signature_missing = attestation.signature.is_none();
        let check = signature::verify_embedded(&attestation);
        let signature_report = SignatureReport {
            identity: attestation.identity.clone(),
            timestamp: attestation.timestamp,
            error: check.error.clone(),
        };
        advance(&mut state, VerificationState::SignatureChecked);

        // The hash axis runs regardless of the signature outcome.
        let kind = DocumentKind::from_mime(mime);
        let document_kind = kind.as_ref().ok().copied();
        let recomputed = kind.and_then(|kind| {
            fingerprint::compute_hashes(kind, document, attestation.exclusion_zone.as_ref())
        });

        let mut details = VerificationDetails {
            signature_valid: check.valid,
            cryptographic_match: false,
            perceptual_match: false,
            document_kind,
            signature_verification: Some(signature_report),
        };

        let status = match recomputed {
            Ok(hashes) => {
                advance(&mut state, VerificationState::HashChecked);
                details.cryptographic_match =
                    constant_time_hex_eq(&hashes.cryptographic, &attestation.hashes.cryptographic);
                details.perceptual_match = perceptual::is_similar_hex(
                    &hashes.perceptual,
                    &attestation.hashes.perceptual,
                    self.similarity_threshold,
                );

                if signature_missing {
                    VerificationStatus::ErrorSignatureMissing
                } else if !check.valid {
                    VerificationStatus::ErrorSignatureInvalid
                } else if details.cryptographic_match {
                    VerificationStatus::VerifiedExact
                } else if details.perceptual_match {
                    VerificationStatus::VerifiedVisual
                } else {
                    VerificationStatus::Modified
                }
            }
            Err(e) => {
                debug!(error = %e, "Fingerprint recompute failed");
                if signature_missing {
                    VerificationStatus::ErrorSignatureMissing
                } else {
                    VerificationStatus::ErrorProcessing
                }
            }
        };

        terminal(&mut state, status, details)
    }
}

fn advance(state: &mut VerificationState, next: VerificationState) {
    debug!(from = ?state, to = ?next, "State transition");
    *state = next;
}

fn terminal(
    state: &mut VerificationState,
    status: VerificationStatus,
    details: VerificationDetails,
) -> VerificationReport {
    advance(state, VerificationState::Terminal(status));
    info!(%status, "Verification finished");
    VerificationReport { status, details }
}

/// Compare two hex digests without early exit on the first differing byte.
fn constant_time_hex_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
