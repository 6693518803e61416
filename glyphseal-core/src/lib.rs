//! Glyphseal Core - Attestation and verification engine for document seals
//!
//! This crate implements the engine behind glyphseal's visually-embedded
//! proofs of origin: a QR code carrying a signed attestation that binds a
//! document fingerprint, an authenticated identity, and a server-issued
//! timestamp. Anyone holding a (possibly re-encoded) copy of the document
//! can recompute the fingerprint and grade the result, without the sealing
//! server being reachable.
//!
//! # Features
//!
//! - Multi-algorithm fingerprinting with a reproducible exclusion-zone
//!   protocol for raster images and a seal-layer exclusion for paginated
//!   documents
//! - Compact CBOR + base64url attestation codec sized for QR capacity
//! - Client/server signing split with server-authoritative timestamps
//! - Ed25519 detached signatures over one canonical byte serialization
//! - A verification state machine with a closed set of graded outcomes
//!
//! # Example
//!
//! ```no_run
//! use glyphseal_core::{
//!     compute_hashes, seal_attestation, DocumentKind, ExclusionZone, Identity,
//!     IdentityProvider, LocalSigner, ServiceInfo, UnsignedAttestation,
//!     VerificationEngine,
//! };
//!
//! # async fn example() -> glyphseal_core::Result<()> {
//! let image = std::fs::read("photo.png").unwrap();
//! let zone = ExclusionZone::white(850, 850, 150, 150);
//! let hashes = compute_hashes(DocumentKind::Image, &image, Some(&zone))?;
//!
//! let attestation = UnsignedAttestation::new(
//!     hashes,
//!     Identity {
//!         provider: IdentityProvider::GitHub,
//!         identifier: "octocat".into(),
//!         display_name: None,
//!     },
//!     ServiceInfo {
//!         name: "glyphseal".into(),
//!         public_key_id: "pending".into(),
//!     },
//! )
//! .with_exclusion_zone(zone);
//!
//! // In production the signer is the remote endpoint (HttpSigningClient).
//! let signer = LocalSigner::generate("local");
//! let signed = seal_attestation(attestation, &signer).await?;
//! let payload = glyphseal_core::codec::encode_payload(&signed)?;
//!
//! // Later, against a redistributed copy:
//! let report = VerificationEngine::default().verify(&image, "image/png", &payload);
//! println!("{}", report.status.verdict().title);
//! # Ok(())
//! # }
//! ```

pub mod attestation;
pub mod codec;
pub mod error;
pub mod fingerprint;
pub mod geometry;
pub mod signing;
pub mod verify;

// Re-export main types for convenience
pub use attestation::{
    DocumentHashes, ExclusionZone, Identity, IdentityProvider, ServiceInfo, SignedAttestation,
    UnsignedAttestation, ATTESTATION_VERSION,
};
pub use codec::{select_qr_version, QrFit, SizeBreakdown};
pub use error::{Result, SealError};
pub use fingerprint::{
    compute_hashes, DocumentKind, DEFAULT_SIMILARITY_THRESHOLD, SEAL_LAYER_NAME,
};
pub use geometry::{
    corner_anchors, safe_margins, seal_rect, CanvasSize, CornerAnchor, PixelRect, SafeMargins,
    SealPlacement,
};
pub use signing::{
    seal_attestation, HttpSigningClient, LocalSigner, SigningClientConfig, SigningResponse,
    SigningService,
};
pub use verify::{
    canonical_signing_bytes, KeyFetcher, KeyStore, SignatureCheck, VerificationDetails,
    VerificationEngine, VerificationReport, VerificationState, VerificationStatus, Verdict,
};
