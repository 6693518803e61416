//! Document fingerprinting.
//!
//! One entry point, [`compute_hashes`], dispatched over [`DocumentKind`]:
//! raster images are neutralized at the exclusion zone and hashed over a
//! canonical pixel encoding; multi-page documents get a composite hash with
//! the seal layer stripped first. Both paths are deterministic: the seal
//! and verify sides must land on byte-identical hashes for the same input.

mod image;
mod multipage;
pub mod perceptual;

pub use multipage::SEAL_LAYER_NAME;
pub use perceptual::DEFAULT_SIMILARITY_THRESHOLD;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::attestation::{DocumentHashes, ExclusionZone};
use crate::error::{Result, SealError};

pub use self::image::neutralize_zone;

/// Supported document families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    /// Single raster image; the seal occupies an exclusion zone.
    Image,
    /// Paginated document; the seal lives on a hash-excluded layer.
    MultiPage,
}

impl DocumentKind {
    /// Map a MIME type onto a document kind.
    pub fn from_mime(mime: &str) -> Result<Self> {
        match mime.to_ascii_lowercase().as_str() {
            "image/png" | "image/jpeg" | "image/webp" | "image/gif" => Ok(Self::Image),
            "application/pdf" => Ok(Self::MultiPage),
            other => Err(SealError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => f.write_str("image"),
            Self::MultiPage => f.write_str("multi-page"),
        }
    }
}

/// Compute the document fingerprint.
///
/// Deterministic for identical input bytes and zone parameters; the zone
/// only applies to raster images (layer-based documents carry none).
pub fn compute_hashes(
    kind: DocumentKind,
    bytes: &[u8],
    zone: Option<&ExclusionZone>,
) -> Result<DocumentHashes> {
    match kind {
        DocumentKind::Image => image::compute(bytes, zone),
        DocumentKind::MultiPage => {
            if zone.is_some() {
                warn!("exclusion zone ignored for layer-based document");
            }
            multipage::compute(bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_detection() {
        assert_eq!(
            DocumentKind::from_mime("image/png").unwrap(),
            DocumentKind::Image
        );
        assert_eq!(
            DocumentKind::from_mime("IMAGE/JPEG").unwrap(),
            DocumentKind::Image
        );
        assert_eq!(
            DocumentKind::from_mime("application/pdf").unwrap(),
            DocumentKind::MultiPage
        );
        assert!(matches!(
            DocumentKind::from_mime("video/mp4"),
            Err(SealError::UnsupportedFormat(_))
        ));
    }
}
