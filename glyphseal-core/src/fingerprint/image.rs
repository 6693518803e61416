//! Raster document fingerprinting.
//!
//! The exclusion zone is neutralized (filled with its fill color) on an
//! owned copy before any hash is taken, so the measured fingerprint is
//! independent of whatever seal graphic later occupies the zone. The
//! cryptographic hash covers a canonical pixel encoding rather than the
//! container bytes, which makes the seal and verify paths bit-reproducible
//! across PNG/JPEG containers.

use image::{DynamicImage, Rgb, RgbImage};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::attestation::{DocumentHashes, ExclusionZone};
use crate::error::{Result, SealError};
use crate::fingerprint::perceptual;

pub(crate) fn compute(bytes: &[u8], zone: Option<&ExclusionZone>) -> Result<DocumentHashes> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| SealError::Processing(format!("image decode failed: {e}")))?;

    let mut pixels = decoded.to_rgb8();
    if let Some(zone) = zone {
        neutralize_zone(&mut pixels, zone);
    }

    let cryptographic = hex::encode(canonical_digest(&pixels));
    let neutralized = DynamicImage::ImageRgb8(pixels);
    let perceptual_hash = perceptual::blockhash_hex(&neutralized);
    let difference = perceptual::gradient_hash_hex(&neutralized);

    debug!(
        width = neutralized.width(),
        height = neutralized.height(),
        zone = zone.is_some(),
        "Computed image fingerprint"
    );

    Ok(DocumentHashes {
        cryptographic,
        perceptual: perceptual_hash,
        difference: Some(difference),
    })
}

/// Fill the exclusion zone with its fill color, clamped to the canvas.
pub fn neutralize_zone(pixels: &mut RgbImage, zone: &ExclusionZone) {
    let x_end = zone.x.saturating_add(zone.width).min(pixels.width());
    let y_end = zone.y.saturating_add(zone.height).min(pixels.height());
    let fill = Rgb(zone.fill_color);

    for y in zone.y.min(pixels.height())..y_end {
        for x in zone.x.min(pixels.width())..x_end {
            pixels.put_pixel(x, y, fill);
        }
    }
}

/// SHA-256 over the canonical pixel encoding: dimensions as big-endian
/// u32s followed by raw RGB8 rows.
fn canonical_digest(pixels: &RgbImage) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(pixels.width().to_be_bytes());
    hasher.update(pixels.height().to_be_bytes());
    hasher.update(pixels.as_raw());
    hasher.finalize().into()
}
