//! Perceptual hashing for raster documents.
//!
//! Recompression (JPEG re-encode, resize) rewrites every byte of an image
//! while leaving it visually unchanged. The perceptual hash moves with the
//! picture, not the bytes: visually similar images land within a small
//! Hamming distance of each other, so a re-encoded seal can still verify on
//! the visual tier.
//!
//! Uses the Blockhash algorithm with a 64-bit output; a 9×8 gradient hash
//! is computed alongside as the optional difference component.

use blockhash::{blockhash64, Blockhash64};
use image::imageops::FilterType;
use image::DynamicImage;

/// Perceptual hash length in bytes (64 bits).
pub const PERCEPTUAL_HASH_SIZE: usize = 8;

/// Maximum Hamming distance at which two perceptual hashes are considered
/// the same picture. 10 bits of 64 is roughly 15%; JPEG re-encodes at
/// realistic qualities land well under it, unrelated images well over.
pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 10;

/// 64-bit Blockhash of an image, hex-encoded.
pub fn blockhash_hex(image: &DynamicImage) -> String {
    let hash: Blockhash64 = blockhash64(image);
    let bytes: [u8; 8] = hash.into();
    hex::encode(bytes)
}

/// 64-bit gradient (difference) hash, hex-encoded.
///
/// Downscales to a 9×8 luma grid and emits one bit per horizontally
/// adjacent pair, brighter-to-the-right = 1.
pub fn gradient_hash_hex(image: &DynamicImage) -> String {
    let luma = image.to_luma8();
    let grid = image::imageops::resize(&luma, 9, 8, FilterType::Triangle);

    let mut bytes = [0u8; PERCEPTUAL_HASH_SIZE];
    for row in 0..8u32 {
        let mut bits = 0u8;
        for col in 0..8u32 {
            bits <<= 1;
            if grid.get_pixel(col + 1, row)[0] > grid.get_pixel(col, row)[0] {
                bits |= 1;
            }
        }
        bytes[row as usize] = bits;
    }
    hex::encode(bytes)
}

/// Hamming distance between two hash byte arrays.
///
/// Hashes of different lengths are compared over the overlap with a penalty
/// of 8 bits per missing byte. Returns `None` if either array is empty.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> Option<u32> {
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let overlap = a.len().min(b.len());
    let distance: u32 = a[..overlap]
        .iter()
        .zip(b[..overlap].iter())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum();
    let size_penalty = (a.len().abs_diff(b.len()) * 8) as u32;

    Some(distance + size_penalty)
}

/// Hamming distance between two hex-encoded hashes.
///
/// Returns `None` when either string is empty or not valid hex.
pub fn hamming_distance_hex(a: &str, b: &str) -> Option<u32> {
    let a = hex::decode(a).ok()?;
    let b = hex::decode(b).ok()?;
    hamming_distance(&a, &b)
}

/// Whether two hex-encoded hashes are within `threshold` differing bits.
///
/// Undecodable input counts as not similar.
pub fn is_similar_hex(a: &str, b: &str, threshold: u32) -> bool {
    matches!(hamming_distance_hex(a, b), Some(distance) if distance <= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let r = ((x as f32 / width as f32) * 255.0) as u8;
            let g = ((y as f32 / height as f32) * 255.0) as u8;
            Rgb([r, g, 128])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn blockhash_is_deterministic() {
        let img = gradient_image(128, 128);
        assert_eq!(blockhash_hex(&img), blockhash_hex(&img));
        assert_eq!(blockhash_hex(&img).len(), PERCEPTUAL_HASH_SIZE * 2);
    }

    #[test]
    fn gradient_hash_is_deterministic() {
        let img = gradient_image(128, 128);
        assert_eq!(gradient_hash_hex(&img), gradient_hash_hex(&img));
        assert_eq!(gradient_hash_hex(&img).len(), PERCEPTUAL_HASH_SIZE * 2);
    }

    #[test]
    fn hamming_distance_identical() {
        let hash = [0x00, 0xFF, 0xAA, 0x55, 0x00, 0xFF, 0xAA, 0x55];
        assert_eq!(hamming_distance(&hash, &hash), Some(0));
    }

    #[test]
    fn hamming_distance_counts_bits() {
        let a = [0x00u8; 8];
        let b = [0xFFu8; 8];
        assert_eq!(hamming_distance(&a, &b), Some(64));

        let c = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(hamming_distance(&a, &c), Some(1));
    }

    #[test]
    fn hamming_distance_size_mismatch_penalty() {
        let short = [0x00u8; 5];
        let long = [0x00u8; 8];
        assert_eq!(hamming_distance(&short, &long), Some(24));
    }

    #[test]
    fn hamming_distance_empty_is_none() {
        assert_eq!(hamming_distance(&[], &[0x00]), None);
        assert_eq!(hamming_distance_hex("", "00"), None);
    }

    #[test]
    fn similarity_threshold_is_inclusive() {
        assert!(is_similar_hex("00", "01", 1));
        assert!(!is_similar_hex("00", "03", 1));
        assert!(!is_similar_hex("zz", "00", 10));
    }

    #[test]
    fn different_pictures_hash_far_apart() {
        let gradient = gradient_image(128, 128);
        let solid = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(128, 128, Rgb([0, 0, 0])));
        let distance =
            hamming_distance_hex(&blockhash_hex(&gradient), &blockhash_hex(&solid)).unwrap();
        assert!(distance > DEFAULT_SIMILARITY_THRESHOLD);
    }
}
