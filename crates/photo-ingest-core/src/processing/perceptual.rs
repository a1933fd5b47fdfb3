//! # Perceptual Hashing Module
//!
//! Content fingerprints for deduplication and preview addressing.
//!
//! ## Overview
//!
//! The fingerprint is a DCT-based perceptual hash computed over the encoded
//! *thumbnail*, not the full-resolution source. The thumbnail is already
//! normalized in size and colour mode, so the hash is cheap to compute and
//! stable across trivial re-encodes of the same picture.
//!
//! ## Algorithm
//!
//! 1. Convert to grayscale and resample to 32×32
//! 2. Apply a 2-D DCT-II (rows, then columns)
//! 3. Keep the top-left 8×8 low-frequency block
//! 4. Set one bit per coefficient that is above the block's median
//!
//! Bits are packed row-major with the first coefficient in the most
//! significant position and rendered as 16 lowercase hex digits.
//!
//! ## Hamming Distance Interpretation
//!
//! - 0: treated as the same photo by the ingestion pipeline
//! - 1-10: visually similar images
//! - >10: different images
//!
//! Visually near-identical photos may share a fingerprint; they are
//! deduplicated as the same photo.

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array2;
use rustdct::DctPlanner;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Side length of the low-frequency block that forms the hash
pub const HASH_SIZE: usize = 8;

/// Side length of the grayscale image fed into the DCT
const DCT_SIZE: usize = HASH_SIZE * 4;

/// A perceptual hash represented as a 64-bit value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PHash(pub u64);

impl PHash {
    /// Calculate the Hamming distance between two perceptual hashes
    pub fn distance(&self, other: &PHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Check if two images are perceptually similar based on a threshold
    pub fn is_similar(&self, other: &PHash, threshold: u32) -> bool {
        self.distance(other) <= threshold
    }

    /// Fixed-width hex form used as the content hash
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl std::fmt::Display for PHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for PHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != HASH_SIZE * HASH_SIZE / 4 {
            return Err(Error::InvalidHash(s.to_string()));
        }
        u64::from_str_radix(s, 16)
            .map(PHash)
            .map_err(|_| Error::InvalidHash(s.to_string()))
    }
}

/// Calculate the DCT perceptual hash of a decoded image
pub fn calculate_phash(img: &DynamicImage) -> PHash {
    let gray = img
        .grayscale()
        .resize_exact(DCT_SIZE as u32, DCT_SIZE as u32, FilterType::Lanczos3)
        .to_luma8();

    let mut matrix = Array2::from_shape_fn((DCT_SIZE, DCT_SIZE), |(y, x)| {
        gray.get_pixel(x as u32, y as u32)[0] as f64
    });

    let mut planner = DctPlanner::new();
    let dct = planner.plan_dct2(DCT_SIZE);

    // Rows first
    for mut row in matrix.rows_mut() {
        if let Some(values) = row.as_slice_mut() {
            dct.process_dct2(values);
        }
    }

    // Then columns, via a transposed copy so every column is contiguous
    let mut transposed = Array2::from_shape_fn((DCT_SIZE, DCT_SIZE), |(y, x)| matrix[[x, y]]);
    for mut row in transposed.rows_mut() {
        if let Some(values) = row.as_slice_mut() {
            dct.process_dct2(values);
        }
    }

    let low: Vec<f64> = (0..HASH_SIZE)
        .flat_map(|y| (0..HASH_SIZE).map(move |x| (y, x)))
        .map(|(y, x)| transposed[[x, y]])
        .collect();

    let median = median(&low);

    let hash = low
        .iter()
        .fold(0u64, |acc, &value| (acc << 1) | u64::from(value > median));

    PHash(hash)
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Derive the content hash from encoded thumbnail bytes
pub fn fingerprint(thumbnail: &[u8]) -> Result<PHash> {
    let img = image::load_from_memory(thumbnail)?;
    Ok(calculate_phash(&img))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::processing::rendition::{render, RenditionSpec};
    use crate::test_utils::block_image;

    #[test]
    fn test_hex_is_fixed_width() {
        assert_eq!(PHash(0).to_hex(), "0000000000000000");
        assert_eq!(PHash(0xf068999999996868).to_string(), "f068999999996868");
    }

    #[test]
    fn test_parse_roundtrip() {
        let hash: PHash = "f068999999996868".parse().unwrap();
        assert_eq!(hash, PHash(0xf068999999996868));
        assert!("f0689999".parse::<PHash>().is_err());
        assert!("zz68999999996868".parse::<PHash>().is_err());
    }

    #[test]
    fn test_distance() {
        assert_eq!(PHash(0b1011).distance(&PHash(0b0001)), 2);
        assert!(PHash(0b1011).is_similar(&PHash(0b0001), 2));
        assert!(!PHash(0b1011).is_similar(&PHash(0b0001), 1));
    }

    #[test]
    fn test_fingerprint_is_idempotent() {
        let img = block_image(42, 640, 480);
        let spec = RenditionSpec::thumbnail(&Config::default());

        let first = render(&img, &spec).unwrap();
        let second = render(&img, &spec).unwrap();
        assert_eq!(first, second);

        assert_eq!(fingerprint(&first).unwrap(), fingerprint(&second).unwrap());
    }

    #[test]
    fn test_distinct_images_distinct_hashes() {
        let spec = RenditionSpec::thumbnail(&Config::default());
        let a = fingerprint(&render(&block_image(1, 320, 240), &spec).unwrap()).unwrap();
        let b = fingerprint(&render(&block_image(2, 320, 240), &spec).unwrap()).unwrap();

        assert_ne!(a, b);
        assert!(a.distance(&b) > 10);
    }

    #[test]
    fn test_rescaled_copy_is_similar() {
        let spec = RenditionSpec::thumbnail(&Config::default());
        let original = fingerprint(&render(&block_image(9, 800, 600), &spec).unwrap()).unwrap();
        let smaller = block_image(9, 800, 600).resize_exact(400, 300, FilterType::Triangle);
        let rescaled = fingerprint(&render(&smaller, &spec).unwrap()).unwrap();

        assert!(original.is_similar(&rescaled, 10));
    }

    #[test]
    fn test_fingerprint_rejects_garbage() {
        assert!(fingerprint(b"not an image").is_err());
    }
}
