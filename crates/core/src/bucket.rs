//! Deterministic visitor bucketing and variant selection.
//!
//! The bucket hash is the sole mechanism guaranteeing a visitor always
//! lands in the same variant, even when recomputed by a different process
//! or instance, so it must be reproducible byte-for-byte.

use sha2::{Digest, Sha256};

use crate::model::Variant;

/// Maps a (visitor, experiment) pair to a bucket in `[0, 100)`.
///
/// SHA-256 over the UTF-8 bytes of `"{visitor}:{experiment}"`, then the
/// first 8 hex characters of the digest parsed as an unsigned 32-bit
/// integer (equivalently the first 4 digest bytes, big-endian), mod 100.
///
/// Pure function: no hidden state, stable across calls and processes.
///
/// # Examples
/// ```
/// use splitflow_core::bucket::bucket;
///
/// let b = bucket("visitor-1", "exp-1");
/// assert!(b < 100);
/// assert_eq!(b, bucket("visitor-1", "exp-1"));
/// ```
#[must_use]
pub fn bucket(visitor_id: &str, experiment_id: &str) -> u32 {
    let digest = Sha256::digest(format!("{visitor_id}:{experiment_id}").as_bytes());
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    prefix % 100
}

/// Maps a bucket to a variant using cumulative traffic percentages.
///
/// Walks variants in their fixed creation order, accumulating
/// `traffic_pct`, and returns the first variant where
/// `bucket < cumulative`. A split of `[50, 50]` sends buckets 0-49 to the
/// first variant and 50-99 to the second.
///
/// Falls back to the last variant if the walk exhausts without a match,
/// which handles split rounding edge cases. Returns `None` only for an
/// empty slice.
#[must_use]
pub fn pick_variant(bucket: u32, variants: &[Variant]) -> Option<&Variant> {
    let mut cumulative = 0u32;
    for variant in variants {
        cumulative += u32::from(variant.traffic_pct);
        if bucket < cumulative {
            return Some(variant);
        }
    }
    variants.last()
}
