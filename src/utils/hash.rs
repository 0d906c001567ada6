//! Content checksums for cache-busting.
//!
//! Uses blake3 truncated to 8 bytes (16 hex chars): stable across runs and
//! platforms, short enough to embed in file names.
//!
//! # Usage
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let sum = hash::checksum(b"body { color: red }"); // -> "a1b2c3d4e5f60718"
//! ```

/// Number of digest bytes kept in a checksum.
const CHECKSUM_BYTES: usize = 8;

/// Compute the short hex checksum of a byte slice.
#[inline]
pub fn checksum<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    let digest = blake3::hash(data.as_ref());
    hex::encode(&digest.as_bytes()[..CHECKSUM_BYTES])
}
