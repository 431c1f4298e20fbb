//! Hash functions for metric placement.
//!
//! Placement must be reproducible by any process that knows the node set, so
//! every function here is a pure function of its input with fixed constants.

use md5::{Digest, Md5};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const JUMP_MULTIPLIER: u64 = 2_862_933_555_777_941_757;

/// Compute the carbon ring position of a key.
///
/// Carbon takes the first two bytes of the MD5 digest as a big-endian integer,
/// so positions fall in `[0, 65535]`.
#[inline]
#[must_use]
pub fn carbon_position(key: &str) -> u32 {
    let digest = Md5::digest(key.as_bytes());
    u32::from(u16::from_be_bytes([digest[0], digest[1]]))
}

/// 64-bit FNV-1a.
#[inline]
#[must_use]
pub fn fnv1a_64(data: &[u8]) -> u64 {
    data.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Jump consistent hash (Lamping & Veach).
///
/// Maps `key` to a bucket in `[0, buckets)`. Growing the bucket count from
/// `n` to `n + 1` moves only `1 / (n + 1)` of the keys.
#[must_use]
pub fn jump_hash(mut key: u64, buckets: usize) -> usize {
    let buckets = buckets as i64;
    let mut b: i64 = -1;
    let mut j: i64 = 0;
    while j < buckets {
        b = j;
        key = key.wrapping_mul(JUMP_MULTIPLIER).wrapping_add(1);
        j = ((b + 1) as f64 * ((1u64 << 31) as f64 / ((key >> 33) + 1) as f64)) as i64;
    }
    b.max(0) as usize
}
