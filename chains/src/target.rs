//! Compact-target expansion and difficulty arithmetic.
//!
//! `bits` is the Bitcoin compact encoding: one exponent byte and a 3-byte
//! mantissa. Targets are compared as 256-bit big-endian integers; the digest
//! types in this workspace are little-endian, so comparisons walk the digest
//! from its last byte.

use smelter_core::hashes::Hash256Digest;

/// The compact form of the difficulty-1 target.
pub const DIFF1_BITS: u32 = 0x1d00_ffff;

/// Expand a compact `bits` value to a 256-bit big-endian target.
/// A set sign bit yields the zero target, which nothing satisfies.
pub fn expand_bits(bits: u32) -> [u8; 32] {
    let exponent = (bits >> 24) as isize;
    let mantissa = bits & 0x007f_ffff;
    let mut target = [0u8; 32];
    if bits & 0x0080_0000 != 0 {
        return target;
    }
    for i in 0..3isize {
        let idx = 32 - exponent + i;
        if (0..32).contains(&idx) {
            target[idx as usize] = (mantissa >> (8 * (2 - i))) as u8;
        }
    }
    target
}

/// True if the little-endian `hash` does not exceed the big-endian `target`.
pub fn hash_meets_target(hash: &Hash256Digest, target: &[u8; 32]) -> bool {
    let bytes = hash.as_ref();
    for i in 0..32 {
        let h = bytes[31 - i];
        let t = target[i];
        if h < t {
            return true;
        }
        if h > t {
            return false;
        }
    }
    true
}

/// Network difficulty implied by a compact target: start from
/// `0xFFFF / mantissa` and scale by 256 until the exponent reaches the
/// difficulty-1 exponent of 29.
pub fn difficulty(bits: u32) -> f64 {
    let mut shift = (bits >> 24) & 0xff;
    let mantissa = bits & 0x00ff_ffff;
    if mantissa == 0 {
        return f64::INFINITY;
    }
    let mut diff = f64::from(0xffffu32) / mantissa as f64;
    while shift < 29 {
        diff *= 256.0;
        shift += 1;
    }
    while shift > 29 {
        diff /= 256.0;
        shift -= 1;
    }
    diff
}

/// The difficulty a hash actually meets: difficulty-1 target divided by the
/// hash read as a 256-bit integer. Chain profiles scale this by their
/// per-chain difficulty factor.
pub fn share_difficulty(hash: &Hash256Digest) -> f64 {
    let be = hash.reversed();
    let mut be_bytes = [0u8; 32];
    be_bytes.copy_from_slice(be.as_ref());
    let hash_f = be_bytes_to_f64(&be_bytes);
    if hash_f == 0.0 {
        return f64::INFINITY;
    }
    be_bytes_to_f64(&expand_bits(DIFF1_BITS)) / hash_f
}

/// Approximate a 256-bit big-endian integer as f64 using its top 8 bytes.
fn be_bytes_to_f64(bytes: &[u8; 32]) -> f64 {
    let mut first_nonzero = 0;
    while first_nonzero < 32 && bytes[first_nonzero] == 0 {
        first_nonzero += 1;
    }
    if first_nonzero == 32 {
        return 0.0;
    }
    let mut value: u64 = 0;
    for i in 0..8 {
        value <<= 8;
        if first_nonzero + i < 32 {
            value |= bytes[first_nonzero + i] as u64;
        }
    }
    // value holds the leading byte at bit 56; rescale to its true position
    let exponent = (31 - first_nonzero as i32) * 8 - 56;
    (value as f64) * 2f64.powi(exponent)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_expands_the_difficulty_one_target() {
        let target = expand_bits(DIFF1_BITS);
        assert_eq!(&target[0..4], &[0, 0, 0, 0]);
        assert_eq!(&target[4..6], &[0xff, 0xff]);
        assert!(target[6..].iter().all(|b| *b == 0));
    }

    #[test]
    fn it_expands_high_difficulty_targets() {
        // exponent 0x17 = 23: mantissa lands at bytes 9..12
        let target = expand_bits(0x1703_4219);
        assert!(target[0..9].iter().all(|b| *b == 0));
        assert_eq!(&target[9..12], &[0x03, 0x42, 0x19]);
        assert!(target[12..].iter().all(|b| *b == 0));
    }

    #[test]
    fn it_expands_small_exponents() {
        let target = expand_bits(0x0212_3456);
        assert_eq!(target[30], 0x12);
        assert_eq!(target[31], 0x34);
    }

    #[test]
    fn it_zeroes_negative_targets() {
        assert_eq!(expand_bits(0x1d80_ffff), [0u8; 32]);
    }

    #[test]
    fn it_compares_hashes_to_targets() {
        let target = expand_bits(DIFF1_BITS);

        let mut good = [0u8; 32];
        good[24] = 0x12; // BE position 7, below the 0xffff at 4..6
        assert!(hash_meets_target(&Hash256Digest(good), &target));

        let mut bad = [0u8; 32];
        bad[28] = 0x01; // BE position 3, above the target
        assert!(!hash_meets_target(&Hash256Digest(bad), &target));
    }

    #[test]
    fn it_computes_difficulty_one() {
        assert!((difficulty(DIFF1_BITS) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn it_computes_historical_difficulty() {
        // Bitcoin block 100800
        let diff = difficulty(0x1b04_04cb);
        assert!((diff - 16307.420939).abs() / diff < 1e-6);
    }

    #[test]
    fn share_difficulty_of_the_max_target_is_one() {
        let target = expand_bits(DIFF1_BITS);
        let mut le = target;
        le.reverse();
        let diff = share_difficulty(&Hash256Digest(le));
        assert!((diff - 1.0).abs() < 1e-9);
    }

    #[test]
    fn share_difficulty_scales_inversely_with_the_hash() {
        let mut easy = [0u8; 32];
        easy[31] = 0x01; // BE leading byte: huge hash, tiny difficulty
        let mut hard = [0u8; 32];
        hard[20] = 0x01;
        let easy_diff = share_difficulty(&Hash256Digest(easy));
        let hard_diff = share_difficulty(&Hash256Digest(hard));
        assert!(hard_diff > easy_diff);
    }
}
