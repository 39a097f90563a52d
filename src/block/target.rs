//! Conversions and arithmetic on 256-bit difficulty targets.
//!
//! The compact ("nBits") encoding is a base-256 floating point number:
//! one exponent byte, a sign bit, and a 23-bit mantissa. Its exact bit
//! pattern is consensus-critical, so the codec here surfaces the sign and
//! overflow conditions of a decode and normalizes encodes the same way
//! every other implementation of the network does.
//!
//! All arithmetic is fixed-width 256-bit, spelled out over the integer's
//! limbs: multiplication saturates, division truncates, and no floating
//! point participates in any value that ends up in a header.
use bitcoin::util::uint::Uint256;
use bitcoin_hashes::Hash;
use thiserror::Error;

use crate::block::{Bits, BlockHash, Target};

/// An error decoding a target from hex.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseTargetError {
    /// The string is empty or longer than 64 nibbles.
    #[error("hex target must be between 1 and 64 characters")]
    InvalidLength,
    /// The string contains a non-hex character.
    #[error("invalid hex character {0:?}")]
    InvalidCharacter(char),
}

/// Decode a compact target.
///
/// Returns the expanded target along with the decode's *negative* and
/// *overflow* conditions. A target is only usable for consensus when both
/// flags are clear, the value is non-zero, and it does not exceed the
/// network's `pow_limit`.
pub fn from_compact(bits: Bits) -> (Target, bool, bool) {
    let size = (bits >> 24) as usize;
    let mut word = bits & 0x007f_ffff;

    let target = if size <= 3 {
        word >>= 8 * (3 - size);
        Uint256([word as u64, 0, 0, 0])
    } else {
        shift_word(word as u64, 8 * (size - 3))
    };
    let negative = word != 0 && (bits & 0x0080_0000) != 0;
    let overflow = word != 0
        && ((size > 34) || (word > 0xff && size > 33) || (word > 0xffff && size > 32));

    (target, negative, overflow)
}

/// Encode a target in compact form.
///
/// The mantissa is normalized so its high byte is non-zero; if that would
/// set the sign bit, the mantissa is shifted down one byte and the exponent
/// bumped. The sign bit itself is never set: targets are unsigned.
pub fn to_compact(target: Target) -> Bits {
    let mut size = (bit_len(&target) + 7) / 8;
    let mut compact: u32 = if size <= 3 {
        (target.0[0] << (8 * (3 - size))) as u32
    } else {
        u32::from(byte(&target, size - 1)) << 16
            | u32::from(byte(&target, size - 2)) << 8
            | u32::from(byte(&target, size - 3))
    };
    if compact & 0x0080_0000 != 0 {
        compact >>= 8;
        size += 1;
    }
    compact | (size as u32) << 24
}

/// Parse a big-endian hex string, with optional `0x` prefix, into a target.
pub fn from_hex(s: &str) -> Result<Target, ParseTargetError> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);

    if hex.is_empty() || hex.len() > 64 {
        return Err(ParseTargetError::InvalidLength);
    }
    let mut limbs = [0u64; 4];
    for (i, b) in hex.bytes().rev().enumerate() {
        let nibble = (b as char)
            .to_digit(16)
            .ok_or(ParseTargetError::InvalidCharacter(b as char))? as u64;
        limbs[i / 16] |= nibble << (4 * (i % 16));
    }
    Ok(Uint256(limbs))
}

/// Interpret a block hash as a 256-bit unsigned integer.
pub fn from_hash(hash: &BlockHash) -> Target {
    let bytes = hash.into_inner();
    let mut limbs = [0u64; 4];
    for (i, chunk) in bytes.chunks(8).enumerate() {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        limbs[i] = u64::from_le_bytes(buf);
    }
    Uint256(limbs)
}

/// Multiply a target by a small integer, saturating at `2^256 - 1`.
///
/// Saturation only ever happens on intermediates that the retarget clamps
/// to `pow_limit` before encoding.
pub fn mul_u64(target: Target, n: u64) -> Target {
    let mut limbs = [0u64; 4];
    let mut carry: u128 = 0;
    for i in 0..4 {
        let wide = target.0[i] as u128 * n as u128 + carry;
        limbs[i] = wide as u64;
        carry = wide >> 64;
    }
    if carry != 0 {
        Uint256([u64::MAX; 4])
    } else {
        Uint256(limbs)
    }
}

/// Divide a target by a small non-zero integer, truncating.
pub fn div_u64(target: Target, divisor: u64) -> Target {
    let mut limbs = [0u64; 4];
    let mut rem: u128 = 0;
    for i in (0..4).rev() {
        let cur = (rem << 64) | target.0[i] as u128;
        limbs[i] = (cur / divisor as u128) as u64;
        rem = cur % divisor as u128;
    }
    Uint256(limbs)
}

/// Exact addition. Callers guarantee the sum fits in 256 bits.
pub(crate) fn add(a: Target, b: Target) -> Target {
    let mut limbs = [0u64; 4];
    let mut carry: u128 = 0;
    for i in 0..4 {
        let wide = a.0[i] as u128 + b.0[i] as u128 + carry;
        limbs[i] = wide as u64;
        carry = wide >> 64;
    }
    Uint256(limbs)
}

/// Exact subtraction. Callers guarantee `a >= b`.
pub(crate) fn sub(a: Target, b: Target) -> Target {
    let mut limbs = [0u64; 4];
    let mut borrow: u64 = 0;
    for i in 0..4 {
        let (v, b1) = a.0[i].overflowing_sub(b.0[i]);
        let (v, b2) = v.overflowing_sub(borrow);
        limbs[i] = v;
        borrow = (b1 | b2) as u64;
    }
    Uint256(limbs)
}

// Position of the highest set bit, 1-based; 0 for zero.
fn bit_len(target: &Target) -> usize {
    for (i, limb) in target.0.iter().enumerate().rev() {
        if *limb != 0 {
            return 64 * i + (64 - limb.leading_zeros() as usize);
        }
    }
    0
}

// The i-th byte of the target, little-endian.
fn byte(target: &Target, i: usize) -> u8 {
    (target.0[i / 8] >> (8 * (i % 8))) as u8
}

// A 23-bit word shifted left by a whole number of bytes, truncating above
// 256 bits. Truncated decodes carry the overflow flag.
fn shift_word(word: u64, bit_shift: usize) -> Target {
    let mut limbs = [0u64; 4];
    let li = bit_shift / 64;
    if li < 4 {
        let wide = (word as u128) << (bit_shift % 64);
        limbs[li] = wide as u64;
        if li + 1 < 4 {
            limbs[li + 1] = (wide >> 64) as u64;
        }
    }
    Uint256(limbs)
}

#[cfg(test)]
mod tests {
    use super::*;

    use bitcoin_hashes::hex::FromHex;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    const POW_LIMIT_HEX: &str = "00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";

    #[test]
    fn test_from_compact_vectors() {
        // Genesis difficulty: 0x0ffff0 << 216.
        let (t, neg, over) = from_compact(0x1e0ffff0);
        assert!(!neg && !over);
        assert_eq!(t, Uint256([0, 0, 0, 0x00000ffff0000000]));

        // Regtest limit: 0x7fffff << 232.
        let (t, neg, over) = from_compact(0x207fffff);
        assert!(!neg && !over);
        assert_eq!(t, Uint256([0, 0, 0, 0x7fffff0000000000]));

        // Exponent below 3 shifts the mantissa down.
        let (t, _, _) = from_compact(0x01123456);
        assert_eq!(t, Uint256([0x12, 0, 0, 0]));

        // Zero mantissa decodes to zero with clean flags.
        let (t, neg, over) = from_compact(0x20800000);
        assert_eq!(t, Target::default());
        assert!(!neg && !over);
    }

    #[test]
    fn test_from_compact_flags() {
        // Sign bit with a non-zero mantissa.
        let (_, neg, over) = from_compact(0x1d800001);
        assert!(neg);
        assert!(!over);

        // Exponent 0 shifts the mantissa to nothing, so the sign bit is moot.
        let (t, neg, _) = from_compact(0x00ffffff);
        assert_eq!(t, Target::default());
        assert!(!neg);

        // Overflow thresholds from the encoding laws.
        assert!(from_compact(0x23000001).2);
        assert!(!from_compact(0x22000001).2);
        assert!(from_compact(0x22000100).2);
        assert!(from_compact(0x21010000).2);
        assert!(!from_compact(0x2100ffff).2);
    }

    #[test]
    fn test_to_compact_vectors() {
        assert_eq!(to_compact(Target::default()), 0);
        assert_eq!(to_compact(Uint256([0, 0, 0, 0x00000ffff0000000])), 0x1e0ffff0);
        assert_eq!(to_compact(Uint256([0, 0, 0, 0x7fffff0000000000])), 0x207fffff);
        assert_eq!(to_compact(from_hex(POW_LIMIT_HEX).unwrap()), 0x1e0fffff);

        // A mantissa whose high byte would set the sign bit is renormalized.
        assert_eq!(to_compact(Uint256([0x80, 0, 0, 0])), 0x02008000);
        assert_eq!(to_compact(Uint256([0x1234, 0, 0, 0])), 0x02123400);
        assert_eq!(to_compact(Uint256([0x123456, 0, 0, 0])), 0x03123456);
    }

    #[quickcheck]
    fn prop_compact_roundtrip(bits: u32) -> TestResult {
        let (target, negative, overflow) = from_compact(bits);
        if negative || overflow || target == Target::default() {
            return TestResult::discard();
        }
        let (again, negative, overflow) = from_compact(to_compact(target));
        TestResult::from_bool(again == target && !negative && !overflow)
    }

    #[test]
    fn test_from_hex() {
        assert_eq!(from_hex("ff").unwrap(), Uint256([0xff, 0, 0, 0]));
        assert_eq!(from_hex("0xff").unwrap(), Uint256([0xff, 0, 0, 0]));
        assert_eq!(
            from_hex("0x0000000000000000000000000000000000000000000000000000000000100010").unwrap(),
            Uint256([0x100010, 0, 0, 0])
        );
        assert_eq!(
            from_hex(POW_LIMIT_HEX).unwrap(),
            Uint256([u64::MAX, u64::MAX, u64::MAX, 0x00000fffffffffff])
        );
        assert_eq!(from_hex(""), Err(ParseTargetError::InvalidLength));
        assert_eq!(from_hex("0x"), Err(ParseTargetError::InvalidLength));
        assert!(matches!(from_hex("00g0"), Err(ParseTargetError::InvalidCharacter('g'))));
        let too_long = "f".repeat(65);
        assert_eq!(from_hex(&too_long), Err(ParseTargetError::InvalidLength));
    }

    #[test]
    fn test_from_hash() {
        let hash = BlockHash::from_hex(
            "00000a10f7ce671e773330376ce892a6c0b93fbc05553ebbf659b11e3bf9188d",
        )
        .unwrap();
        let target = from_hash(&hash);
        assert_eq!(to_compact(target), 0x1e0a10f7);
        assert!(target < from_hex(POW_LIMIT_HEX).unwrap());

        let zero = BlockHash::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000000",
        )
        .unwrap();
        assert_eq!(from_hash(&zero), Target::default());
    }

    #[test]
    fn test_mul_div() {
        let t = Uint256([0, 0, 0, 0x00000fffffffffff]);
        assert_eq!(div_u64(mul_u64(t, 86400), 86400), t);

        let quarter = div_u64(from_compact(0x1e0ffff0).0, 4);
        assert_eq!(to_compact(quarter), 0x1e03fffc);

        // Saturation at 2^256 - 1.
        let max = Uint256([u64::MAX; 4]);
        assert_eq!(mul_u64(max, 2), max);
        assert_eq!(mul_u64(from_hex(POW_LIMIT_HEX).unwrap(), u64::MAX), max);
        assert_eq!(mul_u64(max, 1), max);
        assert_eq!(mul_u64(max, 0), Target::default());
    }

    #[test]
    fn test_add_sub() {
        let a = Uint256([u64::MAX, 1, 0, 0]);
        let b = Uint256([1, 0, 0, 0]);
        assert_eq!(add(a, b), Uint256([0, 2, 0, 0]));
        assert_eq!(sub(add(a, b), b), a);
        assert_eq!(sub(a, a), Target::default());
    }
}
