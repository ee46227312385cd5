//! Word-level views of [`BigUint`] and random integer generation.
//!
//! The constant-time routines operate on fixed-length little-endian word
//! vectors rather than on [`BigUint`] directly, so that the length of an
//! intermediate value never depends on its magnitude.

use alloc::vec::Vec;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::errors::{Error, Result};

/// Machine word used by the constant-time routines.
pub type Word = u64;

/// Bits per [`Word`].
pub const WORD_BITS: usize = 64;

/// Number of significant words in `x`; zero for zero.
#[inline]
pub fn sig_words(x: &BigUint) -> usize {
    x.bits().div_ceil(WORD_BITS)
}

/// Little-endian words of `x`, zero-extended to at least `len` words.
pub fn to_words(x: &BigUint, len: usize) -> Vec<Word> {
    let bytes = Zeroizing::new(x.to_bytes_le());
    let mut words = vec![0; len.max(bytes.len().div_ceil(8))];

    for (word, chunk) in words.iter_mut().zip(bytes.chunks(8)) {
        let mut buf = [0u8; 8];
        buf[..chunk.len()].copy_from_slice(chunk);
        *word = Word::from_le_bytes(buf);
    }

    words
}

/// Inverse of [`to_words`].
pub fn from_words(words: &[Word]) -> BigUint {
    let bytes: Zeroizing<Vec<u8>> =
        Zeroizing::new(words.iter().flat_map(|w| w.to_le_bytes()).collect());
    BigUint::from_bytes_le(&bytes)
}

/// Lowest word of `x`.
#[inline]
pub fn low_word(x: &BigUint) -> Word {
    to_words(x, 1)[0]
}

/// Number of trailing zero bits of `x`; zero for zero.
#[inline]
pub fn low_zero_bits(x: &BigUint) -> usize {
    x.trailing_zeros().unwrap_or(0)
}

/// Bit `n` of the little-endian word vector `words`.
#[inline]
pub fn get_bit(words: &[Word], n: usize) -> bool {
    words
        .get(n / WORD_BITS)
        .map_or(false, |w| (w >> (n % WORD_BITS)) & 1 == 1)
}

/// Extracts `length` bits starting at bit `offset`.
///
/// `length` must be below the word size.
#[inline]
pub fn get_substring(words: &[Word], offset: usize, length: usize) -> Word {
    debug_assert!(length > 0 && length < WORD_BITS);

    let idx = offset / WORD_BITS;
    let shift = offset % WORD_BITS;

    let lo = words.get(idx).copied().unwrap_or(0) >> shift;
    let hi = if shift > 0 {
        words.get(idx + 1).copied().unwrap_or(0) << (WORD_BITS - shift)
    } else {
        0
    };

    (lo | hi) & ((1 << length) - 1)
}

/// Splits a signed integer into its sign and magnitude.
pub fn split_sign(x: &BigInt) -> (bool, BigUint) {
    let (sign, bytes) = x.to_bytes_be();
    let bytes = Zeroizing::new(bytes);
    (sign == Sign::Minus, BigUint::from_bytes_be(&bytes))
}

/// Magnitude of a signed integer.
#[inline]
pub fn magnitude(x: &BigInt) -> BigUint {
    split_sign(x).1
}

/// Lifts a non-negative integer into the signed domain.
#[inline]
pub fn to_signed(x: BigUint) -> BigInt {
    BigInt::from_biguint(Sign::Plus, x)
}

/// Fixed-width big-endian encoding of `x` in exactly `bytes` bytes.
pub fn encode_1363(x: &BigUint, bytes: usize) -> Result<Vec<u8>> {
    let raw = Zeroizing::new(x.to_bytes_be());
    if x.is_zero() {
        return Ok(vec![0u8; bytes]);
    }
    if raw.len() > bytes {
        return Err(Error::invalid_argument(
            "encode_1363: value does not fit in output",
        ));
    }

    let mut out = vec![0u8; bytes];
    out[bytes - raw.len()..].copy_from_slice(&raw);
    Ok(out)
}

/// Big-endian decode keeping only the leftmost `max_bits` bits.
pub fn from_bytes_with_max_bits(bytes: &[u8], max_bits: usize) -> BigUint {
    let x = BigUint::from_bytes_be(bytes);
    let input_bits = 8 * bytes.len();
    if input_bits > max_bits {
        x >> (input_bits - max_bits)
    } else {
        x
    }
}

/// Draws a uniformly random integer of at most `bits` bits.
///
/// With `set_high_bit` the result has exactly `bits` bits.
pub fn random_bits<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    bits: usize,
    set_high_bit: bool,
) -> BigUint {
    if bits == 0 {
        return BigUint::zero();
    }

    let mut bytes = Zeroizing::new(vec![0u8; bits.div_ceil(8)]);
    rng.fill_bytes(&mut bytes);

    let excess = bytes.len() * 8 - bits;
    bytes[0] &= 0xFF >> excess;
    if set_high_bit {
        bytes[0] |= 0x80 >> excess;
    }

    BigUint::from_bytes_be(&bytes)
}

/// Draws a uniformly random integer in `[min, max)` by rejection sampling.
pub fn random_integer<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    min: &BigUint,
    max: &BigUint,
) -> Result<BigUint> {
    if min >= max {
        return Err(Error::invalid_argument(
            "random_integer: invalid min/max values",
        ));
    }

    let bits = max.bits();
    loop {
        let r = random_bits(rng, bits, false);
        if &r >= min && &r < max {
            return Ok(r);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::{Num, One};
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn test_words_roundtrip() {
        let x = BigUint::from_str_radix("1234567890abcdef00112233445566778899aabbccddeeff", 16)
            .unwrap();
        let words = to_words(&x, 0);
        assert_eq!(words.len(), 3);
        assert_eq!(words[0], 0x8899aabbccddeeff);
        assert_eq!(from_words(&words), x);

        let padded = to_words(&x, 5);
        assert_eq!(padded.len(), 5);
        assert_eq!(padded[4], 0);
        assert_eq!(from_words(&padded), x);

        assert_eq!(sig_words(&x), 3);
        assert_eq!(sig_words(&BigUint::zero()), 0);
    }

    #[test]
    fn test_low_zero_bits() {
        assert_eq!(low_zero_bits(&BigUint::zero()), 0);
        assert_eq!(low_zero_bits(&BigUint::one()), 0);
        assert_eq!(low_zero_bits(&(BigUint::one() << 100usize)), 100);
        assert_eq!(low_zero_bits(&BigUint::from(96u32)), 5);
    }

    #[test]
    fn test_get_substring() {
        let x = BigUint::from_str_radix("f0000000000000001", 16).unwrap();
        let words = to_words(&x, 0);
        assert_eq!(get_substring(&words, 0, 2), 1);
        assert_eq!(get_substring(&words, 62, 4), 0b1100);
        assert_eq!(get_substring(&words, 64, 4), 0xf);
        assert_eq!(get_substring(&words, 200, 4), 0);
        assert!(get_bit(&words, 0));
        assert!(!get_bit(&words, 1));
        assert!(get_bit(&words, 67));
    }

    #[test]
    fn test_split_sign() {
        let (neg, mag) = split_sign(&BigInt::from(-42));
        assert!(neg);
        assert_eq!(mag, BigUint::from(42u32));
        let (neg, mag) = split_sign(&BigInt::zero());
        assert!(!neg);
        assert!(mag.is_zero());
    }

    #[test]
    fn test_encode_1363() {
        let x = BigUint::from(0x0102u32);
        assert_eq!(encode_1363(&x, 4).unwrap(), vec![0, 0, 1, 2]);
        assert_eq!(encode_1363(&BigUint::zero(), 3).unwrap(), vec![0, 0, 0]);
        assert!(encode_1363(&x, 1).is_err());
    }

    #[test]
    fn test_from_bytes_with_max_bits() {
        let bytes = [0xAB, 0xCD, 0xEF];
        assert_eq!(from_bytes_with_max_bits(&bytes, 24), BigUint::from(0xABCDEFu32));
        assert_eq!(from_bytes_with_max_bits(&bytes, 32), BigUint::from(0xABCDEFu32));
        assert_eq!(from_bytes_with_max_bits(&bytes, 12), BigUint::from(0xABCu32));
    }

    #[test]
    fn test_random_bits() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        for bits in 1..130 {
            let r = random_bits(&mut rng, bits, true);
            assert_eq!(r.bits(), bits);
            let r = random_bits(&mut rng, bits, false);
            assert!(r.bits() <= bits);
        }
    }

    #[test]
    fn test_random_integer() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let min = BigUint::from(1000u32);
        let max = BigUint::from(1010u32);
        for _ in 0..100 {
            let r = random_integer(&mut rng, &min, &max).unwrap();
            assert!(r >= min && r < max);
        }
        assert!(random_integer(&mut rng, &max, &min).is_err());
        assert!(random_integer(&mut rng, &max, &max).is_err());
    }
}
