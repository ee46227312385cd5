//! Barrett modular reduction bound to a single modulus.

use alloc::vec::Vec;

use num_bigint::BigUint;
use num_traits::{One, Zero};

use super::bigint::{from_words, sig_words, to_words, Word, WORD_BITS};
use super::ct;
use crate::errors::{Error, Result};

/// Reduces integers modulo a fixed `m` using a precomputed Barrett constant.
///
/// Inputs below `m²` take the Barrett path, whose final correction is a
/// fixed pair of masked subtractions. Anything larger falls back to a plain
/// division, which leaks the size of the input. A reducer is bound to its
/// modulus for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModularReducer {
    modulus: BigUint,
    modulus_2: BigUint,
    mu: BigUint,
    mod_words: usize,
    // modulus as mod_words + 1 little-endian words
    modulus_words: Vec<Word>,
}

impl ModularReducer {
    /// Builds a reducer for `m`.
    pub fn new(m: &BigUint) -> Result<Self> {
        if m.is_zero() {
            return Err(Error::DivideByZero);
        }

        let mod_words = sig_words(m);
        let mu = (BigUint::one() << (2 * WORD_BITS * mod_words)) / m;

        Ok(ModularReducer {
            modulus: m.clone(),
            modulus_2: m * m,
            mu,
            mod_words,
            modulus_words: to_words(m, mod_words + 1),
        })
    }

    /// The modulus this reducer is bound to.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// `x mod m`.
    pub fn reduce(&self, x: &BigUint) -> BigUint {
        if x >= &self.modulus_2 {
            return x % &self.modulus;
        }

        let k = self.mod_words;
        let q = ((x >> (WORD_BITS * (k - 1))) * &self.mu) >> (WORD_BITS * (k + 1));
        let r = x - q * &self.modulus;

        // the estimate is short by at most two multiples, so r < 3m
        let mut r_words = to_words(&r, k + 1);
        let mut trial = alloc::vec![0 as Word; k + 1];
        for _ in 0..2 {
            trial.copy_from_slice(&r_words);
            let borrow = ct::cnd_sub(Word::MAX, &mut trial, &self.modulus_words);
            ct::cnd_assign(ct::is_zero(borrow), &mut r_words, &trial);
        }
        from_words(&r_words)
    }

    /// `x * y mod m`.
    pub fn multiply(&self, x: &BigUint, y: &BigUint) -> BigUint {
        self.reduce(&(x * y))
    }

    /// `x² mod m`.
    pub fn square(&self, x: &BigUint) -> BigUint {
        self.reduce(&(x * x))
    }

    /// `x³ mod m`.
    pub fn cube(&self, x: &BigUint) -> BigUint {
        self.multiply(x, &self.square(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Num;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    use crate::math::bigint::random_bits;

    #[test]
    fn test_zero_modulus() {
        assert_eq!(
            ModularReducer::new(&BigUint::zero()),
            Err(Error::DivideByZero)
        );
    }

    #[test]
    fn test_reduce_matches_rem() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let m = BigUint::from_str_radix(
            "ffffffff00000001000000000000000000000000ffffffffffffffffffffffff",
            16,
        )
        .unwrap();
        let r = ModularReducer::new(&m).unwrap();

        for bits in [1, 100, 255, 256, 400, 511, 512, 700] {
            let x = random_bits(&mut rng, bits, true);
            assert_eq!(r.reduce(&x), &x % &m, "bits = {}", bits);
        }

        let a = random_bits(&mut rng, 250, false);
        let b = random_bits(&mut rng, 250, false);
        assert_eq!(r.multiply(&a, &b), (&a * &b) % &m);
        assert_eq!(r.square(&a), (&a * &a) % &m);
        assert_eq!(r.cube(&a), (&a * &a * &a) % &m);
    }

    #[test]
    fn test_reduce_edges() {
        for m in [
            BigUint::from(0xffff_ffff_ffff_ffc5u64),
            BigUint::from_str_radix(
                "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141",
                16,
            )
            .unwrap(),
            (BigUint::one() << 255) + 19u32,
        ] {
            let r = ModularReducer::new(&m).unwrap();
            let m2 = &m * &m;
            let edges = [
                BigUint::zero(),
                &m - 1u32,
                m.clone(),
                &m * 2u32 - 1u32,
                &m * 2u32,
                &m * 3u32 - 1u32,
                &m2 - &m,
                &m2 - 1u32,
                m2.clone(),
                &m2 + 1u32,
            ];
            for x in &edges {
                assert_eq!(r.reduce(x), x % &m, "m = {:x}, x = {:x}", m, x);
            }
        }
    }

    #[test]
    fn test_small_modulus() {
        let m = BigUint::from(7u32);
        let r = ModularReducer::new(&m).unwrap();
        for x in 0u32..200 {
            assert_eq!(r.reduce(&BigUint::from(x)), BigUint::from(x % 7));
        }
        assert_eq!(r.modulus(), &m);
    }
}
