//! Montgomery arithmetic over fixed-length word vectors.

use alloc::vec::Vec;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};

use super::bigint::{from_words, sig_words, to_words, Word, WORD_BITS};
use super::ct;
use crate::errors::{Error, Result};

/// Computes `-a⁻¹ mod 2^64` for odd `a`.
///
/// This is the bitwise algorithm of Koç, which runs in a fixed number of
/// iterations.
pub fn monty_inverse(a: Word) -> Result<Word> {
    if a % 2 == 0 {
        return Err(Error::invalid_argument(
            "monty_inverse only valid for odd integers",
        ));
    }

    let mut b: Word = 1;
    let mut r: Word = 0;

    for _ in 0..WORD_BITS {
        let bi = b & 1;
        r >>= 1;
        r |= bi << (WORD_BITS - 1);
        b = b.wrapping_sub(a.wrapping_mul(bi));
        b >>= 1;
    }

    // r now holds a⁻¹; return its additive inverse
    Ok(r.wrapping_neg())
}

/// Precomputed values for Montgomery multiplication modulo an odd `p`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MontgomeryParams {
    p: BigUint,
    p_words: Vec<Word>,
    p_dash: Word,
    r1: Vec<Word>,
    r2: Vec<Word>,
}

impl MontgomeryParams {
    /// Parameters for the odd modulus `p`.
    pub fn new(p: &BigUint) -> Result<Self> {
        if p.is_zero() {
            return Err(Error::DivideByZero);
        }
        if p.is_even() {
            return Err(Error::invalid_argument(
                "Montgomery arithmetic requires an odd modulus",
            ));
        }

        let n = sig_words(p);
        let p_words = to_words(p, n);
        let p_dash = monty_inverse(p_words[0])?;

        let r1 = (BigUint::one() << (WORD_BITS * n)) % p;
        let r2 = (&r1 * &r1) % p;

        Ok(MontgomeryParams {
            p: p.clone(),
            p_words,
            p_dash,
            r1: to_words(&r1, n),
            r2: to_words(&r2, n),
        })
    }

    /// The modulus.
    pub fn p(&self) -> &BigUint {
        &self.p
    }

    /// Length in words of every value handled by these parameters.
    pub fn p_words(&self) -> usize {
        self.p_words.len()
    }

    /// Montgomery form of one.
    pub fn one(&self) -> Vec<Word> {
        self.r1.clone()
    }

    /// Converts `x` into Montgomery form.
    pub fn to_monty(&self, x: &BigUint) -> Vec<Word> {
        let x = if x >= &self.p { x % &self.p } else { x.clone() };
        self.mul(&to_words(&x, self.p_words()), &self.r2)
    }

    /// Converts `x` out of Montgomery form.
    pub fn from_monty(&self, x: &[Word]) -> BigUint {
        let mut one = alloc::vec![0; self.p_words()];
        one[0] = 1;
        from_words(&self.mul(x, &one))
    }

    /// Montgomery product `x·y·R⁻¹ mod p`.
    ///
    /// Both inputs must be reduced and exactly [`Self::p_words`] long. The
    /// final subtraction is unconditional with a masked result selection.
    pub fn mul(&self, x: &[Word], y: &[Word]) -> Vec<Word> {
        let n = self.p_words();
        debug_assert_eq!(x.len(), n);
        debug_assert_eq!(y.len(), n);

        let p = &self.p_words;
        let mut t = alloc::vec![0 as Word; n + 2];

        for &yi in y.iter() {
            let mut carry: u128 = 0;
            for j in 0..n {
                let s = t[j] as u128 + (x[j] as u128) * (yi as u128) + carry;
                t[j] = s as Word;
                carry = s >> WORD_BITS;
            }
            let s = t[n] as u128 + carry;
            t[n] = s as Word;
            t[n + 1] = (s >> WORD_BITS) as Word;

            let m = t[0].wrapping_mul(self.p_dash);
            let s = t[0] as u128 + (m as u128) * (p[0] as u128);
            let mut carry = s >> WORD_BITS;
            for j in 1..n {
                let s = t[j] as u128 + (m as u128) * (p[j] as u128) + carry;
                t[j - 1] = s as Word;
                carry = s >> WORD_BITS;
            }
            let s = t[n] as u128 + carry;
            t[n - 1] = s as Word;
            t[n] = t[n + 1] + (s >> WORD_BITS) as Word;
        }

        // t < 2p here, reduce once
        let mut z = t[..n + 1].to_vec();
        let mut p_ext = p.clone();
        p_ext.push(0);
        let borrow = ct::cnd_sub(Word::MAX, &mut z, &p_ext);
        let keep_t = ct::expand_mask(borrow);
        ct::cnd_assign(keep_t, &mut z, &t[..n + 1]);

        z.truncate(n);
        z
    }

    /// Montgomery square.
    pub fn sqr(&self, x: &[Word]) -> Vec<Word> {
        self.mul(x, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Num;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    use crate::math::bigint::random_bits;

    #[test]
    fn test_monty_inverse() {
        for a in [1u64, 3, 5, 0xffff_ffff_ffff_ffff, 0x1234_5678_9abc_def1] {
            let inv = monty_inverse(a).unwrap();
            assert_eq!(a.wrapping_mul(inv), Word::MAX, "a = {}", a);
        }
        assert!(monty_inverse(2).is_err());
    }

    #[test]
    fn test_even_modulus_rejected() {
        assert!(MontgomeryParams::new(&BigUint::from(10u32)).is_err());
        assert_eq!(
            MontgomeryParams::new(&BigUint::zero()),
            Err(Error::DivideByZero)
        );
    }

    #[test]
    fn test_mul_matches_schoolbook() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let p = BigUint::from_str_radix(
            "fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f",
            16,
        )
        .unwrap();
        let params = MontgomeryParams::new(&p).unwrap();

        for _ in 0..20 {
            let a = random_bits(&mut rng, 256, false) % &p;
            let b = random_bits(&mut rng, 256, false) % &p;
            let am = params.to_monty(&a);
            let bm = params.to_monty(&b);
            assert_eq!(params.from_monty(&params.mul(&am, &bm)), (&a * &b) % &p);
            assert_eq!(params.from_monty(&params.sqr(&am)), (&a * &a) % &p);
        }

        assert_eq!(params.from_monty(&params.one()), BigUint::one());
    }

    #[test]
    fn test_single_word_modulus() {
        let p = BigUint::from(0xffff_ffff_ffff_ffc5u64);
        let params = MontgomeryParams::new(&p).unwrap();
        let a = BigUint::from(0x1234_5678_9abc_def0u64);
        let b = BigUint::from(0xfedc_ba98_7654_3210u64);
        let prod = params.mul(&params.to_monty(&a), &params.to_monty(&b));
        assert_eq!(params.from_monty(&prod), (&a * &b) % &p);
    }
}
