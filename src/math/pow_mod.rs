//! Fixed-window modular exponentiation.

use alloc::vec::Vec;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};

use super::bigint::{from_words, get_substring, to_words, Word};
use super::ct;
use super::monty::MontgomeryParams;
use super::reducer::ModularReducer;
use crate::errors::{Error, Result};

/// Window width used for an exponent of `exp_bits` bits.
pub fn window_bits(exp_bits: usize) -> usize {
    const WINDOW_BITS_TABLE: [(usize, usize); 5] =
        [(1434, 8), (539, 7), (197, 5), (70, 4), (17, 3)];

    WINDOW_BITS_TABLE
        .iter()
        .find(|(bits, _)| exp_bits >= *bits)
        .map_or(1, |(_, window)| *window)
}

#[derive(Debug, Clone)]
enum Engine {
    Montgomery(MontgomeryParams),
    Barrett(ModularReducer),
}

/// Modular exponentiation bound to a single modulus.
///
/// Odd moduli use Montgomery multiplication; even moduli use Barrett
/// reduction. Both walk the exponent in fixed windows and read the
/// precomputed table by scanning all entries, so the access pattern does not
/// depend on the exponent bits.
#[derive(Debug, Clone)]
pub struct PowerMod {
    engine: Engine,
}

impl PowerMod {
    /// Engine for the modulus `m`.
    pub fn new(m: &BigUint) -> Result<Self> {
        if m.is_zero() {
            return Err(Error::DivideByZero);
        }

        let engine = if m.is_odd() {
            Engine::Montgomery(MontgomeryParams::new(m)?)
        } else {
            Engine::Barrett(ModularReducer::new(m)?)
        };

        Ok(PowerMod { engine })
    }

    /// The modulus.
    pub fn modulus(&self) -> &BigUint {
        match &self.engine {
            Engine::Montgomery(params) => params.p(),
            Engine::Barrett(reducer) => reducer.modulus(),
        }
    }

    /// `base^exp mod m`.
    pub fn exp(&self, base: &BigUint, exp: &BigUint) -> BigUint {
        if self.modulus().is_one() {
            return BigUint::zero();
        }
        if exp.is_zero() {
            return BigUint::one();
        }

        match &self.engine {
            Engine::Montgomery(params) => monty_exp(params, base, exp),
            Engine::Barrett(reducer) => barrett_exp(reducer, base, exp),
        }
    }
}

fn monty_exp(params: &MontgomeryParams, base: &BigUint, exp: &BigUint) -> BigUint {
    let window = window_bits(exp.bits());
    let n = params.p_words();

    let g = params.to_monty(base);
    let mut table: Vec<Vec<Word>> = Vec::with_capacity(1 << window);
    table.push(params.one());
    table.push(g.clone());
    for i in 2..(1usize << window) {
        let next = params.mul(&table[i - 1], &g);
        table.push(next);
    }
    let refs: Vec<&[Word]> = table.iter().map(Vec::as_slice).collect();

    let exp_words = to_words(exp, 0);
    let windows = exp.bits().div_ceil(window);

    let mut x = params.one();
    let mut entry = alloc::vec![0; n];
    for i in (0..windows).rev() {
        for _ in 0..window {
            x = params.sqr(&x);
        }
        let nibble = get_substring(&exp_words, i * window, window);
        ct::lookup(&refs, nibble as usize, &mut entry);
        x = params.mul(&x, &entry);
    }

    params.from_monty(&x)
}

fn barrett_exp(reducer: &ModularReducer, base: &BigUint, exp: &BigUint) -> BigUint {
    let window = window_bits(exp.bits());
    let n = super::bigint::sig_words(reducer.modulus());

    let g = reducer.reduce(base);
    let mut table: Vec<Vec<Word>> = Vec::with_capacity(1 << window);
    let mut acc = BigUint::one();
    for _ in 0..(1usize << window) {
        table.push(to_words(&acc, n));
        acc = reducer.multiply(&acc, &g);
    }
    let refs: Vec<&[Word]> = table.iter().map(Vec::as_slice).collect();

    let exp_words = to_words(exp, 0);
    let windows = exp.bits().div_ceil(window);

    let mut x = BigUint::one();
    let mut entry = alloc::vec![0; n];
    for i in (0..windows).rev() {
        for _ in 0..window {
            x = reducer.square(&x);
        }
        let nibble = get_substring(&exp_words, i * window, window);
        ct::lookup(&refs, nibble as usize, &mut entry);
        x = reducer.multiply(&x, &from_words(&entry));
    }

    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Num;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    use crate::math::bigint::random_bits;

    #[test]
    fn test_window_bits() {
        assert_eq!(window_bits(0), 1);
        assert_eq!(window_bits(16), 1);
        assert_eq!(window_bits(17), 3);
        assert_eq!(window_bits(70), 4);
        assert_eq!(window_bits(196), 4);
        assert_eq!(window_bits(197), 5);
        assert_eq!(window_bits(539), 7);
        assert_eq!(window_bits(1434), 8);
        assert_eq!(window_bits(4096), 8);
    }

    #[test]
    fn test_matches_modpow() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let odd = BigUint::from_str_radix(
            "ffffffffffffffffffffffffffffffff000000000000000000000001",
            16,
        )
        .unwrap();
        let even = &odd + 1u32;

        for m in [odd, even] {
            let pm = PowerMod::new(&m).unwrap();
            for exp_bits in [1, 5, 16, 17, 80, 224, 600] {
                let base = random_bits(&mut rng, 300, false);
                let exp = random_bits(&mut rng, exp_bits, true);
                assert_eq!(pm.exp(&base, &exp), base.modpow(&exp, &m));
            }
            assert_eq!(pm.exp(&BigUint::from(3u32), &BigUint::zero()), BigUint::one());
        }
    }

    #[test]
    fn test_degenerate_moduli() {
        assert!(PowerMod::new(&BigUint::zero()).is_err());
        let pm = PowerMod::new(&BigUint::one()).unwrap();
        assert!(pm.exp(&BigUint::from(5u32), &BigUint::from(3u32)).is_zero());
    }
}
