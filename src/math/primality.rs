//! Primality testing and prime generation.

use alloc::vec::Vec;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use rand_core::CryptoRngCore;

use super::bigint::{low_zero_bits, magnitude, random_bits, random_integer, to_signed, Word};
use super::numthry::{gcd_uint, is_perfect_square, jacobi, mod_small};
use super::pow_mod::PowerMod;
use super::primes::{PRIMES, PRIME_TABLE_SIZE};
use super::reducer::ModularReducer;
use crate::errors::{Error, Result};

/// Number of Miller-Rabin rounds for an error probability of `2^-prob`.
///
/// For random inputs the worst case bound is far from the average case, so
/// fewer rounds are needed as the bit length grows.
pub fn miller_rabin_test_iterations(n_bits: usize, prob: usize, random: bool) -> usize {
    let base = (prob + 2) / 2;

    if !random || prob > 128 {
        return base;
    }

    match n_bits {
        b if b >= 1536 => 4,
        b if b >= 1024 => 6,
        b if b >= 512 => 12,
        b if b >= 256 => 29,
        _ => base,
    }
}

struct PrimeContext {
    n: BigUint,
    n_minus_1: BigUint,
    reducer: ModularReducer,
    powm: PowerMod,
}

impl PrimeContext {
    fn new(n: &BigUint) -> Result<Self> {
        Ok(PrimeContext {
            n: n.clone(),
            n_minus_1: n - 1u32,
            reducer: ModularReducer::new(n)?,
            powm: PowerMod::new(n)?,
        })
    }

    fn passes_miller_rabin(&self, a: &BigUint) -> bool {
        let s = low_zero_bits(&self.n_minus_1);
        let nm1_s = &self.n_minus_1 >> s;

        let mut y = self.powm.exp(a, &nm1_s);
        if y.is_one() || y == self.n_minus_1 {
            return true;
        }

        for _ in 1..s {
            y = self.reducer.square(&y);
            if y.is_one() {
                return false;
            }
            if y == self.n_minus_1 {
                return true;
            }
        }

        false
    }

    fn miller_rabin<R: CryptoRngCore + ?Sized>(&self, rng: &mut R, rounds: usize) -> bool {
        let two = BigUint::from(2u32);
        for _ in 0..rounds {
            let a = match random_integer(rng, &two, &self.n_minus_1) {
                Ok(a) => a,
                Err(_) => return false,
            };
            if !self.passes_miller_rabin(&a) {
                return false;
            }
        }
        true
    }

    fn lucas(&self) -> bool {
        let c = &self.n;

        if c <= &BigUint::one() {
            return false;
        }
        if let Some(small) = c.to_u64() {
            if [2, 3, 5, 7, 11, 13].contains(&small) {
                return true;
            }
        }
        if c.is_even() {
            return false;
        }

        let two = BigInt::from(2);
        let mut d = BigInt::from(5);
        loop {
            match jacobi(&d, c) {
                Ok(0) | Err(_) => return false,
                Ok(-1) => break,
                Ok(_) => {}
            }

            // 5, -7, 9, -11, 13, ...
            d = if d.is_negative() { -d + &two } else { -(d + &two) };

            if d == BigInt::from(17) && matches!(is_perfect_square(c), Ok(Some(_))) {
                return false;
            }
        }

        let c_s = to_signed(c.clone());
        let d_mod = magnitude(&d.mod_floor(&c_s));

        let half = |x: BigUint| -> BigUint {
            if x.is_odd() {
                (x + c) >> 1usize
            } else {
                x >> 1usize
            }
        };

        let k = c + 1u32;
        let k_bits = k.bits() - 1;

        let mut u = BigUint::one();
        let mut v = BigUint::one();

        for i in 0..k_bits {
            let k_bit = (&k >> (k_bits - 1 - i)).is_odd();

            let ut = self.reducer.multiply(&u, &v);
            let vt = self.reducer.reduce(
                &(self.reducer.square(&v) + self.reducer.multiply(&d_mod, &self.reducer.square(&u))),
            );
            let vt = self.reducer.reduce(&half(vt));

            let u2 = half(self.reducer.reduce(&(&ut + &vt)));
            let v2 = half(self.reducer.reduce(&(&vt + self.reducer.multiply(&ut, &d_mod))));

            if k_bit {
                u = u2;
                v = v2;
            } else {
                u = ut;
                v = vt;
            }
        }

        u.is_zero()
    }

    fn bailie_psw(&self) -> bool {
        self.passes_miller_rabin(&BigUint::from(2u32)) && self.lucas()
    }
}

/// Lucas probable prime test with Selfridge parameters.
pub fn is_lucas_probable_prime(n: &BigUint) -> bool {
    if n <= &BigUint::one() {
        return false;
    }
    match PrimeContext::new(n) {
        Ok(ctx) => ctx.lucas(),
        Err(_) => false,
    }
}

/// Baillie-PSW: a base-2 Miller-Rabin test followed by the Lucas test.
pub fn is_bailie_psw_probable_prime(n: &BigUint) -> bool {
    if n <= &BigUint::from(3u32) {
        return n > &BigUint::one();
    }
    if n.is_even() {
        return false;
    }
    match PrimeContext::new(n) {
        Ok(ctx) => ctx.bailie_psw(),
        Err(_) => false,
    }
}

/// `rounds` Miller-Rabin tests with random bases.
pub fn is_miller_rabin_probable_prime<R: CryptoRngCore + ?Sized>(
    n: &BigUint,
    rng: &mut R,
    rounds: usize,
) -> bool {
    if n <= &BigUint::from(3u32) {
        return n > &BigUint::one();
    }
    if n.is_even() {
        return false;
    }
    match PrimeContext::new(n) {
        Ok(ctx) => ctx.miller_rabin(rng, rounds),
        Err(_) => false,
    }
}

/// Probabilistic primality test with error probability at most `2^-prob`.
///
/// Numbers of up to 16 bits are looked up in the small prime table. With an
/// RNG, Miller-Rabin with random bases is used, followed by a Lucas test
/// unless `is_random` says `n` was chosen at random. Without an RNG the
/// deterministic Baillie-PSW test is used.
pub fn is_prime(
    n: &BigUint,
    rng: Option<&mut dyn CryptoRngCore>,
    prob: usize,
    is_random: bool,
) -> bool {
    is_prime_with(n, rng, prob, is_random)
}

pub(crate) fn is_prime_with<R: CryptoRngCore + ?Sized>(
    n: &BigUint,
    rng: Option<&mut R>,
    prob: usize,
    is_random: bool,
) -> bool {
    if n == &BigUint::from(2u32) {
        return true;
    }
    if n <= &BigUint::one() || n.is_even() {
        return false;
    }

    let n_bits = n.bits();
    if n_bits <= 16 {
        return n
            .to_u16()
            .is_some_and(|small| PRIMES.binary_search(&small).is_ok());
    }

    let ctx = match PrimeContext::new(n) {
        Ok(ctx) => ctx,
        Err(_) => return false,
    };

    match rng {
        Some(rng) => {
            let t = miller_rabin_test_iterations(n_bits, prob, is_random);
            if !ctx.miller_rabin(rng, t) {
                return false;
            }
            is_random || ctx.lucas()
        }
        None => ctx.bailie_psw(),
    }
}

/// Incremental small-prime sieve that follows a candidate as it is stepped.
struct PrimeSieve {
    sieve: Vec<Word>,
    primes: &'static [u16],
    step: Word,
    check_2p1: bool,
}

impl PrimeSieve {
    fn new(init: &BigUint, sieve_size: usize, step: Word, check_2p1: bool) -> Self {
        let len = sieve_size.min(PRIME_TABLE_SIZE - 1);
        let primes = &PRIMES[1..=len];
        let sieve = primes
            .iter()
            .map(|&p| mod_small(init, p as Word))
            .collect();

        PrimeSieve {
            sieve,
            primes,
            step,
            check_2p1,
        }
    }

    /// Advances by one step. Returns true if the new candidate has no
    /// small factor.
    fn next(&mut self) -> bool {
        let mut passes = true;
        for (residue, &p) in self.sieve.iter_mut().zip(self.primes) {
            let p = p as Word;
            *residue = (*residue + self.step % p) % p;
            passes &= *residue != 0;
            if self.check_2p1 {
                // p % r == (r - 1) / 2 means r divides 2p + 1
                passes &= *residue != (p - 1) / 2;
            }
        }
        passes
    }
}

/// Generates a random prime of exactly `bits` bits with
/// `p ≡ equiv (mod modulo)`.
///
/// If `coprime` is non-zero, `gcd(p - 1, coprime) == 1` is guaranteed as
/// well. For `bits <= 16` only the default `equiv = 1, modulo = 2` without a
/// coprime constraint is supported.
pub fn random_prime<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    bits: usize,
    coprime: &BigUint,
    equiv: Word,
    modulo: Word,
    prob: usize,
) -> Result<BigUint> {
    random_prime_inner(rng, bits, coprime, equiv, modulo, prob, false)
}

fn random_prime_inner<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    bits: usize,
    coprime: &BigUint,
    equiv: Word,
    modulo: Word,
    prob: usize,
    check_2p1: bool,
) -> Result<BigUint> {
    if bits <= 1 {
        return Err(Error::invalid_argument(alloc::format!(
            "random_prime: can't make a prime of {} bits",
            bits
        )));
    }
    if (!coprime.is_zero() && coprime.is_even()) || coprime.bits() >= bits {
        return Err(Error::invalid_argument("random_prime: invalid coprime"));
    }
    if modulo == 0 {
        return Err(Error::invalid_argument("random_prime: invalid modulo value"));
    }
    let equiv = equiv % modulo;
    if equiv == 0 {
        return Err(Error::invalid_argument(
            "random_prime: invalid value for equiv/modulo",
        ));
    }

    if bits <= 16 {
        if equiv != 1 || modulo != 2 || !coprime.is_zero() {
            return Err(Error::invalid_argument(
                "random_prime: equiv/modulo/coprime options not usable for small primes",
            ));
        }
        return Ok(random_small_prime(rng, bits));
    }

    const MAX_ATTEMPTS: usize = 32 * 1024;
    let mr_trials = miller_rabin_test_iterations(bits, prob, true);

    loop {
        let mut p = random_bits(rng, bits, true);
        p |= BigUint::one() << (bits - 2);
        p |= BigUint::one();

        let r = mod_small(&p, modulo);
        p += modulo - r + equiv;

        let mut sieve = PrimeSieve::new(&p, bits, modulo, check_2p1);

        for attempt in 0..=MAX_ATTEMPTS {
            p += modulo;

            if !sieve.next() || p.is_even() {
                continue;
            }

            let ctx = PrimeContext::new(&p)?;

            if coprime > &BigUint::one() {
                // one cheap round before the gcd
                if !ctx.miller_rabin(rng, 1) {
                    continue;
                }
                if !gcd_uint(&(&p - 1u32), coprime).is_one() {
                    continue;
                }
            }

            if p.bits() > bits {
                log::trace!("random_prime: candidate overflowed after {} attempts", attempt);
                break;
            }

            if !ctx.miller_rabin(rng, mr_trials) {
                continue;
            }
            if prob > 32 && !ctx.lucas() {
                continue;
            }

            return Ok(p);
        }
    }
}

fn random_small_prime<R: CryptoRngCore + ?Sized>(rng: &mut R, bits: usize) -> BigUint {
    let coin = rng.next_u32() % 2 == 1;
    let p: u16 = match (bits, coin) {
        (2, true) => 2,
        (2, false) => 3,
        (3, true) => 5,
        (3, false) => 7,
        (4, true) => 11,
        (4, false) => 13,
        _ => loop {
            let idx = rng.next_u32() as usize % PRIME_TABLE_SIZE;
            let candidate = PRIMES[idx];
            if (16 - candidate.leading_zeros()) as usize == bits {
                break candidate;
            }
        },
    };
    BigUint::from(p)
}

/// Generates a safe prime `p = 2q + 1` of `bits` bits, with `q` prime too.
pub fn random_safe_prime<R: CryptoRngCore + ?Sized>(rng: &mut R, bits: usize) -> Result<BigUint> {
    if bits <= 64 {
        return Err(Error::invalid_argument(alloc::format!(
            "random_safe_prime: can't make a prime of {} bits",
            bits
        )));
    }

    const ERROR_BOUND: usize = 128;

    loop {
        // q ≡ 2 (mod 3), otherwise 3 divides 2q + 1
        let q = random_prime_inner(rng, bits - 1, &BigUint::zero(), 2, 3, ERROR_BOUND, true)?;
        let p = (q << 1usize) + 1u32;
        if is_prime_with(&p, Some(&mut *rng), ERROR_BOUND, true) {
            return Ok(p);
        }
        log::trace!("random_safe_prime: 2q + 1 composite, retrying");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Num;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    // 2^255 - 19
    const P25519: &str = "7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffed";

    // RFC 3526 2048-bit MODP group prime, a safe prime
    const MODP_2048: &str = "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
        29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
        EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
        E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
        EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D\
        C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F\
        83655D23DCA3AD961C62F356208552BB9ED529077096966D\
        670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
        E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9\
        DE2BCBF6955817183995497CEA956AE515D2261898FA0510\
        15728E5A8AACAA68FFFFFFFFFFFFFFFF";

    fn hex(s: &str) -> BigUint {
        BigUint::from_str_radix(s, 16).unwrap()
    }

    #[test]
    fn test_mr_iterations() {
        assert_eq!(miller_rabin_test_iterations(100, 128, false), 65);
        assert_eq!(miller_rabin_test_iterations(100, 128, true), 65);
        assert_eq!(miller_rabin_test_iterations(256, 128, true), 29);
        assert_eq!(miller_rabin_test_iterations(512, 128, true), 12);
        assert_eq!(miller_rabin_test_iterations(1024, 128, true), 6);
        assert_eq!(miller_rabin_test_iterations(2048, 128, true), 4);
        assert_eq!(miller_rabin_test_iterations(2048, 256, true), 129);
        assert_eq!(miller_rabin_test_iterations(2048, 64, true), 4);
    }

    #[test]
    fn test_small_primes_table() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        for &p in PRIMES.iter() {
            let p = BigUint::from(p);
            assert!(is_prime(&p, Some(&mut rng), 64, false), "{}", p);
            if p > BigUint::from(3u32) {
                assert!(!is_prime(&(&p - 1u32), Some(&mut rng), 64, false));
                assert!(!is_prime(&(&p + 1u32), None, 64, false));
            }
        }
        assert!(!is_prime(&BigUint::zero(), None, 64, false));
        assert!(!is_prime(&BigUint::one(), None, 64, false));
    }

    #[test]
    fn test_known_primes() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);

        let p = hex(P25519);
        assert!(is_prime(&p, Some(&mut rng), 128, false));
        assert!(is_prime(&p, None, 128, false));
        assert!(!is_prime(&(&p + 2u32), Some(&mut rng), 128, false));

        let modp = hex(MODP_2048);
        assert!(is_prime(&modp, Some(&mut rng), 128, false));
        assert!(is_prime(&((&modp - 1u32) >> 1usize), None, 128, false));

        // 65537 * 65539 has no factor in the table
        let composite = BigUint::from(65537u64 * 65539);
        assert!(!is_prime(&composite, None, 128, false));
        assert!(!is_prime(&composite, Some(&mut rng), 128, false));
    }

    #[test]
    fn test_strong_pseudoprimes() {
        // strong pseudoprime to base 2
        let spsp2 = BigUint::from(3_215_031_751u64);
        assert!(!is_bailie_psw_probable_prime(&spsp2));
        assert!(!is_prime(&spsp2, None, 64, false));

        let carmichael = BigUint::from(512_461u32);
        assert!(!is_prime(&carmichael, None, 64, false));

        // Lucas pseudoprime, caught by the base-2 round
        let lpsp = BigUint::from(75_077u32);
        assert!(is_lucas_probable_prime(&lpsp));
        assert!(!is_bailie_psw_probable_prime(&lpsp));
        assert!(is_lucas_probable_prime(&BigUint::from(1_000_003u32)));
        assert!(!is_lucas_probable_prime(&BigUint::from(1_000_001u32)));
        // a perfect square
        assert!(!is_lucas_probable_prime(&BigUint::from(1_018_081u32)));
    }

    #[test]
    fn test_random_prime() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        for bits in [2, 3, 4, 10, 16, 17, 64, 128] {
            let p = random_prime(&mut rng, bits, &BigUint::zero(), 1, 2, 64).unwrap();
            assert_eq!(p.bits(), bits);
            assert!(is_prime(&p, None, 64, false));
        }

        let e = BigUint::from(65537u32);
        let p = random_prime(&mut rng, 256, &e, 1, 2, 128).unwrap();
        assert_eq!(p.bits(), 256);
        assert!(gcd_uint(&(&p - 1u32), &e).is_one());

        let p = random_prime(&mut rng, 128, &BigUint::zero(), 3, 4, 64).unwrap();
        assert_eq!(mod_small(&p, 4), 3);
    }

    #[test]
    fn test_random_prime_rejects() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let zero = BigUint::zero();
        assert!(random_prime(&mut rng, 1, &zero, 1, 2, 64).is_err());
        assert!(random_prime(&mut rng, 64, &zero, 1, 0, 64).is_err());
        assert!(random_prime(&mut rng, 64, &zero, 4, 2, 64).is_err());
        assert!(random_prime(&mut rng, 64, &BigUint::from(4u32), 1, 2, 64).is_err());
        assert!(random_prime(&mut rng, 12, &zero, 1, 4, 64).is_err());
        assert!(random_safe_prime(&mut rng, 64).is_err());
    }

    #[test]
    fn test_random_safe_prime() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let p = random_safe_prime(&mut rng, 96).unwrap();
        assert_eq!(p.bits(), 96);
        assert!(is_prime(&p, None, 64, false));
        assert!(is_prime(&((&p - 1u32) >> 1usize), None, 64, false));
    }
}
