//! RSA prime generation.

use num_bigint::BigUint;
use num_integer::Integer;
use rand_core::CryptoRngCore;

use crate::errors::{Error, Result};
use crate::math::primality::random_prime;

/// Smallest modulus [`generate_rsa_primes`] agrees to build.
pub(crate) const MIN_RSA_MODULUS_BITS: usize = 512;

/// Generates the two prime factors of a `bit_size`-bit RSA modulus with
/// public exponent `exp`.
///
/// Each prime is generated with its top two bits set, so the product
/// nearly always has the requested size. `gcd(p - 1, exp) == 1` holds for
/// both primes, which makes `exp` invertible modulo `lcm(p - 1, q - 1)`.
pub(crate) fn generate_rsa_primes<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    bit_size: usize,
    exp: &BigUint,
) -> Result<(BigUint, BigUint)> {
    if bit_size < MIN_RSA_MODULUS_BITS {
        return Err(Error::invalid_argument(alloc::format!(
            "RSA: can't make a key that is only {} bits long",
            bit_size
        )));
    }
    if exp < &BigUint::from(3u32) || exp.is_even() {
        return Err(Error::invalid_argument("RSA: invalid encryption exponent"));
    }

    let p_bits = (bit_size + 1) / 2;
    let q_bits = bit_size - p_bits;

    let mut attempts = 0usize;
    loop {
        let p = random_prime(rng, p_bits, exp, 1, 2, 128)?;
        let q = random_prime(rng, q_bits, exp, 1, 2, 128)?;

        // distinct primes whose product has exactly `bit_size` bits
        if p != q && (&p * &q).bits() == bit_size {
            return Ok((p, q));
        }

        attempts += 1;
        log::trace!("RSA key generation: retrying after {} attempts", attempts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::primality::is_prime;
    use num_traits::{One, Zero};
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    const EXP: u64 = 65537;

    #[test]
    fn test_impossible_keys() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let exp = BigUint::from(EXP);

        for i in [0, 16, 64, 511] {
            assert!(generate_rsa_primes(&mut rng, i, &exp).is_err());
        }
        assert!(generate_rsa_primes(&mut rng, 1024, &BigUint::from(4u32)).is_err());
        assert!(generate_rsa_primes(&mut rng, 1024, &BigUint::one()).is_err());
    }

    #[test]
    fn test_generated_primes() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let exp = BigUint::from(EXP);

        for bits in [512, 513, 768] {
            let (p, q) = generate_rsa_primes(&mut rng, bits, &exp).unwrap();
            assert_eq!((&p * &q).bits(), bits);
            assert_ne!(p, q);
            assert!(is_prime(&p, None, 64, false));
            assert!(is_prime(&q, None, 64, false));
            assert!(!((&p - BigUint::one()) % &exp).is_zero());
        }
    }
}
