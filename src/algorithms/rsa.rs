//! Raw RSA primitives.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::errors::{Error, Result};
use crate::math::bigint::random_integer;
use crate::math::numthry::{inverse_mod_uint, power_mod_uint};
use crate::rsa::{RsaPrivateKey, RsaPublicKey};

/// ⚠️ Raw RSA encryption of m with the public key. No padding is performed.
///
/// # ☢️️ WARNING: HAZARDOUS API ☢️
///
/// Use this function with great care! Raw RSA should never be used without
/// an appropriate padding or signature scheme.
#[inline]
pub fn rsa_encrypt(key: &RsaPublicKey, m: &BigUint) -> Result<BigUint> {
    if m >= key.n() {
        return Err(Error::invalid_argument("RSA public op: input is too large"));
    }
    Ok(power_mod_uint(m, key.e(), key.n()))
}

/// ⚠️ Performs raw RSA decryption with no padding or error checking.
///
/// Uses the CRT parameters of the key and blinds the input if an `rng` is
/// passed.
///
/// # ☢️️ WARNING: HAZARDOUS API ☢️
///
/// Use this function with great care! Raw RSA should never be used without
/// an appropriate padding or signature scheme.
pub fn rsa_decrypt(
    rng: Option<&mut dyn CryptoRngCore>,
    priv_key: &RsaPrivateKey,
    c: &BigUint,
) -> Result<BigUint> {
    let n = priv_key.n();
    if c >= n {
        return Err(Error::invalid_argument("RSA private op: input is too large"));
    }

    let (c, unblinder) = match rng {
        Some(rng) => {
            let (blinded, unblinder) = blind(rng, priv_key.public(), c)?;
            (Zeroizing::new(blinded), Some(unblinder))
        }
        None => {
            log::warn!("RSA private operation without blinding: no RNG provided");
            (Zeroizing::new(c.clone()), None)
        }
    };

    let m = crt_private_op(priv_key, &c);

    match unblinder {
        Some(ref ir) => Ok(unblind(priv_key.public(), &m, ir)),
        None => Ok(m),
    }
}

/// `c^d mod n` through the CRT:
/// `m = m2 + q · (qinv · (m1 - m2) mod p)`.
fn crt_private_op(key: &RsaPrivateKey, c: &BigUint) -> BigUint {
    let p = key.p();
    let q = key.q();

    let m1 = Zeroizing::new(power_mod_uint(c, key.dp(), p));
    let m2 = Zeroizing::new(power_mod_uint(c, key.dq(), q));

    // m1 - m2 mod p, without going negative
    let m2_mod_p = Zeroizing::new(&*m2 % p);
    let diff = Zeroizing::new(if *m1 >= *m2_mod_p {
        &*m1 - &*m2_mod_p
    } else {
        &*m1 + p - &*m2_mod_p
    });
    let h = Zeroizing::new((key.qinv() * &*diff) % p);

    &*m2 + &*h * q
}

/// ⚠️ Raw RSA decryption followed by a re-encryption check that catches
/// faults in the CRT computation.
///
/// # ☢️️ WARNING: HAZARDOUS API ☢️
///
/// Use this function with great care! Raw RSA should never be used without
/// an appropriate padding or signature scheme.
pub fn rsa_decrypt_and_check(
    priv_key: &RsaPrivateKey,
    rng: Option<&mut dyn CryptoRngCore>,
    c: &BigUint,
) -> Result<BigUint> {
    let m = rsa_decrypt(rng, priv_key, c)?;

    let check = rsa_encrypt(priv_key.public(), &m)?;

    if c != &check {
        return Err(Error::internal("RSA private op failed consistency check"));
    }

    Ok(m)
}

/// Returns the blinded c, along with the unblinding factor.
///
/// `c · r^e mod n` decrypts to `m · r`, the unblinder is `r⁻¹ mod n`.
fn blind(
    rng: &mut dyn CryptoRngCore,
    key: &RsaPublicKey,
    c: &BigUint,
) -> Result<(BigUint, BigUint)> {
    let n = key.n();
    let (r, unblinder) = loop {
        let r = Zeroizing::new(random_integer(rng, &BigUint::one(), n)?);
        let ir = inverse_mod_uint(&r, n)?;
        if !ir.is_zero() {
            break (r, ir);
        }
    };

    let rpowe = Zeroizing::new(power_mod_uint(&r, key.e(), n));
    let blinded = (c * &*rpowe) % n;

    Ok((blinded, unblinder))
}

/// Given an m and and unblinding factor, unblind the m.
fn unblind(key: &RsaPublicKey, m: &BigUint, unblinder: &BigUint) -> BigUint {
    (m * unblinder) % key.n()
}
