//! Number theoretic functions: gcd, modular inversion, exponentiation and
//! square roots.

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

use super::bigint::{low_zero_bits, sig_words, split_sign, to_signed, to_words, from_words, Word};
use super::ct;
use super::pow_mod::PowerMod;
use super::reducer::ModularReducer;
use crate::errors::{Error, Result};

/// Greatest common divisor of `|a|` and `|b|`, by the binary algorithm.
///
/// Returns zero if either input is zero.
pub fn gcd(a: &BigInt, b: &BigInt) -> BigInt {
    to_signed(gcd_uint(&split_sign(a).1, &split_sign(b).1))
}

pub(crate) fn gcd_uint(a: &BigUint, b: &BigUint) -> BigUint {
    if a.is_zero() || b.is_zero() {
        return BigUint::zero();
    }
    if a.is_one() || b.is_one() {
        return BigUint::one();
    }

    let mut x = a.clone();
    let mut y = b.clone();

    let shift = low_zero_bits(&x).min(low_zero_bits(&y));
    x >>= shift;
    y >>= shift;

    while !x.is_zero() {
        x >>= low_zero_bits(&x);
        y >>= low_zero_bits(&y);

        if x >= y {
            x -= &y;
            x >>= 1usize;
        } else {
            y -= &x;
            y >>= 1usize;
        }
    }

    y << shift
}

/// Least common multiple of `|a|` and `|b|`; zero if either is zero.
pub fn lcm(a: &BigInt, b: &BigInt) -> BigInt {
    let (_, a) = split_sign(a);
    let (_, b) = split_sign(b);
    if a.is_zero() || b.is_zero() {
        return BigInt::zero();
    }
    to_signed((&a * &b) / gcd_uint(&a, &b))
}

/// Modular inverse of `n` modulo `modulus`, or zero if none exists.
///
/// Odd moduli with `n < modulus` go through the constant-time algorithm.
/// Every other input falls back to [`inverse_euclid`], whose running time
/// depends on the operands.
pub fn inverse_mod(n: &BigInt, modulus: &BigInt) -> Result<BigInt> {
    if modulus.is_zero() {
        return Err(Error::DivideByZero);
    }
    if modulus.is_negative() || n.is_negative() {
        return Err(Error::invalid_argument(
            "inverse_mod: arguments must be non-negative",
        ));
    }

    inverse_mod_uint(&split_sign(n).1, &split_sign(modulus).1).map(to_signed)
}

pub(crate) fn inverse_mod_uint(n: &BigUint, modulus: &BigUint) -> Result<BigUint> {
    if modulus.is_zero() {
        return Err(Error::DivideByZero);
    }
    if n.is_zero() || (n.is_even() && modulus.is_even()) {
        return Ok(BigUint::zero());
    }

    if modulus.is_odd() && n < modulus {
        return ct_inverse_mod_odd_modulus(n, modulus);
    }

    inverse_euclid(n, modulus)
}

/// Modular inverse by the binary extended Euclidean algorithm.
///
/// Returns zero if no inverse exists. Not constant time.
pub fn inverse_euclid(n: &BigUint, modulus: &BigUint) -> Result<BigUint> {
    if modulus.is_zero() {
        return Err(Error::DivideByZero);
    }
    if n.is_zero() || (n.is_even() && modulus.is_even()) {
        return Ok(BigUint::zero());
    }

    let two = BigInt::from(2);
    let n_s = to_signed(n.clone());
    let mod_s = to_signed(modulus.clone());

    let mut u = modulus.clone();
    let mut v = n.clone();
    let mut a = BigInt::one();
    let mut b = BigInt::zero();
    let mut c = BigInt::zero();
    let mut d = BigInt::one();

    while !u.is_zero() {
        let u_zero_bits = low_zero_bits(&u);
        u >>= u_zero_bits;
        for _ in 0..u_zero_bits {
            if a.is_odd() || b.is_odd() {
                a += &n_s;
                b -= &mod_s;
            }
            a = &a / &two;
            b = &b / &two;
        }

        let v_zero_bits = low_zero_bits(&v);
        v >>= v_zero_bits;
        for _ in 0..v_zero_bits {
            if c.is_odd() || d.is_odd() {
                c += &n_s;
                d -= &mod_s;
            }
            c = &c / &two;
            d = &d / &two;
        }

        if u >= v {
            u -= &v;
            a -= &c;
            b -= &d;
        } else {
            v -= &u;
            c -= &a;
            d -= &b;
        }
    }

    if !v.is_one() {
        return Ok(BigUint::zero());
    }

    Ok(split_sign(&d.mod_floor(&mod_s)).1)
}

/// Constant-time modular inverse for odd moduli (Möller's algorithm).
///
/// Runs a fixed `2 * modulus.bits()` iterations of conditional word-array
/// updates. Returns zero if `n` has no inverse.
pub fn ct_inverse_mod_odd_modulus(n: &BigUint, modulus: &BigUint) -> Result<BigUint> {
    if modulus.is_even() || modulus < &BigUint::from(3u32) {
        return Err(Error::invalid_argument(
            "ct_inverse_mod_odd_modulus: modulus must be odd and at least 3",
        ));
    }
    if n >= modulus {
        return Err(Error::invalid_argument(
            "ct_inverse_mod_odd_modulus: n must be less than the modulus",
        ));
    }

    let k = sig_words(modulus);

    let mp1o2 = to_words(&((modulus + 1u32) >> 1usize), k);
    let mod_words = to_words(modulus, k);

    let mut a = to_words(n, k);
    let mut b = mod_words.clone();
    let mut u = alloc::vec![0 as Word; k];
    let mut v = alloc::vec![0 as Word; k];
    u[0] = 1;

    for _ in 0..(2 * modulus.bits()) {
        let odd = ct::expand_mask(a[0]);

        let underflow = ct::expand_mask(ct::cnd_sub(odd, &mut a, &b));
        ct::cnd_add(underflow, &mut b, &a);
        ct::cnd_abs(underflow, &mut a);
        ct::cnd_swap(underflow, &mut u, &mut v);

        ct::shr1(&mut a);

        let borrow = ct::expand_mask(ct::cnd_sub(odd, &mut u, &v));
        ct::cnd_add(borrow, &mut u, &mod_words);

        let odd_u = ct::expand_mask(u[0]);
        ct::shr1(&mut u);
        ct::cnd_add(odd_u, &mut u, &mp1o2);
    }

    if !from_words(&b).is_one() {
        return Ok(BigUint::zero());
    }

    Ok(from_words(&v))
}

/// `base^exp mod modulus`.
///
/// Returns zero for `modulus <= 1`. A negative base with an odd exponent
/// yields `modulus - r`, reduced so that zero stays zero.
pub fn power_mod(base: &BigInt, exp: &BigUint, modulus: &BigUint) -> BigUint {
    let (negative, base) = split_sign(base);
    let r = power_mod_uint(&base, exp, modulus);

    if negative && exp.is_odd() && !r.is_zero() {
        modulus - r
    } else {
        r
    }
}

/// [`power_mod`] for a non-negative base.
pub(crate) fn power_mod_uint(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> BigUint {
    if modulus <= &BigUint::one() {
        return BigUint::zero();
    }

    if base.is_zero() {
        return if exp.is_zero() {
            BigUint::one()
        } else {
            BigUint::zero()
        };
    }

    match PowerMod::new(modulus) {
        Ok(engine) => engine.exp(base, exp),
        Err(_) => base.modpow(exp, modulus),
    }
}

/// Jacobi symbol `(a / n)` for odd `n > 1`.
pub fn jacobi(a: &BigInt, n: &BigUint) -> Result<i32> {
    if n.is_even() || n < &BigUint::from(2u32) {
        return Err(Error::invalid_argument(
            "jacobi: second argument must be odd and > 1",
        ));
    }

    let mut x = split_sign(&a.mod_floor(&to_signed(n.clone()))).1;
    let mut y = n.clone();
    let mut j = 1i32;

    while y > BigUint::one() {
        x %= &y;
        if x > (&y >> 1usize) {
            x = &y - &x;
            if mod_small(&y, 4) == 3 {
                j = -j;
            }
        }
        if x.is_zero() {
            return Ok(0);
        }

        let shifts = low_zero_bits(&x);
        x >>= shifts;
        if shifts % 2 == 1 {
            let y_mod_8 = mod_small(&y, 8);
            if y_mod_8 == 3 || y_mod_8 == 5 {
                j = -j;
            }
        }

        if mod_small(&x, 4) == 3 && mod_small(&y, 4) == 3 {
            j = -j;
        }
        core::mem::swap(&mut x, &mut y);
    }

    Ok(j)
}

/// Integer square root of `c` if `c` is a perfect square, by Newton's method.
pub fn is_perfect_square(c: &BigUint) -> Result<Option<BigUint>> {
    if c.is_zero() {
        return Err(Error::invalid_argument(
            "is_perfect_square requires c >= 1",
        ));
    }
    if c.is_one() {
        return Ok(Some(BigUint::one()));
    }

    let m = (c.bits() + 1) / 2;
    let bound = c + (BigUint::one() << m);
    let mut x = (BigUint::one() << m) - 1u32;
    let mut x2 = &x * &x;

    loop {
        x = (&x2 + c) / (&x << 1usize);
        x2 = &x * &x;
        if x2 < bound {
            break;
        }
    }

    Ok(if &x2 == c { Some(x) } else { None })
}

/// Square root of `a` modulo the odd prime `p` (Tonelli-Shanks).
///
/// Returns `None` if `a` is not a quadratic residue.
pub fn ressol(a: &BigUint, p: &BigUint) -> Result<Option<BigUint>> {
    if p <= &BigUint::one() || p.is_even() {
        return Err(Error::invalid_argument("ressol: invalid prime"));
    }
    if a.is_zero() {
        return Ok(Some(BigUint::zero()));
    }
    if a >= p {
        return Err(Error::invalid_argument(
            "ressol: value to solve for must be less than p",
        ));
    }

    if jacobi(&to_signed(a.clone()), p)? != 1 {
        return Ok(None);
    }

    let a_s = to_signed(a.clone());
    if mod_small(p, 4) == 3 {
        return Ok(Some(power_mod(&a_s, &((p + 1u32) >> 2usize), p)));
    }

    let mut s = low_zero_bits(&(p - 1u32));
    let mut q = p >> s;
    q -= 1u32;
    q >>= 1usize;

    let mod_p = ModularReducer::new(p)?;

    let mut r = power_mod(&a_s, &q, p);
    let mut n = mod_p.multiply(a, &mod_p.square(&r));
    r = mod_p.multiply(&r, a);

    if n.is_one() {
        return Ok(Some(r));
    }

    // smallest quadratic non-residue
    let mut z = BigUint::from(2u32);
    while jacobi(&to_signed(z.clone()), p)? == 1 {
        z += 1u32;
        if &z >= p {
            return Ok(None);
        }
    }

    let mut c = power_mod(&to_signed(z), &((q << 1usize) + 1u32), p);

    while n > BigUint::one() {
        let mut t = n.clone();
        let mut i = 0;
        while !t.is_one() {
            t = mod_p.square(&t);
            i += 1;
            if i >= s {
                return Ok(None);
            }
        }

        c = power_mod(&to_signed(c), &(BigUint::one() << (s - i - 1)), p);
        r = mod_p.multiply(&r, &c);
        c = mod_p.square(&c);
        n = mod_p.multiply(&n, &c);
        s = i;
    }

    Ok(Some(r))
}

/// `x mod m` for a small power-of-two or word-sized `m`.
pub(crate) fn mod_small(x: &BigUint, m: Word) -> Word {
    let r = x % BigUint::from(m);
    to_words(&r, 1)[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Num;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    use crate::math::bigint::random_bits;

    fn int(x: i64) -> BigInt {
        BigInt::from(x)
    }

    fn uint(x: u64) -> BigUint {
        BigUint::from(x)
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(&int(0), &int(5)), int(0));
        assert_eq!(gcd(&int(5), &int(0)), int(0));
        assert_eq!(gcd(&int(1), &int(12)), int(1));
        assert_eq!(gcd(&int(12), &int(18)), int(6));
        assert_eq!(gcd(&int(-12), &int(18)), int(6));
        assert_eq!(gcd(&int(1 << 20), &int(3 << 12)), int(1 << 12));
        assert_eq!(gcd(&int(17), &int(31)), int(1));
        assert_eq!(lcm(&int(4), &int(6)), int(12));
        assert_eq!(lcm(&int(0), &int(6)), int(0));
    }

    #[test]
    fn test_gcd_random() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        for _ in 0..50 {
            let a = random_bits(&mut rng, 200, false);
            let b = random_bits(&mut rng, 150, false);
            let g = gcd_uint(&a, &b);
            assert_eq!(g, a.gcd(&b));
        }
    }

    #[test]
    fn test_inverse_mod_contract() {
        assert_eq!(inverse_mod(&int(3), &int(0)), Err(Error::DivideByZero));
        assert!(matches!(
            inverse_mod(&int(-3), &int(7)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            inverse_mod(&int(3), &int(-7)),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(inverse_mod(&int(0), &int(7)).unwrap(), int(0));
        assert_eq!(inverse_mod(&int(4), &int(8)).unwrap(), int(0));
        assert_eq!(inverse_mod(&int(3), &int(7)).unwrap(), int(5));
        // n >= mod takes the euclid path
        assert_eq!(inverse_mod(&int(10), &int(7)).unwrap(), int(5));
        // even modulus
        assert_eq!(inverse_mod(&int(3), &int(8)).unwrap(), int(3));
        // no inverse
        assert_eq!(inverse_mod(&int(6), &int(9)).unwrap(), int(0));
    }

    #[test]
    fn test_inverse_paths_agree() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        for bits in [2, 8, 63, 64, 65, 127, 256, 521] {
            let mut m = random_bits(&mut rng, bits, true);
            m |= BigUint::one();
            if m < uint(3) {
                continue;
            }
            for _ in 0..8 {
                let n = random_bits(&mut rng, bits, false) % &m;
                let ct = ct_inverse_mod_odd_modulus(&n, &m).unwrap();
                let eu = inverse_euclid(&n, &m).unwrap();
                assert_eq!(ct, eu, "n = {}, m = {}", n, m);
                if !ct.is_zero() {
                    assert!(((&ct * &n) % &m).is_one());
                }
            }
        }
    }

    #[test]
    fn test_ct_inverse_rejects() {
        assert!(ct_inverse_mod_odd_modulus(&uint(3), &uint(8)).is_err());
        assert!(ct_inverse_mod_odd_modulus(&uint(0), &uint(1)).is_err());
        assert!(ct_inverse_mod_odd_modulus(&uint(9), &uint(7)).is_err());
    }

    #[test]
    fn test_power_mod() {
        let m = uint(1_000_003);
        assert!(power_mod(&int(5), &uint(3), &uint(1)).is_zero());
        assert_eq!(power_mod(&int(0), &uint(0), &m), uint(1));
        assert!(power_mod(&int(0), &uint(5), &m).is_zero());
        assert_eq!(power_mod(&int(2), &uint(10), &m), uint(1024));
        assert_eq!(power_mod(&int(-2), &uint(3), &m), &m - uint(8));
        assert_eq!(power_mod(&int(-2), &uint(4), &m), uint(16));
        assert!(power_mod(&int(-6), &uint(3), &uint(6)).is_zero());
        assert_eq!(power_mod(&int(3), &uint(5), &uint(16)), uint(243 % 16));
    }

    #[test]
    fn test_jacobi() {
        assert!(jacobi(&int(3), &uint(8)).is_err());
        assert!(jacobi(&int(3), &uint(1)).is_err());
        assert_eq!(jacobi(&int(1001), &uint(9907)).unwrap(), -1);
        assert_eq!(jacobi(&int(19), &uint(45)).unwrap(), 1);
        assert_eq!(jacobi(&int(8), &uint(21)).unwrap(), -1);
        assert_eq!(jacobi(&int(5), &uint(21)).unwrap(), 1);
        assert_eq!(jacobi(&int(3), &uint(9)).unwrap(), 0);
        assert_eq!(jacobi(&int(-1), &uint(7)).unwrap(), -1);
        assert_eq!(jacobi(&int(-1), &uint(5)).unwrap(), 1);
    }

    #[test]
    fn test_is_perfect_square() {
        assert!(is_perfect_square(&uint(0)).is_err());
        assert_eq!(is_perfect_square(&uint(1)).unwrap(), Some(uint(1)));
        assert_eq!(is_perfect_square(&uint(144)).unwrap(), Some(uint(12)));
        assert_eq!(is_perfect_square(&uint(145)).unwrap(), None);
        let big = BigUint::from_str_radix("123456789abcdef0123456789", 16).unwrap();
        assert_eq!(is_perfect_square(&(&big * &big)).unwrap(), Some(big.clone()));
        assert_eq!(is_perfect_square(&(&big * &big + 1u32)).unwrap(), None);
    }

    #[test]
    fn test_ressol() {
        // p = 3 mod 4
        let p = uint(1_000_003);
        let root = ressol(&uint(4), &p).unwrap().unwrap();
        assert_eq!((&root * &root) % &p, uint(4));

        // p = 1 mod 4 exercises the full Tonelli-Shanks loop
        let p = uint(998_244_353);
        for a in [2u64, 3, 10, 12345] {
            match ressol(&uint(a), &p).unwrap() {
                Some(r) => assert_eq!((&r * &r) % &p, uint(a)),
                None => assert_eq!(jacobi(&int(a as i64), &p).unwrap(), -1),
            }
        }

        assert_eq!(ressol(&uint(0), &p).unwrap(), Some(uint(0)));
        assert!(ressol(&p, &p).is_err());
        assert!(ressol(&uint(2), &uint(10)).is_err());
    }
}
