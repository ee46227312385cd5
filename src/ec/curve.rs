//! Short Weierstrass curves over prime fields.

use alloc::sync::Arc;
use core::fmt;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::errors::{Error, Result};
use crate::math::bigint::sig_words;
use crate::math::numthry::ct_inverse_mod_odd_modulus;
use crate::math::reducer::ModularReducer;

struct CurveData {
    p: BigUint,
    a: BigUint,
    b: BigUint,
    reducer: ModularReducer,
    p_bits: usize,
    p_words: usize,
}

/// The curve `y² = x³ + ax + b` over `GF(p)`.
///
/// Cloning shares the parameters, so every point holding a handle keeps its
/// curve alive.
#[derive(Clone)]
pub struct CurveGFp {
    inner: Arc<CurveData>,
}

impl CurveGFp {
    /// Creates a curve from its field prime and coefficients.
    pub fn new(p: BigUint, a: BigUint, b: BigUint) -> Result<Self> {
        if p <= BigUint::from(3u32) || p.is_even() {
            return Err(Error::invalid_argument("CurveGFp: invalid p"));
        }
        if a >= p || b >= p {
            return Err(Error::invalid_argument("CurveGFp: a and b must be less than p"));
        }

        let reducer = ModularReducer::new(&p)?;
        let p_bits = p.bits();
        let p_words = sig_words(&p);

        Ok(CurveGFp {
            inner: Arc::new(CurveData {
                p,
                a,
                b,
                reducer,
                p_bits,
                p_words,
            }),
        })
    }

    /// Field prime.
    pub fn p(&self) -> &BigUint {
        &self.inner.p
    }

    /// Coefficient `a`.
    pub fn a(&self) -> &BigUint {
        &self.inner.a
    }

    /// Coefficient `b`.
    pub fn b(&self) -> &BigUint {
        &self.inner.b
    }

    /// Bit length of `p`.
    pub fn p_bits(&self) -> usize {
        self.inner.p_bits
    }

    /// Byte length of `p`.
    pub fn p_bytes(&self) -> usize {
        self.inner.p_bits.div_ceil(8)
    }

    /// Word length of `p`.
    pub fn p_words(&self) -> usize {
        self.inner.p_words
    }

    /// True if both handles refer to the same parameter block.
    pub fn ptr_eq(&self, other: &CurveGFp) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn reduce(&self, x: &BigUint) -> BigUint {
        self.inner.reducer.reduce(x)
    }

    pub(crate) fn add(&self, x: &BigUint, y: &BigUint) -> BigUint {
        let s = x + y;
        if s >= self.inner.p {
            s - &self.inner.p
        } else {
            s
        }
    }

    pub(crate) fn sub(&self, x: &BigUint, y: &BigUint) -> BigUint {
        if x >= y {
            x - y
        } else {
            &self.inner.p - (y - x)
        }
    }

    pub(crate) fn neg(&self, x: &BigUint) -> BigUint {
        if x.is_zero() {
            BigUint::zero()
        } else {
            &self.inner.p - x
        }
    }

    pub(crate) fn mul(&self, x: &BigUint, y: &BigUint) -> BigUint {
        self.inner.reducer.multiply(x, y)
    }

    pub(crate) fn sqr(&self, x: &BigUint) -> BigUint {
        self.inner.reducer.square(x)
    }

    pub(crate) fn mul_small(&self, x: &BigUint, n: u32) -> BigUint {
        self.reduce(&(x * BigUint::from(n)))
    }

    /// Field inversion; zero has no inverse.
    pub(crate) fn inv(&self, x: &BigUint) -> Result<BigUint> {
        let x = self.reduce(x);
        if x.is_zero() {
            return Err(Error::invalid_argument("CurveGFp: cannot invert zero"));
        }
        ct_inverse_mod_odd_modulus(&x, &self.inner.p)
    }

    /// Right hand side of the curve equation, `x³ + ax + b`.
    pub(crate) fn rhs(&self, x: &BigUint) -> BigUint {
        let x3 = self.mul(&self.sqr(x), x);
        let ax = self.mul(&self.inner.a, x);
        self.add(&self.add(&x3, &ax), &self.inner.b)
    }
}

impl PartialEq for CurveGFp {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.inner.p == other.inner.p
                && self.inner.a == other.inner.a
                && self.inner.b == other.inner.b)
    }
}

impl Eq for CurveGFp {}

impl fmt::Debug for CurveGFp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurveGFp")
            .field("p", &self.inner.p)
            .field("a", &self.inner.a)
            .field("b", &self.inner.b)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> CurveGFp {
        // y² = x³ + 2x + 3 over GF(97)
        CurveGFp::new(BigUint::from(97u32), BigUint::from(2u32), BigUint::from(3u32)).unwrap()
    }

    #[test]
    fn test_field_ops() {
        let c = toy();
        let x = BigUint::from(50u32);
        let y = BigUint::from(60u32);
        assert_eq!(c.add(&x, &y), BigUint::from(13u32));
        assert_eq!(c.sub(&x, &y), BigUint::from(87u32));
        assert_eq!(c.mul(&x, &y), BigUint::from(3000u32 % 97));
        assert_eq!(c.neg(&BigUint::zero()), BigUint::zero());
        let inv = c.inv(&x).unwrap();
        assert_eq!(c.mul(&inv, &x), BigUint::one());
        assert!(c.inv(&BigUint::zero()).is_err());
        assert_eq!(c.p_bytes(), 1);
    }

    #[test]
    fn test_invalid_params() {
        assert!(CurveGFp::new(BigUint::from(96u32), BigUint::zero(), BigUint::one()).is_err());
        assert!(CurveGFp::new(BigUint::from(97u32), BigUint::from(97u32), BigUint::one()).is_err());
    }

    #[test]
    fn test_shared_handle() {
        let c = toy();
        let d = c.clone();
        assert!(c.ptr_eq(&d));
        assert_eq!(c, d);
        assert_eq!(c, toy());
        assert!(!c.ptr_eq(&toy()));
    }
}
