//! Points in Jacobian projective coordinates.

use alloc::vec::Vec;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand_core::CryptoRngCore;

use super::curve::CurveGFp;
use crate::errors::{Error, Result};
use crate::math::bigint::{encode_1363, random_integer};
use crate::math::numthry::ressol;

/// SEC1 point encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointFormat {
    /// `04 ‖ x ‖ y`
    Uncompressed,
    /// `02|03 ‖ x`
    Compressed,
    /// `06|07 ‖ x ‖ y`
    Hybrid,
}

/// A point `(X : Y : Z)` standing for the affine `(X/Z², Y/Z³)`.
///
/// The point at infinity has `Z == 0`. Coordinates are always reduced
/// modulo `p`.
#[derive(Clone, Debug)]
pub struct PointGFp {
    curve: CurveGFp,
    x: BigUint,
    y: BigUint,
    z: BigUint,
}

impl PointGFp {
    /// The point at infinity on `curve`.
    pub fn zero(curve: &CurveGFp) -> Self {
        PointGFp {
            curve: curve.clone(),
            x: BigUint::zero(),
            y: BigUint::one(),
            z: BigUint::zero(),
        }
    }

    /// A point from affine coordinates. Curve membership is not checked.
    pub fn from_affine(curve: &CurveGFp, x: BigUint, y: BigUint) -> Result<Self> {
        if &x >= curve.p() || &y >= curve.p() {
            return Err(Error::invalid_argument("PointGFp: affine coordinate too large"));
        }

        Ok(PointGFp {
            curve: curve.clone(),
            x,
            y,
            z: BigUint::one(),
        })
    }

    pub(crate) fn from_jacobian(curve: &CurveGFp, x: BigUint, y: BigUint, z: BigUint) -> Self {
        PointGFp {
            curve: curve.clone(),
            x: curve.reduce(&x),
            y: curve.reduce(&y),
            z: curve.reduce(&z),
        }
    }

    /// The curve this point lies on.
    pub fn curve(&self) -> &CurveGFp {
        &self.curve
    }

    /// The infinity point on the same curve.
    pub fn zero_of(&self) -> Self {
        Self::zero(&self.curve)
    }

    /// True for the point at infinity.
    pub fn is_zero(&self) -> bool {
        self.z.is_zero()
    }

    pub(crate) fn x(&self) -> &BigUint {
        &self.x
    }

    pub(crate) fn y(&self) -> &BigUint {
        &self.y
    }

    pub(crate) fn z(&self) -> &BigUint {
        &self.z
    }

    /// `2·self`.
    pub fn double(&self) -> Self {
        if self.is_zero() {
            return self.clone();
        }

        let c = &self.curve;

        // dbl-1986-cc
        let y2 = c.sqr(&self.y);
        let s = c.mul_small(&c.mul(&self.x, &y2), 4);
        let z2 = c.sqr(&self.z);
        let z4 = c.sqr(&z2);
        let m = c.add(&c.mul_small(&c.sqr(&self.x), 3), &c.mul(c.a(), &z4));

        let x3 = c.sub(&c.sqr(&m), &c.mul_small(&s, 2));
        let y4_8 = c.mul_small(&c.sqr(&y2), 8);
        let y3 = c.sub(&c.mul(&m, &c.sub(&s, &x3)), &y4_8);
        let z3 = c.mul_small(&c.mul(&self.y, &self.z), 2);

        PointGFp {
            curve: self.curve.clone(),
            x: x3,
            y: y3,
            z: z3,
        }
    }

    /// `2^i·self`.
    pub fn mult2i(&self, i: usize) -> Self {
        (0..i).fold(self.clone(), |acc, _| acc.double())
    }

    /// `self + other`.
    pub fn add(&self, other: &PointGFp) -> Self {
        self.add_jacobian(&other.x, &other.y, &other.z)
    }

    /// `self + (x, y)` for an affine `(x, y)`; `(0, 0)` stands for infinity.
    pub fn add_affine(&self, x: &BigUint, y: &BigUint) -> Self {
        if x.is_zero() && y.is_zero() {
            return self.clone();
        }
        self.add_jacobian(x, y, &BigUint::one())
    }

    fn add_jacobian(&self, x2: &BigUint, y2: &BigUint, z2: &BigUint) -> Self {
        if z2.is_zero() {
            return self.clone();
        }
        if self.is_zero() {
            return PointGFp::from_jacobian(&self.curve, x2.clone(), y2.clone(), z2.clone());
        }

        let c = &self.curve;

        // add-1998-cmo-2
        let z2_2 = c.sqr(z2);
        let z1_2 = c.sqr(&self.z);
        let u1 = c.mul(&self.x, &z2_2);
        let u2 = c.mul(x2, &z1_2);
        let s1 = c.mul(&self.y, &c.mul(z2, &z2_2));
        let s2 = c.mul(y2, &c.mul(&self.z, &z1_2));

        let h = c.sub(&u2, &u1);
        let r = c.sub(&s2, &s1);

        if h.is_zero() {
            if r.is_zero() {
                return self.double();
            }
            return self.zero_of();
        }

        let h2 = c.sqr(&h);
        let h3 = c.mul(&h, &h2);
        let u1h2 = c.mul(&u1, &h2);

        let x3 = c.sub(&c.sub(&c.sqr(&r), &h3), &c.mul_small(&u1h2, 2));
        let y3 = c.sub(&c.mul(&r, &c.sub(&u1h2, &x3)), &c.mul(&s1, &h3));
        let z3 = c.mul(&c.mul(&self.z, z2), &h);

        PointGFp {
            curve: self.curve.clone(),
            x: x3,
            y: y3,
            z: z3,
        }
    }

    /// `-self`.
    pub fn negate(&self) -> Self {
        PointGFp {
            curve: self.curve.clone(),
            x: self.x.clone(),
            y: self.curve.neg(&self.y),
            z: self.z.clone(),
        }
    }

    /// Checks `Y² = X³ + aXZ⁴ + bZ⁶`. The point at infinity is on every curve.
    pub fn on_the_curve(&self) -> bool {
        if self.is_zero() {
            return true;
        }

        let c = &self.curve;
        let y2 = c.sqr(&self.y);
        let x3 = c.mul(&self.x, &c.sqr(&self.x));
        let z2 = c.sqr(&self.z);
        let z4 = c.sqr(&z2);
        let z6 = c.mul(&z4, &z2);

        let ax_z4 = c.mul(c.a(), &c.mul(&self.x, &z4));
        let b_z6 = c.mul(c.b(), &z6);

        y2 == c.add(&c.add(&x3, &ax_z4), &b_z6)
    }

    /// Rescales the projective coordinates by a random `λ`, leaving the point
    /// unchanged. Has no effect on the point at infinity.
    pub fn randomize_repr<R: CryptoRngCore + ?Sized>(&mut self, rng: &mut R) {
        if self.is_zero() {
            return;
        }
        let c = &self.curve;
        let mask = match random_integer(rng, &BigUint::from(2u32), c.p()) {
            Ok(mask) => mask,
            Err(_) => return,
        };
        let mask2 = c.sqr(&mask);
        let mask3 = c.mul(&mask2, &mask);

        self.x = c.mul(&self.x, &mask2);
        self.y = c.mul(&self.y, &mask3);
        self.z = c.mul(&self.z, &mask);
    }

    /// Affine `(x, y)`; fails on the point at infinity.
    pub fn to_affine(&self) -> Result<(BigUint, BigUint)> {
        if self.is_zero() {
            return Err(Error::invalid_argument(
                "cannot convert the point at infinity to affine",
            ));
        }
        if self.z.is_one() {
            return Ok((self.x.clone(), self.y.clone()));
        }

        let c = &self.curve;
        let z_inv = c.inv(&self.z)?;
        let z_inv2 = c.sqr(&z_inv);
        let z_inv3 = c.mul(&z_inv2, &z_inv);
        Ok((c.mul(&self.x, &z_inv2), c.mul(&self.y, &z_inv3)))
    }

    /// Affine x-coordinate.
    pub fn affine_x(&self) -> Result<BigUint> {
        self.to_affine().map(|(x, _)| x)
    }

    /// Affine y-coordinate.
    pub fn affine_y(&self) -> Result<BigUint> {
        self.to_affine().map(|(_, y)| y)
    }

    /// True if `Z == 1`.
    pub fn is_affine(&self) -> bool {
        self.z.is_one()
    }

    /// Normalizes every point to `Z == 1` with a single field inversion.
    ///
    /// Fails if any point is the point at infinity.
    pub fn force_all_affine(points: &mut [PointGFp]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        if points.iter().any(PointGFp::is_zero) {
            return Err(Error::invalid_argument(
                "force_all_affine: the point at infinity has no affine form",
            ));
        }

        let c = points[0].curve.clone();

        // prefix products z_0 · z_1 ⋯ z_i
        let mut prefix: Vec<BigUint> = Vec::with_capacity(points.len());
        let mut acc = points[0].z.clone();
        prefix.push(acc.clone());
        for pt in &points[1..] {
            acc = c.mul(&acc, &pt.z);
            prefix.push(acc.clone());
        }

        let mut s_inv = c.inv(&acc)?;

        for i in (0..points.len()).rev() {
            let z_inv = if i > 0 {
                let z_inv = c.mul(&s_inv, &prefix[i - 1]);
                s_inv = c.mul(&s_inv, &points[i].z);
                z_inv
            } else {
                s_inv.clone()
            };

            let z_inv2 = c.sqr(&z_inv);
            let z_inv3 = c.mul(&z_inv2, &z_inv);
            let pt = &mut points[i];
            pt.x = c.mul(&pt.x, &z_inv2);
            pt.y = c.mul(&pt.y, &z_inv3);
            pt.z = BigUint::one();
        }

        Ok(())
    }

    /// SEC1 encoding. The point at infinity encodes as a single zero byte.
    pub fn encode(&self, format: PointFormat) -> Result<Vec<u8>> {
        if self.is_zero() {
            return Ok(alloc::vec![0u8]);
        }

        let p_bytes = self.curve.p_bytes();
        let (x, y) = self.to_affine()?;
        let bx = encode_1363(&x, p_bytes)?;
        let by = encode_1363(&y, p_bytes)?;
        let y_odd = y.is_odd() as u8;

        let mut out = Vec::with_capacity(1 + 2 * p_bytes);
        match format {
            PointFormat::Uncompressed => {
                out.push(0x04);
                out.extend_from_slice(&bx);
                out.extend_from_slice(&by);
            }
            PointFormat::Compressed => {
                out.push(0x02 | y_odd);
                out.extend_from_slice(&bx);
            }
            PointFormat::Hybrid => {
                out.push(0x06 | y_odd);
                out.extend_from_slice(&bx);
                out.extend_from_slice(&by);
            }
        }
        Ok(out)
    }

    /// Decodes a SEC1 point and checks that it lies on `curve`.
    pub fn decode(curve: &CurveGFp, data: &[u8]) -> Result<Self> {
        if data.len() == 1 && data[0] == 0 {
            return Ok(PointGFp::zero(curve));
        }
        if data.len() <= 1 {
            return Err(Error::decoding("OS2ECP: input too short"));
        }

        let p_bytes = curve.p_bytes();
        let tag = data[0];
        let body = &data[1..];

        let (x, y) = match tag {
            0x02 | 0x03 => {
                if body.len() != p_bytes {
                    return Err(Error::decoding("OS2ECP: invalid length for compressed point"));
                }
                let x = BigUint::from_bytes_be(body);
                let y = decompress_y(curve, &x, tag & 1 == 1)?;
                (x, y)
            }
            0x04 => {
                let (x, y) = split_xy(body, p_bytes)?;
                (x, y)
            }
            0x06 | 0x07 => {
                let (x, y) = split_xy(body, p_bytes)?;
                if y.is_odd() != (tag & 1 == 1) {
                    return Err(Error::decoding("OS2ECP: hybrid point parity mismatch"));
                }
                (x, y)
            }
            _ => {
                return Err(Error::decoding(alloc::format!(
                    "OS2ECP: unknown point format {}",
                    tag
                )))
            }
        };

        if &x >= curve.p() || &y >= curve.p() {
            return Err(Error::decoding("OS2ECP: coordinate out of range"));
        }

        let point = PointGFp::from_affine(curve, x, y)?;
        if !point.on_the_curve() {
            return Err(Error::decoding("OS2ECP: decoded point is not on the curve"));
        }
        Ok(point)
    }
}

fn split_xy(body: &[u8], p_bytes: usize) -> Result<(BigUint, BigUint)> {
    if body.len() != 2 * p_bytes {
        return Err(Error::decoding("OS2ECP: invalid length for uncompressed point"));
    }
    Ok((
        BigUint::from_bytes_be(&body[..p_bytes]),
        BigUint::from_bytes_be(&body[p_bytes..]),
    ))
}

fn decompress_y(curve: &CurveGFp, x: &BigUint, y_odd: bool) -> Result<BigUint> {
    if x >= curve.p() {
        return Err(Error::decoding("OS2ECP: x coordinate out of range"));
    }
    let rhs = curve.rhs(x);
    let y = ressol(&rhs, curve.p())?
        .ok_or_else(|| Error::decoding("OS2ECP: error during point decompression"))?;

    Ok(if y.is_odd() != y_odd { curve.neg(&y) } else { y })
}

impl PartialEq for PointGFp {
    fn eq(&self, other: &Self) -> bool {
        if self.curve != other.curve {
            return false;
        }
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return true,
            (true, false) | (false, true) => return false,
            _ => {}
        }

        let c = &self.curve;
        let z1_2 = c.sqr(&self.z);
        let z2_2 = c.sqr(&other.z);
        let z1_3 = c.mul(&z1_2, &self.z);
        let z2_3 = c.mul(&z2_2, &other.z);

        c.mul(&self.x, &z2_2) == c.mul(&other.x, &z1_2)
            && c.mul(&self.y, &z2_3) == c.mul(&other.y, &z1_3)
    }
}

impl Eq for PointGFp {}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::ToPrimitive;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    // y² = x³ + 2x + 3 over GF(97), generator (3, 6) of order 5
    fn toy() -> (CurveGFp, PointGFp) {
        let c = CurveGFp::new(BigUint::from(97u32), BigUint::from(2u32), BigUint::from(3u32))
            .unwrap();
        let g = PointGFp::from_affine(&c, BigUint::from(3u32), BigUint::from(6u32)).unwrap();
        (c, g)
    }

    fn affine(p: &PointGFp) -> (u32, u32) {
        let (x, y) = p.to_affine().unwrap();
        (x.to_u32().unwrap(), y.to_u32().unwrap())
    }

    #[test]
    fn test_group_law() {
        let (c, g) = toy();
        assert!(g.on_the_curve());

        let g2 = g.double();
        assert_eq!(affine(&g2), (80, 10));
        assert_eq!(g.add(&g), g2);

        let g3 = g2.add(&g);
        assert_eq!(affine(&g3), (80, 87));
        let g4 = g2.double();
        assert_eq!(affine(&g4), (3, 91));
        assert_eq!(g.mult2i(2), g4);

        let g5 = g4.add(&g);
        assert!(g5.is_zero());
        assert!(g.add(&g.negate()).is_zero());
        assert_eq!(PointGFp::zero(&c).add(&g), g);
        assert_eq!(g.add(&PointGFp::zero(&c)), g);
        assert_eq!(g3.add_affine(&BigUint::zero(), &BigUint::zero()), g3);
        for p in [&g2, &g3, &g4, &g5] {
            assert!(p.on_the_curve());
        }
    }

    #[test]
    fn test_randomize_repr() {
        let (_, g) = toy();
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let mut h = g.double();
        let before = h.clone();
        h.randomize_repr(&mut rng);
        assert_eq!(h, before);
        assert!(h.on_the_curve());
    }

    #[test]
    fn test_force_all_affine() {
        let (_, g) = toy();
        let mut pts = [g.double(), g.double().add(&g), g.mult2i(2)];
        let expected = pts.clone();
        PointGFp::force_all_affine(&mut pts).unwrap();
        for (p, e) in pts.iter().zip(expected.iter()) {
            assert!(p.is_affine());
            assert_eq!(p, e);
        }

        let mut with_zero = [g.clone(), g.zero_of()];
        assert!(PointGFp::force_all_affine(&mut with_zero).is_err());
    }

    #[test]
    fn test_encode_decode() {
        let (c, g) = toy();
        let g3 = g.double().add(&g);
        for format in [PointFormat::Uncompressed, PointFormat::Compressed, PointFormat::Hybrid] {
            let enc = g3.encode(format).unwrap();
            assert_eq!(PointGFp::decode(&c, &enc).unwrap(), g3);
        }
        assert_eq!(g3.encode(PointFormat::Uncompressed).unwrap(), [4, 80, 87]);
        assert_eq!(g3.encode(PointFormat::Compressed).unwrap(), [3, 80]);

        let zero = PointGFp::zero(&c);
        assert_eq!(zero.encode(PointFormat::Compressed).unwrap(), [0]);
        assert!(PointGFp::decode(&c, &[0]).unwrap().is_zero());

        // (3, 7) is not on the curve
        assert!(matches!(PointGFp::decode(&c, &[4, 3, 7]), Err(Error::Decoding(_))));
        assert!(matches!(PointGFp::decode(&c, &[5, 3, 6]), Err(Error::Decoding(_))));
        assert!(matches!(PointGFp::decode(&c, &[4, 3]), Err(Error::Decoding(_))));
        assert!(matches!(PointGFp::decode(&c, &[7, 3, 6]), Err(Error::Decoding(_))));
        assert!(zero.to_affine().is_err());
    }
}
