//! Scalar multiplication.
//!
//! [`BasePointPrecompute`] and [`VarPointPrecompute`] handle secret scalars:
//! the scalar is blinded with a random multiple of the group order, table
//! entries are read by scanning every candidate with masks, and the working
//! point is re-randomized once it leaves infinity. [`MultiPointPrecompute`]
//! computes `z1·P + z2·Q` for public scalars only and branches freely.

use alloc::vec::Vec;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::Zero;
use rand_core::CryptoRngCore;

use super::point::PointGFp;
use crate::errors::{Error, Result};
use crate::math::bigint::{from_words, get_substring, random_bits, to_words, Word};
use crate::math::ct;
use crate::math::reducer::ModularReducer;
use crate::rng::reborrow;

/// Width in bits of the random mask used for scalar blinding.
pub const POINTGFP_SCALAR_BLINDING_BITS: usize = 80;

/// `k mod order` plus a random multiple of `order`.
///
/// Without an RNG, one or two copies of the order are added instead so the
/// processed scalar always has `order.bits() + 1` bits.
fn blind_scalar(
    k: &BigUint,
    order: &BigUint,
    mod_order: &ModularReducer,
    rng: Option<&mut dyn CryptoRngCore>,
    force_high_bit: bool,
) -> BigUint {
    let mut scalar = mod_order.reduce(k);

    match rng {
        Some(rng) => {
            let mask = random_bits(rng, POINTGFP_SCALAR_BLINDING_BITS, force_high_bit);
            scalar += order * mask;
        }
        None => {
            log::warn!("scalar multiplication without an RNG, scalar blinding disabled");
            scalar += order;
            if scalar.bits() == order.bits() {
                scalar += order;
            }
        }
    }

    scalar
}

/// Fixed-base comb table: `{1, 2, 3}·4^i·G` for each 2-bit window, affine.
#[derive(Debug, Clone)]
pub struct BasePointPrecompute {
    base_point: PointGFp,
    mod_order: ModularReducer,
    order: BigUint,
    p_words: usize,
    // for window i: x and y of 1·, 2·, 3·(4^i·G), each p_words long
    table: Vec<Word>,
}

impl BasePointPrecompute {
    const WINDOW_BITS: usize = 2;
    const WINDOW_SIZE: usize = (1 << Self::WINDOW_BITS) - 1;

    /// Precomputes the table for `base` in a group of the given order.
    pub fn new(base: &PointGFp, order: &BigUint) -> Result<Self> {
        let curve = base.curve();
        let p_bits = curve.p_bits();
        let p_words = curve.p_words();

        // enough windows for a blinded scalar
        let t_bits = (p_bits + POINTGFP_SCALAR_BLINDING_BITS + 1).div_ceil(Self::WINDOW_BITS);

        let mut points: Vec<PointGFp> = Vec::with_capacity(Self::WINDOW_SIZE * t_bits);
        let mut g = base.clone();
        for _ in 0..t_bits {
            let g2 = g.double();
            let g3 = g2.add(&g);
            let g4 = g2.double();
            points.push(g);
            points.push(g2);
            points.push(g3);
            g = g4;
        }

        PointGFp::force_all_affine(&mut points)?;

        let mut table = Vec::with_capacity(points.len() * 2 * p_words);
        for pt in &points {
            table.extend(to_words(pt.x(), p_words));
            table.extend(to_words(pt.y(), p_words));
        }

        Ok(BasePointPrecompute {
            base_point: base.clone(),
            mod_order: ModularReducer::new(order)?,
            order: order.clone(),
            p_words,
            table,
        })
    }

    /// The base point this table was built for.
    pub fn base_point(&self) -> &PointGFp {
        &self.base_point
    }

    /// `k·G`, blinded.
    pub fn mul(&self, k: &BigUint, mut rng: Option<&mut dyn CryptoRngCore>) -> Result<PointGFp> {
        let seeded = rng.is_some();
        let scalar = blind_scalar(k, &self.order, &self.mod_order, reborrow(&mut rng), true);

        let windows = scalar.bits().div_ceil(Self::WINDOW_BITS);
        let elem_size = 2 * self.p_words;

        if windows * Self::WINDOW_SIZE * elem_size > self.table.len() {
            return Err(Error::internal(
                "BasePointPrecompute: precomputed table too small for scalar",
            ));
        }

        let scalar_words = to_words(&scalar, 0);
        let mut r = self.base_point.zero_of();
        let mut wt = alloc::vec![0 as Word; elem_size];

        for i in 0..windows {
            let window = windows - i - 1;
            let base_addr = Self::WINDOW_SIZE * window * elem_size;
            let w = get_substring(&scalar_words, Self::WINDOW_BITS * window, Self::WINDOW_BITS);

            let w_is_1 = ct::is_equal(w, 1);
            let w_is_2 = ct::is_equal(w, 2);
            let w_is_3 = ct::is_equal(w, 3);

            for (j, out) in wt.iter_mut().enumerate() {
                *out = ct::select3(
                    w_is_1,
                    self.table[base_addr + j],
                    w_is_2,
                    self.table[base_addr + elem_size + j],
                    w_is_3,
                    self.table[base_addr + 2 * elem_size + j],
                    0,
                );
            }

            let (wx, wy) = wt.split_at(self.p_words);
            r = r.add_affine(&from_words(wx), &from_words(wy));

            if i == 0 && seeded {
                // the top window is non-zero, so r has left infinity
                if let Some(rng) = rng.as_deref_mut() {
                    r.randomize_repr(rng);
                }
            }
        }

        debug_assert!(r.on_the_curve());
        Ok(r)
    }
}

/// Window table for a variable point: `U[i] = i·P` for `i < 2^4`.
#[derive(Debug, Clone)]
pub struct VarPointPrecompute {
    point: PointGFp,
    p_words: usize,
    // x, y, z of each entry, p_words each
    table: Vec<Word>,
}

impl VarPointPrecompute {
    const WINDOW_BITS: usize = 4;

    /// Builds the table for `point`. With an RNG every non-zero entry gets
    /// its own random projective scaling.
    pub fn new(point: &PointGFp, rng: Option<&mut dyn CryptoRngCore>) -> Self {
        let curve = point.curve().clone();
        let p_words = curve.p_words();
        let entries = 1usize << Self::WINDOW_BITS;

        let mut u: Vec<PointGFp> = Vec::with_capacity(entries);
        u.push(point.zero_of());
        u.push(point.clone());
        for i in (2..entries).step_by(2) {
            let even = u[i / 2].double();
            let odd = even.add(point);
            u.push(even);
            u.push(odd);
        }

        if let Some(rng) = rng {
            // the zero entry cannot be randomized
            for entry in u.iter_mut().skip(1) {
                let mut mask = random_bits(rng, curve.p_bits() - 1, false);
                mask |= BigUint::from(1u32);
                let mask2 = curve.sqr(&mask);
                let mask3 = curve.mul(&mask, &mask2);
                *entry = PointGFp::from_jacobian(
                    &curve,
                    curve.mul(entry.x(), &mask2),
                    curve.mul(entry.y(), &mask3),
                    curve.mul(entry.z(), &mask),
                );
            }
        }

        let mut table = Vec::with_capacity(entries * 3 * p_words);
        for pt in &u {
            table.extend(to_words(pt.x(), p_words));
            table.extend(to_words(pt.y(), p_words));
            table.extend(to_words(pt.z(), p_words));
        }

        VarPointPrecompute {
            point: point.clone(),
            p_words,
            table,
        }
    }

    fn select(&self, w: Word, out: &mut [Word]) {
        let elem_size = 3 * self.p_words;
        out.iter_mut().for_each(|e| *e = 0);
        for i in 1..(1usize << Self::WINDOW_BITS) {
            let mask = ct::is_equal(w, i as Word);
            for (j, e) in out.iter_mut().enumerate() {
                *e |= mask & self.table[i * elem_size + j];
            }
        }
    }

    fn entry_point(&self, e: &[Word]) -> PointGFp {
        let n = self.p_words;
        PointGFp::from_jacobian(
            self.point.curve(),
            from_words(&e[..n]),
            from_words(&e[n..2 * n]),
            from_words(&e[2 * n..]),
        )
    }

    /// `k·P`, blinded.
    pub fn mul(
        &self,
        k: &BigUint,
        mut rng: Option<&mut dyn CryptoRngCore>,
        order: &BigUint,
    ) -> Result<PointGFp> {
        let mod_order = ModularReducer::new(order)?;
        let scalar = blind_scalar(k, order, &mod_order, reborrow(&mut rng), false);

        let scalar_words = to_words(&scalar, 0);
        let mut windows = scalar.bits().div_ceil(Self::WINDOW_BITS);
        let mut r = self.point.zero_of();
        let mut e = alloc::vec![0 as Word; 3 * self.p_words];

        if windows > 0 {
            windows -= 1;
            let w = get_substring(&scalar_words, windows * Self::WINDOW_BITS, Self::WINDOW_BITS);
            self.select(w, &mut e);
            r = r.add(&self.entry_point(&e));

            // randomize only after leaving infinity
            if let Some(rng) = rng.as_deref_mut() {
                r.randomize_repr(rng);
            }
        }

        while windows > 0 {
            r = r.mult2i(Self::WINDOW_BITS);
            let w = get_substring(
                &scalar_words,
                (windows - 1) * Self::WINDOW_BITS,
                Self::WINDOW_BITS,
            );
            self.select(w, &mut e);
            r = r.add(&self.entry_point(&e));
            windows -= 1;
        }

        debug_assert!(r.on_the_curve());
        Ok(r)
    }
}

/// Joint table for `z1·x + z2·y` with 2-bit windows. Not constant time.
#[derive(Debug, Clone)]
pub struct MultiPointPrecompute {
    // index 4·b2 + b1 - 1 holds b1·x + b2·y
    table: Vec<PointGFp>,
    no_infinity: bool,
}

impl MultiPointPrecompute {
    /// Precomputes all 15 non-trivial combinations of `{0..3}·x + {0..3}·y`.
    pub fn new(x: &PointGFp, y: &PointGFp) -> Self {
        let x2 = x.double();
        let x3 = x2.add(x);
        let y2 = y.double();
        let y3 = y2.add(y);

        let mut table = Vec::with_capacity(15);
        table.push(x.clone());
        table.push(x2.clone());
        table.push(x3.clone());
        for yk in [y, &y2, &y3] {
            table.push(yk.clone());
            table.push(yk.add(x));
            table.push(yk.add(&x2));
            table.push(yk.add(&x3));
        }

        let no_infinity = !table.iter().any(PointGFp::is_zero);
        if no_infinity && PointGFp::force_all_affine(&mut table).is_err() {
            return MultiPointPrecompute {
                table,
                no_infinity: false,
            };
        }

        MultiPointPrecompute { table, no_infinity }
    }

    /// `z1·x + z2·y`.
    pub fn multi_exp(&self, z1: &BigUint, z2: &BigUint) -> PointGFp {
        let z_bits = z1.bits().max(z2.bits()).div_ceil(2) * 2;
        let z1_words = to_words(z1, 0);
        let z2_words = to_words(z2, 0);

        let mut h = self.table[0].zero_of();

        for i in (0..z_bits).step_by(2) {
            if i > 0 {
                h = h.mult2i(2);
            }

            let z1_b = get_substring(&z1_words, z_bits - i - 2, 2);
            let z2_b = get_substring(&z2_words, z_bits - i - 2, 2);
            let z12 = (4 * z2_b + z1_b) as usize;

            if z12 != 0 {
                let entry = &self.table[z12 - 1];
                h = if self.no_infinity {
                    h.add_affine(entry.x(), entry.y())
                } else {
                    h.add(entry)
                };
            }
        }

        h
    }
}

/// Unblinded `k·P` by double-and-add, for public scalars.
pub(crate) fn mul_public(point: &PointGFp, k: &BigUint) -> PointGFp {
    if k.is_zero() {
        return point.zero_of();
    }
    let mut r = point.zero_of();
    for i in (0..k.bits()).rev() {
        r = r.double();
        if (k >> i).is_odd() {
            r = r.add(point);
        }
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::curve::CurveGFp;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    // y² = x³ + 2x + 3 over GF(97) has 100 points; (3, 6) generates a
    // subgroup of order 5
    fn toy() -> (PointGFp, BigUint) {
        let c = CurveGFp::new(BigUint::from(97u32), BigUint::from(2u32), BigUint::from(3u32))
            .unwrap();
        let g = PointGFp::from_affine(&c, BigUint::from(3u32), BigUint::from(6u32)).unwrap();
        (g, BigUint::from(5u32))
    }

    #[test]
    fn test_base_point_mul_matches_public() {
        let (g, order) = toy();
        let table = BasePointPrecompute::new(&g, &order).unwrap();
        let mut rng = ChaCha8Rng::from_seed([42; 32]);

        for k in 0u32..12 {
            let k = BigUint::from(k);
            let expected = mul_public(&g, &(&k % &order));
            assert_eq!(table.mul(&k, Some(&mut rng)).unwrap(), expected);
            assert_eq!(table.mul(&k, None).unwrap(), expected);
        }
    }

    #[test]
    fn test_var_point_mul_matches_public() {
        let (g, order) = toy();
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let p = g.double();
        let table = VarPointPrecompute::new(&p, Some(&mut rng));

        for k in 0u32..12 {
            let k = BigUint::from(k);
            let expected = mul_public(&p, &(&k % &order));
            assert_eq!(table.mul(&k, Some(&mut rng), &order).unwrap(), expected);
            assert_eq!(table.mul(&k, None, &order).unwrap(), expected);
        }
    }

    #[test]
    fn test_multi_exp() {
        let (g, _) = toy();
        let p = g.mult2i(1).add(&g);
        let table = MultiPointPrecompute::new(&g, &p);

        for z1 in 0u32..7 {
            for z2 in 0u32..7 {
                let z1 = BigUint::from(z1);
                let z2 = BigUint::from(z2);
                let expected = mul_public(&g, &z1).add(&mul_public(&p, &z2));
                assert_eq!(table.multi_exp(&z1, &z2), expected);
            }
        }
    }
}
