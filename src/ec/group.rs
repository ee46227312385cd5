//! Named elliptic curve groups.

use alloc::{boxed::Box, string::String, sync::Arc, vec::Vec};
use core::fmt;

use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use once_cell::race::OnceBox;
use rand_core::CryptoRngCore;

use super::curve::CurveGFp;
use super::point::PointGFp;
use super::point_mul::{mul_public, BasePointPrecompute, MultiPointPrecompute, VarPointPrecompute};
use crate::errors::{Error, Result};
use crate::math::bigint::random_integer;
use crate::math::numthry::inverse_mod_uint;
use crate::math::reducer::ModularReducer;
use crate::rng::reborrow;

/// `secp256r1` / NIST P-256.
pub const SECP256R1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
/// `secp384r1` / NIST P-384.
pub const SECP384R1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
/// `secp256k1`.
pub const SECP256K1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.10");

struct NamedCurve {
    name: &'static str,
    oid: ObjectIdentifier,
    p: &'static str,
    a: &'static str,
    b: &'static str,
    gx: &'static str,
    gy: &'static str,
    order: &'static str,
}

const NAMED_CURVES: &[NamedCurve] = &[
    NamedCurve {
        name: "secp256r1",
        oid: SECP256R1_OID,
        p: "FFFFFFFF00000001000000000000000000000000FFFFFFFFFFFFFFFFFFFFFFFF",
        a: "FFFFFFFF00000001000000000000000000000000FFFFFFFFFFFFFFFFFFFFFFFC",
        b: "5AC635D8AA3A93E7B3EBBD55769886BC651D06B0CC53B0F63BCE3C3E27D2604B",
        gx: "6B17D1F2E12C4247F8BCE6E563A440F277037D812DEB33A0F4A13945D898C296",
        gy: "4FE342E2FE1A7F9B8EE7EB4A7C0F9E162BCE33576B315ECECBB6406837BF51F5",
        order: "FFFFFFFF00000000FFFFFFFFFFFFFFFFBCE6FAADA7179E84F3B9CAC2FC632551",
    },
    NamedCurve {
        name: "secp384r1",
        oid: SECP384R1_OID,
        p: "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFE\
            FFFFFFFF0000000000000000FFFFFFFF",
        a: "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFE\
            FFFFFFFF0000000000000000FFFFFFFC",
        b: "B3312FA7E23EE7E4988E056BE3F82D19181D9C6EFE8141120314088F5013875A\
            C656398D8A2ED19D2A85C8EDD3EC2AEF",
        gx: "AA87CA22BE8B05378EB1C71EF320AD746E1D3B628BA79B9859F741E082542A38\
             5502F25DBF55296C3A545E3872760AB7",
        gy: "3617DE4A96262C6F5D9E98BF9292DC29F8F41DBD289A147CE9DA3113B5F0B8C0\
             0A60B1CE1D7E819D7A431D7C90EA0E5F",
        order: "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFC7634D81F4372DDF\
                581A0DB248B0A77AECEC196ACCC52973",
    },
    NamedCurve {
        name: "secp256k1",
        oid: SECP256K1_OID,
        p: "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F",
        a: "0",
        b: "7",
        gx: "79BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798",
        gy: "483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08FFB10D4B8",
        order: "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141",
    },
];

// built on first use, one slot per entry of NAMED_CURVES
static NAMED_GROUPS: [OnceBox<EcGroup>; NAMED_CURVES.len()] =
    [const { OnceBox::new() }; NAMED_CURVES.len()];

fn hex_uint(s: &str) -> Result<BigUint> {
    BigUint::parse_bytes(s.as_bytes(), 16)
        .ok_or_else(|| Error::internal("invalid hex constant in curve table"))
}

struct EcGroupData {
    name: Option<String>,
    oid: Option<ObjectIdentifier>,
    curve: CurveGFp,
    base_point: PointGFp,
    order: BigUint,
    cofactor: BigUint,
    mod_order: ModularReducer,
    base_mul: BasePointPrecompute,
}

/// An elliptic curve group: a curve, a base point and its prime order.
///
/// Cloning is cheap; clones share the curve and the base point table.
#[derive(Clone)]
pub struct EcGroup {
    inner: Arc<EcGroupData>,
}

impl EcGroup {
    /// Builds a group from explicit parameters.
    pub fn new(
        p: BigUint,
        a: BigUint,
        b: BigUint,
        base_x: BigUint,
        base_y: BigUint,
        order: BigUint,
        cofactor: BigUint,
    ) -> Result<Self> {
        Self::build(None, None, p, a, b, base_x, base_y, order, cofactor)
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        name: Option<String>,
        oid: Option<ObjectIdentifier>,
        p: BigUint,
        a: BigUint,
        b: BigUint,
        base_x: BigUint,
        base_y: BigUint,
        order: BigUint,
        cofactor: BigUint,
    ) -> Result<Self> {
        if order.is_zero() || cofactor.is_zero() {
            return Err(Error::invalid_argument("EcGroup: order and cofactor must be positive"));
        }

        let curve = CurveGFp::new(p, a, b)?;
        let base_point = PointGFp::from_affine(&curve, base_x, base_y)?;
        if !base_point.on_the_curve() {
            return Err(Error::invalid_argument("EcGroup: base point is not on the curve"));
        }

        let mod_order = ModularReducer::new(&order)?;
        let base_mul = BasePointPrecompute::new(&base_point, &order)?;

        Ok(EcGroup {
            inner: Arc::new(EcGroupData {
                name,
                oid,
                curve,
                base_point,
                order,
                cofactor,
                mod_order,
                base_mul,
            }),
        })
    }

    /// The group for `NAMED_CURVES[index]`. Its base point table is
    /// computed once and shared by every later lookup.
    fn from_named(index: usize) -> Result<Self> {
        NAMED_GROUPS[index]
            .get_or_try_init(|| Self::build_named(&NAMED_CURVES[index]).map(Box::new))
            .cloned()
    }

    fn build_named(nc: &NamedCurve) -> Result<Self> {
        log::debug!("precomputing base point table for {}", nc.name);
        Self::build(
            Some(nc.name.into()),
            Some(nc.oid),
            hex_uint(nc.p)?,
            hex_uint(nc.a)?,
            hex_uint(nc.b)?,
            hex_uint(nc.gx)?,
            hex_uint(nc.gy)?,
            hex_uint(nc.order)?,
            BigUint::one(),
        )
    }

    /// Looks up a named curve.
    pub fn from_name(name: &str) -> Result<Self> {
        let index = NAMED_CURVES
            .iter()
            .position(|nc| nc.name == name)
            .ok_or_else(|| Error::invalid_argument(alloc::format!("unknown ECC group '{}'", name)))?;
        Self::from_named(index)
    }

    /// Looks up a named curve by OID.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        let index = NAMED_CURVES
            .iter()
            .position(|nc| &nc.oid == oid)
            .ok_or_else(|| Error::decoding(alloc::format!("unknown ECC group OID {}", oid)))?;
        Self::from_named(index)
    }

    /// Decodes a DER `namedCurve` parameter.
    pub fn from_der_named_curve(der: &[u8]) -> Result<Self> {
        Self::from_oid(&ObjectIdentifier::from_der(der)?)
    }

    /// Names of the built-in curves.
    pub fn known_names() -> impl Iterator<Item = &'static str> {
        NAMED_CURVES.iter().map(|nc| nc.name)
    }

    /// Name of a built-in curve.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// OID of a built-in curve.
    pub fn oid(&self) -> Option<&ObjectIdentifier> {
        self.inner.oid.as_ref()
    }

    /// DER `namedCurve` parameter. Only available for built-in curves.
    pub fn der_named_curve(&self) -> Result<Vec<u8>> {
        let oid = self
            .oid()
            .ok_or_else(|| Error::invalid_argument("EcGroup: explicit curves have no OID"))?;
        Ok(oid.to_der()?)
    }

    /// The underlying curve.
    pub fn curve(&self) -> &CurveGFp {
        &self.inner.curve
    }

    /// The base point `G`.
    pub fn base_point(&self) -> &PointGFp {
        &self.inner.base_point
    }

    /// Order of `G`.
    pub fn order(&self) -> &BigUint {
        &self.inner.order
    }

    /// Cofactor.
    pub fn cofactor(&self) -> &BigUint {
        &self.inner.cofactor
    }

    /// Bit length of `p`.
    pub fn p_bits(&self) -> usize {
        self.inner.curve.p_bits()
    }

    /// Byte length of `p`.
    pub fn p_bytes(&self) -> usize {
        self.inner.curve.p_bytes()
    }

    /// Bit length of the order.
    pub fn order_bits(&self) -> usize {
        self.inner.order.bits()
    }

    /// Byte length of the order.
    pub fn order_bytes(&self) -> usize {
        self.order_bits().div_ceil(8)
    }

    /// `x mod order`.
    pub fn mod_order(&self, x: &BigUint) -> BigUint {
        self.inner.mod_order.reduce(x)
    }

    /// `x·y mod order`.
    pub fn multiply_mod_order(&self, x: &BigUint, y: &BigUint) -> BigUint {
        self.inner.mod_order.multiply(x, y)
    }

    /// `x·y·z mod order`.
    pub fn multiply_mod_order3(&self, x: &BigUint, y: &BigUint, z: &BigUint) -> BigUint {
        self.multiply_mod_order(&self.multiply_mod_order(x, y), z)
    }

    /// `x⁻¹ mod order`, zero if `x ≡ 0`.
    pub fn inverse_mod_order(&self, x: &BigUint) -> Result<BigUint> {
        inverse_mod_uint(&self.mod_order(x), &self.inner.order)
    }

    /// Uniformly random scalar in `[1, order)`.
    pub fn random_scalar<R: CryptoRngCore + ?Sized>(&self, rng: &mut R) -> Result<BigUint> {
        random_integer(rng, &BigUint::one(), &self.inner.order)
    }

    /// `k·G` with scalar blinding.
    pub fn blinded_base_point_multiply(
        &self,
        k: &BigUint,
        rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<PointGFp> {
        self.inner.base_mul.mul(k, rng)
    }

    /// Affine x-coordinate of `k·G`, reduced modulo the order.
    pub fn blinded_base_point_multiply_x(
        &self,
        k: &BigUint,
        rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<BigUint> {
        let pt = self.blinded_base_point_multiply(k, rng)?;
        if pt.is_zero() {
            return Ok(BigUint::zero());
        }
        Ok(self.mod_order(&pt.affine_x()?))
    }

    /// `k·P` for an arbitrary point `P`, with scalar blinding.
    pub fn blinded_var_point_multiply(
        &self,
        point: &PointGFp,
        k: &BigUint,
        mut rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<PointGFp> {
        let table = VarPointPrecompute::new(point, reborrow(&mut rng));
        table.mul(k, rng, &self.inner.order)
    }

    /// `x·G + y·P` for public `x` and `y`. Not constant time.
    pub fn point_multiply(&self, x: &BigUint, point: &PointGFp, y: &BigUint) -> PointGFp {
        MultiPointPrecompute::new(&self.inner.base_point, point).multi_exp(x, y)
    }

    /// Decodes a SEC1 point on this group's curve.
    pub fn os2ecp(&self, data: &[u8]) -> Result<PointGFp> {
        PointGFp::decode(&self.inner.curve, data)
    }

    /// Checks that `point` is a valid public element: on the curve, not
    /// infinity, and of the right order.
    pub fn verify_public_element(&self, point: &PointGFp) -> bool {
        if point.is_zero() || !point.on_the_curve() || point.curve() != self.curve() {
            return false;
        }
        if !self.inner.cofactor.is_one() && mul_public(point, &self.inner.cofactor).is_zero() {
            return false;
        }
        mul_public(point, &self.inner.order).is_zero()
    }
}

impl PartialEq for EcGroup {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.curve == other.inner.curve
                && self.inner.base_point == other.inner.base_point
                && self.inner.order == other.inner.order
                && self.inner.cofactor == other.inner.cofactor)
    }
}

impl Eq for EcGroup {}

impl fmt::Debug for EcGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcGroup")
            .field("name", &self.inner.name)
            .field("order", &self.inner.order)
            .finish_non_exhaustive()
    }
}
