//! Elliptic curves over prime fields.
//!
//! [`CurveGFp`] holds the field and equation, [`PointGFp`] is a point in
//! Jacobian coordinates and [`EcGroup`] bundles a curve with a base point of
//! prime order. Secret scalar multiplication goes through the blinded
//! multipliers in [`point_mul`].

pub mod curve;
pub mod group;
pub mod point;
pub mod point_mul;

pub use self::{
    curve::CurveGFp,
    group::{EcGroup, SECP256K1_OID, SECP256R1_OID, SECP384R1_OID},
    point::{PointFormat, PointGFp},
    point_mul::{
        BasePointPrecompute, MultiPointPrecompute, VarPointPrecompute,
        POINTGFP_SCALAR_BLINDING_BITS,
    },
};
