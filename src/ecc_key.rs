//! Key material shared by the elliptic curve schemes.
//!
//! Public keys are a point on a named curve, encoded as an uncompressed
//! SEC1 point with the curve OID as algorithm parameter. Private keys add
//! the secret scalar and encode as RFC 5915 `ECPrivateKey`.

use alloc::vec::Vec;
use core::fmt;

use der::{
    asn1::{BitString, OctetString},
    Any, Decode, Encode, Sequence,
};
use num_bigint::BigUint;
use num_traits::Zero;
use rand_core::CryptoRngCore;
use spki::{AlgorithmIdentifierOwned, ObjectIdentifier};
use zeroize::{Zeroize, Zeroizing};

use crate::ec::{EcGroup, PointFormat, PointGFp};
use crate::errors::{Error, Result};
use crate::math::bigint::encode_1363;
use crate::math::work_factor::ecp_work_factor;
use crate::rng::RngRef;

/// `ECPrivateKey` from RFC 5915.
#[derive(Sequence)]
struct EcPrivateKeyDer {
    version: u8,
    private_key: OctetString,
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    parameters: Option<ObjectIdentifier>,
    #[asn1(context_specific = "1", optional = "true", tag_mode = "EXPLICIT")]
    public_key: Option<BitString>,
}

const EC_PRIVATE_KEY_VERSION: u8 = 1;

/// A point on a named curve.
#[derive(Clone, Debug, PartialEq)]
pub struct EcPublicKey {
    group: EcGroup,
    point: PointGFp,
}

impl EcPublicKey {
    /// Creates a key from a group and a point on its curve.
    pub fn new(group: EcGroup, point: PointGFp) -> Result<Self> {
        if point.curve() != group.curve() {
            return Err(Error::invalid_argument("EC key: point is on a different curve"));
        }
        Ok(EcPublicKey { group, point })
    }

    /// Decodes the named curve from `alg_id` and the SEC1 point in
    /// `key_bits`.
    pub fn from_key_bits(alg_id: &AlgorithmIdentifierOwned, key_bits: &[u8]) -> Result<Self> {
        let group = group_from_algorithm_identifier(alg_id)?;
        let point = group.os2ecp(key_bits)?;
        Ok(EcPublicKey { group, point })
    }

    /// The curve group.
    pub fn group(&self) -> &EcGroup {
        &self.group
    }

    /// The public point.
    pub fn point(&self) -> &PointGFp {
        &self.point
    }

    pub(crate) fn key_length(&self) -> usize {
        self.group.p_bits()
    }

    pub(crate) fn estimated_strength(&self) -> usize {
        ecp_work_factor(self.key_length())
    }

    pub(crate) fn algorithm_identifier(
        &self,
        oid: ObjectIdentifier,
    ) -> Result<AlgorithmIdentifierOwned> {
        let curve = self
            .group
            .oid()
            .ok_or_else(|| Error::invalid_argument("EC key: only named curves can be encoded"))?;
        Ok(AlgorithmIdentifierOwned {
            oid,
            parameters: Some(Any::encode_from(curve)?),
        })
    }

    pub(crate) fn public_key_bits(&self) -> Result<Vec<u8>> {
        self.point.encode(PointFormat::Uncompressed)
    }

    pub(crate) fn check_key(&self) -> bool {
        self.group.verify_public_element(&self.point)
    }
}

fn group_from_algorithm_identifier(alg_id: &AlgorithmIdentifierOwned) -> Result<EcGroup> {
    let params = alg_id
        .parameters
        .as_ref()
        .ok_or_else(|| Error::decoding("EC key: missing curve parameters"))?;
    EcGroup::from_der_named_curve(&params.to_der()?)
}

/// A secret scalar with its public point.
///
/// The public point is `x·G`, or `x⁻¹·G` for schemes such as ECGDSA that
/// invert the scalar.
#[derive(Clone)]
pub struct EcPrivateKey {
    public: EcPublicKey,
    x: BigUint,
    inverted: bool,
}

impl EcPrivateKey {
    /// Generates a key on `group`.
    pub fn generate<R: CryptoRngCore + ?Sized>(
        rng: &mut R,
        group: EcGroup,
        inverted: bool,
    ) -> Result<Self> {
        let x = group.random_scalar(rng)?;
        Self::from_scalar_with_rng(group, x, inverted, Some(&mut RngRef(rng)))
    }

    /// Creates a key from a scalar in `[1, order)`.
    ///
    /// No RNG is at hand, so the public point is computed without scalar
    /// blinding. Prefer [`EcPrivateKey::from_scalar_with_rng`].
    pub fn from_scalar(group: EcGroup, x: BigUint, inverted: bool) -> Result<Self> {
        Self::from_scalar_with_rng(group, x, inverted, None)
    }

    /// Creates a key from a scalar in `[1, order)`, blinding the
    /// computation of its public point with `rng`.
    pub fn from_scalar_with_rng(
        group: EcGroup,
        x: BigUint,
        inverted: bool,
        rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<Self> {
        if x.is_zero() || &x >= group.order() {
            return Err(Error::invalid_argument("EC key: private scalar out of range"));
        }
        let point = public_point(&group, &x, inverted, rng)?;
        Ok(EcPrivateKey {
            public: EcPublicKey { group, point },
            x,
            inverted,
        })
    }

    /// Decodes an `ECPrivateKey`. The curve is taken from `alg_id`; a
    /// missing public point is recomputed.
    pub fn from_key_bits(
        alg_id: &AlgorithmIdentifierOwned,
        key_bits: &[u8],
        inverted: bool,
    ) -> Result<Self> {
        let group = group_from_algorithm_identifier(alg_id)?;
        let decoded = EcPrivateKeyDer::from_der(key_bits)?;

        if decoded.version != EC_PRIVATE_KEY_VERSION {
            return Err(Error::decoding("ECPrivateKey: unknown version"));
        }
        if let Some(oid) = &decoded.parameters {
            if Some(oid) != group.oid() {
                return Err(Error::decoding("ECPrivateKey: curve parameters disagree"));
            }
        }

        let x = BigUint::from_bytes_be(decoded.private_key.as_bytes());
        let key = Self::from_scalar(group, x, inverted)
            .map_err(|_| Error::decoding("ECPrivateKey: invalid private scalar"))?;

        if let Some(public_key) = &decoded.public_key {
            let bytes = public_key
                .as_bytes()
                .ok_or_else(|| Error::decoding("ECPrivateKey: unaligned public key"))?;
            if key.public.group.os2ecp(bytes)? != key.public.point {
                return Err(Error::decoding("ECPrivateKey: public point does not match"));
            }
        }

        Ok(key)
    }

    /// The public half.
    pub fn public(&self) -> &EcPublicKey {
        &self.public
    }

    /// The secret scalar.
    pub fn x(&self) -> &BigUint {
        &self.x
    }

    pub(crate) fn private_key_bits(&self) -> Result<Zeroizing<Vec<u8>>> {
        let group = &self.public.group;
        let scalar = Zeroizing::new(encode_1363(&self.x, group.order_bytes())?);
        let key = EcPrivateKeyDer {
            version: EC_PRIVATE_KEY_VERSION,
            private_key: OctetString::new(scalar.as_slice())?,
            parameters: None,
            public_key: Some(BitString::from_bytes(&self.public.public_key_bits()?)?),
        };
        Ok(Zeroizing::new(key.to_der()?))
    }

    /// The public checks, a scalar in range and a public point matching
    /// it. The point is recomputed with `rng` as blinding source.
    pub(crate) fn check_key(&self, rng: Option<&mut dyn CryptoRngCore>) -> bool {
        if !self.public.check_key() {
            return false;
        }
        let group = &self.public.group;
        if self.x.is_zero() || &self.x >= group.order() {
            return false;
        }
        matches!(
            public_point(group, &self.x, self.inverted, rng),
            Ok(p) if p == self.public.point
        )
    }
}

fn public_point(
    group: &EcGroup,
    x: &BigUint,
    inverted: bool,
    rng: Option<&mut dyn CryptoRngCore>,
) -> Result<PointGFp> {
    if inverted {
        let x_inv = Zeroizing::new(group.inverse_mod_order(x)?);
        group.blinded_base_point_multiply(&x_inv, rng)
    } else {
        group.blinded_base_point_multiply(x, rng)
    }
}

impl fmt::Debug for EcPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcPrivateKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl PartialEq for EcPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public && self.x == other.x && self.inverted == other.inverted
    }
}

impl Drop for EcPrivateKey {
    fn drop(&mut self) {
        self.x.zeroize();
    }
}
