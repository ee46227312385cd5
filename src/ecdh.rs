//! Elliptic curve Diffie-Hellman.

use alloc::{boxed::Box, vec::Vec};

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::ec::EcGroup;
use crate::ecc_key::{EcPrivateKey, EcPublicKey};
use crate::errors::{Error, Result};
use crate::math::bigint::encode_1363;
use crate::oids;
use crate::traits::{KeyAgreementOp, PrivateKey, PublicKey};

/// An ECDH public key.
#[derive(Clone, Debug, PartialEq)]
pub struct EcdhPublicKey {
    inner: EcPublicKey,
}

/// An ECDH private key.
#[derive(Clone, Debug, PartialEq)]
pub struct EcdhPrivateKey {
    inner: EcPrivateKey,
}

impl EcdhPublicKey {
    /// Wraps a curve point.
    pub fn new(key: EcPublicKey) -> Self {
        EcdhPublicKey { inner: key }
    }

    /// Decodes a key from its `AlgorithmIdentifier` and SEC1 point.
    pub fn from_key_bits(alg_id: &AlgorithmIdentifierOwned, key_bits: &[u8]) -> Result<Self> {
        EcPublicKey::from_key_bits(alg_id, key_bits).map(Self::new)
    }

    /// The curve point and its group.
    pub fn ec_key(&self) -> &EcPublicKey {
        &self.inner
    }
}

impl EcdhPrivateKey {
    /// Generates a key on `group`.
    pub fn new<R: CryptoRngCore + ?Sized>(rng: &mut R, group: EcGroup) -> Result<Self> {
        EcPrivateKey::generate(rng, group, false).map(|inner| EcdhPrivateKey { inner })
    }

    /// Creates a key from a scalar in `[1, order)`.
    pub fn from_scalar(group: EcGroup, x: BigUint) -> Result<Self> {
        EcPrivateKey::from_scalar(group, x, false).map(|inner| EcdhPrivateKey { inner })
    }

    /// Decodes an RFC 5915 `ECPrivateKey`.
    pub fn from_key_bits(alg_id: &AlgorithmIdentifierOwned, key_bits: &[u8]) -> Result<Self> {
        EcPrivateKey::from_key_bits(alg_id, key_bits, false).map(|inner| EcdhPrivateKey { inner })
    }

    /// The scalar and its public point.
    pub fn ec_key(&self) -> &EcPrivateKey {
        &self.inner
    }

    /// The public half.
    pub fn public(&self) -> EcdhPublicKey {
        EcdhPublicKey::new(self.inner.public().clone())
    }
}

impl ZeroizeOnDrop for EcdhPrivateKey {}

impl PublicKey for EcdhPublicKey {
    fn algo_name(&self) -> &'static str {
        "ECDH"
    }

    fn key_length(&self) -> usize {
        self.inner.key_length()
    }

    fn estimated_strength(&self) -> usize {
        self.inner.estimated_strength()
    }

    fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        self.inner.algorithm_identifier(oids::ECDH)
    }

    fn public_key_bits(&self) -> Result<Vec<u8>> {
        self.inner.public_key_bits()
    }

    fn check_key(&self, _rng: Option<&mut dyn CryptoRngCore>, _strong: bool) -> bool {
        self.inner.check_key()
    }
}

impl PublicKey for EcdhPrivateKey {
    fn algo_name(&self) -> &'static str {
        "ECDH"
    }

    fn key_length(&self) -> usize {
        self.inner.public().key_length()
    }

    fn estimated_strength(&self) -> usize {
        self.inner.public().estimated_strength()
    }

    fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        self.inner.public().algorithm_identifier(oids::ECDH)
    }

    fn public_key_bits(&self) -> Result<Vec<u8>> {
        self.inner.public().public_key_bits()
    }

    fn check_key(&self, rng: Option<&mut dyn CryptoRngCore>, _strong: bool) -> bool {
        self.inner.check_key(rng)
    }
}

impl PrivateKey for EcdhPrivateKey {
    fn private_key_bits(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.inner.private_key_bits()
    }

    fn public_key(&self) -> Box<dyn PublicKey> {
        Box::new(self.public())
    }

    /// The uncompressed public point.
    fn public_value(&self) -> Result<Vec<u8>> {
        self.inner.public().public_key_bits()
    }

    fn create_key_agreement_op(&self) -> Result<Box<dyn KeyAgreementOp + '_>> {
        let group = self.inner.public().group();
        // scalar pre-divided by the cofactor, so the peer point can be
        // cleared of small-subgroup components first
        let cofactor_inv = Zeroizing::new(group.inverse_mod_order(group.cofactor())?);
        let scalar = Zeroizing::new(group.multiply_mod_order(&cofactor_inv, self.inner.x()));
        Ok(Box::new(EcdhKeyAgreementOp { group, scalar }))
    }
}

struct EcdhKeyAgreementOp<'a> {
    group: &'a EcGroup,
    scalar: Zeroizing<BigUint>,
}

impl KeyAgreementOp for EcdhKeyAgreementOp<'_> {
    fn agree(
        &self,
        other: &[u8],
        rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let group = self.group;
        let mut point = group
            .os2ecp(other)
            .map_err(|_| Error::invalid_argument("ECDH agreement: invalid peer point"))?;
        if point.is_zero() {
            return Err(Error::invalid_argument("ECDH agreement: peer point is infinity"));
        }
        if !group.cofactor().is_one() {
            point = group.point_multiply(&BigUint::zero(), &point, group.cofactor());
        }

        let shared = group.blinded_var_point_multiply(&point, &self.scalar, rng)?;
        if shared.is_zero() || !shared.on_the_curve() {
            return Err(Error::internal("ECDH agreed value was not on the curve"));
        }

        let x = Zeroizing::new(shared.affine_x()?);
        Ok(Zeroizing::new(encode_1363(&x, group.p_bytes())?))
    }
}
