//! ECGDSA as in ISO/IEC 14888-3. The public point is `x⁻¹·G`.

use alloc::{boxed::Box, vec::Vec};

use num_bigint::BigUint;
use num_traits::Zero;
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::algorithms::name::require_padding;
use crate::ec::EcGroup;
use crate::ecc_key::{EcPrivateKey, EcPublicKey};
use crate::ecdsa::{join_signature, split_signature};
use crate::errors::{Error, Result};
use crate::math::bigint::from_bytes_with_max_bits;
use crate::oids;
use crate::pubkey::signature_consistency_check;
use crate::rng::reborrow;
use crate::traits::{PrivateKey, PublicKey, SignatureOp, VerificationOp};

const SIGNATURE_PADDINGS: &[&str] = &["EMSA1", "Raw"];

/// An ECGDSA public key.
#[derive(Clone, Debug, PartialEq)]
pub struct EcgdsaPublicKey {
    inner: EcPublicKey,
}

/// An ECGDSA private key.
#[derive(Clone, Debug, PartialEq)]
pub struct EcgdsaPrivateKey {
    inner: EcPrivateKey,
}

impl EcgdsaPublicKey {
    /// Wraps a curve point.
    pub fn new(key: EcPublicKey) -> Self {
        EcgdsaPublicKey { inner: key }
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

impl EcgdsaPrivateKey {
    /// Generates a key on `group`.
    pub fn new<R: CryptoRngCore + ?Sized>(rng: &mut R, group: EcGroup) -> Result<Self> {
        EcPrivateKey::generate(rng, group, true).map(|inner| EcgdsaPrivateKey { inner })
    }

    /// Creates a key from a scalar in `[1, order)`.
    pub fn from_scalar(group: EcGroup, x: BigUint) -> Result<Self> {
        EcPrivateKey::from_scalar(group, x, true).map(|inner| EcgdsaPrivateKey { inner })
    }

    /// Decodes an RFC 5915 `ECPrivateKey`.
    pub fn from_key_bits(alg_id: &AlgorithmIdentifierOwned, key_bits: &[u8]) -> Result<Self> {
        EcPrivateKey::from_key_bits(alg_id, key_bits, true).map(|inner| EcgdsaPrivateKey { inner })
    }

    /// The scalar and its public point.
    pub fn ec_key(&self) -> &EcPrivateKey {
        &self.inner
    }

    /// The public half.
    pub fn public(&self) -> EcgdsaPublicKey {
        EcgdsaPublicKey::new(self.inner.public().clone())
    }
}

impl ZeroizeOnDrop for EcgdsaPrivateKey {}

impl PublicKey for EcgdsaPublicKey {
    fn algo_name(&self) -> &'static str {
        "ECGDSA"
    }

    fn key_length(&self) -> usize {
        self.inner.key_length()
    }

    fn estimated_strength(&self) -> usize {
        self.inner.estimated_strength()
    }

    fn message_parts(&self) -> usize {
        2
    }

    fn message_part_size(&self) -> usize {
        self.inner.group().order_bytes()
    }

    fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        self.inner.algorithm_identifier(oids::ECGDSA)
    }

    fn public_key_bits(&self) -> Result<Vec<u8>> {
        self.inner.public_key_bits()
    }

    fn check_key(&self, _rng: Option<&mut dyn CryptoRngCore>, _strong: bool) -> bool {
        self.inner.check_key()
    }

    fn create_verification_op(&self, emsa: &str) -> Result<Box<dyn VerificationOp + '_>> {
        require_padding(self.algo_name(), emsa, SIGNATURE_PADDINGS)?;
        Ok(Box::new(EcgdsaVerificationOp { key: &self.inner }))
    }
}

impl PublicKey for EcgdsaPrivateKey {
    fn algo_name(&self) -> &'static str {
        "ECGDSA"
    }

    fn key_length(&self) -> usize {
        self.inner.public().key_length()
    }

    fn estimated_strength(&self) -> usize {
        self.inner.public().estimated_strength()
    }

    fn message_parts(&self) -> usize {
        2
    }

    fn message_part_size(&self) -> usize {
        self.inner.public().group().order_bytes()
    }

    fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        self.inner.public().algorithm_identifier(oids::ECGDSA)
    }

    fn public_key_bits(&self) -> Result<Vec<u8>> {
        self.inner.public().public_key_bits()
    }

    fn check_key(&self, mut rng: Option<&mut dyn CryptoRngCore>, strong: bool) -> bool {
        if !self.inner.check_key(reborrow(&mut rng)) {
            return false;
        }
        match (strong, rng) {
            (true, Some(rng)) => signature_consistency_check(rng, self, "EMSA1(SHA-256)"),
            _ => true,
        }
    }

    fn create_verification_op(&self, emsa: &str) -> Result<Box<dyn VerificationOp + '_>> {
        require_padding(self.algo_name(), emsa, SIGNATURE_PADDINGS)?;
        Ok(Box::new(EcgdsaVerificationOp {
            key: self.inner.public(),
        }))
    }
}

impl PrivateKey for EcgdsaPrivateKey {
    fn private_key_bits(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.inner.private_key_bits()
    }

    fn public_key(&self) -> Box<dyn PublicKey> {
        Box::new(self.public())
    }

    fn create_signature_op(&self, emsa: &str) -> Result<Box<dyn SignatureOp + '_>> {
        require_padding(self.algo_name(), emsa, SIGNATURE_PADDINGS)?;
        Ok(Box::new(EcgdsaSignatureOp { key: &self.inner }))
    }
}

struct EcgdsaSignatureOp<'a> {
    key: &'a EcPrivateKey,
}

impl SignatureOp for EcgdsaSignatureOp<'_> {
    fn max_input_bits(&self) -> usize {
        self.key.public().group().order_bits()
    }

    fn sign(&self, msg: &[u8], rng: &mut dyn CryptoRngCore) -> Result<Vec<u8>> {
        let group = self.key.public().group();
        let m = group.mod_order(&from_bytes_with_max_bits(msg, group.order_bits()));

        let k = Zeroizing::new(group.random_scalar(rng)?);
        let r = group.blinded_base_point_multiply_x(&k, Some(rng))?;

        // s = x·(k·r - m)
        let kr = Zeroizing::new(group.multiply_mod_order(&k, &r));
        let krm = Zeroizing::new(group.mod_order(&(&*kr + group.order() - &m)));
        let s = group.multiply_mod_order(self.key.x(), &krm);

        if r.is_zero() || s.is_zero() {
            return Err(Error::internal("computed zero r/s during ECGDSA signature"));
        }

        join_signature(group, &r, &s)
    }
}

struct EcgdsaVerificationOp<'a> {
    key: &'a EcPublicKey,
}

impl VerificationOp for EcgdsaVerificationOp<'_> {
    fn max_input_bits(&self) -> usize {
        self.key.group().order_bits()
    }

    fn verify(&self, msg: &[u8], sig: &[u8]) -> Result<bool> {
        let group = self.key.group();
        let (r, s) = match split_signature(group, sig) {
            Some(parts) => parts,
            None => return Ok(false),
        };

        let m = group.mod_order(&from_bytes_with_max_bits(msg, group.order_bits()));
        let w = group.inverse_mod_order(&r)?;
        let u1 = group.multiply_mod_order(&m, &w);
        let u2 = group.multiply_mod_order(&s, &w);

        let point = group.point_multiply(&u1, self.key.point(), &u2);
        if point.is_zero() {
            return Ok(false);
        }
        Ok(group.mod_order(&point.affine_x()?) == r)
    }
}
