//! ECDSA as in ANSI X9.62.

use alloc::{boxed::Box, vec::Vec};

use num_bigint::BigUint;
use num_traits::Zero;
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::algorithms::name::require_padding;
use crate::ec::EcGroup;
use crate::ecc_key::{EcPrivateKey, EcPublicKey};
use crate::errors::{Error, Result};
use crate::math::bigint::{encode_1363, from_bytes_with_max_bits};
use crate::oids;
use crate::pubkey::signature_consistency_check;
use crate::rng::reborrow;
use crate::traits::{PrivateKey, PublicKey, SignatureOp, VerificationOp};

const SIGNATURE_PADDINGS: &[&str] = &["EMSA1", "Raw"];

/// An ECDSA public key.
#[derive(Clone, Debug, PartialEq)]
pub struct EcdsaPublicKey {
    inner: EcPublicKey,
}

/// An ECDSA private key.
#[derive(Clone, Debug, PartialEq)]
pub struct EcdsaPrivateKey {
    inner: EcPrivateKey,
}

impl EcdsaPublicKey {
    /// Wraps a curve point.
    pub fn new(key: EcPublicKey) -> Self {
        EcdsaPublicKey { inner: key }
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

impl EcdsaPrivateKey {
    /// Generates a key on `group`.
    pub fn new<R: CryptoRngCore + ?Sized>(rng: &mut R, group: EcGroup) -> Result<Self> {
        EcPrivateKey::generate(rng, group, false).map(|inner| EcdsaPrivateKey { inner })
    }

    /// Creates a key from a scalar in `[1, order)`.
    pub fn from_scalar(group: EcGroup, x: BigUint) -> Result<Self> {
        EcPrivateKey::from_scalar(group, x, false).map(|inner| EcdsaPrivateKey { inner })
    }

    /// Decodes an RFC 5915 `ECPrivateKey`.
    pub fn from_key_bits(alg_id: &AlgorithmIdentifierOwned, key_bits: &[u8]) -> Result<Self> {
        EcPrivateKey::from_key_bits(alg_id, key_bits, false).map(|inner| EcdsaPrivateKey { inner })
    }

    /// The scalar and its public point.
    pub fn ec_key(&self) -> &EcPrivateKey {
        &self.inner
    }

    /// The public half.
    pub fn public(&self) -> EcdsaPublicKey {
        EcdsaPublicKey::new(self.inner.public().clone())
    }
}

impl ZeroizeOnDrop for EcdsaPrivateKey {}

impl PublicKey for EcdsaPublicKey {
    fn algo_name(&self) -> &'static str {
        "ECDSA"
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
        self.inner.algorithm_identifier(oids::ECDSA)
    }

    fn public_key_bits(&self) -> Result<Vec<u8>> {
        self.inner.public_key_bits()
    }

    fn check_key(&self, _rng: Option<&mut dyn CryptoRngCore>, _strong: bool) -> bool {
        self.inner.check_key()
    }

    fn create_verification_op(&self, emsa: &str) -> Result<Box<dyn VerificationOp + '_>> {
        require_padding(self.algo_name(), emsa, SIGNATURE_PADDINGS)?;
        Ok(Box::new(EcdsaVerificationOp { key: &self.inner }))
    }
}

impl PublicKey for EcdsaPrivateKey {
    fn algo_name(&self) -> &'static str {
        "ECDSA"
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
        self.inner.public().algorithm_identifier(oids::ECDSA)
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
        Ok(Box::new(EcdsaVerificationOp {
            key: self.inner.public(),
        }))
    }
}

impl PrivateKey for EcdsaPrivateKey {
    fn private_key_bits(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.inner.private_key_bits()
    }

    fn public_key(&self) -> Box<dyn PublicKey> {
        Box::new(self.public())
    }

    fn create_signature_op(&self, emsa: &str) -> Result<Box<dyn SignatureOp + '_>> {
        require_padding(self.algo_name(), emsa, SIGNATURE_PADDINGS)?;
        Ok(Box::new(EcdsaSignatureOp { key: &self.inner }))
    }
}

/// Splits a fixed-width `r || s` signature, rejecting values outside
/// `[1, order)`.
pub(crate) fn split_signature(group: &EcGroup, sig: &[u8]) -> Option<(BigUint, BigUint)> {
    let order_bytes = group.order_bytes();
    if sig.len() != 2 * order_bytes {
        return None;
    }
    let r = BigUint::from_bytes_be(&sig[..order_bytes]);
    let s = BigUint::from_bytes_be(&sig[order_bytes..]);
    let order = group.order();
    if r.is_zero() || &r >= order || s.is_zero() || &s >= order {
        return None;
    }
    Some((r, s))
}

pub(crate) fn join_signature(group: &EcGroup, r: &BigUint, s: &BigUint) -> Result<Vec<u8>> {
    let order_bytes = group.order_bytes();
    let mut sig = encode_1363(r, order_bytes)?;
    sig.extend_from_slice(&encode_1363(s, order_bytes)?);
    Ok(sig)
}

struct EcdsaSignatureOp<'a> {
    key: &'a EcPrivateKey,
}

impl SignatureOp for EcdsaSignatureOp<'_> {
    fn max_input_bits(&self) -> usize {
        self.key.public().group().order_bits()
    }

    fn sign(&self, msg: &[u8], rng: &mut dyn CryptoRngCore) -> Result<Vec<u8>> {
        let group = self.key.public().group();
        let m = group.mod_order(&from_bytes_with_max_bits(msg, group.order_bits()));

        let k = Zeroizing::new(group.random_scalar(rng)?);
        let r = group.blinded_base_point_multiply_x(&k, Some(&mut *rng))?;
        let k_inv = Zeroizing::new(group.inverse_mod_order(&k)?);

        // x·r + m computed as (x·r·b + m·b) / b
        let b = Zeroizing::new(group.random_scalar(rng)?);
        let b_inv = Zeroizing::new(group.inverse_mod_order(&b)?);
        let xrb = Zeroizing::new(group.multiply_mod_order3(self.key.x(), &r, &b));
        let mb = group.multiply_mod_order(&m, &b);
        let xrm = Zeroizing::new(group.mod_order(&(&*xrb + mb)));
        let s = group.multiply_mod_order3(&k_inv, &xrm, &b_inv);

        if r.is_zero() || s.is_zero() {
            return Err(Error::internal("computed zero r/s during ECDSA signature"));
        }

        join_signature(group, &r, &s)
    }
}

struct EcdsaVerificationOp<'a> {
    key: &'a EcPublicKey,
}

impl VerificationOp for EcdsaVerificationOp<'_> {
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
        let w = group.inverse_mod_order(&s)?;
        let u1 = group.multiply_mod_order(&m, &w);
        let u2 = group.multiply_mod_order(&r, &w);

        let point = group.point_multiply(&u1, self.key.point(), &u2);
        if point.is_zero() {
            return Ok(false);
        }
        Ok(group.mod_order(&point.affine_x()?) == r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubkey::{PkSigner, PkVerifier, SignatureFormat};
    use hex_literal::hex;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    fn rfc6979_key() -> EcdsaPrivateKey {
        let group = EcGroup::from_name("secp256r1").unwrap();
        let x = BigUint::from_bytes_be(&hex!(
            "C9AFA9D845BA75166B5C215767B1D6934E50C3DB36E89B127B8A622B120F6721"
        ));
        EcdsaPrivateKey::from_scalar(group, x).unwrap()
    }

    #[test]
    fn test_public_point() {
        let key = rfc6979_key();
        let point = key.ec_key().public().point();
        assert_eq!(
            point.affine_x().unwrap().to_bytes_be(),
            hex!("60FED4BA255A9D31C961EB74C6356D68C049B8923B61FA6CE669622E60F29FB6")
        );
        assert_eq!(
            point.affine_y().unwrap().to_bytes_be(),
            hex!("7903FE1008B8BC99A41AE9E95628BC64F2F1B20C2D7E9F5177A3C294D4462299")
        );
    }

    #[test]
    fn test_verify_known_signature() {
        let key = rfc6979_key();
        let sig = hex!(
            "EFD48B2AACB6A8FD1140DD9CD45E81D69D2C877B56AAF991C34D0EA84EAF3716"
            "F7CB1C942D657C41D436C7A1B6E29F65F3E900DBB9AFF4064DC4AB2F843ACDA8"
        );
        let public = key.public();
        let mut verifier =
            PkVerifier::with_format(&public, "EMSA1(SHA-256)", SignatureFormat::Ieee1363).unwrap();
        assert!(verifier.verify_message(b"sample", &sig).unwrap());
        assert!(!verifier.verify_message(b"test", &sig).unwrap());
    }

    #[test]
    fn test_sign_verify_digest() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let key = EcdsaPrivateKey::new(&mut rng, EcGroup::from_name("secp256r1").unwrap()).unwrap();
        let public = key.public_key();

        let digest = hex!("a665a45920422f9d417e4867efdc4fb8a04a1f3fff1fa07e998e86f7f7a27ae3");
        let mut signer = PkSigner::with_format(&key, "Raw", SignatureFormat::Ieee1363).unwrap();
        let sig = signer.sign_message(&digest, &mut rng).unwrap();
        assert_eq!(sig.len(), 64);

        let mut verifier =
            PkVerifier::with_format(&*public, "Raw", SignatureFormat::Ieee1363).unwrap();
        assert!(verifier.verify_message(&digest, &sig).unwrap());

        let mut corrupted = digest;
        corrupted[31] ^= 1;
        assert!(!verifier.verify_message(&corrupted, &sig).unwrap());
    }

    #[test]
    fn test_signature_formats() {
        let mut rng = ChaCha8Rng::from_seed([9; 32]);
        for curve in ["secp256r1", "secp384r1", "secp256k1"] {
            let key = EcdsaPrivateKey::new(&mut rng, EcGroup::from_name(curve).unwrap()).unwrap();
            assert_eq!(key.message_parts(), 2);

            for format in [SignatureFormat::Ieee1363, SignatureFormat::DerSequence] {
                let sig = PkSigner::with_format(&key, "EMSA1(SHA-384)", format)
                    .unwrap()
                    .sign_message(b"message", &mut rng)
                    .unwrap();
                let mut verifier = PkVerifier::with_format(&key, "EMSA1(SHA-384)", format).unwrap();
                assert!(verifier.verify_message(b"message", &sig).unwrap(), "{curve}");
                assert!(!verifier.verify_message(b"messagf", &sig).unwrap(), "{curve}");
            }
        }
    }

    #[test]
    fn test_out_of_range_signatures() {
        let key = rfc6979_key();
        let group = key.ec_key().public().group().clone();
        let mut verifier =
            PkVerifier::with_format(&key, "EMSA1(SHA-256)", SignatureFormat::Ieee1363).unwrap();

        let zero = [0u8; 64];
        assert!(!verifier.verify_message(b"sample", &zero).unwrap());

        let order = encode_1363(group.order(), 32).unwrap();
        let mut sig = order.clone();
        sig.extend_from_slice(&order);
        assert!(!verifier.verify_message(b"sample", &sig).unwrap());
        assert!(!verifier.verify_message(b"sample", &sig[..63]).unwrap());
    }

    #[test]
    fn test_check_key_and_encoding() {
        let mut rng = ChaCha8Rng::from_seed([5; 32]);
        let key = EcdsaPrivateKey::new(&mut rng, EcGroup::from_name("secp256k1").unwrap()).unwrap();
        assert!(key.check_key(Some(&mut rng), true));
        assert!(key.public().check_key(None, false));

        let alg_id = key.algorithm_identifier().unwrap();
        assert_eq!(alg_id.oid, oids::ECDSA);
        let public = EcdsaPublicKey::from_key_bits(&alg_id, &key.public_key_bits().unwrap()).unwrap();
        assert_eq!(public, key.public());
        let private = EcdsaPrivateKey::from_key_bits(&alg_id, &key.private_key_bits().unwrap()).unwrap();
        assert_eq!(private, key);
    }

    #[test]
    fn test_unsupported_padding() {
        let key = rfc6979_key();
        assert!(matches!(
            PkSigner::new(&key, "EMSA4(SHA-256)"),
            Err(Error::AlgorithmNotFound(_))
        ));
        assert!(key.create_encryption_op("Raw").is_err());
    }
}
