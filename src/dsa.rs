//! DSA keys over a prime-order subgroup.

use alloc::{boxed::Box, vec::Vec};
use core::fmt;

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::algorithms::name::require_padding;
use crate::dl_group::{
    check_dl_private, check_dl_public, encode_integer, load_dl_key, DlGroup, DlGroupFormat,
};
use crate::errors::{Error, Result};
use crate::math::bigint::{encode_1363, from_bytes_with_max_bits, random_integer};
use crate::math::numthry::inverse_mod_uint;
use crate::math::reducer::ModularReducer;
use crate::oids;
use crate::pubkey::signature_consistency_check;
use crate::rng::reborrow;
use crate::traits::{PrivateKey, PublicKey, SignatureOp, VerificationOp};

const SIGNATURE_PADDINGS: &[&str] = &["EMSA1", "Raw"];

/// A DSA public key `y = g^x mod p`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DsaPublicKey {
    group: DlGroup,
    y: BigUint,
}

/// A DSA private key.
#[derive(Clone)]
pub struct DsaPrivateKey {
    public: DsaPublicKey,
    x: BigUint,
}

impl DsaPublicKey {
    /// Creates a public key from its group and public value.
    pub fn new(group: DlGroup, y: BigUint) -> Self {
        DsaPublicKey { group, y }
    }

    /// Decodes a key from its `AlgorithmIdentifier` and key bits.
    pub fn from_key_bits(alg_id: &AlgorithmIdentifierOwned, key_bits: &[u8]) -> Result<Self> {
        let (group, y) = load_dl_key(alg_id, key_bits, DlGroupFormat::AnsiX957)?;
        Ok(DsaPublicKey { group, y })
    }

    /// The domain parameters.
    pub fn group(&self) -> &DlGroup {
        &self.group
    }

    /// The public value.
    pub fn y(&self) -> &BigUint {
        &self.y
    }
}

impl DsaPrivateKey {
    /// Generates a key in `group`.
    pub fn new<R: CryptoRngCore + ?Sized>(rng: &mut R, group: DlGroup) -> Result<Self> {
        let x = random_integer(rng, &BigUint::from(2u32), group.q())?;
        Ok(Self::from_x(group, x))
    }

    /// Creates a key from a known private value.
    pub fn from_x(group: DlGroup, x: BigUint) -> Self {
        let y = group.power_g_p(&x);
        DsaPrivateKey {
            public: DsaPublicKey { group, y },
            x,
        }
    }

    /// Decodes a key from its `AlgorithmIdentifier` and key bits.
    pub fn from_key_bits(alg_id: &AlgorithmIdentifierOwned, key_bits: &[u8]) -> Result<Self> {
        let (group, x) = load_dl_key(alg_id, key_bits, DlGroupFormat::AnsiX957)?;
        Ok(Self::from_x(group, x))
    }

    /// The public half.
    pub fn public(&self) -> &DsaPublicKey {
        &self.public
    }

    /// The private value.
    pub fn x(&self) -> &BigUint {
        &self.x
    }
}

impl fmt::Debug for DsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DsaPrivateKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl PartialEq for DsaPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public && self.x == other.x
    }
}

impl Eq for DsaPrivateKey {}

impl Drop for DsaPrivateKey {
    fn drop(&mut self) {
        self.x.zeroize();
    }
}

impl ZeroizeOnDrop for DsaPrivateKey {}

impl PublicKey for DsaPublicKey {
    fn algo_name(&self) -> &'static str {
        "DSA"
    }

    fn key_length(&self) -> usize {
        self.group.p_bits()
    }

    fn estimated_strength(&self) -> usize {
        self.group.estimated_strength()
    }

    fn message_parts(&self) -> usize {
        2
    }

    fn message_part_size(&self) -> usize {
        self.group.q_bytes()
    }

    fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        self.group
            .algorithm_identifier(oids::DSA, DlGroupFormat::AnsiX957)
    }

    fn public_key_bits(&self) -> Result<Vec<u8>> {
        encode_integer(&self.y)
    }

    fn check_key(&self, rng: Option<&mut dyn CryptoRngCore>, strong: bool) -> bool {
        check_dl_public(&self.group, &self.y, rng, strong)
    }

    fn create_verification_op(&self, emsa: &str) -> Result<Box<dyn VerificationOp + '_>> {
        require_padding(self.algo_name(), emsa, SIGNATURE_PADDINGS)?;
        Ok(Box::new(DsaVerificationOp::new(self)?))
    }
}

impl PublicKey for DsaPrivateKey {
    fn algo_name(&self) -> &'static str {
        self.public.algo_name()
    }

    fn key_length(&self) -> usize {
        self.public.key_length()
    }

    fn estimated_strength(&self) -> usize {
        self.public.estimated_strength()
    }

    fn message_parts(&self) -> usize {
        self.public.message_parts()
    }

    fn message_part_size(&self) -> usize {
        self.public.message_part_size()
    }

    fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        self.public.algorithm_identifier()
    }

    fn public_key_bits(&self) -> Result<Vec<u8>> {
        self.public.public_key_bits()
    }

    fn check_key(&self, mut rng: Option<&mut dyn CryptoRngCore>, strong: bool) -> bool {
        let public = &self.public;
        if !check_dl_private(&public.group, &public.y, &self.x, reborrow(&mut rng), strong)
            || &self.x >= public.group.q()
        {
            return false;
        }
        match (strong, rng) {
            (true, Some(rng)) => signature_consistency_check(rng, self, "EMSA1(SHA-256)"),
            _ => true,
        }
    }

    fn create_verification_op(&self, emsa: &str) -> Result<Box<dyn VerificationOp + '_>> {
        self.public.create_verification_op(emsa)
    }
}

impl PrivateKey for DsaPrivateKey {
    fn private_key_bits(&self) -> Result<Zeroizing<Vec<u8>>> {
        encode_integer(&self.x).map(Zeroizing::new)
    }

    fn public_key(&self) -> Box<dyn PublicKey> {
        Box::new(self.public.clone())
    }

    fn create_signature_op(&self, emsa: &str) -> Result<Box<dyn SignatureOp + '_>> {
        require_padding(self.algo_name(), emsa, SIGNATURE_PADDINGS)?;
        Ok(Box::new(DsaSignatureOp {
            key: self,
            mod_q: ModularReducer::new(self.public.group.q())?,
        }))
    }
}

struct DsaSignatureOp<'a> {
    key: &'a DsaPrivateKey,
    mod_q: ModularReducer,
}

impl SignatureOp for DsaSignatureOp<'_> {
    fn max_input_bits(&self) -> usize {
        self.key.public.group.q_bits()
    }

    fn sign(&self, msg: &[u8], rng: &mut dyn CryptoRngCore) -> Result<Vec<u8>> {
        let group = &self.key.public.group;
        let q = group.q();

        let mut m = from_bytes_with_max_bits(msg, group.q_bits());
        while &m >= q {
            m -= q;
        }

        let k = Zeroizing::new(random_integer(rng, &BigUint::one(), q)?);
        let k_inv = Zeroizing::new(inverse_mod_uint(&k, q)?);
        let r = self.mod_q.reduce(&group.power_g_p(&k));

        // x·r + m computed as (x·r·b + m·b) / b
        let b = Zeroizing::new(random_integer(rng, &BigUint::from(2u32), q)?);
        let b_inv = Zeroizing::new(inverse_mod_uint(&b, q)?);
        let xr = Zeroizing::new(
            self.mod_q
                .multiply(&self.mod_q.multiply(&self.key.x, &b), &r),
        );
        let mb = self.mod_q.multiply(&b, &m);
        let s = self.mod_q.reduce(&(&*xr + mb));
        let s = self.mod_q.multiply(&b_inv, &s);
        let s = self.mod_q.multiply(&k_inv, &s);

        if r.is_zero() || s.is_zero() {
            return Err(Error::internal("computed zero r/s during DSA signature"));
        }

        let q_bytes = group.q_bytes();
        let mut sig = encode_1363(&r, q_bytes)?;
        sig.extend_from_slice(&encode_1363(&s, q_bytes)?);
        Ok(sig)
    }
}

struct DsaVerificationOp<'a> {
    key: &'a DsaPublicKey,
    mod_q: ModularReducer,
}

impl<'a> DsaVerificationOp<'a> {
    fn new(key: &'a DsaPublicKey) -> Result<Self> {
        Ok(DsaVerificationOp {
            key,
            mod_q: ModularReducer::new(key.group.q())?,
        })
    }
}

impl VerificationOp for DsaVerificationOp<'_> {
    fn max_input_bits(&self) -> usize {
        self.key.group.q_bits()
    }

    fn verify(&self, msg: &[u8], sig: &[u8]) -> Result<bool> {
        let group = &self.key.group;
        let q = group.q();
        let q_bytes = group.q_bytes();

        if sig.len() != 2 * q_bytes {
            return Ok(false);
        }

        let r = BigUint::from_bytes_be(&sig[..q_bytes]);
        let s = BigUint::from_bytes_be(&sig[q_bytes..]);
        if r.is_zero() || &r >= q || s.is_zero() || &s >= q {
            return Ok(false);
        }

        let mut m = from_bytes_with_max_bits(msg, group.q_bits());
        while &m >= q {
            m -= q;
        }

        let w = inverse_mod_uint(&s, q)?;
        let u1 = self.mod_q.multiply(&m, &w);
        let u2 = self.mod_q.multiply(&r, &w);

        let v = (group.power_g_p(&u1) * group.power_b_p(&self.key.y, &u2)) % group.p();
        Ok(self.mod_q.reduce(&v) == r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubkey::{PkSigner, PkVerifier, SignatureFormat};
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    fn test_key() -> DsaPrivateKey {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let group = DlGroup::generate(&mut rng, 512, 160).unwrap();
        DsaPrivateKey::new(&mut rng, group).unwrap()
    }

    #[test]
    fn test_sign_verify() {
        let key = test_key();
        let public_key = key.public_key();
        let mut rng = ChaCha8Rng::from_seed([42; 32]);

        assert_eq!(key.message_parts(), 2);
        assert_eq!(key.message_part_size(), 20);

        for format in [SignatureFormat::Ieee1363, SignatureFormat::DerSequence] {
            let mut signer = PkSigner::with_format(&key, "EMSA1(SHA-256)", format).unwrap();
            let sig = signer.sign_message(b"abc", &mut rng).unwrap();
            if format == SignatureFormat::Ieee1363 {
                assert_eq!(sig.len(), 40);
            }

            let mut verifier =
                PkVerifier::with_format(&*public_key, "EMSA1(SHA-256)", format).unwrap();
            assert!(verifier.verify_message(b"abc", &sig).unwrap());
            assert!(!verifier.verify_message(b"abd", &sig).unwrap());
        }
    }

    #[test]
    fn test_corrupted_signatures() {
        let key = test_key();
        let mut rng = ChaCha8Rng::from_seed([7; 32]);
        let sig = PkSigner::with_format(&key, "EMSA1(SHA-1)", SignatureFormat::Ieee1363)
            .unwrap()
            .sign_message(b"abc", &mut rng)
            .unwrap();

        let mut verifier =
            PkVerifier::with_format(&key, "EMSA1(SHA-1)", SignatureFormat::Ieee1363).unwrap();
        for i in 0..sig.len() {
            let mut bad = sig.clone();
            bad[i] ^= 0x10;
            assert!(!verifier.verify_message(b"abc", &bad).unwrap(), "byte {i}");
        }
        assert!(!verifier.verify_message(b"abc", &sig[..39]).unwrap());
        assert!(!verifier.verify_message(b"abc", &[0u8; 40]).unwrap());
        assert!(verifier.verify_message(b"abc", &sig).unwrap());
    }

    #[test]
    fn test_der_signature_errors() {
        let key = test_key();
        let mut verifier = PkVerifier::new(&key, "EMSA1(SHA-256)").unwrap();
        // one INTEGER instead of two
        assert!(matches!(
            verifier.verify_message(b"abc", &[0x30, 0x03, 0x02, 0x01, 0x01]),
            Err(Error::Decoding(_))
        ));
        assert!(verifier.verify_message(b"abc", &[0x30, 0x03]).is_err());
    }

    #[test]
    fn test_check_key_and_encoding() {
        let key = test_key();
        let mut rng = ChaCha8Rng::from_seed([1; 32]);
        assert!(key.check_key(Some(&mut rng), true));
        assert!(key.public().check_key(None, false));

        let alg_id = key.algorithm_identifier().unwrap();
        assert_eq!(alg_id.oid, oids::DSA);

        let public = DsaPublicKey::from_key_bits(&alg_id, &key.public_key_bits().unwrap()).unwrap();
        assert_eq!(&public, key.public());

        let private =
            DsaPrivateKey::from_key_bits(&alg_id, &key.private_key_bits().unwrap()).unwrap();
        assert_eq!(private, key);

        let wrong = DsaPrivateKey::from_x(key.public().group().clone(), key.public().group().q().clone());
        assert!(!wrong.check_key(None, false));
    }

    #[test]
    fn test_unsupported_padding() {
        let key = test_key();
        assert!(matches!(
            key.create_signature_op("EMSA3(SHA-256)"),
            Err(Error::AlgorithmNotFound(_))
        ));
        assert!(key.create_encryption_op("Raw").is_err());
    }
}
