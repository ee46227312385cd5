//! ElGamal encryption over a DL group.

use alloc::{boxed::Box, vec::Vec};
use core::fmt;

use num_bigint::BigUint;
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::algorithms::name::require_padding;
use crate::dl_group::{
    check_dl_private, check_dl_public, encode_integer, load_dl_key, DlGroup, DlGroupFormat,
};
use crate::errors::{Error, Result};
use crate::math::bigint::{encode_1363, random_integer};
use crate::math::numthry::inverse_mod_uint;
use crate::oids;
use crate::traits::{DecryptionOp, EncryptionOp, PrivateKey, PublicKey};

const ENCRYPTION_PADDINGS: &[&str] = &[
    "EME-PKCS1-v1_5",
    "PKCS1v15",
    "EME1",
    "OAEP",
    "EME-OAEP",
    "Raw",
];

/// An ElGamal public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElGamalPublicKey {
    group: DlGroup,
    y: BigUint,
}

/// An ElGamal private key.
#[derive(Clone)]
pub struct ElGamalPrivateKey {
    public: ElGamalPublicKey,
    x: BigUint,
}

impl ElGamalPublicKey {
    /// Creates a public key from its group and public value.
    pub fn new(group: DlGroup, y: BigUint) -> Self {
        ElGamalPublicKey { group, y }
    }

    /// Decodes a key from its `AlgorithmIdentifier` and key bits.
    pub fn from_key_bits(alg_id: &AlgorithmIdentifierOwned, key_bits: &[u8]) -> Result<Self> {
        let (group, y) = load_dl_key(alg_id, key_bits, DlGroupFormat::AnsiX942)?;
        Ok(ElGamalPublicKey { group, y })
    }

    /// The group.
    pub fn group(&self) -> &DlGroup {
        &self.group
    }

    /// The public value.
    pub fn y(&self) -> &BigUint {
        &self.y
    }
}

impl ElGamalPrivateKey {
    /// Generates a key in `group`.
    pub fn new<R: CryptoRngCore + ?Sized>(rng: &mut R, group: DlGroup) -> Result<Self> {
        let x = group.random_exponent(rng)?;
        Ok(Self::from_x(group, x))
    }

    /// Creates a key from a known private value.
    pub fn from_x(group: DlGroup, x: BigUint) -> Self {
        let y = group.power_g_p(&x);
        ElGamalPrivateKey {
            public: ElGamalPublicKey { group, y },
            x,
        }
    }

    /// Decodes a key from its `AlgorithmIdentifier` and key bits.
    pub fn from_key_bits(alg_id: &AlgorithmIdentifierOwned, key_bits: &[u8]) -> Result<Self> {
        let (group, x) = load_dl_key(alg_id, key_bits, DlGroupFormat::AnsiX942)?;
        Ok(Self::from_x(group, x))
    }

    /// The public half.
    pub fn public(&self) -> &ElGamalPublicKey {
        &self.public
    }
}

impl fmt::Debug for ElGamalPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElGamalPrivateKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ElGamalPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public && self.x == other.x
    }
}

impl Eq for ElGamalPrivateKey {}

impl Drop for ElGamalPrivateKey {
    fn drop(&mut self) {
        self.x.zeroize();
    }
}

impl ZeroizeOnDrop for ElGamalPrivateKey {}

impl PublicKey for ElGamalPublicKey {
    fn algo_name(&self) -> &'static str {
        "ElGamal"
    }

    fn key_length(&self) -> usize {
        self.group.p_bits()
    }

    fn estimated_strength(&self) -> usize {
        self.group.estimated_strength()
    }

    fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        self.group
            .algorithm_identifier(oids::ELGAMAL, DlGroupFormat::AnsiX942)
    }

    fn public_key_bits(&self) -> Result<Vec<u8>> {
        encode_integer(&self.y)
    }

    fn check_key(&self, rng: Option<&mut dyn CryptoRngCore>, strong: bool) -> bool {
        check_dl_public(&self.group, &self.y, rng, strong)
    }

    fn create_encryption_op(&self, eme: &str) -> Result<Box<dyn EncryptionOp + '_>> {
        require_padding(self.algo_name(), eme, ENCRYPTION_PADDINGS)?;
        Ok(Box::new(ElGamalEncryptionOp { key: self }))
    }
}

impl PublicKey for ElGamalPrivateKey {
    fn algo_name(&self) -> &'static str {
        self.public.algo_name()
    }

    fn key_length(&self) -> usize {
        self.public.key_length()
    }

    fn estimated_strength(&self) -> usize {
        self.public.estimated_strength()
    }

    fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        self.public.algorithm_identifier()
    }

    fn public_key_bits(&self) -> Result<Vec<u8>> {
        self.public.public_key_bits()
    }

    fn check_key(&self, rng: Option<&mut dyn CryptoRngCore>, strong: bool) -> bool {
        check_dl_private(&self.public.group, &self.public.y, &self.x, rng, strong)
    }

    fn create_encryption_op(&self, eme: &str) -> Result<Box<dyn EncryptionOp + '_>> {
        self.public.create_encryption_op(eme)
    }
}

impl PrivateKey for ElGamalPrivateKey {
    fn private_key_bits(&self) -> Result<Zeroizing<Vec<u8>>> {
        encode_integer(&self.x).map(Zeroizing::new)
    }

    fn public_key(&self) -> Box<dyn PublicKey> {
        Box::new(self.public.clone())
    }

    fn create_decryption_op(&self, eme: &str) -> Result<Box<dyn DecryptionOp + '_>> {
        require_padding(self.algo_name(), eme, ENCRYPTION_PADDINGS)?;
        Ok(Box::new(ElGamalDecryptionOp { key: self }))
    }
}

struct ElGamalEncryptionOp<'a> {
    key: &'a ElGamalPublicKey,
}

impl EncryptionOp for ElGamalEncryptionOp<'_> {
    fn max_raw_input_bits(&self) -> usize {
        self.key.group.p_bits() - 1
    }

    /// `(g^k, m·y^k)` for a fresh exponent `k`.
    fn encrypt(&self, msg: &[u8], rng: &mut dyn CryptoRngCore) -> Result<Vec<u8>> {
        let group = &self.key.group;
        let p = group.p();
        let m = Zeroizing::new(BigUint::from_bytes_be(msg));

        if &*m >= p {
            return Err(Error::invalid_argument("ElGamal encryption: input is too large"));
        }

        let k = Zeroizing::new(group.random_exponent(rng)?);
        let a = group.power_g_p(&k);
        let b = (&*m * group.power_b_p(&self.key.y, &k)) % p;

        let p_bytes = group.p_bytes();
        let mut out = encode_1363(&a, p_bytes)?;
        out.extend_from_slice(&encode_1363(&b, p_bytes)?);
        Ok(out)
    }
}

struct ElGamalDecryptionOp<'a> {
    key: &'a ElGamalPrivateKey,
}

impl DecryptionOp for ElGamalDecryptionOp<'_> {
    fn max_raw_input_bits(&self) -> usize {
        self.key.public.group.p_bits() - 1
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let group = &self.key.public.group;
        let p = group.p();
        let p_bytes = group.p_bytes();

        if ciphertext.len() != 2 * p_bytes {
            return Err(Error::invalid_argument("ElGamal decryption: invalid message"));
        }

        let a = BigUint::from_bytes_be(&ciphertext[..p_bytes]);
        let b = BigUint::from_bytes_be(&ciphertext[p_bytes..]);
        if &a >= p || &b >= p {
            return Err(Error::invalid_argument("ElGamal decryption: invalid message"));
        }

        let shared = match rng {
            Some(rng) => {
                // (a·r)^x · (r^x)⁻¹ keeps the exponentiation base unknown
                let r = random_integer(rng, &BigUint::from(2u32), p)?;
                let r_x = Zeroizing::new(group.power_b_p(&r, &self.key.x));
                let blinded = (&a * &r) % p;
                let s = Zeroizing::new(group.power_b_p(&blinded, &self.key.x));
                let r_x_inv = Zeroizing::new(inverse_mod_uint(&r_x, p)?);
                Zeroizing::new((&*s * &*r_x_inv) % p)
            }
            None => {
                log::warn!("ElGamal decryption without an RNG, skipping blinding");
                Zeroizing::new(group.power_b_p(&a, &self.key.x))
            }
        };

        let shared_inv = Zeroizing::new(inverse_mod_uint(&shared, p)?);
        let m = Zeroizing::new((&b * &*shared_inv) % p);
        Ok(Zeroizing::new(encode_1363(&m, p_bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubkey::{PkDecryptor, PkEncryptor};
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    fn test_key() -> ElGamalPrivateKey {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let group = DlGroup::from_name("modp/ietf/2048").unwrap();
        ElGamalPrivateKey::new(&mut rng, group).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = test_key();
        let public_key = key.public_key();
        let mut rng = ChaCha8Rng::from_seed([42; 32]);

        for padding in ["Raw", "EME-PKCS1-v1_5", "OAEP(SHA-1)"] {
            let enc = PkEncryptor::new(&*public_key, padding).unwrap();
            let dec = PkDecryptor::new(&key, padding).unwrap();

            let msg = b"attack at dawn";
            let ct = enc.encrypt(msg, &mut rng).unwrap();
            assert_eq!(ct.len(), 512);
            assert_eq!(&dec.decrypt(&ct, Some(&mut rng)).unwrap()[..], msg, "{padding}");
            assert_eq!(&dec.decrypt(&ct, None).unwrap()[..], msg, "{padding}");
        }
    }

    #[test]
    fn test_randomized_ciphertexts() {
        let key = test_key();
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let enc = PkEncryptor::new(&key, "Raw").unwrap();
        let c1 = enc.encrypt(b"x", &mut rng).unwrap();
        let c2 = enc.encrypt(b"x", &mut rng).unwrap();
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_invalid_ciphertexts() {
        let key = test_key();
        let op = key.create_decryption_op("Raw").unwrap();
        assert!(matches!(
            op.decrypt(&[0u8; 511], None),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            op.decrypt(&[0xff; 512], None),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_check_and_encoding() {
        let key = test_key();
        let mut rng = ChaCha8Rng::from_seed([1; 32]);
        assert!(key.check_key(Some(&mut rng), false));
        assert!(!ElGamalPrivateKey::from_x(key.public().group().clone(), BigUint::from(1u32))
            .check_key(None, false));

        let alg_id = key.algorithm_identifier().unwrap();
        assert_eq!(alg_id.oid, oids::ELGAMAL);
        let public =
            ElGamalPublicKey::from_key_bits(&alg_id, &key.public_key_bits().unwrap()).unwrap();
        assert_eq!(&public, key.public());
        let private =
            ElGamalPrivateKey::from_key_bits(&alg_id, &key.private_key_bits().unwrap()).unwrap();
        assert_eq!(private, key);

        assert!(matches!(
            key.create_signature_op("EMSA1(SHA-1)"),
            Err(Error::InvalidArgument(_))
        ));
    }
}
