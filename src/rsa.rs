//! RSA keys.
//!
//! Keys are stored with their CRT parameters. Private operations blind
//! their input when an RNG is available and always re-encrypt the result
//! to catch faults in the CRT computation.

use alloc::{boxed::Box, string::ToString, vec::Vec};
use core::fmt;

use der::{asn1::Null, Any, Decode, Encode};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::algorithms::generate::generate_rsa_primes;
use crate::algorithms::name::require_padding;
use crate::algorithms::rsa::{rsa_decrypt_and_check, rsa_encrypt};
use crate::errors::{Error, Result};
use crate::math::bigint::encode_1363;
use crate::math::numthry::{gcd_uint, inverse_mod_uint};
use crate::math::primality::is_prime;
use crate::math::work_factor::if_work_factor;
use crate::rng::reborrow;
use crate::traits::{
    DecryptionOp, EncryptionOp, PrivateKey, PublicKey, SignatureOp, VerificationOp,
};

/// Default public exponent of generated keys.
pub const DEFAULT_EXPONENT: u32 = 65537;

const SIGNATURE_PADDINGS: &[&str] = &[
    "EMSA3",
    "EMSA_PKCS1",
    "PKCS1v15",
    "EMSA-PKCS1-v1_5",
    "EMSA4",
    "PSSR",
    "PSS",
    "EMSA-PSS",
    "Raw",
];

const ENCRYPTION_PADDINGS: &[&str] = &[
    "EME-PKCS1-v1_5",
    "PKCS1v15",
    "EME1",
    "OAEP",
    "EME-OAEP",
    "Raw",
];

/// Represents the public part of an RSA key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsaPublicKey {
    /// Modulus: product of prime numbers `p` and `q`
    n: BigUint,
    /// Public exponent: power to which a plaintext message is raised in
    /// order to encrypt it.
    e: BigUint,
}

/// Represents a whole RSA key, public and private parts.
#[derive(Clone)]
pub struct RsaPrivateKey {
    /// Public components of the private key.
    public: RsaPublicKey,
    /// Private exponent
    d: BigUint,
    /// First prime factor of `n`
    p: BigUint,
    /// Second prime factor of `n`
    q: BigUint,
    /// `d mod (p - 1)`
    dp: BigUint,
    /// `d mod (q - 1)`
    dq: BigUint,
    /// `q⁻¹ mod p`
    qinv: BigUint,
}

impl RsaPublicKey {
    /// Create a new public key from its components.
    ///
    /// `n` must be odd and at least 5, `e` must be odd and at least 3.
    pub fn new(n: BigUint, e: BigUint) -> Result<Self> {
        if n < BigUint::from(5u32) || n.is_even() || e < BigUint::from(3u32) || e.is_even() {
            return Err(Error::decoding("Invalid RSA public key parameters"));
        }
        Ok(RsaPublicKey { n, e })
    }

    /// Returns the modulus of the key.
    pub fn n(&self) -> &BigUint {
        &self.n
    }

    /// Returns the public exponent of the key.
    pub fn e(&self) -> &BigUint {
        &self.e
    }

    /// Returns the modulus size in bytes. Raw signatures and ciphertexts
    /// for/by this public key will have the same size.
    pub fn size(&self) -> usize {
        (self.n.bits() + 7) / 8
    }

    /// PKCS#1 `RSAPublicKey` DER encoding.
    pub fn to_pkcs1_der(&self) -> Result<Vec<u8>> {
        let modulus = self.n.to_bytes_be();
        let public_exponent = self.e.to_bytes_be();
        Ok(pkcs1::RsaPublicKey {
            modulus: pkcs1::UintRef::new(&modulus)?,
            public_exponent: pkcs1::UintRef::new(&public_exponent)?,
        }
        .to_der()?)
    }

    /// Decodes a PKCS#1 `RSAPublicKey`.
    pub fn from_pkcs1_der(bytes: &[u8]) -> Result<Self> {
        let key = pkcs1::RsaPublicKey::from_der(bytes)?;
        RsaPublicKey::new(
            BigUint::from_bytes_be(key.modulus.as_bytes()),
            BigUint::from_bytes_be(key.public_exponent.as_bytes()),
        )
    }

    fn check_public(&self) -> bool {
        self.n >= BigUint::from(35u32) && self.n.is_odd() && self.e >= BigUint::from(3u32) && self.e.is_odd()
    }
}

impl RsaPrivateKey {
    /// Generate a new RSA key pair of the given bit size using the passed
    /// in `rng` and the public exponent 65537.
    pub fn new<R: CryptoRngCore + ?Sized>(rng: &mut R, bit_size: usize) -> Result<Self> {
        Self::new_with_exp(rng, bit_size, &BigUint::from(DEFAULT_EXPONENT))
    }

    /// Generate a new RSA key pair of the given bit size and the public
    /// exponent using the passed in `rng`.
    pub fn new_with_exp<R: CryptoRngCore + ?Sized>(
        rng: &mut R,
        bit_size: usize,
        exp: &BigUint,
    ) -> Result<Self> {
        let (p, q) = generate_rsa_primes(rng, bit_size, exp)?;
        Self::from_components(p, q, exp.clone(), None)
    }

    /// Constructs an RSA key pair from its two primes and the public
    /// exponent.
    ///
    /// Without `d`, the private exponent is computed as
    /// `e⁻¹ mod lcm(p - 1, q - 1)`.
    pub fn from_components(
        p: BigUint,
        q: BigUint,
        e: BigUint,
        d: Option<BigUint>,
    ) -> Result<Self> {
        let three = BigUint::from(3u32);
        if p < three || q < three || p == q {
            return Err(Error::invalid_argument("RSA: invalid prime factors"));
        }
        if e < three || e.is_even() {
            return Err(Error::invalid_argument("RSA: invalid encryption exponent"));
        }

        let p1 = Zeroizing::new(&p - BigUint::one());
        let q1 = Zeroizing::new(&q - BigUint::one());

        let d = match d {
            Some(d) => d,
            None => {
                let lambda = Zeroizing::new((&*p1 * &*q1) / gcd_uint(&p1, &q1));
                inverse_mod_uint(&e, &lambda)?
            }
        };
        if d.is_zero() {
            return Err(Error::invalid_argument(
                "RSA: encryption exponent is not invertible",
            ));
        }

        let dp = &d % &*p1;
        let dq = &d % &*q1;
        let qinv = inverse_mod_uint(&(&q % &p), &p)?;

        let n = &p * &q;
        Ok(RsaPrivateKey {
            public: RsaPublicKey::new(n, e)?,
            d,
            p,
            q,
            dp,
            dq,
            qinv,
        })
    }

    /// Get the public key from the private key, cloning `n` and `e`.
    pub fn to_public_key(&self) -> RsaPublicKey {
        self.public.clone()
    }

    /// The public part of the key.
    pub fn public(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Returns the modulus of the key.
    pub fn n(&self) -> &BigUint {
        self.public.n()
    }

    /// Returns the public exponent of the key.
    pub fn e(&self) -> &BigUint {
        self.public.e()
    }

    /// Returns the private exponent of the key.
    pub fn d(&self) -> &BigUint {
        &self.d
    }

    /// Returns the first prime factor.
    pub fn p(&self) -> &BigUint {
        &self.p
    }

    /// Returns the second prime factor.
    pub fn q(&self) -> &BigUint {
        &self.q
    }

    /// Returns `d mod (p - 1)`.
    pub fn dp(&self) -> &BigUint {
        &self.dp
    }

    /// Returns `d mod (q - 1)`.
    pub fn dq(&self) -> &BigUint {
        &self.dq
    }

    /// Returns the CRT coefficient `q⁻¹ mod p`.
    pub fn qinv(&self) -> &BigUint {
        &self.qinv
    }

    /// PKCS#1 `RSAPrivateKey` DER encoding.
    pub fn to_pkcs1_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let modulus = self.n().to_bytes_be();
        let public_exponent = self.e().to_bytes_be();
        let private_exponent = Zeroizing::new(self.d.to_bytes_be());
        let prime1 = Zeroizing::new(self.p.to_bytes_be());
        let prime2 = Zeroizing::new(self.q.to_bytes_be());
        let exponent1 = Zeroizing::new(self.dp.to_bytes_be());
        let exponent2 = Zeroizing::new(self.dq.to_bytes_be());
        let coefficient = Zeroizing::new(self.qinv.to_bytes_be());

        let private_key = pkcs1::RsaPrivateKey {
            modulus: pkcs1::UintRef::new(&modulus)?,
            public_exponent: pkcs1::UintRef::new(&public_exponent)?,
            private_exponent: pkcs1::UintRef::new(&private_exponent)?,
            prime1: pkcs1::UintRef::new(&prime1)?,
            prime2: pkcs1::UintRef::new(&prime2)?,
            exponent1: pkcs1::UintRef::new(&exponent1)?,
            exponent2: pkcs1::UintRef::new(&exponent2)?,
            coefficient: pkcs1::UintRef::new(&coefficient)?,
            other_prime_infos: None,
        };
        Ok(Zeroizing::new(private_key.to_der()?))
    }

    /// Decodes a two-prime PKCS#1 `RSAPrivateKey`. The CRT parameters are
    /// recomputed from the primes and the private exponent.
    pub fn from_pkcs1_der(bytes: &[u8]) -> Result<Self> {
        let pkcs1_key = pkcs1::RsaPrivateKey::from_der(bytes)?;

        // Multi-prime RSA keys not currently supported
        if pkcs1_key.version() != pkcs1::Version::TwoPrime {
            return Err(pkcs1::Error::Version.into());
        }

        let n = BigUint::from_bytes_be(pkcs1_key.modulus.as_bytes());
        let key = RsaPrivateKey::from_components(
            BigUint::from_bytes_be(pkcs1_key.prime1.as_bytes()),
            BigUint::from_bytes_be(pkcs1_key.prime2.as_bytes()),
            BigUint::from_bytes_be(pkcs1_key.public_exponent.as_bytes()),
            Some(BigUint::from_bytes_be(pkcs1_key.private_exponent.as_bytes())),
        )
        .map_err(|err| Error::decoding(err.to_string()))?;

        if key.n() != &n {
            return Err(Error::decoding("RSA private key: modulus does not match primes"));
        }
        Ok(key)
    }
}

impl fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl PartialEq for RsaPrivateKey {
    #[inline]
    fn eq(&self, other: &RsaPrivateKey) -> bool {
        self.public == other.public && self.d == other.d && self.p == other.p && self.q == other.q
    }
}

impl Eq for RsaPrivateKey {}

impl Drop for RsaPrivateKey {
    fn drop(&mut self) {
        self.d.zeroize();
        self.p.zeroize();
        self.q.zeroize();
        self.dp.zeroize();
        self.dq.zeroize();
        self.qinv.zeroize();
    }
}

impl ZeroizeOnDrop for RsaPrivateKey {}

impl From<&RsaPrivateKey> for RsaPublicKey {
    fn from(private_key: &RsaPrivateKey) -> Self {
        private_key.to_public_key()
    }
}

impl PublicKey for RsaPublicKey {
    fn algo_name(&self) -> &'static str {
        "RSA"
    }

    fn key_length(&self) -> usize {
        self.n.bits()
    }

    fn estimated_strength(&self) -> usize {
        if_work_factor(self.key_length())
    }

    fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        Ok(AlgorithmIdentifierOwned {
            oid: pkcs1::ALGORITHM_OID,
            parameters: Some(Any::from(Null)),
        })
    }

    fn public_key_bits(&self) -> Result<Vec<u8>> {
        self.to_pkcs1_der()
    }

    fn check_key(&self, _rng: Option<&mut dyn CryptoRngCore>, _strong: bool) -> bool {
        self.check_public()
    }

    fn create_verification_op(&self, emsa: &str) -> Result<Box<dyn VerificationOp + '_>> {
        require_padding(self.algo_name(), emsa, SIGNATURE_PADDINGS)?;
        Ok(Box::new(RsaVerificationOp { key: self }))
    }

    fn create_encryption_op(&self, eme: &str) -> Result<Box<dyn EncryptionOp + '_>> {
        require_padding(self.algo_name(), eme, ENCRYPTION_PADDINGS)?;
        Ok(Box::new(RsaEncryptionOp { key: self }))
    }
}

impl PublicKey for RsaPrivateKey {
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

    fn check_key(&self, mut rng: Option<&mut dyn CryptoRngCore>, strong: bool) -> bool {
        if !self.public.check_public() {
            return false;
        }

        let three = BigUint::from(3u32);
        if self.d < BigUint::from(2u32) || self.p < three || self.q < three {
            return false;
        }
        if &(&self.p * &self.q) != self.n() {
            return false;
        }

        let p1 = Zeroizing::new(&self.p - BigUint::one());
        let q1 = Zeroizing::new(&self.q - BigUint::one());
        if self.dp != &self.d % &*p1 || self.dq != &self.d % &*q1 {
            return false;
        }
        if ((&self.q * &self.qinv) % &self.p) != BigUint::one() {
            return false;
        }

        let prob = if strong { 128 } else { 12 };
        if !is_prime(&self.p, reborrow(&mut rng), prob, false)
            || !is_prime(&self.q, reborrow(&mut rng), prob, false)
        {
            return false;
        }

        if strong {
            let lambda = Zeroizing::new((&*p1 * &*q1) / gcd_uint(&p1, &q1));
            if ((self.e() * &self.d) % &*lambda) != BigUint::one() {
                return false;
            }
        }
        true
    }

    fn create_verification_op(&self, emsa: &str) -> Result<Box<dyn VerificationOp + '_>> {
        self.public.create_verification_op(emsa)
    }

    fn create_encryption_op(&self, eme: &str) -> Result<Box<dyn EncryptionOp + '_>> {
        self.public.create_encryption_op(eme)
    }
}

impl PrivateKey for RsaPrivateKey {
    fn private_key_bits(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.to_pkcs1_der()
    }

    fn public_key(&self) -> Box<dyn PublicKey> {
        Box::new(self.to_public_key())
    }

    fn create_signature_op(&self, emsa: &str) -> Result<Box<dyn SignatureOp + '_>> {
        require_padding(self.algo_name(), emsa, SIGNATURE_PADDINGS)?;
        Ok(Box::new(RsaSignatureOp { key: self }))
    }

    fn create_decryption_op(&self, eme: &str) -> Result<Box<dyn DecryptionOp + '_>> {
        require_padding(self.algo_name(), eme, ENCRYPTION_PADDINGS)?;
        Ok(Box::new(RsaDecryptionOp { key: self }))
    }
}

struct RsaSignatureOp<'a> {
    key: &'a RsaPrivateKey,
}

impl SignatureOp for RsaSignatureOp<'_> {
    fn max_input_bits(&self) -> usize {
        self.key.n().bits() - 1
    }

    fn sign(&self, msg: &[u8], rng: &mut dyn CryptoRngCore) -> Result<Vec<u8>> {
        let m = Zeroizing::new(BigUint::from_bytes_be(msg));
        let s = rsa_decrypt_and_check(self.key, Some(rng), &m)?;
        encode_1363(&s, self.key.public.size())
    }
}

/// RSA verification recovers the representative with the public
/// exponent and leaves the comparison to the encoding method.
struct RsaVerificationOp<'a> {
    key: &'a RsaPublicKey,
}

impl VerificationOp for RsaVerificationOp<'_> {
    fn max_input_bits(&self) -> usize {
        self.key.n.bits() - 1
    }

    fn with_recovery(&self) -> bool {
        true
    }

    fn recover(&self, sig: &[u8]) -> Result<Vec<u8>> {
        if sig.len() > self.key.size() {
            return Err(Error::invalid_argument("RSA signature too large to be valid"));
        }
        let s = BigUint::from_bytes_be(sig);
        Ok(rsa_encrypt(self.key, &s)?.to_bytes_be())
    }
}

struct RsaEncryptionOp<'a> {
    key: &'a RsaPublicKey,
}

impl EncryptionOp for RsaEncryptionOp<'_> {
    fn max_raw_input_bits(&self) -> usize {
        self.key.n.bits() - 1
    }

    fn encrypt(&self, msg: &[u8], _rng: &mut dyn CryptoRngCore) -> Result<Vec<u8>> {
        let m = Zeroizing::new(BigUint::from_bytes_be(msg));
        let c = rsa_encrypt(self.key, &m)?;
        encode_1363(&c, self.key.size())
    }
}

struct RsaDecryptionOp<'a> {
    key: &'a RsaPrivateKey,
}

impl DecryptionOp for RsaDecryptionOp<'_> {
    fn max_raw_input_bits(&self) -> usize {
        self.key.n().bits() - 1
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let c = BigUint::from_bytes_be(ciphertext);
        let m = Zeroizing::new(rsa_decrypt_and_check(self.key, rng, &c)?);
        Ok(Zeroizing::new(encode_1363(&m, self.key.public.size())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    fn test_key() -> RsaPrivateKey {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        RsaPrivateKey::new(&mut rng, 512).unwrap()
    }

    #[test]
    fn test_generate_and_check() {
        let key = test_key();
        let mut rng = ChaCha8Rng::from_seed([7; 32]);

        assert_eq!(key.key_length(), 512);
        assert_eq!(key.e(), &BigUint::from(DEFAULT_EXPONENT));
        assert!(key.check_key(Some(&mut rng), true));
        assert!(key.check_key(None, false));
        assert!(key.to_public_key().check_key(None, true));
        assert_eq!(key.algo_name(), "RSA");
    }

    #[test]
    fn test_check_key_detects_corruption() {
        let key = test_key();

        let mut bad = key.clone();
        bad.d = &key.d + BigUint::from(2u32);
        assert!(!bad.check_key(None, false));

        // consistent CRT parameters for the wrong exponent only fail the
        // strong check
        bad.dp = &bad.d % (&key.p - BigUint::one());
        bad.dq = &bad.d % (&key.q - BigUint::one());
        assert!(bad.check_key(None, false));
        assert!(!bad.check_key(None, true));

        let mut bad = key.clone();
        bad.qinv = &key.qinv + BigUint::one();
        assert!(!bad.check_key(None, false));
    }

    #[test]
    fn test_from_components() {
        assert!(RsaPrivateKey::from_components(
            BigUint::from(61u32),
            BigUint::from(61u32),
            BigUint::from(17u32),
            None
        )
        .is_err());
        assert!(RsaPrivateKey::from_components(
            BigUint::from(61u32),
            BigUint::from(53u32),
            BigUint::from(16u32),
            None
        )
        .is_err());

        // 3 divides lcm(60, 52) = 780, so e = 3 has no inverse
        assert!(RsaPrivateKey::from_components(
            BigUint::from(61u32),
            BigUint::from(53u32),
            BigUint::from(3u32),
            None
        )
        .is_err());

        let key = RsaPrivateKey::from_components(
            BigUint::from(61u32),
            BigUint::from(53u32),
            BigUint::from(17u32),
            None,
        )
        .unwrap();
        assert_eq!(key.dp(), &BigUint::from(413u32 % 60));
        assert_eq!(key.dq(), &BigUint::from(413u32 % 52));
        // 53 · 38 = 2014 = 33 · 61 + 1
        assert_eq!(key.qinv(), &BigUint::from(38u32));
    }

    #[test]
    fn test_public_key_validation() {
        assert!(RsaPublicKey::new(BigUint::from(3233u32), BigUint::from(17u32)).is_ok());
        assert!(RsaPublicKey::new(BigUint::from(3234u32), BigUint::from(17u32)).is_err());
        assert!(RsaPublicKey::new(BigUint::from(3233u32), BigUint::from(2u32)).is_err());
        assert!(RsaPublicKey::new(BigUint::from(3u32), BigUint::from(3u32)).is_err());
    }

    #[test]
    fn test_pkcs1_encoding() {
        let key = test_key();

        let der = key.to_pkcs1_der().unwrap();
        let decoded = RsaPrivateKey::from_pkcs1_der(&der).unwrap();
        assert_eq!(decoded, key);
        assert_eq!(decoded.qinv(), key.qinv());

        let der = key.public().to_pkcs1_der().unwrap();
        assert_eq!(RsaPublicKey::from_pkcs1_der(&der).unwrap(), key.to_public_key());
        assert_eq!(key.public_key_bits().unwrap(), der);

        assert!(matches!(
            RsaPublicKey::from_pkcs1_der(&der[..der.len() - 1]),
            Err(Error::Decoding(_))
        ));
    }

    #[test]
    fn test_raw_ops() {
        let key = test_key();
        let mut rng = ChaCha8Rng::from_seed([42; 32]);

        let signer = key.create_signature_op("EMSA3(SHA-256)").unwrap();
        let verifier = key.create_verification_op("EMSA3(SHA-256)").unwrap();
        assert_eq!(signer.max_input_bits(), 511);
        assert!(verifier.with_recovery());

        let msg = [0x01u8, 0x02, 0x03, 0x04];
        let sig = signer.sign(&msg, &mut rng).unwrap();
        assert_eq!(sig.len(), 64);
        assert_eq!(verifier.recover(&sig).unwrap(), msg);

        let enc = key.create_encryption_op("OAEP(SHA-1)").unwrap();
        let dec = key.create_decryption_op("OAEP(SHA-1)").unwrap();
        let ct = enc.encrypt(&msg, &mut rng).unwrap();
        assert_eq!(ct.len(), 64);

        let pt = dec.decrypt(&ct, Some(&mut rng)).unwrap();
        assert_eq!(&pt[60..], &msg);
        assert_eq!(dec.decrypt(&ct, None).unwrap(), pt);
    }

    #[test]
    fn test_unsupported_paddings() {
        let key = test_key();
        assert!(matches!(
            key.create_signature_op("EMSA1(SHA-256)"),
            Err(Error::AlgorithmNotFound(_))
        ));
        assert!(matches!(
            key.create_encryption_op("EMSA3(SHA-256)"),
            Err(Error::AlgorithmNotFound(_))
        ));
        assert!(matches!(
            key.create_key_agreement_op(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_private_key_info() {
        let key = test_key();
        let info = key.private_key_info().unwrap();
        let decoded = pkcs8::PrivateKeyInfo::from_der(&info).unwrap();
        assert_eq!(decoded.algorithm.oid, pkcs1::ALGORITHM_OID);
        assert_eq!(
            RsaPrivateKey::from_pkcs1_der(decoded.private_key).unwrap(),
            key
        );

        let spki = key.subject_public_key_info().unwrap();
        let decoded = spki::SubjectPublicKeyInfoRef::from_der(&spki).unwrap();
        assert_eq!(
            decoded.subject_public_key.raw_bytes(),
            &key.public_key_bits().unwrap()[..]
        );
    }
}
