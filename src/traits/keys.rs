//! Traits shared by every key family.

use alloc::{boxed::Box, format, vec::Vec};

use der::{asn1::BitString, Encode};
use rand_core::CryptoRngCore;
use spki::{AlgorithmIdentifierOwned, AlgorithmIdentifierRef, ObjectIdentifier};
use zeroize::Zeroizing;

use super::ops::{DecryptionOp, EncryptionOp, KeyAgreementOp, SignatureOp, VerificationOp};
use crate::errors::{Error, Result};

fn unsupported(algo: &str, what: &str) -> Error {
    Error::invalid_argument(format!("{} does not support {}", algo, what))
}

/// A public key.
pub trait PublicKey: Send + Sync {
    /// Algorithm name, e.g. `RSA` or `ECDSA`.
    fn algo_name(&self) -> &'static str;

    /// Size of the key in bits: the modulus, the group prime or the field.
    fn key_length(&self) -> usize;

    /// Estimated security level in bits.
    fn estimated_strength(&self) -> usize;

    /// Number of integers in a signature.
    fn message_parts(&self) -> usize {
        1
    }

    /// Width in bytes of each signature part.
    fn message_part_size(&self) -> usize {
        0
    }

    /// The `AlgorithmIdentifier` of the public key encoding.
    fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned>;

    /// The OID of [`PublicKey::algorithm_identifier`].
    fn oid(&self) -> Result<ObjectIdentifier> {
        Ok(self.algorithm_identifier()?.oid)
    }

    /// The encoded key, the content of the SPKI bit string.
    fn public_key_bits(&self) -> Result<Vec<u8>>;

    /// DER `SubjectPublicKeyInfo`.
    fn subject_public_key_info(&self) -> Result<Vec<u8>> {
        let spki = spki::SubjectPublicKeyInfoOwned {
            algorithm: self.algorithm_identifier()?,
            subject_public_key: BitString::from_bytes(&self.public_key_bits()?)?,
        };
        Ok(spki.to_der()?)
    }

    /// Consistency checks. `strong` enables the expensive ones, such as
    /// primality tests.
    fn check_key(&self, rng: Option<&mut dyn CryptoRngCore>, strong: bool) -> bool;

    /// Raw verification bound to this key, for the signature encoding
    /// named `emsa`.
    fn create_verification_op(&self, _emsa: &str) -> Result<Box<dyn VerificationOp + '_>> {
        Err(unsupported(self.algo_name(), "verification"))
    }

    /// Raw encryption bound to this key, for the encryption encoding named
    /// `eme`.
    fn create_encryption_op(&self, _eme: &str) -> Result<Box<dyn EncryptionOp + '_>> {
        Err(unsupported(self.algo_name(), "encryption"))
    }
}

/// A private key. Secret material is zeroized on drop.
pub trait PrivateKey: PublicKey {
    /// The encoded private key, the content of the PKCS#8 octet string.
    fn private_key_bits(&self) -> Result<Zeroizing<Vec<u8>>>;

    /// The matching public key.
    fn public_key(&self) -> Box<dyn PublicKey>;

    /// DER `PrivateKeyInfo`.
    fn private_key_info(&self) -> Result<Zeroizing<Vec<u8>>> {
        let algorithm = self.algorithm_identifier()?;
        let private_key = self.private_key_bits()?;
        let info = pkcs8::PrivateKeyInfo {
            algorithm: AlgorithmIdentifierRef {
                oid: algorithm.oid,
                parameters: algorithm.parameters.as_ref().map(Into::into),
            },
            private_key: &private_key,
            public_key: None,
        };
        Ok(Zeroizing::new(info.to_der()?))
    }

    /// The value sent to the peer in a key agreement.
    fn public_value(&self) -> Result<Vec<u8>> {
        Err(unsupported(self.algo_name(), "key agreement"))
    }

    /// Raw signing bound to this key, for the signature encoding named
    /// `emsa`.
    fn create_signature_op(&self, _emsa: &str) -> Result<Box<dyn SignatureOp + '_>> {
        Err(unsupported(self.algo_name(), "signatures"))
    }

    /// Raw decryption bound to this key, for the encryption encoding named
    /// `eme`.
    fn create_decryption_op(&self, _eme: &str) -> Result<Box<dyn DecryptionOp + '_>> {
        Err(unsupported(self.algo_name(), "decryption"))
    }

    /// Raw key agreement bound to this key.
    fn create_key_agreement_op(&self) -> Result<Box<dyn KeyAgreementOp + '_>> {
        Err(unsupported(self.algo_name(), "key agreement"))
    }
}
