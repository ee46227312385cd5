//! Public key operations bound to a key and an encoding method.
//!
//! The wrappers borrow the key, which the caller keeps owning, and own the
//! encoding method they were created with. A wrapper can be reused for any
//! number of messages but must not be shared between threads; create one
//! per thread instead.
//!
//! # Example
//!
//! ```
//! use pkcore::{PkSigner, PkVerifier, PrivateKey, RsaPrivateKey};
//! use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
//!
//! let mut rng = ChaCha8Rng::from_seed([42; 32]);
//! let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
//!
//! let mut signer = PkSigner::new(&key, "EMSA3(SHA-256)").unwrap();
//! signer.update(b"hello ");
//! signer.update(b"world");
//! let signature = signer.signature(&mut rng).unwrap();
//!
//! let public_key = key.public_key();
//! let mut verifier = PkVerifier::new(&*public_key, "EMSA3(SHA-256)").unwrap();
//! assert!(verifier.verify_message(b"hello world", &signature).unwrap());
//! ```

use alloc::{boxed::Box, string::String, vec::Vec};

use der::{asn1::Uint, Decode, Encode};
use num_bigint::BigUint;
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::algorithms::{get_eme, get_emsa, get_kdf, Eme, Emsa, Kdf};
use crate::errors::{Error, Result};
use crate::math::bigint::encode_1363;
use crate::traits::{
    DecryptionOp, EncryptionOp, KeyAgreementOp, PrivateKey, PublicKey, SignatureOp,
    VerificationOp,
};

/// Wire format of signatures made of several integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureFormat {
    /// Fixed-width concatenation of the parts.
    Ieee1363,
    /// DER `SEQUENCE OF INTEGER`.
    DerSequence,
}

impl SignatureFormat {
    /// `DerSequence` for keys whose signatures have several parts,
    /// `Ieee1363` otherwise.
    pub fn default_for(key: &dyn PublicKey) -> Self {
        Self::for_parts(key.message_parts())
    }

    pub(crate) fn for_parts(parts: usize) -> Self {
        if parts > 1 {
            SignatureFormat::DerSequence
        } else {
            SignatureFormat::Ieee1363
        }
    }
}

/// Options for creating a signer for a certificate or other signed object.
#[derive(Clone, Debug, Default)]
pub struct SignatureOptions {
    /// Signature encoding to use instead of the key family default.
    pub padding: Option<String>,
    /// Output format to use instead of [`SignatureFormat::default_for`].
    pub format: Option<SignatureFormat>,
}

fn check_format(algo: &str, parts: usize, format: SignatureFormat) -> Result<()> {
    if format == SignatureFormat::DerSequence && parts == 1 {
        return Err(Error::invalid_argument(alloc::format!(
            "{} signatures have a single part, DER sequence format is not supported",
            algo
        )));
    }
    Ok(())
}

/// Creates signatures with a private key.
pub struct PkSigner<'k> {
    op: Box<dyn SignatureOp + 'k>,
    emsa: Box<dyn Emsa>,
    format: SignatureFormat,
    parts: usize,
}

impl<'k> PkSigner<'k> {
    /// Signer for the encoding named `emsa`, e.g. `EMSA1(SHA-256)`, in the
    /// key's default format.
    pub fn new(key: &'k dyn PrivateKey, emsa: &str) -> Result<Self> {
        Self::with_format(key, emsa, SignatureFormat::for_parts(key.message_parts()))
    }

    /// Signer with an explicit output format.
    pub fn with_format(
        key: &'k dyn PrivateKey,
        emsa: &str,
        format: SignatureFormat,
    ) -> Result<Self> {
        check_format(key.algo_name(), key.message_parts(), format)?;
        Ok(PkSigner {
            op: key.create_signature_op(emsa)?,
            emsa: get_emsa(emsa)?,
            format,
            parts: key.message_parts(),
        })
    }

    /// Name of the signature encoding.
    pub fn emsa_name(&self) -> String {
        self.emsa.name()
    }

    /// The output format.
    pub fn format(&self) -> SignatureFormat {
        self.format
    }

    /// Appends message bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.emsa.update(data);
    }

    /// Signs everything passed to [`PkSigner::update`] since the last
    /// signature and resets.
    pub fn signature(&mut self, rng: &mut dyn CryptoRngCore) -> Result<Vec<u8>> {
        let msg = self.emsa.raw_data();
        let padded = self
            .emsa
            .encoding_of(&msg, self.op.max_input_bits(), Some(&mut *rng))?;
        let plain_sig = self.op.sign(&padded, rng)?;

        match self.format {
            SignatureFormat::Ieee1363 => Ok(plain_sig),
            SignatureFormat::DerSequence => der_encode_signature(&plain_sig, self.parts),
        }
    }

    /// Signs `msg` in one call.
    pub fn sign_message(&mut self, msg: &[u8], rng: &mut dyn CryptoRngCore) -> Result<Vec<u8>> {
        self.update(msg);
        self.signature(rng)
    }
}

fn der_encode_signature(sig: &[u8], parts: usize) -> Result<Vec<u8>> {
    if parts == 0 || sig.len() % parts != 0 {
        return Err(Error::internal("unexpected size for DER signature"));
    }
    let part_size = sig.len() / parts;
    let ints = sig
        .chunks(part_size)
        .map(|part| Uint::new(&BigUint::from_bytes_be(part).to_bytes_be()))
        .collect::<der::Result<Vec<_>>>()?;
    Ok(ints.to_der()?)
}

/// Checks signatures with a public key.
pub struct PkVerifier<'k> {
    op: Box<dyn VerificationOp + 'k>,
    emsa: Box<dyn Emsa>,
    algo: &'static str,
    format: SignatureFormat,
    parts: usize,
    part_size: usize,
}

impl<'k> PkVerifier<'k> {
    /// Verifier for the encoding named `emsa` in the key's default format.
    pub fn new(key: &'k dyn PublicKey, emsa: &str) -> Result<Self> {
        Self::with_format(key, emsa, SignatureFormat::default_for(key))
    }

    /// Verifier with an explicit signature format.
    pub fn with_format(
        key: &'k dyn PublicKey,
        emsa: &str,
        format: SignatureFormat,
    ) -> Result<Self> {
        check_format(key.algo_name(), key.message_parts(), format)?;
        Ok(PkVerifier {
            op: key.create_verification_op(emsa)?,
            emsa: get_emsa(emsa)?,
            algo: key.algo_name(),
            format,
            parts: key.message_parts(),
            part_size: key.message_part_size(),
        })
    }

    /// Name of the signature encoding.
    pub fn emsa_name(&self) -> String {
        self.emsa.name()
    }

    /// Changes the expected signature format.
    pub fn set_input_format(&mut self, format: SignatureFormat) -> Result<()> {
        check_format(self.algo, self.parts, format)?;
        self.format = format;
        Ok(())
    }

    /// Appends message bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.emsa.update(data);
    }

    /// Checks `sig` against everything passed to [`PkVerifier::update`]
    /// and resets.
    ///
    /// A signature that does not verify gives `Ok(false)`, including one
    /// whose DER encoding is malformed or not canonical.
    pub fn check_signature(&mut self, sig: &[u8]) -> Result<bool> {
        let msg = self.emsa.raw_data();

        let result = match self.format {
            SignatureFormat::Ieee1363 => self.validate_signature(&msg, sig),
            SignatureFormat::DerSequence => match self.der_decode_signature(sig) {
                Ok(real_sig) => self.validate_signature(&msg, &real_sig),
                Err(err) => {
                    log::debug!("rejecting {} signature: {}", self.algo, err);
                    Ok(false)
                }
            },
        };

        match result {
            Err(Error::InvalidArgument(_))
            | Err(Error::Verification)
            | Err(Error::InputNotHashed)
            | Err(Error::MessageTooLong) => Ok(false),
            other => other,
        }
    }

    /// Checks a signature over `msg` in one call.
    pub fn verify_message(&mut self, msg: &[u8], sig: &[u8]) -> Result<bool> {
        self.update(msg);
        self.check_signature(sig)
    }

    /// The fixed-width form of a DER signature. Fails with
    /// [`Error::Decoding`] on anything but a canonical `SEQUENCE` of the
    /// right number of integers that each fit a part.
    fn der_decode_signature(&self, sig: &[u8]) -> Result<Vec<u8>> {
        let ints = Vec::<Uint>::from_der(sig)?;
        if ints.len() != self.parts {
            return Err(Error::decoding("PK_Verifier: signature size invalid"));
        }
        if ints.to_der()? != sig {
            return Err(Error::decoding("PK_Verifier: signature is not canonically encoded"));
        }

        let mut real_sig = Vec::with_capacity(self.parts * self.part_size);
        for int in &ints {
            let part = BigUint::from_bytes_be(int.as_bytes());
            let bytes = encode_1363(&part, self.part_size)
                .map_err(|_| Error::decoding("PK_Verifier: signature part too large"))?;
            real_sig.extend_from_slice(&bytes);
        }
        Ok(real_sig)
    }

    fn validate_signature(&mut self, msg: &[u8], sig: &[u8]) -> Result<bool> {
        let key_bits = self.op.max_input_bits();
        if self.op.with_recovery() {
            let coded = self.op.recover(sig)?;
            self.emsa.verify(&coded, msg, key_bits)
        } else {
            let encoded = self.emsa.encoding_of(msg, key_bits, None)?;
            self.op.verify(&encoded, sig)
        }
    }
}

/// Encrypts with a public key and an encryption encoding.
pub struct PkEncryptor<'k> {
    op: Box<dyn EncryptionOp + 'k>,
    eme: Box<dyn Eme>,
}

impl<'k> PkEncryptor<'k> {
    /// Encryptor for the encoding named `eme`, e.g. `OAEP(SHA-256)`.
    pub fn new(key: &'k dyn PublicKey, eme: &str) -> Result<Self> {
        Ok(PkEncryptor {
            op: key.create_encryption_op(eme)?,
            eme: get_eme(eme)?,
        })
    }

    /// Longest plaintext [`PkEncryptor::encrypt`] accepts.
    pub fn maximum_input_size(&self) -> usize {
        self.eme.maximum_input_size(self.op.max_raw_input_bits())
    }

    /// Pads and encrypts `msg`. Messages above
    /// [`PkEncryptor::maximum_input_size`] are rejected, never truncated.
    pub fn encrypt(&self, msg: &[u8], rng: &mut dyn CryptoRngCore) -> Result<Vec<u8>> {
        let max_raw_bits = self.op.max_raw_input_bits();
        let encoded = self.eme.encode(msg, max_raw_bits, &mut *rng)?;
        if BigUint::from_bytes_be(&encoded).bits() > max_raw_bits {
            return Err(Error::invalid_argument("PK_Encryptor: input is too large"));
        }
        self.op.encrypt(&encoded, rng)
    }
}

/// Decrypts with a private key and an encryption encoding.
pub struct PkDecryptor<'k> {
    op: Box<dyn DecryptionOp + 'k>,
    eme: Box<dyn Eme>,
}

impl<'k> PkDecryptor<'k> {
    /// Decryptor for the encoding named `eme`.
    pub fn new(key: &'k dyn PrivateKey, eme: &str) -> Result<Self> {
        Ok(PkDecryptor {
            op: key.create_decryption_op(eme)?,
            eme: get_eme(eme)?,
        })
    }

    /// Decrypts and removes the padding. An RNG enables blinding of the
    /// private operation.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let coded = self.op.decrypt(ciphertext, rng)?;
        self.eme.decode(&coded, self.op.max_raw_input_bits())
    }
}

/// Key agreement followed by a key derivation function.
pub struct PkKeyAgreement<'k> {
    op: Box<dyn KeyAgreementOp + 'k>,
    kdf: Box<dyn Kdf>,
}

impl<'k> PkKeyAgreement<'k> {
    /// Key agreement whose shared secret is processed by the KDF named
    /// `kdf`, e.g. `Raw` or `KDF2(SHA-256)`.
    pub fn new(key: &'k dyn PrivateKey, kdf: &str) -> Result<Self> {
        Ok(PkKeyAgreement {
            op: key.create_key_agreement_op()?,
            kdf: get_kdf(kdf)?,
        })
    }

    /// Derives `key_len` bytes from the agreement with the peer's public
    /// value. With the `Raw` KDF a `key_len` of zero returns the whole
    /// shared secret.
    pub fn derive_key(
        &self,
        key_len: usize,
        other: &[u8],
        salt: &[u8],
        rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let secret = self.op.agree(other, rng)?;
        self.kdf.derive_key(key_len, &secret, salt, b"")
    }
}

/// Signs a random message with `key` and checks that the signature
/// verifies with the derived public key and fails for a modified message.
pub fn signature_consistency_check(
    rng: &mut dyn CryptoRngCore,
    key: &dyn PrivateKey,
    padding: &str,
) -> bool {
    let public_key = key.public_key();
    let run = |rng: &mut dyn CryptoRngCore| -> Result<bool> {
        let mut message = [0u8; 16];
        rng.fill_bytes(&mut message);

        let signature = PkSigner::new(key, padding)?.sign_message(&message, rng)?;

        let mut verifier = PkVerifier::new(&*public_key, padding)?;
        if !verifier.verify_message(&message, &signature)? {
            return Ok(false);
        }

        message[0] ^= 1;
        Ok(!verifier.verify_message(&message, &signature)?)
    };

    match run(rng) {
        Ok(ok) => ok,
        Err(err) => {
            log::debug!("{} consistency check failed: {}", key.algo_name(), err);
            false
        }
    }
}
