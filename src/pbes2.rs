//! Password based encryption with PBES2 (RFC 8018).
//!
//! The scheme parameters travel as a DER `AlgorithmIdentifier` next to the
//! ciphertext, so decryption needs nothing but the passphrase. Private keys
//! are wrapped in a PKCS#8 `EncryptedPrivateKeyInfo`.

use alloc::{boxed::Box, format, vec::Vec};

use der::{Decode, Encode};
use pkcs5::pbes2::{EncryptionScheme, Kdf, Parameters, Pbkdf2Params, Pbkdf2Prf, ScryptParams};
use pkcs8::EncryptedPrivateKeyInfo;
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::algorithms::{HashFunction, SchemeName};
use crate::errors::{Error, Result};
use crate::registry::AlgorithmRegistry;
use crate::traits::PrivateKey;

const SALT_LEN: usize = 16;

/// Symmetric cipher used under PBES2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pbes2Cipher {
    /// `AES-128/CBC`
    Aes128Cbc,
    /// `AES-256/CBC`
    Aes256Cbc,
    /// `TripleDES/CBC`
    TripleDesCbc,
    /// `DES/CBC`, accepted for decryption only.
    DesCbc,
}

impl Pbes2Cipher {
    /// Resolves a cipher name such as `AES-256/CBC`.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "AES-128/CBC" => Ok(Pbes2Cipher::Aes128Cbc),
            "AES-256/CBC" => Ok(Pbes2Cipher::Aes256Cbc),
            "TripleDES/CBC" => Ok(Pbes2Cipher::TripleDesCbc),
            "DES/CBC" => Ok(Pbes2Cipher::DesCbc),
            other => Err(Error::not_found(format!("PBES2 cipher {}", other))),
        }
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Pbes2Cipher::Aes128Cbc => "AES-128/CBC",
            Pbes2Cipher::Aes256Cbc => "AES-256/CBC",
            Pbes2Cipher::TripleDesCbc => "TripleDES/CBC",
            Pbes2Cipher::DesCbc => "DES/CBC",
        }
    }

    fn block_size(self) -> usize {
        match self {
            Pbes2Cipher::Aes128Cbc | Pbes2Cipher::Aes256Cbc => 16,
            Pbes2Cipher::TripleDesCbc | Pbes2Cipher::DesCbc => 8,
        }
    }

    fn key_size(self) -> usize {
        match self {
            Pbes2Cipher::Aes128Cbc => 16,
            Pbes2Cipher::Aes256Cbc => 32,
            Pbes2Cipher::TripleDesCbc => 24,
            Pbes2Cipher::DesCbc => 8,
        }
    }
}

/// Password hash deriving the cipher key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordHash {
    /// PBKDF2 with HMAC over `digest`.
    Pbkdf2 {
        /// Digest for the HMAC PRF.
        digest: HashFunction,
        /// Iteration count.
        iterations: u32,
    },
    /// scrypt with cost `2^log_n`, block size `r` and parallelism `p`.
    Scrypt {
        /// Base two logarithm of the cost parameter.
        log_n: u8,
        /// Block size.
        r: u32,
        /// Parallelization.
        p: u32,
    },
}

impl PasswordHash {
    /// Resolves `PBKDF2(<digest>)` with `iterations`, or `Scrypt` with the
    /// default scrypt cost.
    pub fn from_name(name: &str, iterations: u32) -> Result<Self> {
        let parsed = SchemeName::parse(name)?;
        match parsed.name() {
            "PBKDF2" => Ok(PasswordHash::Pbkdf2 {
                digest: HashFunction::from_name(parsed.arg(0).unwrap_or("SHA-256"))?,
                iterations,
            }),
            "Scrypt" => Ok(PasswordHash::Scrypt {
                log_n: 15,
                r: 8,
                p: 1,
            }),
            other => Err(Error::not_found(format!("PBES2 password hash {}", other))),
        }
    }
}

/// PBES2 algorithm choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pbes2Options {
    /// Cipher protecting the data.
    pub cipher: Pbes2Cipher,
    /// Password hash producing the cipher key.
    pub kdf: PasswordHash,
}

impl Default for Pbes2Options {
    fn default() -> Self {
        Pbes2Options {
            cipher: Pbes2Cipher::Aes256Cbc,
            kdf: PasswordHash::Pbkdf2 {
                digest: HashFunction::Sha256,
                iterations: 100_000,
            },
        }
    }
}

fn pbkdf2_prf(digest: HashFunction) -> Pbkdf2Prf {
    match digest {
        HashFunction::Sha1 => Pbkdf2Prf::HmacWithSha1,
        HashFunction::Sha224 => Pbkdf2Prf::HmacWithSha224,
        HashFunction::Sha256 => Pbkdf2Prf::HmacWithSha256,
        HashFunction::Sha384 => Pbkdf2Prf::HmacWithSha384,
        HashFunction::Sha512 => Pbkdf2Prf::HmacWithSha512,
    }
}

fn kdf_parameters<'a>(kdf: PasswordHash, salt: &'a [u8], key_size: usize) -> Result<Kdf<'a>> {
    match kdf {
        PasswordHash::Pbkdf2 { digest, iterations } => {
            if iterations == 0 || iterations > Pbkdf2Params::MAX_ITERATION_COUNT {
                return Err(Error::invalid_argument(format!(
                    "PBKDF2 iteration count {} out of range",
                    iterations
                )));
            }
            Ok(Kdf::Pbkdf2(Pbkdf2Params {
                salt,
                iteration_count: iterations,
                key_length: None,
                prf: pbkdf2_prf(digest),
            }))
        }
        PasswordHash::Scrypt { log_n, r, p } => {
            let params = pkcs5::scrypt::Params::new(log_n, r, p, key_size)
                .map_err(|_| Error::invalid_argument("invalid scrypt parameters"))?;
            Ok(Kdf::Scrypt(ScryptParams::from_params_and_salt(params, salt)?))
        }
    }
}

fn encryption_scheme<'a>(
    cipher: Pbes2Cipher,
    aes_iv: &'a [u8; 16],
    des_iv: &'a [u8; 8],
) -> Result<EncryptionScheme<'a>> {
    match cipher {
        Pbes2Cipher::Aes128Cbc => Ok(EncryptionScheme::Aes128Cbc { iv: aes_iv }),
        Pbes2Cipher::Aes256Cbc => Ok(EncryptionScheme::Aes256Cbc { iv: aes_iv }),
        Pbes2Cipher::TripleDesCbc => Ok(EncryptionScheme::DesEde3Cbc { iv: des_iv }),
        Pbes2Cipher::DesCbc => Err(Error::not_found(
            "PBES2 encryption with DES/CBC is not supported",
        )),
    }
}

fn encrypt_with<T>(
    plaintext: &[u8],
    passphrase: &str,
    opts: &Pbes2Options,
    rng: &mut dyn CryptoRngCore,
    finish: impl FnOnce(pkcs5::EncryptionScheme<'_>, &[u8]) -> Result<T>,
) -> Result<T> {
    let mut salt = [0u8; SALT_LEN];
    let mut aes_iv = [0u8; 16];
    let mut des_iv = [0u8; 8];
    rng.fill_bytes(&mut salt);
    match opts.cipher.block_size() {
        16 => rng.fill_bytes(&mut aes_iv),
        _ => rng.fill_bytes(&mut des_iv),
    }

    let params = Parameters {
        kdf: kdf_parameters(opts.kdf, &salt, opts.cipher.key_size())?,
        encryption: encryption_scheme(opts.cipher, &aes_iv, &des_iv)?,
    };
    let ciphertext = params
        .encrypt(passphrase, plaintext)
        .map_err(|err| Error::internal(format!("PBES2 encryption failed: {}", err)))?;

    log::debug!("PBES2 encrypted {} bytes with {}", plaintext.len(), opts.cipher.name());
    finish(pkcs5::EncryptionScheme::Pbes2(params), &ciphertext)
}

fn decrypt_with(
    scheme: &pkcs5::EncryptionScheme<'_>,
    ciphertext: &[u8],
    passphrase: &str,
) -> Result<Zeroizing<Vec<u8>>> {
    let params = scheme
        .pbes2()
        .ok_or_else(|| Error::decoding(format!("not a PBES2 scheme: {}", scheme.oid())))?;
    // pkcs5 reports a bad padding block as an encryption failure
    params
        .decrypt(passphrase, ciphertext)
        .map(Zeroizing::new)
        .map_err(|err| match err {
            pkcs5::Error::AlgorithmParametersInvalid { .. }
            | pkcs5::Error::UnsupportedAlgorithm { .. } => Error::from(err),
            _ => Error::Decryption,
        })
}

/// Encrypts `plaintext` under `passphrase`. Returns the DER
/// `AlgorithmIdentifier` describing the scheme and the ciphertext.
pub fn pbes2_encrypt(
    plaintext: &[u8],
    passphrase: &str,
    opts: &Pbes2Options,
    rng: &mut dyn CryptoRngCore,
) -> Result<(Vec<u8>, Vec<u8>)> {
    encrypt_with(plaintext, passphrase, opts, rng, |scheme, ciphertext| {
        Ok((scheme.to_der()?, ciphertext.to_vec()))
    })
}

/// Decrypts data produced by [`pbes2_encrypt`]. A wrong passphrase fails
/// with [`Error::Decryption`].
pub fn pbes2_decrypt(
    alg_id: &[u8],
    ciphertext: &[u8],
    passphrase: &str,
) -> Result<Zeroizing<Vec<u8>>> {
    let scheme = pkcs5::EncryptionScheme::from_der(alg_id)?;
    decrypt_with(&scheme, ciphertext, passphrase)
}

/// Wraps the PKCS#8 encoding of `key` in an `EncryptedPrivateKeyInfo`.
pub fn encrypt_private_key(
    key: &dyn PrivateKey,
    passphrase: &str,
    opts: &Pbes2Options,
    rng: &mut dyn CryptoRngCore,
) -> Result<Vec<u8>> {
    let info = key.private_key_info()?;
    encrypt_with(&info, passphrase, opts, rng, |encryption_algorithm, ciphertext| {
        let encrypted = EncryptedPrivateKeyInfo {
            encryption_algorithm,
            encrypted_data: ciphertext,
        };
        Ok(encrypted.to_der()?)
    })
}

/// Decrypts an `EncryptedPrivateKeyInfo` and loads the key through
/// `registry`.
pub fn decrypt_private_key(
    registry: &AlgorithmRegistry,
    der: &[u8],
    passphrase: &str,
) -> Result<Box<dyn PrivateKey>> {
    let encrypted = EncryptedPrivateKeyInfo::from_der(der)?;
    let info = decrypt_with(&encrypted.encryption_algorithm, encrypted.encrypted_data, passphrase)?;
    registry.load_private_key_der(&info)
}
