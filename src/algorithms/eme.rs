//! Encryption encoding methods.
//!
//! `key_bits` is the number of bits the raw encryption primitive accepts,
//! one less than the modulus size. Encoded blocks are `key_bits / 8 + 1`
//! bytes and start with a zero byte.

use alloc::{boxed::Box, format, string::String, vec::Vec};

use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use super::hash::HashFunction;
use super::name::SchemeName;
use super::{oaep, pkcs1v15};
use crate::errors::{Error, Result};

/// An encryption encoding method.
pub trait Eme: Send + Sync {
    /// Canonical name.
    fn name(&self) -> String;

    /// Longest message [`Eme::encode`] accepts for a `key_bits` key.
    fn maximum_input_size(&self, key_bits: usize) -> usize;

    /// Pads `msg` into a block for the raw encryption primitive.
    fn encode(
        &self,
        msg: &[u8],
        key_bits: usize,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<Zeroizing<Vec<u8>>>;

    /// Removes the padding. Any malformed block fails with
    /// [`Error::Decryption`].
    fn decode(&self, coded: &[u8], key_bits: usize) -> Result<Zeroizing<Vec<u8>>>;
}

fn block_len(key_bits: usize) -> usize {
    key_bits / 8 + 1
}

/// Left-pads a decrypted representative to the block length.
fn to_block(coded: &[u8], key_bits: usize) -> Result<Zeroizing<Vec<u8>>> {
    let k = block_len(key_bits);
    if coded.len() > k {
        return Err(Error::Decryption);
    }
    let mut block = Zeroizing::new(vec![0u8; k]);
    block[k - coded.len()..].copy_from_slice(coded);
    Ok(block)
}

/// Instantiates an encryption encoding method by name.
pub fn get_eme(scheme: &str) -> Result<Box<dyn Eme>> {
    let req = SchemeName::parse(scheme)?;

    match req.name() {
        "Raw" => Ok(Box::new(EmeRaw)),
        "EME-PKCS1-v1_5" | "PKCS1v15" => Ok(Box::new(EmePkcs1v15)),
        "EME1" | "OAEP" | "EME-OAEP" => {
            let hash = match req.arg(0) {
                Some(h) => HashFunction::from_name(h)?,
                None => return Err(Error::decoding(format!("{} requires a hash argument", req))),
            };
            let mgf_hash = match req.arg(1) {
                None => hash,
                Some(mgf) => {
                    let mgf = SchemeName::parse(mgf)?;
                    if mgf.name() != "MGF1" {
                        return Err(Error::not_found(format!("{} mask generation", mgf)));
                    }
                    match mgf.arg(0) {
                        Some(h) => HashFunction::from_name(h)?,
                        None => hash,
                    }
                }
            };
            Ok(Box::new(Oaep::new(hash, mgf_hash, Vec::new())))
        }
        _ => Err(Error::not_found(scheme)),
    }
}

/// No padding; the message is encrypted as a big-endian integer.
pub struct EmeRaw;

impl Eme for EmeRaw {
    fn name(&self) -> String {
        "Raw".into()
    }

    fn maximum_input_size(&self, key_bits: usize) -> usize {
        key_bits / 8
    }

    fn encode(
        &self,
        msg: &[u8],
        key_bits: usize,
        _rng: &mut dyn CryptoRngCore,
    ) -> Result<Zeroizing<Vec<u8>>> {
        if msg.len() > self.maximum_input_size(key_bits) {
            return Err(Error::MessageTooLong);
        }
        to_block(msg, key_bits)
    }

    fn decode(&self, coded: &[u8], _key_bits: usize) -> Result<Zeroizing<Vec<u8>>> {
        let start = coded.iter().position(|b| *b != 0).unwrap_or(coded.len());
        Ok(Zeroizing::new(coded[start..].to_vec()))
    }
}

/// `EME-PKCS1-v1_5`.
pub struct EmePkcs1v15;

impl Eme for EmePkcs1v15 {
    fn name(&self) -> String {
        "EME-PKCS1-v1_5".into()
    }

    fn maximum_input_size(&self, key_bits: usize) -> usize {
        block_len(key_bits).saturating_sub(11)
    }

    fn encode(
        &self,
        msg: &[u8],
        key_bits: usize,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<Zeroizing<Vec<u8>>> {
        pkcs1v15::encrypt_pad(rng, msg, block_len(key_bits))
    }

    fn decode(&self, coded: &[u8], key_bits: usize) -> Result<Zeroizing<Vec<u8>>> {
        let block = to_block(coded, key_bits)?;
        pkcs1v15::encrypt_unpad(&block, block_len(key_bits))
    }
}

/// OAEP (`EME1`) with MGF1 and an optional label.
pub struct Oaep {
    hash: HashFunction,
    mgf_hash: HashFunction,
    label: Vec<u8>,
}

impl Oaep {
    /// OAEP with the given label hash, MGF1 hash and label.
    pub fn new(hash: HashFunction, mgf_hash: HashFunction, label: Vec<u8>) -> Self {
        Oaep {
            hash,
            mgf_hash,
            label,
        }
    }
}

impl Eme for Oaep {
    fn name(&self) -> String {
        format!("OAEP({},MGF1({}))", self.hash, self.mgf_hash)
    }

    fn maximum_input_size(&self, key_bits: usize) -> usize {
        oaep::oaep_max_input(block_len(key_bits), self.hash.output_size())
    }

    fn encode(
        &self,
        msg: &[u8],
        key_bits: usize,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let mut digest = self.hash.new_digest();
        let mut mgf_digest = self.mgf_hash.new_digest();
        oaep::oaep_encrypt(
            rng,
            msg,
            &mut *digest,
            &mut *mgf_digest,
            &self.label,
            block_len(key_bits),
        )
    }

    fn decode(&self, coded: &[u8], key_bits: usize) -> Result<Zeroizing<Vec<u8>>> {
        let mut block = to_block(coded, key_bits)?;
        let mut digest = self.hash.new_digest();
        let mut mgf_digest = self.mgf_hash.new_digest();
        oaep::oaep_decrypt(
            &mut block,
            &mut *digest,
            &mut *mgf_digest,
            &self.label,
            block_len(key_bits),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn test_get_eme() {
        assert_eq!(get_eme("PKCS1v15").unwrap().name(), "EME-PKCS1-v1_5");
        assert_eq!(get_eme("EME1(SHA-256)").unwrap().name(), "OAEP(SHA-256,MGF1(SHA-256))");
        assert_eq!(
            get_eme("OAEP(SHA-256,MGF1(SHA-1))").unwrap().name(),
            "OAEP(SHA-256,MGF1(SHA-1))"
        );
        assert!(matches!(get_eme("EME2"), Err(Error::AlgorithmNotFound(_))));
        assert!(matches!(get_eme("OAEP"), Err(Error::Decoding(_))));
    }

    #[test]
    fn test_sizes() {
        // 1024-bit modulus
        let key_bits = 1023;
        assert_eq!(get_eme("Raw").unwrap().maximum_input_size(key_bits), 127);
        assert_eq!(get_eme("PKCS1v15").unwrap().maximum_input_size(key_bits), 117);
        assert_eq!(get_eme("OAEP(SHA-256)").unwrap().maximum_input_size(key_bits), 62);
    }

    #[test]
    fn test_encode_decode() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let key_bits = 1023;
        for scheme in ["Raw", "PKCS1v15", "OAEP(SHA-1)"] {
            let eme = get_eme(scheme).unwrap();
            let max = eme.maximum_input_size(key_bits);
            let msg = vec![0x42; max];
            let block = eme.encode(&msg, key_bits, &mut rng).unwrap();
            assert_eq!(block.len(), 128);
            assert_eq!(block[0], 0);

            // decrypted integers lose their leading zeros
            assert_eq!(&eme.decode(&block[1..], key_bits).unwrap()[..], &msg[..]);

            let too_long = vec![0x42; max + 1];
            assert!(eme.encode(&too_long, key_bits, &mut rng).is_err());
        }
    }

    #[test]
    fn test_decode_failures_are_uniform() {
        let key_bits = 1023;
        let garbage = vec![0x77u8; 127];
        for scheme in ["PKCS1v15", "OAEP(SHA-256)"] {
            let eme = get_eme(scheme).unwrap();
            assert_eq!(eme.decode(&garbage, key_bits).unwrap_err(), Error::Decryption);
            assert_eq!(eme.decode(&[1u8; 200], key_bits).unwrap_err(), Error::Decryption);
        }
    }
}
