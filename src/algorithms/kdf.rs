//! Key derivation functions applied to key agreement output.

use alloc::{boxed::Box, format, string::String, vec::Vec};

use hkdf::Hkdf;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

use super::hash::HashFunction;
use super::name::SchemeName;
use crate::errors::{Error, Result};

/// A key derivation function.
pub trait Kdf: Send + Sync {
    /// Canonical name.
    fn name(&self) -> String;

    /// Derives `key_len` bytes from `secret`, `salt` and `label`.
    fn derive_key(
        &self,
        key_len: usize,
        secret: &[u8],
        salt: &[u8],
        label: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>>;
}

/// Instantiates a KDF by name: `Raw`, `KDF2(<hash>)` or `HKDF(<hash>)`.
pub fn get_kdf(spec: &str) -> Result<Box<dyn Kdf>> {
    let req = SchemeName::parse(spec)?;
    let hash = || match req.arg(0) {
        Some(h) => HashFunction::from_name(h),
        None => Err(Error::decoding(format!("{} requires a hash argument", req))),
    };

    match req.name() {
        "Raw" => Ok(Box::new(RawKdf)),
        "KDF2" => Ok(Box::new(Kdf2(hash()?))),
        "HKDF" => Ok(Box::new(HkdfKdf(hash()?))),
        _ => Err(Error::not_found(spec)),
    }
}

/// Returns the shared secret itself, truncated to `key_len` when shorter.
/// A `key_len` of zero returns the whole secret.
pub struct RawKdf;

impl Kdf for RawKdf {
    fn name(&self) -> String {
        "Raw".into()
    }

    fn derive_key(
        &self,
        key_len: usize,
        secret: &[u8],
        _salt: &[u8],
        _label: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let len = match key_len {
            0 => secret.len(),
            n => n.min(secret.len()),
        };
        Ok(Zeroizing::new(secret[..len].to_vec()))
    }
}

/// KDF2 from ISO-18033-2: `H(Z ‖ counter ‖ label ‖ salt)` for
/// `counter = 1, 2, ...` as 32-bit big endian.
pub struct Kdf2(pub HashFunction);

impl Kdf for Kdf2 {
    fn name(&self) -> String {
        format!("KDF2({})", self.0)
    }

    fn derive_key(
        &self,
        key_len: usize,
        secret: &[u8],
        salt: &[u8],
        label: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let mut out = Zeroizing::new(Vec::with_capacity(key_len));
        let mut h = self.0.new_digest();
        let mut counter = 1u32;

        while out.len() < key_len {
            h.update(secret);
            h.update(&counter.to_be_bytes());
            h.update(label);
            h.update(salt);
            let block = Zeroizing::new(h.finalize_reset());
            let take = (key_len - out.len()).min(block.len());
            out.extend_from_slice(&block[..take]);

            counter = counter
                .checked_add(1)
                .ok_or_else(|| Error::invalid_argument("KDF2: output too long"))?;
        }
        Ok(out)
    }
}

/// HKDF (RFC 5869) with `salt` as the extract salt and `label` as the
/// expand info.
pub struct HkdfKdf(pub HashFunction);

macro_rules! hkdf_expand {
    ($hash:ty, $secret:expr, $salt:expr, $label:expr, $out:expr) => {
        Hkdf::<$hash>::new(Some($salt), $secret)
            .expand($label, $out)
            .map_err(|_| Error::invalid_argument("HKDF: output too long"))?
    };
}

impl Kdf for HkdfKdf {
    fn name(&self) -> String {
        format!("HKDF({})", self.0)
    }

    fn derive_key(
        &self,
        key_len: usize,
        secret: &[u8],
        salt: &[u8],
        label: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let mut out = Zeroizing::new(vec![0u8; key_len]);
        match self.0 {
            HashFunction::Sha1 => hkdf_expand!(Sha1, secret, salt, label, &mut out),
            HashFunction::Sha224 => hkdf_expand!(Sha224, secret, salt, label, &mut out),
            HashFunction::Sha256 => hkdf_expand!(Sha256, secret, salt, label, &mut out),
            HashFunction::Sha384 => hkdf_expand!(Sha384, secret, salt, label, &mut out),
            HashFunction::Sha512 => hkdf_expand!(Sha512, secret, salt, label, &mut out),
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_raw_truncates() {
        let kdf = get_kdf("Raw").unwrap();
        let secret = [1u8, 2, 3, 4];
        assert_eq!(&kdf.derive_key(2, &secret, b"", b"").unwrap()[..], &[1, 2]);
        assert_eq!(&kdf.derive_key(8, &secret, b"", b"").unwrap()[..], &secret);
        assert_eq!(&kdf.derive_key(0, &secret, b"", b"").unwrap()[..], &secret);
    }

    #[test]
    fn test_kdf2() {
        let kdf = get_kdf("KDF2(SHA-1)").unwrap();
        assert_eq!(kdf.name(), "KDF2(SHA-1)");

        let secret = hex!("0102030405");
        let out = kdf.derive_key(30, &secret, b"salt", b"label").unwrap();

        let mut expected = Vec::new();
        for counter in 1u32..=2 {
            let mut input = secret.to_vec();
            input.extend_from_slice(&counter.to_be_bytes());
            input.extend_from_slice(b"label");
            input.extend_from_slice(b"salt");
            expected.extend_from_slice(&HashFunction::Sha1.digest(&input));
        }
        assert_eq!(&out[..], &expected[..30]);
    }

    #[test]
    fn test_hkdf_rfc5869_case1() {
        let kdf = get_kdf("HKDF(SHA-256)").unwrap();
        let ikm = [0x0bu8; 22];
        let salt = hex!("000102030405060708090a0b0c");
        let info = hex!("f0f1f2f3f4f5f6f7f8f9");
        let okm = kdf.derive_key(42, &ikm, &salt, &info).unwrap();
        assert_eq!(
            &okm[..],
            &hex!(
                "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf"
                "34007208d5b887185865"
            )[..]
        );
        assert!(kdf.derive_key(255 * 32 + 1, &ikm, &salt, &info).is_err());
    }

    #[test]
    fn test_unknown_kdf() {
        assert!(matches!(get_kdf("KDF9(SHA-1)"), Err(Error::AlgorithmNotFound(_))));
        assert!(matches!(get_kdf("KDF2"), Err(Error::Decoding(_))));
    }
}
