//! Hash functions selectable by name.

use alloc::{boxed::Box, vec::Vec};
use core::fmt;

use const_oid::{AssociatedOid, ObjectIdentifier};
use digest::{Digest, DynDigest};
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};

use crate::errors::{Error, Result};

/// The hash functions known to the padding and KDF layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashFunction {
    /// SHA-1
    Sha1,
    /// SHA-224
    Sha224,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl HashFunction {
    /// Resolves a hash name. `SHA-160` and `SHA1` are accepted for SHA-1.
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name.trim() {
            "SHA-1" | "SHA-160" | "SHA1" => HashFunction::Sha1,
            "SHA-224" => HashFunction::Sha224,
            "SHA-256" => HashFunction::Sha256,
            "SHA-384" => HashFunction::Sha384,
            "SHA-512" => HashFunction::Sha512,
            other => return Err(Error::not_found(other)),
        })
    }

    /// Resolves a hash OID.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        [
            HashFunction::Sha1,
            HashFunction::Sha224,
            HashFunction::Sha256,
            HashFunction::Sha384,
            HashFunction::Sha512,
        ]
        .into_iter()
        .find(|h| &h.oid() == oid)
        .ok_or_else(|| Error::not_found(alloc::format!("hash OID {}", oid)))
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            HashFunction::Sha1 => "SHA-1",
            HashFunction::Sha224 => "SHA-224",
            HashFunction::Sha256 => "SHA-256",
            HashFunction::Sha384 => "SHA-384",
            HashFunction::Sha512 => "SHA-512",
        }
    }

    /// The hash OID, as used in `DigestInfo` and PSS parameters.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            HashFunction::Sha1 => Sha1::OID,
            HashFunction::Sha224 => Sha224::OID,
            HashFunction::Sha256 => Sha256::OID,
            HashFunction::Sha384 => Sha384::OID,
            HashFunction::Sha512 => Sha512::OID,
        }
    }

    /// Digest length in bytes.
    pub fn output_size(self) -> usize {
        match self {
            HashFunction::Sha1 => <Sha1 as Digest>::output_size(),
            HashFunction::Sha224 => <Sha224 as Digest>::output_size(),
            HashFunction::Sha256 => <Sha256 as Digest>::output_size(),
            HashFunction::Sha384 => <Sha384 as Digest>::output_size(),
            HashFunction::Sha512 => <Sha512 as Digest>::output_size(),
        }
    }

    /// A fresh hashing context.
    pub fn new_digest(self) -> Box<dyn DynDigest + Send + Sync> {
        match self {
            HashFunction::Sha1 => Box::new(Sha1::new()),
            HashFunction::Sha224 => Box::new(Sha224::new()),
            HashFunction::Sha256 => Box::new(Sha256::new()),
            HashFunction::Sha384 => Box::new(Sha384::new()),
            HashFunction::Sha512 => Box::new(Sha512::new()),
        }
    }

    /// One-shot hash.
    pub fn digest(self, msg: &[u8]) -> Vec<u8> {
        let mut h = self.new_digest();
        h.update(msg);
        h.finalize().into_vec()
    }

    /// DER prefix of a PKCS#1 v1.5 `DigestInfo` for this hash.
    pub fn pkcs1_prefix(self) -> Vec<u8> {
        digest_info_prefix(self.oid(), self.output_size())
    }
}

impl fmt::Display for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Looks up a hash by name and returns a fresh context for it.
pub fn hash_by_name(name: &str) -> Result<Box<dyn DynDigest + Send + Sync>> {
    Ok(HashFunction::from_name(name)?.new_digest())
}

/// `30 <len> 30 <len> 06 <oid_len> oid 05 00 04 <digest_len>`
fn digest_info_prefix(oid: ObjectIdentifier, digest_len: usize) -> Vec<u8> {
    let oid = oid.as_bytes();
    let oid_len = oid.len() as u8;
    let digest_len = digest_len as u8;
    let mut v = vec![
        0x30,
        oid_len + 8 + digest_len,
        0x30,
        oid_len + 4,
        0x6,
        oid_len,
    ];
    v.extend_from_slice(oid);
    v.extend_from_slice(&[0x05, 0x00, 0x04, digest_len]);
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_names() {
        assert_eq!(HashFunction::from_name("SHA-160").unwrap(), HashFunction::Sha1);
        assert_eq!(HashFunction::from_name("SHA-384").unwrap().output_size(), 48);
        assert!(matches!(
            HashFunction::from_name("MD5"),
            Err(Error::AlgorithmNotFound(_))
        ));

        let h = HashFunction::Sha512;
        assert_eq!(HashFunction::from_oid(&h.oid()).unwrap(), h);
    }

    #[test]
    fn test_pkcs1_prefixes() {
        assert_eq!(
            HashFunction::Sha1.pkcs1_prefix(),
            hex!("3021300906052b0e03021a05000414")
        );
        assert_eq!(
            HashFunction::Sha256.pkcs1_prefix(),
            hex!("3031300d060960864801650304020105000420")
        );
    }

    #[test]
    fn test_digest() {
        assert_eq!(
            HashFunction::Sha256.digest(b"abc"),
            hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }
}
