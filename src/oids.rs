//! Algorithm names and their object identifiers.
//!
//! Signature algorithms are named `<Key>/<Padding>(<Hash>)`, for example
//! `RSA/EMSA3(SHA-256)` or `ECDSA/EMSA1(SHA-384)`. RSA-PSS is a single OID,
//! `RSA/EMSA4`, with the hash carried in the algorithm parameters.

use alloc::{format, vec::Vec};

use const_oid::ObjectIdentifier;
use der::{asn1::Null, Any, AnyRef, Decode, Encode};
use spki::AlgorithmIdentifierOwned;

use crate::ec::{SECP256K1_OID, SECP256R1_OID, SECP384R1_OID};
use crate::errors::{Error, Result};

/// `rsaEncryption`
pub const RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
/// `id-dsa`
pub const DSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.1");
/// `dhpublicnumber`
pub const DH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10046.2.1");
/// ElGamal over a DL group.
pub const ELGAMAL: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.3029.1.2.1");
/// `id-ecPublicKey`
pub const ECDSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
/// `id-ecDH`
pub const ECDH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.1.12");
/// ECGDSA keys, BSI TR-03111.
pub const ECGDSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.36.3.3.2.5.2.1");

/// `id-RSASSA-PSS`
pub const RSA_PSS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.10");
/// `id-mgf1`
pub const MGF1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.8");

const TABLE: &[(&str, ObjectIdentifier)] = &[
    ("RSA", RSA),
    ("DSA", DSA),
    ("DH", DH),
    ("ElGamal", ELGAMAL),
    ("ECDSA", ECDSA),
    ("ECDH", ECDH),
    ("ECGDSA", ECGDSA),
    // signatures
    ("RSA/EMSA3(SHA-1)", ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5")),
    ("RSA/EMSA3(SHA-256)", ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11")),
    ("RSA/EMSA3(SHA-384)", ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12")),
    ("RSA/EMSA3(SHA-512)", ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13")),
    ("RSA/EMSA3(SHA-224)", ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.14")),
    ("RSA/EMSA4", RSA_PSS),
    ("DSA/EMSA1(SHA-1)", ObjectIdentifier::new_unwrap("1.2.840.10040.4.3")),
    ("DSA/EMSA1(SHA-224)", ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.1")),
    ("DSA/EMSA1(SHA-256)", ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.2")),
    ("ECDSA/EMSA1(SHA-1)", ObjectIdentifier::new_unwrap("1.2.840.10045.4.1")),
    ("ECDSA/EMSA1(SHA-224)", ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.1")),
    ("ECDSA/EMSA1(SHA-256)", ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2")),
    ("ECDSA/EMSA1(SHA-384)", ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3")),
    ("ECDSA/EMSA1(SHA-512)", ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4")),
    ("ECGDSA/EMSA1(SHA-1)", ObjectIdentifier::new_unwrap("1.3.36.3.3.2.5.4.2")),
    ("ECGDSA/EMSA1(SHA-224)", ObjectIdentifier::new_unwrap("1.3.36.3.3.2.5.4.3")),
    ("ECGDSA/EMSA1(SHA-256)", ObjectIdentifier::new_unwrap("1.3.36.3.3.2.5.4.4")),
    ("ECGDSA/EMSA1(SHA-384)", ObjectIdentifier::new_unwrap("1.3.36.3.3.2.5.4.5")),
    ("ECGDSA/EMSA1(SHA-512)", ObjectIdentifier::new_unwrap("1.3.36.3.3.2.5.4.6")),
    // hashes
    ("SHA-1", ObjectIdentifier::new_unwrap("1.3.14.3.2.26")),
    ("SHA-224", ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.4")),
    ("SHA-256", ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1")),
    ("SHA-384", ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2")),
    ("SHA-512", ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3")),
    ("MGF1", MGF1),
    // curves
    ("secp256r1", SECP256R1_OID),
    ("secp384r1", SECP384R1_OID),
    ("secp256k1", SECP256K1_OID),
    // password based encryption
    ("PBE-PKCS5v20", ObjectIdentifier::new_unwrap("1.2.840.113549.1.5.13")),
    ("PKCS5.PBKDF2", ObjectIdentifier::new_unwrap("1.2.840.113549.1.5.12")),
    ("Scrypt", ObjectIdentifier::new_unwrap("1.3.6.1.4.1.11591.4.11")),
    ("AES-128/CBC", ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.2")),
    ("AES-192/CBC", ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.22")),
    ("AES-256/CBC", ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.42")),
    ("TripleDES/CBC", ObjectIdentifier::new_unwrap("1.2.840.113549.3.7")),
    ("DES/CBC", ObjectIdentifier::new_unwrap("1.3.14.3.2.7")),
];

/// The OID registered for `name`, if any.
pub fn str2oid(name: &str) -> Option<ObjectIdentifier> {
    TABLE.iter().find(|(n, _)| *n == name).map(|(_, oid)| *oid)
}

/// The name registered for `oid`, if any.
pub fn oid2str(oid: &ObjectIdentifier) -> Option<&'static str> {
    TABLE.iter().find(|(_, o)| o == oid).map(|(n, _)| *n)
}

/// Like [`str2oid`], failing with [`Error::AlgorithmNotFound`].
pub fn lookup_oid(name: &str) -> Result<ObjectIdentifier> {
    str2oid(name).ok_or_else(|| Error::not_found(format!("no OID associated with '{}'", name)))
}

/// Like [`oid2str`], failing with [`Error::Decoding`].
pub fn lookup_name(oid: &ObjectIdentifier) -> Result<&'static str> {
    oid2str(oid).ok_or_else(|| Error::decoding(format!("unknown algorithm OID {}", oid)))
}

/// How the parameters of a parameterless algorithm are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlgorithmParameters {
    /// An explicit ASN.1 `NULL`.
    Null,
    /// No parameters field at all.
    Absent,
}

/// Builds an `AlgorithmIdentifier` for a registered name.
pub fn algorithm_identifier(
    name: &str,
    params: AlgorithmParameters,
) -> Result<AlgorithmIdentifierOwned> {
    Ok(AlgorithmIdentifierOwned {
        oid: lookup_oid(name)?,
        parameters: match params {
            AlgorithmParameters::Null => Some(Any::from(Null)),
            AlgorithmParameters::Absent => None,
        },
    })
}

/// True if the identifier has no parameters or a `NULL`.
pub fn parameters_are_null_or_empty(alg_id: &AlgorithmIdentifierOwned) -> bool {
    match &alg_id.parameters {
        None => true,
        Some(any) => AnyRef::from(any).is_null(),
    }
}

/// DER encoding of an `AlgorithmIdentifier`.
pub fn encode_algorithm_identifier(alg_id: &AlgorithmIdentifierOwned) -> Result<Vec<u8>> {
    Ok(alg_id.to_der()?)
}

/// Decodes a DER `AlgorithmIdentifier`.
pub fn decode_algorithm_identifier(bytes: &[u8]) -> Result<AlgorithmIdentifierOwned> {
    Ok(AlgorithmIdentifierOwned::from_der(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_lookups() {
        assert_eq!(str2oid("RSA"), Some(pkcs1::ALGORITHM_OID));
        assert_eq!(oid2str(&RSA_PSS), Some("RSA/EMSA4"));
        assert_eq!(
            lookup_name(&ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2")).unwrap(),
            "ECDSA/EMSA1(SHA-256)"
        );
        assert!(matches!(lookup_oid("RSA/EMSA2(SHA-1)"), Err(Error::AlgorithmNotFound(_))));
        assert!(matches!(
            lookup_name(&ObjectIdentifier::new_unwrap("1.2.3.4")),
            Err(Error::Decoding(_))
        ));
    }

    #[test]
    fn test_table_is_bijective() {
        for (i, (name, oid)) in TABLE.iter().enumerate() {
            for (other_name, other_oid) in &TABLE[i + 1..] {
                assert_ne!(name, other_name);
                assert_ne!(oid, other_oid, "{name} / {other_name}");
            }
            assert_eq!(oid2str(oid), Some(*name));
        }
    }

    #[test]
    fn test_hash_oids_agree() {
        use crate::algorithms::HashFunction;
        for h in ["SHA-1", "SHA-224", "SHA-256", "SHA-384", "SHA-512"] {
            assert_eq!(
                str2oid(h).unwrap(),
                HashFunction::from_name(h).unwrap().oid()
            );
        }
    }

    #[test]
    fn test_algorithm_identifier_der() {
        let with_null = algorithm_identifier("RSA", AlgorithmParameters::Null).unwrap();
        let der = encode_algorithm_identifier(&with_null).unwrap();
        assert_eq!(der, hex!("300d06092a864886f70d0101010500"));
        assert_eq!(decode_algorithm_identifier(&der).unwrap(), with_null);
        assert!(parameters_are_null_or_empty(&with_null));

        let absent =
            algorithm_identifier("ECDSA/EMSA1(SHA-256)", AlgorithmParameters::Absent).unwrap();
        let der = encode_algorithm_identifier(&absent).unwrap();
        assert_eq!(der, hex!("300a06082a8648ce3d040302"));
        assert_eq!(decode_algorithm_identifier(&der).unwrap(), absent);

        assert!(decode_algorithm_identifier(&hex!("3003020101")).is_err());
    }
}
