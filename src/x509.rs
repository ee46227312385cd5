//! Signatures on X.509 style signed objects.
//!
//! A signed object is `SEQUENCE { tbs, signatureAlgorithm, signature }`,
//! the outer shape shared by certificates, CRLs and PKCS#10 requests.
//! [`X509Ca`] picks a signature scheme for a key and produces such objects;
//! [`X509Object::verify_signature`] checks them and reports the outcome as a
//! [`CertificateStatusCode`] rather than an error.

use alloc::{format, string::String, vec::Vec};

use der::{
    asn1::{AnyRef, BitString},
    Any, Decode, Encode, Sequence,
};
use pkcs1::{RsaPssParams, TrailerField};
use rand_core::CryptoRngCore;
use spki::{AlgorithmIdentifier, AlgorithmIdentifierOwned, AlgorithmIdentifierRef};

use crate::algorithms::{HashFunction, SchemeName};
use crate::errors::{Error, Result};
use crate::oids::{self, AlgorithmParameters};
use crate::pubkey::{PkSigner, PkVerifier, SignatureFormat, SignatureOptions};
use crate::traits::{PrivateKey, PublicKey};

/// Outcome of a signature check on a signed object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CertificateStatusCode {
    /// The signature is valid.
    Verified,
    /// The signature is invalid, or checking it failed.
    SignatureError,
    /// The signature algorithm does not match the key or has malformed
    /// parameters.
    SignatureAlgoBadParams,
    /// The signature algorithm is not supported.
    SignatureAlgoUnknown,
    /// The signature uses a hash that is not trusted.
    UntrustedHash,
}

/// A signed object with its to-be-signed part kept encoded.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct X509Object {
    /// The signed data, a complete DER element.
    pub tbs: Any,
    /// Algorithm the issuer signed with.
    pub signature_algorithm: AlgorithmIdentifierOwned,
    /// The signature.
    pub signature: BitString,
}

impl X509Object {
    /// The DER bytes covered by the signature.
    pub fn signed_data(&self) -> Result<Vec<u8>> {
        Ok(self.tbs.to_der()?)
    }

    /// Checks the signature with the issuer's public key.
    pub fn verify_signature(&self, key: &dyn PublicKey) -> CertificateStatusCode {
        let status = self.check_signature(key);
        if status != CertificateStatusCode::Verified {
            log::debug!(
                "signature with {} did not verify: {:?}",
                self.signature_algorithm.oid,
                status
            );
        }
        status
    }

    fn check_signature(&self, key: &dyn PublicKey) -> CertificateStatusCode {
        let padding = match verification_padding(&self.signature_algorithm, key.algo_name()) {
            Ok(padding) => padding,
            Err(status) => return status,
        };

        let (tbs, signature) = match (self.signed_data(), self.signature.as_bytes()) {
            (Ok(tbs), Some(signature)) => (tbs, signature),
            _ => return CertificateStatusCode::SignatureError,
        };

        let format = SignatureFormat::default_for(key);
        let result = PkVerifier::with_format(key, &padding, format)
            .and_then(|mut verifier| verifier.verify_message(&tbs, signature));

        match result {
            Ok(true) => CertificateStatusCode::Verified,
            Ok(false) => CertificateStatusCode::SignatureError,
            Err(Error::AlgorithmNotFound(_)) => CertificateStatusCode::SignatureAlgoUnknown,
            Err(_) => CertificateStatusCode::SignatureError,
        }
    }
}

/// Resolves a signature `AlgorithmIdentifier` to a padding name for
/// `key_algo`.
fn verification_padding(
    alg_id: &AlgorithmIdentifierOwned,
    key_algo: &str,
) -> core::result::Result<String, CertificateStatusCode> {
    let name = oids::oid2str(&alg_id.oid).ok_or(CertificateStatusCode::SignatureAlgoUnknown)?;
    let (algo, padding) = name
        .split_once('/')
        .ok_or(CertificateStatusCode::SignatureAlgoBadParams)?;

    if algo != key_algo {
        return Err(CertificateStatusCode::SignatureAlgoBadParams);
    }

    if padding == "EMSA4" {
        let params = alg_id
            .parameters
            .as_ref()
            .ok_or(CertificateStatusCode::SignatureAlgoBadParams)?;
        return pss_padding(params);
    }

    if !oids::parameters_are_null_or_empty(alg_id) {
        return Err(CertificateStatusCode::SignatureAlgoBadParams);
    }
    Ok(padding.into())
}

fn pss_padding(params: &Any) -> core::result::Result<String, CertificateStatusCode> {
    let bad = |_| CertificateStatusCode::SignatureAlgoBadParams;
    let der = params.to_der().map_err(bad)?;
    let pss = RsaPssParams::from_der(&der).map_err(bad)?;

    let hash =
        HashFunction::from_oid(&pss.hash.oid).map_err(|_| CertificateStatusCode::UntrustedHash)?;

    if pss.mask_gen.oid != oids::MGF1 {
        return Err(CertificateStatusCode::SignatureAlgoBadParams);
    }
    match &pss.mask_gen.parameters {
        Some(mgf_hash) if mgf_hash.oid == hash.oid() => {}
        _ => return Err(CertificateStatusCode::SignatureAlgoBadParams),
    }
    if pss.trailer_field != TrailerField::BC {
        return Err(CertificateStatusCode::SignatureAlgoBadParams);
    }

    Ok(format!("EMSA4({},MGF1,{})", hash.name(), pss.salt_len))
}

/// Canonical family for a padding name or alias.
fn padding_family(name: &str) -> Result<&'static str> {
    match name {
        "EMSA1" => Ok("EMSA1"),
        "EMSA3" | "EMSA_PKCS1" | "PKCS1v15" | "EMSA-PKCS1-v1_5" => Ok("EMSA3"),
        "EMSA4" | "PSSR" | "PSS" | "EMSA-PSS" => Ok("EMSA4"),
        other => Err(Error::not_found(format!("X.509 signature padding {}", other))),
    }
}

fn default_padding(algo: &str) -> Result<&'static str> {
    match algo {
        "RSA" => Ok("EMSA3"),
        "DSA" | "ECDSA" | "ECGDSA" => Ok("EMSA1"),
        other => Err(Error::invalid_argument(format!(
            "unknown X.509 signing key type: {}",
            other
        ))),
    }
}

fn pss_algorithm_identifier(hash: HashFunction) -> Result<AlgorithmIdentifierOwned> {
    let hash_id = AlgorithmIdentifierRef {
        oid: hash.oid(),
        parameters: Some(AnyRef::NULL),
    };
    let params = RsaPssParams {
        hash: hash_id,
        mask_gen: AlgorithmIdentifier {
            oid: oids::MGF1,
            parameters: Some(hash_id),
        },
        salt_len: u8::try_from(hash.output_size())
            .map_err(|_| Error::internal("PSS salt length does not fit a byte"))?,
        trailer_field: TrailerField::BC,
    };
    Ok(AlgorithmIdentifierOwned {
        oid: oids::RSA_PSS,
        parameters: Some(Any::encode_from(&params)?),
    })
}

/// An issuer signing objects with one key.
pub struct X509Ca<'k> {
    signer: PkSigner<'k>,
    signature_algorithm: AlgorithmIdentifierOwned,
}

impl<'k> X509Ca<'k> {
    /// An issuer signing with `key` and `hash`, e.g. `SHA-256`.
    pub fn new(key: &'k dyn PrivateKey, opts: &SignatureOptions, hash: &str) -> Result<Self> {
        let (signer, signature_algorithm) = Self::choose_sig_format(key, opts, hash)?;
        Ok(X509Ca {
            signer,
            signature_algorithm,
        })
    }

    /// Picks the signature scheme for `key`: `EMSA3` for RSA unless
    /// `opts.padding` asks for PSS, `EMSA1` for DSA and the EC signature
    /// schemes. Returns the signer and the `AlgorithmIdentifier` to embed in
    /// the signed object.
    pub fn choose_sig_format(
        key: &'k dyn PrivateKey,
        opts: &SignatureOptions,
        hash: &str,
    ) -> Result<(PkSigner<'k>, AlgorithmIdentifierOwned)> {
        let algo = key.algo_name();
        let mut family = default_padding(algo)?;
        let mut hash_name = hash;

        let requested = opts.padding.as_deref().map(SchemeName::parse).transpose()?;
        if let Some(req) = &requested {
            family = padding_family(req.name())?;
            if let Some(h) = req.arg(0) {
                hash_name = h;
            }
        }
        let hash = HashFunction::from_name(hash_name)?;

        let (emsa, alg_id) = if family == "EMSA4" {
            let emsa = format!("EMSA4({},MGF1,{})", hash.name(), hash.output_size());
            (emsa, pss_algorithm_identifier(hash)?)
        } else {
            let emsa = format!("{}({})", family, hash.name());
            let params = if algo == "RSA" {
                AlgorithmParameters::Null
            } else {
                AlgorithmParameters::Absent
            };
            let alg_id = oids::algorithm_identifier(&format!("{}/{}", algo, emsa), params)?;
            (emsa, alg_id)
        };

        let format = opts
            .format
            .unwrap_or_else(|| SignatureFormat::for_parts(key.message_parts()));
        let signer = PkSigner::with_format(key, &emsa, format)?;
        Ok((signer, alg_id))
    }

    /// The `AlgorithmIdentifier` written into signed objects.
    pub fn signature_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.signature_algorithm
    }

    /// Signs `tbs`, a complete DER element, and returns the DER signed
    /// object.
    pub fn sign_object(&mut self, tbs: &[u8], rng: &mut dyn CryptoRngCore) -> Result<Vec<u8>> {
        let tbs_any = Any::from_der(tbs)?;
        let signature = self.signer.sign_message(tbs, rng)?;
        let object = X509Object {
            tbs: tbs_any,
            signature_algorithm: self.signature_algorithm.clone(),
            signature: BitString::from_bytes(&signature)?,
        };
        Ok(object.to_der()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dh::DhPrivateKey;
    use crate::dl_group::DlGroup;
    use crate::dsa::DsaPrivateKey;
    use crate::ec::EcGroup;
    use crate::ecdsa::EcdsaPrivateKey;
    use crate::ecgdsa::EcgdsaPrivateKey;
    use crate::rsa::RsaPrivateKey;
    use der::asn1::OctetString;
    use hex_literal::hex;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
    use spki::ObjectIdentifier;

    fn tbs() -> Vec<u8> {
        OctetString::new(&b"to be signed"[..]).unwrap().to_der().unwrap()
    }

    fn sign(key: &dyn PrivateKey, opts: &SignatureOptions, rng: &mut ChaCha8Rng) -> X509Object {
        let mut ca = X509Ca::new(key, opts, "SHA-256").unwrap();
        let der = ca.sign_object(&tbs(), rng).unwrap();
        X509Object::from_der(&der).unwrap()
    }

    #[test]
    fn test_sign_and_verify_each_family() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let rsa = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let ecdsa = EcdsaPrivateKey::new(&mut rng, EcGroup::from_name("secp256r1").unwrap()).unwrap();
        let ecgdsa =
            EcgdsaPrivateKey::new(&mut rng, EcGroup::from_name("secp256r1").unwrap()).unwrap();
        let dsa_group = DlGroup::generate(&mut rng, 512, 160).unwrap();
        let dsa = DsaPrivateKey::new(&mut rng, dsa_group).unwrap();

        let pss = SignatureOptions {
            padding: Some("EMSA4".into()),
            format: None,
        };
        let cases: [(&dyn PrivateKey, &SignatureOptions, &str); 5] = [
            (&rsa, &SignatureOptions::default(), "RSA/EMSA3(SHA-256)"),
            (&rsa, &pss, "RSA/EMSA4"),
            (&ecdsa, &SignatureOptions::default(), "ECDSA/EMSA1(SHA-256)"),
            (&ecgdsa, &SignatureOptions::default(), "ECGDSA/EMSA1(SHA-256)"),
            (&dsa, &SignatureOptions::default(), "DSA/EMSA1(SHA-256)"),
        ];

        for (key, opts, name) in cases {
            let object = sign(key, opts, &mut rng);
            assert_eq!(oids::oid2str(&object.signature_algorithm.oid), Some(name));
            assert_eq!(object.signed_data().unwrap(), tbs());

            let public = key.public_key();
            assert_eq!(
                object.verify_signature(&*public),
                CertificateStatusCode::Verified,
                "{name}"
            );

            let mut tampered = object.clone();
            let mut sig = tampered.signature.raw_bytes().to_vec();
            let last = sig.len() - 1;
            sig[last] ^= 1;
            tampered.signature = BitString::from_bytes(&sig).unwrap();
            assert_eq!(
                tampered.verify_signature(&*public),
                CertificateStatusCode::SignatureError,
                "{name}"
            );
        }
    }

    #[test]
    fn test_pss_parameters() {
        let alg_id = pss_algorithm_identifier(HashFunction::Sha256).unwrap();
        assert_eq!(
            alg_id.to_der().unwrap(),
            hex!(
                "304106092a864886f70d01010a3034a00f300d06096086480165030402010500"
                "a11c301a06092a864886f70d010108300d06096086480165030402010500a203020120"
            )
        );
        let params = alg_id.parameters.as_ref().unwrap();
        assert_eq!(pss_padding(params).unwrap(), "EMSA4(SHA-256,MGF1,32)");
    }

    #[test]
    fn test_status_codes() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let ecdsa = EcdsaPrivateKey::new(&mut rng, EcGroup::from_name("secp256r1").unwrap()).unwrap();
        let rsa = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let object = sign(&ecdsa, &SignatureOptions::default(), &mut rng);

        // key of another family
        assert_eq!(
            object.verify_signature(&rsa),
            CertificateStatusCode::SignatureAlgoBadParams
        );

        let mut unknown = object.clone();
        unknown.signature_algorithm.oid = ObjectIdentifier::new_unwrap("1.2.3.4.5");
        assert_eq!(
            unknown.verify_signature(&ecdsa),
            CertificateStatusCode::SignatureAlgoUnknown
        );

        let mut with_params = object.clone();
        with_params.signature_algorithm.parameters = Some(Any::encode_from(&1u8).unwrap());
        assert_eq!(
            with_params.verify_signature(&ecdsa),
            CertificateStatusCode::SignatureAlgoBadParams
        );

        let mut key_oid = object;
        key_oid.signature_algorithm.oid = oids::ECDSA;
        assert_eq!(
            key_oid.verify_signature(&ecdsa),
            CertificateStatusCode::SignatureAlgoBadParams
        );
    }

    #[test]
    fn test_pss_untrusted_hash() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let rsa = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let pss = SignatureOptions {
            padding: Some("EMSA4".into()),
            format: None,
        };
        let mut object = sign(&rsa, &pss, &mut rng);

        // MD5
        let md5 = AlgorithmIdentifierRef {
            oid: ObjectIdentifier::new_unwrap("1.2.840.113549.2.5"),
            parameters: Some(AnyRef::NULL),
        };
        let params = RsaPssParams {
            hash: md5,
            mask_gen: AlgorithmIdentifier {
                oid: oids::MGF1,
                parameters: Some(md5),
            },
            salt_len: 16,
            trailer_field: TrailerField::BC,
        };
        object.signature_algorithm.parameters = Some(Any::encode_from(&params).unwrap());
        assert_eq!(
            object.verify_signature(&rsa),
            CertificateStatusCode::UntrustedHash
        );

        object.signature_algorithm.parameters = None;
        assert_eq!(
            object.verify_signature(&rsa),
            CertificateStatusCode::SignatureAlgoBadParams
        );
    }

    #[test]
    fn test_choose_sig_format() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let dh = DhPrivateKey::new(&mut rng, DlGroup::from_name("modp/ietf/2048").unwrap()).unwrap();
        assert!(matches!(
            X509Ca::choose_sig_format(&dh, &SignatureOptions::default(), "SHA-256"),
            Err(Error::InvalidArgument(_))
        ));

        let ecdsa = EcdsaPrivateKey::new(&mut rng, EcGroup::from_name("secp384r1").unwrap()).unwrap();
        let (signer, alg_id) =
            X509Ca::choose_sig_format(&ecdsa, &SignatureOptions::default(), "SHA-384").unwrap();
        assert_eq!(signer.emsa_name(), "EMSA1(SHA-384)");
        assert_eq!(signer.format(), SignatureFormat::DerSequence);
        assert_eq!(oids::oid2str(&alg_id.oid), Some("ECDSA/EMSA1(SHA-384)"));
        assert!(alg_id.parameters.is_none());

        let opts = SignatureOptions {
            padding: Some("EMSA1(SHA-512)".into()),
            format: Some(SignatureFormat::Ieee1363),
        };
        let (signer, alg_id) = X509Ca::choose_sig_format(&ecdsa, &opts, "SHA-256").unwrap();
        assert_eq!(signer.format(), SignatureFormat::Ieee1363);
        assert_eq!(oids::oid2str(&alg_id.oid), Some("ECDSA/EMSA1(SHA-512)"));

        let rsa = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let (_, alg_id) =
            X509Ca::choose_sig_format(&rsa, &SignatureOptions::default(), "SHA-1").unwrap();
        assert_eq!(oids::oid2str(&alg_id.oid), Some("RSA/EMSA3(SHA-1)"));
        assert!(oids::parameters_are_null_or_empty(&alg_id));

        assert!(matches!(
            X509Ca::choose_sig_format(&rsa, &SignatureOptions::default(), "MD5"),
            Err(Error::AlgorithmNotFound(_))
        ));
    }
}
