//! Dispatch from algorithm names and OIDs to key constructors.
//!
//! An [`AlgorithmRegistry`] is an explicit value: build one with
//! [`AlgorithmRegistry::with_defaults`], add or replace families with
//! [`AlgorithmRegistry::register`], and pass it to whatever needs to load or
//! create keys.
//!
//! ```
//! use pkcore::registry::AlgorithmRegistry;
//! use pkcore::{PrivateKey, PublicKey};
//! use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
//!
//! let mut rng = ChaCha8Rng::from_seed([42; 32]);
//! let registry = AlgorithmRegistry::with_defaults();
//!
//! let key = registry.create_private_key("ECDSA", &mut rng, "secp256r1").unwrap();
//! let spki = registry.encode_public_key(&*key.public_key()).unwrap();
//! let public = registry.load_public_key_der(&spki).unwrap();
//! assert_eq!(public.algo_name(), "ECDSA");
//! ```

use alloc::{
    boxed::Box,
    collections::BTreeMap,
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::fmt;

use der::{Any, Decode};
use rand_core::CryptoRngCore;
use spki::{AlgorithmIdentifierOwned, ObjectIdentifier, SubjectPublicKeyInfoOwned};
use zeroize::Zeroizing;

use crate::dh::{DhPrivateKey, DhPublicKey};
use crate::dl_group::DlGroup;
use crate::dsa::{DsaPrivateKey, DsaPublicKey};
use crate::ec::EcGroup;
use crate::ecdh::{EcdhPrivateKey, EcdhPublicKey};
use crate::ecdsa::{EcdsaPrivateKey, EcdsaPublicKey};
use crate::ecgdsa::{EcgdsaPrivateKey, EcgdsaPublicKey};
use crate::elgamal::{ElGamalPrivateKey, ElGamalPublicKey};
use crate::errors::{Error, Result};
use crate::oids;
use crate::rsa::{RsaPrivateKey, RsaPublicKey};
use crate::traits::{PrivateKey, PublicKey};

/// Decodes a public key from its `AlgorithmIdentifier` and key bits.
pub type LoadPublicFn =
    Box<dyn Fn(&AlgorithmIdentifierOwned, &[u8]) -> Result<Box<dyn PublicKey>> + Send + Sync>;

/// Decodes a private key from its `AlgorithmIdentifier` and key bits.
pub type LoadPrivateFn =
    Box<dyn Fn(&AlgorithmIdentifierOwned, &[u8]) -> Result<Box<dyn PrivateKey>> + Send + Sync>;

/// Generates a private key from a parameter string.
pub type CreateFn =
    Box<dyn Fn(&mut dyn CryptoRngCore, &str) -> Result<Box<dyn PrivateKey>> + Send + Sync>;

/// Constructors for one key family.
pub struct KeyFactory {
    /// Public key decoder.
    pub load_public: LoadPublicFn,
    /// Private key decoder.
    pub load_private: LoadPrivateFn,
    /// Key generation, if the family supports it.
    pub create: Option<CreateFn>,
}

impl KeyFactory {
    /// A factory from plain constructors.
    pub fn new<P, S, C>(load_public: P, load_private: S, create: C) -> Self
    where
        P: Fn(&AlgorithmIdentifierOwned, &[u8]) -> Result<Box<dyn PublicKey>> + Send + Sync + 'static,
        S: Fn(&AlgorithmIdentifierOwned, &[u8]) -> Result<Box<dyn PrivateKey>> + Send + Sync + 'static,
        C: Fn(&mut dyn CryptoRngCore, &str) -> Result<Box<dyn PrivateKey>> + Send + Sync + 'static,
    {
        KeyFactory {
            load_public: Box::new(load_public),
            load_private: Box::new(load_private),
            create: Some(Box::new(create)),
        }
    }
}

impl fmt::Debug for KeyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyFactory")
            .field("create", &self.create.is_some())
            .finish_non_exhaustive()
    }
}

/// Key families by algorithm name.
///
/// OIDs resolve to names through the families' own OIDs given to
/// [`AlgorithmRegistry::register_with_oid`] first, then through the
/// built-in table in [`oids`].
#[derive(Debug, Default)]
pub struct AlgorithmRegistry {
    factories: BTreeMap<String, KeyFactory>,
    family_oids: BTreeMap<ObjectIdentifier, String>,
}

const DEFAULT_RSA_BITS: usize = 3072;
const DEFAULT_DL_GROUP: &str = "modp/ietf/2048";
const DEFAULT_CURVE: &str = "secp256r1";

fn parse_rsa_bits(params: &str) -> Result<usize> {
    if params.is_empty() {
        return Ok(DEFAULT_RSA_BITS);
    }
    params
        .parse()
        .map_err(|_| Error::invalid_argument(format!("RSA: invalid key size '{}'", params)))
}

/// A group name, or a prime size in bits for a freshly generated group.
fn dl_group_for<R: CryptoRngCore + ?Sized>(rng: &mut R, params: &str) -> Result<DlGroup> {
    let params = if params.is_empty() { DEFAULT_DL_GROUP } else { params };
    match params.parse::<usize>() {
        Ok(pbits) => DlGroup::generate(rng, pbits, 0),
        Err(_) => DlGroup::from_name(params),
    }
}

fn ec_group_for(params: &str) -> Result<EcGroup> {
    EcGroup::from_name(if params.is_empty() { DEFAULT_CURVE } else { params })
}

impl AlgorithmRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in family: RSA, DSA, DH, ElGamal,
    /// ECDSA, ECDH and ECGDSA.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(
            "RSA",
            KeyFactory::new(
                |_, bits| Ok(Box::new(RsaPublicKey::from_pkcs1_der(bits)?)),
                |_, bits| Ok(Box::new(RsaPrivateKey::from_pkcs1_der(bits)?)),
                |rng, params| Ok(Box::new(RsaPrivateKey::new(rng, parse_rsa_bits(params)?)?)),
            ),
        );
        registry.register(
            "DSA",
            KeyFactory::new(
                |alg_id, bits| Ok(Box::new(DsaPublicKey::from_key_bits(alg_id, bits)?)),
                |alg_id, bits| Ok(Box::new(DsaPrivateKey::from_key_bits(alg_id, bits)?)),
                |rng, params| {
                    let group = dl_group_for(rng, params)?;
                    Ok(Box::new(DsaPrivateKey::new(rng, group)?))
                },
            ),
        );
        registry.register(
            "DH",
            KeyFactory::new(
                |alg_id, bits| Ok(Box::new(DhPublicKey::from_key_bits(alg_id, bits)?)),
                |alg_id, bits| Ok(Box::new(DhPrivateKey::from_key_bits(alg_id, bits)?)),
                |rng, params| {
                    let group = dl_group_for(rng, params)?;
                    Ok(Box::new(DhPrivateKey::new(rng, group)?))
                },
            ),
        );
        registry.register(
            "ElGamal",
            KeyFactory::new(
                |alg_id, bits| Ok(Box::new(ElGamalPublicKey::from_key_bits(alg_id, bits)?)),
                |alg_id, bits| Ok(Box::new(ElGamalPrivateKey::from_key_bits(alg_id, bits)?)),
                |rng, params| {
                    let group = dl_group_for(rng, params)?;
                    Ok(Box::new(ElGamalPrivateKey::new(rng, group)?))
                },
            ),
        );
        registry.register(
            "ECDSA",
            KeyFactory::new(
                |alg_id, bits| Ok(Box::new(EcdsaPublicKey::from_key_bits(alg_id, bits)?)),
                |alg_id, bits| Ok(Box::new(EcdsaPrivateKey::from_key_bits(alg_id, bits)?)),
                |rng, params| Ok(Box::new(EcdsaPrivateKey::new(rng, ec_group_for(params)?)?)),
            ),
        );
        registry.register(
            "ECDH",
            KeyFactory::new(
                |alg_id, bits| Ok(Box::new(EcdhPublicKey::from_key_bits(alg_id, bits)?)),
                |alg_id, bits| Ok(Box::new(EcdhPrivateKey::from_key_bits(alg_id, bits)?)),
                |rng, params| Ok(Box::new(EcdhPrivateKey::new(rng, ec_group_for(params)?)?)),
            ),
        );
        registry.register(
            "ECGDSA",
            KeyFactory::new(
                |alg_id, bits| Ok(Box::new(EcgdsaPublicKey::from_key_bits(alg_id, bits)?)),
                |alg_id, bits| Ok(Box::new(EcgdsaPrivateKey::from_key_bits(alg_id, bits)?)),
                |rng, params| Ok(Box::new(EcgdsaPrivateKey::new(rng, ec_group_for(params)?)?)),
            ),
        );

        registry
    }

    /// Adds a family, replacing any previous one with the same name.
    pub fn register(&mut self, name: &str, factory: KeyFactory) {
        if self.factories.insert(name.to_string(), factory).is_some() {
            log::debug!("replaced key factory for {}", name);
        }
    }

    /// Adds a family that keys identify with `oid`, replacing any previous
    /// family of the same name. Keys with that OID in their
    /// `AlgorithmIdentifier` load through `factory`.
    pub fn register_with_oid(&mut self, name: &str, oid: ObjectIdentifier, factory: KeyFactory) {
        if let Some(previous) = self.family_oids.insert(oid, name.to_string()) {
            if previous != name {
                log::debug!("OID {} moved from {} to {}", oid, previous, name);
            }
        }
        self.register(name, factory);
    }

    /// True if `name` has a registered family.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered family names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    fn name_for_oid(&self, oid: &ObjectIdentifier) -> Result<&str> {
        match self.family_oids.get(oid) {
            Some(name) => Ok(name.as_str()),
            None => oids::lookup_name(oid).inspect_err(|_| {
                log::debug!("no algorithm name for OID {}", oid);
            }),
        }
    }

    fn factory_for_oid(&self, alg_id: &AlgorithmIdentifierOwned) -> Result<(&str, &KeyFactory)> {
        let name = self.name_for_oid(&alg_id.oid)?;
        match self.factories.get(name) {
            Some(factory) => Ok((name, factory)),
            None => {
                log::debug!("no key factory registered for {}", name);
                Err(Error::decoding(format!(
                    "unknown or unavailable public key algorithm {}",
                    name
                )))
            }
        }
    }

    /// Decodes a public key from its `AlgorithmIdentifier` and the content
    /// of the SPKI bit string.
    pub fn load_public_key(
        &self,
        alg_id: &AlgorithmIdentifierOwned,
        key_bits: &[u8],
    ) -> Result<Box<dyn PublicKey>> {
        let (name, factory) = self.factory_for_oid(alg_id)?;
        (factory.load_public)(alg_id, key_bits).inspect_err(|err| {
            log::debug!("loading {} public key failed: {}", name, err);
        })
    }

    /// Decodes a private key from its `AlgorithmIdentifier` and the content
    /// of the PKCS#8 octet string.
    pub fn load_private_key(
        &self,
        alg_id: &AlgorithmIdentifierOwned,
        key_bits: &[u8],
    ) -> Result<Box<dyn PrivateKey>> {
        let (name, factory) = self.factory_for_oid(alg_id)?;
        (factory.load_private)(alg_id, key_bits).inspect_err(|err| {
            log::debug!("loading {} private key failed: {}", name, err);
        })
    }

    /// Generates a key of family `name`. `params` is an RSA modulus size,
    /// a DL group name or prime size, or a curve name; empty selects the
    /// family default.
    pub fn create_private_key(
        &self,
        name: &str,
        rng: &mut dyn CryptoRngCore,
        params: &str,
    ) -> Result<Box<dyn PrivateKey>> {
        let create = self
            .factories
            .get(name)
            .and_then(|factory| factory.create.as_ref())
            .ok_or_else(|| {
                log::debug!("cannot create keys of unknown algorithm {}", name);
                Error::not_found(name)
            })?;
        create(rng, params)
    }

    /// DER `SubjectPublicKeyInfo` of `key`.
    pub fn encode_public_key(&self, key: &dyn PublicKey) -> Result<Vec<u8>> {
        key.subject_public_key_info()
    }

    /// DER `PrivateKeyInfo` of `key`.
    pub fn encode_private_key(&self, key: &dyn PrivateKey) -> Result<Zeroizing<Vec<u8>>> {
        key.private_key_info()
    }

    /// Decodes a DER `SubjectPublicKeyInfo`.
    pub fn load_public_key_der(&self, der: &[u8]) -> Result<Box<dyn PublicKey>> {
        let spki = SubjectPublicKeyInfoOwned::from_der(der)?;
        let key_bits = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| Error::decoding("SubjectPublicKeyInfo: unaligned key bits"))?;
        self.load_public_key(&spki.algorithm, key_bits)
    }

    /// Decodes a DER `PrivateKeyInfo`.
    pub fn load_private_key_der(&self, der: &[u8]) -> Result<Box<dyn PrivateKey>> {
        let info = pkcs8::PrivateKeyInfo::from_der(der)?;
        let alg_id = AlgorithmIdentifierOwned {
            oid: info.algorithm.oid,
            parameters: info.algorithm.parameters.map(Any::from),
        };
        self.load_private_key(&alg_id, info.private_key)
    }
}
