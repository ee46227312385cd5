#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Supported algorithms
//!
//! | Family  | Signatures           | Encryption           | Key agreement |
//! |---------|----------------------|----------------------|---------------|
//! | RSA     | `EMSA3`, `EMSA4`, `Raw` | `EME-PKCS1-v1_5`, `OAEP`, `Raw` |     |
//! | DSA     | `EMSA1`, `Raw`       |                      |               |
//! | DH      |                      |                      | `Raw`, `KDF2`, `HKDF` |
//! | ElGamal |                      | `EME-PKCS1-v1_5`, `OAEP`, `Raw` |     |
//! | ECDSA   | `EMSA1`, `Raw`       |                      |               |
//! | ECGDSA  | `EMSA1`, `Raw`       |                      |               |
//! | ECDH    |                      |                      | `Raw`, `KDF2`, `HKDF` |
//!
//! Schemes are selected by name, e.g. `EMSA4(SHA-256,MGF1,32)` or
//! `OAEP(SHA-1)`, and operations go through the [`PkSigner`],
//! [`PkVerifier`], [`PkEncryptor`], [`PkDecryptor`] and [`PkKeyAgreement`]
//! front ends, which work on any [`PublicKey`] or [`PrivateKey`].
//!
//! # Usage
//!
//! ## Signatures
//! ```
//! use pkcore::{ec::EcGroup, ecdsa::EcdsaPrivateKey, PkSigner, PkVerifier, PrivateKey};
//! use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
//!
//! let mut rng = ChaCha8Rng::from_seed([42; 32]);
//! let group = EcGroup::from_name("secp256r1").unwrap();
//! let key = EcdsaPrivateKey::new(&mut rng, group).unwrap();
//!
//! let mut signer = PkSigner::new(&key, "EMSA1(SHA-256)").unwrap();
//! let signature = signer.sign_message(b"hello world", &mut rng).unwrap();
//!
//! let public_key = key.public_key();
//! let mut verifier = PkVerifier::new(&*public_key, "EMSA1(SHA-256)").unwrap();
//! assert!(verifier.verify_message(b"hello world", &signature).unwrap());
//! ```
//!
//! ## Encryption
//! ```
//! use pkcore::{PkDecryptor, PkEncryptor, RsaPrivateKey};
//! use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
//!
//! let mut rng = ChaCha8Rng::from_seed([42; 32]);
//! let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
//! let public_key = key.to_public_key();
//!
//! let encryptor = PkEncryptor::new(&public_key, "OAEP(SHA-256)").unwrap();
//! let ciphertext = encryptor.encrypt(b"hello world", &mut rng).unwrap();
//!
//! let decryptor = PkDecryptor::new(&key, "OAEP(SHA-256)").unwrap();
//! let plaintext = decryptor.decrypt(&ciphertext, Some(&mut rng)).unwrap();
//! assert_eq!(plaintext.as_slice(), b"hello world");
//! ```
//!
//! ## Key agreement
//! ```
//! use pkcore::{dh::DhPrivateKey, dl_group::DlGroup, PkKeyAgreement, PrivateKey};
//! use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
//!
//! let mut rng = ChaCha8Rng::from_seed([42; 32]);
//! let group = DlGroup::from_name("modp/ietf/2048").unwrap();
//! let alice = DhPrivateKey::new(&mut rng, group.clone()).unwrap();
//! let bob = DhPrivateKey::new(&mut rng, group).unwrap();
//!
//! let ka = PkKeyAgreement::new(&alice, "HKDF(SHA-256)").unwrap();
//! let kb = PkKeyAgreement::new(&bob, "HKDF(SHA-256)").unwrap();
//! let bob_value = bob.public_value().unwrap();
//! let alice_value = alice.public_value().unwrap();
//! assert_eq!(
//!     ka.derive_key(32, &bob_value, b"salt", Some(&mut rng)).unwrap(),
//!     kb.derive_key(32, &alice_value, b"salt", None).unwrap(),
//! );
//! ```

#[macro_use]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub use num_bigint::BigUint;
pub use rand_core;

pub mod algorithms;
pub mod dh;
pub mod dl_group;
pub mod dsa;
pub mod ec;
pub mod ecc_key;
pub mod ecdh;
pub mod ecdsa;
pub mod ecgdsa;
pub mod elgamal;
pub mod errors;
pub mod math;
pub mod oids;
#[cfg(feature = "pbes2")]
pub mod pbes2;
pub mod pubkey;
pub mod registry;
pub mod rsa;
pub mod traits;
pub mod x509;

mod rng;

pub use der;
pub use pkcs1;
pub use pkcs8;
pub use spki;

pub use crate::{
    errors::{Error, Result},
    pubkey::{
        PkDecryptor, PkEncryptor, PkKeyAgreement, PkSigner, PkVerifier, SignatureFormat,
        SignatureOptions,
    },
    registry::AlgorithmRegistry,
    rsa::{RsaPrivateKey, RsaPublicKey},
    traits::{PrivateKey, PublicKey},
};
