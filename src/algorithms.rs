//! Useful algorithms related to RSA and the other key families: hashes,
//! signature and encryption encodings, key derivation.

pub(crate) mod generate;
pub(crate) mod mgf;
pub(crate) mod oaep;
pub(crate) mod pkcs1v15;
pub(crate) mod pss;

pub mod eme;
pub mod emsa;
pub mod hash;
pub mod kdf;
pub mod name;
pub mod rsa;

pub use self::{
    eme::{get_eme, Eme},
    emsa::{get_emsa, Emsa},
    hash::{hash_by_name, HashFunction},
    kdf::{get_kdf, Kdf},
    name::SchemeName,
};
