//! Key and operation trait definitions.

mod keys;
mod ops;

pub use keys::{PrivateKey, PublicKey};
pub use ops::{DecryptionOp, EncryptionOp, KeyAgreementOp, SignatureOp, VerificationOp};
