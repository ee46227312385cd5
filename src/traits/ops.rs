//! Raw operations a key hands out to the `Pk*` wrappers.
//!
//! The operations work on already-encoded representatives: padding and
//! hashing happen in the wrapper, which owns the encoding method.

use alloc::vec::Vec;

use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::errors::Result;

/// Raw signature generation.
pub trait SignatureOp {
    /// Bits of representative the primitive accepts.
    fn max_input_bits(&self) -> usize;

    /// Signs a representative. Multi-part signatures are returned as the
    /// fixed-width concatenation of their parts.
    fn sign(&self, msg: &[u8], rng: &mut dyn CryptoRngCore) -> Result<Vec<u8>>;
}

/// Raw signature verification.
pub trait VerificationOp {
    /// Bits of representative the primitive accepts.
    fn max_input_bits(&self) -> usize;

    /// True if the scheme recovers the representative from the signature,
    /// in which case [`VerificationOp::recover`] is used instead of
    /// [`VerificationOp::verify`].
    fn with_recovery(&self) -> bool {
        false
    }

    /// Checks a signature over a representative.
    fn verify(&self, _msg: &[u8], _sig: &[u8]) -> Result<bool> {
        Err(crate::errors::Error::internal(
            "verification without message recovery is not supported",
        ))
    }

    /// Recovers the representative from a signature.
    fn recover(&self, _sig: &[u8]) -> Result<Vec<u8>> {
        Err(crate::errors::Error::internal(
            "verification with message recovery is not supported",
        ))
    }
}

/// Raw encryption of a padded block.
pub trait EncryptionOp {
    /// Bits of block the primitive accepts.
    fn max_raw_input_bits(&self) -> usize;

    /// Encrypts a padded block.
    fn encrypt(&self, msg: &[u8], rng: &mut dyn CryptoRngCore) -> Result<Vec<u8>>;
}

/// Raw decryption returning the padded block.
pub trait DecryptionOp {
    /// Bits of block the primitive produces.
    fn max_raw_input_bits(&self) -> usize;

    /// Decrypts a ciphertext. An RNG enables blinding of the private
    /// operation.
    fn decrypt(
        &self,
        ciphertext: &[u8],
        rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<Zeroizing<Vec<u8>>>;
}

/// Raw key agreement.
pub trait KeyAgreementOp {
    /// Computes the shared secret with the peer's public value.
    fn agree(
        &self,
        other: &[u8],
        rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<Zeroizing<Vec<u8>>>;
}
