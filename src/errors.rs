//! Error types.

use alloc::string::{String, ToString};

/// Alias for [`core::result::Result`] with the `pkcore` crate's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed or out-of-domain input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A modulus or divisor was zero.
    #[error("division by zero")]
    DivideByZero,

    /// Unparseable or unrecognized encoded structure or algorithm name.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),

    /// The requested scheme does not match any available implementation.
    #[error("algorithm not found: {0}")]
    AlgorithmNotFound(String),

    /// Message too long for the key or padding scheme.
    #[error("message too long")]
    MessageTooLong,

    /// Decryption error.
    #[error("decryption error")]
    Decryption,

    /// Verification error.
    #[error("verification error")]
    Verification,

    /// Input must be hashed.
    #[error("input must be hashed")]
    InputNotHashed,

    /// Invalid padding length.
    #[error("invalid padding length")]
    InvalidPadLen,

    /// Label too long.
    #[error("label too long")]
    LabelTooLong,
}

impl Error {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn decoding(msg: impl Into<String>) -> Self {
        Error::Decoding(msg.into())
    }

    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    pub(crate) fn not_found(name: impl Into<String>) -> Self {
        Error::AlgorithmNotFound(name.into())
    }
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Decoding(err.to_string())
    }
}

impl From<pkcs1::Error> for Error {
    fn from(err: pkcs1::Error) -> Error {
        Error::Decoding(err.to_string())
    }
}

impl From<pkcs8::Error> for Error {
    fn from(err: pkcs8::Error) -> Error {
        Error::Decoding(err.to_string())
    }
}

impl From<spki::Error> for Error {
    fn from(err: spki::Error) -> Error {
        Error::Decoding(err.to_string())
    }
}

#[cfg(feature = "pbes2")]
impl From<pkcs5::Error> for Error {
    fn from(err: pkcs5::Error) -> Error {
        match err {
            pkcs5::Error::DecryptFailed => Error::Decryption,
            other => Error::Decoding(other.to_string()),
        }
    }
}
