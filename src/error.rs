//! Define this crate error type.

use std::{
    array::TryFromSliceError,
    num::TryFromIntError,
    string::FromUtf8Error,
};

use cosmian_crypto_core::CryptoCoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid policy: {0}")]
    PolicyCompile(String),
    #[error("setup failed: {0}")]
    Setup(String),
    #[error("key generation failed: {0}")]
    KeyGen(String),
    #[error(
        "Unable to decrypt the ciphertext. User private key attributes do not satisfy the \
         access policy."
    )]
    PolicyNotSatisfied,
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("unsupported curve: {0}")]
    UnsupportedCurve(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    CryptoCoreError(CryptoCoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json parsing error: {0}")]
    JsonParsing(String),
    #[error("conversion failed: {0}")]
    ConversionFailed(String),
}

impl Error {
    /// Returns `true` if this error reports an access denial rather than a
    /// failure: the key is valid but its attributes do not satisfy the
    /// ciphertext policy.
    #[must_use]
    pub fn is_policy_not_satisfied(&self) -> bool {
        matches!(self, Self::PolicyNotSatisfied)
    }
}

impl From<CryptoCoreError> for Error {
    fn from(e: CryptoCoreError) -> Self {
        Self::CryptoCoreError(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::JsonParsing(e.to_string())
    }
}

impl From<TryFromIntError> for Error {
    fn from(e: TryFromIntError) -> Self {
        Self::ConversionFailed(e.to_string())
    }
}

impl From<TryFromSliceError> for Error {
    fn from(e: TryFromSliceError) -> Self {
        Self::ConversionFailed(e.to_string())
    }
}

impl From<FromUtf8Error> for Error {
    fn from(e: FromUtf8Error) -> Self {
        Self::Serialization(format!("invalid UTF-8 string: {e}"))
    }
}
