//! This crate implements Ciphertext-Policy Attribute-Based Encryption
//! (Bethencourt, Sahai, Waters) over BLS12-381, which allows to:
//! - encrypt a blinding factor under a boolean access policy over named
//! attributes, written with `and`, `or` and `k of (...)` threshold gates;
//! - issue private keys for sets of attributes;
//! - decrypt if the key attributes satisfy the ciphertext policy.
//!
//! The `api` module exposes the `Cpabe` object. The `envelope` module uses
//! the recovered blinding factor to derive the AES256-GCM key of a bulk
//! payload. The `key_store` module persists the authority key pair.
//!
//! # Example
//!
//! See `demos/runme.rs`.

mod error;

pub mod ae;
pub mod api;
pub mod bytes_ser_de;
pub mod config;
pub mod core;
pub mod envelope;
pub mod key_store;
pub mod policy;
pub mod traits;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use error::Error;

pub use self::{
    api::Cpabe,
    config::{Curve, SchemeConfig},
    core::{
        BlindingFactor, Ciphertext, KeyInfo, KeyMetadata, MasterSecret, PrivateKey, PublicParams,
    },
    envelope::Envelope,
    key_store::KeyStore,
    policy::AccessStructure,
};
