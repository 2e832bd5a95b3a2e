//! BLS12-381 instantiation of the bilinear group `e: G1 x G2 -> GT`.
//!
//! `GT` is written additively: the group law is `+` and exponentiation is a
//! multiplication by a scalar.

pub use bls12_381_plus::{G1Projective, G2Projective, Gt, Scalar};
use bls12_381_plus::{
    elliptic_curve::hash2curve::ExpandMsgXmd,
    ff::Field,
    group::{Curve, Group},
    G1Affine, G2Affine,
};
use cosmian_crypto_core::reexport::rand_core::CryptoRngCore;

use crate::Error;

/// Length of a compressed G1 point.
pub const G1_LENGTH: usize = 48;

/// Length of a compressed G2 point.
pub const G2_LENGTH: usize = 96;

/// Length of a `GT` element.
pub const GT_LENGTH: usize = 576;

/// Length of a scalar.
pub const SCALAR_LENGTH: usize = 32;

/// Samples a uniformly random scalar.
pub fn random_scalar(rng: &mut impl CryptoRngCore) -> Scalar {
    // wide reduction of 64 bytes keeps the bias negligible
    let mut bytes = [0u8; 64];
    rng.fill_bytes(&mut bytes);
    Scalar::from_bytes_wide(&bytes)
}

/// Samples a uniformly random invertible scalar.
pub fn random_nonzero_scalar(rng: &mut impl CryptoRngCore) -> Scalar {
    loop {
        let s = random_scalar(rng);
        if !bool::from(s.is_zero()) {
            return s;
        }
    }
}

pub fn random_g1(rng: &mut impl CryptoRngCore) -> G1Projective {
    G1Projective::GENERATOR * random_nonzero_scalar(rng)
}

pub fn random_g2(rng: &mut impl CryptoRngCore) -> G2Projective {
    G2Projective::GENERATOR * random_nonzero_scalar(rng)
}

pub fn random_gt(rng: &mut impl CryptoRngCore) -> Gt {
    Gt::generator() * random_scalar(rng)
}

pub fn invert(s: &Scalar) -> Option<Scalar> {
    Option::from(s.invert())
}

pub fn pairing(a: &G1Projective, b: &G2Projective) -> Gt {
    bls12_381_plus::pairing(&a.to_affine(), &b.to_affine())
}

/// Maps an attribute onto G2 using the RFC 9380 hash-to-curve suite
/// `BLS12381G2_XMD:SHA-256_SSWU_RO_`.
pub fn hash_attribute(attribute: &str, dst: &[u8]) -> G2Projective {
    G2Projective::hash::<ExpandMsgXmd<sha2::Sha256>>(attribute.as_bytes(), dst)
}

#[must_use]
pub fn g1_to_bytes(p: &G1Projective) -> [u8; G1_LENGTH] {
    p.to_affine().to_compressed()
}

pub fn g1_from_bytes(bytes: &[u8; G1_LENGTH]) -> Result<G1Projective, Error> {
    Option::<G1Affine>::from(G1Affine::from_compressed(bytes))
        .map(G1Projective::from)
        .ok_or_else(|| Error::Serialization("invalid G1 point encoding".to_string()))
}

#[must_use]
pub fn g2_to_bytes(p: &G2Projective) -> [u8; G2_LENGTH] {
    p.to_affine().to_compressed()
}

pub fn g2_from_bytes(bytes: &[u8; G2_LENGTH]) -> Result<G2Projective, Error> {
    Option::<G2Affine>::from(G2Affine::from_compressed(bytes))
        .map(G2Projective::from)
        .ok_or_else(|| Error::Serialization("invalid G2 point encoding".to_string()))
}

#[must_use]
pub fn gt_to_bytes(e: &Gt) -> [u8; GT_LENGTH] {
    e.to_bytes()
}

pub fn gt_from_bytes(bytes: &[u8; GT_LENGTH]) -> Result<Gt, Error> {
    Option::<Gt>::from(Gt::from_bytes(bytes))
        .ok_or_else(|| Error::Serialization("invalid GT element encoding".to_string()))
}

/// Big-endian encoding of a scalar.
#[must_use]
pub fn scalar_to_bytes(s: &Scalar) -> [u8; SCALAR_LENGTH] {
    s.to_be_bytes()
}

pub fn scalar_from_bytes(bytes: &[u8; SCALAR_LENGTH]) -> Result<Scalar, Error> {
    Option::<Scalar>::from(Scalar::from_be_bytes(bytes))
        .ok_or_else(|| Error::Serialization("non canonical scalar encoding".to_string()))
}
