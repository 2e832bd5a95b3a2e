//! Setup, key generation, encryption and decryption of the CP-ABE scheme
//! (Bethencourt, Sahai, Waters) over threshold access trees.

use std::collections::HashSet;

use bls12_381_plus::ff::Field;
use cosmian_crypto_core::reexport::rand_core::CryptoRngCore;
use tracing::debug;

use super::{
    group::{
        hash_attribute, invert, pairing, random_g1, random_g2, random_gt, random_nonzero_scalar,
        random_scalar, Gt, Scalar,
    },
    polynomial::{lagrange_coefficient, Polynomial},
    BlindingFactor, Ciphertext, CiphertextNode, KeyMetadata, MasterSecret, PrivateKey,
    PrivateKeyComponent, PublicParams,
};
use crate::{
    config::SchemeConfig,
    policy::{AccessStructure, Selection, ThresholdTree},
    Error,
};

/// Counts the expensive operations of a decryption.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecryptionStats {
    pub pairings: usize,
    pub leaves: usize,
}

/// Generates the public parameters and the master secret.
#[tracing::instrument(skip_all)]
pub fn setup(
    rng: &mut impl CryptoRngCore,
    config: SchemeConfig,
) -> Result<(PublicParams, MasterSecret), Error> {
    config
        .validate()
        .map_err(|e| Error::Setup(format!("invalid configuration: {e}")))?;

    let g = random_g1(rng);
    let gp = random_g2(rng);
    let alpha = random_scalar(rng);
    let beta = random_nonzero_scalar(rng);
    let beta_inv = invert(&beta).ok_or_else(|| Error::Setup("β is not invertible".to_string()))?;

    let g_alpha = gp * alpha;
    let pp = PublicParams {
        g_hat_alpha: pairing(&g, &g_alpha),
        h: g * beta,
        f: g * beta_inv,
        g,
        gp,
        config,
    };
    debug!(curve = ?pp.config.curve, "generated public parameters");

    Ok((pp, MasterSecret { beta, g_alpha }))
}

/// Trims the attributes, rejects empty ones and drops duplicates, keeping
/// the first occurrence order.
fn normalize_attributes<S: AsRef<str>>(attributes: &[S]) -> Result<Vec<String>, Error> {
    let mut seen = HashSet::with_capacity(attributes.len());
    let mut normalized = Vec::with_capacity(attributes.len());
    for attribute in attributes {
        let attribute = attribute.as_ref().trim();
        if attribute.is_empty() {
            return Err(Error::KeyGen("empty attribute".to_string()));
        }
        if seen.insert(attribute) {
            normalized.push(attribute.to_string());
        }
    }
    Ok(normalized)
}

/// Issues a private key for the given attributes.
///
/// The order of the attributes is kept in the key components.
#[tracing::instrument(skip_all)]
pub fn keygen<S: AsRef<str>>(
    rng: &mut impl CryptoRngCore,
    pp: &PublicParams,
    msk: &MasterSecret,
    attributes: &[S],
    metadata: KeyMetadata,
) -> Result<PrivateKey, Error> {
    let attributes = normalize_attributes(attributes)?;
    let beta_inv = invert(&msk.beta)
        .ok_or_else(|| Error::KeyGen("corrupted master secret: β is zero".to_string()))?;

    let g_r = pp.gp * random_scalar(rng);
    let d = (msk.g_alpha + g_r) * beta_inv;

    let dst = pp.config.dst();
    let components = attributes
        .into_iter()
        .map(|attribute| {
            let r_j = random_scalar(rng);
            PrivateKeyComponent {
                d: g_r + hash_attribute(&attribute, dst) * r_j,
                d_prime: pp.g * r_j,
                attribute,
            }
        })
        .collect::<Vec<_>>();
    debug!(attributes = components.len(), "issued private key");

    Ok(PrivateKey {
        d,
        metadata,
        components,
    })
}

/// Shares `secret` along the tree: a threshold node `k of n` draws a random
/// polynomial `q` of degree `k - 1` with `q(0) = secret` and hands `q(i)` to
/// its `i`-th child (1-based).
fn fill_policy(
    rng: &mut impl CryptoRngCore,
    pp: &PublicParams,
    node: &AccessStructure,
    secret: Scalar,
) -> CiphertextNode {
    match node {
        AccessStructure::Leaf(attribute) => CiphertextNode::Leaf {
            c: pp.g * secret,
            c_prime: hash_attribute(attribute, pp.config.dst()) * secret,
            attribute: attribute.clone(),
        },
        AccessStructure::Threshold { k, children } => {
            let q = Polynomial::random(rng, k - 1, secret);
            CiphertextNode::Threshold {
                k: *k,
                children: children
                    .iter()
                    .enumerate()
                    .map(|(i, child)| fill_policy(rng, pp, child, q.share(i + 1)))
                    .collect(),
            }
        }
    }
}

/// Encrypts a fresh random blinding factor under the given access structure.
///
/// Returns the ciphertext and the blinding factor it protects.
#[tracing::instrument(skip_all)]
pub fn encrypt(
    rng: &mut impl CryptoRngCore,
    pp: &PublicParams,
    policy: &AccessStructure,
    encryption_date: i64,
) -> Result<(Ciphertext, BlindingFactor), Error> {
    policy.check()?;

    let s = random_scalar(rng);
    let m = random_gt(rng);

    let ciphertext = Ciphertext {
        c_tilde: m + pp.g_hat_alpha * s,
        c: pp.h * s,
        encryption_date,
        policy: fill_policy(rng, pp, policy, s),
    };
    debug!(leaves = ciphertext.policy.leaf_count(), "encrypted");

    Ok((ciphertext, BlindingFactor(m)))
}

/// Accumulates `e(g, gp)^(r·q(0))` of the selected leaves of `node`, each
/// raised to its Lagrange exponent.
///
/// # Panics
///
/// Panics if the selection was not computed on this tree and key.
fn dec_node_flatten(
    node: &CiphertextNode,
    selection: &Selection,
    key: &PrivateKey,
    exp: Scalar,
    acc: &mut Gt,
    stats: &mut DecryptionStats,
) {
    match (node, selection) {
        (CiphertextNode::Leaf { attribute, c, c_prime }, Selection::Leaf { component }) => {
            let component = key
                .components
                .get(*component)
                .filter(|component| component.attribute == *attribute)
                .unwrap_or_else(|| panic!("no key component matches the leaf '{attribute}'"));
            let term = pairing(c, &component.d) - pairing(&component.d_prime, c_prime);
            *acc += term * exp;
            stats.pairings += 2;
            stats.leaves += 1;
        }
        (CiphertextNode::Threshold { k, children }, Selection::Threshold { chosen, .. }) => {
            assert_eq!(chosen.len(), *k, "chosen children do not match the threshold");
            let indices = chosen.iter().map(|(i, _)| *i).collect::<Vec<_>>();
            for (i, child_selection) in chosen {
                let child = children
                    .get(i - 1)
                    .unwrap_or_else(|| panic!("chosen child {i} out of {}", children.len()));
                dec_node_flatten(
                    child,
                    child_selection,
                    key,
                    exp * lagrange_coefficient(*i, &indices),
                    acc,
                    stats,
                );
            }
        }
        _ => panic!("the leaf selection does not match the ciphertext tree"),
    }
}

/// Decrypts the ciphertext and counts the pairings performed.
///
/// When the key attributes do not satisfy the policy, returns
/// `Error::PolicyNotSatisfied` before any group operation.
#[tracing::instrument(skip_all)]
pub fn decrypt_with_stats(
    key: &PrivateKey,
    ciphertext: &Ciphertext,
) -> Result<(BlindingFactor, DecryptionStats), Error> {
    let lookup = key.component_lookup();
    let find = |attribute: &str| lookup.get(attribute).copied();

    if !ciphertext.policy.is_satisfied(&find) {
        debug!("key attributes do not satisfy the ciphertext policy");
        return Err(Error::PolicyNotSatisfied);
    }
    let selection = ciphertext
        .policy
        .pick_min_leaves(&find)
        .unwrap_or_else(|| panic!("a satisfied policy has no leaf selection"));

    let mut stats = DecryptionStats::default();
    let mut acc = Gt::IDENTITY;
    dec_node_flatten(
        &ciphertext.policy,
        &selection,
        key,
        Scalar::ONE,
        &mut acc,
        &mut stats,
    );
    let e_c_d = pairing(&ciphertext.c, &key.d);
    stats.pairings += 1;
    debug!(leaves = stats.leaves, pairings = stats.pairings, "decrypted");

    Ok((BlindingFactor(ciphertext.c_tilde + acc - e_c_d), stats))
}

/// Recovers the blinding factor protected by the ciphertext.
pub fn decrypt(key: &PrivateKey, ciphertext: &Ciphertext) -> Result<BlindingFactor, Error> {
    decrypt_with_stats(key, ciphertext).map(|(m, _)| m)
}
