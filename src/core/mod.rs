//! Implements the core functionalities of the CP-ABE scheme.

use std::{
    collections::HashMap,
    time::{SystemTime, UNIX_EPOCH},
};

use bls12_381_plus::ff::Field;
use zeroize::{Zeroize, ZeroizeOnDrop};

use self::group::{G1Projective, G2Projective, Gt, Scalar};
use crate::{
    config::SchemeConfig,
    policy::{AccessStructure, ThresholdTree},
};

pub mod group;
pub mod polynomial;
pub mod primitives;
pub mod serialization;

#[cfg(test)]
mod tests;

/// Public parameters of the scheme.
///
/// Immutable after setup. By construction `h = g^β` and `f = g^(1/β)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicParams {
    pub(crate) config: SchemeConfig,
    pub(crate) g: G1Projective,
    pub(crate) h: G1Projective,
    pub(crate) f: G1Projective,
    pub(crate) gp: G2Projective,
    /// `e(g, gp^α)`
    pub(crate) g_hat_alpha: Gt,
}

impl PublicParams {
    #[must_use]
    pub fn config(&self) -> &SchemeConfig {
        &self.config
    }
}

/// Master secret of the authority. Never handed to users.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterSecret {
    pub(crate) beta: Scalar,
    /// `gp^α`
    pub(crate) g_alpha: G2Projective,
}

impl Zeroize for MasterSecret {
    fn zeroize(&mut self) {
        self.beta = Scalar::ZERO;
        self.g_alpha = G2Projective::IDENTITY;
    }
}

impl Drop for MasterSecret {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for MasterSecret {}

/// Advisory traceability data of a private key. It is not bound to the key
/// material and decryption never reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMetadata {
    pub user_id: String,
    pub user_email: String,
    /// Milliseconds since the Unix epoch, `0` when unknown.
    pub issued_at: i64,
    /// Milliseconds since the Unix epoch, `i64::MAX` for no expiry.
    pub expires_at: i64,
}

impl Default for KeyMetadata {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            user_email: String::new(),
            issued_at: 0,
            expires_at: i64::MAX,
        }
    }
}

impl KeyMetadata {
    /// Metadata of a key issued now to the given user, valid for the
    /// configured number of days.
    #[must_use]
    pub fn issued_now(
        user_id: impl Into<String>,
        user_email: impl Into<String>,
        config: &SchemeConfig,
    ) -> Self {
        let issued_at = now_millis();
        Self {
            user_id: user_id.into(),
            user_email: user_email.into(),
            issued_at,
            expires_at: issued_at.saturating_add(config.key_validity_millis()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrivateKeyComponent {
    pub(crate) attribute: String,
    /// `gp^r · H(attr)^r_j`
    pub(crate) d: G2Projective,
    /// `g^r_j`
    pub(crate) d_prime: G1Projective,
}

impl PrivateKeyComponent {
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

/// A user private key: one component per attribute, in issuance order.
#[derive(Debug, Clone, PartialEq)]
pub struct PrivateKey {
    /// `(gp^α · gp^r)^(1/β)`
    pub(crate) d: G2Projective,
    pub(crate) metadata: KeyMetadata,
    pub(crate) components: Vec<PrivateKeyComponent>,
}

/// Key validation report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub valid: bool,
    pub attributes: Vec<String>,
    pub issued_to: Option<String>,
    pub issued_on: Option<i64>,
    pub expires_on: Option<i64>,
}

impl PrivateKey {
    #[must_use]
    pub fn metadata(&self) -> &KeyMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn components(&self) -> &[PrivateKeyComponent] {
        &self.components
    }

    /// Attributes of the key, in issuance order.
    #[must_use]
    pub fn attributes(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.attribute.as_str()).collect()
    }

    /// Returns `true` if the key expiry date is reached at `now`
    /// (milliseconds since the Unix epoch).
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.metadata.expires_at
    }

    #[must_use]
    pub fn info(&self, now: i64) -> KeyInfo {
        let issued_to = [&self.metadata.user_id, &self.metadata.user_email]
            .into_iter()
            .find(|s| !s.is_empty())
            .cloned();
        KeyInfo {
            valid: !self.is_expired(now),
            attributes: self.attributes().into_iter().map(String::from).collect(),
            issued_to,
            issued_on: (self.metadata.issued_at != 0).then_some(self.metadata.issued_at),
            expires_on: (self.metadata.expires_at != i64::MAX)
                .then_some(self.metadata.expires_at),
        }
    }

    /// Maps each attribute to the index of its component.
    pub(crate) fn component_lookup(&self) -> HashMap<&str, usize> {
        self.components
            .iter()
            .enumerate()
            .map(|(i, c)| (c.attribute.as_str(), i))
            .collect()
    }
}

/// Policy tree of a ciphertext, each leaf holding its share of the
/// encryption secret.
#[derive(Debug, Clone, PartialEq)]
pub enum CiphertextNode {
    Leaf {
        attribute: String,
        /// `g^q(0)`
        c: G1Projective,
        /// `H(attr)^q(0)`
        c_prime: G2Projective,
    },
    Threshold {
        k: usize,
        children: Vec<CiphertextNode>,
    },
}

impl CiphertextNode {
    /// The access structure this tree was built from.
    #[must_use]
    pub fn access_structure(&self) -> AccessStructure {
        match self {
            Self::Leaf { attribute, .. } => AccessStructure::Leaf(attribute.clone()),
            Self::Threshold { k, children } => AccessStructure::Threshold {
                k: *k,
                children: children.iter().map(Self::access_structure).collect(),
            },
        }
    }
}

impl ThresholdTree for CiphertextNode {
    fn attribute(&self) -> Option<&str> {
        match self {
            Self::Leaf { attribute, .. } => Some(attribute.as_str()),
            Self::Threshold { .. } => None,
        }
    }

    fn threshold(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Threshold { k, .. } => *k,
        }
    }

    fn children(&self) -> &[Self] {
        match self {
            Self::Leaf { .. } => &[],
            Self::Threshold { children, .. } => children,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ciphertext {
    /// `m · e(g, gp)^(α·s)`
    pub(crate) c_tilde: Gt,
    /// `h^s`
    pub(crate) c: G1Projective,
    /// Milliseconds since the Unix epoch.
    pub(crate) encryption_date: i64,
    pub(crate) policy: CiphertextNode,
}

impl Ciphertext {
    #[must_use]
    pub fn policy(&self) -> &CiphertextNode {
        &self.policy
    }

    #[must_use]
    pub fn encryption_date(&self) -> i64 {
        self.encryption_date
    }
}

/// The `GT` element protected by a ciphertext, used to derive a symmetric
/// key.
#[derive(Debug, Clone, PartialEq)]
pub struct BlindingFactor(pub(crate) Gt);

impl BlindingFactor {
    /// Canonical encoding of the element.
    #[must_use]
    pub fn to_bytes(&self) -> zeroize::Zeroizing<[u8; group::GT_LENGTH]> {
        zeroize::Zeroizing::new(group::gt_to_bytes(&self.0))
    }
}

impl Drop for BlindingFactor {
    fn drop(&mut self) {
        self.0 = Gt::IDENTITY;
    }
}

/// Milliseconds elapsed since the Unix epoch.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}
