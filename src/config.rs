//! Scheme configuration.
//!
//! The configuration is data: its JSON form is stored as the pairing
//! description of the public parameters, so that every party loading the
//! public parameters uses the same curve and the same attribute hash map.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Default domain separation tag of the attribute hash-to-curve map.
pub const DEFAULT_HASH_TO_CURVE_DST: &str = "CPABE-V01-CS01-with-BLS12381G2_XMD:SHA-256_SSWU_RO_";

/// Issued private keys expire one year after issuance by default.
pub const DEFAULT_KEY_VALIDITY_DAYS: u32 = 365;

/// Pairing-friendly curves the scheme can be instantiated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Curve {
    #[serde(rename = "BLS12-381")]
    Bls12_381,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeConfig {
    pub curve: Curve,
    pub hash_to_curve_dst: String,
    pub key_validity_days: u32,
}

impl Default for SchemeConfig {
    fn default() -> Self {
        Self {
            curve: Curve::Bls12_381,
            hash_to_curve_dst: DEFAULT_HASH_TO_CURVE_DST.to_string(),
            key_validity_days: DEFAULT_KEY_VALIDITY_DAYS,
        }
    }
}

impl SchemeConfig {
    /// Checks the configuration can be used to run the scheme.
    pub fn validate(&self) -> Result<(), Error> {
        if self.hash_to_curve_dst.is_empty() {
            return Err(Error::Config(
                "the hash-to-curve domain separation tag cannot be empty".to_string(),
            ));
        }
        // RFC 9380 forbids tags longer than 255 bytes
        if self.hash_to_curve_dst.len() > 255 {
            return Err(Error::Config(format!(
                "the hash-to-curve domain separation tag is {} bytes long, 255 at most",
                self.hash_to_curve_dst.len()
            )));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration.
    ///
    /// Unknown curves are reported as `Error::UnsupportedCurve`.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if let Some(curve) = value.get("curve") {
            if serde_json::from_value::<Curve>(curve.clone()).is_err() {
                return Err(Error::UnsupportedCurve(curve.to_string()));
            }
        }
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    #[must_use]
    pub fn dst(&self) -> &[u8] {
        self.hash_to_curve_dst.as_bytes()
    }

    /// Validity period of issued private keys, in milliseconds.
    #[must_use]
    pub fn key_validity_millis(&self) -> i64 {
        i64::from(self.key_validity_days) * 24 * 60 * 60 * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json() -> Result<(), Error> {
        let config = SchemeConfig::default();
        let json = config.to_json()?;
        assert!(json.contains("BLS12-381"));
        assert_eq!(config, SchemeConfig::from_json(&json)?);
        Ok(())
    }

    #[test]
    fn test_unsupported_curve() {
        let json = r#"{"curve":"type a","hash_to_curve_dst":"dst","key_validity_days":1}"#;
        assert!(matches!(
            SchemeConfig::from_json(json),
            Err(Error::UnsupportedCurve(_))
        ));
    }

    #[test]
    fn test_invalid_dst() {
        let json = r#"{"curve":"BLS12-381","hash_to_curve_dst":"","key_validity_days":1}"#;
        assert!(matches!(SchemeConfig::from_json(json), Err(Error::Config(_))));
    }
}
