//! Implements the serialization methods of the scheme objects.
//!
//! Every object starts with the format version byte. Integers are
//! big-endian, group elements and strings are `u32` length-prefixed.

use super::{
    group::{
        g1_from_bytes, g1_to_bytes, g2_from_bytes, g2_to_bytes, gt_from_bytes, gt_to_bytes,
        scalar_from_bytes, scalar_to_bytes, G1Projective, G2Projective, Gt, G1_LENGTH, G2_LENGTH,
        GT_LENGTH, SCALAR_LENGTH,
    },
    Ciphertext, CiphertextNode, KeyMetadata, MasterSecret, PrivateKey, PrivateKeyComponent,
    PublicParams,
};
pub use crate::policy::MAX_POLICY_DEPTH;
use crate::{
    bytes_ser_de::{array_length, Deserializer, Serializable, Serializer},
    config::SchemeConfig,
    Error,
};

const G1_ARRAY_LENGTH: usize = array_length(G1_LENGTH);
const G2_ARRAY_LENGTH: usize = array_length(G2_LENGTH);
const GT_ARRAY_LENGTH: usize = array_length(GT_LENGTH);

fn write_g1(ser: &mut Serializer, p: &G1Projective) -> Result<usize, Error> {
    ser.write_array(&g1_to_bytes(p))
}

fn read_g1(de: &mut Deserializer) -> Result<G1Projective, Error> {
    g1_from_bytes(&de.read_fixed::<G1_LENGTH>()?)
}

fn write_g2(ser: &mut Serializer, p: &G2Projective) -> Result<usize, Error> {
    ser.write_array(&g2_to_bytes(p))
}

fn read_g2(de: &mut Deserializer) -> Result<G2Projective, Error> {
    g2_from_bytes(&de.read_fixed::<G2_LENGTH>()?)
}

fn write_gt(ser: &mut Serializer, e: &Gt) -> Result<usize, Error> {
    ser.write_array(&gt_to_bytes(e))
}

fn read_gt(de: &mut Deserializer) -> Result<Gt, Error> {
    gt_from_bytes(&de.read_fixed::<GT_LENGTH>()?)
}

impl Serializable for PublicParams {
    fn length(&self) -> usize {
        let pairing_desc = self.config.to_json().map_or(0, |json| json.len());
        1 + array_length(pairing_desc) + 3 * G1_ARRAY_LENGTH + G2_ARRAY_LENGTH + GT_ARRAY_LENGTH
    }

    fn write(&self, ser: &mut Serializer) -> Result<usize, Error> {
        let mut n = ser.write_version()?;
        n += ser.write_str(&self.config.to_json()?)?;
        n += write_g1(ser, &self.g)?;
        n += write_g1(ser, &self.h)?;
        n += write_g2(ser, &self.gp)?;
        n += write_gt(ser, &self.g_hat_alpha)?;
        n += write_g1(ser, &self.f)?;
        Ok(n)
    }

    fn read(de: &mut Deserializer) -> Result<Self, Error> {
        de.read_version()?;
        let config = SchemeConfig::from_json(&de.read_string()?)?;
        let g = read_g1(de)?;
        let h = read_g1(de)?;
        let gp = read_g2(de)?;
        let g_hat_alpha = read_gt(de)?;
        let f = read_g1(de)?;
        Ok(Self {
            config,
            g,
            h,
            f,
            gp,
            g_hat_alpha,
        })
    }
}

impl Serializable for MasterSecret {
    fn length(&self) -> usize {
        1 + array_length(SCALAR_LENGTH) + G2_ARRAY_LENGTH
    }

    fn write(&self, ser: &mut Serializer) -> Result<usize, Error> {
        let mut n = ser.write_version()?;
        n += ser.write_array(&scalar_to_bytes(&self.beta))?;
        n += write_g2(ser, &self.g_alpha)?;
        Ok(n)
    }

    fn read(de: &mut Deserializer) -> Result<Self, Error> {
        de.read_version()?;
        let beta = scalar_from_bytes(&de.read_fixed::<SCALAR_LENGTH>()?)?;
        let g_alpha = read_g2(de)?;
        Ok(Self { beta, g_alpha })
    }
}

impl PrivateKeyComponent {
    fn length(&self) -> usize {
        array_length(self.attribute.len()) + G2_ARRAY_LENGTH + G1_ARRAY_LENGTH
    }
}

impl Serializable for PrivateKey {
    fn length(&self) -> usize {
        1 + G2_ARRAY_LENGTH
            + array_length(self.metadata.user_id.len())
            + array_length(self.metadata.user_email.len())
            + 8
            + 8
            + 4
            + self
                .components
                .iter()
                .map(PrivateKeyComponent::length)
                .sum::<usize>()
    }

    fn write(&self, ser: &mut Serializer) -> Result<usize, Error> {
        let mut n = ser.write_version()?;
        n += write_g2(ser, &self.d)?;
        n += ser.write_str(&self.metadata.user_id)?;
        n += ser.write_str(&self.metadata.user_email)?;
        n += ser.write_i64(self.metadata.issued_at)?;
        n += ser.write_i64(self.metadata.expires_at)?;
        n += ser.write_u32(u32::try_from(self.components.len())?)?;
        for component in &self.components {
            n += ser.write_str(&component.attribute)?;
            n += write_g2(ser, &component.d)?;
            n += write_g1(ser, &component.d_prime)?;
        }
        Ok(n)
    }

    fn read(de: &mut Deserializer) -> Result<Self, Error> {
        de.read_version()?;
        let d = read_g2(de)?;
        let metadata = KeyMetadata {
            user_id: de.read_string()?,
            user_email: de.read_string()?,
            issued_at: de.read_i64()?,
            expires_at: de.read_i64()?,
        };
        let count = de.read_u32()?;
        // the count is untrusted, do not pre-allocate
        let mut components = Vec::new();
        for _ in 0..count {
            components.push(PrivateKeyComponent {
                attribute: de.read_string()?,
                d: read_g2(de)?,
                d_prime: read_g1(de)?,
            });
        }
        Ok(Self {
            d,
            metadata,
            components,
        })
    }
}

impl CiphertextNode {
    fn length(&self) -> usize {
        4 + 4
            + match self {
                Self::Leaf { attribute, .. } => {
                    array_length(attribute.len()) + G1_ARRAY_LENGTH + G2_ARRAY_LENGTH
                }
                Self::Threshold { children, .. } => children.iter().map(Self::length).sum(),
            }
    }

    /// Writes `[k][0][attr][C][C']` for a leaf, `[k][n]{child}*` for a
    /// threshold node.
    fn write(&self, ser: &mut Serializer) -> Result<usize, Error> {
        match self {
            Self::Leaf {
                attribute,
                c,
                c_prime,
            } => {
                let mut n = ser.write_u32(1)?;
                n += ser.write_u32(0)?;
                n += ser.write_str(attribute)?;
                n += write_g1(ser, c)?;
                n += write_g2(ser, c_prime)?;
                Ok(n)
            }
            Self::Threshold { k, children } => {
                let mut n = ser.write_u32(u32::try_from(*k)?)?;
                n += ser.write_u32(u32::try_from(children.len())?)?;
                for child in children {
                    n += child.write(ser)?;
                }
                Ok(n)
            }
        }
    }

    fn read(de: &mut Deserializer, depth: usize) -> Result<Self, Error> {
        if depth > MAX_POLICY_DEPTH {
            return Err(Error::Serialization(format!(
                "policy tree deeper than {MAX_POLICY_DEPTH}"
            )));
        }
        let k = usize::try_from(de.read_u32()?)?;
        let n = usize::try_from(de.read_u32()?)?;
        if n == 0 {
            if k != 1 {
                return Err(Error::Serialization(format!(
                    "leaf with a threshold of {k}"
                )));
            }
            return Ok(Self::Leaf {
                attribute: de.read_string()?,
                c: read_g1(de)?,
                c_prime: read_g2(de)?,
            });
        }
        if n < 2 || k < 1 || k > n {
            return Err(Error::Serialization(format!(
                "invalid threshold node {k}of{n}"
            )));
        }
        let children = (0..n)
            .map(|_| Self::read(de, depth + 1))
            .collect::<Result<_, _>>()?;
        Ok(Self::Threshold { k, children })
    }
}

impl Serializable for Ciphertext {
    fn length(&self) -> usize {
        1 + GT_ARRAY_LENGTH + G1_ARRAY_LENGTH + 8 + self.policy.length()
    }

    fn write(&self, ser: &mut Serializer) -> Result<usize, Error> {
        let mut n = ser.write_version()?;
        n += write_gt(ser, &self.c_tilde)?;
        n += write_g1(ser, &self.c)?;
        // the date is written as its high then low 32-bit halves
        let date = self.encryption_date as u64;
        n += ser.write_u32((date >> 32) as u32)?;
        n += ser.write_u32(date as u32)?;
        n += self.policy.write(ser)?;
        Ok(n)
    }

    fn read(de: &mut Deserializer) -> Result<Self, Error> {
        de.read_version()?;
        let c_tilde = read_gt(de)?;
        let c = read_g1(de)?;
        let high = u64::from(de.read_u32()?);
        let low = u64::from(de.read_u32()?);
        let encryption_date = ((high << 32) | low) as i64;
        let policy = CiphertextNode::read(de, 0)?;
        Ok(Self {
            c_tilde,
            c,
            encryption_date,
            policy,
        })
    }
}
