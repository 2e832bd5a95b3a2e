//! Hybrid envelope: the scheme protects a blinding factor from which the
//! AES-256-GCM key of the bulk data is derived.

use cosmian_crypto_core::{kdf256, reexport::zeroize::Zeroizing, Aes256Gcm, SymmetricKey};
use tracing::debug;

use crate::{
    api::Cpabe,
    bytes_ser_de::{array_length, Deserializer, Serializable, Serializer},
    core::{primitives::decrypt, BlindingFactor, Ciphertext, PrivateKey, PublicParams},
    traits::AE,
    Error,
};

pub const SYM_KEY_LENGTH: usize = Aes256Gcm::KEY_LENGTH;

const KDF_INFO: &[u8] = b"CPABE envelope key";

/// Derives the symmetric key of an envelope from the canonical encoding of
/// its blinding factor.
#[must_use]
pub fn derive_symmetric_key(m: &BlindingFactor) -> SymmetricKey<SYM_KEY_LENGTH> {
    let mut key = SymmetricKey::<SYM_KEY_LENGTH>::default();
    kdf256!(&mut *key, &*m.to_bytes(), KDF_INFO);
    key
}

/// A payload encrypted for the holders of the attributes satisfying the
/// policy of its ciphertext.
///
/// The content type is authenticated as associated data.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub ciphertext: Ciphertext,
    pub payload: Vec<u8>,
    pub content_type: Option<String>,
}

impl Envelope {
    /// Encrypts the plaintext under the given policy.
    ///
    /// # Error
    ///
    /// Returns `Error::PolicyCompile` if the policy is malformed.
    pub fn seal(
        cpabe: &Cpabe,
        pp: &PublicParams,
        policy: &str,
        plaintext: &[u8],
        content_type: Option<&str>,
    ) -> Result<Self, Error> {
        let content_type = content_type.filter(|s| !s.is_empty());
        let (ciphertext, m) = cpabe.encrypt(pp, policy)?;
        let key = derive_symmetric_key(&m);
        let payload = <Aes256Gcm as AE<SYM_KEY_LENGTH>>::encrypt(
            &mut *cpabe.rng(),
            &key,
            plaintext,
            content_type.map(str::as_bytes),
        )?;
        debug!(size = plaintext.len(), "sealed envelope");
        Ok(Self {
            ciphertext,
            payload,
            content_type: content_type.map(String::from),
        })
    }

    /// Decrypts the payload, returning it along with its content type.
    ///
    /// Returns `Error::PolicyNotSatisfied` if the key attributes do not
    /// satisfy the ciphertext policy.
    pub fn open(&self, key: &PrivateKey) -> Result<(Zeroizing<Vec<u8>>, Option<&str>), Error> {
        let m = decrypt(key, &self.ciphertext)?;
        let content_type = self.content_type.as_deref();
        let plaintext = <Aes256Gcm as AE<SYM_KEY_LENGTH>>::decrypt(
            &derive_symmetric_key(&m),
            &self.payload,
            content_type.map(str::as_bytes),
        )?;
        Ok((plaintext, content_type))
    }
}

/// `[ciphertext][payload][content type]`, each section being `u32`
/// length-prefixed. An empty content type section means there is none.
impl Serializable for Envelope {
    fn length(&self) -> usize {
        array_length(self.ciphertext.length())
            + array_length(self.payload.len())
            + array_length(self.content_type.as_ref().map_or(0, String::len))
    }

    fn write(&self, ser: &mut Serializer) -> Result<usize, Error> {
        let mut n = ser.write_array(&self.ciphertext.serialize()?)?;
        n += ser.write_array(&self.payload)?;
        n += ser.write_str(self.content_type.as_deref().unwrap_or_default())?;
        Ok(n)
    }

    fn read(de: &mut Deserializer) -> Result<Self, Error> {
        let ciphertext = Ciphertext::deserialize(de.read_array()?)?;
        let payload = de.read_array()?.to_vec();
        let content_type = de.read_string()?;
        Ok(Self {
            ciphertext,
            payload,
            content_type: (!content_type.is_empty()).then_some(content_type),
        })
    }
}
