use std::sync::{Mutex, MutexGuard};

use cosmian_crypto_core::{reexport::rand_core::SeedableRng, CsRng};

use crate::{
    config::SchemeConfig,
    core::{
        now_millis,
        primitives::{decrypt, encrypt, keygen, setup},
        BlindingFactor, Ciphertext, KeyMetadata, MasterSecret, PrivateKey, PublicParams,
    },
    policy::AccessStructure,
    Error,
};

/// Entry point of the scheme. Owns the CSPRNG shared by all operations.
#[derive(Debug)]
pub struct Cpabe {
    rng: Mutex<CsRng>,
}

impl Default for Cpabe {
    fn default() -> Self {
        Self {
            rng: Mutex::new(CsRng::from_entropy()),
        }
    }
}

impl PartialEq for Cpabe {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Cpabe {
    pub fn rng(&self) -> MutexGuard<CsRng> {
        self.rng.lock().expect("poisoned mutex")
    }

    /// Generates the public parameters and the master secret of a new
    /// authority.
    pub fn setup(&self, config: SchemeConfig) -> Result<(PublicParams, MasterSecret), Error> {
        setup(&mut *self.rng(), config)
    }

    /// Issues a private key for the given attributes, without metadata.
    ///
    /// # Error
    ///
    /// Returns an error if an attribute is empty.
    pub fn keygen<S: AsRef<str>>(
        &self,
        pp: &PublicParams,
        msk: &MasterSecret,
        attributes: &[S],
    ) -> Result<PrivateKey, Error> {
        keygen(
            &mut *self.rng(),
            pp,
            msk,
            attributes,
            KeyMetadata::default(),
        )
    }

    /// Issues a private key to the given user. The key is issued now and
    /// expires after the configured validity.
    pub fn keygen_with_metadata<S: AsRef<str>>(
        &self,
        pp: &PublicParams,
        msk: &MasterSecret,
        attributes: &[S],
        user_id: &str,
        user_email: &str,
    ) -> Result<PrivateKey, Error> {
        let metadata = KeyMetadata::issued_now(user_id, user_email, pp.config());
        keygen(&mut *self.rng(), pp, msk, attributes, metadata)
    }

    /// Compiles the given policy and encrypts a fresh blinding factor under
    /// it.
    ///
    /// # Error
    ///
    /// Returns `Error::PolicyCompile` if the policy is malformed.
    pub fn encrypt(
        &self,
        pp: &PublicParams,
        policy: &str,
    ) -> Result<(Ciphertext, BlindingFactor), Error> {
        self.encrypt_access_structure(pp, &AccessStructure::parse(policy)?)
    }

    pub fn encrypt_access_structure(
        &self,
        pp: &PublicParams,
        policy: &AccessStructure,
    ) -> Result<(Ciphertext, BlindingFactor), Error> {
        encrypt(&mut *self.rng(), pp, policy, now_millis())
    }

    /// Recovers the blinding factor of the ciphertext.
    ///
    /// Returns `Error::PolicyNotSatisfied` if the key attributes do not
    /// satisfy the ciphertext policy. Key expiry is not checked.
    pub fn decrypt(
        &self,
        key: &PrivateKey,
        ciphertext: &Ciphertext,
    ) -> Result<BlindingFactor, Error> {
        decrypt(key, ciphertext)
    }
}
