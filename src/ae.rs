use cosmian_crypto_core::{
    reexport::{rand_core::CryptoRngCore, zeroize::Zeroizing},
    Aes256Gcm, CryptoCoreError, Dem, FixedSizeCBytes, Instantiable, Nonce, RandomFixedSizeCBytes,
    SymmetricKey,
};

use crate::{traits::AE, Error};

/// AES-256-GCM, the nonce is prepended to the ciphertext.
impl AE<{ Self::KEY_LENGTH }> for Aes256Gcm {
    type Error = Error;

    fn encrypt(
        rng: &mut impl CryptoRngCore,
        key: &SymmetricKey<{ Self::KEY_LENGTH }>,
        ptx: &[u8],
        ad: Option<&[u8]>,
    ) -> Result<Vec<u8>, Error> {
        let nonce = Nonce::<{ Self::NONCE_LENGTH }>::new(&mut *rng);
        let ctx = Self::new(key).encrypt(&nonce, ptx, ad)?;
        Ok([nonce.as_bytes(), &ctx].concat())
    }

    fn decrypt(
        key: &SymmetricKey<{ Self::KEY_LENGTH }>,
        ctx: &[u8],
        ad: Option<&[u8]>,
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        if ctx.len() < Self::NONCE_LENGTH + Self::MAC_LENGTH {
            return Err(Error::CryptoCoreError(CryptoCoreError::DecryptionError));
        }
        let (nonce, ctx) = ctx.split_at(Self::NONCE_LENGTH);
        let nonce = Nonce::try_from_slice(nonce)?;
        Self::new(key)
            .decrypt(&nonce, ctx, ad)
            .map(Zeroizing::new)
            .map_err(Error::CryptoCoreError)
    }
}
