use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::{
    api::Cpabe, bytes_ser_de::Serializable, envelope::Envelope, policy::AccessStructure, Error,
    MasterSecret, PrivateKey, PublicParams,
};

use super::authority;

fn decode(s: &str) -> Result<Vec<u8>, Error> {
    STANDARD
        .decode(s)
        .map_err(|e| Error::ConversionFailed(format!("invalid base64: {e}")))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrivateKeyTestVector {
    attributes: Vec<String>,
    key: String,
}

impl PrivateKeyTestVector {
    pub fn new(
        cpabe: &Cpabe,
        pp: &PublicParams,
        msk: &MasterSecret,
        attributes: &[&str],
    ) -> Result<Self, Error> {
        let key = cpabe.keygen_with_metadata(pp, msk, attributes, "42", "test@example.com")?;
        Ok(Self {
            attributes: attributes.iter().map(|s| s.to_string()).collect(),
            key: STANDARD.encode(&*key.serialize()?),
        })
    }

    fn key(&self) -> Result<PrivateKey, Error> {
        PrivateKey::deserialize(&decode(&self.key)?)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnvelopeTestVector {
    policy: String,
    plaintext: String,
    content_type: Option<String>,
    envelope: String,
}

impl EnvelopeTestVector {
    pub fn new(
        cpabe: &Cpabe,
        pp: &PublicParams,
        policy: &str,
        plaintext: &str,
        content_type: Option<&str>,
    ) -> Result<Self, Error> {
        let envelope = Envelope::seal(cpabe, pp, policy, plaintext.as_bytes(), content_type)?;
        Ok(Self {
            policy: policy.to_string(),
            plaintext: STANDARD.encode(plaintext),
            content_type: content_type.map(String::from),
            envelope: STANDARD.encode(&*envelope.serialize()?),
        })
    }

    /// Opens the envelope with the given key, checking the result against
    /// the policy.
    pub fn verify(&self, key: &PrivateKeyTestVector) -> Result<(), Error> {
        let envelope = Envelope::deserialize(&decode(&self.envelope)?)?;
        assert_eq!(
            envelope.ciphertext.policy().access_structure(),
            AccessStructure::parse(&self.policy)?
        );
        let key_ = key.key()?;
        assert_eq!(key_.attributes(), key.attributes);

        if AccessStructure::parse(&self.policy)?.is_satisfied_by(&key.attributes) {
            let (plaintext, content_type) = envelope.open(&key_)?;
            assert_eq!(*plaintext, decode(&self.plaintext)?);
            assert_eq!(content_type, self.content_type.as_deref());
        } else {
            assert!(matches!(envelope.open(&key_), Err(Error::PolicyNotSatisfied)));
        }
        Ok(())
    }
}

/// Keys and envelopes generated by a given version of this crate, which all
/// later versions must be able to read.
#[derive(Debug, Serialize, Deserialize)]
pub struct NonRegressionTestVector {
    public_params: String,
    master_secret: String,
    keys: Vec<PrivateKeyTestVector>,
    envelopes: Vec<EnvelopeTestVector>,
}

impl NonRegressionTestVector {
    pub fn new() -> Result<Self, Error> {
        let cpabe = Cpabe::default();
        let (pp, msk) = authority(&cpabe)?;

        let keys = [
            vec!["dept_FIN", "level_ge_3"],
            vec!["dept_MKG", "role_manager"],
            vec!["dept_HR", "role_manager", "level_ge_5"],
            vec!["admin"],
        ]
        .iter()
        .map(|attributes| PrivateKeyTestVector::new(&cpabe, &pp, &msk, attributes))
        .collect::<Result<_, _>>()?;

        let envelopes = vec![
            EnvelopeTestVector::new(
                &cpabe,
                &pp,
                "dept = FIN and level >= 3",
                "fin_plaintext",
                Some("text/plain"),
            )?,
            EnvelopeTestVector::new(
                &cpabe,
                &pp,
                "(dept = MKG or dept = HR) and role = manager",
                "manager_plaintext",
                None,
            )?,
            EnvelopeTestVector::new(
                &cpabe,
                &pp,
                "2 of (dept = HR, role = manager, level >= 5) or admin",
                "threshold_plaintext",
                Some("application/json"),
            )?,
        ];

        Ok(Self {
            public_params: STANDARD.encode(&*pp.serialize()?),
            master_secret: STANDARD.encode(&*msk.serialize()?),
            keys,
            envelopes,
        })
    }

    pub fn verify(&self) -> Result<(), Error> {
        let pp = PublicParams::deserialize(&decode(&self.public_params)?)?;
        let msk = MasterSecret::deserialize(&decode(&self.master_secret)?)?;

        for envelope in &self.envelopes {
            for key in &self.keys {
                envelope.verify(key)?;
            }
        }

        // the stored authority still issues working keys
        let cpabe = Cpabe::default();
        let key = PrivateKeyTestVector::new(&cpabe, &pp, &msk, &["admin"])?;
        for envelope in &self.envelopes {
            envelope.verify(&key)?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }
}
