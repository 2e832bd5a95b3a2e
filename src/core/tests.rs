use cosmian_crypto_core::{reexport::rand_core::SeedableRng, CsRng};

use super::{
    primitives::{decrypt, decrypt_with_stats, encrypt, keygen, setup},
    serialization::MAX_POLICY_DEPTH,
    Ciphertext, KeyMetadata, MasterSecret, PrivateKey, PublicParams,
};
use crate::{
    bytes_ser_de::{Serializable, Serializer},
    config::SchemeConfig,
    policy::AccessStructure,
    Error,
};

fn keys(rng: &mut CsRng) -> (PublicParams, MasterSecret) {
    setup(rng, SchemeConfig::default()).unwrap()
}

fn encrypt_for(
    rng: &mut CsRng,
    pp: &PublicParams,
    policy: &str,
) -> (Ciphertext, super::BlindingFactor) {
    encrypt(rng, pp, &AccessStructure::parse(policy).unwrap(), 1_700_000_000_000).unwrap()
}

#[test]
fn test_encrypt_decrypt() -> Result<(), Error> {
    let mut rng = CsRng::from_entropy();
    let (pp, msk) = keys(&mut rng);

    let (ct, m) = encrypt_for(&mut rng, &pp, "attr1 and attr2");
    let key = keygen(&mut rng, &pp, &msk, &["attr1", "attr2"], KeyMetadata::default())?;
    assert_eq!(decrypt(&key, &ct)?, m);

    // attribute order and extra attributes do not matter
    let key = keygen(
        &mut rng,
        &pp,
        &msk,
        &["other", "attr2", "attr1"],
        KeyMetadata::default(),
    )?;
    assert_eq!(decrypt(&key, &ct)?, m);
    Ok(())
}

#[test]
fn test_policy_not_satisfied() -> Result<(), Error> {
    let mut rng = CsRng::from_entropy();
    let (pp, msk) = keys(&mut rng);

    let (ct, _) = encrypt_for(&mut rng, &pp, "attr1 and attr2");
    let key = keygen(&mut rng, &pp, &msk, &["attr1"], KeyMetadata::default())?;
    let res = decrypt_with_stats(&key, &ct);
    assert!(matches!(res, Err(Error::PolicyNotSatisfied)));
    assert!(res.unwrap_err().is_policy_not_satisfied());

    let empty: [&str; 0] = [];
    let key = keygen(&mut rng, &pp, &msk, &empty, KeyMetadata::default())?;
    assert!(decrypt(&key, &ct).unwrap_err().is_policy_not_satisfied());
    Ok(())
}

#[test]
fn test_threshold_subsets() -> Result<(), Error> {
    let mut rng = CsRng::from_entropy();
    let (pp, msk) = keys(&mut rng);
    let (ct, m) = encrypt_for(&mut rng, &pp, "2 of (attr1, attr2, attr3)");

    for attributes in [
        vec!["attr1", "attr2"],
        vec!["attr1", "attr3"],
        vec!["attr2", "attr3"],
        vec!["attr1", "attr2", "attr3"],
    ] {
        let key = keygen(&mut rng, &pp, &msk, &attributes, KeyMetadata::default())?;
        let (recovered, stats) = decrypt_with_stats(&key, &ct)?;
        assert_eq!(recovered, m, "{attributes:?}");
        // two leaves and the final pairing
        assert_eq!(stats.leaves, 2);
        assert_eq!(stats.pairings, 5);
    }
    for attributes in [vec!["attr1"], vec!["attr2"], vec!["attr3"]] {
        let key = keygen(&mut rng, &pp, &msk, &attributes, KeyMetadata::default())?;
        assert!(
            matches!(decrypt(&key, &ct), Err(Error::PolicyNotSatisfied)),
            "{attributes:?}"
        );
    }
    Ok(())
}

#[test]
fn test_nested_policy() -> Result<(), Error> {
    let mut rng = CsRng::from_entropy();
    let (pp, msk) = keys(&mut rng);
    let (ct, m) = encrypt_for(
        &mut rng,
        &pp,
        "(dept = IT and level >= 3) or 2 of (admin, auditor and team_a, 1 of (x, y, z))",
    );

    let key = keygen(
        &mut rng,
        &pp,
        &msk,
        &["dept_IT", "level_ge_3"],
        KeyMetadata::default(),
    )?;
    assert_eq!(decrypt(&key, &ct)?, m);

    let key = keygen(&mut rng, &pp, &msk, &["admin", "z"], KeyMetadata::default())?;
    assert_eq!(decrypt(&key, &ct)?, m);

    let key = keygen(
        &mut rng,
        &pp,
        &msk,
        &["auditor", "team_a", "y"],
        KeyMetadata::default(),
    )?;
    assert_eq!(decrypt(&key, &ct)?, m);

    let key = keygen(
        &mut rng,
        &pp,
        &msk,
        &["dept_IT", "auditor", "x"],
        KeyMetadata::default(),
    )?;
    assert!(matches!(decrypt(&key, &ct), Err(Error::PolicyNotSatisfied)));
    Ok(())
}

#[test]
fn test_min_leaf_decryption() -> Result<(), Error> {
    let mut rng = CsRng::from_entropy();
    let (pp, msk) = keys(&mut rng);
    let (ct, m) = encrypt_for(&mut rng, &pp, "(a and b and c) or d");

    // the single leaf is cheaper than the conjunction
    let key = keygen(&mut rng, &pp, &msk, &["a", "b", "c", "d"], KeyMetadata::default())?;
    let (recovered, stats) = decrypt_with_stats(&key, &ct)?;
    assert_eq!(recovered, m);
    assert_eq!(stats.leaves, 1);
    assert_eq!(stats.pairings, 3);

    let key = keygen(&mut rng, &pp, &msk, &["a", "b", "c"], KeyMetadata::default())?;
    let (recovered, stats) = decrypt_with_stats(&key, &ct)?;
    assert_eq!(recovered, m);
    assert_eq!(stats.leaves, 3);
    Ok(())
}

#[test]
fn test_keys_are_not_combinable() -> Result<(), Error> {
    let mut rng = CsRng::from_entropy();
    let (pp, msk) = keys(&mut rng);
    let (ct, m) = encrypt_for(&mut rng, &pp, "attr1 and attr2");

    let key1 = keygen(&mut rng, &pp, &msk, &["attr1"], KeyMetadata::default())?;
    let key2 = keygen(&mut rng, &pp, &msk, &["attr2"], KeyMetadata::default())?;
    // components of two keys are bound to different randomness
    let colluded = PrivateKey {
        d: key1.d,
        metadata: KeyMetadata::default(),
        components: [key1.components.clone(), key2.components.clone()].concat(),
    };
    assert_ne!(decrypt(&colluded, &ct)?, m);
    Ok(())
}

#[test]
fn test_keygen_attributes() -> Result<(), Error> {
    let mut rng = CsRng::from_entropy();
    let (pp, msk) = keys(&mut rng);

    let key = keygen(
        &mut rng,
        &pp,
        &msk,
        &[" b ", "a", "b", "c", "a"],
        KeyMetadata::default(),
    )?;
    assert_eq!(key.attributes(), vec!["b", "a", "c"]);

    assert!(matches!(
        keygen(&mut rng, &pp, &msk, &["a", "  "], KeyMetadata::default()),
        Err(Error::KeyGen(_))
    ));
    Ok(())
}

#[test]
fn test_key_info() -> Result<(), Error> {
    let mut rng = CsRng::from_entropy();
    let (pp, msk) = keys(&mut rng);

    let metadata = KeyMetadata {
        user_id: "42".to_string(),
        user_email: "alice@example.com".to_string(),
        issued_at: 1_000,
        expires_at: 2_000,
    };
    let key = keygen(&mut rng, &pp, &msk, &["a", "b"], metadata)?;
    assert!(!key.is_expired(1_999));
    assert!(key.is_expired(2_000));

    let info = key.info(1_500);
    assert!(info.valid);
    assert_eq!(info.attributes, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(info.issued_to.as_deref(), Some("42"));
    assert_eq!(info.issued_on, Some(1_000));
    assert_eq!(info.expires_on, Some(2_000));
    assert!(!key.info(3_000).valid);

    let key = keygen(&mut rng, &pp, &msk, &["a"], KeyMetadata::default())?;
    let info = key.info(i64::MAX - 1);
    assert!(info.valid);
    assert_eq!(info.issued_to, None);
    assert_eq!(info.issued_on, None);
    assert_eq!(info.expires_on, None);
    Ok(())
}

#[test]
fn test_serialization() -> Result<(), Error> {
    let mut rng = CsRng::from_entropy();
    let (pp, msk) = keys(&mut rng);

    let pp_ = PublicParams::deserialize(&pp.serialize()?)?;
    assert_eq!(pp, pp_);
    assert_eq!(pp.serialize()?.len(), pp.length());

    let msk_ = MasterSecret::deserialize(&msk.serialize()?)?;
    assert_eq!(msk, msk_);

    let key = keygen(
        &mut rng,
        &pp,
        &msk,
        &["a", "b", "c"],
        KeyMetadata {
            user_id: "bob".to_string(),
            user_email: "bob@example.com".to_string(),
            issued_at: 1_700_000_000_000,
            expires_at: 1_731_536_000_000,
        },
    )?;
    assert_eq!(key, PrivateKey::deserialize(&key.serialize()?)?);

    // depth 4, leaves and threshold nodes as siblings
    let (ct, _) = encrypt_for(&mut rng, &pp, "a or (b and 2 of (c, d or (e and f), g))");
    let bytes = ct.serialize()?;
    assert_eq!(bytes.len(), ct.length());
    let ct_ = Ciphertext::deserialize(&bytes)?;
    assert_eq!(ct, ct_);
    assert_eq!(ct.encryption_date(), 1_700_000_000_000);
    assert_eq!(
        ct_.policy().access_structure().to_string(),
        "a or (b and 2 of (c, d or (e and f), g))"
    );
    Ok(())
}

#[test]
fn test_invalid_bytes() -> Result<(), Error> {
    let mut rng = CsRng::from_entropy();
    let (pp, _) = keys(&mut rng);
    let (ct, _) = encrypt_for(&mut rng, &pp, "a or b");
    let bytes = ct.serialize()?;

    // truncated
    assert!(matches!(
        Ciphertext::deserialize(&bytes[..bytes.len() - 1]),
        Err(Error::Serialization(_))
    ));

    // trailing bytes
    let mut longer = bytes.to_vec();
    longer.push(0);
    assert!(matches!(
        Ciphertext::deserialize(&longer),
        Err(Error::Serialization(_))
    ));

    // unknown version
    let mut other_version = bytes.to_vec();
    other_version[0] = 2;
    assert!(matches!(
        Ciphertext::deserialize(&other_version),
        Err(Error::Serialization(_))
    ));

    // a 1of2 node turned into 3of2
    let k_offset = 1 + 4 + 576 + 4 + 48 + 8;
    let mut invalid_tree = bytes.to_vec();
    assert_eq!(invalid_tree[k_offset..k_offset + 8], [0, 0, 0, 1, 0, 0, 0, 2]);
    invalid_tree[k_offset + 3] = 3;
    assert!(matches!(
        Ciphertext::deserialize(&invalid_tree),
        Err(Error::Serialization(_))
    ));

    // unknown curve in the public parameters
    let mut ser = Serializer::new();
    ser.write_version()?;
    ser.write_str(r#"{"curve":"BN254","hash_to_curve_dst":"x","key_validity_days":1}"#)?;
    assert!(matches!(
        PublicParams::deserialize(ser.value()),
        Err(Error::UnsupportedCurve(_))
    ));
    Ok(())
}

#[test]
fn test_deep_tree_rejected() -> Result<(), Error> {
    let mut rng = CsRng::from_entropy();
    let (pp, _) = keys(&mut rng);
    let (ct, _) = encrypt_for(&mut rng, &pp, "a or b");
    let bytes = ct.serialize()?;

    // valid header followed by a chain of `1of2` nodes whose first child is
    // the next node
    let header_length = 1 + 4 + 576 + 4 + 48 + 8;
    let mut ser = Serializer::new();
    for b in &bytes[..header_length] {
        ser.write_u8(*b)?;
    }
    for _ in 0..=MAX_POLICY_DEPTH {
        ser.write_u32(1)?;
        ser.write_u32(2)?;
    }
    assert!(matches!(
        Ciphertext::deserialize(ser.value()),
        Err(Error::Serialization(_))
    ));
    Ok(())
}

#[test]
fn test_reload_keys() -> Result<(), Error> {
    let mut rng = CsRng::from_entropy();
    let (pp, msk) = keys(&mut rng);
    let pp_ = PublicParams::deserialize(&pp.serialize()?)?;
    let msk_ = MasterSecret::deserialize(&msk.serialize()?)?;

    // keys issued and messages encrypted with the reloaded objects work with
    // the in-memory ones
    let (ct, m) = encrypt_for(&mut rng, &pp_, "a and b");
    let key = keygen(&mut rng, &pp, &msk, &["a", "b"], KeyMetadata::default())?;
    assert_eq!(decrypt(&key, &ct)?, m);

    let (ct, m) = encrypt_for(&mut rng, &pp, "a and b");
    let key = keygen(&mut rng, &pp_, &msk_, &["a", "b"], KeyMetadata::default())?;
    assert_eq!(decrypt(&key, &ct)?, m);
    Ok(())
}

#[test]
fn test_invalid_access_structure() {
    let mut rng = CsRng::from_entropy();
    let (pp, _) = keys(&mut rng);
    let policy = AccessStructure::Threshold {
        k: 0,
        children: vec![
            AccessStructure::Leaf("a".to_string()),
            AccessStructure::Leaf("b".to_string()),
        ],
    };
    assert!(matches!(
        encrypt(&mut rng, &pp, &policy, 0),
        Err(Error::PolicyCompile(_))
    ));
}

#[test]
fn test_deepest_tree_round_trip() -> Result<(), Error> {
    let mut rng = CsRng::from_entropy();
    let (pp, msk) = keys(&mut rng);

    let attributes = (0..=MAX_POLICY_DEPTH)
        .map(|i| format!("a{i}"))
        .collect::<Vec<_>>();
    let (ct, m) = encrypt_for(&mut rng, &pp, &attributes.join(" and "));
    let ct_ = Ciphertext::deserialize(&ct.serialize()?)?;
    assert_eq!(ct, ct_);

    let key = keygen(&mut rng, &pp, &msk, &attributes, KeyMetadata::default())?;
    assert_eq!(decrypt(&key, &ct_)?, m);

    // one more level is refused by the compiler
    let too_deep = format!("{} and b", attributes.join(" and "));
    assert!(matches!(
        AccessStructure::parse(&too_deep),
        Err(Error::PolicyCompile(_))
    ));
    Ok(())
}
