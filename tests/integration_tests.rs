use std::thread;

use cpabe::{
    bytes_ser_de::Serializable,
    core::primitives::decrypt_with_stats,
    policy::{postfix_string, to_postfix},
    AccessStructure, Ciphertext, Cpabe, Envelope, Error, KeyStore, MasterSecret, PrivateKey,
    PublicParams, SchemeConfig,
};

#[test]
fn test_end_to_end() -> Result<(), Error> {
    let cpabe = Cpabe::default();
    let (pp, msk) = cpabe.setup(SchemeConfig::default())?;

    // keys and ciphertexts only travel as bytes
    let pp = PublicParams::deserialize(&pp.serialize()?)?;
    let msk = MasterSecret::deserialize(&msk.serialize()?)?;

    let key = cpabe.keygen_with_metadata(
        &pp,
        &msk,
        &["dept_IT", "level_ge_3", "site_paris"],
        "1",
        "alice@example.com",
    )?;
    let key = PrivateKey::deserialize(&key.serialize()?)?;
    assert!(key.info(key.metadata().issued_at).valid);
    assert_eq!(
        key.metadata().expires_at - key.metadata().issued_at,
        365 * 24 * 3600 * 1000
    );

    for (policy, satisfied) in [
        ("dept = IT and level >= 3", true),
        ("dept = IT and level >= 4", false),
        ("2 of (dept = HR, level >= 3, site_paris)", true),
        ("3 of (dept = HR, level >= 3, site_paris)", false),
        ("(dept = HR and level >= 3) or (dept = IT and site_paris)", true),
    ] {
        let (ct, m) = cpabe.encrypt(&pp, policy)?;
        let ct = Ciphertext::deserialize(&ct.serialize()?)?;
        match cpabe.decrypt(&key, &ct) {
            Ok(m_) => {
                assert!(satisfied, "{policy}");
                assert_eq!(m, m_, "{policy}");
            }
            Err(Error::PolicyNotSatisfied) => assert!(!satisfied, "{policy}"),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[test]
fn test_policy_compiler() -> Result<(), Error> {
    assert_eq!(
        postfix_string(&to_postfix("A and B or C")?),
        "A B 2of2 C 1of2"
    );
    assert_eq!(
        AccessStructure::parse("A or B")?,
        AccessStructure::parse("1 of (A, B)")?
    );
    assert_eq!(
        AccessStructure::parse("A AND B")?,
        AccessStructure::parse("2 of (A, B)")?
    );
    for policy in ["0 of (A, B)", "3 of (A, B)", "1 of (A)", "(A and B", "A and", "not A"] {
        assert!(
            matches!(AccessStructure::parse(policy), Err(Error::PolicyCompile(_))),
            "{policy}"
        );
    }
    Ok(())
}

#[test]
fn test_unsatisfied_policy_performs_no_pairing() -> Result<(), Error> {
    let cpabe = Cpabe::default();
    let (pp, msk) = cpabe.setup(SchemeConfig::default())?;
    let (ct, _) = cpabe.encrypt(&pp, "attr1 and attr2")?;
    let key = cpabe.keygen(&pp, &msk, &["attr1"])?;
    assert!(matches!(
        decrypt_with_stats(&key, &ct),
        Err(Error::PolicyNotSatisfied)
    ));

    let key = cpabe.keygen(&pp, &msk, &["attr1", "attr2"])?;
    let (_, stats) = decrypt_with_stats(&key, &ct)?;
    assert_eq!(stats.pairings, 5);
    Ok(())
}

#[test]
fn test_concurrent_decryption() -> Result<(), Error> {
    let cpabe = Cpabe::default();
    let (pp, msk) = cpabe.setup(SchemeConfig::default())?;
    let (ct, m) = cpabe.encrypt(&pp, "2 of (a, b, c) or d")?;
    let keys = [
        vec!["a", "b"],
        vec!["b", "c"],
        vec!["a", "c"],
        vec!["d"],
        vec!["a", "b", "c", "d"],
    ]
    .iter()
    .map(|attributes| cpabe.keygen(&pp, &msk, attributes))
    .collect::<Result<Vec<_>, _>>()?;

    // the same ciphertext is decrypted by several keys at once
    thread::scope(|s| {
        let handles = keys
            .iter()
            .map(|key| s.spawn(|| cpabe.decrypt(key, &ct)))
            .collect::<Vec<_>>();
        for handle in handles {
            assert_eq!(handle.join().expect("thread panicked")?, m);
        }
        Ok(())
    })
}

#[test]
fn test_envelope_with_key_store() -> Result<(), Error> {
    let cpabe = Cpabe::default();
    let dir = std::env::temp_dir().join(format!("cpabe-integration-{}", std::process::id()));
    let store = KeyStore::new(&dir);
    let (_, msk) = store.load_or_init(&cpabe, SchemeConfig::default())?;

    // the encrypting side only knows the public parameters
    let pp = store.load_public_params()?;
    let envelope = Envelope::seal(
        &cpabe,
        &pp,
        "role = doctor and (ward = 3 or role = head)",
        b"patient record",
        Some("application/octet-stream"),
    )?;
    let bytes = envelope.serialize()?;

    let key = cpabe.keygen(&pp, &msk, &["role_doctor", "ward_3"])?;
    let envelope = Envelope::deserialize(&bytes)?;
    let (plaintext, content_type) = envelope.open(&key)?;
    assert_eq!(&*plaintext, b"patient record");
    assert_eq!(content_type, Some("application/octet-stream"));

    let key = cpabe.keygen(&pp, &msk, &["role_nurse", "ward_3"])?;
    assert!(Envelope::deserialize(&bytes)?
        .open(&key)
        .unwrap_err()
        .is_policy_not_satisfied());

    std::fs::remove_dir_all(dir)?;
    Ok(())
}
