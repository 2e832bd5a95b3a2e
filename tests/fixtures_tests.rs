use cpabe::{
    test_utils::{
        attributes, authority, conjunction, disjunction, non_regression::NonRegressionTestVector,
        FULL_ATTRIBUTES, POLICIES,
    },
    Cpabe, Envelope, Error,
};

#[test]
fn test_policies_open_with_full_attributes() -> Result<(), Error> {
    let cpabe = Cpabe::default();
    let (pp, msk) = authority(&cpabe)?;
    let key = cpabe.keygen(&pp, &msk, &FULL_ATTRIBUTES)?;
    let restricted = cpabe.keygen(&pp, &msk, &["dept_FIN"])?;

    for policy in POLICIES {
        let envelope = Envelope::seal(&cpabe, &pp, policy, policy.as_bytes(), None)?;
        let (plaintext, _) = envelope.open(&key)?;
        assert_eq!(&*plaintext, policy.as_bytes());
        assert!(
            matches!(envelope.open(&restricted), Err(Error::PolicyNotSatisfied)),
            "{policy}"
        );
    }
    Ok(())
}

#[test]
fn test_generated_policies() -> Result<(), Error> {
    let cpabe = Cpabe::default();
    let (pp, msk) = authority(&cpabe)?;

    let n = 6;
    let full = cpabe.keygen(&pp, &msk, &attributes(n))?;
    let partial = cpabe.keygen(&pp, &msk, &attributes(n - 1))?;
    let last = cpabe.keygen(&pp, &msk, &[format!("attr{}", n - 1)])?;

    let (ct, m) = cpabe.encrypt(&pp, &conjunction(n))?;
    assert_eq!(cpabe.decrypt(&full, &ct)?, m);
    assert!(matches!(
        cpabe.decrypt(&partial, &ct),
        Err(Error::PolicyNotSatisfied)
    ));

    let (ct, m) = cpabe.encrypt(&pp, &disjunction(n))?;
    assert_eq!(cpabe.decrypt(&last, &ct)?, m);
    assert_eq!(cpabe.decrypt(&partial, &ct)?, m);
    Ok(())
}

#[test]
fn test_fresh_non_regression_vector() -> Result<(), Error> {
    let reg_vector = NonRegressionTestVector::new()?;
    NonRegressionTestVector::from_json(&reg_vector.to_json()?)?.verify()
}
