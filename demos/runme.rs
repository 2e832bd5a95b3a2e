//! This is the demo given in `lib.rs`

use cpabe::{bytes_ser_de::Serializable, Ciphertext, Cpabe, Envelope, Error, SchemeConfig};

fn main() {
    // Setup the authority: the public parameters are handed to anyone who
    // encrypts, the master secret never leaves the authority.
    let cpabe = Cpabe::default();
    let (pp, msk) = cpabe.setup(SchemeConfig::default()).unwrap();

    // Comparisons are rewritten into attributes: `dept = FIN` is the
    // attribute `dept_FIN` and `level >= 3` the attribute `level_ge_3`.
    let policy = "dept = FIN and (level >= 3 or 2 of (auditor, manager, site_paris))";

    // A user of the finance department with a high enough level.
    let alice = cpabe
        .keygen_with_metadata(&pp, &msk, &["dept_FIN", "level_ge_3"], "alice", "alice@example.com")
        .unwrap();

    // A user of the finance department, auditor in Paris.
    let bob = cpabe
        .keygen(&pp, &msk, &["dept_FIN", "auditor", "site_paris"])
        .unwrap();

    // A manager of another department.
    let carol = cpabe
        .keygen(&pp, &msk, &["dept_MKG", "manager", "level_ge_3"])
        .unwrap();

    // Encrypt a blinding factor under the policy.
    let (ct, m) = cpabe.encrypt(&pp, policy).unwrap();

    // Ciphertexts travel as bytes.
    let ct = Ciphertext::deserialize(&ct.serialize().unwrap()).unwrap();
    println!("ciphertext policy: {}", ct.policy().access_structure());

    // Alice and Bob recover the blinding factor, Carol is denied.
    assert_eq!(cpabe.decrypt(&alice, &ct).unwrap(), m);
    assert_eq!(cpabe.decrypt(&bob, &ct).unwrap(), m);
    assert!(matches!(
        cpabe.decrypt(&carol, &ct),
        Err(Error::PolicyNotSatisfied)
    ));

    // Bulk data is encrypted with a key derived from the blinding factor.
    let envelope = Envelope::seal(
        &cpabe,
        &pp,
        policy,
        b"finance report",
        Some("text/plain"),
    )
    .unwrap();
    let envelope = Envelope::deserialize(&envelope.serialize().unwrap()).unwrap();
    let (plaintext, content_type) = envelope.open(&bob).unwrap();
    assert_eq!(&*plaintext, b"finance report");
    assert_eq!(content_type, Some("text/plain"));

    // Key metadata are advisory, decryption never checks them.
    let info = alice.info(alice.metadata().issued_at);
    println!(
        "alice's key: attributes {:?}, issued to {:?}, valid {}",
        info.attributes, info.issued_to, info.valid
    );
}
