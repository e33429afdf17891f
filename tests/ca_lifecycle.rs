use pki_envelope::cert_config::{has_server_auth, CertConfig, ExtKeyUsage, KeyAlgorithm};
use pki_envelope::generate_root_ca::new_certificate_authority;
use pki_envelope::generate_signed_cert::{
    new_cert_and_key, new_csr_and_key, new_intermediate_certificate_authority,
};
use pki_envelope::keys::SystemKeyGenerator;
use pki_envelope::{storage, verify, Error};
use tempfile::tempdir;

#[test]
fn three_tier_hierarchy_persists_and_verifies() {
    let dir = tempdir().unwrap();
    let pki = dir.path();

    let root_cfg = CertConfig::new("Test Root")
        .organization("Test Org")
        .algorithm(KeyAlgorithm::Ecdsa);
    let (root, root_key) = new_certificate_authority(&root_cfg, &SystemKeyGenerator).unwrap();
    storage::write_cert_and_key(pki, "root", &root, &root_key).unwrap();

    let int_cfg = CertConfig::new("Test Intermediate").algorithm(KeyAlgorithm::Ecdsa);
    let (int_cert, int_key) =
        new_intermediate_certificate_authority(&root, &root_key, &int_cfg, &SystemKeyGenerator)
            .unwrap();
    storage::write_cert_and_key(pki, "intermediate", &int_cert, &int_key).unwrap();

    let leaf_cfg = CertConfig::new("api.test")
        .dns_name("api.test")
        .ip("192.0.2.10".parse().unwrap())
        .usage(ExtKeyUsage::ServerAuth)
        .usage(ExtKeyUsage::ClientAuth)
        .algorithm(KeyAlgorithm::Ecdsa);
    let (loaded_int, loaded_int_key) =
        storage::try_load_cert_and_key_from_disk(pki, "intermediate").unwrap();
    let (leaf, leaf_key) =
        new_cert_and_key(&loaded_int, &loaded_int_key, &leaf_cfg, &SystemKeyGenerator).unwrap();
    storage::write_key(pki, "api", &leaf_key).unwrap();
    storage::write_cert_bundle(pki, "api", &[leaf, loaded_int]).unwrap();

    let (leaf, intermediates) = storage::try_load_cert_chain_from_disk(pki, "api").unwrap();
    let root = storage::try_load_cert_from_disk(pki, "root").unwrap();
    verify::verify_cert_chain(&leaf, &intermediates, &root).unwrap();
    verify::validate_cert_period(&leaf, chrono::Duration::zero()).unwrap();
    assert!(has_server_auth(&leaf));
    assert!(!has_server_auth(&root));
}

#[test]
fn leaf_from_unrelated_root_fails() {
    let cfg = CertConfig::new("Root A").algorithm(KeyAlgorithm::Ecdsa);
    let (root_a, key_a) = new_certificate_authority(&cfg, &SystemKeyGenerator).unwrap();
    let cfg = CertConfig::new("Root B").algorithm(KeyAlgorithm::Ecdsa);
    let (root_b, _) = new_certificate_authority(&cfg, &SystemKeyGenerator).unwrap();

    let leaf_cfg = CertConfig::new("client")
        .usage(ExtKeyUsage::ClientAuth)
        .algorithm(KeyAlgorithm::Ecdsa);
    let (leaf, _) = new_cert_and_key(&root_a, &key_a, &leaf_cfg, &SystemKeyGenerator).unwrap();

    verify::verify_cert_chain(&leaf, &[], &root_a).unwrap();
    assert!(matches!(
        verify::verify_cert_chain(&leaf, &[], &root_b),
        Err(Error::ChainVerificationFailed(_))
    ));
}

#[test]
fn csr_persists_next_to_key() {
    let dir = tempdir().unwrap();
    let csr_dir = dir.path().join("requests");
    let cfg = CertConfig::new("node-1")
        .dns_name("node-1.test")
        .algorithm(KeyAlgorithm::Rsa);
    let (csr, key) = new_csr_and_key(&cfg, &SystemKeyGenerator).unwrap();

    assert!(!storage::csr_or_key_exist(&csr_dir, "node-1"));
    storage::write_csr(&csr_dir, "node-1", &csr).unwrap();
    storage::write_key(&csr_dir, "node-1", &key).unwrap();
    assert!(storage::csr_or_key_exist(&csr_dir, "node-1"));

    let (loaded_csr, loaded_key) = storage::try_load_csr_and_key_from_disk(&csr_dir, "node-1").unwrap();
    assert!(loaded_csr.verify(&loaded_key).unwrap());
}
