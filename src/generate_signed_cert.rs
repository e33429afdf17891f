//! Signed Certificate Generation Module
//!
//! Issues certificates signed by an existing CA: intermediate CAs, leaf
//! certificates, and certificate signing requests for external signing.
//!
//! # PKI Hierarchy Position
//! ```text
//! Root CA (self-signed)
//!   └── Intermediate CA (signed by Root)   ← new_intermediate_certificate_authority
//!       └── Leaf Certificate               ← new_cert_and_key
//! ```
//!
//! # Certificate Properties
//! - **Key Usage**: keyEncipherment, digitalSignature (+ keyCertSign for CAs)
//! - **Extended Key Usage**: from [`CertConfig::usages`]; required for leaves
//! - **Basic Constraints**: CA=true for intermediates, CA=false for leaves
//! - **Serial Number**: random in `[0, i64::MAX)`
//! - **Validity**: issuer's notBefore .. now + 10 years
//! - **Subject Alternative Names**: deduplicated DNS names and IPs

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::stack::Stack;
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage,
    SubjectAlternativeName, SubjectKeyIdentifier,
};
use openssl::x509::{X509Ref, X509Req, X509};
use tracing::debug;

use crate::cert_config::{AltNames, CertConfig};
use crate::error::{Error, Result};
use crate::generate_root_ca::{subject_name, CERT_VALIDITY_DAYS, X509_VERSION_3};
use crate::keys::KeyGenerator;

/// Random serial number in `[0, i64::MAX)`.
fn random_serial() -> Result<BigNum> {
    let max = BigNum::from_dec_str(&i64::MAX.to_string())?;
    let mut serial = BigNum::new()?;
    max.rand_range(&mut serial)
        .map_err(|e| Error::Entropy(e.to_string()))?;
    Ok(serial)
}

/// Build a SAN builder from alt names, or `None` when there are none.
fn alt_names_extension(alt_names: &AltNames) -> Option<SubjectAlternativeName> {
    if alt_names.is_empty() {
        return None;
    }
    let mut san = SubjectAlternativeName::new();
    for dns in &alt_names.dns_names {
        san.dns(dns);
    }
    for ip in &alt_names.ips {
        san.ip(&ip.to_string());
    }
    Some(san)
}

/// Create a new key and an intermediate CA certificate signed by the parent.
pub fn new_intermediate_certificate_authority(
    parent_cert: &X509Ref,
    parent_key: &PKeyRef<Private>,
    config: &CertConfig,
    keygen: &dyn KeyGenerator,
) -> Result<(X509, PKey<Private>)> {
    let key = keygen.generate(config.algorithm)?;
    let cert = new_signed_cert(config, &key, parent_cert, parent_key, true)?;
    Ok((cert, key))
}

/// Create a new key and a leaf certificate signed by the CA.
///
/// # Errors
/// [`Error::MissingKeyUsage`] if `config.usages` is empty; checked before any
/// key is generated.
pub fn new_cert_and_key(
    ca_cert: &X509Ref,
    ca_key: &PKeyRef<Private>,
    config: &CertConfig,
    keygen: &dyn KeyGenerator,
) -> Result<(X509, PKey<Private>)> {
    if config.usages.is_empty() {
        return Err(Error::MissingKeyUsage);
    }
    let key = keygen.generate(config.algorithm)?;
    let cert = new_signed_cert(config, &key, ca_cert, ca_key, false)?;
    Ok((cert, key))
}

/// Create a new key and a CSR for it.
pub fn new_csr_and_key(
    config: &CertConfig,
    keygen: &dyn KeyGenerator,
) -> Result<(X509Req, PKey<Private>)> {
    let key = keygen.generate(config.algorithm)?;
    let csr = new_csr(config, &key)?;
    Ok((csr, key))
}

/// Build a CSR carrying the subject and alt names of `cfg`, signed by `key`.
pub fn new_csr(cfg: &CertConfig, key: &PKeyRef<Private>) -> Result<X509Req> {
    let mut builder = X509Req::builder()?;
    builder.set_version(0)?;
    let subject = subject_name(cfg)?;
    builder.set_subject_name(&subject)?;
    builder.set_pubkey(key)?;

    if let Some(san) = alt_names_extension(&cfg.alt_names) {
        let mut extensions = Stack::new()?;
        extensions.push(san.build(&builder.x509v3_context(None))?)?;
        builder.add_extensions(&extensions)?;
    }

    builder.sign(key, MessageDigest::sha256())?;
    debug!(common_name = %cfg.common_name, "created certificate signing request");
    Ok(builder.build())
}

/// Issue a certificate for `key`, signed by `ca_key` on behalf of `ca_cert`.
///
/// The validity window starts at the issuer's notBefore so a freshly issued
/// chain is never "not yet valid" at its lower edge.
pub fn new_signed_cert(
    cfg: &CertConfig,
    key: &PKeyRef<Private>,
    ca_cert: &X509Ref,
    ca_key: &PKeyRef<Private>,
    is_ca: bool,
) -> Result<X509> {
    let serial = random_serial()?;
    if cfg.common_name.is_empty() {
        return Err(Error::MissingCommonName);
    }

    let mut alt_names = cfg.alt_names.clone();
    alt_names.remove_duplicates();

    let mut builder = X509::builder()?;
    builder.set_version(X509_VERSION_3)?;
    let serial_number = serial.to_asn1_integer()?;
    builder.set_serial_number(&serial_number)?;
    let subject = subject_name(cfg)?;
    builder.set_subject_name(&subject)?;
    builder.set_issuer_name(ca_cert.subject_name())?;
    builder.set_not_before(ca_cert.not_before())?;
    let not_after = Asn1Time::days_from_now(CERT_VALIDITY_DAYS)?;
    builder.set_not_after(&not_after)?;
    builder.set_pubkey(key)?;

    let mut bc = BasicConstraints::new();
    bc.critical();
    if is_ca {
        bc.ca();
    }
    builder.append_extension(bc.build()?)?;

    let mut ku = KeyUsage::new();
    ku.critical().key_encipherment().digital_signature();
    if is_ca {
        ku.key_cert_sign();
    }
    builder.append_extension(ku.build()?)?;

    if !cfg.usages.is_empty() {
        let mut eku = ExtendedKeyUsage::new();
        for usage in &cfg.usages {
            usage.apply(&mut eku);
        }
        builder.append_extension(eku.build()?)?;
    }

    if let Some(san) = alt_names_extension(&alt_names) {
        let extension = san.build(&builder.x509v3_context(Some(ca_cert), None))?;
        builder.append_extension(extension)?;
    }

    let ski = SubjectKeyIdentifier::new().build(&builder.x509v3_context(Some(ca_cert), None))?;
    builder.append_extension(ski)?;
    let aki = AuthorityKeyIdentifier::new()
        .keyid(false)
        .build(&builder.x509v3_context(Some(ca_cert), None))?;
    builder.append_extension(aki)?;

    builder.sign(ca_key, MessageDigest::sha256())?;
    let cert = builder.build();
    debug!(
        common_name = %cfg.common_name,
        is_ca,
        serial = %serial,
        "issued signed certificate"
    );
    Ok(cert)
}
