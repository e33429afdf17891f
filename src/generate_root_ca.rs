//! Root CA Certificate Generation Module
//!
//! Generates self-signed root CA certificates, the trust anchor at the top of
//! the hierarchy.
//!
//! # PKI Hierarchy Position
//! ```text
//! Root CA (self-signed) ← This module
//!   └── Intermediate CA (signed by Root)
//!       └── Leaf Certificate (signed by Root or Intermediate)
//! ```
//!
//! # Certificate Properties
//! - **Self-signed**: Issuer and subject are the same
//! - **Key Usage**: keyEncipherment, digitalSignature, keyCertSign
//! - **Basic Constraints**: CA=true
//! - **Serial Number**: 0 (root convention)
//! - **Validity**: now .. now + 10 years
//! - **Version**: X.509v3 with extensions
//!
//! # Example
//! ```rust,no_run
//! use pki_envelope::cert_config::{CertConfig, KeyAlgorithm};
//! use pki_envelope::generate_root_ca::new_certificate_authority;
//! use pki_envelope::keys::SystemKeyGenerator;
//!
//! # fn example() -> pki_envelope::Result<()> {
//! let config = CertConfig::new("Example Root CA")
//!     .organization("Example Corporation")
//!     .algorithm(KeyAlgorithm::Ecdsa);
//! let (root_cert, root_key) = new_certificate_authority(&config, &SystemKeyGenerator)?;
//! # Ok(())
//! # }
//! ```

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::x509::extension::{BasicConstraints, KeyUsage, SubjectKeyIdentifier};
use openssl::x509::{X509Name, X509};
use tracing::debug;

use crate::cert_config::CertConfig;
use crate::error::Result;
use crate::keys::KeyGenerator;

pub(crate) const X509_VERSION_3: i32 = 2; // X509 version 3 is represented by 2
/// Validity of every issued certificate, in days (10 years)
pub const CERT_VALIDITY_DAYS: u32 = 365 * 10;

/// Subject name with the common name and each organization entry.
pub(crate) fn subject_name(cfg: &CertConfig) -> Result<X509Name> {
    let mut name_builder = X509Name::builder()?;
    if !cfg.common_name.is_empty() {
        name_builder.append_entry_by_nid(Nid::COMMONNAME, &cfg.common_name)?;
    }
    for org in &cfg.organization {
        name_builder.append_entry_by_nid(Nid::ORGANIZATIONNAME, org)?;
    }
    Ok(name_builder.build())
}

/// Create a new key and a self-signed CA certificate for it.
///
/// # Returns
/// `(certificate, private key)`
pub fn new_certificate_authority(
    config: &CertConfig,
    keygen: &dyn KeyGenerator,
) -> Result<(X509, PKey<Private>)> {
    let key = keygen.generate(config.algorithm)?;
    let cert = new_self_signed_ca_cert(config, &key)?;
    Ok((cert, key))
}

/// Build a self-signed CA certificate for `key`.
///
/// Only the common name and organization of `cfg` are used; alt names and
/// extended usages do not apply to a root.
pub fn new_self_signed_ca_cert(cfg: &CertConfig, key: &PKeyRef<Private>) -> Result<X509> {
    let mut builder = X509::builder()?;
    builder.set_version(X509_VERSION_3)?;

    let serial = BigNum::from_u32(0)?.to_asn1_integer()?;
    builder.set_serial_number(&serial)?;

    let name = subject_name(cfg)?;
    builder.set_subject_name(&name)?;
    builder.set_issuer_name(&name)?;

    let not_before = Asn1Time::days_from_now(0)?;
    builder.set_not_before(&not_before)?;
    let not_after = Asn1Time::days_from_now(CERT_VALIDITY_DAYS)?;
    builder.set_not_after(&not_after)?;

    builder.set_pubkey(key)?;

    builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
    builder.append_extension(
        KeyUsage::new()
            .critical()
            .key_encipherment()
            .digital_signature()
            .key_cert_sign()
            .build()?,
    )?;
    let ski = SubjectKeyIdentifier::new().build(&builder.x509v3_context(None, None))?;
    builder.append_extension(ski)?;

    builder.sign(key, MessageDigest::sha256())?;
    let cert = builder.build();
    debug!(common_name = %cfg.common_name, "issued self-signed CA certificate");
    Ok(cert)
}
