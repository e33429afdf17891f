//! PKI Envelope - Passphrase Envelopes and a File-Backed Certificate Authority
//!
//! Two independent toolkits built on OpenSSL:
//!
//! - **Envelopes**: passphrase-keyed AES-CBC encryption of text into tagged,
//!   URL-safe strings, optionally salted or compressed first.
//! - **Certificate authority**: key generation, root/intermediate/leaf
//!   issuance, CSRs, chain verification and PEM persistence on disk.
//!
//! # Envelope Formats
//!
//! ```text
//! {AES256}<payload>            plain envelope          (aes)
//! {AES128Sa<N>lt}<payload>     salted envelope         (salt)
//! {GA256}{AES256}<payload>     gzip + plain envelope   (compressed)
//! {SA128}{AES128}<payload>     snappy + plain envelope (compressed)
//! ```
//!
//! ```no_run
//! use pki_envelope::aes::{aes256_decrypt, aes256_encrypt};
//!
//! let ctext = aes256_encrypt("k", "v", "hello world")?;
//! assert!(ctext.starts_with("{AES256}"));
//! assert_eq!(aes256_decrypt("k", "v", &ctext)?, "hello world");
//! # Ok::<(), pki_envelope::Error>(())
//! ```
//!
//! # Certificate Hierarchy
//!
//! ```text
//! Root CA (self-signed, serial 0)
//!   └── Intermediate CA (signed by Root)
//!       └── Leaf Certificate (signed by Root or Intermediate)
//! ```
//!
//! ```no_run
//! use pki_envelope::cert_config::{CertConfig, ExtKeyUsage, KeyAlgorithm};
//! use pki_envelope::generate_root_ca::new_certificate_authority;
//! use pki_envelope::generate_signed_cert::new_cert_and_key;
//! use pki_envelope::keys::SystemKeyGenerator;
//! use pki_envelope::{storage, verify};
//! use std::path::Path;
//!
//! let root_cfg = CertConfig::new("Example Root").algorithm(KeyAlgorithm::Ecdsa);
//! let (root, root_key) = new_certificate_authority(&root_cfg, &SystemKeyGenerator)?;
//!
//! let leaf_cfg = CertConfig::new("web.internal")
//!     .dns_name("web.internal")
//!     .usage(ExtKeyUsage::ServerAuth)
//!     .algorithm(KeyAlgorithm::Ecdsa);
//! let (leaf, leaf_key) = new_cert_and_key(&root, &root_key, &leaf_cfg, &SystemKeyGenerator)?;
//!
//! verify::verify_cert_chain(&leaf, &[], &root)?;
//! storage::write_cert_and_key(Path::new("pki"), "web", &leaf, &leaf_key)?;
//! # Ok::<(), pki_envelope::Error>(())
//! ```
//!
//! # Module Overview
//!
//! - [`kdf`], [`aes`], [`salt`], [`compress`], [`compressed`]: envelopes
//! - [`random`]: bounded random integers for salts
//! - [`cert_config`], [`keys`]: certificate parameters and key handling
//! - [`generate_root_ca`], [`generate_signed_cert`]: issuance
//! - [`verify`]: chain and validity checks
//! - [`storage`]: `<name>.crt|.key|.csr|.pub` files
//! - [`rsa`]: standalone 4096-bit RSA key pairs and RSA-OAEP
//! - [`configs`]: TOML settings for the binary
//!
//! # Security Considerations
//!
//! - Envelope keys come from a single unsalted hash of the passphrase; the
//!   format offers confidentiality against casual inspection, not against
//!   offline guessing of weak passphrases.
//! - CBC without a MAC is malleable, and padding is checked in data-dependent
//!   time.
//! - Private key files are written `0600`; nothing is encrypted at rest.

pub mod aes;
pub mod cert_config;
pub mod compress;
pub mod compressed;
pub mod configs;
pub mod error;
pub mod generate_root_ca;
pub mod generate_signed_cert;
pub mod kdf;
pub mod keys;
pub mod random;
pub mod rsa;
pub mod salt;
pub mod storage;
pub mod verify;

pub use error::{Error, Result};
