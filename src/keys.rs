//! Private key generation and PEM (de)serialization.
//!
//! Key generation goes through the [`KeyGenerator`] strategy so callers (and
//! tests) can swap in pregenerated or hardware-backed keys without touching
//! issuance code.

use openssl::ec::{EcGroup, EcKey};
use openssl::nid::Nid;
use openssl::pkey::{Id, PKey, PKeyRef, Private, Public};
use openssl::rsa::Rsa;
use openssl::x509::X509;
use tracing::debug;

use crate::cert_config::KeyAlgorithm;
use crate::error::{Error, Result};

/// PEM block type for PKCS#8 private keys
pub const PRIVATE_KEY_BLOCK_TYPE: &str = "PRIVATE KEY";
/// PEM block type for PKIX public keys
pub const PUBLIC_KEY_BLOCK_TYPE: &str = "PUBLIC KEY";
/// PEM block type for PKCS#1 RSA private keys
pub const RSA_PRIVATE_KEY_BLOCK_TYPE: &str = "RSA PRIVATE KEY";
/// PEM block type for PKCS#1 RSA public keys
pub const RSA_PUBLIC_KEY_BLOCK_TYPE: &str = "RSA PUBLIC KEY";
/// PEM block type for SEC1 EC private keys
pub const EC_PRIVATE_KEY_BLOCK_TYPE: &str = "EC PRIVATE KEY";
/// PEM block type for certificates
pub const CERTIFICATE_BLOCK_TYPE: &str = "CERTIFICATE";
/// PEM block type for certificate signing requests
pub const CERTIFICATE_REQUEST_BLOCK_TYPE: &str = "CERTIFICATE REQUEST";

/// RSA modulus size for generated certificate keys
pub const RSA_KEY_SIZE: u32 = 2048;

/// Source of fresh private keys for issuance.
pub trait KeyGenerator {
    fn generate(&self, algorithm: KeyAlgorithm) -> Result<PKey<Private>>;
}

/// Generates keys from the OpenSSL CSPRNG: RSA-2048 or ECDSA P-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemKeyGenerator;

impl KeyGenerator for SystemKeyGenerator {
    fn generate(&self, algorithm: KeyAlgorithm) -> Result<PKey<Private>> {
        generate_private_key(algorithm)
    }
}

/// Generate a key pair for `algorithm`.
///
/// # Errors
/// [`Error::Entropy`] when OpenSSL cannot produce the key.
pub fn generate_private_key(algorithm: KeyAlgorithm) -> Result<PKey<Private>> {
    let entropy = |e: openssl::error::ErrorStack| Error::Entropy(e.to_string());
    let key = match algorithm {
        KeyAlgorithm::Ecdsa => {
            let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)?;
            PKey::from_ec_key(EcKey::generate(&group).map_err(entropy)?)?
        }
        KeyAlgorithm::Rsa => PKey::from_rsa(Rsa::generate(RSA_KEY_SIZE).map_err(entropy)?)?,
    };
    debug!(?algorithm, "generated private key");
    Ok(key)
}

/// Encode an RSA or ECDSA private key as PEM.
///
/// RSA keys use `RSA PRIVATE KEY` (PKCS#1), EC keys `EC PRIVATE KEY` (SEC1).
pub fn marshal_private_key_to_pem(key: &PKeyRef<Private>) -> Result<Vec<u8>> {
    match key.id() {
        Id::EC => Ok(key.ec_key()?.private_key_to_pem()?),
        Id::RSA => Ok(key.rsa()?.private_key_to_pem()?),
        other => Err(Error::UnsupportedKeyType(format!("{other:?}"))),
    }
}

/// PKIX `PUBLIC KEY` PEM for any key holding a public half.
pub fn encode_public_key_pem<T>(key: &PKeyRef<T>) -> Result<Vec<u8>>
where
    T: openssl::pkey::HasPublic,
{
    Ok(key.public_key_to_pem()?)
}

fn is_rsa_or_ec<T>(key: &PKeyRef<T>) -> bool {
    matches!(key.id(), Id::RSA | Id::EC)
}

const PEM_BEGIN: &str = "-----BEGIN ";
const PEM_END: &str = "-----END ";
const PEM_DASHES: &str = "-----";

/// Every well-formed PEM block in `data`, in file order.
///
/// Each `BEGIN`..`END` section is decoded on its own so one corrupt block
/// (bad base64, mismatched label) drops out without taking its neighbours
/// with it.
pub(crate) fn parse_pem_blocks(data: &[u8]) -> Vec<pem::Pem> {
    let text = String::from_utf8_lossy(data);
    let mut rest: &str = &text;
    let mut blocks = Vec::new();
    while let Some(start) = rest.find(PEM_BEGIN) {
        let section = &rest[start..];
        let Some(end) = section.find(PEM_END) else {
            break;
        };
        // BEGIN without its own END: resync on the next BEGIN
        if let Some(next) = section[PEM_BEGIN.len()..end].find(PEM_BEGIN) {
            rest = &section[PEM_BEGIN.len() + next..];
            continue;
        }
        let label = end + PEM_END.len();
        let close = match section[label..].find(PEM_DASHES) {
            Some(i) if !section[label..label + i].contains('\n') => label + i + PEM_DASHES.len(),
            _ => {
                rest = &section[label..];
                continue;
            }
        };
        match pem::parse(&section[..close]) {
            Ok(block) => blocks.push(block),
            Err(err) => debug!(%err, "skipping malformed PEM block"),
        }
        rest = &section[close..];
    }
    blocks
}

fn private_key_from_block(block: &pem::Pem) -> Option<PKey<Private>> {
    let der = block.contents();
    match block.tag() {
        EC_PRIVATE_KEY_BLOCK_TYPE => EcKey::private_key_from_der(der)
            .and_then(PKey::from_ec_key)
            .ok(),
        RSA_PRIVATE_KEY_BLOCK_TYPE => Rsa::private_key_from_der(der)
            .and_then(PKey::from_rsa)
            .ok(),
        PRIVATE_KEY_BLOCK_TYPE => PKey::private_key_from_pkcs8(der).ok(),
        _ => None,
    }
}

/// Parse the first RSA or ECDSA private key in PEM `data`.
///
/// Recognizes `EC PRIVATE KEY`, `RSA PRIVATE KEY` and `PRIVATE KEY` blocks and
/// skips anything else (e.g. `EC PARAMETERS`).
pub fn parse_private_key_pem(data: &[u8]) -> Result<PKey<Private>> {
    parse_pem_blocks(data)
        .iter()
        .filter_map(private_key_from_block)
        .find(|key| is_rsa_or_ec(key))
        .ok_or(Error::NoValidKeyFound)
}

fn public_key_from_block(block: &pem::Pem) -> Option<PKey<Public>> {
    let der = block.contents();
    match block.tag() {
        PUBLIC_KEY_BLOCK_TYPE => PKey::public_key_from_der(der).ok(),
        RSA_PUBLIC_KEY_BLOCK_TYPE => Rsa::public_key_from_der_pkcs1(der)
            .and_then(PKey::from_rsa)
            .or_else(|_| PKey::public_key_from_der(der))
            .ok(),
        CERTIFICATE_BLOCK_TYPE => X509::from_der(der).and_then(|c| c.public_key()).ok(),
        _ => private_key_from_block(block)
            .and_then(|k| k.public_key_to_der().ok())
            .and_then(|d| PKey::public_key_from_der(&d).ok()),
    }
}

/// Collect every RSA or ECDSA public key in PEM `data`.
///
/// Private key blocks contribute their public half, so this reads both `.pub`
/// and `.key` files.
pub fn parse_public_keys_pem(data: &[u8]) -> Result<Vec<PKey<Public>>> {
    let keys: Vec<_> = parse_pem_blocks(data)
        .iter()
        .filter_map(public_key_from_block)
        .filter(|key| is_rsa_or_ec(key))
        .collect();
    if keys.is_empty() {
        return Err(Error::NoValidPublicKeyFound);
    }
    Ok(keys)
}
