//! Standalone RSA key pairs and RSA-OAEP encryption.
//!
//! These keys are separate from certificate keys: 4096-bit, persisted as
//! `<name>RSAPublic.pem` (PKIX) and `<name>RSAPrivate.pem` (PKCS#1, `0600`).
//! Encryption is OAEP with SHA-256 for both the label hash and MGF1.

use std::path::{Path, PathBuf};

use openssl::encrypt::{Decrypter, Encrypter};
use openssl::hash::MessageDigest;
use openssl::pkey::{Id, PKey, Private, Public};
use openssl::rsa::{Padding, Rsa};
use tracing::debug;

use crate::error::{Error, Result};
use crate::keys::{parse_pem_blocks, parse_public_keys_pem, RSA_PRIVATE_KEY_BLOCK_TYPE};
use crate::storage::{create_parent, read_file, write_with_mode, CERT_FILE_MODE, KEY_FILE_MODE};

/// Modulus size for standalone RSA key pairs
pub const RSA_KEYPAIR_BITS: u32 = 4096;

fn path_for_rsa_public(pki_path: &Path, name: &str) -> PathBuf {
    pki_path.join(format!("{name}RSAPublic.pem"))
}

fn path_for_rsa_private(pki_path: &Path, name: &str) -> PathBuf {
    pki_path.join(format!("{name}RSAPrivate.pem"))
}

pub fn new_rsa_keypair() -> Result<(Rsa<Private>, Rsa<Public>)> {
    let private = Rsa::generate(RSA_KEYPAIR_BITS).map_err(|e| Error::Entropy(e.to_string()))?;
    let public = Rsa::from_public_components(private.n().to_owned()?, private.e().to_owned()?)?;
    debug!(bits = RSA_KEYPAIR_BITS, "generated RSA key pair");
    Ok((private, public))
}

/// Write the public key, then the private key.
pub fn write_rsa_keypair(
    pki_path: &Path,
    name: &str,
    private: &Rsa<Private>,
    public: &Rsa<Public>,
) -> Result<()> {
    write_rsa_public_key(pki_path, name, public)?;
    write_rsa_private_key(pki_path, name, private)
}

pub fn write_rsa_public_key(pki_path: &Path, name: &str, public: &Rsa<Public>) -> Result<()> {
    let path = path_for_rsa_public(pki_path, name);
    create_parent(&path)?;
    write_with_mode(&path, &public.public_key_to_pem()?, CERT_FILE_MODE)
}

pub fn write_rsa_private_key(pki_path: &Path, name: &str, private: &Rsa<Private>) -> Result<()> {
    let path = path_for_rsa_private(pki_path, name);
    create_parent(&path)?;
    write_with_mode(&path, &private.private_key_to_pem()?, KEY_FILE_MODE)
}

pub fn try_load_rsa_keypair_from_disk(
    pki_path: &Path,
    name: &str,
) -> Result<(Rsa<Private>, Rsa<Public>)> {
    let public = try_load_rsa_public_key_from_disk(pki_path, name)?;
    let private = try_load_rsa_private_key_from_disk(pki_path, name)?;
    Ok((private, public))
}

pub fn try_load_rsa_public_key_from_disk(pki_path: &Path, name: &str) -> Result<Rsa<Public>> {
    try_load_rsa_public_key_from_content(&read_file(&path_for_rsa_public(pki_path, name))?)
}

pub fn try_load_rsa_private_key_from_disk(pki_path: &Path, name: &str) -> Result<Rsa<Private>> {
    parse_rsa_private_key_pem(&read_file(&path_for_rsa_private(pki_path, name))?)
}

/// First public key in `data`, which must be RSA.
pub fn try_load_rsa_public_key_from_content(data: &[u8]) -> Result<Rsa<Public>> {
    let key = parse_public_keys_pem(data)?.swap_remove(0);
    if key.id() != Id::RSA {
        return Err(Error::NotRsaKey);
    }
    Ok(key.rsa()?)
}

fn parse_rsa_private_key_pem(data: &[u8]) -> Result<Rsa<Private>> {
    let block = parse_pem_blocks(data)
        .into_iter()
        .find(|block| block.tag() == RSA_PRIVATE_KEY_BLOCK_TYPE)
        .ok_or(Error::NoValidKeyFound)?;
    Ok(Rsa::private_key_from_der(block.contents())?)
}

/// PKCS#1 `RSA PRIVATE KEY` PEM.
pub fn export_rsa_private_key_as_pem_str(private: &Rsa<Private>) -> Result<String> {
    Ok(String::from_utf8(private.private_key_to_pem()?)?)
}

pub fn parse_rsa_private_key_from_pem_str(pem_str: &str) -> Result<Rsa<Private>> {
    parse_rsa_private_key_pem(pem_str.as_bytes())
}

/// PKIX `PUBLIC KEY` PEM.
pub fn export_rsa_public_key_as_pem_str(public: &Rsa<Public>) -> Result<String> {
    Ok(String::from_utf8(public.public_key_to_pem()?)?)
}

/// Accepts `PUBLIC KEY` and `RSA PUBLIC KEY` blocks.
pub fn parse_rsa_public_key_from_pem_str(pem_str: &str) -> Result<Rsa<Public>> {
    try_load_rsa_public_key_from_content(pem_str.as_bytes())
}

/// RSA-OAEP (SHA-256) encrypt `text` for `public`.
pub fn rsa_encrypt(text: &[u8], public: &Rsa<Public>) -> Result<Vec<u8>> {
    let pkey = PKey::from_rsa(public.clone())?;
    let mut encrypter = Encrypter::new(&pkey)?;
    encrypter.set_rsa_padding(Padding::PKCS1_OAEP)?;
    encrypter.set_rsa_oaep_md(MessageDigest::sha256())?;
    encrypter.set_rsa_mgf1_md(MessageDigest::sha256())?;
    let mut ctext = vec![0u8; encrypter.encrypt_len(text)?];
    let len = encrypter.encrypt(text, &mut ctext)?;
    ctext.truncate(len);
    Ok(ctext)
}

/// RSA-OAEP (SHA-256) decrypt `ctext` with `private`.
pub fn rsa_decrypt(ctext: &[u8], private: &Rsa<Private>) -> Result<Vec<u8>> {
    let pkey = PKey::from_rsa(private.clone())?;
    let mut decrypter = Decrypter::new(&pkey)?;
    decrypter.set_rsa_padding(Padding::PKCS1_OAEP)?;
    decrypter.set_rsa_oaep_md(MessageDigest::sha256())?;
    decrypter.set_rsa_mgf1_md(MessageDigest::sha256())?;
    let mut text = vec![0u8; decrypter.decrypt_len(ctext)?];
    let len = decrypter.decrypt(ctext, &mut text)?;
    text.truncate(len);
    Ok(text)
}
