//! AES-CBC block cipher envelope.
//!
//! ```text
//! key ──SHA-256/MD5──► AES key
//! iv  ──MD5──────────► CBC IV (16 bytes)
//! plaintext ─PKCS#5─► AES-CBC ─► URL-safe base64 ─► "{AES256}" + payload
//! ```
//!
//! Decryption is the exact inverse and insists on the identifier prefix before
//! touching the payload.
//!
//! Padding removal compares bytes in data-dependent time; this is a known
//! limitation for callers exposing decryption as an oracle.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use openssl::symm::{Cipher, Crypter, Mode};

use crate::error::{Error, Result};
use crate::kdf::{derive_key, AES128_KEY_SIZE, AES256_KEY_SIZE};

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

pub const AES256_IDENTIFIER: &str = "{AES256}";
pub const AES128_IDENTIFIER: &str = "{AES128}";

fn cipher_for(key_size: u32) -> Result<Cipher> {
    match key_size {
        AES256_KEY_SIZE => Ok(Cipher::aes_256_cbc()),
        AES128_KEY_SIZE => Ok(Cipher::aes_128_cbc()),
        other => Err(Error::InvalidKeySize(other)),
    }
}

/// Derive the (key, iv) pair for one call.
fn key_material(key: &str, iv: &str, key_size: u32) -> Result<(Vec<u8>, Vec<u8>)> {
    let aes_key = derive_key(key, key_size)?;
    let mut aes_iv = derive_key(iv, (BLOCK_SIZE * 8) as u32)?;
    aes_iv.truncate(BLOCK_SIZE);
    Ok((aes_key, aes_iv))
}

fn run_cbc(mode: Mode, key_size: u32, key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher_for(key_size)?;
    let mut crypter = Crypter::new(cipher, mode, key, Some(iv))?;
    crypter.pad(false);
    let mut out = vec![0u8; data.len() + cipher.block_size()];
    let mut count = crypter.update(data, &mut out)?;
    count += crypter.finalize(&mut out[count..])?;
    out.truncate(count);
    Ok(out)
}

/// Append PKCS#5 padding: `n` copies of the byte `n`, `1 <= n <= block_size`.
pub fn pkcs5_padding(mut text: Vec<u8>, block_size: usize) -> Vec<u8> {
    let padding = block_size - text.len() % block_size;
    text.extend(std::iter::repeat(padding as u8).take(padding));
    text
}

/// Strip PKCS#5 padding, rejecting anything that is not well formed.
pub fn pkcs5_unpadding(mut text: Vec<u8>, block_size: usize) -> Result<Vec<u8>> {
    let length = text.len();
    let unpadding = *text.last().ok_or(Error::BadPadding)? as usize;
    if unpadding == 0 || unpadding > block_size || unpadding > length {
        return Err(Error::BadPadding);
    }
    if text[length - unpadding..]
        .iter()
        .any(|&b| b as usize != unpadding)
    {
        return Err(Error::BadPadding);
    }
    text.truncate(length - unpadding);
    Ok(text)
}

/// Pad and CBC-encrypt `text` under passphrase-derived key material.
pub fn aes_encrypt(key: &str, iv: &str, key_size: u32, text: &[u8]) -> Result<Vec<u8>> {
    let (aes_key, aes_iv) = key_material(key, iv, key_size)?;
    let padded = pkcs5_padding(text.to_vec(), BLOCK_SIZE);
    run_cbc(Mode::Encrypt, key_size, &aes_key, &aes_iv, &padded)
}

/// CBC-decrypt and unpad `ctext`.
///
/// # Errors
/// [`Error::BadPadding`] if the ciphertext is not block aligned or the
/// recovered padding is malformed (usually a wrong passphrase).
pub fn aes_decrypt(key: &str, iv: &str, key_size: u32, ctext: &[u8]) -> Result<Vec<u8>> {
    if ctext.len() % BLOCK_SIZE != 0 {
        return Err(Error::BadPadding);
    }
    let (aes_key, aes_iv) = key_material(key, iv, key_size)?;
    let text = run_cbc(Mode::Decrypt, key_size, &aes_key, &aes_iv, ctext)?;
    pkcs5_unpadding(text, BLOCK_SIZE)
}

/// Encrypt and tag with `{AES256}`.
pub fn aes256_encrypt(key: &str, iv: &str, text: &str) -> Result<String> {
    let ctext = aes_encrypt(key, iv, AES256_KEY_SIZE, text.as_bytes())?;
    Ok(format!("{}{}", AES256_IDENTIFIER, URL_SAFE.encode(ctext)))
}

/// Decrypt a `{AES256}` envelope.
pub fn aes256_decrypt(key: &str, iv: &str, ctext: &str) -> Result<String> {
    let payload = parse_aes256_text(ctext).ok_or(Error::NotCipherText("aes"))?;
    decrypt_payload(key, iv, AES256_KEY_SIZE, payload)
}

/// Encrypt and tag with `{AES128}`.
pub fn aes128_encrypt(key: &str, iv: &str, text: &str) -> Result<String> {
    let ctext = aes_encrypt(key, iv, AES128_KEY_SIZE, text.as_bytes())?;
    Ok(format!("{}{}", AES128_IDENTIFIER, URL_SAFE.encode(ctext)))
}

/// Decrypt a `{AES128}` envelope.
pub fn aes128_decrypt(key: &str, iv: &str, ctext: &str) -> Result<String> {
    let payload = parse_aes128_text(ctext).ok_or(Error::NotCipherText("aes"))?;
    decrypt_payload(key, iv, AES128_KEY_SIZE, payload)
}

pub(crate) fn decrypt_payload(key: &str, iv: &str, key_size: u32, payload: &str) -> Result<String> {
    let ctext = URL_SAFE.decode(payload)?;
    let text = aes_decrypt(key, iv, key_size, &ctext)?;
    Ok(String::from_utf8(text)?)
}

pub fn parse_aes256_text(ctext: &str) -> Option<&str> {
    ctext.strip_prefix(AES256_IDENTIFIER)
}

pub fn parse_aes128_text(ctext: &str) -> Option<&str> {
    ctext.strip_prefix(AES128_IDENTIFIER)
}

pub fn is_aes256_text(ctext: &str) -> bool {
    ctext.starts_with(AES256_IDENTIFIER)
}

pub fn is_aes128_text(ctext: &str) -> bool {
    ctext.starts_with(AES128_IDENTIFIER)
}
