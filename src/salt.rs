//! Salted AES envelope.
//!
//! A fresh decimal salt in `1..=10000` is appended to both the passphrase and
//! the IV seed on every call. The salt travels in clear inside the tag
//! (`{AES256Sa<N>lt}`), so only its unpredictability matters.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

use crate::aes::{aes_encrypt, decrypt_payload};
use crate::error::{Error, Result};
use crate::kdf::{AES128_KEY_SIZE, AES256_KEY_SIZE};
use crate::random::random_int;

/// Upper bound (inclusive) for generated salts
pub const MAX_SALT: i64 = 10000;

const AES256_SALT_PREFIX: &str = "{AES256Sa";
const AES128_SALT_PREFIX: &str = "{AES128Sa";
const SALT_SUFFIX: &str = "lt}";

fn new_salt() -> String {
    (random_int(MAX_SALT) + 1).to_string()
}

fn salt_encrypt(prefix: &str, key_size: u32, key: &str, iv: &str, text: &str) -> Result<String> {
    let salt = new_salt();
    let ctext = aes_encrypt(
        &format!("{key}{salt}"),
        &format!("{iv}{salt}"),
        key_size,
        text.as_bytes(),
    )?;
    Ok(format!("{prefix}{salt}{SALT_SUFFIX}{}", URL_SAFE.encode(ctext)))
}

fn salt_decrypt(prefix: &str, key_size: u32, key: &str, iv: &str, ctext: &str) -> Result<String> {
    let (payload, salt) = parse_salt_text(prefix, ctext).ok_or(Error::NotCipherText("aes"))?;
    decrypt_payload(
        &format!("{key}{salt}"),
        &format!("{iv}{salt}"),
        key_size,
        payload,
    )
}

/// Split `<prefix><digits>lt}<payload>` into `(payload, digits)`.
fn parse_salt_text<'a>(prefix: &str, ctext: &'a str) -> Option<(&'a str, &'a str)> {
    let rest = ctext.strip_prefix(prefix)?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let (salt, rest) = rest.split_at(digits);
    let payload = rest.strip_prefix(SALT_SUFFIX)?;
    Some((payload, salt))
}

pub fn aes256_salt_encrypt(key: &str, iv: &str, text: &str) -> Result<String> {
    salt_encrypt(AES256_SALT_PREFIX, AES256_KEY_SIZE, key, iv, text)
}

pub fn aes256_salt_decrypt(key: &str, iv: &str, ctext: &str) -> Result<String> {
    salt_decrypt(AES256_SALT_PREFIX, AES256_KEY_SIZE, key, iv, ctext)
}

pub fn aes128_salt_encrypt(key: &str, iv: &str, text: &str) -> Result<String> {
    salt_encrypt(AES128_SALT_PREFIX, AES128_KEY_SIZE, key, iv, text)
}

pub fn aes128_salt_decrypt(key: &str, iv: &str, ctext: &str) -> Result<String> {
    salt_decrypt(AES128_SALT_PREFIX, AES128_KEY_SIZE, key, iv, ctext)
}

/// Returns `(payload, salt)` for a `{AES256Sa<N>lt}` envelope.
pub fn parse_aes256_salt_text(ctext: &str) -> Option<(&str, &str)> {
    parse_salt_text(AES256_SALT_PREFIX, ctext)
}

/// Returns `(payload, salt)` for a `{AES128Sa<N>lt}` envelope.
pub fn parse_aes128_salt_text(ctext: &str) -> Option<(&str, &str)> {
    parse_salt_text(AES128_SALT_PREFIX, ctext)
}

pub fn is_aes256_salt_text(ctext: &str) -> bool {
    parse_aes256_salt_text(ctext).is_some()
}

pub fn is_aes128_salt_text(ctext: &str) -> bool {
    parse_aes128_salt_text(ctext).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salted_roundtrip_varies_output() {
        let outputs: Vec<String> = (0..20)
            .map(|_| aes256_salt_encrypt("key", "iv", "payload").unwrap())
            .collect();
        for ctext in &outputs {
            assert!(is_aes256_salt_text(ctext));
            assert_eq!(aes256_salt_decrypt("key", "iv", ctext).unwrap(), "payload");
        }
        let distinct: std::collections::HashSet<_> = outputs.iter().collect();
        assert!(distinct.len() > 1);
    }

    #[test]
    fn test_salted_aes128_roundtrip() {
        let ctext = aes128_salt_encrypt("key", "iv", "").unwrap();
        assert!(ctext.starts_with("{AES128Sa"));
        assert_eq!(aes128_salt_decrypt("key", "iv", &ctext).unwrap(), "");
    }

    #[test]
    fn test_salt_is_in_range() {
        for _ in 0..200 {
            let ctext = aes128_salt_encrypt("k", "v", "t").unwrap();
            let (_, salt) = parse_aes128_salt_text(&ctext).unwrap();
            let salt: i64 = salt.parse().unwrap();
            assert!((1..=MAX_SALT).contains(&salt));
        }
    }

    #[test]
    fn test_parse_salt_text() {
        assert_eq!(
            parse_aes256_salt_text("{AES256Sa42lt}abc"),
            Some(("abc", "42"))
        );
        assert_eq!(parse_aes256_salt_text("{AES256Salt}abc"), None);
        assert_eq!(parse_aes256_salt_text("{AES256Sa4x2lt}abc"), None);
        assert_eq!(parse_aes256_salt_text("{AES128Sa42lt}abc"), None);
    }

    #[test]
    fn test_is_salt_text_matches_own_key_size() {
        let c128 = aes128_salt_encrypt("k", "v", "t").unwrap();
        let c256 = aes256_salt_encrypt("k", "v", "t").unwrap();
        assert!(is_aes128_salt_text(&c128));
        assert!(!is_aes128_salt_text(&c256));
        assert!(is_aes256_salt_text(&c256));
        assert!(!is_aes256_salt_text(&c128));
    }

    #[test]
    fn test_salted_rejects_plain_envelope() {
        let plain = crate::aes::aes256_encrypt("k", "v", "t").unwrap();
        assert!(matches!(
            aes256_salt_decrypt("k", "v", &plain),
            Err(Error::NotCipherText(_))
        ));
    }

    #[test]
    fn test_tampered_salt_fails_or_differs() {
        let ctext = aes256_salt_encrypt("k", "v", "original text").unwrap();
        let (payload, salt) = parse_aes256_salt_text(&ctext).unwrap();
        let other: i64 = salt.parse::<i64>().unwrap() % MAX_SALT + 1;
        let forged = format!("{{AES256Sa{other}lt}}{payload}");
        match aes256_salt_decrypt("k", "v", &forged) {
            Ok(text) => assert_ne!(text, "original text"),
            Err(_) => {}
        }
    }
}
