//! Compress-then-encrypt envelopes.
//!
//! | Tag       | Compression | Cipher  |
//! |-----------|-------------|---------|
//! | `{SA128}` | snappy      | AES-128 |
//! | `{SA256}` | snappy      | AES-256 |
//! | `{GA128}` | gzip        | AES-128 |
//! | `{GA256}` | gzip        | AES-256 |
//!
//! The compressed bytes are base64'd and fed to the plain AES envelope, so the
//! output carries two tags, e.g. `{GA256}{AES256}<payload>`. Decoding strips
//! the outer tag, decrypts (which checks the inner one) and decompresses.

use crate::aes::{aes128_decrypt, aes128_encrypt, aes256_decrypt, aes256_encrypt};
use crate::compress::{gzip_compress, gzip_decompress, snappy_compress, snappy_decompress};
use crate::error::{Error, Result};

pub const SA256_IDENTIFIER: &str = "{SA256}";
pub const SA128_IDENTIFIER: &str = "{SA128}";
pub const GA256_IDENTIFIER: &str = "{GA256}";
pub const GA128_IDENTIFIER: &str = "{GA128}";

/// SA128: snappy + AES-128
pub fn sa128_encode(key: &str, iv: &str, text: &str) -> Result<String> {
    let ctext = aes128_encrypt(key, iv, &snappy_compress(text)?)?;
    Ok(format!("{SA128_IDENTIFIER}{ctext}"))
}

pub fn sa128_decode(key: &str, iv: &str, ctext: &str) -> Result<String> {
    let inner = parse_sa128_text(ctext).ok_or(Error::NotCipherText("SA128"))?;
    snappy_decompress(&aes128_decrypt(key, iv, inner)?)
}

/// SA256: snappy + AES-256
pub fn sa256_encode(key: &str, iv: &str, text: &str) -> Result<String> {
    let ctext = aes256_encrypt(key, iv, &snappy_compress(text)?)?;
    Ok(format!("{SA256_IDENTIFIER}{ctext}"))
}

pub fn sa256_decode(key: &str, iv: &str, ctext: &str) -> Result<String> {
    let inner = parse_sa256_text(ctext).ok_or(Error::NotCipherText("SA256"))?;
    snappy_decompress(&aes256_decrypt(key, iv, inner)?)
}

/// GA128: gzip + AES-128
pub fn ga128_encode(key: &str, iv: &str, text: &str) -> Result<String> {
    let ctext = aes128_encrypt(key, iv, &gzip_compress(text)?)?;
    Ok(format!("{GA128_IDENTIFIER}{ctext}"))
}

pub fn ga128_decode(key: &str, iv: &str, ctext: &str) -> Result<String> {
    let inner = parse_ga128_text(ctext).ok_or(Error::NotCipherText("GA128"))?;
    gzip_decompress(&aes128_decrypt(key, iv, inner)?)
}

/// GA256: gzip + AES-256
pub fn ga256_encode(key: &str, iv: &str, text: &str) -> Result<String> {
    let ctext = aes256_encrypt(key, iv, &gzip_compress(text)?)?;
    Ok(format!("{GA256_IDENTIFIER}{ctext}"))
}

pub fn ga256_decode(key: &str, iv: &str, ctext: &str) -> Result<String> {
    let inner = parse_ga256_text(ctext).ok_or(Error::NotCipherText("GA256"))?;
    gzip_decompress(&aes256_decrypt(key, iv, inner)?)
}

pub fn parse_sa256_text(ctext: &str) -> Option<&str> {
    ctext.strip_prefix(SA256_IDENTIFIER)
}

pub fn parse_sa128_text(ctext: &str) -> Option<&str> {
    ctext.strip_prefix(SA128_IDENTIFIER)
}

pub fn parse_ga256_text(ctext: &str) -> Option<&str> {
    ctext.strip_prefix(GA256_IDENTIFIER)
}

pub fn parse_ga128_text(ctext: &str) -> Option<&str> {
    ctext.strip_prefix(GA128_IDENTIFIER)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "
11111111111111111111111111111111111111111111111111
22222222222222222222222222222222222222222222222222
33333333333333333333333333333333333333333333333333
aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa
bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb
";

    type Codec = (
        &'static str,
        fn(&str, &str, &str) -> Result<String>,
        fn(&str, &str, &str) -> Result<String>,
    );

    const CODECS: [Codec; 4] = [
        ("{SA128}{AES128}", sa128_encode, sa128_decode),
        ("{SA256}{AES256}", sa256_encode, sa256_decode),
        ("{GA128}{AES128}", ga128_encode, ga128_decode),
        ("{GA256}{AES256}", ga256_encode, ga256_decode),
    ];

    #[test]
    fn test_all_combinations_roundtrip() {
        for (prefix, encode, decode) in CODECS {
            let ctext = encode("1", "2", TEXT).unwrap();
            assert!(ctext.starts_with(prefix), "{ctext} lacks {prefix}");
            assert_eq!(decode("1", "2", &ctext).unwrap(), TEXT);
            assert_eq!(decode("1", "2", &encode("1", "2", "").unwrap()).unwrap(), "");
        }
    }

    #[test]
    fn test_mismatched_outer_tag() {
        let ctext = ga256_encode("k", "v", TEXT).unwrap();
        assert!(matches!(
            sa256_decode("k", "v", &ctext),
            Err(Error::NotCipherText("SA256"))
        ));
        assert!(matches!(
            ga128_decode("k", "v", &ctext),
            Err(Error::NotCipherText("GA128"))
        ));
    }

    #[test]
    fn test_mismatched_inner_tag() {
        // Outer tag right, inner cipher wrong
        let inner = aes128_encrypt("k", "v", "anything").unwrap();
        let forged = format!("{GA256_IDENTIFIER}{inner}");
        assert!(matches!(
            ga256_decode("k", "v", &forged),
            Err(Error::NotCipherText("aes"))
        ));
    }

    #[test]
    fn test_valid_envelope_with_uncompressed_content() {
        // Decrypts fine but the plaintext is not gzip/base64
        let inner = aes256_encrypt("k", "v", "bm90IGd6aXA=").unwrap();
        let forged = format!("{GA256_IDENTIFIER}{inner}");
        assert!(matches!(
            ga256_decode("k", "v", &forged),
            Err(Error::Decompress { codec: "gzip", .. })
        ));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_sa128_text("{SA128}x"), Some("x"));
        assert_eq!(parse_sa256_text("{SA128}x"), None);
        assert_eq!(parse_ga128_text("{GA128}"), Some(""));
        assert_eq!(parse_ga256_text(" {GA256}x"), None);
    }
}
