//! Passphrase → symmetric key material.
//!
//! Derivation is a single unsalted hash of the UTF-8 passphrase: SHA-256 for
//! 256-bit keys, MD5 for 128-bit keys and IVs. The output is fully
//! deterministic, so secrecy rests entirely on the passphrase.

use openssl::hash::{hash, MessageDigest};

use crate::error::{Error, Result};

/// AES-256 key size in bits
pub const AES256_KEY_SIZE: u32 = 256;
/// AES-128 key size in bits (also the IV derivation size)
pub const AES128_KEY_SIZE: u32 = 128;

fn sha256_key(passphrase: &str) -> Result<Vec<u8>> {
    Ok(hash(MessageDigest::sha256(), passphrase.as_bytes())?.to_vec())
}

fn md5_key(passphrase: &str) -> Result<Vec<u8>> {
    Ok(hash(MessageDigest::md5(), passphrase.as_bytes())?.to_vec())
}

/// Derive `bit_size / 8` bytes of key material from `passphrase`.
///
/// # Errors
/// [`Error::InvalidKeySize`] for any size other than 128 or 256.
pub fn derive_key(passphrase: &str, bit_size: u32) -> Result<Vec<u8>> {
    match bit_size {
        AES256_KEY_SIZE => sha256_key(passphrase),
        AES128_KEY_SIZE => md5_key(passphrase),
        other => Err(Error::InvalidKeySize(other)),
    }
}

/// Lowercase hex MD5 digest of `src`.
pub fn md5_hex(src: &str) -> Result<String> {
    Ok(hex::encode(md5_key(src)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_sizes() {
        assert_eq!(derive_key("k", 256).unwrap().len(), 32);
        assert_eq!(derive_key("k", 128).unwrap().len(), 16);
    }

    #[test]
    fn test_derive_key_deterministic() {
        assert_eq!(
            derive_key("passphrase", 256).unwrap(),
            derive_key("passphrase", 256).unwrap()
        );
        assert_ne!(
            derive_key("passphrase", 256).unwrap(),
            derive_key("passphrase2", 256).unwrap()
        );
    }

    #[test]
    fn test_derive_key_rejects_other_sizes() {
        for size in [0, 64, 192, 512] {
            assert!(matches!(
                derive_key("k", size),
                Err(Error::InvalidKeySize(s)) if s == size
            ));
        }
    }

    #[test]
    fn test_known_digests() {
        assert_eq!(
            hex::encode(derive_key("abc", 256).unwrap()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(md5_hex("abc").unwrap(), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(md5_hex("").unwrap(), "d41d8cd98f00b204e9800998ecf8427e");
    }
}
