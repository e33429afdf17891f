use pki_envelope::aes::{aes128_decrypt, aes128_encrypt, aes256_decrypt, aes256_encrypt};
use pki_envelope::compressed::{
    ga128_decode, ga128_encode, ga256_decode, ga256_encode, sa128_decode, sa128_encode,
    sa256_decode, sa256_encode,
};
use pki_envelope::salt::{
    aes128_salt_decrypt, aes128_salt_encrypt, aes256_salt_decrypt, aes256_salt_encrypt,
    is_aes128_salt_text, is_aes256_salt_text,
};
use pki_envelope::Error;
use proptest::prelude::*;

#[test]
fn hello_world_envelope() {
    let ctext = aes256_encrypt("k", "v", "hello world").unwrap();
    assert!(ctext.starts_with("{AES256}"));
    assert_eq!(aes256_decrypt("k", "v", &ctext).unwrap(), "hello world");
}

#[test]
fn envelope_is_deterministic_without_salt() {
    assert_eq!(
        aes128_encrypt("key", "iv", "same").unwrap(),
        aes128_encrypt("key", "iv", "same").unwrap()
    );
}

#[test]
fn salted_envelopes_differ_but_decrypt() {
    let texts: Vec<String> = (0..20)
        .map(|_| aes256_salt_encrypt("key", "iv", "payload").unwrap())
        .collect();
    assert!(texts.iter().any(|t| t != &texts[0]));
    for t in &texts {
        assert!(is_aes256_salt_text(t));
        assert!(!is_aes128_salt_text(t));
        assert_eq!(aes256_salt_decrypt("key", "iv", t).unwrap(), "payload");
    }
}

#[test]
fn wrong_cipher_tag_rejected() {
    let ctext = aes128_encrypt("k", "v", "x").unwrap();
    assert!(matches!(
        aes256_decrypt("k", "v", &ctext),
        Err(Error::NotCipherText(_))
    ));
    let salted = aes128_salt_encrypt("k", "v", "x").unwrap();
    assert!(matches!(
        aes128_decrypt("k", "v", &salted),
        Err(Error::NotCipherText(_))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn aes_roundtrip(key in ".{0,32}", iv in ".{0,32}", text in ".{0,200}") {
        let c256 = aes256_encrypt(&key, &iv, &text).unwrap();
        prop_assert_eq!(aes256_decrypt(&key, &iv, &c256).unwrap(), text.clone());
        let c128 = aes128_encrypt(&key, &iv, &text).unwrap();
        prop_assert_eq!(aes128_decrypt(&key, &iv, &c128).unwrap(), text);
    }

    #[test]
    fn salted_roundtrip(key in "[a-z0-9]{1,16}", text in ".{0,100}") {
        let c = aes128_salt_encrypt(&key, "iv", &text).unwrap();
        prop_assert_eq!(aes128_salt_decrypt(&key, "iv", &c).unwrap(), text);
    }

    #[test]
    fn compressed_roundtrip(text in ".{0,300}") {
        prop_assert_eq!(sa128_decode("k", "v", &sa128_encode("k", "v", &text).unwrap()).unwrap(), text.clone());
        prop_assert_eq!(sa256_decode("k", "v", &sa256_encode("k", "v", &text).unwrap()).unwrap(), text.clone());
        prop_assert_eq!(ga128_decode("k", "v", &ga128_encode("k", "v", &text).unwrap()).unwrap(), text.clone());
        prop_assert_eq!(ga256_decode("k", "v", &ga256_encode("k", "v", &text).unwrap()).unwrap(), text);
    }

    #[test]
    fn wrong_passphrase_never_panics(text in ".{1,64}") {
        let c = aes256_encrypt("right", "iv", &text).unwrap();
        // Usually BadPadding; a lucky pad byte can still yield garbage or UTF-8 errors
        if let Ok(out) = aes256_decrypt("wrong", "iv", &c) {
            prop_assert_ne!(out, text);
        }
    }
}
