//! Error types shared by the envelope and certificate-authority modules.
//!
//! Every fallible library call returns [`Result`]. Error messages never carry
//! key material or plaintext.

use std::path::Path;

use thiserror::Error;

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // ========================================
    // Envelope errors
    // ========================================
    /// Key size is neither 128 nor 256 bits.
    #[error("wrong keysize: {0} bits")]
    InvalidKeySize(u32),

    /// Text does not start with the expected envelope identifier.
    #[error("not {0} cipher text")]
    NotCipherText(&'static str),

    /// Decrypted buffer does not end in valid PKCS#5 padding.
    #[error("bad padding")]
    BadPadding,

    /// Decrypted or decompressed bytes are not valid UTF-8.
    #[error("plaintext is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("{codec} compression failed: {reason}")]
    Compress { codec: &'static str, reason: String },

    #[error("{codec} decompression failed: {reason}")]
    Decompress { codec: &'static str, reason: String },

    /// The secure random source could not produce bytes.
    #[error("random source unavailable: {0}")]
    Entropy(String),

    // ========================================
    // Certificate authority errors
    // ========================================
    #[error("must specify at least one ExtKeyUsage")]
    MissingKeyUsage,

    #[error("must specify a CommonName")]
    MissingCommonName,

    #[error("certificate cannot be empty when writing to file")]
    NilCertificate,

    #[error("{0} cannot be empty when writing to file")]
    NilKey(&'static str),

    #[error("data does not contain a valid RSA or ECDSA private key")]
    NoValidKeyFound,

    #[error("data does not contain any valid RSA or ECDSA certificates")]
    NoValidCertFound,

    #[error("data doesn't contain a valid certificate request")]
    NoValidCsrFound,

    #[error("data does not contain any valid RSA or ECDSA public keys")]
    NoValidPublicKeyFound,

    #[error("key type is not rsa")]
    NotRsaKey,

    #[error("private key is not a recognized type: {0}")]
    UnsupportedKeyType(String),

    #[error("certificate chain verification failed: {0}")]
    ChainVerificationFailed(String),

    #[error("the certificate is not valid yet: {0}")]
    NotYetValid(String),

    #[error("the certificate has expired: {0}")]
    Expired(String),

    // ========================================
    // Underlying library / I/O errors
    // ========================================
    #[error("PEM decoding failed: {0}")]
    Pem(#[from] pem::PemError),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Annotates an I/O failure with the path it concerned.
    pub(crate) fn io(context: &str, path: &Path) -> impl FnOnce(std::io::Error) -> Error {
        let context = format!("{} {}", context, path.display());
        move |source| Error::Io { context, source }
    }
}
