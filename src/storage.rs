//! On-disk PKI material.
//!
//! Everything for an entity `name` lives side by side in one directory:
//!
//! | File          | Contents                          | Mode   |
//! |---------------|-----------------------------------|--------|
//! | `<name>.crt`  | certificate, or leaf + chain      | `0644` |
//! | `<name>.key`  | private key (PKCS#1 / SEC1 PEM)   | `0600` |
//! | `<name>.pub`  | public key (PKIX PEM)             | `0600` |
//! | `<name>.csr`  | certificate signing request       | `0600` |
//!
//! Missing parent directories are created. Writes are not atomic and a pair
//! write (`write_cert_and_key`) is not rolled back if its second half fails.

use std::fs;
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use openssl::pkey::{HasPublic, Id, PKey, PKeyRef, Private, Public};
use openssl::rsa::Rsa;
use openssl::x509::{X509Ref, X509Req, X509ReqRef, X509};
use tracing::debug;

use crate::error::{Error, Result};
use crate::keys::{
    encode_public_key_pem, marshal_private_key_to_pem, parse_pem_blocks, parse_private_key_pem,
    parse_public_keys_pem, CERTIFICATE_BLOCK_TYPE, CERTIFICATE_REQUEST_BLOCK_TYPE,
};

pub(crate) const CERT_FILE_MODE: u32 = 0o644;
pub(crate) const KEY_FILE_MODE: u32 = 0o600;
const CSR_DIR_MODE: u32 = 0o700;

fn path_for_cert(pki_path: &Path, name: &str) -> PathBuf {
    pki_path.join(format!("{name}.crt"))
}

fn path_for_key(pki_path: &Path, name: &str) -> PathBuf {
    pki_path.join(format!("{name}.key"))
}

fn path_for_public_key(pki_path: &Path, name: &str) -> PathBuf {
    pki_path.join(format!("{name}.pub"))
}

fn path_for_csr(pki_path: &Path, name: &str) -> PathBuf {
    pki_path.join(format!("{name}.csr"))
}

/// `(<dir>/<name>.crt, <dir>/<name>.key)`
pub fn paths_for_cert_and_key(pki_path: &Path, name: &str) -> (PathBuf, PathBuf) {
    (path_for_cert(pki_path, name), path_for_key(pki_path, name))
}

pub(crate) fn create_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(Error::io("failed to make directory", dir))?;
    }
    Ok(())
}

/// Open `path` for writing with `mode` applied before any byte lands in it.
///
/// New files are created with `mode` (subject to umask); an existing file is
/// truncated and has its mode reset first.
fn open_with_mode(path: &Path, mode: u32) -> Result<fs::File> {
    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)
        .map_err(Error::io("unable to open", path))?;
    file.set_permissions(fs::Permissions::from_mode(mode))
        .map_err(Error::io("unable to set permissions on", path))?;
    Ok(file)
}

pub(crate) fn write_with_mode(path: &Path, data: &[u8], mode: u32) -> Result<()> {
    let mut file = open_with_mode(path, mode)?;
    file.write_all(data).map_err(Error::io("unable to write", path))?;
    debug!(path = %path.display(), mode = %format!("{mode:o}"), "wrote PKI file");
    Ok(())
}

fn write_cert_file(path: &Path, data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Err(Error::NilCertificate);
    }
    create_parent(path)?;
    write_with_mode(path, data, CERT_FILE_MODE)
}

fn write_key_file(path: &Path, data: &[u8], what: &'static str) -> Result<()> {
    if data.is_empty() {
        return Err(Error::NilKey(what));
    }
    create_parent(path)?;
    write_with_mode(path, data, KEY_FILE_MODE)
}

/// Write `key` first, then `cert`. A failed cert write leaves the key behind.
pub fn write_cert_and_key(
    pki_path: &Path,
    name: &str,
    cert: &X509Ref,
    key: &PKeyRef<Private>,
) -> Result<()> {
    write_key(pki_path, name, key)?;
    write_cert(pki_path, name, cert)
}

pub fn write_cert(pki_path: &Path, name: &str, cert: &X509Ref) -> Result<()> {
    write_cert_file(&path_for_cert(pki_path, name), &encode_cert_pem(cert)?)
}

/// Write a leaf followed by its chain into `<name>.crt`.
///
/// # Errors
/// [`Error::NilCertificate`] for an empty bundle.
pub fn write_cert_bundle(pki_path: &Path, name: &str, certs: &[X509]) -> Result<()> {
    if certs.is_empty() {
        return Err(Error::NilCertificate);
    }
    write_cert_file(&path_for_cert(pki_path, name), &encode_cert_bundle_pem(certs)?)
}

pub fn write_key(pki_path: &Path, name: &str, key: &PKeyRef<Private>) -> Result<()> {
    let encoded = marshal_private_key_to_pem(key)?;
    write_key_file(&path_for_key(pki_path, name), &encoded, "private key")
}

/// Write `<name>.csr` with mode `0600`; a missing directory is created `0700`.
pub fn write_csr(csr_dir: &Path, name: &str, csr: &X509ReqRef) -> Result<()> {
    let encoded = encode_csr_pem(csr)?;
    if encoded.is_empty() {
        return Err(Error::NilKey("certificate request"));
    }
    let csr_path = path_for_csr(csr_dir, name);
    if let Some(dir) = csr_path.parent() {
        fs::DirBuilder::new()
            .recursive(true)
            .mode(CSR_DIR_MODE)
            .create(dir)
            .map_err(Error::io("failed to make directory", dir))?;
    }
    write_with_mode(&csr_path, &encoded, KEY_FILE_MODE)
}

pub fn write_public_key<T: HasPublic>(pki_path: &Path, name: &str, key: &PKeyRef<T>) -> Result<()> {
    let encoded = encode_public_key_pem(key)?;
    write_key_file(&path_for_public_key(pki_path, name), &encoded, "public key")
}

/// Whether either `<name>.crt` or `<name>.key` is present.
pub fn cert_or_key_exist(pki_path: &Path, name: &str) -> bool {
    let (cert_path, key_path) = paths_for_cert_and_key(pki_path, name);
    cert_path.exists() || key_path.exists()
}

/// Whether either `<name>.csr` or `<name>.key` is present.
pub fn csr_or_key_exist(csr_dir: &Path, name: &str) -> bool {
    path_for_csr(csr_dir, name).exists() || path_for_key(csr_dir, name).exists()
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(Error::io("unable to read", path))
}

pub fn certs_from_file(path: &Path) -> Result<Vec<X509>> {
    parse_certs_pem(&read_file(path)?)
}

pub fn private_key_from_file(path: &Path) -> Result<PKey<Private>> {
    parse_private_key_pem(&read_file(path)?)
}

pub fn public_keys_from_file(path: &Path) -> Result<Vec<PKey<Public>>> {
    parse_public_keys_pem(&read_file(path)?)
}

pub fn certificate_request_from_file(path: &Path) -> Result<X509Req> {
    parse_csr_pem(&read_file(path)?)
}

pub fn try_load_cert_from_disk(pki_path: &Path, name: &str) -> Result<X509> {
    let mut certs = certs_from_file(&path_for_cert(pki_path, name))?;
    // parse_certs_pem never returns an empty list
    Ok(certs.swap_remove(0))
}

/// Load `<name>.crt` as `(leaf, intermediates)`, intermediates in file order.
pub fn try_load_cert_chain_from_disk(pki_path: &Path, name: &str) -> Result<(X509, Vec<X509>)> {
    let mut certs = certs_from_file(&path_for_cert(pki_path, name))?;
    let intermediates = certs.split_off(1);
    let leaf = certs.remove(0);
    Ok((leaf, intermediates))
}

pub fn try_load_key_from_disk(pki_path: &Path, name: &str) -> Result<PKey<Private>> {
    private_key_from_file(&path_for_key(pki_path, name))
}

pub fn try_load_cert_and_key_from_disk(
    pki_path: &Path,
    name: &str,
) -> Result<(X509, PKey<Private>)> {
    let cert = try_load_cert_from_disk(pki_path, name)?;
    let key = try_load_key_from_disk(pki_path, name)?;
    Ok((cert, key))
}

pub fn try_load_csr_from_disk(pki_path: &Path, name: &str) -> Result<X509Req> {
    certificate_request_from_file(&path_for_csr(pki_path, name))
}

pub fn try_load_csr_and_key_from_disk(
    pki_path: &Path,
    name: &str,
) -> Result<(X509Req, PKey<Private>)> {
    let csr = try_load_csr_from_disk(pki_path, name)?;
    let key = try_load_key_from_disk(pki_path, name)?;
    Ok((csr, key))
}

/// Load `<name>.key` and `<name>.pub`, both of which must be RSA.
pub fn try_load_private_public_key_from_disk(
    pki_path: &Path,
    name: &str,
) -> Result<(Rsa<Private>, Rsa<Public>)> {
    let private = try_load_key_from_disk(pki_path, name)?;
    let public = public_keys_from_file(&path_for_public_key(pki_path, name))?.swap_remove(0);
    if private.id() != Id::RSA || public.id() != Id::RSA {
        return Err(Error::NotRsaKey);
    }
    Ok((private.rsa()?, public.rsa()?))
}

/// Every `CERTIFICATE` block in `data`; other block types are skipped.
pub fn parse_certs_pem(data: &[u8]) -> Result<Vec<X509>> {
    let certs = parse_pem_blocks(data)
        .iter()
        .filter(|block| block.tag() == CERTIFICATE_BLOCK_TYPE)
        .map(|block| X509::from_der(block.contents()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(Error::NoValidCertFound);
    }
    Ok(certs)
}

/// The first `CERTIFICATE REQUEST` block in `data`.
pub fn parse_csr_pem(data: &[u8]) -> Result<X509Req> {
    let block = parse_pem_blocks(data)
        .into_iter()
        .find(|block| block.tag() == CERTIFICATE_REQUEST_BLOCK_TYPE)
        .ok_or(Error::NoValidCsrFound)?;
    X509Req::from_der(block.contents()).map_err(|_| Error::NoValidCsrFound)
}

pub fn encode_cert_pem(cert: &X509Ref) -> Result<Vec<u8>> {
    Ok(cert.to_pem()?)
}

/// Concatenated `CERTIFICATE` blocks, in slice order.
pub fn encode_cert_bundle_pem(certs: &[X509]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for cert in certs {
        buf.extend(cert.to_pem()?);
    }
    Ok(buf)
}

pub fn encode_csr_pem(csr: &X509ReqRef) -> Result<Vec<u8>> {
    Ok(csr.to_pem()?)
}
