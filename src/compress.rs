//! Gzip and snappy helpers.
//!
//! The `*_bytes` functions work on raw buffers; the string variants carry the
//! compressed bytes as standard (padded) base64 text.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

const GZIP: &str = "gzip";
const SNAPPY: &str = "snappy";

pub fn gzip_compress_bytes(text: &[u8]) -> Result<Vec<u8>> {
    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(text).map_err(|e| Error::Compress {
        codec: GZIP,
        reason: e.to_string(),
    })?;
    gz.finish().map_err(|e| Error::Compress {
        codec: GZIP,
        reason: e.to_string(),
    })
}

pub fn gzip_decompress_bytes(ctext: &[u8]) -> Result<Vec<u8>> {
    let mut text = Vec::new();
    GzDecoder::new(ctext)
        .read_to_end(&mut text)
        .map_err(|e| Error::Decompress {
            codec: GZIP,
            reason: e.to_string(),
        })?;
    Ok(text)
}

/// Gzip `text` and return the result as standard base64.
pub fn gzip_compress(text: &str) -> Result<String> {
    Ok(STANDARD.encode(gzip_compress_bytes(text.as_bytes())?))
}

pub fn gzip_decompress(ctext: &str) -> Result<String> {
    let bytes = STANDARD.decode(ctext)?;
    Ok(String::from_utf8(gzip_decompress_bytes(&bytes)?)?)
}

/// Snappy block format (no framing).
pub fn snappy_compress_bytes(text: &[u8]) -> Result<Vec<u8>> {
    snap::raw::Encoder::new()
        .compress_vec(text)
        .map_err(|e| Error::Compress {
            codec: SNAPPY,
            reason: e.to_string(),
        })
}

pub fn snappy_decompress_bytes(ctext: &[u8]) -> Result<Vec<u8>> {
    snap::raw::Decoder::new()
        .decompress_vec(ctext)
        .map_err(|e| Error::Decompress {
            codec: SNAPPY,
            reason: e.to_string(),
        })
}

pub fn snappy_compress(text: &str) -> Result<String> {
    Ok(STANDARD.encode(snappy_compress_bytes(text.as_bytes())?))
}

pub fn snappy_decompress(ctext: &str) -> Result<String> {
    let bytes = STANDARD.decode(ctext)?;
    Ok(String::from_utf8(snappy_decompress_bytes(&bytes)?)?)
}
