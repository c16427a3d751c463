//! Payload compression
//!
//! Stateless codec applied to serialized payloads. Without the `gzip` feature
//! the codec is the identity and entries are never marked compressed.

use crate::errors::CacheError;

/// Compression codec for stored payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compressor {
    /// gzip via flate2, requires the `gzip` feature
    Gzip,
    /// Identity
    Passthrough,
}

impl Default for Compressor {
    fn default() -> Self {
        if cfg!(feature = "gzip") {
            Compressor::Gzip
        } else {
            Compressor::Passthrough
        }
    }
}

impl Compressor {
    /// Whether `compress` actually changes the payload
    pub fn is_available(&self) -> bool {
        match self {
            Compressor::Gzip => cfg!(feature = "gzip"),
            Compressor::Passthrough => false,
        }
    }

    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CacheError> {
        match self {
            Compressor::Gzip => gzip::compress(data),
            Compressor::Passthrough => Ok(data.to_vec()),
        }
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CacheError> {
        match self {
            Compressor::Gzip => gzip::decompress(data),
            Compressor::Passthrough => Ok(data.to_vec()),
        }
    }
}

#[cfg(feature = "gzip")]
mod gzip {
    use crate::errors::CacheError;
    use flate2::Compression;
    use flate2::read::GzDecoder;
    use flate2::write::GzEncoder;
    use std::io::{Read, Write};

    pub(super) fn compress(data: &[u8]) -> Result<Vec<u8>, CacheError> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    pub(super) fn decompress(data: &[u8]) -> Result<Vec<u8>, CacheError> {
        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::with_capacity(data.len() * 2);
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(not(feature = "gzip"))]
mod gzip {
    use crate::errors::CacheError;

    pub(super) fn compress(_data: &[u8]) -> Result<Vec<u8>, CacheError> {
        Err(CacheError::CompressionUnavailable)
    }

    pub(super) fn decompress(_data: &[u8]) -> Result<Vec<u8>, CacheError> {
        Err(CacheError::CompressionUnavailable)
    }
}
