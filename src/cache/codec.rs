//! Codec Module
//!
//! Reversible compression for serialized payloads. The store only talks to
//! the [`Codec`] trait; [`DeflateCodec`] is the flate2-backed implementation.

use std::fmt::Debug;
use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::{CacheError, Result};

// == Codec Trait ==
/// Lossless byte codec: `decompress(compress(x)) == x` for every `x`.
pub trait Codec: Send + Sync + Debug {
    /// Compresses `input`, or returns `None` if compression failed.
    fn compress(&self, input: &[u8]) -> Option<Vec<u8>>;

    /// Restores bytes previously produced by [`Codec::compress`].
    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>>;
}

// == Deflate Codec ==
/// Raw DEFLATE via flate2.
#[derive(Debug, Clone)]
pub struct DeflateCodec {
    level: Compression,
}

impl DeflateCodec {
    /// Creates a codec with a flate2 level between 0 and 9.
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }

    fn try_compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(input)
            .map_err(|e| CacheError::Compression(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| CacheError::Compression(e.to_string()))
    }
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_COMPRESSION_LEVEL)
    }
}

impl Codec for DeflateCodec {
    fn compress(&self, input: &[u8]) -> Option<Vec<u8>> {
        self.try_compress(input)
            .map_err(|e| tracing::warn!("{}", e))
            .ok()
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = DeflateDecoder::new(input);
        let mut output = Vec::new();
        decoder
            .read_to_end(&mut output)
            .map_err(|e| CacheError::Decompression(e.to_string()))?;
        Ok(output)
    }
}
