//! Compression backends selected per archive entry by a 16-bit tag.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::lz::{self, LengthBits};
use crate::{rle, EasyError, Result};

/// Built-in compression kinds and their on-disk tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
#[repr(u16)]
pub enum CompressionKind {
    /// Stored without compression.
    None = 0,
    Deflate = 1,
    Lz4 = 2,
    Rle = 3,
    #[serde(rename = "easylz")]
    #[value(name = "easylz")]
    EasyLz = 4,
}

impl CompressionKind {
    pub const ALL: [CompressionKind; 5] = [
        CompressionKind::None,
        CompressionKind::Deflate,
        CompressionKind::Lz4,
        CompressionKind::Rle,
        CompressionKind::EasyLz,
    ];

    pub fn tag(self) -> u16 {
        self as u16
    }

    pub fn from_tag(tag: u16) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or(EasyError::UnsupportedCompressionKind(tag))
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionKind::None => "none",
            CompressionKind::Deflate => "deflate",
            CompressionKind::Lz4 => "lz4",
            CompressionKind::Rle => "rle",
            CompressionKind::EasyLz => "easylz",
        }
    }
}

impl From<CompressionKind> for u16 {
    fn from(kind: CompressionKind) -> u16 {
        kind.tag()
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionKind {
    type Err = EasyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| EasyError::Config(format!("unknown compression kind '{s}'")))
    }
}

/// `compress(bytes) -> bytes` / `decompress(bytes, known_length) -> bytes`.
pub trait Codec {
    /// Tag stored in entry metadata for payloads produced by this codec.
    fn tag(&self) -> u16;

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Inverse of `compress`. Output must be exactly `expected_len` bytes.
    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>>;
}

fn check_len(out: Vec<u8>, expected_len: usize) -> Result<Vec<u8>> {
    if out.len() != expected_len {
        return Err(EasyError::SizeMismatch {
            declared: expected_len as u64,
            actual: out.len() as u64,
        });
    }
    Ok(out)
}

pub struct Stored;

impl Codec for Stored {
    fn tag(&self) -> u16 {
        CompressionKind::None.tag()
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        check_len(data.to_vec(), expected_len)
    }
}

pub struct Deflate {
    level: u32,
}

impl Deflate {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.clamp(0, 9),
        }
    }
}

impl Default for Deflate {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Codec for Deflate {
    fn tag(&self) -> u16 {
        CompressionKind::Deflate.tag()
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        // One byte past the declared length is enough to report a mismatch.
        let limit = (expected_len as u64).saturating_add(1);
        let mut out = Vec::with_capacity(expected_len.min(data.len().saturating_mul(4)));
        DeflateDecoder::new(data)
            .take(limit)
            .read_to_end(&mut out)
            .map_err(|e| EasyError::Codec(format!("deflate: {e}")))?;
        check_len(out, expected_len)
    }
}

/// LZ4 block format; the block length travels in entry metadata.
pub struct Lz4;

impl Codec for Lz4 {
    fn tag(&self) -> u16 {
        CompressionKind::Lz4.tag()
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(lz4_flex::block::compress(data))
    }

    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        // A block expands at most 255x, reject lengths it could never reach.
        if expected_len > data.len().saturating_mul(255) {
            return Err(EasyError::SizeMismatch {
                declared: expected_len as u64,
                actual: 0,
            });
        }
        let out = lz4_flex::block::decompress(data, expected_len)
            .map_err(|e| EasyError::Codec(format!("lz4: {e}")))?;
        check_len(out, expected_len)
    }
}

pub struct Rle;

impl Codec for Rle {
    fn tag(&self) -> u16 {
        CompressionKind::Rle.tag()
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(rle::encode(data))
    }

    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        check_len(rle::decode_limited(data, expected_len)?, expected_len)
    }
}

/// This crate's LZ codec, stored as a raw frame.
pub struct EasyLz {
    bits: LengthBits,
}

impl EasyLz {
    pub fn new(bits: LengthBits) -> Self {
        Self { bits }
    }
}

impl Default for EasyLz {
    fn default() -> Self {
        Self::new(LengthBits::DEFAULT)
    }
}

impl Codec for EasyLz {
    fn tag(&self) -> u16 {
        CompressionKind::EasyLz.tag()
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(lz::encode_raw(data, self.bits))
    }

    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        lz::decode_raw(data, expected_len)
    }
}

/// Codecs keyed by tag.
pub struct CodecRegistry {
    codecs: Vec<Box<dyn Codec>>,
}

impl CodecRegistry {
    pub fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    /// All built-in backends, parameterised by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::empty();
        registry.register(Box::new(Stored));
        registry.register(Box::new(Deflate::new(config.deflate_level)));
        registry.register(Box::new(Lz4));
        registry.register(Box::new(Rle));
        registry.register(Box::new(EasyLz::new(config.length_bits()?)));
        Ok(registry)
    }

    /// Add `codec`, replacing any codec already registered under its tag.
    pub fn register(&mut self, codec: Box<dyn Codec>) {
        let tag = codec.tag();
        match self.codecs.iter_mut().find(|c| c.tag() == tag) {
            Some(slot) => *slot = codec,
            None => self.codecs.push(codec),
        }
    }

    pub fn get(&self, tag: u16) -> Result<&dyn Codec> {
        self.codecs
            .iter()
            .find(|c| c.tag() == tag)
            .map(|c| c.as_ref())
            .ok_or(EasyError::UnsupportedCompressionKind(tag))
    }

    pub fn tags(&self) -> impl Iterator<Item = u16> + '_ {
        self.codecs.iter().map(|c| c.tag())
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(Stored));
        registry.register(Box::new(Deflate::default()));
        registry.register(Box::new(Lz4));
        registry.register(Box::new(Rle));
        registry.register(Box::new(EasyLz::default()));
        registry
    }
}
