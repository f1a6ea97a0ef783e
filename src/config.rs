use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::CompressionKind;
use crate::lz::LengthBits;
use crate::{EasyError, Result};

/// Runtime configuration for the codecs and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bits of each match token spent on the length; the rest address the
    /// window. Must lie in `1..=7`.
    pub length_bits: u8,
    /// Compression used for new archive entries when none is given.
    pub default_compression: CompressionKind,
    /// Deflate level, clamped to `0..=9`.
    pub deflate_level: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            length_bits: LengthBits::DEFAULT.get(),
            default_compression: CompressionKind::EasyLz,
            deflate_level: 6,
        }
    }
}

impl Config {
    /// Load a JSON configuration file. Missing fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| EasyError::Config(format!("{}: {e}", path.as_ref().display())))?;
        config.length_bits()?;
        Ok(config)
    }

    pub fn length_bits(&self) -> Result<LengthBits> {
        LengthBits::new(self.length_bits)
            .map_err(|_| EasyError::Config(format!("length_bits {} outside 1..=7", self.length_bits)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "length_bits": 3 }}"#).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.length_bits, 3);
        assert_eq!(config.default_compression, CompressionKind::EasyLz);
        assert_eq!(config.deflate_level, 6);
    }

    #[test]
    fn rejects_bad_length_bits() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "length_bits": 9, "default_compression": "rle" }}"#).unwrap();
        assert!(matches!(Config::load(file.path()), Err(EasyError::Config(_))));
    }

    #[test]
    fn compression_names() {
        let config: Config =
            serde_json::from_str(r#"{ "default_compression": "easylz" }"#).unwrap();
        assert_eq!(config.default_compression, CompressionKind::EasyLz);
        let config: Config = serde_json::from_str(r#"{ "default_compression": "lz4" }"#).unwrap();
        assert_eq!(config.default_compression, CompressionKind::Lz4);
    }
}
