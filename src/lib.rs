//! EasyLZ, a small-window LZ77 codec, and EasyArchive, a container of
//! independently compressed named payloads.
//!
//! The codec trades ratio for speed: one remembered position per 2-byte
//! prefix, a window of at most 128 bytes and one token byte per match. The
//! archive stores each entry through a [`Codec`] chosen by a 16-bit tag.

mod archive;
mod binary_stream;
mod checksum;
mod codec;
mod config;
pub mod endian;
mod entry;
mod error;
pub mod io_utils;
pub mod lz;
mod match_finder;
pub mod rle;
mod stats;

pub use archive::{Archive, OpenMode, Verification, ARCHIVE_MAGIC};
pub use binary_stream::{ReadBinaryExt, WriteBinaryExt};
pub use checksum::pearson;
pub use codec::{Codec, CodecRegistry, CompressionKind, Deflate, EasyLz, Lz4, Rle, Stored};
pub use config::Config;
pub use entry::Entry;
pub use error::{EasyError, Result};
pub use lz::{decode, decode_raw, encode, encode_raw, LengthBits, Token, Tokens};
pub use match_finder::MatchFinder;
pub use stats::EncodeStats;
