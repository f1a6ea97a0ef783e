//! EasyLZ: a byte-oriented LZ77 variant with a tiny window.
//!
//! A raw frame is a single `length_bits` byte followed by the token stream:
//!
//! ```text
//! [length_bits] ([control] [token; <=8])*
//! ```
//!
//! Each control byte flags the next eight tokens MSB first, `1` for a literal
//! byte and `0` for a packed back-reference. A back-reference keeps
//! `length - 2` in the high `length_bits` bits and `distance - 1` in the rest.
//!
//! A full frame prefixes the raw frame with `ESLZ` and the uncompressed length
//! as a big-endian `u32`. Archive metadata is little endian; the two
//! conventions are kept as they are for compatibility with existing files.

use serde::{Deserialize, Serialize};

use crate::endian::{self, ByteOrder};
use crate::match_finder::MatchFinder;
use crate::stats::EncodeStats;
use crate::{EasyError, Result};

pub const FRAME_MAGIC: [u8; 4] = *b"ESLZ";
/// Magic plus the big-endian length.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Split between match length and distance inside a packed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct LengthBits(u8);

impl LengthBits {
    pub const DEFAULT: LengthBits = LengthBits(2);

    pub fn new(bits: u8) -> Result<Self> {
        if (1..=7).contains(&bits) {
            Ok(Self(bits))
        } else {
            Err(EasyError::InvalidLengthBits(bits))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn max_offset(self) -> usize {
        1 << (8 - self.0)
    }

    pub fn max_match_len(self) -> usize {
        (1 << self.0) + 1
    }

    fn pack(self, length: usize, distance: usize) -> u8 {
        (((length - 2) << (8 - self.0)) | (distance - 1)) as u8
    }

    fn unpack(self, byte: u8) -> (usize, usize) {
        let length = (byte >> (8 - self.0)) as usize + 2;
        let distance = (byte & (0xFF >> self.0)) as usize + 1;
        (length, distance)
    }
}

impl Default for LengthBits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for LengthBits {
    type Error = EasyError;

    fn try_from(bits: u8) -> Result<Self> {
        Self::new(bits)
    }
}

impl From<LengthBits> for u8 {
    fn from(bits: LengthBits) -> u8 {
        bits.0
    }
}

/// Worst-case size of [`encode`] output for `len` input bytes.
pub fn max_encoded_len(len: usize) -> usize {
    max_raw_encoded_len(len) + FRAME_HEADER_SIZE
}

/// Worst-case size of [`encode_raw`] output for `len` input bytes.
pub fn max_raw_encoded_len(len: usize) -> usize {
    len + len.div_ceil(8) + 1
}

/// One unit of the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Literal(u8),
    Match { length: usize, distance: usize },
}

/// Iterator over the tokens of a raw frame.
///
/// Iteration stops when the payload runs out, so the unused flag bits of a
/// short final group never produce tokens.
pub struct Tokens<'a> {
    payload: &'a [u8],
    pos: usize,
    flags: u8,
    pending_flags: u8,
    bits: LengthBits,
}

impl<'a> Tokens<'a> {
    /// Tokens of a raw frame, including its leading `length_bits` byte.
    pub fn new(raw: &'a [u8]) -> Result<Self> {
        let (&bits, payload) = raw
            .split_first()
            .ok_or_else(|| EasyError::CorruptFrame("missing length bits".into()))?;
        let bits = LengthBits::new(bits)
            .map_err(|_| EasyError::CorruptFrame(format!("invalid length bits {bits}")))?;
        Ok(Self {
            payload,
            pos: 0,
            flags: 0,
            pending_flags: 0,
            bits,
        })
    }

    pub fn length_bits(&self) -> LengthBits {
        self.bits
    }

    /// Bytes of the token stream consumed so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.pending_flags == 0 {
            self.flags = *self.payload.get(self.pos)?;
            self.pos += 1;
            self.pending_flags = 8;
        }
        let byte = *self.payload.get(self.pos)?;
        self.pos += 1;
        let literal = self.flags & 0x80 != 0;
        self.flags <<= 1;
        self.pending_flags -= 1;
        if literal {
            Some(Token::Literal(byte))
        } else {
            let (length, distance) = self.bits.unpack(byte);
            Some(Token::Match { length, distance })
        }
    }
}

/// Writes tokens in groups of eight behind a control byte.
struct TokenWriter {
    out: Vec<u8>,
    control: usize,
    count: u8,
}

impl TokenWriter {
    fn new(bits: LengthBits, capacity: usize) -> Self {
        let mut out = Vec::with_capacity(capacity);
        out.push(bits.get());
        Self {
            out,
            control: 0,
            count: 0,
        }
    }

    fn push(&mut self, literal: bool, byte: u8) {
        if self.count == 0 {
            self.control = self.out.len();
            self.out.push(0);
        }
        if literal {
            self.out[self.control] |= 0x80 >> self.count;
        }
        self.out.push(byte);
        self.count = (self.count + 1) % 8;
    }

    fn finish(self) -> Vec<u8> {
        self.out
    }
}

/// Result of a dictionary search. A length below 2 means "emit a literal".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Found {
    length: usize,
    distance: usize,
}

impl Found {
    const LITERAL: Found = Found {
        length: 1,
        distance: 0,
    };
}

/// Search result carried over from the one-byte lookahead.
#[derive(Debug, Clone, Copy)]
enum Lookahead {
    Idle,
    Pending(Found),
}

struct Encoder<'a> {
    src: &'a [u8],
    finder: MatchFinder,
    max_offset: usize,
    max_len: usize,
}

impl<'a> Encoder<'a> {
    fn new(src: &'a [u8], bits: LengthBits) -> Self {
        Self {
            src,
            finder: MatchFinder::new(bits.max_offset()),
            max_offset: bits.max_offset(),
            max_len: bits.max_match_len(),
        }
    }

    /// Longest earlier occurrence of the bytes at `pos`.
    fn search(&mut self, pos: usize) -> Found {
        self.finder.advance();
        let src = self.src;
        let mut best = Found::LITERAL;
        if pos + 2 >= src.len() {
            return best;
        }
        let mut candidate = self.finder.lookup(src, pos);
        while let Some(idx) = candidate {
            let distance = match pos.checked_sub(idx) {
                Some(d) if d > 0 && d < self.max_offset => d,
                _ => break,
            };
            match (src.get(pos + best.length), src.get(idx + best.length)) {
                (Some(a), Some(b)) if a == b => {}
                _ => break,
            }
            let length = src[pos..]
                .iter()
                .zip(&src[idx..])
                .take(self.max_len)
                .take_while(|(a, b)| a == b)
                .count();
            if length > best.length {
                best = Found { length, distance };
            }
            candidate = if length < self.max_len {
                self.finder.lookup(src, pos)
            } else {
                None
            };
        }
        best
    }

    fn record_span(&mut self, start: usize, count: usize) {
        let end = (start + count).min(self.src.len().saturating_sub(1));
        for idx in start..end {
            self.finder.record(self.src, idx);
        }
    }

    /// Pick the token at `pos`, probing `pos + 1` for a strictly better match.
    fn choose(
        &mut self,
        pos: usize,
        lookahead: Lookahead,
        stats: &mut EncodeStats,
    ) -> (Found, Lookahead) {
        let mut found = match lookahead {
            Lookahead::Pending(found) => found,
            Lookahead::Idle => self.search(pos),
        };
        self.record_span(pos, 1);

        let mut next = Lookahead::Idle;
        if found.length >= 2 && found.length < self.max_len {
            let preview = self.search(pos + 1);
            if preview.length > found.length + 1 {
                stats.log_deferral();
                next = Lookahead::Pending(preview);
                found = Found::LITERAL;
            }
        }

        self.record_span(pos + 1, found.length - 1);
        (found, next)
    }
}

/// Encode `src` into a raw frame (no magic, no length).
pub fn encode_raw(src: &[u8], bits: LengthBits) -> Vec<u8> {
    encode_raw_with_stats(src, bits).0
}

pub fn encode_raw_with_stats(src: &[u8], bits: LengthBits) -> (Vec<u8>, EncodeStats) {
    let mut stats = EncodeStats::new(src.len());
    let mut writer = TokenWriter::new(bits, max_raw_encoded_len(src.len()));
    let mut encoder = Encoder::new(src, bits);
    let mut lookahead = Lookahead::Idle;
    let mut pos = 0;

    while pos < src.len() {
        let (found, next) = encoder.choose(pos, lookahead, &mut stats);
        lookahead = next;
        if found.length <= 1 {
            writer.push(true, src[pos]);
            stats.tick_literal();
            pos += 1;
        } else {
            debug_assert!(found.distance > 0, "match with zero distance");
            writer.push(false, bits.pack(found.length, found.distance));
            stats.log_match(found.length);
            pos += found.length;
        }
    }

    stats.report();
    (writer.finish(), stats)
}

/// Encode `src` into a full `ESLZ` frame.
pub fn encode(src: &[u8], bits: LengthBits) -> Result<Vec<u8>> {
    encode_with_stats(src, bits).map(|(frame, _)| frame)
}

pub fn encode_with_stats(src: &[u8], bits: LengthBits) -> Result<(Vec<u8>, EncodeStats)> {
    let declared = u32::try_from(src.len()).map_err(|_| EasyError::InputTooLarge(src.len()))?;
    let (raw, stats) = encode_raw_with_stats(src, bits);
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + raw.len());
    frame.extend_from_slice(&FRAME_MAGIC);
    endian::write(&mut frame, declared, ByteOrder::BigEndian);
    frame.extend_from_slice(&raw);
    Ok((frame, stats))
}

/// Expand tokens until at least `expected` bytes are produced.
///
/// The final match may run past `expected`; callers decide how to report it.
fn expand(raw: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut tokens = Tokens::new(raw)?;
    let bound = raw.len().saturating_mul(tokens.length_bits().max_match_len());
    let mut out = Vec::with_capacity(expected.min(bound));
    while out.len() < expected {
        match tokens.next() {
            None => {
                return Err(EasyError::CorruptFrame(format!(
                    "token stream ended after {} of {} bytes",
                    out.len(),
                    expected
                )))
            }
            Some(Token::Literal(byte)) => out.push(byte),
            Some(Token::Match { length, distance }) => {
                if distance > out.len() {
                    return Err(EasyError::CorruptFrame(format!(
                        "back-reference {} bytes behind position {}",
                        distance,
                        out.len()
                    )));
                }
                // Source and destination overlap when distance < length.
                let start = out.len() - distance;
                for i in start..start + length {
                    let byte = out[i];
                    out.push(byte);
                }
            }
        }
    }
    Ok(out)
}

/// Decode a raw frame whose uncompressed length is known from elsewhere.
pub fn decode_raw(raw: &[u8], expected: usize) -> Result<Vec<u8>> {
    let out = expand(raw, expected)?;
    if out.len() != expected {
        return Err(EasyError::CorruptFrame(format!(
            "token stream overruns {} expected bytes by {}",
            expected,
            out.len() - expected
        )));
    }
    Ok(out)
}

/// Decode a full `ESLZ` frame.
pub fn decode(frame: &[u8]) -> Result<Vec<u8>> {
    let magic: [u8; 4] = frame
        .get(..4)
        .and_then(|m| m.try_into().ok())
        .ok_or(EasyError::TruncatedInput {
            needed: FRAME_MAGIC.len(),
            available: frame.len(),
        })?;
    if magic != FRAME_MAGIC {
        return Err(EasyError::BadMagic {
            expected: FRAME_MAGIC,
            found: magic,
        });
    }
    let declared: u32 = endian::read(&frame[4..], ByteOrder::BigEndian)?;
    let out = expand(&frame[FRAME_HEADER_SIZE..], declared as usize)?;
    if out.len() != declared as usize {
        return Err(EasyError::SizeMismatch {
            declared: declared as u64,
            actual: out.len() as u64,
        });
    }
    Ok(out)
}
