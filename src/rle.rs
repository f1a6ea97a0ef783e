//! Marker-byte run-length coding.
//!
//! The first output byte is the least frequent input byte, used as the run
//! marker. Runs of four or more (and any run of the marker itself) become
//! `marker, count, value`; shorter runs are copied. A lone marker byte is
//! escaped as `marker, marker`, so a count equal to the marker is written as
//! `0xFF` instead.

use crate::{EasyError, Result};

const MAX_RUN: usize = u8::MAX as usize - 1;

/// First byte value with the lowest frequency in `data`. Counts of 256 or
/// more never win, so a buffer where every value is that common uses 0.
fn least_used(data: &[u8]) -> u8 {
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    counts
        .iter()
        .enumerate()
        .filter(|&(_, count)| *count < 256)
        .min_by_key(|&(_, count)| *count)
        .map_or(0, |(value, _)| value as u8)
}

fn put_run(out: &mut Vec<u8>, value: u8, mut length: usize, marker: u8) {
    while length > 0 {
        if length == 1 {
            if value == marker {
                out.push(marker);
            }
            out.push(value);
            length = 0;
        } else if length <= 3 && value != marker {
            out.extend(std::iter::repeat(value).take(length));
            length = 0;
        } else {
            let size = length.min(MAX_RUN) as u8;
            out.push(marker);
            out.push(if size == marker { u8::MAX } else { size });
            out.push(value);
            length -= size as usize;
        }
    }
}

pub fn encode(data: &[u8]) -> Vec<u8> {
    let marker = least_used(data);
    let mut out = Vec::with_capacity(data.len() + 1);
    out.push(marker);

    let mut iter = data.iter().copied();
    let Some(mut value) = iter.next() else {
        return out;
    };
    let mut length = 1usize;
    for b in iter {
        if b == value {
            length += 1;
        } else {
            put_run(&mut out, value, length, marker);
            value = b;
            length = 1;
        }
    }
    put_run(&mut out, value, length, marker);
    out
}

pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    decode_limited(data, usize::MAX)
}

/// Decode, failing as soon as the output would grow past `limit` bytes.
pub fn decode_limited(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let mut input = data.iter().copied();
    let Some(marker) = input.next() else {
        return Ok(Vec::new());
    };
    let truncated = || EasyError::CorruptFrame("run-length stream ends inside a run".into());
    let overflow = || EasyError::CorruptFrame(format!("run-length output exceeds {limit} bytes"));

    let mut out = Vec::with_capacity(data.len().min(limit));
    while let Some(value) = input.next() {
        if out.len() >= limit {
            return Err(overflow());
        }
        if value != marker {
            out.push(value);
            continue;
        }
        let count = input.next().ok_or_else(truncated)?;
        if count == marker {
            out.push(marker);
            continue;
        }
        let value = input.next().ok_or_else(truncated)?;
        let count = if count == u8::MAX { marker } else { count };
        if out.len() + count as usize > limit {
            return Err(overflow());
        }
        out.extend(std::iter::repeat(value).take(count as usize));
    }
    Ok(out)
}
