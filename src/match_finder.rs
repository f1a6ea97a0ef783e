//! Recency table used by the LZ encoder to find earlier occurrences of a
//! two-byte prefix.
//!
//! Every bucket remembers only the most recent position recorded for its
//! prefix. Older occurrences are overwritten, which keeps memory and lookup
//! cost constant and makes the encoder output deterministic.

/// One bucket per possible two-byte prefix.
pub const TABLE_SIZE: usize = 1 << 16;

#[derive(Debug, Clone, Copy)]
struct Slot {
    position: usize,
    generation: u64,
}

/// State of the lookup cursor for the current generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// No lookup since the last `advance`.
    Fresh,
    /// The single remembered position has already been handed out.
    Exhausted,
}

pub struct MatchFinder {
    slots: Box<[Option<Slot>]>,
    generation: u64,
    max_generation_offset: u64,
    cursor: Cursor,
}

impl MatchFinder {
    /// Create an empty table whose lookups ignore slots older than
    /// `max_generation_offset` generations.
    pub fn new(max_generation_offset: usize) -> Self {
        Self {
            slots: vec![None; TABLE_SIZE].into_boxed_slice(),
            generation: 0,
            max_generation_offset: max_generation_offset as u64,
            cursor: Cursor::Fresh,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Step to the next generation and reset the lookup cursor.
    pub fn advance(&mut self) {
        self.generation += 1;
        self.cursor = Cursor::Fresh;
    }

    /// Remember `position` as the latest occurrence of its prefix.
    ///
    /// Positions without a following byte have no prefix and are skipped.
    pub fn record(&mut self, buffer: &[u8], position: usize) {
        if let Some(bucket) = prefix(buffer, position) {
            self.slots[bucket] = Some(Slot {
                position,
                generation: self.generation,
            });
        }
    }

    /// Latest recorded position sharing the prefix at `position`.
    ///
    /// The first call after [`advance`](Self::advance) consults the table; any
    /// further call in the same generation continues from the cached cursor,
    /// and since buckets hold a single position that continuation is empty.
    pub fn lookup(&mut self, buffer: &[u8], position: usize) -> Option<usize> {
        if self.cursor == Cursor::Exhausted {
            return None;
        }
        let bucket = prefix(buffer, position)?;
        let slot = self.slots[bucket]?;
        self.cursor = Cursor::Exhausted;
        if self.generation - slot.generation > self.max_generation_offset {
            return None;
        }
        Some(slot.position)
    }
}

/// The raw little-endian value of the two bytes at `position`.
fn prefix(buffer: &[u8], position: usize) -> Option<usize> {
    let pair = buffer.get(position..position.checked_add(2)?)?;
    Some(u16::from_le_bytes([pair[0], pair[1]]) as usize)
}
