//! `EncodeStats` tracks token counts for one encoder run without any
//! persistence. The CLI reports it after `compress`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EncodeStats {
    pub input_bytes: u64,
    pub literals: u64,
    pub matches: u64,
    /// Matches abandoned because a longer one started one byte later.
    pub deferred: u64,
    /// Input bytes covered by match tokens.
    pub matched_bytes: u64,
}

impl EncodeStats {
    pub fn new(input_bytes: usize) -> Self {
        Self {
            input_bytes: input_bytes as u64,
            ..Self::default()
        }
    }

    pub fn tick_literal(&mut self) {
        self.literals += 1;
    }

    pub fn log_match(&mut self, length: usize) {
        self.matches += 1;
        self.matched_bytes += length as u64;
    }

    pub fn log_deferral(&mut self) {
        self.deferred += 1;
    }

    pub fn tokens(&self) -> u64 {
        self.literals + self.matches
    }

    pub fn report(&self) {
        tracing::debug!(
            input = self.input_bytes,
            literals = self.literals,
            matches = self.matches,
            deferred = self.deferred,
            matched_bytes = self.matched_bytes,
            "encode finished"
        );
    }
}
