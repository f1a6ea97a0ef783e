use std::cell::OnceCell;

use crate::codec::CompressionKind;

/// A named blob stored in an [`Archive`](crate::Archive).
///
/// Entries parsed from a stream start with their metadata filled in and no
/// payload; the archive fills `payload` the first time it is read and keeps it
/// for the entry's lifetime.
#[derive(Debug)]
pub struct Entry {
    pub(crate) name: String,
    pub(crate) compression_tag: u16,
    pub(crate) offset: u64,
    pub(crate) modified: i64,
    pub(crate) uncompressed_len: u64,
    pub(crate) compressed_len: u64,
    pub(crate) checksum_compressed: u8,
    pub(crate) checksum_uncompressed: u8,
    pub(crate) payload: OnceCell<Vec<u8>>,
}

impl Entry {
    pub(crate) fn new(name: String, compression_tag: u16) -> Self {
        Self {
            name,
            compression_tag,
            offset: 0,
            modified: 0,
            uncompressed_len: 0,
            compressed_len: 0,
            checksum_compressed: 0,
            checksum_uncompressed: 0,
            payload: OnceCell::new(),
        }
    }

    /// Full relative path inside the archive.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last `/`-separated component of the name.
    pub fn file_name(&self) -> &str {
        self.name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.name)
    }

    pub fn compression_tag(&self) -> u16 {
        self.compression_tag
    }

    /// The built-in kind for this entry's tag, if it is one.
    pub fn compression_kind(&self) -> Option<CompressionKind> {
        CompressionKind::from_tag(self.compression_tag).ok()
    }

    /// Payload offset relative to the archive start. Zero until finalized.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Last-modified time in Unix seconds.
    pub fn modified(&self) -> i64 {
        self.modified
    }

    pub fn uncompressed_len(&self) -> u64 {
        self.uncompressed_len
    }

    pub fn compressed_len(&self) -> u64 {
        self.compressed_len
    }

    pub fn checksum_compressed(&self) -> u8 {
        self.checksum_compressed
    }

    pub fn checksum_uncompressed(&self) -> u8 {
        self.checksum_uncompressed
    }

    /// Whether the decompressed payload is already cached.
    pub fn is_loaded(&self) -> bool {
        self.payload.get().is_some()
    }

    /// Replace the entry contents.
    pub fn set_payload(&mut self, data: Vec<u8>) {
        self.uncompressed_len = data.len() as u64;
        self.payload = OnceCell::from(data);
    }

    pub fn set_modified(&mut self, modified: i64) {
        self.modified = modified;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_last_component() {
        let entry = Entry::new("dir/sub/file.txt".into(), 4);
        assert_eq!(entry.file_name(), "file.txt");
        let entry = Entry::new("plain".into(), 4);
        assert_eq!(entry.file_name(), "plain");
    }

    #[test]
    fn set_payload_updates_length() {
        let mut entry = Entry::new("a".into(), 0);
        assert!(!entry.is_loaded());
        entry.set_payload(vec![1, 2, 3]);
        assert!(entry.is_loaded());
        assert_eq!(entry.uncompressed_len(), 3);
        assert_eq!(entry.compression_kind(), Some(CompressionKind::None));
    }
}
