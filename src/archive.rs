//! `ESAR` container: a directory of entry records followed by the payloads.
//!
//! ```text
//! "ESAR" | u64 count | record* | payload*
//! record = u16 tag | u32 name_len | name | u64 offset | i64 mtime
//!        | u64 uncompressed_len | u64 compressed_len | u8 csum_c | u8 csum_u
//! ```
//!
//! All integers are little-endian. Offsets are relative to the stream position
//! the archive was opened at, so an archive can live inside a larger file.

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, trace};

use crate::binary_stream::{ReadBinaryExt, WriteBinaryExt};
use crate::checksum::pearson;
use crate::codec::{CodecRegistry, CompressionKind};
use crate::entry::Entry;
use crate::{EasyError, Result};

pub const ARCHIVE_MAGIC: [u8; 4] = *b"ESAR";

/// Directory entries reserved up front before trusting the stored count.
const MAX_PREALLOCATED_ENTRIES: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Parse the directory; entries cannot change.
    Read,
    /// Start an empty archive at the current stream position.
    Create,
    /// Parse the directory and allow edits before rewriting it.
    Update,
}

/// Outcome of [`Archive::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub compressed_ok: bool,
    pub uncompressed_ok: bool,
}

impl Verification {
    pub fn is_ok(&self) -> bool {
        self.compressed_ok && self.uncompressed_ok
    }
}

pub struct Archive<S> {
    stream: S,
    start_position: u64,
    mode: OpenMode,
    entries: Vec<Entry>,
    registry: CodecRegistry,
    finalized: bool,
}

fn read_record<R: Read>(stream: &mut R) -> Result<Entry> {
    let compression_tag: u16 = stream.read_le()?;
    let name_len: u32 = stream.read_le()?;
    let name = String::from_utf8(stream.read_bytes(u64::from(name_len))?)?;
    let mut entry = Entry::new(name, compression_tag);
    entry.offset = stream.read_le()?;
    entry.modified = stream.read_le()?;
    entry.uncompressed_len = stream.read_le()?;
    entry.compressed_len = stream.read_le()?;
    entry.checksum_compressed = stream.read_u8()?;
    entry.checksum_uncompressed = stream.read_u8()?;
    Ok(entry)
}

fn read_directory<R: Read + Seek>(stream: &mut R, start: u64) -> Result<Vec<Entry>> {
    let found = stream.read_fixed::<4>()?;
    if found != ARCHIVE_MAGIC {
        return Err(EasyError::BadMagic {
            expected: ARCHIVE_MAGIC,
            found,
        });
    }
    let count: u64 = stream.read_le()?;
    let mut entries = Vec::with_capacity(count.min(MAX_PREALLOCATED_ENTRIES) as usize);
    for _ in 0..count {
        entries.push(read_record(stream)?);
    }

    let stream_len = stream.seek(SeekFrom::End(0))?;
    for entry in &entries {
        let end = start
            .checked_add(entry.offset)
            .and_then(|p| p.checked_add(entry.compressed_len));
        if end.map_or(true, |end| end > stream_len) {
            return Err(EasyError::EntryOutOfBounds {
                name: entry.name.clone(),
            });
        }
    }
    debug!(entries = entries.len(), start, stream_len, "read archive directory");
    Ok(entries)
}

fn to_usize(len: u64) -> Result<usize> {
    usize::try_from(len)
        .map_err(|_| EasyError::CorruptFrame(format!("length {len} exceeds the address space")))
}

fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    }
}

fn system_time(seconds: i64) -> Option<SystemTime> {
    let magnitude = Duration::from_secs(seconds.unsigned_abs());
    if seconds >= 0 {
        UNIX_EPOCH.checked_add(magnitude)
    } else {
        UNIX_EPOCH.checked_sub(magnitude)
    }
}

/// Map an entry name onto a path below the extraction root.
fn safe_relative_path(name: &str) -> Result<PathBuf> {
    let unsafe_path = || EasyError::UnsafePath(name.to_string());
    if name.is_empty() || name.starts_with(['/', '\\']) {
        return Err(unsafe_path());
    }
    let mut path = PathBuf::new();
    for part in name.split(['/', '\\']) {
        if part.is_empty() || part == "." {
            continue;
        }
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(c)), None) => path.push(c),
            _ => return Err(unsafe_path()),
        }
    }
    if path.as_os_str().is_empty() {
        return Err(unsafe_path());
    }
    Ok(path)
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> Result<()> {
    for item in fs::read_dir(dir)? {
        let path = item?.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if path.is_file() {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push((name, path));
        }
    }
    Ok(())
}

impl<S: Read + Seek> Archive<S> {
    /// Open with the built-in codecs.
    pub fn open(stream: S, mode: OpenMode) -> Result<Self> {
        Self::open_with_registry(stream, mode, CodecRegistry::default())
    }

    /// Start a new empty archive at the current stream position.
    pub fn create(stream: S) -> Result<Self> {
        Self::open(stream, OpenMode::Create)
    }

    pub fn open_with_registry(
        mut stream: S,
        mode: OpenMode,
        registry: CodecRegistry,
    ) -> Result<Self> {
        let start_position = stream.stream_position()?;
        let entries = match mode {
            OpenMode::Create => Vec::new(),
            OpenMode::Read | OpenMode::Update => read_directory(&mut stream, start_position)?,
        };
        Ok(Self {
            stream,
            start_position,
            mode,
            entries,
            registry,
            finalized: false,
        })
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn start_position(&self) -> u64 {
        self.start_position
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> Result<&Entry> {
        self.entries.get(index).ok_or(EasyError::EntryNotFound(index))
    }

    /// Index of the first entry called `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.mode == OpenMode::Read {
            return Err(EasyError::ReadOnly);
        }
        if self.finalized {
            return Err(EasyError::AlreadyFinalized);
        }
        Ok(())
    }

    pub fn entry_mut(&mut self, index: usize) -> Result<&mut Entry> {
        self.ensure_writable()?;
        self.entries
            .get_mut(index)
            .ok_or(EasyError::EntryNotFound(index))
    }

    /// Append a payload-less entry using a built-in compression kind.
    pub fn create_entry(&mut self, name: &str, kind: CompressionKind) -> Result<&mut Entry> {
        self.create_entry_with_tag(name, kind.tag())
    }

    /// Append a payload-less entry for any registered codec tag.
    pub fn create_entry_with_tag(&mut self, name: &str, tag: u16) -> Result<&mut Entry> {
        self.ensure_writable()?;
        self.registry.get(tag)?;
        if u32::try_from(name.len()).is_err() {
            return Err(EasyError::NameTooLong(name.len()));
        }
        self.entries.push(Entry::new(name.to_string(), tag));
        let index = self.entries.len() - 1;
        Ok(&mut self.entries[index])
    }

    /// Drop an entry so the next `finalize` leaves it out.
    pub fn remove_entry(&mut self, index: usize) -> Result<Entry> {
        self.ensure_writable()?;
        if index >= self.entries.len() {
            return Err(EasyError::EntryNotFound(index));
        }
        Ok(self.entries.remove(index))
    }

    fn read_compressed(&mut self, index: usize) -> Result<Vec<u8>> {
        let entry = self.entry(index)?;
        let (offset, len) = (entry.offset, entry.compressed_len);
        if len == 0 {
            return Ok(Vec::new());
        }
        self.stream
            .seek(SeekFrom::Start(self.start_position + offset))?;
        self.stream.read_bytes(len)
    }

    fn load(&mut self, index: usize) -> Result<Vec<u8>> {
        let entry = self.entry(index)?;
        let (tag, expected) = (entry.compression_tag, entry.uncompressed_len);
        if expected == 0 {
            return Ok(Vec::new());
        }
        // Unknown tags fail before the stream is touched.
        self.registry.get(tag)?;
        let compressed = self.read_compressed(index)?;
        trace!(index, tag, compressed = compressed.len(), expected, "loading payload");
        self.registry
            .get(tag)?
            .decompress(&compressed, to_usize(expected)?)
    }

    /// Decompressed contents of entry `index`, read and cached on first use.
    pub fn read_payload(&mut self, index: usize) -> Result<&[u8]> {
        if !self.entry(index)?.is_loaded() {
            let data = self.load(index)?;
            let _ = self.entries[index].payload.set(data);
        }
        Ok(self.entries[index]
            .payload
            .get()
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Recompute both checksums of entry `index` from the backing stream.
    pub fn verify(&mut self, index: usize) -> Result<Verification> {
        let compressed = self.read_compressed(index)?;
        let entry = self.entry(index)?;
        let (expected_c, expected_u) = (entry.checksum_compressed, entry.checksum_uncompressed);
        let compressed_ok = pearson(&compressed) == expected_c;
        let uncompressed_ok = pearson(self.read_payload(index)?) == expected_u;
        Ok(Verification {
            compressed_ok,
            uncompressed_ok,
        })
    }

    /// Add a file from disk, keeping its modification time.
    pub fn add_file(&mut self, path: &Path, name: &str, kind: CompressionKind) -> Result<usize> {
        let data = fs::read(path)?;
        let modified = fs::metadata(path)?.modified().map(unix_seconds).unwrap_or(0);
        let entry = self.create_entry(name, kind)?;
        entry.set_payload(data);
        entry.set_modified(modified);
        Ok(self.entries.len() - 1)
    }

    /// Add every file below `dir`, named by its `/`-separated relative path.
    pub fn add_dir(&mut self, dir: &Path, kind: CompressionKind) -> Result<usize> {
        let mut files = Vec::new();
        collect_files(dir, dir, &mut files)?;
        files.sort();
        for (name, path) in &files {
            self.add_file(path, name, kind)?;
        }
        debug!(dir = %dir.display(), files = files.len(), "added directory");
        Ok(files.len())
    }

    /// Write every entry below `dir`. Returns the number of files written.
    pub fn extract_all(&mut self, dir: &Path) -> Result<usize> {
        for index in 0..self.entries.len() {
            let relative = safe_relative_path(&self.entries[index].name)?;
            let modified = self.entries[index].modified;
            let target = dir.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let data = self.read_payload(index)?;
            let mut file = fs::File::create(&target)?;
            file.write_all(data)?;
            if let Some(time) = system_time(modified) {
                file.set_modified(time)?;
            }
        }
        Ok(self.entries.len())
    }

    /// Give back the backing stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read + Write + Seek> Archive<S> {
    /// Write the directory and every payload at the start position.
    ///
    /// Offsets are unknown until the payloads before them are written, so the
    /// directory is written with zero offsets that are patched afterwards. A
    /// failure part way leaves the stream in an unspecified state.
    pub fn finalize(&mut self) -> Result<()> {
        self.ensure_writable()?;

        // Updating in place overwrites the old payloads, so read them all first.
        for index in 0..self.entries.len() {
            self.read_payload(index)?;
        }

        let mut packed = Vec::with_capacity(self.entries.len());
        for entry in &mut self.entries {
            if u32::try_from(entry.name.len()).is_err() {
                return Err(EasyError::NameTooLong(entry.name.len()));
            }
            let data = entry.payload.get().map(Vec::as_slice).unwrap_or_default();
            let compressed = self.registry.get(entry.compression_tag)?.compress(data)?;
            entry.uncompressed_len = data.len() as u64;
            entry.compressed_len = compressed.len() as u64;
            entry.checksum_compressed = pearson(&compressed);
            entry.checksum_uncompressed = pearson(data);
            packed.push(compressed);
        }

        self.stream.seek(SeekFrom::Start(self.start_position))?;
        self.stream.write_all(&ARCHIVE_MAGIC)?;
        self.stream.write_le(self.entries.len() as u64)?;
        let mut placeholders = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            self.stream.write_le(entry.compression_tag)?;
            self.stream.write_le(entry.name.len() as u32)?;
            self.stream.write_all(entry.name.as_bytes())?;
            placeholders.push(self.stream.stream_position()?);
            self.stream.write_le(0u64)?;
            self.stream.write_le(entry.modified)?;
            self.stream.write_le(entry.uncompressed_len)?;
            self.stream.write_le(entry.compressed_len)?;
            self.stream
                .write_all(&[entry.checksum_compressed, entry.checksum_uncompressed])?;
        }

        for ((entry, compressed), placeholder) in
            self.entries.iter_mut().zip(&packed).zip(placeholders)
        {
            let position = self.stream.stream_position()?;
            self.stream.write_all(compressed)?;
            let end = self.stream.stream_position()?;
            entry.offset = position - self.start_position;
            self.stream.seek(SeekFrom::Start(placeholder))?;
            self.stream.write_le(entry.offset)?;
            self.stream.seek(SeekFrom::Start(end))?;
        }
        self.stream.flush()?;
        self.finalized = true;

        debug!(
            entries = self.entries.len(),
            payload_bytes = packed.iter().map(Vec::len).sum::<usize>(),
            "finalized archive"
        );
        Ok(())
    }
}
