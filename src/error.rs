use thiserror::Error;

#[derive(Error, Debug)]
pub enum EasyError {
    /// Format tag did not match (`ESLZ` frames, `ESAR` archives).
    #[error("bad magic: expected {:?}, found {:?}", String::from_utf8_lossy(.expected), String::from_utf8_lossy(.found))]
    BadMagic { expected: [u8; 4], found: [u8; 4] },

    /// Input ended before a fixed-width field could be read.
    #[error("truncated input: needed {needed} bytes, only {available} available")]
    TruncatedInput { needed: usize, available: usize },

    /// Propagated I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Token stream underflowed, overflowed or referenced bytes before the
    /// start of the output.
    #[error("corrupt frame: {0}")]
    CorruptFrame(String),

    /// Declared and decoded lengths disagree.
    #[error("size mismatch: declared {declared} bytes, decoded {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    /// No codec is registered for this tag.
    #[error("unsupported compression kind {0}")]
    UnsupportedCompressionKind(u16),

    #[error("length bits must be within 1..=7, got {0}")]
    InvalidLengthBits(u8),

    /// Frame headers store the uncompressed length as a `u32`.
    #[error("input of {0} bytes does not fit in a frame header")]
    InputTooLarge(usize),

    #[error("archive is open read-only")]
    ReadOnly,

    #[error("archive has already been finalized")]
    AlreadyFinalized,

    #[error("no entry at index {0}")]
    EntryNotFound(usize),

    /// Entry payload range runs past the end of the backing stream.
    #[error("entry '{name}' lies outside the archive stream")]
    EntryOutOfBounds { name: String },

    #[error("entry name is not valid UTF-8: {0}")]
    InvalidEntryName(#[from] std::string::FromUtf8Error),

    #[error("entry name of {0} bytes is too long")]
    NameTooLong(usize),

    /// Entry name would escape the extraction directory.
    #[error("unsafe entry path '{0}'")]
    UnsafePath(String),

    /// Failure reported by a compression backend.
    #[error("codec error: {0}")]
    Codec(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EasyError>;
