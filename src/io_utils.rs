//! Error reporting helpers for the `easy` command line tool.
use std::fmt;
use std::io;
use std::path::Path;

use crate::EasyError;

/// Extension expected for full LZ frames.
pub const FRAME_EXTENSION: &str = "eslz";
/// Extension expected for archives.
pub const ARCHIVE_EXTENSION: &str = "esar";

#[derive(Debug)]
pub struct CliError {
    pub msg: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.msg.fmt(f)
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Format a user friendly I/O error message with suggestions.
pub fn format_io_error(operation: &str, path: &Path, err: &io::Error) -> String {
    use io::ErrorKind::*;
    let suggestion = match err.kind() {
        NotFound => "Check that the file exists and the path is correct.",
        PermissionDenied => "Check permissions or run as a different user.",
        UnexpectedEof => "File appears truncated or corrupted.",
        WriteZero => "Disk may be full. Free up space and try again.",
        AlreadyExists => "Remove the existing file or pick another name.",
        _ => "Check permissions or free up disk space.",
    };
    format!("Error {} '{}': {}. {}", operation, path.display(), err, suggestion)
}

/// Convert an I/O error into a CLI error with context.
pub fn io_cli_error(operation: &str, path: &Path, err: io::Error) -> CliError {
    CliError {
        msg: format_io_error(operation, path, &err),
        source: Some(Box::new(err)),
    }
}

/// Simple CLI error from string.
pub fn simple_cli_error(msg: &str) -> CliError {
    CliError {
        msg: msg.to_string(),
        source: None,
    }
}

/// Fail unless `path` ends in `.{expected}`.
pub fn check_extension(path: &Path, expected: &str) -> Result<(), CliError> {
    let matches = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(expected));
    if matches {
        Ok(())
    } else {
        Err(extension_error(path, expected))
    }
}

/// Invalid file extension error.
pub fn extension_error(path: &Path, expected: &str) -> CliError {
    CliError {
        msg: format!(
            "Invalid file extension for '{}'. Expected .{}. Check the input file.",
            path.display(),
            expected
        ),
        source: None,
    }
}

/// Convert a library error into a CLI error with a hint.
pub fn easy_cli_error(context: &str, err: EasyError) -> CliError {
    CliError {
        msg: format!("{}: {}", context, cli_hint(&err)),
        source: Some(Box::new(err)),
    }
}

/// Return an actionable hint for each error variant.
pub fn cli_hint(err: &EasyError) -> String {
    use EasyError::*;
    match err {
        BadMagic { .. } => format!("{err}. The file is not in the expected format."),
        TruncatedInput { .. } => format!("{err}. File appears truncated."),
        Io(io) => format!("{io}"),
        CorruptFrame(_) | SizeMismatch { .. } => {
            format!("{err}. Likely stream malformed, try recompressing.")
        }
        UnsupportedCompressionKind(tag) => {
            format!("Compression tag {tag} is not supported by this build.")
        }
        InvalidLengthBits(_) | InputTooLarge(_) | NameTooLong(_) => err.to_string(),
        ReadOnly | AlreadyFinalized | EntryNotFound(_) => format!("{err}. This is a bug."),
        EntryOutOfBounds { .. } | InvalidEntryName(_) => {
            format!("{err}. Verify the archive is intact.")
        }
        UnsafePath(_) => format!("{err}. Refusing to write outside the target directory."),
        Codec(_) => format!("{err}. Payload could not be decoded."),
        Config(msg) => format!("{msg}. Invalid configuration."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_ignores_case() {
        assert!(check_extension(Path::new("a/b.ESAR"), ARCHIVE_EXTENSION).is_ok());
        let err = check_extension(Path::new("a/b.tar"), ARCHIVE_EXTENSION).unwrap_err();
        assert!(err.msg.contains("Expected .esar"));
    }

    #[test]
    fn not_found_suggests_checking_path() {
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let msg = format_io_error("reading", Path::new("x.eslz"), &err);
        assert!(msg.contains("Check that the file exists"));
    }

    #[test]
    fn hints_name_the_problem() {
        let hint = cli_hint(&EasyError::UnsupportedCompressionKind(9));
        assert!(hint.contains("tag 9"));
    }
}
