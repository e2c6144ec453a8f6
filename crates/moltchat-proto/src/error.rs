//! Error types for the MoltChat protocol library.
//!
//! Only line framing can fail. The line grammar itself is best-effort:
//! anything it does not understand is reported as [`crate::Inbound::Other`]
//! rather than as an error.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Extract the command name from a raw line for error reporting.
///
/// Skips an optional `:source` prefix and returns the first token, without
/// requiring the line to be valid UTF-8.
pub(crate) fn extract_command_hint(raw_line: &[u8]) -> Option<String> {
    let mut pos = 0;

    if raw_line.first() == Some(&b':') {
        while pos < raw_line.len() && raw_line[pos] != b' ' {
            pos += 1;
        }
        while pos < raw_line.len() && raw_line[pos] == b' ' {
            pos += 1;
        }
    }

    let start = pos;
    while pos < raw_line.len() && raw_line[pos].is_ascii_alphanumeric() {
        pos += 1;
    }

    (pos > start).then(|| String::from_utf8_lossy(&raw_line[start..pos]).into_owned())
}

/// Protocol-level errors raised while framing lines.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid UTF-8 bytes in a received line.
    #[error("invalid UTF-8 in line at byte {byte_pos}: {details}")]
    InvalidUtf8 {
        /// The raw line as received.
        raw_line: Vec<u8>,
        /// Byte position where UTF-8 validation failed.
        byte_pos: usize,
        /// Detailed error message from the UTF-8 decoder.
        details: String,
        /// Command name recovered from the raw bytes, if any.
        command_hint: Option<String>,
    },

    /// Line exceeded the maximum allowed length.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Actual line length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// NUL byte in an outgoing line.
    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),
}

impl ProtocolError {
    /// Whether the connection can keep reading after this error.
    ///
    /// A bad line is dropped; I/O failures end the connection.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidUtf8 { .. } | Self::MessageTooLong { .. } | Self::IllegalControlChar(_)
        )
    }
}
