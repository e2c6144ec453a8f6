//! CRLF line codec for tokio.
//!
//! Frames the byte stream into protocol lines. Decoded lines have their
//! terminator stripped; encoded lines always get exactly one `\r\n`.
//!
//! A received line that is too long or not valid UTF-8 is dropped and the
//! codec moves on to the next line, so one bad line from the server never
//! tears down the connection. Only I/O errors end the stream.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};

/// Maximum line length in bytes, terminator included (modern IRC convention).
pub const MAX_LINE_LEN: usize = 8191;

/// Line-based codec for the chat protocol.
#[derive(Debug)]
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length
    max_len: usize,
    /// Set while skipping the remainder of an oversized line
    discarding: bool,
    /// Lines dropped because they were oversized or not UTF-8
    dropped: u64,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCodec {
    /// Create a codec with the default [`MAX_LINE_LEN`].
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_LEN)
    }

    /// Create a codec with a custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
            dropped: 0,
        }
    }

    /// Number of received lines dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Validate and decode one raw line (terminator included or not).
    ///
    /// Strips a trailing `\n` and an optional `\r` before it.
    pub fn decode_line(raw: &[u8], max_len: usize) -> error::Result<String> {
        if raw.len() > max_len {
            return Err(ProtocolError::MessageTooLong {
                actual: raw.len(),
                limit: max_len,
            });
        }

        let mut end = raw.len();
        if end > 0 && raw[end - 1] == b'\n' {
            end -= 1;
        }
        if end > 0 && raw[end - 1] == b'\r' {
            end -= 1;
        }

        String::from_utf8(raw[..end].to_vec()).map_err(|e| ProtocolError::InvalidUtf8 {
            raw_line: raw.to_vec(),
            byte_pos: e.utf8_error().valid_up_to(),
            details: e.utf8_error().to_string(),
            command_hint: error::extract_command_hint(raw),
        })
    }

    /// Sanitize an outgoing line.
    ///
    /// - Truncates at the first line break, so one command is one line
    /// - Rejects NUL
    pub fn sanitize(mut data: String) -> error::Result<String> {
        if let Some(pos) = data.find(['\r', '\n']) {
            data.truncate(pos);
        }

        if data.contains('\0') {
            return Err(ProtocolError::IllegalControlChar('\0'));
        }

        Ok(data)
    }

    fn drop_line(&mut self, err: &ProtocolError) {
        self.dropped += 1;
        tracing::warn!(error = %err, dropped = self.dropped, "dropping unreadable line");
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                if self.discarding {
                    src.clear();
                    self.next_index = 0;
                } else if src.len() > self.max_len {
                    let err = ProtocolError::MessageTooLong {
                        actual: src.len(),
                        limit: self.max_len,
                    };
                    self.drop_line(&err);
                    src.clear();
                    self.next_index = 0;
                    self.discarding = true;
                } else {
                    self.next_index = src.len();
                }
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if self.discarding {
                self.discarding = false;
                continue;
            }

            match Self::decode_line(&line, self.max_len) {
                Ok(data) => return Ok(Some(data)),
                Err(err) => self.drop_line(&err),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None => {
                // Unterminated trailing data at EOF is discarded.
                src.clear();
                self.next_index = 0;
                Ok(None)
            }
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> error::Result<()> {
        let line = Self::sanitize(msg)?;
        dst.reserve(line.len() + 2);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}
