//! Incremental UTF-8 decoding for response bodies that arrive in arbitrary
//! byte chunks.

use std::error::Error as StdError;
use std::fmt;

/// Invalid UTF-8 seen while decoding in strict mode, or a sequence left
/// unfinished when the stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub bytes: Vec<u8>,
    pub truncated: bool,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.truncated {
            write!(
                f,
                "stream ended inside a UTF-8 sequence ({} pending byte(s))",
                self.bytes.len()
            )
        } else {
            write!(f, "invalid UTF-8 sequence {:02x?}", self.bytes)
        }
    }
}

impl StdError for DecodeError {}

/// Stateful decoder: a multi-byte sequence split across two chunks is held
/// back until the rest of it arrives.
///
/// In lossy mode (the default) invalid sequences become U+FFFD, which is what
/// a browser `TextDecoder` does. Strict mode reports them instead.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
    strict: bool,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self {
            pending: Vec::new(),
            strict: true,
        }
    }

    pub fn with_strict(strict: bool) -> Self {
        if strict {
            Self::strict()
        } else {
            Self::new()
        }
    }

    /// Decodes as much of `chunk` as forms complete characters. An empty
    /// chunk yields an empty string.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String, DecodeError> {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(chunk);

        let mut out = String::with_capacity(input.len());
        let mut rest: &[u8] = &input;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                        Some(len) => {
                            if self.strict {
                                return Err(DecodeError {
                                    bytes: after[..len].to_vec(),
                                    truncated: false,
                                });
                            }
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                    }
                }
            }
        }

        Ok(out)
    }

    /// Flushes whatever is still held back once the stream is done.
    pub fn finish(&mut self) -> Result<String, DecodeError> {
        if self.pending.is_empty() {
            return Ok(String::new());
        }
        let bytes = std::mem::take(&mut self.pending);
        if self.strict {
            return Err(DecodeError {
                bytes,
                truncated: true,
            });
        }
        Ok(char::REPLACEMENT_CHARACTER.to_string())
    }
}
