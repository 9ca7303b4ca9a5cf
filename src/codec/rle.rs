// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-02"
// driver = "Isaac Clayton"

//! Run-length coding over variable-length byte tokens.
//!
//! Each call to [`RleEncoder::append`] passes exactly one logical token: a
//! UTF-8 encoded scalar, an opcode byte, or a varint. The encoder buffers
//! just enough lookahead to classify runs:
//!
//! - two equal tokens in a row are held as a *pending pair*;
//! - a third equal token upgrades the pair to a repeat run;
//! - anything else spills into a literal run.
//!
//! Each emitted run is a ULEB128 tag followed by payload. An odd tag is a
//! repeat of `(tag + 5) / 2` copies of the single token that follows; an
//! even tag is `(tag + 2) / 2` literal tokens back to back. The flushed
//! stream is prefixed with its total byte length, so an empty encoder
//! writes exactly `{0x00}`.
//!
//! Token boundaries are not self-describing: the decoder is handed a
//! scanner that knows the column's token shape.

use std::io;
use std::io::Write;

use crate::codec::uleb;
use crate::error::Error;
use crate::error::Result;

/// Streaming run-length encoder.
#[derive(Clone, Debug, Default)]
pub struct RleEncoder {
    /// Finished runs, tag and payload already concatenated.
    runs: Vec<u8>,
    /// The single trailing token, not yet committed to any run.
    last: Vec<u8>,
    /// Length of the open repeat run; 0 when not repeating.
    repeat_count: u32,
    /// Tokens accumulated into the open literal run.
    lit_count: u32,
    lit_run: Vec<u8>,
    /// `last` has been seen twice in a row but not yet classified.
    is_pair: bool,
}

impl RleEncoder {
    pub fn new() -> RleEncoder {
        return RleEncoder::default();
    }

    /// Append one token to the stream.
    pub fn append(&mut self, token: &[u8]) {
        let is_same = self.last.as_slice() == token;

        // already repeating: extend, or close the run and start over
        if self.repeat_count > 0 {
            if is_same {
                self.repeat_count += 1;
                return;
            }
            uleb::encode(self.repeat_count * 2 - 5, &mut self.runs);
            self.runs.extend_from_slice(&self.last);
            self.repeat_count = 0;
            self.set_last(token);
            return;
        }

        // a pending pair either upgrades to a repeat on a third match,
        // or falls into the literal run
        if self.is_pair {
            self.is_pair = false;
            if is_same {
                if self.lit_count > 0 {
                    uleb::encode(self.lit_count * 2 - 2, &mut self.runs);
                    self.runs.append(&mut self.lit_run);
                    self.lit_count = 0;
                }
                self.repeat_count = 3;
                return;
            }
            self.lit_count += 2;
            self.lit_run.extend_from_slice(&self.last);
            self.lit_run.extend_from_slice(&self.last);
            self.set_last(token);
            return;
        }

        if is_same {
            self.is_pair = true;
            return;
        }

        if !self.last.is_empty() {
            self.lit_count += 1;
            self.lit_run.extend_from_slice(&self.last);
        }
        self.set_last(token);
    }

    fn set_last(&mut self, token: &[u8]) {
        self.last.clear();
        self.last.extend_from_slice(token);
    }

    /// Flush every pending run, write the length-prefixed payload, and
    /// reset the encoder for reuse.
    pub fn write_to<W: Write>(&mut self, w: &mut W) -> io::Result<()> {
        if self.repeat_count > 0 {
            uleb::encode(self.repeat_count * 2 - 5, &mut self.runs);
            self.runs.extend_from_slice(&self.last);
        } else {
            if self.is_pair {
                self.lit_count += 2;
                self.lit_run.extend_from_slice(&self.last);
                self.lit_run.extend_from_slice(&self.last);
            } else if !self.last.is_empty() {
                self.lit_count += 1;
                self.lit_run.extend_from_slice(&self.last);
            }
            if self.lit_count > 0 {
                uleb::encode(self.lit_count * 2 - 2, &mut self.runs);
                self.runs.append(&mut self.lit_run);
            }
        }

        let mut header = Vec::with_capacity(uleb::MAX_LEN);
        uleb::encode(self.runs.len() as u32, &mut header);
        w.write_all(&header)?;
        w.write_all(&self.runs)?;
        *self = RleEncoder::default();
        return Ok(());
    }
}

/// Streaming run-length decoder over a borrowed payload (the bytes after
/// the stream's length prefix).
#[derive(Clone, Debug)]
pub struct RleDecoder<'a> {
    buffer: &'a [u8],
    lit_count: u32,
    rep_count: u32,
}

impl<'a> RleDecoder<'a> {
    pub fn new(buffer: &'a [u8]) -> RleDecoder<'a> {
        return RleDecoder { buffer, lit_count: 0, rep_count: 0 };
    }

    /// Yield the next token, or `Ok(None)` once the payload is exhausted.
    ///
    /// `token_len` reports the length of the token at the head of a
    /// buffer, or `None` if no well-formed token starts there. Repeat runs
    /// re-serve the same head token without consuming it; the token's
    /// bytes are skipped once the run count reaches zero so the following
    /// run tag parses from the right place.
    pub fn next<F>(&mut self, token_len: F) -> Result<Option<&'a [u8]>>
    where
        F: Fn(&[u8]) -> Option<usize>,
    {
        if self.lit_count == 0 && self.rep_count == 0 {
            if self.buffer.is_empty() {
                return Ok(None);
            }
            let (tag, rest) = uleb::decode(self.buffer)
                .ok_or(Error::InvalidFrame("malformed run tag"))?;
            self.buffer = rest;
            if tag % 2 == 0 {
                self.lit_count = (tag + 2) / 2;
            } else {
                self.rep_count = (tag + 5) / 2;
            }
        }

        let len = token_len(self.buffer)
            .filter(|&len| len > 0 && len <= self.buffer.len())
            .ok_or(Error::InvalidFrame("malformed run token"))?;
        let token = &self.buffer[..len];
        if self.rep_count > 0 {
            self.rep_count -= 1;
            if self.rep_count == 0 {
                self.buffer = &self.buffer[len..];
            }
        } else {
            self.buffer = &self.buffer[len..];
            self.lit_count -= 1;
        }
        return Ok(Some(token));
    }

    /// True once every run and every buffered byte has been served.
    pub fn is_exhausted(&self) -> bool {
        return self.lit_count == 0 && self.rep_count == 0 && self.buffer.is_empty();
    }
}
