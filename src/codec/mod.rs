// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-02"
// driver = "Isaac Clayton"

//! Binary codecs for the serialized edit history.
//!
//! The on-disk document is a sequence of length-prefixed frames, and each
//! history frame is a run-length-coded column of tokens. The layers stack
//! bottom-up:
//!
//! - `uleb`: variable-length 32-bit integers (lengths, tags, offsets)
//! - `delta`: stateful zigzag deltas for version sequences
//! - `rle`: run-length coding over variable-length tokens
//! - `column`: the backing and ID columns built from the above

pub mod column;
pub mod delta;
pub mod rle;
pub mod uleb;

use std::io;
use std::io::Write;

/// Split a `uleb(len) ++ payload` frame off the front of `buf`.
/// Returns the payload and the remaining bytes.
pub fn read_frame(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    let (len, rest) = uleb::decode(buf)?;
    if len as usize > rest.len() {
        return None;
    }
    return Some(rest.split_at(len as usize));
}

/// Write a `uleb(len) ++ payload` frame.
pub fn write_frame<W: Write>(w: &mut W, payload: &[u8]) -> io::Result<()> {
    let mut header = Vec::with_capacity(uleb::MAX_LEN);
    uleb::encode(payload.len() as u32, &mut header);
    w.write_all(&header)?;
    return w.write_all(payload);
}

/// A writer wrapper that counts the bytes that actually made it out, so a
/// failed serialization can report how much of it took effect.
pub struct CountingWriter<'a, W: Write> {
    inner: &'a mut W,
    written: u64,
}

impl<'a, W: Write> CountingWriter<'a, W> {
    pub fn new(inner: &'a mut W) -> CountingWriter<'a, W> {
        return CountingWriter { inner, written: 0 };
    }

    pub fn written(&self) -> u64 {
        return self.written;
    }
}

impl<W: Write> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        return Ok(n);
    }

    fn flush(&mut self) -> io::Result<()> {
        return self.inner.flush();
    }
}
