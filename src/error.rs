// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-02"
// driver = "Isaac Clayton"

//! Error types for document parsing and serialization.
//!
//! Only recoverable conditions live here: malformed input bytes, an
//! out-of-range edit index, and writer failures. Conditions that signify a
//! corrupt history or caller misuse (applying a duplicate edit, editing a
//! document that was never prepared) panic instead, because continuing
//! would silently diverge replicas.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A length prefix overran the buffer or a varint was malformed.
    #[error("invalid frame: {0}")]
    InvalidFrame(&'static str),

    /// The visible-text frame was not valid UTF-8.
    #[error("document text is not valid utf-8")]
    InvalidUtf8,

    /// An insert or remove index lies beyond the live text.
    #[error("index {index} out of bounds for document of {len} bytes")]
    OutOfBounds { index: u32, len: u32 },

    /// The underlying writer failed. `written` counts the bytes that made
    /// it out before the failure.
    #[error("write failed after {written} bytes")]
    Io {
        written: u64,
        #[source]
        source: std::io::Error,
    },
}
