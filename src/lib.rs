// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-02"
// driver = "Isaac Clayton"

//! Tandem - a convergent plain-text document engine.
//!
//! Independent actors insert and delete characters at byte offsets in a
//! shared text; replicas exchange the resulting edits in any causal order
//! and arrive at the same document, byte for byte. The full edit history
//! serializes to a compact columnar binary format that loads lazily: the
//! text is available immediately, the history only once editing begins.
//!
//! # Quick Start
//!
//! ```
//! use tandem::crdt::doc::Document;
//!
//! // Build a document locally
//! let mut doc = Document::new();
//! doc.insert("alice", 0, 'h').unwrap();
//! doc.insert("alice", 1, 'i').unwrap();
//! assert_eq!(doc.to_string(), "hi");
//!
//! // Persist it, then load and edit the copy
//! let mut bytes = Vec::new();
//! doc.write_to(&mut bytes).unwrap();
//!
//! let mut copy = Document::load(&bytes).unwrap();
//! assert_eq!(copy.to_string(), "hi");
//! copy.prepare_to_edit().unwrap();
//! copy.insert("bob", 2, '!').unwrap();
//! assert_eq!(copy.to_string(), "hi!");
//! ```

pub mod codec;
pub mod crdt;
pub mod error;
