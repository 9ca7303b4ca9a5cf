// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-02"
// driver = "Isaac Clayton"

//! The sequence CRDT: edit tree, document facade, and offset index.
//!
//! Concurrent edits converge because placement never depends on when or
//! where an edit arrives, only on the edit's own fields and its
//! predecessor. See `tree` for the ordering rule, `doc` for the
//! user-facing operations, and `skip_list` for the byte-offset cache.

pub mod actor;
pub mod doc;
pub mod id;
pub mod skip_list;
pub mod tree;
