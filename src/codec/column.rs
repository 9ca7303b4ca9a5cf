// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-02"
// driver = "Isaac Clayton"

//! Column encoders for the serialized edit history.
//!
//! The history streams out as parallel columns, one row per node in edit
//! order. The backing column carries what happened to the text: a deleted
//! node is expanded into its own UTF-8 bytes, once per tombstone hanging
//! off it, while a live node that was never deleted becomes a single
//! insert opcode. Tombstone nodes contribute nothing of their own: the
//! expansion at their parent already told the whole story, and the decoder
//! reconstructs them from the structure of the rows.
//!
//! The ID columns carry predecessor and self identities as (actor offset,
//! version delta) pairs. Version deltas for live rows and tombstone rows
//! run through separate chains so that each stays a near-monotonic
//! sequence the run-length layer can flatten.

use std::io;
use std::io::Write;

use crate::codec::rle::RleEncoder;
use crate::codec::uleb;
use crate::codec::delta::DeltaEncoder;
use crate::crdt::actor::ActorTable;
use crate::crdt::id::Glyph;
use crate::crdt::id::Id;

/// Backing-column opcode for a live, never-deleted character.
pub const INSERT_OP: u8 = 0xFF;

/// Reserved for a future delete opcode; rejected on decode until defined.
pub const DELETE_OP: u8 = 0xFE;

/// Length of the backing-column token at the head of `buf`: the insert
/// opcode or one UTF-8 scalar. `DELETE_OP` and stray continuation bytes
/// are malformed.
pub fn backing_token_len(buf: &[u8]) -> Option<usize> {
    let len = match *buf.first()? {
        INSERT_OP => 1,
        DELETE_OP => return None,
        b if b < 0x80 => 1,
        b if (0xc0..0xe0).contains(&b) => 2,
        b if (0xe0..0xf0).contains(&b) => 3,
        b if (0xf0..0xf8).contains(&b) => 4,
        _ => return None,
    };
    if buf.len() < len {
        return None;
    }
    return Some(len);
}

/// Decode a backing-column character token into its scalar.
pub fn backing_token_char(token: &[u8]) -> Option<char> {
    return std::str::from_utf8(token).ok()?.chars().next();
}

/// Encodes the backing column.
#[derive(Clone, Debug, Default)]
pub struct BackingEncoder {
    rle: RleEncoder,
}

impl BackingEncoder {
    pub fn new() -> BackingEncoder {
        return BackingEncoder::default();
    }

    /// Append one node's contribution: its character once per leading
    /// tombstone child, or the insert opcode if it is live and intact.
    /// Tombstone nodes themselves emit nothing.
    pub fn append(&mut self, glyph: Glyph, tombstone_children: usize) {
        if tombstone_children > 0 {
            let mut buf = [0u8; 4];
            let bytes = glyph.encode_utf8(&mut buf);
            for _ in 0..tombstone_children {
                self.rle.append(bytes);
            }
        } else if !glyph.is_tombstone() {
            self.rle.append(&[INSERT_OP]);
        }
    }

    pub fn write_to<W: Write>(&mut self, w: &mut W) -> io::Result<()> {
        return self.rle.write_to(w);
    }
}

/// Encodes one ID column (predecessor or self) as an actor-offset stream
/// and a version-delta stream.
#[derive(Debug)]
pub struct IdEncoder<'a> {
    actor_offset: RleEncoder,
    live_delta: DeltaEncoder,
    delete_delta: DeltaEncoder,
    version: RleEncoder,
    table: &'a ActorTable,
    scratch: Vec<u8>,
}

impl<'a> IdEncoder<'a> {
    pub fn new(table: &'a ActorTable) -> IdEncoder<'a> {
        return IdEncoder {
            actor_offset: RleEncoder::new(),
            live_delta: DeltaEncoder::default(),
            delete_delta: DeltaEncoder::default(),
            version: RleEncoder::new(),
            table,
            scratch: Vec::with_capacity(uleb::MAX_LEN),
        };
    }

    /// Append one row's id. Tombstone rows thread their version through
    /// the delete chain, live rows through the live chain.
    pub fn append(&mut self, id: &Id, tombstone: bool) {
        self.scratch.clear();
        uleb::encode(self.table.offset(&id.actor), &mut self.scratch);
        self.actor_offset.append(&self.scratch);

        let delta = if tombstone {
            self.delete_delta.append(id.version)
        } else {
            self.live_delta.append(id.version)
        };
        self.scratch.clear();
        uleb::encode(delta, &mut self.scratch);
        self.version.append(&self.scratch);
    }

    /// Flush both streams: actor offsets, then version deltas.
    pub fn write_to<W: Write>(&mut self, w: &mut W) -> io::Result<()> {
        self.actor_offset.write_to(w)?;
        return self.version.write_to(w);
    }
}
