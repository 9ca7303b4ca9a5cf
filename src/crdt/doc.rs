// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-02"
// driver = "Isaac Clayton"

//! The document facade: user-facing edits, serialization, and loading.
//!
//! A [`Document`] wraps the edit tree with everything a text editor needs:
//! byte-offset inserts and removes, the rendered string, and a compact
//! binary form of the entire history. Loading is two-phase: [`Document::load`]
//! only splits off the visible text and keeps the history bytes opaque, so
//! a reader that never edits pays nothing; [`Document::prepare_to_edit`]
//! replays the history columns and rebuilds the tree.
//!
//! Serialized layout, every region length-prefixed with a ULEB128 count:
//!
//! ```text
//! frame(visible text)
//! frame(actor ids, each length-prefixed, sorted)
//! frame(backing column)                 what happened: inserts + expansions
//! frame(predecessor actor offsets)      where it happened
//! frame(predecessor version deltas)
//! frame(self actor offsets)             who did it
//! frame(self version deltas)
//! ```

use std::collections::BTreeSet;
use std::io;
use std::io::Write;

use crate::codec::column::backing_token_char;
use crate::codec::column::backing_token_len;
use crate::codec::column::BackingEncoder;
use crate::codec::column::IdEncoder;
use crate::codec::column::INSERT_OP;
use crate::codec::delta::DeltaDecoder;
use crate::codec::read_frame;
use crate::codec::rle::RleDecoder;
use crate::codec::uleb;
use crate::codec::write_frame;
use crate::codec::CountingWriter;
use crate::crdt::actor::ActorTable;
use crate::crdt::id::Glyph;
use crate::crdt::id::Id;
use crate::crdt::skip_list::SkipList;
use crate::crdt::tree::EditTree;
use crate::crdt::tree::NodeIdx;
use crate::error::Error;
use crate::error::Result;

const NOT_PREPARED: &str = "Document::prepare_to_edit() must be called before editing";

/// One operation, ready to apply locally or replay on another replica.
/// The three fields are everything the ordering rule looks at, so applying
/// the same edits in any causal order converges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
    pub glyph: Glyph,
    pub id: Id,
    pub prev: Id,
}

/// A collaborative plain-text document.
pub struct Document {
    /// Rendered text captured by `load`; stale once the tree exists.
    value: String,
    /// Opaque history bytes captured by `load`, replayed by
    /// `prepare_to_edit` and passed through verbatim if never prepared.
    meta: Vec<u8>,
    /// `None` between `load` and `prepare_to_edit`.
    tree: Option<EditTree>,
    skip_list: Option<SkipList>,
    max_version: u32,
    /// Every actor that has contributed an edit, kept sorted for the
    /// serialized actor table.
    actor_ids: BTreeSet<String>,
}

impl Default for Document {
    fn default() -> Self {
        return Self::new();
    }
}

impl Document {
    /// An empty, editable document.
    pub fn new() -> Document {
        return Document {
            value: String::new(),
            meta: Vec::new(),
            tree: Some(EditTree::new()),
            skip_list: None,
            max_version: 0,
            actor_ids: BTreeSet::new(),
        };
    }

    /// Parse a serialized document far enough to read its text.
    /// The history stays opaque until [`Document::prepare_to_edit`].
    pub fn load(bytes: &[u8]) -> Result<Document> {
        let (value, meta) =
            read_frame(bytes).ok_or(Error::InvalidFrame("document length prefix"))?;
        let value = std::str::from_utf8(value).map_err(|_| Error::InvalidUtf8)?;
        return Ok(Document {
            value: value.to_string(),
            meta: meta.to_vec(),
            tree: None,
            skip_list: None,
            max_version: 0,
            actor_ids: BTreeSet::new(),
        });
    }

    /// Replay the loaded history and rebuild the edit tree.
    /// A no-op on documents that are already editable.
    pub fn prepare_to_edit(&mut self) -> Result<()> {
        if self.tree.is_some() {
            return Ok(());
        }
        let (tree, max_version, actors) = rebuild(&self.value, &self.meta)?;
        self.tree = Some(tree);
        self.max_version = max_version;
        self.actor_ids = actors.into_iter().collect();
        self.skip_list = None;
        return Ok(());
    }

    /// The current visible text.
    pub fn to_string(&self) -> String {
        let Some(tree) = &self.tree else {
            return self.value.clone();
        };
        let mut out = String::new();
        tree.chars_in_order(NodeIdx::ROOT, |idx| {
            if let Some(c) = tree.node(idx).glyph.as_char() {
                out.push(c);
            }
            return true;
        });
        return out;
    }

    /// Byte length of the visible text.
    pub fn len(&self) -> u32 {
        return match &self.tree {
            Some(tree) => live_len(tree),
            None => self.value.len() as u32,
        };
    }

    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    /// Insert `c` at byte offset `index`, as `actor`.
    /// Returns the edit to forward to other replicas.
    pub fn insert(&mut self, actor: &str, index: u32, c: char) -> Result<Edit> {
        return self.insert_glyph(actor, index, Glyph::from_char(c));
    }

    /// Delete the character occupying byte offset `index`, as `actor`.
    /// A removal is an insert of a tombstone behind the victim; the victim
    /// itself is never mutated, so concurrent edits anchored to it stay
    /// valid.
    pub fn remove(&mut self, actor: &str, index: u32) -> Result<Edit> {
        let target = index.checked_add(1).ok_or(Error::OutOfBounds {
            index,
            len: self.len(),
        })?;
        return self.insert_glyph(actor, target, Glyph::TOMBSTONE);
    }

    fn insert_glyph(&mut self, actor: &str, index: u32, glyph: Glyph) -> Result<Edit> {
        if self.tree.is_none() {
            panic!("{}", NOT_PREPARED);
        }
        let id = Id::new(actor, self.max_version + 1);
        let prev_idx = self.pred_for_index(index)?;
        let prev = self.tree.as_ref().unwrap().node(prev_idx).id.clone();
        let edit = Edit { glyph, id, prev };
        self.apply_at(&edit, index);
        return Ok(edit);
    }

    /// Commit an edit, local or replayed, at byte position `index`.
    ///
    /// Placement in the tree depends only on the edit's fields; `index`
    /// merely keeps the offset cache in step (a wrong index can at worst
    /// force an index rebuild). Panics if the edit's predecessor is
    /// unknown or the edit was already applied: both mean a corrupt
    /// history, and continuing would diverge from other replicas.
    pub fn apply_at(&mut self, edit: &Edit, index: u32) {
        let tree = self.tree.as_ref().expect(NOT_PREPARED);
        if edit.id.version > self.max_version {
            self.max_version = edit.id.version;
        }
        if edit.id.version > 0 {
            self.actor_ids.insert(edit.id.actor.clone());
        }

        let prev = tree
            .lookup(&edit.prev)
            .unwrap_or_else(|| panic!("unknown predecessor: {:?}", edit.prev));
        let position = tree.insertion_index(prev, &edit.id, edit.glyph);

        let mut deleted_node = None;
        let delta = if edit.glyph.is_tombstone() {
            if position == 0 && !tree.is_deleted(prev) {
                // first deletion of a live character
                deleted_node = Some(prev);
                -(tree.node(prev).glyph.utf8_len() as i32)
            } else {
                0
            }
        } else {
            edit.glyph.utf8_len() as i32
        };
        self.update_skip_list(index, delta, deleted_node);

        let tree = self.tree.as_mut().unwrap();
        tree.insert_child(prev, position, edit.glyph, edit.id.clone());
    }

    /// Serialize the document. On failure the error reports how many
    /// bytes reached the writer.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<u64> {
        let mut counting = CountingWriter::new(w);
        return match self.write_inner(&mut counting) {
            Ok(()) => Ok(counting.written()),
            Err(source) => Err(Error::Io {
                written: counting.written(),
                source,
            }),
        };
    }

    fn write_inner<W: Write>(&self, w: &mut CountingWriter<'_, W>) -> io::Result<()> {
        let text = self.to_string();
        write_frame(w, text.as_bytes())?;

        let Some(tree) = &self.tree else {
            // loaded but never prepared: the history passes through untouched
            return w.write_all(&self.meta);
        };

        // actor table: sorted ids, each length-prefixed, referenced from
        // the columns by 1-based offset (0 is the root's empty actor)
        let mut table = ActorTable::new();
        let mut actor_frame = Vec::new();
        for actor in &self.actor_ids {
            table.push(actor);
            uleb::encode(actor.len() as u32, &mut actor_frame);
            actor_frame.extend_from_slice(actor.as_bytes());
        }
        write_frame(w, &actor_frame)?;

        let mut backing = BackingEncoder::new();
        let mut pred = IdEncoder::new(&table);
        let mut id = IdEncoder::new(&table);
        tree.edits_in_order(|node_idx, parent_idx| {
            let node = tree.node(node_idx);
            backing.append(node.glyph, tree.leading_tombstones(node_idx));
            pred.append(&tree.node(parent_idx).id, false);
            id.append(&node.id, node.glyph.is_tombstone());
            return true;
        });
        backing.write_to(w)?;
        pred.write_to(w)?;
        return id.write_to(w);
    }

    /// The node whose live character ends at, or first exceeds, byte
    /// offset `index`. Offset 0 resolves to the root.
    fn pred_for_index(&mut self, index: u32) -> Result<NodeIdx> {
        if index == 0 {
            return Ok(NodeIdx::ROOT);
        }
        self.ensure_skip_list();
        let tree = self.tree.as_ref().expect(NOT_PREPARED);
        let anchors = self.skip_list.as_ref().unwrap().anchors();

        // Jump while the anchor's character starts strictly before the
        // target. Stored counts exclude each anchor's own character, so
        // that length is added back when stepping past one.
        let mut start = NodeIdx::ROOT;
        let mut pos = anchors[0].count_before as u32;
        let mut start_len = 0u32;
        for anchor in &anchors[1..] {
            let candidate = pos + start_len + anchor.count_before as u32;
            if candidate >= index {
                break;
            }
            start = anchor.node;
            pos = candidate;
            start_len = tree.node(start).glyph.utf8_len();
        }

        let walk = |from: NodeIdx, mut cursor: u32| -> Option<NodeIdx> {
            let mut found = None;
            tree.chars_in_order(from, |idx| {
                cursor += tree.node(idx).glyph.utf8_len();
                if cursor >= index {
                    found = Some(idx);
                    return false;
                }
                return true;
            });
            return found;
        };

        let mut found = if start == NodeIdx::ROOT {
            walk(NodeIdx::ROOT, 0)
        } else {
            walk(start, pos)
        };
        if found.is_none() && start != NodeIdx::ROOT {
            // the anchor's subtree ended before the target; a heavily
            // branched tree can strand an anchor on a short limb
            found = walk(NodeIdx::ROOT, 0);
        }

        return found.ok_or(Error::OutOfBounds {
            index,
            len: live_len(tree),
        });
    }

    fn ensure_skip_list(&mut self) {
        if self.skip_list.is_none() {
            let tree = self.tree.as_ref().expect(NOT_PREPARED);
            self.skip_list = Some(SkipList::build(tree));
        }
    }

    /// Fold an edit's byte delta into the offset cache. `deleted_node` is
    /// the node whose character just left the visible text, if any: an
    /// anchor's own character is outside every stored count, so deleting
    /// one invalidates the cache instead of adjusting it.
    fn update_skip_list(&mut self, pos: u32, delta: i32, deleted_node: Option<NodeIdx>) {
        self.ensure_skip_list();
        let list = self.skip_list.as_mut().unwrap();
        let anchored_delete = match deleted_node {
            Some(node) => list.anchors().iter().any(|anchor| anchor.node == node),
            None => false,
        };
        if anchored_delete || !list.update(pos, delta) {
            self.skip_list = None;
        }
    }
}

fn live_len(tree: &EditTree) -> u32 {
    let mut total = 0;
    tree.chars_in_order(NodeIdx::ROOT, |idx| {
        total += tree.node(idx).glyph.utf8_len();
        return true;
    });
    return total;
}

/// Replay the six metadata frames against the visible text and
/// reconstruct the edit tree, the max version, and the actor list.
///
/// Rows arrive in history order, which visits every parent before its
/// children and every sibling in final order, so each row can be appended
/// directly under its predecessor. Row kinds are recovered structurally:
///
/// - a pending `0xFF` token is a live character, spelled out by the next
///   unclaimed character of the visible text (live rows and the text
///   share an order);
/// - any other pending token spells a deleted character. The row that
///   *owns* the token (the deleted node itself) is told apart from the
///   rows that *consume* it (its tombstones) by one row of lookahead: a
///   deleted node's first child is its own tombstone, which is the very
///   next row, so a row is the deleted node exactly when the next row's
///   predecessor matches the id this row would take on the live version
///   chain and that id is new to the tree. Tombstone rows must spell
///   their parent's character, and each consumes one copy of the
///   expansion.
fn rebuild(text: &str, meta: &[u8]) -> Result<(EditTree, u32, Vec<String>)> {
    let (actor_frame, rest) = read_frame(meta).ok_or(Error::InvalidFrame("actor table frame"))?;
    let (backing_frame, rest) = read_frame(rest).ok_or(Error::InvalidFrame("backing frame"))?;
    let (pred_actor_frame, rest) =
        read_frame(rest).ok_or(Error::InvalidFrame("predecessor actor frame"))?;
    let (pred_version_frame, rest) =
        read_frame(rest).ok_or(Error::InvalidFrame("predecessor version frame"))?;
    let (id_actor_frame, rest) = read_frame(rest).ok_or(Error::InvalidFrame("id actor frame"))?;
    let (id_version_frame, rest) =
        read_frame(rest).ok_or(Error::InvalidFrame("id version frame"))?;
    if !rest.is_empty() {
        return Err(Error::InvalidFrame("trailing bytes after metadata"));
    }

    let mut table = ActorTable::new();
    let mut cursor = actor_frame;
    while !cursor.is_empty() {
        let (actor, rest) = read_frame(cursor).ok_or(Error::InvalidFrame("actor id length"))?;
        let actor =
            std::str::from_utf8(actor).map_err(|_| Error::InvalidFrame("actor id is not utf-8"))?;
        if actor.is_empty() {
            return Err(Error::InvalidFrame("empty actor id"));
        }
        table.push(actor);
        cursor = rest;
    }

    let mut backing = RleDecoder::new(backing_frame);
    let mut pred_actor = RleDecoder::new(pred_actor_frame);
    let mut pred_version = RleDecoder::new(pred_version_frame);
    let mut id_actor = RleDecoder::new(id_actor_frame);
    let mut id_version = RleDecoder::new(id_version_frame);

    let mut pred_chain = DeltaDecoder::default();
    let mut live_chain = DeltaDecoder::default();
    let mut delete_chain = DeltaDecoder::default();

    // the predecessor column decodes independently of row kinds, and the
    // classification below needs one row of lookahead into it
    let mut preds: Vec<Id> = Vec::new();
    loop {
        let Some(token) = pred_actor.next(uleb::token_len)? else {
            break;
        };
        let offset = decode_uleb_token(token)?;
        let zig = next_uleb_value(&mut pred_version, "predecessor version column")?;
        preds.push(Id {
            actor: table
                .actor(offset)
                .ok_or(Error::InvalidFrame("actor offset out of range"))?
                .to_string(),
            version: pred_chain.next(zig),
        });
    }
    if pred_version.next(uleb::token_len)?.is_some() {
        return Err(Error::InvalidFrame("column lengths disagree"));
    }

    let mut tree = EditTree::new();
    let mut max_version = 0u32;
    let mut chars = text.chars();
    // one-token lookahead into the backing column
    let mut pending: Option<&[u8]> = None;

    for i in 0..preds.len() {
        let parent = tree
            .lookup(&preds[i])
            .ok_or(Error::InvalidFrame("unknown predecessor in history"))?;

        let id_offset = decode_uleb_token(
            id_actor
                .next(uleb::token_len)?
                .ok_or(Error::InvalidFrame("id actor column"))?,
        )?;
        let actor = table
            .actor(id_offset)
            .ok_or(Error::InvalidFrame("actor offset out of range"))?
            .to_string();
        let zig = next_uleb_value(&mut id_version, "id version column")?;

        if pending.is_none() {
            pending = backing.next(backing_token_len)?;
        }
        let token = pending.ok_or(Error::InvalidFrame("backing column exhausted"))?;

        let (glyph, tombstone) = if token == [INSERT_OP].as_slice() {
            pending = None;
            let c = chars
                .next()
                .ok_or(Error::InvalidFrame("text shorter than history"))?;
            (Glyph::from_char(c), false)
        } else {
            let c =
                backing_token_char(token).ok_or(Error::InvalidFrame("malformed character token"))?;
            let live_candidate = Id {
                actor: actor.clone(),
                version: live_chain.peek(zig),
            };
            // A row owns the expansion when the next row is its tombstone:
            // the next row's predecessor carries this row's would-be id,
            // and that id names no node built so far. An id that already
            // exists belongs to an earlier node, so the next row hangs off
            // that one and this row is itself a tombstone.
            if preds.get(i + 1) == Some(&live_candidate) && tree.lookup(&live_candidate).is_none() {
                (Glyph::from_char(c), false)
            } else {
                // a tombstone consuming one copy of its parent's character
                if tree.node(parent).glyph != Glyph::from_char(c) {
                    return Err(Error::InvalidFrame("tombstone expansion mismatch"));
                }
                pending = None;
                (Glyph::TOMBSTONE, true)
            }
        };

        let version = if tombstone {
            delete_chain.next(zig)
        } else {
            live_chain.next(zig)
        };
        if version > max_version {
            max_version = version;
        }

        tree.append_child(parent, glyph, Id { actor, version })
            .ok_or(Error::InvalidFrame("duplicate id in history"))?;
    }

    // every column, and the text cursor, must finish together
    if pending.is_some() || backing.next(backing_token_len)?.is_some() {
        return Err(Error::InvalidFrame("backing column longer than history"));
    }
    if id_actor.next(uleb::token_len)?.is_some() || id_version.next(uleb::token_len)?.is_some() {
        return Err(Error::InvalidFrame("column lengths disagree"));
    }
    if chars.next().is_some() {
        return Err(Error::InvalidFrame("text longer than history"));
    }

    let actors = table.actors().map(str::to_string).collect();
    return Ok((tree, max_version, actors));
}

fn decode_uleb_token(token: &[u8]) -> Result<u32> {
    let (value, rest) =
        uleb::decode(token).ok_or(Error::InvalidFrame("malformed varint token"))?;
    debug_assert!(rest.is_empty());
    return Ok(value);
}

fn next_uleb_value(decoder: &mut RleDecoder<'_>, what: &'static str) -> Result<u32> {
    let token = decoder
        .next(uleb::token_len)?
        .ok_or(Error::InvalidFrame(what))?;
    return decode_uleb_token(token);
}
