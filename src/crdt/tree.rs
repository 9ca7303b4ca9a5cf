// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-02"
// driver = "Isaac Clayton"

//! The edit tree: CRDT state and its deterministic ordering rule.
//!
//! Every edit becomes a node hung under its predecessor, and a node's
//! children encode everything that ever happened "right after" it:
//! deletions of the node itself (tombstones) and characters inserted
//! behind it. Convergence falls out of one rule: siblings are kept in an
//! order computed purely from stable edit fields, so replicas that apply
//! the same edits in any causal order end up with identical trees:
//!
//! 1. Tombstones sort before live characters.
//! 2. Higher versions sort first.
//! 3. On equal versions, the actor continuing the predecessor's own run
//!    sorts first.
//! 4. Finally, the lexicographically greater actor sorts first.
//!
//! A full tie means the same edit was applied twice, which is a corrupt
//! history and panics.
//!
//! Nodes live in an arena indexed by [`NodeIdx`]; the tree never hands out
//! references that outlive a borrow, and nodes are never removed. The
//! id-to-node map holds arena indices, so lookups never contend with
//! ownership of the tree itself.

use rustc_hash::FxHashMap;

use crate::crdt::id::Glyph;
use crate::crdt::id::Id;

/// A handle into the edit tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeIdx(u32);

impl NodeIdx {
    /// The tree root. Always index 0 in the arena.
    pub const ROOT: NodeIdx = NodeIdx(0);

    fn index(&self) -> usize {
        return self.0 as usize;
    }
}

/// One edit in the tree: a character (or tombstone), its identity, and
/// everything anchored directly behind it.
#[derive(Clone, Debug)]
pub struct EditTreeNode {
    pub glyph: Glyph,
    pub id: Id,
    /// Ordered children: tombstones first, then the sibling order above.
    pub children: Vec<NodeIdx>,
}

/// The whole edit history, rooted at the sentinel node.
#[derive(Clone, Debug)]
pub struct EditTree {
    nodes: Vec<EditTreeNode>,
    /// Every reachable node, by edit id.
    edits: FxHashMap<Id, NodeIdx>,
}

impl Default for EditTree {
    fn default() -> Self {
        return Self::new();
    }
}

impl EditTree {
    /// A tree holding only the root sentinel.
    pub fn new() -> EditTree {
        let root = EditTreeNode {
            glyph: Glyph::ROOT,
            id: Id::root(),
            children: Vec::new(),
        };
        let mut edits = FxHashMap::default();
        edits.insert(Id::root(), NodeIdx::ROOT);
        return EditTree { nodes: vec![root], edits };
    }

    pub fn node(&self, idx: NodeIdx) -> &EditTreeNode {
        return &self.nodes[idx.index()];
    }

    /// Look up a node by edit id.
    pub fn lookup(&self, id: &Id) -> Option<NodeIdx> {
        return self.edits.get(id).copied();
    }

    /// Total node count, root included.
    pub fn len(&self) -> usize {
        return self.nodes.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.nodes.len() == 1;
    }

    /// Number of leading tombstone children of `idx`.
    pub fn leading_tombstones(&self, idx: NodeIdx) -> usize {
        let node = self.node(idx);
        let mut count = 0;
        while count < node.children.len()
            && self.node(node.children[count]).glyph.is_tombstone()
        {
            count += 1;
        }
        return count;
    }

    /// True if the node's character has been deleted from the visible
    /// text (it carries at least one tombstone child).
    pub fn is_deleted(&self, idx: NodeIdx) -> bool {
        return self.leading_tombstones(idx) > 0;
    }

    /// Where a new edit must land among `parent`'s children.
    ///
    /// Scans left to right and returns the first position the new edit
    /// sorts before; ties on every comparison mean the edit is already in
    /// the tree, which panics; replaying a duplicate would corrupt the
    /// converged order on other replicas.
    pub fn insertion_index(&self, parent: NodeIdx, id: &Id, glyph: Glyph) -> usize {
        let parent_node = self.node(parent);
        let mut idx = parent_node.children.len();

        for (i, &child_idx) in parent_node.children.iter().enumerate() {
            let child = self.node(child_idx);

            // deletes go first
            if child.glyph.is_tombstone() && !glyph.is_tombstone() {
                continue;
            }
            if glyph.is_tombstone() && !child.glyph.is_tombstone() {
                idx = i;
                break;
            }

            // otherwise, sort by version (newer first)
            if child.id.version > id.version {
                continue;
            }
            if child.id.version < id.version {
                idx = i;
                break;
            }

            // edits by the same actor as the predecessor go first
            if child.id.actor == parent_node.id.actor && id.actor != parent_node.id.actor {
                continue;
            }
            if child.id.actor != parent_node.id.actor && id.actor == parent_node.id.actor {
                idx = i;
                break;
            }

            // last resort: tie-break by actor id
            if child.id.actor > id.actor {
                continue;
            }
            if child.id.actor < id.actor {
                idx = i;
                break;
            }
            panic!("duplicate edit applied: {:?}", id);
        }

        return idx;
    }

    /// Create a node and splice it into `parent.children` at `position`.
    pub fn insert_child(
        &mut self,
        parent: NodeIdx,
        position: usize,
        glyph: Glyph,
        id: Id,
    ) -> NodeIdx {
        let idx = NodeIdx(self.nodes.len() as u32);
        self.nodes.push(EditTreeNode { glyph, id: id.clone(), children: Vec::new() });
        self.edits.insert(id, idx);
        self.nodes[parent.index()].children.insert(position, idx);
        return idx;
    }

    /// Create a node and append it as `parent`'s last child, refusing ids
    /// already present. Used when replaying a serialized history, whose
    /// rows arrive in final sibling order.
    pub fn append_child(&mut self, parent: NodeIdx, glyph: Glyph, id: Id) -> Option<NodeIdx> {
        if self.edits.contains_key(&id) {
            return None;
        }
        let idx = NodeIdx(self.nodes.len() as u32);
        self.nodes.push(EditTreeNode { glyph, id: id.clone(), children: Vec::new() });
        self.edits.insert(id, idx);
        self.nodes[parent.index()].children.push(idx);
        return Some(idx);
    }

    /// Visit every live character under `start` in document order.
    ///
    /// A node is yielded when it is not the root and carries no leading
    /// tombstone; recursion then continues through its non-tombstone
    /// children. The visitor returns `false` to stop early; the method
    /// reports whether the walk ran to completion.
    pub fn chars_in_order<F>(&self, start: NodeIdx, mut f: F) -> bool
    where
        F: FnMut(NodeIdx) -> bool,
    {
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            let node = self.node(idx);
            let tombstones = self.leading_tombstones(idx);
            if tombstones == 0 && node.id.version != 0 && !f(idx) {
                return false;
            }
            for &child in node.children[tombstones..].iter().rev() {
                stack.push(child);
            }
        }
        return true;
    }

    /// Visit every node (tombstones included) in history order, with its
    /// parent: each child is yielded before its own subtree. This is the
    /// row order of the columnar serialization.
    pub fn edits_in_order<F>(&self, mut f: F) -> bool
    where
        F: FnMut(NodeIdx, NodeIdx) -> bool,
    {
        let root = self.node(NodeIdx::ROOT);
        let mut stack: Vec<(NodeIdx, NodeIdx)> = Vec::new();
        for &child in root.children.iter().rev() {
            stack.push((child, NodeIdx::ROOT));
        }
        while let Some((idx, parent)) = stack.pop() {
            if !f(idx, parent) {
                return false;
            }
            for &child in self.node(idx).children.iter().rev() {
                stack.push((child, idx));
            }
        }
        return true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(tree: &mut EditTree, parent: NodeIdx, actor: &str, version: u32, glyph: Glyph) -> NodeIdx {
        let id = Id::new(actor, version);
        let position = tree.insertion_index(parent, &id, glyph);
        return tree.insert_child(parent, position, glyph, id);
    }

    fn child_glyphs(tree: &EditTree, parent: NodeIdx) -> Vec<Glyph> {
        return tree
            .node(parent)
            .children
            .iter()
            .map(|&c| tree.node(c).glyph)
            .collect();
    }

    #[test]
    fn fresh_tree_has_only_the_root() {
        let tree = EditTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.lookup(&Id::root()), Some(NodeIdx::ROOT));
        assert_eq!(tree.node(NodeIdx::ROOT).glyph, Glyph::ROOT);
    }

    #[test]
    fn newer_versions_sort_first() {
        let mut tree = EditTree::new();
        apply(&mut tree, NodeIdx::ROOT, "alice", 1, Glyph::from_char('a'));
        apply(&mut tree, NodeIdx::ROOT, "alice", 2, Glyph::from_char('b'));
        apply(&mut tree, NodeIdx::ROOT, "alice", 3, Glyph::from_char('c'));

        let glyphs = child_glyphs(&tree, NodeIdx::ROOT);
        assert_eq!(glyphs, vec![
            Glyph::from_char('c'),
            Glyph::from_char('b'),
            Glyph::from_char('a'),
        ]);
    }

    #[test]
    fn tombstones_sort_before_live_children() {
        let mut tree = EditTree::new();
        let a = apply(&mut tree, NodeIdx::ROOT, "alice", 1, Glyph::from_char('a'));
        apply(&mut tree, a, "alice", 2, Glyph::from_char('b'));
        apply(&mut tree, a, "bob", 3, Glyph::TOMBSTONE);

        let glyphs = child_glyphs(&tree, a);
        assert_eq!(glyphs[0], Glyph::TOMBSTONE);
        assert_eq!(glyphs[1], Glyph::from_char('b'));
        assert!(tree.is_deleted(a));
        assert_eq!(tree.leading_tombstones(a), 1);
    }

    #[test]
    fn predecessor_actor_wins_version_ties() {
        let mut tree = EditTree::new();
        let a = apply(&mut tree, NodeIdx::ROOT, "alice", 1, Glyph::from_char('a'));
        // concurrent inserts after 'a' with the same version
        apply(&mut tree, a, "zed", 2, Glyph::from_char('z'));
        apply(&mut tree, a, "alice", 2, Glyph::from_char('b'));

        // alice continues her own run, so 'b' sorts ahead of 'z' even
        // though "zed" is lexicographically greater
        let glyphs = child_glyphs(&tree, a);
        assert_eq!(glyphs, vec![Glyph::from_char('b'), Glyph::from_char('z')]);
    }

    #[test]
    fn greater_actor_wins_final_ties() {
        let mut tree = EditTree::new();
        apply(&mut tree, NodeIdx::ROOT, "bob", 1, Glyph::from_char('b'));
        apply(&mut tree, NodeIdx::ROOT, "carol", 1, Glyph::from_char('c'));
        apply(&mut tree, NodeIdx::ROOT, "alice", 1, Glyph::from_char('a'));

        let glyphs = child_glyphs(&tree, NodeIdx::ROOT);
        assert_eq!(glyphs, vec![
            Glyph::from_char('c'),
            Glyph::from_char('b'),
            Glyph::from_char('a'),
        ]);
    }

    #[test]
    fn sibling_order_is_insertion_order_independent() {
        let edits: Vec<(&str, u32, Glyph)> = vec![
            ("alice", 1, Glyph::from_char('a')),
            ("bob", 2, Glyph::from_char('b')),
            ("carol", 2, Glyph::from_char('c')),
            ("dave", 3, Glyph::TOMBSTONE),
            ("erin", 1, Glyph::from_char('e')),
        ];

        let mut forward = EditTree::new();
        for (actor, version, glyph) in &edits {
            apply(&mut forward, NodeIdx::ROOT, actor, *version, *glyph);
        }
        let mut backward = EditTree::new();
        for (actor, version, glyph) in edits.iter().rev() {
            apply(&mut backward, NodeIdx::ROOT, actor, *version, *glyph);
        }

        let order = |tree: &EditTree| -> Vec<Id> {
            return tree
                .node(NodeIdx::ROOT)
                .children
                .iter()
                .map(|&c| tree.node(c).id.clone())
                .collect();
        };
        assert_eq!(order(&forward), order(&backward));
    }

    #[test]
    #[should_panic(expected = "duplicate edit applied")]
    fn duplicate_edit_panics() {
        let mut tree = EditTree::new();
        apply(&mut tree, NodeIdx::ROOT, "alice", 1, Glyph::from_char('a'));
        apply(&mut tree, NodeIdx::ROOT, "alice", 1, Glyph::from_char('a'));
    }

    #[test]
    fn chars_in_order_skips_deleted_subtree_roots() {
        let mut tree = EditTree::new();
        let a = apply(&mut tree, NodeIdx::ROOT, "alice", 1, Glyph::from_char('a'));
        let b = apply(&mut tree, a, "alice", 2, Glyph::from_char('b'));
        apply(&mut tree, a, "alice", 3, Glyph::TOMBSTONE);

        let mut seen = Vec::new();
        tree.chars_in_order(NodeIdx::ROOT, |idx| {
            seen.push(idx);
            return true;
        });
        // 'a' is deleted but its live child 'b' still shows
        assert_eq!(seen, vec![b]);
    }

    #[test]
    fn chars_in_order_stops_early() {
        let mut tree = EditTree::new();
        let a = apply(&mut tree, NodeIdx::ROOT, "alice", 1, Glyph::from_char('a'));
        apply(&mut tree, a, "alice", 2, Glyph::from_char('b'));

        let mut seen = 0;
        let completed = tree.chars_in_order(NodeIdx::ROOT, |_| {
            seen += 1;
            return false;
        });
        assert!(!completed);
        assert_eq!(seen, 1);
    }

    #[test]
    fn edits_in_order_yields_parents_pre_order() {
        let mut tree = EditTree::new();
        let a = apply(&mut tree, NodeIdx::ROOT, "alice", 1, Glyph::from_char('a'));
        let b = apply(&mut tree, a, "alice", 2, Glyph::from_char('b'));
        let t = apply(&mut tree, a, "alice", 3, Glyph::TOMBSTONE);

        let mut rows = Vec::new();
        tree.edits_in_order(|idx, parent| {
            rows.push((idx, parent));
            return true;
        });
        // a first, then its children in sibling order: tombstone, then b
        assert_eq!(rows, vec![(a, NodeIdx::ROOT), (t, a), (b, a)]);
    }
}
