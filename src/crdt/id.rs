// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-02"
// driver = "Isaac Clayton"

//! Identifier and character types for the edit tree.
//!
//! An [`Id`] names one edit: the actor that produced it plus a version
//! number drawn from the document-wide monotonic counter. The pair is
//! globally unique and totally comparable, which is what the sibling
//! ordering rule needs to break ties deterministically.
//!
//! A [`Glyph`] is either a Unicode scalar value or the tombstone sentinel.
//! The sentinel sits at `i32::MAX`, well outside the Unicode range, so it
//! can never collide with a real character and matches the value the
//! original history format reserved for deletions.

/// The identity of a single edit: who made it, and when.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Id {
    /// Opaque identifier of the originating actor. Empty only for the
    /// tree root.
    pub actor: String,
    /// Monotonic counter assigned by the originating actor. Zero only for
    /// the tree root.
    pub version: u32,
}

impl Id {
    pub fn new(actor: &str, version: u32) -> Id {
        return Id { actor: actor.to_string(), version };
    }

    /// The sentinel id of the tree root.
    pub fn root() -> Id {
        return Id { actor: String::new(), version: 0 };
    }

    pub fn is_root(&self) -> bool {
        return self.actor.is_empty() && self.version == 0;
    }
}

/// A character in the edit tree: a Unicode scalar or a deletion marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Glyph(u32);

impl Glyph {
    /// The deletion sentinel. Attached as the leading child of the node
    /// it removes from the visible text.
    pub const TOMBSTONE: Glyph = Glyph(i32::MAX as u32);

    /// The root node's placeholder character.
    pub const ROOT: Glyph = Glyph(0);

    pub fn from_char(c: char) -> Glyph {
        return Glyph(c as u32);
    }

    pub fn is_tombstone(&self) -> bool {
        return *self == Glyph::TOMBSTONE;
    }

    /// The scalar value, or `None` for the tombstone sentinel.
    pub fn as_char(&self) -> Option<char> {
        return char::from_u32(self.0);
    }

    /// UTF-8 length in bytes. Tombstones occupy no space in the visible
    /// text and report 0.
    pub fn utf8_len(&self) -> u32 {
        return match self.as_char() {
            Some(c) => c.len_utf8() as u32,
            None => 0,
        };
    }

    /// Encode into `buf`, returning the filled prefix.
    /// Panics on the tombstone sentinel, which has no UTF-8 form.
    pub fn encode_utf8<'a>(&self, buf: &'a mut [u8; 4]) -> &'a [u8] {
        let c = self.as_char().expect("tombstone has no utf-8 form");
        return c.encode_utf8(buf).as_bytes();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_id_is_sentinel() {
        let root = Id::root();
        assert!(root.is_root());
        assert!(!Id::new("alice", 1).is_root());
        assert!(!Id::new("", 1).is_root());
    }

    #[test]
    fn tombstone_is_outside_unicode() {
        assert!(Glyph::TOMBSTONE.is_tombstone());
        assert_eq!(Glyph::TOMBSTONE.as_char(), None);
        assert_eq!(Glyph::TOMBSTONE.utf8_len(), 0);
    }

    #[test]
    fn glyph_lengths_match_utf8() {
        assert_eq!(Glyph::from_char('a').utf8_len(), 1);
        assert_eq!(Glyph::from_char('é').utf8_len(), 2);
        assert_eq!(Glyph::from_char('語').utf8_len(), 3);
        assert_eq!(Glyph::from_char('🦀').utf8_len(), 4);
    }

    #[test]
    fn glyph_encodes_utf8() {
        let mut buf = [0u8; 4];
        assert_eq!(Glyph::from_char('a').encode_utf8(&mut buf), b"a");
        assert_eq!(Glyph::from_char('é').encode_utf8(&mut buf), "é".as_bytes());
    }

    #[test]
    fn root_glyph_is_one_byte() {
        // the root's placeholder still has a byte length, matching the
        // deletion accounting the document applies to any predecessor
        assert_eq!(Glyph::ROOT.utf8_len(), 1);
    }
}
