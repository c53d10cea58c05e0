//! String segments
//!
//! Strings are byte runs laid out back to back; a string of `n` bytes owns
//! `n` offsets. Pointers into the middle of a string are common (string
//! kernel calls hand out substrings by offset), so interior addresses
//! canonicalize to the string start. Strings hold no references.

use super::table::ArenaTable;
use super::{SegmentKind, SegmentOps};
use crate::address::{Address, SegmentId};

/// Arena of byte strings
#[derive(Debug, Clone, Default)]
pub struct StringSegment {
    strings: ArenaTable<Vec<u8>>,
}

impl StringSegment {
    /// Create an empty string segment
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a string, returning its start offset
    pub fn allocate(&mut self, bytes: impl Into<Vec<u8>>) -> u32 {
        let bytes = bytes.into();
        let span = bytes.len() as u32;
        self.strings.allocate(bytes, span)
    }

    /// Place a string at a fixed start offset
    pub fn insert_at(&mut self, start: u32, bytes: impl Into<Vec<u8>>) -> Result<(), Vec<u8>> {
        let bytes = bytes.into();
        let span = bytes.len() as u32;
        self.strings.insert_at(start, bytes, span)
    }

    /// Bytes of the string starting at `start`
    pub fn get(&self, start: u32) -> Option<&[u8]> {
        self.strings.get(start).map(Vec::as_slice)
    }

    /// Live strings in offset order
    pub fn strings(&self) -> impl Iterator<Item = (u32, &[u8])> + '_ {
        self.strings.iter().map(|(start, s)| (start, s.as_slice()))
    }

    /// Number of live strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the segment holds no strings
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl SegmentOps for StringSegment {
    fn kind(&self) -> SegmentKind {
        SegmentKind::Strings
    }

    fn canonicalize(&self, addr: Address) -> Address {
        match self.strings.owner_of(addr.offset) {
            Some(start) => addr.with_offset(start),
            None => addr,
        }
    }

    fn outgoing_references(&self, _addr: Address) -> Vec<Address> {
        Vec::new()
    }

    fn deallocatable_addresses(&self, own_id: SegmentId) -> Vec<Address> {
        self.strings
            .starts()
            .map(|start| Address::new(own_id, start))
            .collect()
    }

    fn free(&mut self, addr: Address) {
        let start = self.canonicalize(addr).offset;
        if self.strings.free(start).is_none() {
            log::warn!("strings: freeing unallocated {}", addr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEG: SegmentId = SegmentId(4);

    #[test]
    fn test_substring_pointer_canonicalizes_to_start() {
        let mut strings = StringSegment::new();
        let hello = strings.allocate("hello");
        let world = strings.allocate("world");
        assert_eq!(world, 5);

        let inside = Address::new(SEG, hello + 3);
        assert_eq!(strings.canonicalize(inside), Address::new(SEG, hello));
        assert_eq!(
            strings.canonicalize(Address::new(SEG, world + 4)),
            Address::new(SEG, world)
        );
    }

    #[test]
    fn test_strings_have_no_references() {
        let mut strings = StringSegment::new();
        let s = strings.allocate("abc");
        assert!(strings.outgoing_references(Address::new(SEG, s)).is_empty());
    }

    #[test]
    fn test_empty_string_is_still_addressable() {
        let mut strings = StringSegment::new();
        let empty = strings.allocate("");
        let next = strings.allocate("x");
        assert_ne!(empty, next);
        assert_eq!(strings.get(empty), Some(&b""[..]));
    }

    #[test]
    fn test_deallocatable_lists_starts_only() {
        let mut strings = StringSegment::new();
        strings.allocate("ab");
        strings.allocate("cde");
        assert_eq!(
            strings.deallocatable_addresses(SEG),
            vec![Address::new(SEG, 0), Address::new(SEG, 2)]
        );
    }
}
