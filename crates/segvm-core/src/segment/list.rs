//! List segments
//!
//! Lists are laid out back to back in an arena. A list of `n` elements owns
//! `n` consecutive offsets, one per element, so an iterator or element
//! pointer into a list is an interior address. The collector collapses any
//! such address to the list head before deciding liveness.

use super::table::ArenaTable;
use super::{SegmentKind, SegmentOps};
use crate::address::{Address, SegmentId};

/// Arena of value lists
#[derive(Debug, Clone, Default)]
pub struct ListSegment {
    lists: ArenaTable<Vec<Address>>,
}

impl ListSegment {
    /// Create an empty list segment
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a list, returning the head offset
    pub fn allocate(&mut self, elements: Vec<Address>) -> u32 {
        let span = elements.len() as u32;
        self.lists.allocate(elements, span)
    }

    /// Place a list at a fixed head offset
    pub fn insert_at(&mut self, head: u32, elements: Vec<Address>) -> Result<(), Vec<Address>> {
        let span = elements.len() as u32;
        self.lists.insert_at(head, elements, span)
    }

    /// Elements of the list whose head is `head`
    pub fn list(&self, head: u32) -> Option<&[Address]> {
        self.lists.get(head).map(Vec::as_slice)
    }

    /// Elements of the list owning any offset
    pub fn list_containing(&self, offset: u32) -> Option<&[Address]> {
        self.lists.owner_of(offset).and_then(|head| self.list(head))
    }

    /// Overwrite one element in place
    pub fn set(&mut self, head: u32, index: usize, value: Address) -> Option<Address> {
        let slot = self.lists.get_mut(head)?.get_mut(index)?;
        Some(std::mem::replace(slot, value))
    }

    /// Live lists in head order
    pub fn lists(&self) -> impl Iterator<Item = (u32, &[Address])> + '_ {
        self.lists.iter().map(|(head, v)| (head, v.as_slice()))
    }

    /// Number of live lists
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Whether the segment holds no lists
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

impl SegmentOps for ListSegment {
    fn kind(&self) -> SegmentKind {
        SegmentKind::Lists
    }

    fn canonicalize(&self, addr: Address) -> Address {
        match self.lists.owner_of(addr.offset) {
            Some(head) => addr.with_offset(head),
            None => addr,
        }
    }

    fn outgoing_references(&self, addr: Address) -> Vec<Address> {
        self.list_containing(addr.offset)
            .map(|elements| elements.iter().copied().filter(|a| !a.is_null()).collect())
            .unwrap_or_default()
    }

    fn deallocatable_addresses(&self, own_id: SegmentId) -> Vec<Address> {
        self.lists.starts().map(|head| Address::new(own_id, head)).collect()
    }

    fn free(&mut self, addr: Address) {
        let head = self.canonicalize(addr).offset;
        if self.lists.free(head).is_none() {
            log::warn!("lists: freeing unallocated {}", addr);
        }
    }
}
