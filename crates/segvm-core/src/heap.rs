//! Segmented heap
//!
//! The heap is a table of segment slots indexed by [`SegmentId`]. Slot 0 is
//! reserved so that segment-0 addresses can stand for scalars. A slot
//! becomes empty when its segment is released; ids are never reassigned
//! while addresses into the old segment may still be around.

use crate::address::{Address, SegmentId, VarRef};
use crate::defaults::{INITIAL_SEGMENT_CAPACITY, MAX_SEGMENT_ID};
use crate::segment::{
    CloneTable, ListSegment, Object, ScriptSegment, Segment, SegmentKind, SegmentOps,
    StackSegment, StringSegment,
};
use crate::{HeapError, HeapResult};
use std::fmt;

/// Table of heap segments
#[derive(Clone)]
pub struct Heap {
    /// Segment slots (index 0 always empty)
    segments: Vec<Option<Segment>>,
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        let mut segments = Vec::with_capacity(INITIAL_SEGMENT_CAPACITY);
        segments.push(None);
        Self { segments }
    }

    /// Create a heap whose first segment is an operand stack of `size` slots
    pub fn with_stack(size: usize) -> (Self, SegmentId) {
        let mut heap = Self::new();
        heap.segments.push(Some(StackSegment::new(size).into()));
        (heap, SegmentId(1))
    }

    /// Highest segment id ever assigned (0 if none)
    pub fn max_segment_id(&self) -> SegmentId {
        SegmentId((self.segments.len() - 1) as u16)
    }

    /// Segment in a slot
    ///
    /// Out-of-range ids and empty slots both yield `None`.
    #[inline]
    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id.index()).and_then(Option::as_ref)
    }

    /// Segment in a slot, mutably
    #[inline]
    pub fn get_mut(&mut self, id: SegmentId) -> Option<&mut Segment> {
        self.segments.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Whether a slot holds a segment
    pub fn contains(&self, id: SegmentId) -> bool {
        self.get(id).is_some()
    }

    /// Kind of the segment `addr` points into
    pub fn kind_of(&self, addr: Address) -> Option<SegmentKind> {
        self.get(addr.segment).map(|s| s.kind())
    }

    /// Iterate over occupied slots in id order
    pub fn segments(&self) -> impl Iterator<Item = (SegmentId, &Segment)> + '_ {
        self.segments
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (SegmentId(i as u16), s)))
    }

    /// Add a segment in the next free id
    ///
    /// # Errors
    ///
    /// Returns `HeapError::SegmentTableFull` once every id is taken.
    pub fn allocate_segment(&mut self, segment: impl Into<Segment>) -> HeapResult<SegmentId> {
        if self.segments.len() > MAX_SEGMENT_ID as usize {
            return Err(HeapError::SegmentTableFull);
        }
        let id = SegmentId(self.segments.len() as u16);
        let segment = segment.into();
        log::trace!("heap: new {} segment {}", segment.kind(), id);
        self.segments.push(Some(segment));
        Ok(id)
    }

    /// Place a segment at a specific id, growing the table with empty slots
    pub fn insert_segment(&mut self, id: SegmentId, segment: impl Into<Segment>) -> HeapResult<()> {
        if id.is_null() {
            return Err(HeapError::ReservedSegment);
        }
        if id.index() >= self.segments.len() {
            self.segments.resize_with(id.index() + 1, || None);
        }
        let slot = &mut self.segments[id.index()];
        if slot.is_some() {
            return Err(HeapError::SegmentInUse(id));
        }
        *slot = Some(segment.into());
        Ok(())
    }

    /// Empty a slot, returning the segment that was in it
    pub fn release_segment(&mut self, id: SegmentId) -> HeapResult<Segment> {
        self.segments
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(HeapError::NoSuchSegment(id))
    }

    // ========================================================================
    // Typed helpers
    // ========================================================================

    /// Create a script segment
    pub fn new_script(&mut self, number: u16) -> HeapResult<SegmentId> {
        self.allocate_segment(ScriptSegment::new(number))
    }

    /// Create a clone table
    pub fn new_clone_table(&mut self) -> HeapResult<SegmentId> {
        self.allocate_segment(CloneTable::new())
    }

    /// Create a list segment
    pub fn new_list_segment(&mut self) -> HeapResult<SegmentId> {
        self.allocate_segment(ListSegment::new())
    }

    /// Create a string segment
    pub fn new_string_segment(&mut self) -> HeapResult<SegmentId> {
        self.allocate_segment(StringSegment::new())
    }

    /// Create the operand stack segment
    pub fn new_stack(&mut self, size: usize) -> HeapResult<SegmentId> {
        self.allocate_segment(StackSegment::new(size))
    }

    fn wrong_kind(id: SegmentId, expected: SegmentKind, found: &Segment) -> HeapError {
        HeapError::WrongKind {
            id,
            expected,
            found: found.kind(),
        }
    }

    /// Borrow a script segment mutably
    pub fn script_mut(&mut self, id: SegmentId) -> HeapResult<&mut ScriptSegment> {
        match self.get_mut(id) {
            Some(Segment::Script(s)) => Ok(s),
            Some(other) => Err(Self::wrong_kind(id, SegmentKind::Script, other)),
            None => Err(HeapError::NoSuchSegment(id)),
        }
    }

    /// Borrow a clone table mutably
    pub fn clones_mut(&mut self, id: SegmentId) -> HeapResult<&mut CloneTable> {
        match self.get_mut(id) {
            Some(Segment::Clones(c)) => Ok(c),
            Some(other) => Err(Self::wrong_kind(id, SegmentKind::Clones, other)),
            None => Err(HeapError::NoSuchSegment(id)),
        }
    }

    /// Borrow a list segment mutably
    pub fn lists_mut(&mut self, id: SegmentId) -> HeapResult<&mut ListSegment> {
        match self.get_mut(id) {
            Some(Segment::Lists(l)) => Ok(l),
            Some(other) => Err(Self::wrong_kind(id, SegmentKind::Lists, other)),
            None => Err(HeapError::NoSuchSegment(id)),
        }
    }

    /// Borrow a string segment mutably
    pub fn strings_mut(&mut self, id: SegmentId) -> HeapResult<&mut StringSegment> {
        match self.get_mut(id) {
            Some(Segment::Strings(s)) => Ok(s),
            Some(other) => Err(Self::wrong_kind(id, SegmentKind::Strings, other)),
            None => Err(HeapError::NoSuchSegment(id)),
        }
    }

    /// Borrow the stack segment mutably
    pub fn stack_mut(&mut self, id: SegmentId) -> HeapResult<&mut StackSegment> {
        match self.get_mut(id) {
            Some(Segment::Stack(s)) => Ok(s),
            Some(other) => Err(Self::wrong_kind(id, SegmentKind::Stack, other)),
            None => Err(HeapError::NoSuchSegment(id)),
        }
    }

    /// Define an object in a script, returning its address
    pub fn add_script_object(&mut self, script: SegmentId, object: Object) -> HeapResult<Address> {
        let offset = self.script_mut(script)?.add_object(object);
        Ok(Address::new(script, offset))
    }

    /// Clone an object into a clone table, returning its address
    pub fn alloc_clone(&mut self, table: SegmentId, object: Object) -> HeapResult<Address> {
        let offset = self.clones_mut(table)?.allocate(object);
        Ok(Address::new(table, offset))
    }

    /// Allocate a list, returning the head address
    pub fn alloc_list(&mut self, segment: SegmentId, elements: Vec<Address>) -> HeapResult<Address> {
        let head = self.lists_mut(segment)?.allocate(elements);
        Ok(Address::new(segment, head))
    }

    /// Allocate a string, returning its start address
    pub fn alloc_string(&mut self, segment: SegmentId, bytes: impl Into<Vec<u8>>) -> HeapResult<Address> {
        let start = self.strings_mut(segment)?.allocate(bytes);
        Ok(Address::new(segment, start))
    }

    /// Object stored at an address
    pub fn object(&self, addr: Address) -> Option<&Object> {
        self.get(addr.segment)?.object(addr)
    }

    /// Write one variable of an object
    pub fn set_variable(&mut self, object: Address, index: usize, value: Address) -> HeapResult<()> {
        let obj = self
            .get_mut(object.segment)
            .and_then(|s| s.object_mut(object))
            .ok_or(HeapError::NoSuchObject(object))?;
        let len = obj.variables.len();
        let slot = obj
            .variables
            .get_mut(index)
            .ok_or(HeapError::IndexOutOfBounds { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Read the variable a [`VarRef`] points at
    ///
    /// Returns `None` when the pointer is stale: the segment is gone, the
    /// object was freed, or the index is past its variable block.
    pub fn resolve_var(&self, var: VarRef) -> Option<Address> {
        self.object(var.object)?.variables.get(var.index).copied()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Heap (max id {})", self.max_segment_id())?;
        for (id, segment) in self.segments() {
            writeln!(f, "  {} {:<8} {} live", id, segment.kind(), segment.live_count())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_starts_empty() {
        let heap = Heap::new();
        assert_eq!(heap.max_segment_id(), SegmentId(0));
        assert!(heap.get(SegmentId(0)).is_none());
        assert!(heap.get(SegmentId(42)).is_none());
    }

    #[test]
    fn test_ids_start_at_one() {
        let mut heap = Heap::new();
        let stack = heap.new_stack(16).unwrap();
        let script = heap.new_script(0).unwrap();
        assert_eq!(stack, SegmentId(1));
        assert_eq!(script, SegmentId(2));
        assert_eq!(heap.max_segment_id(), SegmentId(2));
    }

    #[test]
    fn test_released_slot_stays_empty() {
        let mut heap = Heap::new();
        let a = heap.new_string_segment().unwrap();
        heap.release_segment(a).unwrap();
        assert!(!heap.contains(a));
        assert_eq!(heap.release_segment(a).unwrap_err(), HeapError::NoSuchSegment(a));

        let b = heap.new_string_segment().unwrap();
        assert_ne!(a, b);
        assert_eq!(heap.max_segment_id(), b);
    }

    #[test]
    fn test_insert_segment_at_id() {
        let mut heap = Heap::new();
        heap.insert_segment(SegmentId(5), CloneTable::new()).unwrap();
        assert_eq!(heap.max_segment_id(), SegmentId(5));
        assert!(heap.get(SegmentId(3)).is_none());
        assert_eq!(
            heap.insert_segment(SegmentId(5), CloneTable::new()),
            Err(HeapError::SegmentInUse(SegmentId(5)))
        );
        assert_eq!(
            heap.insert_segment(SegmentId(0), CloneTable::new()),
            Err(HeapError::ReservedSegment)
        );
    }

    #[test]
    fn test_wrong_kind() {
        let mut heap = Heap::new();
        let strings = heap.new_string_segment().unwrap();
        let err = heap.script_mut(strings).unwrap_err();
        assert_eq!(
            err,
            HeapError::WrongKind {
                id: strings,
                expected: SegmentKind::Script,
                found: SegmentKind::Strings,
            }
        );
    }

    #[test]
    fn test_resolve_var() {
        let mut heap = Heap::new();
        let script = heap.new_script(1).unwrap();
        let strings = heap.new_string_segment().unwrap();
        let text = heap.alloc_string(strings, "name").unwrap();
        let obj = heap
            .add_script_object(script, Object::new(Address::NULL, vec![Address::NULL, text]))
            .unwrap();

        assert_eq!(heap.resolve_var(VarRef::new(obj, 1)), Some(text));
        assert_eq!(heap.resolve_var(VarRef::new(obj, 2)), None);
        assert_eq!(heap.resolve_var(VarRef::new(text, 0)), None);

        heap.set_variable(obj, 0, Address::scalar(9)).unwrap();
        assert_eq!(heap.resolve_var(VarRef::new(obj, 0)), Some(Address::scalar(9)));
    }
}
