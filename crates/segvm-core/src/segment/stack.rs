//! The operand stack segment
//!
//! The VM's evaluation stack lives in the heap like any other segment so
//! that stack addresses can be handed around as values. It is not traced:
//! the root collector scans the active window directly, and the stack
//! owns nothing the sweep could free.

use super::{SegmentKind, SegmentOps};
use crate::address::{Address, SegmentId};
use crate::{HeapError, HeapResult};

/// Fixed-size operand stack storage
#[derive(Debug, Clone)]
pub struct StackSegment {
    slots: Vec<Address>,
}

impl StackSegment {
    /// Create a stack of `size` null slots
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![Address::NULL; size],
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the stack has no slots at all
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Read one slot
    pub fn get(&self, index: usize) -> Option<Address> {
        self.slots.get(index).copied()
    }

    /// Write one slot
    ///
    /// # Errors
    ///
    /// Returns `HeapError::IndexOutOfBounds` past the end of the stack.
    pub fn set(&mut self, index: usize, value: Address) -> HeapResult<()> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(HeapError::IndexOutOfBounds { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Slots `base..sp`, or `None` if the window is not inside the stack
    pub fn window(&self, base: usize, sp: usize) -> Option<&[Address]> {
        self.slots.get(base..sp)
    }

    /// All slots
    pub fn slots(&self) -> &[Address] {
        &self.slots
    }
}

impl SegmentOps for StackSegment {
    fn kind(&self) -> SegmentKind {
        SegmentKind::Stack
    }

    fn canonicalize(&self, addr: Address) -> Address {
        addr
    }

    /// The value held in the addressed slot
    ///
    /// The collector never asks for this; operands only count as roots
    /// inside the active window.
    fn outgoing_references(&self, addr: Address) -> Vec<Address> {
        self.get(addr.offset as usize)
            .filter(|value| !value.is_null())
            .into_iter()
            .collect()
    }

    fn deallocatable_addresses(&self, _own_id: SegmentId) -> Vec<Address> {
        Vec::new()
    }

    fn free(&mut self, addr: Address) {
        log::warn!("stack: refusing to free {}", addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds() {
        let stack = StackSegment::new(8);
        assert_eq!(stack.window(0, 8).map(<[_]>::len), Some(8));
        assert_eq!(stack.window(2, 2).map(<[_]>::len), Some(0));
        assert!(stack.window(0, 9).is_none());
        assert!(stack.window(5, 3).is_none());
    }

    #[test]
    fn test_set_out_of_bounds() {
        let mut stack = StackSegment::new(2);
        stack.set(1, Address::scalar(3)).unwrap();
        assert_eq!(stack.get(1), Some(Address::scalar(3)));
        assert_eq!(
            stack.set(2, Address::NULL),
            Err(HeapError::IndexOutOfBounds { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_outgoing_is_slot_value() {
        let mut stack = StackSegment::new(4);
        let value = Address::new(SegmentId(3), 2);
        stack.set(1, value).unwrap();
        stack.set(2, Address::scalar(9)).unwrap();

        assert_eq!(stack.outgoing_references(Address::new(SegmentId(1), 1)), vec![value]);
        assert!(stack.outgoing_references(Address::new(SegmentId(1), 2)).is_empty());
        assert!(stack.outgoing_references(Address::new(SegmentId(1), 7)).is_empty());
    }

    #[test]
    fn test_stack_owns_nothing_deallocatable() {
        let stack = StackSegment::new(4);
        assert!(stack.deallocatable_addresses(SegmentId(1)).is_empty());
    }
}
