//! Read-only heap inspection
//!
//! These helpers expose the collector's per-address view of the heap
//! without running a pass. None of them mutate anything.

use super::collector::GarbageCollector;
use super::{GcOptions, GcPlan, GcResult};
use crate::address::{Address, SegmentId};
use crate::heap::Heap;
use crate::segment::{SegmentKind, SegmentOps};
use crate::stack::ExecState;

/// Canonical form of an address
///
/// Scalars are returned unchanged. `None` means the address points into a
/// segment that no longer exists.
pub fn normalize(heap: &Heap, addr: Address) -> Option<Address> {
    if addr.is_null() {
        return Some(addr);
    }
    heap.get(addr.segment).map(|s| s.canonicalize(addr))
}

/// One-hop references held by the object at `addr`
///
/// Empty for scalars, the operand stack and missing segments, matching
/// what the mark phase would follow.
pub fn outgoing(heap: &Heap, addr: Address) -> Vec<Address> {
    match heap.get(addr.segment) {
        Some(segment) if segment.kind() != SegmentKind::Stack => {
            segment.outgoing_references(addr)
        }
        _ => Vec::new(),
    }
}

/// Every address the sweep would consider in one segment
pub fn freeable(heap: &Heap, id: SegmentId) -> Option<Vec<Address>> {
    heap.get(id).map(|s| s.deallocatable_addresses(id))
}

/// Dry run: what a collection would keep and free right now
pub fn plan(heap: &Heap, state: &ExecState) -> GcResult<GcPlan> {
    GarbageCollector::new(GcOptions::default()).plan(heap, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Object;
    use crate::stack::ExecFrame;
    use crate::GcError;

    #[test]
    fn test_normalize_interior_string_offset() {
        let mut heap = Heap::new();
        let strings = heap.new_string_segment().unwrap();
        let start = heap.alloc_string(strings, "hello").unwrap();

        assert_eq!(normalize(&heap, start.with_offset(start.offset + 3)), Some(start));
        assert_eq!(normalize(&heap, Address::scalar(5)), Some(Address::scalar(5)));
        assert_eq!(normalize(&heap, Address::new(SegmentId(77), 0)), None);
    }

    #[test]
    fn test_outgoing_follows_objects_not_stack() {
        let mut heap = Heap::new();
        let stack = heap.new_stack(4).unwrap();
        let clones = heap.new_clone_table().unwrap();
        let strings = heap.new_string_segment().unwrap();
        let text = heap.alloc_string(strings, "x").unwrap();
        let obj = heap
            .alloc_clone(clones, Object::new(Address::NULL, vec![text, Address::scalar(1)]))
            .unwrap();
        heap.stack_mut(stack).unwrap().set(0, obj).unwrap();

        assert_eq!(outgoing(&heap, obj), vec![text]);
        assert!(outgoing(&heap, text).is_empty());
        assert!(outgoing(&heap, Address::new(stack, 0)).is_empty());
    }

    #[test]
    fn test_freeable_lists_live_entries() {
        let mut heap = Heap::new();
        let stack = heap.new_stack(4).unwrap();
        let lists = heap.new_list_segment().unwrap();
        let a = heap.alloc_list(lists, vec![Address::scalar(1), Address::scalar(2)]).unwrap();
        let b = heap.alloc_list(lists, Vec::new()).unwrap();

        assert_eq!(freeable(&heap, lists), Some(vec![a, b]));
        assert_eq!(freeable(&heap, stack), Some(Vec::new()));
        assert_eq!(freeable(&heap, SegmentId(9)), None);
    }

    #[test]
    fn test_plan_reports_errors() {
        let mut heap = Heap::new();
        let stack = heap.new_stack(4).unwrap();
        let mut state = ExecState::new(stack);
        state.push_frame(ExecFrame::kernel(0));
        assert_eq!(
            plan(&heap, &state).unwrap_err(),
            GcError::NoActiveFrame { depth: 1 }
        );
    }
}
