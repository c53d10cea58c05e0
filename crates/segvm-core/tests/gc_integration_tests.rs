//! Integration tests for the garbage collector
//!
//! Tests cover:
//! - Locked and unlocked script roots
//! - Fatal call stack shapes
//! - Interior pointer aliasing
//! - Operand stack handling
//! - Repeated collections

use segvm_core::gc::{run_gc, GcError};
use segvm_core::{
    Address, ExecFrame, ExecState, GcOptions, Heap, Object, SegmentId, SegmentKind, VarRef, Vm,
};

fn suspended_vm() -> Vm {
    let mut vm = Vm::new();
    vm.state_mut()
        .push_frame(ExecFrame::call(Address::NULL, Address::NULL, 0));
    vm
}

#[test]
fn test_locked_script_keeps_object_and_string() {
    let mut vm = suspended_vm();
    let script = vm.heap_mut().new_script(10).unwrap();
    let strings = vm.heap_mut().new_string_segment().unwrap();
    let text = vm.heap_mut().alloc_string(strings, "title").unwrap();
    let obj = vm
        .heap_mut()
        .add_script_object(script, Object::new(Address::NULL, vec![text]))
        .unwrap();
    vm.heap_mut().script_mut(script).unwrap().lock();

    let report = vm.collect_garbage().unwrap();

    assert_eq!(report.total_freed(), 0);
    assert!(vm.heap().object(obj).is_some());
    assert_eq!(vm.heap().get(strings).unwrap().live_count(), 1);
}

#[test]
fn test_unlocked_script_object_and_string_are_freed() {
    let mut vm = suspended_vm();
    let script = vm.heap_mut().new_script(10).unwrap();
    let strings = vm.heap_mut().new_string_segment().unwrap();
    let text = vm.heap_mut().alloc_string(strings, "title").unwrap();
    let obj = vm
        .heap_mut()
        .add_script_object(script, Object::new(Address::NULL, vec![text]))
        .unwrap();

    let report = vm.collect_garbage().unwrap();

    assert_eq!(report.freed_of(SegmentKind::Script), 1);
    assert_eq!(report.freed_of(SegmentKind::Strings), 1);
    assert_eq!(report.total_freed(), 2);
    assert!(vm.heap().object(obj).is_none());
}

#[test]
fn test_kernel_only_call_stack_is_fatal() {
    let mut vm = Vm::new();
    let strings = vm.heap_mut().new_string_segment().unwrap();
    vm.heap_mut().alloc_string(strings, "survivor").unwrap();
    vm.state_mut().push_frame(ExecFrame::kernel(0));

    let err = vm.collect_garbage().unwrap_err();

    assert_eq!(err, GcError::NoActiveFrame { depth: 1 });
    assert_eq!(vm.heap().get(strings).unwrap().live_count(), 1);
    assert_eq!(vm.stats().collections, 0);
}

#[test]
fn test_empty_call_stack_is_fatal() {
    let mut vm = Vm::new();
    assert_eq!(vm.collect_garbage().unwrap_err(), GcError::EmptyCallStack);
}

#[test]
fn test_interior_aliases_collapse_to_one_entry() {
    let mut vm = suspended_vm();
    let strings = vm.heap_mut().new_string_segment().unwrap();
    vm.heap_mut()
        .strings_mut(strings)
        .unwrap()
        .insert_at(5, "aliased text")
        .unwrap();

    vm.state_mut().acc = Address::new(strings, 5);
    vm.state_mut().prev = Address::new(strings, 9);

    let report = vm.collect_garbage().unwrap();

    assert_eq!(report.marked, 2);
    assert_eq!(report.reachable, 1);
    assert_eq!(report.total_freed(), 0);
}

#[test]
fn test_interior_list_pointer_keeps_elements() {
    let mut vm = suspended_vm();
    let lists = vm.heap_mut().new_list_segment().unwrap();
    let clones = vm.heap_mut().new_clone_table().unwrap();
    let a = vm.heap_mut().alloc_clone(clones, Object::default()).unwrap();
    let b = vm.heap_mut().alloc_clone(clones, Object::default()).unwrap();
    let head = vm.heap_mut().alloc_list(lists, vec![a, b]).unwrap();

    vm.state_mut().acc = head.with_offset(head.offset + 1);
    let report = vm.collect_garbage().unwrap();

    assert_eq!(report.total_freed(), 0);
    assert_eq!(report.reachable, 3);
}

#[test]
fn test_stack_address_is_not_traced() {
    let mut vm = suspended_vm();
    let stack = vm.state().stack_segment;
    let strings = vm.heap_mut().new_string_segment().unwrap();
    let text = vm.heap_mut().alloc_string(strings, "above sp").unwrap();

    // Slot 3 is above the active frame's sp, so only a trace through the
    // stack segment could reach it.
    vm.heap_mut().stack_mut(stack).unwrap().set(3, text).unwrap();
    vm.state_mut().acc = Address::new(stack, 3);

    let report = vm.collect_garbage().unwrap();

    assert_eq!(report.freed_of(SegmentKind::Strings), 1);
    assert_eq!(report.freed_of(SegmentKind::Stack), 0);
}

#[test]
fn test_active_window_respects_stack_base() {
    let mut vm = Vm::new();
    let stack = vm.state().stack_segment;
    let strings = vm.heap_mut().new_string_segment().unwrap();
    let below = vm.heap_mut().alloc_string(strings, "below").unwrap();
    let inside = vm.heap_mut().alloc_string(strings, "inside").unwrap();
    {
        let slots = vm.heap_mut().stack_mut(stack).unwrap();
        slots.set(0, below).unwrap();
        slots.set(2, inside).unwrap();
    }
    vm.state_mut().stack_base = 2;
    vm.state_mut()
        .push_frame(ExecFrame::call(Address::NULL, Address::NULL, 3));

    let plan = vm.plan().unwrap();
    assert_eq!(plan.reachable, vec![inside]);
    assert_eq!(plan.unreachable.len(), 1);
    assert_eq!(plan.unreachable[0].address, below);
}

#[test]
fn test_var_selector_frame_roots_variable_value() {
    let mut vm = suspended_vm();
    let clones = vm.heap_mut().new_clone_table().unwrap();
    let strings = vm.heap_mut().new_string_segment().unwrap();
    let text = vm.heap_mut().alloc_string(strings, "value").unwrap();
    let holder = vm
        .heap_mut()
        .alloc_clone(clones, Object::new(Address::NULL, vec![text]))
        .unwrap();

    vm.state_mut().push_frame(ExecFrame::var_selector(
        Address::NULL,
        Address::NULL,
        VarRef::new(holder, 0),
        0,
    ));

    let report = vm.collect_garbage().unwrap();

    // The variable's value is a root; the holder itself is not.
    assert_eq!(report.freed_of(SegmentKind::Strings), 0);
    assert_eq!(report.freed_of(SegmentKind::Clones), 1);
}

#[test]
fn test_every_frame_contributes_roots() {
    let mut vm = Vm::new();
    let clones = vm.heap_mut().new_clone_table().unwrap();
    let outer = vm.heap_mut().alloc_clone(clones, Object::default()).unwrap();
    let inner = vm.heap_mut().alloc_clone(clones, Object::default()).unwrap();
    let garbage = vm.heap_mut().alloc_clone(clones, Object::default()).unwrap();

    vm.state_mut().push_frame(ExecFrame::call(outer, outer, 0));
    vm.state_mut().push_frame(ExecFrame::call(inner, Address::NULL, 0));
    vm.state_mut().push_frame(ExecFrame::kernel(0));

    let report = vm.collect_garbage().unwrap();

    assert_eq!(report.freed_of(SegmentKind::Clones), 1);
    assert!(vm.heap().object(garbage).is_none());
    assert!(vm.heap().object(outer).is_some());
}

#[test]
fn test_class_reference_keeps_class_alive() {
    let mut vm = suspended_vm();
    let script = vm.heap_mut().new_script(1).unwrap();
    let clones = vm.heap_mut().new_clone_table().unwrap();
    let class = vm
        .heap_mut()
        .add_script_object(script, Object::default())
        .unwrap();
    let instance = vm
        .heap_mut()
        .alloc_clone(clones, Object::new(class, Vec::new()))
        .unwrap();
    vm.state_mut().acc = instance;

    let report = vm.collect_garbage().unwrap();
    assert_eq!(report.total_freed(), 0);
}

#[test]
fn test_second_pass_frees_nothing() {
    let mut vm = suspended_vm();
    let clones = vm.heap_mut().new_clone_table().unwrap();
    let strings = vm.heap_mut().new_string_segment().unwrap();
    let text = vm.heap_mut().alloc_string(strings, "kept").unwrap();
    let kept = vm
        .heap_mut()
        .alloc_clone(clones, Object::new(Address::NULL, vec![text]))
        .unwrap();
    vm.heap_mut().alloc_clone(clones, Object::default()).unwrap();
    vm.heap_mut().alloc_string(strings, "dropped").unwrap();
    vm.state_mut().acc = kept;

    let first = vm.collect_garbage().unwrap();
    let second = vm.collect_garbage().unwrap();

    assert_eq!(first.total_freed(), 2);
    assert_eq!(second.total_freed(), 0);
    assert_eq!(first.reachable, second.reachable);
    assert_eq!(vm.stats().collections, 2);
}

#[test]
fn test_released_segment_references_are_tolerated() {
    let mut vm = suspended_vm();
    let clones = vm.heap_mut().new_clone_table().unwrap();
    let gone = vm.heap_mut().new_string_segment().unwrap();
    let dangling = vm.heap_mut().alloc_string(gone, "gone").unwrap();
    let obj = vm
        .heap_mut()
        .alloc_clone(clones, Object::new(Address::NULL, vec![dangling]))
        .unwrap();
    vm.heap_mut().release_segment(gone).unwrap();
    vm.state_mut().acc = obj;
    vm.state_mut().prev = Address::new(SegmentId(900), 0);

    let report = vm.collect_garbage().unwrap();
    assert_eq!(report.total_freed(), 0);
    assert_eq!(report.reachable, 1);
}

#[test]
fn test_run_gc_without_vm() {
    let (mut heap, stack) = Heap::with_stack(4);
    let lists = heap.new_list_segment().unwrap();
    heap.alloc_list(lists, vec![Address::scalar(1)]).unwrap();
    let mut state = ExecState::new(stack);
    state.push_frame(ExecFrame::call(Address::NULL, Address::NULL, 0));

    let report = run_gc(&mut heap, &state, &GcOptions::default()).unwrap();
    assert_eq!(report.freed_of(SegmentKind::Lists), 1);
}
