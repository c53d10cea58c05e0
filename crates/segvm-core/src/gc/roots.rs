//! GC root gathering
//!
//! Roots are the starting points for tracing. They come from exactly four
//! places and all four must be scanned:
//! - The accumulator and previous-value registers
//! - The operand stack window of the active frame
//! - Caller, send target and variable pointer of every non-kernel frame
//! - Every object of every explicitly loaded (locked) script

use super::{GcError, GcResult};
use crate::address::Address;
use crate::heap::Heap;
use crate::segment::Segment;
use crate::stack::{ExecFrame, ExecState};

/// Root set for one collection pass
///
/// Each source keeps its own list so a pass can report where its roots
/// came from. Scalars are filtered on insertion.
#[derive(Debug, Default)]
pub struct RootSet {
    /// Register roots
    register_roots: Vec<Address>,

    /// Operand stack roots
    stack_roots: Vec<Address>,

    /// Call frame roots
    frame_roots: Vec<Address>,

    /// Locked script roots
    script_roots: Vec<Address>,
}

impl RootSet {
    /// Create an empty root set
    pub fn new() -> Self {
        Self::default()
    }

    /// Gather the roots of a suspended VM
    ///
    /// # Errors
    ///
    /// Fails when no frame owns the operand stack (empty call stack, or a
    /// kernel frame with no method frame beneath it) or when the active
    /// stack window does not fit in the stack segment. Nothing should be
    /// swept after such an error.
    pub fn gather(heap: &Heap, state: &ExecState) -> GcResult<Self> {
        let mut roots = RootSet::new();

        roots.add_register_root(state.acc);
        roots.add_register_root(state.prev);

        roots.scan_active_stack(heap, state)?;
        roots.scan_frames(heap, state);
        roots.scan_locked_scripts(heap);

        log::debug!(
            "gc roots: {} registers, {} stack, {} frames, {} scripts",
            roots.register_roots.len(),
            roots.stack_roots.len(),
            roots.frame_roots.len(),
            roots.script_roots.len()
        );
        Ok(roots)
    }

    /// Add a register root
    pub fn add_register_root(&mut self, value: Address) {
        if !value.is_null() {
            self.register_roots.push(value);
        }
    }

    /// Add an operand stack root
    pub fn add_stack_root(&mut self, value: Address) {
        if !value.is_null() {
            self.stack_roots.push(value);
        }
    }

    /// Add a call frame root
    pub fn add_frame_root(&mut self, value: Address) {
        if !value.is_null() {
            self.frame_roots.push(value);
        }
    }

    /// Add a locked script root
    pub fn add_script_root(&mut self, value: Address) {
        if !value.is_null() {
            self.script_roots.push(value);
        }
    }

    fn scan_active_stack(&mut self, heap: &Heap, state: &ExecState) -> GcResult<()> {
        let frame = active_frame(state.frames())?;

        let stack = heap
            .get(state.stack_segment)
            .and_then(Segment::as_stack)
            .ok_or(GcError::MissingStackSegment(state.stack_segment))?;

        // sp at or below the base leaves nothing pushed in this window
        if frame.sp <= state.stack_base {
            return Ok(());
        }

        let window = stack
            .window(state.stack_base, frame.sp)
            .ok_or(GcError::StackWindow {
                base: state.stack_base,
                sp: frame.sp,
                len: stack.len(),
            })?;

        for &value in window {
            self.add_stack_root(value);
        }
        Ok(())
    }

    fn scan_frames(&mut self, heap: &Heap, state: &ExecState) {
        for frame in state.frames().iter().rev().filter(|f| !f.is_kernel()) {
            self.add_frame_root(frame.caller);
            self.add_frame_root(frame.send_target);

            if let Some(var) = frame.var_pointer {
                match heap.resolve_var(var) {
                    Some(value) => self.add_frame_root(value),
                    None => log::debug!(
                        "gc roots: stale var pointer {}[{}] skipped",
                        var.object,
                        var.index
                    ),
                }
            }
        }
    }

    fn scan_locked_scripts(&mut self, heap: &Heap) {
        for (id, segment) in heap.segments() {
            let Some(script) = segment.as_script() else {
                continue;
            };
            if script.lock_count() == 0 {
                continue;
            }
            for addr in script.exposed_references(id) {
                self.add_script_root(addr);
            }
        }
    }

    /// Iterate over all roots
    pub fn iter(&self) -> impl Iterator<Item = Address> + '_ {
        self.register_roots
            .iter()
            .chain(self.stack_roots.iter())
            .chain(self.frame_roots.iter())
            .chain(self.script_roots.iter())
            .copied()
    }

    /// Get total number of roots (duplicates included)
    pub fn len(&self) -> usize {
        self.register_roots.len()
            + self.stack_roots.len()
            + self.frame_roots.len()
            + self.script_roots.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The frame whose operands are on the stack
///
/// A kernel frame on top owns no operands, so the frame beneath it is the
/// active one. Two kernel frames in a row, or a kernel frame alone, means
/// the call stack is corrupt.
pub fn active_frame(frames: &[ExecFrame]) -> GcResult<&ExecFrame> {
    let mut newest_first = frames.iter().rev();
    let top = newest_first.next().ok_or(GcError::EmptyCallStack)?;
    if !top.is_kernel() {
        return Ok(top);
    }
    match newest_first.next() {
        Some(frame) if !frame.is_kernel() => Ok(frame),
        _ => Err(GcError::NoActiveFrame {
            depth: frames.len(),
        }),
    }
}
