//! Garbage collection system
//!
//! This module provides the stop-the-world tracing collector for the
//! segmented heap.
//!
//! # Architecture
//!
//! A pass runs five strictly sequential phases:
//!
//! - **RootCollection**: [`RootSet`] gathers registers, the active operand
//!   stack window, call frame objects and locked script objects
//! - **Mark**: the [`Worklist`] is drained, asking each visited address's
//!   segment for its one-hop references (the stack segment is skipped)
//! - **Normalize**: every raw address visited is mapped to its canonical
//!   address, collapsing interior pointers into strings and lists
//! - **Sweep**: each segment's deallocatable addresses not in the
//!   canonical reachable set are freed and counted per kind
//! - back to **Idle**
//!
//! ```text
//!   Idle ─▶ RootCollection ─▶ Mark ─▶ Normalize ─▶ Sweep ─▶ Idle
//!                 │
//!                 └─ GcError (nothing freed)
//! ```
//!
//! # Example
//!
//! ```
//! use segvm_core::{Address, ExecFrame, Vm};
//!
//! let mut vm = Vm::new();
//! let strings = vm.heap_mut().new_string_segment().unwrap();
//! let _garbage = vm.heap_mut().alloc_string(strings, "unused").unwrap();
//! vm.state_mut().push_frame(ExecFrame::call(Address::NULL, Address::NULL, 0));
//!
//! let report = vm.collect_garbage().unwrap();
//! assert_eq!(report.total_freed(), 1);
//! ```

mod collector;
pub mod inspect;
mod report;
mod roots;
mod worklist;

pub use collector::{run_gc, GarbageCollector, GcStats};
pub use report::{FreedObject, GcPlan, GcReport};
pub use roots::{active_frame, RootSet};
pub use worklist::Worklist;

use crate::address::SegmentId;
use std::fmt;

/// Fatal collection errors
///
/// Any of these means the VM state cannot be trusted to enumerate its
/// roots. The pass stops before the sweep, so nothing has been freed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GcError {
    /// Collection started with no frames on the call stack
    #[error("Call stack is empty")]
    EmptyCallStack,

    /// No method frame owns the operand stack
    #[error("No active frame below kernel call (call depth {depth})")]
    NoActiveFrame {
        /// Call stack depth at collection time
        depth: usize,
    },

    /// The execution state names a slot that is not the operand stack
    #[error("Stack segment {0} is missing")]
    MissingStackSegment(SegmentId),

    /// The active operand window runs past the end of the stack segment
    ///
    /// An inverted window (`sp <= base`) is empty rather than an error.
    #[error("Stack window {base}..{sp} outside stack of {len} slots")]
    StackWindow {
        /// Stack base
        base: usize,
        /// Active frame's stack pointer
        sp: usize,
        /// Stack segment size
        len: usize,
    },
}

/// Collection result
pub type GcResult<T> = Result<T, GcError>;

/// Collector configuration
#[derive(Debug, Clone)]
pub struct GcOptions {
    /// Log the heap layout before and after each pass (trace level)
    pub dump_heap: bool,

    /// Accumulate [`GcStats`] across passes
    pub track_stats: bool,
}

impl Default for GcOptions {
    fn default() -> Self {
        Self {
            dump_heap: false,
            track_stats: true,
        }
    }
}

/// Phase of the collector's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GcPhase {
    /// No pass in progress
    #[default]
    Idle,
    /// Gathering roots
    RootCollection,
    /// Draining the worklist
    Mark,
    /// Canonicalizing visited addresses
    Normalize,
    /// Freeing unreachable objects
    Sweep,
}

impl fmt::Display for GcPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GcPhase::Idle => "idle",
            GcPhase::RootCollection => "root collection",
            GcPhase::Mark => "mark",
            GcPhase::Normalize => "normalize",
            GcPhase::Sweep => "sweep",
        };
        f.write_str(name)
    }
}
