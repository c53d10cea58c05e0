//! Segvm Core Runtime
//!
//! This crate provides the memory side of the segvm virtual machine:
//! - Segment-addressed values (`Address`)
//! - The segmented heap and its per-kind segments
//! - Execution state as seen by the collector (registers, call frames)
//! - The stop-the-world tracing garbage collector
//! - JSON heap snapshots and debugger-style inspection

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod address;
pub mod defaults;
pub mod gc;
pub mod heap;
pub mod segment;
pub mod snapshot;
pub mod stack;
pub mod vm;

pub use address::{Address, SegmentId, VarRef};
pub use gc::{GarbageCollector, GcError, GcOptions, GcPhase, GcPlan, GcReport, GcResult, GcStats};
pub use heap::Heap;
pub use segment::{
    CloneTable, ListSegment, Object, ScriptSegment, Segment, SegmentKind, SegmentOps,
    StackSegment, StringSegment,
};
pub use snapshot::{HeapSnapshot, SnapshotError};
pub use stack::{ExecFrame, ExecState, FrameKind};
pub use vm::Vm;

/// Heap manipulation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeapError {
    /// Segment id is out of range or its slot is empty
    #[error("No segment {0}")]
    NoSuchSegment(SegmentId),

    /// Segment exists but holds a different kind of object
    #[error("Segment {id} is a {found} segment, expected {expected}")]
    WrongKind {
        /// Segment that was looked up
        id: SegmentId,
        /// Kind the caller asked for
        expected: SegmentKind,
        /// Kind actually stored in the slot
        found: SegmentKind,
    },

    /// Segment id 0 is reserved for scalars
    #[error("Segment id 0 is reserved")]
    ReservedSegment,

    /// All segment ids are in use
    #[error("Segment table is full")]
    SegmentTableFull,

    /// Slot already holds a segment
    #[error("Segment {0} is already in use")]
    SegmentInUse(SegmentId),

    /// Offset is already occupied inside a segment
    #[error("Offset {offset:#06x} already in use in segment {segment}")]
    OffsetInUse {
        /// Segment being written
        segment: SegmentId,
        /// Offending offset
        offset: u32,
    },

    /// No live object at this address
    #[error("No object at {0}")]
    NoSuchObject(Address),

    /// Index past the end of a stack, list or variable block
    #[error("Index {index} out of bounds (length {len})")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Length of the indexed storage
        len: usize,
    },
}

/// Heap manipulation result
pub type HeapResult<T> = Result<T, HeapError>;
