//! Default constants for heap and collector configuration.
//!
//! Centralizes sizes that the heap, the VM wrapper and the snapshot loader
//! would otherwise each hard-code.

/// Default operand stack size in slots.
pub const DEFAULT_STACK_SIZE: usize = 0x1000;

/// Highest segment id the heap hands out.
pub const MAX_SEGMENT_ID: u16 = u16::MAX;

/// Initial capacity of the segment table.
pub const INITIAL_SEGMENT_CAPACITY: usize = 64;

/// Initial capacity of the collector's pending worklist.
pub const INITIAL_WORKLIST_CAPACITY: usize = 256;

/// Largest stack a snapshot may declare, in slots.
pub const MAX_STACK_SIZE: usize = 0x10_0000;

/// Highest object offset a snapshot may place in a script or clone table.
///
/// Slot tables are dense, so an offset costs memory for every slot below it.
pub const MAX_SLOT_OFFSET: u32 = 0xF_FFFF;
