//! JSON heap snapshots
//!
//! A snapshot is a self-contained description of a suspended VM: every
//! segment with its contents at explicit offsets, plus the execution
//! state. Snapshots are what the `segvm` tool loads, and they make heap
//! fixtures easy to write by hand.
//!
//! ```json
//! {
//!   "segments": [
//!     { "kind": "stack", "id": 1, "size": 16, "slots": ["0003:0000"] },
//!     { "kind": "script", "id": 2, "number": 100, "lockers": 1,
//!       "objects": [{ "offset": 0, "variables": ["0003:0000"] }] },
//!     { "kind": "strings", "id": 3, "strings": [{ "offset": 0, "text": "hi" }] }
//!   ],
//!   "state": {
//!     "stack_segment": 1,
//!     "frames": [{ "kind": "normal", "sp": 1 }]
//!   }
//! }
//! ```

use crate::address::{Address, SegmentId};
use crate::defaults::{MAX_SLOT_OFFSET, MAX_STACK_SIZE};
use crate::gc::GcOptions;
use crate::heap::Heap;
use crate::segment::{
    CloneTable, ListSegment, Object, ScriptSegment, Segment, StackSegment, StringSegment,
};
use crate::stack::ExecState;
use crate::vm::Vm;
use crate::HeapError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Snapshot loading errors
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Malformed JSON or unknown fields
    #[error("Invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot file could not be read
    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    /// Contents do not fit the heap (duplicate ids or offsets)
    #[error(transparent)]
    Heap(#[from] HeapError),

    /// More initial stack values than stack slots
    #[error("Stack segment {segment} has {size} slots but {given} values")]
    StackOverflow {
        /// Stack segment id
        segment: SegmentId,
        /// Declared size
        size: usize,
        /// Number of values given
        given: usize,
    },

    /// A size or offset too large to load
    #[error("Segment {segment}: {what} {value} exceeds limit {limit}")]
    LimitExceeded {
        /// Segment being built
        segment: SegmentId,
        /// What was out of range
        what: &'static str,
        /// Value found in the snapshot
        value: u64,
        /// Largest accepted value
        limit: u64,
    },
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// One object at a fixed offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectSnapshot {
    /// Offset in its segment
    pub offset: u32,
    /// Class reference
    #[serde(default, skip_serializing_if = "is_null")]
    pub class: Address,
    /// Property values
    #[serde(default)]
    pub variables: Vec<Address>,
}

/// One list at its head offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListSnapshot {
    /// Head offset
    pub offset: u32,
    /// Elements
    #[serde(default)]
    pub elements: Vec<Address>,
}

/// One string at its start offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StringSnapshot {
    /// Start offset
    pub offset: u32,
    /// Contents (non-UTF-8 bytes are replaced on capture)
    pub text: String,
}

/// Contents of one segment slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum SegmentSnapshot {
    /// Script segment
    Script {
        /// Slot id
        id: SegmentId,
        /// Script resource number
        #[serde(default)]
        number: u16,
        /// Lock count
        #[serde(default)]
        lockers: u32,
        /// Defined objects
        #[serde(default)]
        objects: Vec<ObjectSnapshot>,
    },
    /// Clone table
    Clones {
        /// Slot id
        id: SegmentId,
        /// Live clones
        #[serde(default)]
        objects: Vec<ObjectSnapshot>,
    },
    /// List arena
    Lists {
        /// Slot id
        id: SegmentId,
        /// Live lists
        #[serde(default)]
        lists: Vec<ListSnapshot>,
    },
    /// String arena
    Strings {
        /// Slot id
        id: SegmentId,
        /// Live strings
        #[serde(default)]
        strings: Vec<StringSnapshot>,
    },
    /// Operand stack
    Stack {
        /// Slot id
        id: SegmentId,
        /// Number of slots
        size: usize,
        /// Values of the lowest slots; the rest are null
        #[serde(default)]
        slots: Vec<Address>,
    },
}

impl SegmentSnapshot {
    /// Slot id this segment goes in
    pub fn id(&self) -> SegmentId {
        match self {
            SegmentSnapshot::Script { id, .. }
            | SegmentSnapshot::Clones { id, .. }
            | SegmentSnapshot::Lists { id, .. }
            | SegmentSnapshot::Strings { id, .. }
            | SegmentSnapshot::Stack { id, .. } => *id,
        }
    }

    fn capture(id: SegmentId, segment: &Segment) -> Self {
        match segment {
            Segment::Script(script) => SegmentSnapshot::Script {
                id,
                number: script.number(),
                lockers: script.lock_count(),
                objects: script.objects().map(capture_object).collect(),
            },
            Segment::Clones(clones) => SegmentSnapshot::Clones {
                id,
                objects: clones.objects().map(capture_object).collect(),
            },
            Segment::Lists(lists) => SegmentSnapshot::Lists {
                id,
                lists: lists
                    .lists()
                    .map(|(offset, elements)| ListSnapshot {
                        offset,
                        elements: elements.to_vec(),
                    })
                    .collect(),
            },
            Segment::Strings(strings) => SegmentSnapshot::Strings {
                id,
                strings: strings
                    .strings()
                    .map(|(offset, bytes)| StringSnapshot {
                        offset,
                        text: String::from_utf8_lossy(bytes).into_owned(),
                    })
                    .collect(),
            },
            Segment::Stack(stack) => {
                let used = stack
                    .slots()
                    .iter()
                    .rposition(|a| *a != Address::NULL)
                    .map_or(0, |i| i + 1);
                SegmentSnapshot::Stack {
                    id,
                    size: stack.len(),
                    slots: stack.slots()[..used].to_vec(),
                }
            }
        }
    }

    fn build(self) -> SnapshotResult<(SegmentId, Segment)> {
        let in_use = |segment, offset| HeapError::OffsetInUse { segment, offset };
        match self {
            SegmentSnapshot::Script {
                id,
                number,
                lockers,
                objects,
            } => {
                let mut script = ScriptSegment::new(number);
                script.set_lock_count(lockers);
                for obj in objects {
                    let offset = check_slot_offset(id, obj.offset)?;
                    script
                        .insert_object(offset, obj.into_object())
                        .map_err(|_| in_use(id, offset))?;
                }
                Ok((id, script.into()))
            }
            SegmentSnapshot::Clones { id, objects } => {
                let mut clones = CloneTable::new();
                for obj in objects {
                    let offset = check_slot_offset(id, obj.offset)?;
                    clones
                        .insert_at(offset, obj.into_object())
                        .map_err(|_| in_use(id, offset))?;
                }
                Ok((id, clones.into()))
            }
            SegmentSnapshot::Lists { id, lists } => {
                let mut segment = ListSegment::new();
                for list in lists {
                    segment
                        .insert_at(list.offset, list.elements)
                        .map_err(|_| in_use(id, list.offset))?;
                }
                Ok((id, segment.into()))
            }
            SegmentSnapshot::Strings { id, strings } => {
                let mut segment = StringSegment::new();
                for string in strings {
                    segment
                        .insert_at(string.offset, string.text)
                        .map_err(|_| in_use(id, string.offset))?;
                }
                Ok((id, segment.into()))
            }
            SegmentSnapshot::Stack { id, size, slots } => {
                if size > MAX_STACK_SIZE {
                    return Err(SnapshotError::LimitExceeded {
                        segment: id,
                        what: "stack size",
                        value: size as u64,
                        limit: MAX_STACK_SIZE as u64,
                    });
                }
                if slots.len() > size {
                    return Err(SnapshotError::StackOverflow {
                        segment: id,
                        size,
                        given: slots.len(),
                    });
                }
                let mut stack = StackSegment::new(size);
                for (index, value) in slots.into_iter().enumerate() {
                    stack.set(index, value)?;
                }
                Ok((id, stack.into()))
            }
        }
    }
}

fn check_slot_offset(segment: SegmentId, offset: u32) -> SnapshotResult<u32> {
    if offset > MAX_SLOT_OFFSET {
        return Err(SnapshotError::LimitExceeded {
            segment,
            what: "object offset",
            value: offset.into(),
            limit: MAX_SLOT_OFFSET.into(),
        });
    }
    Ok(offset)
}

fn is_null(addr: &Address) -> bool {
    addr.is_null()
}

fn capture_object((offset, obj): (u32, &Object)) -> ObjectSnapshot {
    ObjectSnapshot {
        offset,
        class: obj.class,
        variables: obj.variables.clone(),
    }
}

impl ObjectSnapshot {
    fn into_object(self) -> Object {
        Object::new(self.class, self.variables)
    }
}

/// Serializable picture of a heap and its execution state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapSnapshot {
    /// Occupied segment slots in id order
    pub segments: Vec<SegmentSnapshot>,
    /// Registers and call stack
    pub state: ExecState,
}

impl HeapSnapshot {
    /// Parse a snapshot from JSON text
    pub fn from_json(json: &str) -> SnapshotResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a snapshot file
    pub fn load(path: impl AsRef<Path>) -> SnapshotResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> SnapshotResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Capture a heap and execution state
    pub fn capture(heap: &Heap, state: &ExecState) -> Self {
        Self {
            segments: heap
                .segments()
                .map(|(id, segment)| SegmentSnapshot::capture(id, segment))
                .collect(),
            state: state.clone(),
        }
    }

    /// Capture a running VM
    pub fn of_vm(vm: &Vm) -> Self {
        Self::capture(vm.heap(), vm.state())
    }

    /// Rebuild the heap and execution state
    ///
    /// # Errors
    ///
    /// Fails on duplicate or reserved segment ids, overlapping offsets
    /// inside a segment, a stack given more values than it has slots, or
    /// a stack size or object offset above the loader's limits.
    pub fn into_parts(self) -> SnapshotResult<(Heap, ExecState)> {
        let mut heap = Heap::new();
        for segment in self.segments {
            let (id, segment) = segment.build()?;
            heap.insert_segment(id, segment)?;
        }
        log::debug!(
            "snapshot: loaded {} segments, call depth {}",
            heap.segments().count(),
            self.state.depth()
        );
        Ok((heap, self.state))
    }

    /// Rebuild a VM with the given collector options
    pub fn into_vm(self, options: GcOptions) -> SnapshotResult<Vm> {
        let (heap, state) = self.into_parts()?;
        Ok(Vm::from_parts(heap, state, options))
    }
}
