//! Heap segments
//!
//! A segment owns a homogeneous collection of objects of one kind. The
//! collector never looks inside a segment directly; it only uses the
//! capability set in [`SegmentOps`]:
//!
//! | capability                 | script | clones | lists | strings | stack |
//! |----------------------------|--------|--------|-------|---------|-------|
//! | `canonicalize`             | id     | id     | head  | start   | id    |
//! | `outgoing_references`      | yes    | yes    | yes   | none    | slot* |
//! | `deallocatable_addresses`  | yes    | yes    | yes   | yes     | none  |
//! | `free`                     | yes    | yes    | yes   | yes     | no-op |
//!
//! \* The stack reports the value in the addressed slot, but the collector
//! never asks it; only the active window contributes stack roots.
//!
//! Scripts additionally expose a lock count and the addresses of the
//! objects they define, which the root collector uses for loaded scripts.

mod clones;
mod list;
mod script;
mod stack;
mod string;
pub mod table;

pub use clones::CloneTable;
pub use list::ListSegment;
pub use script::ScriptSegment;
pub use stack::StackSegment;
pub use string::StringSegment;

use crate::address::{Address, SegmentId};
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Object kind held by a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Loaded script with its statically defined objects
    Script,
    /// Dynamically cloned object instances
    Clones,
    /// Lists of values
    Lists,
    /// Byte strings
    Strings,
    /// The VM operand stack
    Stack,
}

impl SegmentKind {
    /// All kinds, in report order
    pub const ALL: [SegmentKind; 5] = [
        SegmentKind::Script,
        SegmentKind::Clones,
        SegmentKind::Lists,
        SegmentKind::Strings,
        SegmentKind::Stack,
    ];

    /// Short lowercase name
    pub fn name(self) -> &'static str {
        match self {
            SegmentKind::Script => "script",
            SegmentKind::Clones => "clones",
            SegmentKind::Lists => "lists",
            SegmentKind::Strings => "strings",
            SegmentKind::Stack => "stack",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A script-defined or cloned object
///
/// `class` points at the object's class (usually an object in a script
/// segment); `variables` hold property values, any of which may be a
/// reference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Object {
    /// Class or species object
    pub class: Address,
    /// Property values
    pub variables: Vec<Address>,
}

impl Object {
    /// Create an object
    pub fn new(class: Address, variables: Vec<Address>) -> Self {
        Self { class, variables }
    }

    /// References held by this object (class first, then variables)
    pub fn references(&self) -> impl Iterator<Item = Address> + '_ {
        std::iter::once(self.class)
            .chain(self.variables.iter().copied())
            .filter(|a| !a.is_null())
    }
}

/// Capability set every segment kind provides to the collector
#[enum_dispatch]
pub trait SegmentOps {
    /// Kind of object this segment stores
    fn kind(&self) -> SegmentKind;

    /// Canonical identity of the object `addr` points into
    ///
    /// Fixed-slot kinds return `addr` unchanged. Variable-layout kinds map
    /// an interior offset to the owning entry's start.
    fn canonicalize(&self, addr: Address) -> Address;

    /// References held by the object at `addr` (one hop)
    fn outgoing_references(&self, addr: Address) -> Vec<Address>;

    /// Every address this segment currently considers allocated
    fn deallocatable_addresses(&self, own_id: SegmentId) -> Vec<Address>;

    /// Release the object at `addr`
    fn free(&mut self, addr: Address);
}

/// A heap segment of any kind
#[enum_dispatch(SegmentOps)]
#[derive(Debug, Clone)]
pub enum Segment {
    /// Script segment
    Script(ScriptSegment),
    /// Clone table
    Clones(CloneTable),
    /// List arena
    Lists(ListSegment),
    /// String arena
    Strings(StringSegment),
    /// Operand stack
    Stack(StackSegment),
}

impl Segment {
    /// Object stored at a fixed-slot address, for kinds that hold objects
    pub fn object(&self, addr: Address) -> Option<&Object> {
        match self {
            Segment::Script(s) => s.object(addr.offset),
            Segment::Clones(c) => c.object(addr.offset),
            _ => None,
        }
    }

    /// Mutable counterpart of [`Segment::object`]
    pub fn object_mut(&mut self, addr: Address) -> Option<&mut Object> {
        match self {
            Segment::Script(s) => s.object_mut(addr.offset),
            Segment::Clones(c) => c.object_mut(addr.offset),
            _ => None,
        }
    }

    /// Number of live entries (objects, lists, strings or stack slots)
    pub fn live_count(&self) -> usize {
        match self {
            Segment::Script(s) => s.len(),
            Segment::Clones(c) => c.len(),
            Segment::Lists(l) => l.len(),
            Segment::Strings(s) => s.len(),
            Segment::Stack(s) => s.len(),
        }
    }

    /// Borrow as a script segment
    pub fn as_script(&self) -> Option<&ScriptSegment> {
        match self {
            Segment::Script(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as the operand stack
    pub fn as_stack(&self) -> Option<&StackSegment> {
        match self {
            Segment::Stack(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_references_skip_scalars() {
        let target = Address::new(SegmentId(4), 2);
        let obj = Object::new(Address::NULL, vec![Address::scalar(7), target]);
        assert_eq!(obj.references().collect::<Vec<_>>(), vec![target]);
    }

    #[test]
    fn test_dispatch_through_enum() {
        let seg: Segment = StringSegment::new().into();
        assert_eq!(seg.kind(), SegmentKind::Strings);
        let seg: Segment = StackSegment::new(4).into();
        assert_eq!(seg.kind(), SegmentKind::Stack);
        assert!(seg.as_stack().is_some());
        assert!(seg.as_script().is_none());
    }

    #[test]
    fn test_kind_names() {
        let names: Vec<_> = SegmentKind::ALL.iter().map(|k| k.to_string()).collect();
        assert_eq!(names, ["script", "clones", "lists", "strings", "stack"]);
    }
}
