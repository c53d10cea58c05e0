//! Segment-addressed values
//!
//! Every value the VM manipulates is a pair of a segment id and an offset
//! inside that segment. Segment id 0 never names a segment: values in it
//! are plain scalars (integers, null) and are never traced.
//!
//! # Encoding
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────────┐
//! │ segment (16 bit) │ offset (32 bit)                  │
//! └──────────────────┴──────────────────────────────────┘
//!   0000             → scalar, offset holds the value
//!   0001..=ffff      → reference into that heap segment
//! ```
//!
//! The textual form used by snapshots and the CLI is `SSSS:OOOO` in hex,
//! e.g. `0003:0010`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Index of a segment slot in the heap
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub u16);

impl SegmentId {
    /// The reserved "not a segment" id
    pub const NULL: SegmentId = SegmentId(0);

    /// Whether this id names the scalar pseudo-segment
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Slot index in the heap's segment table
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

/// A segment id plus an offset inside that segment
///
/// Equality is structural: two addresses that alias the same object
/// through different offsets compare unequal until canonicalized by the
/// owning segment.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    /// Owning segment (0 = scalar)
    pub segment: SegmentId,
    /// Offset inside the segment, or the scalar value itself
    pub offset: u32,
}

impl Address {
    /// The null value
    pub const NULL: Address = Address {
        segment: SegmentId::NULL,
        offset: 0,
    };

    /// Create an address
    #[inline]
    pub const fn new(segment: SegmentId, offset: u32) -> Self {
        Self { segment, offset }
    }

    /// Create a scalar (segment 0) value
    #[inline]
    pub const fn scalar(value: u32) -> Self {
        Self {
            segment: SegmentId::NULL,
            offset: value,
        }
    }

    /// Whether this value is not a heap reference
    #[inline]
    pub const fn is_null(self) -> bool {
        self.segment.is_null()
    }

    /// Same segment, different offset
    #[inline]
    pub const fn with_offset(self, offset: u32) -> Self {
        Self {
            segment: self.segment,
            offset,
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.segment.0, self.offset)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Error returned when parsing an `SSSS:OOOO` address
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address '{0}', expected SSSS:OOOO in hex")]
pub struct ParseAddressError(String);

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseAddressError(s.to_string());
        let (segment, offset) = s.trim().split_once(':').ok_or_else(err)?;
        let segment = u16::from_str_radix(segment, 16).map_err(|_| err())?;
        let offset = u32::from_str_radix(offset, 16).map_err(|_| err())?;
        Ok(Address::new(SegmentId(segment), offset))
    }
}

impl TryFrom<String> for Address {
    type Error = ParseAddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_string()
    }
}

/// Pointer to one variable of an object
///
/// Selector calls that read or write a property keep one of these in
/// their frame. It goes stale when the object is freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarRef {
    /// The object owning the variable
    pub object: Address,
    /// Index into the object's variable block
    pub index: usize,
}

impl VarRef {
    /// Create a variable pointer
    pub const fn new(object: Address, index: usize) -> Self {
        Self { object, index }
    }
}
