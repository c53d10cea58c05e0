//! Clone table: object instances created at run time

use super::table::SlotTable;
use super::{Object, SegmentKind, SegmentOps};
use crate::address::{Address, SegmentId};

/// Fixed-slot table of cloned objects
#[derive(Debug, Clone, Default)]
pub struct CloneTable {
    objects: SlotTable<Object>,
}

impl CloneTable {
    /// Create an empty clone table
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a clone, returning its offset
    pub fn allocate(&mut self, object: Object) -> u32 {
        self.objects.allocate(object)
    }

    /// Place a clone at a fixed offset
    pub fn insert_at(&mut self, offset: u32, object: Object) -> Result<(), Object> {
        self.objects.insert_at(offset, object)
    }

    /// Clone at an offset
    pub fn object(&self, offset: u32) -> Option<&Object> {
        self.objects.get(offset)
    }

    /// Clone at an offset, mutably
    pub fn object_mut(&mut self, offset: u32) -> Option<&mut Object> {
        self.objects.get_mut(offset)
    }

    /// Live clones in offset order
    pub fn objects(&self) -> impl Iterator<Item = (u32, &Object)> + '_ {
        self.objects.iter()
    }

    /// Number of live clones
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl SegmentOps for CloneTable {
    fn kind(&self) -> SegmentKind {
        SegmentKind::Clones
    }

    fn canonicalize(&self, addr: Address) -> Address {
        addr
    }

    fn outgoing_references(&self, addr: Address) -> Vec<Address> {
        self.objects
            .get(addr.offset)
            .map(|obj| obj.references().collect())
            .unwrap_or_default()
    }

    fn deallocatable_addresses(&self, own_id: SegmentId) -> Vec<Address> {
        self.objects
            .iter()
            .map(|(offset, _)| Address::new(own_id, offset))
            .collect()
    }

    fn free(&mut self, addr: Address) {
        if self.objects.free(addr.offset).is_none() {
            log::warn!("clones: freeing unallocated {}", addr);
        }
    }
}
