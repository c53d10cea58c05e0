//! Script segments
//!
//! A script segment holds the objects a loaded script defines. Scripts are
//! reference counted by the loader: while the lock count is nonzero the
//! script is explicitly loaded and every object it defines is a GC root.

use super::table::SlotTable;
use super::{Object, SegmentKind, SegmentOps};
use crate::address::{Address, SegmentId};

/// Objects defined by one loaded script
#[derive(Debug, Clone)]
pub struct ScriptSegment {
    number: u16,
    lockers: u32,
    objects: SlotTable<Object>,
}

impl ScriptSegment {
    /// Create an unlocked script with no objects
    pub fn new(number: u16) -> Self {
        Self {
            number,
            lockers: 0,
            objects: SlotTable::new(),
        }
    }

    /// Script resource number
    pub fn number(&self) -> u16 {
        self.number
    }

    /// How many loaders currently hold this script
    pub fn lock_count(&self) -> u32 {
        self.lockers
    }

    /// Overwrite the lock count
    pub fn set_lock_count(&mut self, lockers: u32) {
        self.lockers = lockers;
    }

    /// Increment the lock count
    pub fn lock(&mut self) {
        self.lockers = self.lockers.saturating_add(1);
    }

    /// Decrement the lock count, saturating at zero
    pub fn unlock(&mut self) {
        self.lockers = self.lockers.saturating_sub(1);
    }

    /// Define an object, returning its offset
    pub fn add_object(&mut self, object: Object) -> u32 {
        self.objects.allocate(object)
    }

    /// Define an object at a fixed offset
    pub fn insert_object(&mut self, offset: u32, object: Object) -> Result<(), Object> {
        self.objects.insert_at(offset, object)
    }

    /// Object at an offset
    pub fn object(&self, offset: u32) -> Option<&Object> {
        self.objects.get(offset)
    }

    /// Object at an offset, mutably
    pub fn object_mut(&mut self, offset: u32) -> Option<&mut Object> {
        self.objects.get_mut(offset)
    }

    /// Live objects in offset order
    pub fn objects(&self) -> impl Iterator<Item = (u32, &Object)> + '_ {
        self.objects.iter()
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the script defines no live objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Addresses of every object this script defines
    pub fn exposed_references(&self, own_id: SegmentId) -> Vec<Address> {
        self.objects
            .iter()
            .map(|(offset, _)| Address::new(own_id, offset))
            .collect()
    }
}

impl SegmentOps for ScriptSegment {
    fn kind(&self) -> SegmentKind {
        SegmentKind::Script
    }

    fn canonicalize(&self, addr: Address) -> Address {
        addr
    }

    fn outgoing_references(&self, addr: Address) -> Vec<Address> {
        match self.objects.get(addr.offset) {
            Some(obj) => obj.references().collect(),
            None => {
                log::debug!("script {}: no object at {}", self.number, addr);
                Vec::new()
            }
        }
    }

    fn deallocatable_addresses(&self, own_id: SegmentId) -> Vec<Address> {
        self.exposed_references(own_id)
    }

    fn free(&mut self, addr: Address) {
        if self.objects.free(addr.offset).is_none() {
            log::warn!("script {}: freeing unallocated {}", self.number, addr);
        }
    }
}
