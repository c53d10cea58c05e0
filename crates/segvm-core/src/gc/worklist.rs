//! Mark worklist
//!
//! Pending addresses plus the set of every raw address ever enqueued during
//! the current pass. The dedup key is the raw address, not its canonical
//! form; canonicalization happens once after marking.

use crate::address::Address;
use crate::defaults::INITIAL_WORKLIST_CAPACITY;
use rustc_hash::FxHashSet;

/// Pending queue with a dedup set
#[derive(Debug, Default)]
pub struct Worklist {
    pending: Vec<Address>,
    visited: FxHashSet<Address>,
}

impl Worklist {
    /// Create an empty worklist
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(INITIAL_WORKLIST_CAPACITY),
            visited: FxHashSet::default(),
        }
    }

    /// Enqueue an address
    ///
    /// Scalars and addresses already seen this pass are ignored. Returns
    /// whether the address was newly enqueued.
    pub fn push(&mut self, addr: Address) -> bool {
        if addr.is_null() || !self.visited.insert(addr) {
            return false;
        }
        self.pending.push(addr);
        true
    }

    /// Enqueue every address of a sequence
    pub fn push_all(&mut self, addrs: impl IntoIterator<Item = Address>) {
        for addr in addrs {
            self.push(addr);
        }
    }

    /// Take one pending address
    pub fn pop(&mut self) -> Option<Address> {
        self.pending.pop()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of pending addresses
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of distinct raw addresses enqueued so far
    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    /// Whether an address was enqueued this pass
    pub fn was_visited(&self, addr: Address) -> bool {
        self.visited.contains(&addr)
    }

    /// Consume the worklist, yielding every raw address it saw
    pub fn into_visited(self) -> FxHashSet<Address> {
        debug_assert!(self.pending.is_empty(), "worklist not drained");
        self.visited
    }
}
