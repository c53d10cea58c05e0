//! Storage tables shared by the concrete segments
//!
//! Two layouts exist:
//!
//! - [`SlotTable`]: one object per offset. Offsets are slot indices and
//!   every live offset is already canonical.
//! - [`ArenaTable`]: variable-sized entries laid out back to back. An entry
//!   starting at `start` with span `n` owns offsets `start..start + n`;
//!   any of them names the entry, but only `start` is canonical.

use std::collections::BTreeMap;

/// Fixed-slot storage with free-list reuse
#[derive(Debug, Clone)]
pub struct SlotTable<T> {
    entries: Vec<Option<T>>,
    free_list: Vec<u32>,
    live: usize,
}

impl<T> SlotTable<T> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Store a value, reusing a freed slot when one is available
    pub fn allocate(&mut self, value: T) -> u32 {
        self.live += 1;
        if let Some(slot) = self.free_list.pop() {
            self.entries[slot as usize] = Some(value);
            slot
        } else {
            self.entries.push(Some(value));
            (self.entries.len() - 1) as u32
        }
    }

    /// Store a value at a specific slot
    ///
    /// Returns the value back if the slot is occupied.
    pub fn insert_at(&mut self, slot: u32, value: T) -> Result<(), T> {
        let index = slot as usize;
        if index >= self.entries.len() {
            let old_len = self.entries.len() as u32;
            self.entries.resize_with(index + 1, || None);
            self.free_list.extend(old_len..slot);
        } else if self.entries[index].is_some() {
            return Err(value);
        } else {
            self.free_list.retain(|&s| s != slot);
        }
        self.entries[index] = Some(value);
        self.live += 1;
        Ok(())
    }

    /// Get the value at a slot
    #[inline]
    pub fn get(&self, slot: u32) -> Option<&T> {
        self.entries.get(slot as usize).and_then(Option::as_ref)
    }

    /// Get the value at a slot mutably
    #[inline]
    pub fn get_mut(&mut self, slot: u32) -> Option<&mut T> {
        self.entries.get_mut(slot as usize).and_then(Option::as_mut)
    }

    /// Whether a slot holds a live value
    #[inline]
    pub fn is_live(&self, slot: u32) -> bool {
        self.get(slot).is_some()
    }

    /// Free a slot, returning its value
    pub fn free(&mut self, slot: u32) -> Option<T> {
        let value = self.entries.get_mut(slot as usize)?.take()?;
        self.free_list.push(slot);
        self.live -= 1;
        Some(value)
    }

    /// Number of live values
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no value is live
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate over live slots in offset order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|v| (i as u32, v)))
    }
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
struct ArenaEntry<T> {
    span: u32,
    value: T,
}

/// Variable-layout storage addressed by interior offsets
#[derive(Debug, Clone)]
pub struct ArenaTable<T> {
    entries: BTreeMap<u32, ArenaEntry<T>>,
    next_offset: u32,
}

impl<T> ArenaTable<T> {
    /// Create an empty arena
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_offset: 0,
        }
    }

    /// Append an entry spanning `span` offsets (at least one)
    pub fn allocate(&mut self, value: T, span: u32) -> u32 {
        let start = self.next_offset;
        let span = span.max(1);
        self.entries.insert(start, ArenaEntry { span, value });
        self.next_offset = start.saturating_add(span);
        start
    }

    /// Place an entry at a specific start offset
    ///
    /// Returns the value back if any offset of the new span is owned by
    /// another entry.
    pub fn insert_at(&mut self, start: u32, value: T, span: u32) -> Result<(), T> {
        let span = span.max(1);
        let end = start.saturating_add(span);
        let clashes_before = self.owner_of(start).is_some();
        let clashes_after = self.entries.range(start..end).next().is_some();
        if clashes_before || clashes_after {
            return Err(value);
        }
        self.entries.insert(start, ArenaEntry { span, value });
        self.next_offset = self.next_offset.max(end);
        Ok(())
    }

    /// Start offset of the entry owning `offset`, if any
    pub fn owner_of(&self, offset: u32) -> Option<u32> {
        let (&start, entry) = self.entries.range(..=offset).next_back()?;
        (offset - start < entry.span).then_some(start)
    }

    /// Entry starting exactly at `start`
    pub fn get(&self, start: u32) -> Option<&T> {
        self.entries.get(&start).map(|e| &e.value)
    }

    /// Entry starting exactly at `start`, mutably
    pub fn get_mut(&mut self, start: u32) -> Option<&mut T> {
        self.entries.get_mut(&start).map(|e| &mut e.value)
    }

    /// Number of offsets owned by the entry at `start`
    pub fn span(&self, start: u32) -> Option<u32> {
        self.entries.get(&start).map(|e| e.span)
    }

    /// Remove the entry starting at `start`
    pub fn free(&mut self, start: u32) -> Option<T> {
        self.entries.remove(&start).map(|e| e.value)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the arena holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(start, value)` in offset order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> + '_ {
        self.entries.iter().map(|(&start, e)| (start, &e.value))
    }

    /// Start offsets of all live entries
    pub fn starts(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }
}

impl<T> Default for ArenaTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
