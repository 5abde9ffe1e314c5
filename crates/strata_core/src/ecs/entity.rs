//! # Entity Table
//!
//! Entities are dense metadata records. Index order splits them into
//! three ranges:
//!
//! ```text
//! 0            size          size_next        capacity
//! |  alive/killed  |   pending    |    unused     |
//!   (iterated)       (created this tick)
//! ```
//!
//! `refresh` compacts `[0, size_next)` so every alive record ends up
//! before every dead one, then makes pending records visible. Records are
//! swapped whole, data slot included, so component data never moves.

use std::collections::TryReserveError;
use std::fmt;

use super::bitset::Bitset;
use super::handle::{HandleSlot, HandleTable};

/// Position of an entity record in the entity table.
///
/// Only stable between refreshes. Hold a [`Handle`](super::Handle) across
/// ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityIndex(usize);

impl EntityIndex {
    /// Wraps a raw index.
    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Position of an entity's data in every component column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct DataSlot(usize);

impl DataSlot {
    /// Wraps a raw slot.
    #[inline]
    #[must_use]
    pub const fn new(slot: usize) -> Self {
        Self(slot)
    }

    /// The raw slot.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Metadata of a single entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct EntityRecord {
    /// Where this entity's components live. Travels with the record.
    pub data_slot: DataSlot,
    /// Handle slot tracking this record. Travels with the record.
    pub handle_slot: HandleSlot,
    /// Owned components and tags.
    pub bitset: Bitset,
    /// Cleared by `kill`, set again when the record is reused.
    pub alive: bool,
}

impl EntityRecord {
    /// Fresh record at `index`: slots equal to the index, nothing owned.
    const fn unused(index: usize) -> Self {
        Self {
            data_slot: DataSlot(index),
            handle_slot: HandleSlot::new(index),
            bitset: Bitset::new(),
            alive: false,
        }
    }
}

/// Dense entity metadata with two-pointer compaction.
#[derive(Debug, Default)]
pub(crate) struct EntityTable {
    records: Vec<EntityRecord>,
    /// Entities visible to iteration.
    size: usize,
    /// `size` plus entities created since the last refresh.
    size_next: usize,
}

impl EntityTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub(crate) fn size_next(&self) -> usize {
        self.size_next
    }

    /// Returns `true` when the next `create_index` has no free record.
    #[inline]
    pub(crate) fn needs_growth(&self) -> bool {
        self.capacity() <= self.size_next
    }

    /// Capacity to grow to once [`needs_growth`](Self::needs_growth).
    #[inline]
    pub(crate) fn next_capacity(&self) -> usize {
        (self.capacity() + 10) * 2
    }

    /// Appends unused records up to `new_capacity`.
    pub(crate) fn grow_to(&mut self, new_capacity: usize) -> Result<(), TryReserveError> {
        let old_capacity = self.capacity();
        if new_capacity <= old_capacity {
            return Ok(());
        }
        self.records.try_reserve_exact(new_capacity - old_capacity)?;
        self.records
            .extend((old_capacity..new_capacity).map(EntityRecord::unused));
        Ok(())
    }

    /// Claims the record at `size_next` as a pending entity.
    ///
    /// # Panics
    ///
    /// Panics if there is no free record; grow first.
    pub(crate) fn create_index(&mut self) -> EntityIndex {
        assert!(!self.needs_growth(), "entity table is full");
        let index = self.size_next;
        let record = &mut self.records[index];
        record.alive = true;
        record.bitset.reset();
        self.size_next += 1;
        EntityIndex(index)
    }

    /// Borrows a tracked record.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below `size_next`.
    #[inline]
    #[track_caller]
    pub(crate) fn record(&self, index: EntityIndex) -> &EntityRecord {
        assert!(
            index.0 < self.size_next,
            "entity index {index} out of range (tracked: {})",
            self.size_next
        );
        &self.records[index.0]
    }

    /// Mutably borrows a tracked record.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below `size_next`.
    #[inline]
    #[track_caller]
    pub(crate) fn record_mut(&mut self, index: EntityIndex) -> &mut EntityRecord {
        assert!(
            index.0 < self.size_next,
            "entity index {index} out of range (tracked: {})",
            self.size_next
        );
        &mut self.records[index.0]
    }

    /// Marks an entity dead. It stays tracked until the next refresh.
    #[inline]
    #[track_caller]
    pub(crate) fn kill(&mut self, index: EntityIndex) {
        self.record_mut(index).alive = false;
    }

    /// Records `[0, size_next)`, alive, killed and pending.
    pub(crate) fn tracked(&self) -> &[EntityRecord] {
        &self.records[..self.size_next]
    }

    /// Reclaims dead records and publishes pending ones.
    ///
    /// Returns the number of records reclaimed.
    pub(crate) fn refresh(&mut self, handles: &mut HandleTable) -> usize {
        if self.size_next == 0 {
            self.size = 0;
            return 0;
        }
        let tracked = self.size_next;
        let alive = self.compact(handles);
        self.size = alive;
        self.size_next = alive;
        tracked - alive
    }

    /// Moves alive records in `[0, size_next)` to the front.
    ///
    /// Every dead record has its handle invalidated exactly once and
    /// every moved record has its handle retargeted. Returns the alive
    /// count. Requires `size_next > 0`.
    fn compact(&mut self, handles: &mut HandleTable) -> usize {
        let mut low = 0;
        let mut high = self.size_next - 1;

        loop {
            // First dead record from the left.
            loop {
                if low > high {
                    return low;
                }
                if !self.records[low].alive {
                    break;
                }
                low += 1;
            }

            // Last alive record from the right.
            loop {
                if self.records[high].alive {
                    break;
                }
                handles.invalidate(self.records[high].handle_slot);
                if high <= low {
                    return low;
                }
                high -= 1;
            }

            // low is dead, high is alive, low < high.
            self.records.swap(low, high);
            handles.retarget(self.records[low].handle_slot, EntityIndex(low));
            handles.invalidate(self.records[high].handle_slot);
            handles.retarget(self.records[high].handle_slot, EntityIndex(high));

            low += 1;
            high -= 1;
        }
    }

    /// Forgets every entity and resets all handle slots.
    pub(crate) fn clear(&mut self, handles: &mut HandleTable) {
        for (index, record) in self.records.iter_mut().enumerate() {
            *record = EntityRecord::unused(index);
        }
        self.size = 0;
        self.size_next = 0;
        handles.reset();
    }
}
