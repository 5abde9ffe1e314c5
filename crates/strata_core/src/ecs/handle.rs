//! # Handles
//!
//! Entity indices change every time the table is compacted. A handle adds
//! one level of indirection: it names a handle slot, and the slot tracks
//! wherever its entity currently lives.
//!
//! Each slot carries a generation counter. Reclaiming the entity bumps the
//! counter, so handles issued before that point stop validating:
//!
//! ```text
//! Handle { slot: 3, generation: 7 }
//!            |
//!            v
//! slots[3] = { entity: e12, generation: 7 }   -> valid, resolves to e12
//! slots[3] = { entity: e12, generation: 8 }   -> stale
//! ```

use std::collections::TryReserveError;

use super::entity::EntityIndex;

/// Position of a record in the handle table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HandleSlot(usize);

impl HandleSlot {
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

/// Stable reference to an entity across refreshes.
///
/// Cheap to copy and compare. Check it with
/// [`Manager::is_handle_valid`](crate::Manager::is_handle_valid) before
/// use once the entity may have been killed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    slot: HandleSlot,
    generation: u32,
}

impl Handle {
    /// The handle slot this handle names.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> HandleSlot {
        self.slot
    }

    /// Generation at the time the handle was issued.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Clone, Copy, Debug)]
struct HandleRecord {
    entity: EntityIndex,
    generation: u32,
}

/// Slot-to-entity indirection with generation counters.
#[derive(Debug, Default)]
pub(crate) struct HandleTable {
    records: Vec<HandleRecord>,
}

impl HandleTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends slots up to `new_capacity`, each pointing at the entity
    /// record of the same index.
    pub(crate) fn grow_to(&mut self, new_capacity: usize) -> Result<(), TryReserveError> {
        let old_capacity = self.records.len();
        if new_capacity <= old_capacity {
            return Ok(());
        }
        self.records.try_reserve_exact(new_capacity - old_capacity)?;
        self.records
            .extend((old_capacity..new_capacity).map(|index| HandleRecord {
                entity: EntityIndex::new(index),
                generation: 0,
            }));
        Ok(())
    }

    /// Returns `true` if the handle's generation is current. Out-of-range
    /// slots are never valid.
    #[inline]
    pub(crate) fn is_valid(&self, handle: Handle) -> bool {
        self.records
            .get(handle.slot.0)
            .is_some_and(|record| record.generation == handle.generation)
    }

    /// Entity currently tracked by a valid handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or out of range.
    #[inline]
    #[track_caller]
    pub(crate) fn resolve(&self, handle: Handle) -> EntityIndex {
        assert!(self.is_valid(handle), "stale or foreign handle {handle:?}");
        self.records[handle.slot.0].entity
    }

    /// Points `slot` at `entity` and issues a handle with the current
    /// generation.
    pub(crate) fn bind(&mut self, slot: HandleSlot, entity: EntityIndex) -> Handle {
        let record = &mut self.records[slot.0];
        record.entity = entity;
        Handle {
            slot,
            generation: record.generation,
        }
    }

    /// Issues a handle for `slot` without moving it.
    #[inline]
    pub(crate) fn current(&self, slot: HandleSlot) -> Handle {
        Handle {
            slot,
            generation: self.records[slot.0].generation,
        }
    }

    /// Invalidates every handle issued for `slot` so far.
    #[inline]
    pub(crate) fn invalidate(&mut self, slot: HandleSlot) {
        let record = &mut self.records[slot.0];
        record.generation = record.generation.wrapping_add(1);
    }

    /// Points `slot` at a new entity index, keeping its generation.
    #[inline]
    pub(crate) fn retarget(&mut self, slot: HandleSlot, entity: EntityIndex) {
        self.records[slot.0].entity = entity;
    }

    /// Points every slot back at its own index and moves every generation
    /// to one common value above all of them, so no issued handle
    /// survives.
    pub(crate) fn reset(&mut self) {
        let baseline = self
            .records
            .iter()
            .map(|record| record.generation)
            .max()
            .map_or(0, |max| max.wrapping_add(1));
        for (index, record) in self.records.iter_mut().enumerate() {
            record.entity = EntityIndex::new(index);
            record.generation = baseline;
        }
    }

    #[cfg(test)]
    pub(crate) fn generation(&self, slot: HandleSlot) -> u32 {
        self.records[slot.0].generation
    }

    #[cfg(test)]
    pub(crate) fn entity(&self, slot: HandleSlot) -> EntityIndex {
        self.records[slot.0].entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(capacity: usize) -> HandleTable {
        let mut handles = HandleTable::new();
        handles.grow_to(capacity).unwrap();
        handles
    }

    #[test]
    fn test_bind_then_resolve() {
        let mut handles = table(4);
        let handle = handles.bind(HandleSlot(2), EntityIndex::new(2));
        assert!(handles.is_valid(handle));
        assert_eq!(handles.resolve(handle), EntityIndex::new(2));

        handles.retarget(HandleSlot(2), EntityIndex::new(0));
        assert!(handles.is_valid(handle));
        assert_eq!(handles.resolve(handle), EntityIndex::new(0));
    }

    #[test]
    fn test_invalidate_bumps_generation() {
        let mut handles = table(2);
        let old = handles.bind(HandleSlot(0), EntityIndex::new(0));
        handles.invalidate(HandleSlot(0));

        assert!(!handles.is_valid(old));
        let new = handles.current(HandleSlot(0));
        assert_eq!(new.generation(), old.generation() + 1);
        assert!(handles.is_valid(new));
    }

    #[test]
    fn test_out_of_range_is_invalid() {
        let handles = table(2);
        let foreign = Handle {
            slot: HandleSlot(9),
            generation: 0,
        };
        assert!(!handles.is_valid(foreign));
    }

    #[test]
    fn test_generation_wraps() {
        let mut handles = table(1);
        handles.records[0].generation = u32::MAX;
        handles.invalidate(HandleSlot(0));
        assert_eq!(handles.generation(HandleSlot(0)), 0);
    }

    #[test]
    fn test_reset_invalidates_everything() {
        let mut handles = table(3);
        let first = handles.current(HandleSlot(0));
        handles.invalidate(HandleSlot(1));
        handles.invalidate(HandleSlot(1));
        let second = handles.current(HandleSlot(1));
        handles.retarget(HandleSlot(2), EntityIndex::new(0));

        handles.reset();

        assert!(!handles.is_valid(first));
        assert!(!handles.is_valid(second));
        for slot in 0..3 {
            assert_eq!(handles.generation(HandleSlot(slot)), 3);
            assert_eq!(handles.entity(HandleSlot(slot)), EntityIndex::new(slot));
        }
    }

    #[test]
    #[should_panic(expected = "stale")]
    fn test_resolve_stale_panics() {
        let mut handles = table(1);
        let handle = handles.current(HandleSlot(0));
        handles.invalidate(HandleSlot(0));
        let _ = handles.resolve(handle);
    }
}
