//! # Component Storage
//!
//! One dense, contiguous column per component kind, indexed by
//! [`DataSlot`].
//!
//! The set of kinds is only known once a [`Schema`] is built, so columns
//! are type-erased behind [`ErasedColumn`] and recovered with a typed
//! accessor that downcasts to `Column<C>`:
//!
//! ```text
//! columns[ComponentId(0)] -> Column<Position>  [P0, P1, P2, P3, ...]
//! columns[ComponentId(1)] -> Column<Velocity>  [V0, V1, V2, V3, ...]
//!                                                ^ DataSlot(1)
//! ```
//!
//! Columns grow in lockstep with the entity table. Slot contents never
//! move: compaction reorders entity metadata, not component data.

use std::any::{type_name, Any};
use std::collections::TryReserveError;

use bytemuck::Pod;

use super::entity::DataSlot;
use super::kind::Component;
use super::schema::{ComponentId, Schema};

/// Type-erased view of a single component column.
pub(crate) trait ErasedColumn: 'static {
    /// Extends the column to `new_capacity` default-initialized slots.
    /// Never shrinks.
    fn grow(&mut self, new_capacity: usize) -> Result<(), TryReserveError>;

    /// Current number of slots.
    fn len(&self) -> usize;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Constructs an empty column for one component kind.
pub(crate) type ColumnFactory = fn() -> Box<dyn ErasedColumn>;

/// Dense storage for a single component type.
pub(crate) struct Column<C> {
    data: Vec<C>,
}

impl<C: Component> Column<C> {
    /// Factory registered by the schema builder.
    pub(crate) fn boxed() -> Box<dyn ErasedColumn> {
        Box::new(Self { data: Vec::new() })
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, slot: DataSlot) -> &mut C {
        &mut self.data[slot.index()]
    }
}

impl<C: Component> ErasedColumn for Column<C> {
    fn grow(&mut self, new_capacity: usize) -> Result<(), TryReserveError> {
        if new_capacity <= self.data.len() {
            return Ok(());
        }
        self.data.try_reserve_exact(new_capacity - self.data.len())?;
        self.data.resize_with(new_capacity, C::default);
        Ok(())
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-kind component columns for every component declared in a schema.
///
/// Indices are trusted: the entity table only hands out data slots below
/// the capacity this storage was grown to.
pub struct ComponentStorage {
    /// One column per `ComponentId`, in schema order.
    columns: Vec<Box<dyn ErasedColumn>>,
    /// Slots per column.
    capacity: usize,
}

impl ComponentStorage {
    /// Creates empty columns for every component in `schema`.
    #[must_use]
    pub fn new(schema: &Schema) -> Self {
        Self {
            columns: schema
                .column_factories()
                .iter()
                .map(|factory| factory())
                .collect(),
            capacity: 0,
        }
    }

    /// Slots available in every column.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of columns (declared component kinds).
    #[inline]
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Extends every column to `new_capacity`, keeping existing contents.
    ///
    /// # Errors
    ///
    /// Returns the allocator error if any column fails to reserve. Columns
    /// that already grew keep their new length; the recorded capacity is
    /// only raised once all of them succeed.
    pub fn grow(&mut self, new_capacity: usize) -> Result<(), TryReserveError> {
        for column in &mut self.columns {
            column.grow(new_capacity)?;
        }
        self.capacity = self.capacity.max(new_capacity);
        debug_assert!(self.columns.iter().all(|column| column.len() == self.capacity));
        Ok(())
    }

    /// Borrows the component of kind `C` stored at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not hold `C` or `slot` is beyond capacity.
    #[inline]
    #[must_use]
    pub fn get<C: Component>(&self, id: ComponentId, slot: DataSlot) -> &C {
        &self.column::<C>(id)[slot.index()]
    }

    /// Mutably borrows the component of kind `C` stored at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not hold `C` or `slot` is beyond capacity.
    #[inline]
    pub fn get_mut<C: Component>(&mut self, id: ComponentId, slot: DataSlot) -> &mut C {
        self.typed_mut::<C>(id).slot_mut(slot)
    }

    /// Borrows a whole column, indexed by data slot.
    ///
    /// Slots not owned by a live entity hold stale or default values.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not hold `C`.
    #[must_use]
    pub fn column<C: Component>(&self, id: ComponentId) -> &[C] {
        &self.typed::<C>(id).data
    }

    /// Mutably borrows a whole column, indexed by data slot.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not hold `C`.
    pub fn column_mut<C: Component>(&mut self, id: ComponentId) -> &mut [C] {
        &mut self.typed_mut::<C>(id).data
    }

    /// Views a column of plain-old-data components as raw bytes, ready
    /// for a GPU or render upload.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not hold `C`.
    #[must_use]
    pub fn column_bytes<C: Component + Pod>(&self, id: ComponentId) -> &[u8] {
        bytemuck::cast_slice(self.column::<C>(id))
    }

    /// Hands out mutable access to `N` distinct columns at once, without
    /// allocating.
    ///
    /// The result is in the order of `ids`. An entry is `None` when its id
    /// is unknown or was already claimed by an earlier entry.
    ///
    /// # Panics
    ///
    /// Panics if `ids.len() != N`.
    pub(crate) fn disjoint_columns_mut<const N: usize>(
        &mut self,
        ids: &[ComponentId],
    ) -> [Option<&mut dyn ErasedColumn>; N] {
        assert_eq!(ids.len(), N, "expected {N} component ids");
        let mut picked: [Option<&mut dyn ErasedColumn>; N] = std::array::from_fn(|_| None);
        let mut remaining = N;
        for (index, column) in self.columns.iter_mut().enumerate() {
            if remaining == 0 {
                break;
            }
            if let Some(position) = ids.iter().position(|id| id.index() == index) {
                picked[position] = Some(&mut **column);
                remaining -= 1;
            }
        }
        picked
    }

    fn typed<C: Component>(&self, id: ComponentId) -> &Column<C> {
        self.columns
            .get(id.index())
            .and_then(|column| column.as_any().downcast_ref::<Column<C>>())
            .unwrap_or_else(|| panic!("column {id} does not store {}", type_name::<C>()))
    }

    fn typed_mut<C: Component>(&mut self, id: ComponentId) -> &mut Column<C> {
        self.columns
            .get_mut(id.index())
            .and_then(|column| column.as_any_mut().downcast_mut::<Column<C>>())
            .unwrap_or_else(|| panic!("column {id} does not store {}", type_name::<C>()))
    }
}

impl std::fmt::Debug for ComponentStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentStorage")
            .field("columns", &self.columns.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
