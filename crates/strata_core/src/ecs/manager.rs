//! # Manager
//!
//! Owns the entity table, handle table and component storage for one
//! schema, and is the only way to touch any of them.
//!
//! A tick looks like:
//!
//! ```text
//! create / attach  ->  for_entities_matching::<S>(...)  ->  refresh()
//!        ^                      (may create / kill)             |
//!        +------------------------------------------------------+
//! ```
//!
//! Entities created or killed during a tick only show up in (or drop out
//! of) iteration after the next [`Manager::refresh`].

use std::fmt;

use bytemuck::Pod;
use tracing::{debug, trace};

use super::entity::{EntityIndex, EntityTable};
use super::fetch::ComponentSet;
use super::handle::{Handle, HandleTable};
use super::kind::{Component, Tag};
use super::schema::Schema;
use super::signature::Signature;
use super::storage::ComponentStorage;
use crate::config::ManagerConfig;
use crate::error::{EcsError, EcsResult};

/// Anything that names an entity: a raw [`EntityIndex`] or a [`Handle`].
///
/// Handles resolve through the handle table and panic when stale.
pub trait EntityTarget: Copy {
    /// Current index of the named entity.
    fn resolve(self, manager: &Manager) -> EntityIndex;
}

impl EntityTarget for EntityIndex {
    #[inline]
    fn resolve(self, _: &Manager) -> EntityIndex {
        self
    }
}

impl EntityTarget for Handle {
    #[inline]
    fn resolve(self, manager: &Manager) -> EntityIndex {
        manager.entity_index(self)
    }
}

/// Entity manager for a fixed [`Schema`].
///
/// # Example
///
/// ```rust
/// use strata_core::{signature, Component, Manager, Schema, Tag};
///
/// #[derive(Default)]
/// struct Position(f32);
/// impl Component for Position {}
///
/// #[derive(Default)]
/// struct Velocity(f32);
/// impl Component for Velocity {}
///
/// signature! {
///     struct Moving {
///         components: [Position, Velocity],
///     }
/// }
///
/// let schema = Schema::builder()
///     .component::<Position>()
///     .component::<Velocity>()
///     .signature::<Moving>()
///     .build()
///     .unwrap();
/// let mut manager = Manager::new(schema);
///
/// let ship = manager.create_handle();
/// manager.add_component(ship, Position(0.0));
/// manager.add_component(ship, Velocity(2.0));
/// manager.refresh();
///
/// manager.for_entities_matching::<Moving>(|manager, entity| {
///     let (position, velocity) = manager.signature_components_mut::<Moving>(entity);
///     position.0 += velocity.0;
/// });
///
/// assert_eq!(manager.component::<Position>(ship).0, 2.0);
/// ```
pub struct Manager {
    schema: Schema,
    config: ManagerConfig,
    entities: EntityTable,
    handles: HandleTable,
    storage: ComponentStorage,
    /// Nesting depth of `for_entities*` passes in progress.
    iteration_depth: usize,
}

impl Manager {
    /// Creates a manager with the default configuration.
    ///
    /// # Panics
    ///
    /// Panics if the initial allocation fails.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self::with_config(schema, ManagerConfig::default())
    }

    /// Creates a manager with an explicit configuration.
    ///
    /// # Panics
    ///
    /// Panics if the initial allocation fails.
    #[must_use]
    pub fn with_config(schema: Schema, config: ManagerConfig) -> Self {
        Self::try_with_config(schema, config).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Creates a manager, reporting allocation failure.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::AllocationFailed`] if the initial capacity
    /// cannot be reserved.
    pub fn try_with_config(schema: Schema, config: ManagerConfig) -> EcsResult<Self> {
        let storage = ComponentStorage::new(&schema);
        let mut manager = Self {
            schema,
            config,
            entities: EntityTable::new(),
            handles: HandleTable::new(),
            storage,
            iteration_depth: 0,
        };
        let initial_capacity = manager.config.initial_capacity;
        manager.grow_to(initial_capacity)?;
        Ok(manager)
    }

    // ========================================================================
    // CREATION
    // ========================================================================

    /// Creates a pending entity, growing capacity if needed.
    ///
    /// The entity can be given components right away but is not iterated
    /// until the next [`refresh`](Self::refresh).
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::AllocationFailed`] if growth fails.
    pub fn try_create_index(&mut self) -> EcsResult<EntityIndex> {
        if self.entities.needs_growth() {
            self.grow_to(self.entities.next_capacity())?;
        }
        Ok(self.entities.create_index())
    }

    /// Like [`try_create_index`](Self::try_create_index).
    ///
    /// # Panics
    ///
    /// Panics if growth fails to allocate.
    pub fn create_index(&mut self) -> EntityIndex {
        self.try_create_index().unwrap_or_else(|err| panic!("{err}"))
    }

    /// Creates a pending entity and returns a handle to it.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::AllocationFailed`] if growth fails.
    pub fn try_create_handle(&mut self) -> EcsResult<Handle> {
        let index = self.try_create_index()?;
        let slot = self.entities.record(index).handle_slot;
        Ok(self.handles.bind(slot, index))
    }

    /// Like [`try_create_handle`](Self::try_create_handle).
    ///
    /// # Panics
    ///
    /// Panics if growth fails to allocate.
    pub fn create_handle(&mut self) -> Handle {
        self.try_create_handle().unwrap_or_else(|err| panic!("{err}"))
    }

    fn grow_to(&mut self, new_capacity: usize) -> EcsResult<()> {
        let from = self.entities.capacity();
        let failed = move |source| EcsError::AllocationFailed {
            from,
            to: new_capacity,
            source,
        };
        self.storage.grow(new_capacity).map_err(failed)?;
        self.handles.grow_to(new_capacity).map_err(failed)?;
        self.entities.grow_to(new_capacity).map_err(failed)?;
        debug!(from, to = new_capacity, "Entity capacity grown");
        Ok(())
    }

    // ========================================================================
    // HANDLES
    // ========================================================================

    /// Issues a handle for an alive or pending entity.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not tracked.
    #[must_use]
    pub fn handle(&self, index: EntityIndex) -> Handle {
        self.handles.current(self.entities.record(index).handle_slot)
    }

    /// Returns `true` until the handle's entity is reclaimed or the
    /// manager is cleared.
    #[inline]
    #[must_use]
    pub fn is_handle_valid(&self, handle: Handle) -> bool {
        self.handles.is_valid(handle)
    }

    /// Current index of a handle's entity.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[inline]
    #[must_use]
    #[track_caller]
    pub fn entity_index(&self, handle: Handle) -> EntityIndex {
        self.handles.resolve(handle)
    }

    // ========================================================================
    // PER-ENTITY OPERATIONS
    // ========================================================================

    /// Returns `false` once the entity has been killed.
    #[must_use]
    pub fn is_alive(&self, target: impl EntityTarget) -> bool {
        self.entities.record(target.resolve(self)).alive
    }

    /// Marks the entity dead. Its handle stays valid until the next
    /// [`refresh`](Self::refresh).
    pub fn kill(&mut self, target: impl EntityTarget) {
        let index = target.resolve(self);
        self.entities.kill(index);
    }

    /// Sets tag `T` on the entity.
    pub fn add_tag<T: Tag>(&mut self, target: impl EntityTarget) {
        let bit = self.schema.tag_bit::<T>();
        let index = target.resolve(self);
        self.entities.record_mut(index).bitset.set(bit);
    }

    /// Clears tag `T` on the entity.
    pub fn remove_tag<T: Tag>(&mut self, target: impl EntityTarget) {
        let bit = self.schema.tag_bit::<T>();
        let index = target.resolve(self);
        self.entities.record_mut(index).bitset.unset(bit);
    }

    /// Returns `true` if the entity carries tag `T`.
    #[must_use]
    pub fn has_tag<T: Tag>(&self, target: impl EntityTarget) -> bool {
        let bit = self.schema.tag_bit::<T>();
        self.entities.record(target.resolve(self)).bitset.contains(bit)
    }

    /// Stores `value` as the entity's `C` component and returns it.
    ///
    /// Replaces any previous value.
    pub fn add_component<C: Component>(&mut self, target: impl EntityTarget, value: C) -> &mut C {
        let id = self.schema.component_id::<C>();
        let index = target.resolve(self);
        let record = self.entities.record_mut(index);
        record.bitset.set(id.index());
        let slot = record.data_slot;

        let component = self.storage.get_mut::<C>(id, slot);
        *component = value;
        component
    }

    /// Drops component `C` from the entity's bitset. The stored value is
    /// left in place and overwritten on the next add.
    pub fn remove_component<C: Component>(&mut self, target: impl EntityTarget) {
        let id = self.schema.component_id::<C>();
        let index = target.resolve(self);
        self.entities.record_mut(index).bitset.unset(id.index());
    }

    /// Returns `true` if the entity owns component `C`.
    #[must_use]
    pub fn has_component<C: Component>(&self, target: impl EntityTarget) -> bool {
        let bit = self.schema.component_bit::<C>();
        self.entities.record(target.resolve(self)).bitset.contains(bit)
    }

    /// Borrows the entity's `C` component.
    ///
    /// Debug builds assert the entity owns it.
    #[must_use]
    pub fn component<C: Component>(&self, target: impl EntityTarget) -> &C {
        let id = self.schema.component_id::<C>();
        let record = self.entities.record(target.resolve(self));
        debug_assert!(
            record.bitset.contains(id.index()),
            "entity does not own {}",
            self.schema.component_name(id)
        );
        self.storage.get::<C>(id, record.data_slot)
    }

    /// Mutably borrows the entity's `C` component.
    ///
    /// Debug builds assert the entity owns it.
    pub fn component_mut<C: Component>(&mut self, target: impl EntityTarget) -> &mut C {
        let id = self.schema.component_id::<C>();
        let record = self.entities.record(target.resolve(self));
        debug_assert!(
            record.bitset.contains(id.index()),
            "entity does not own {}",
            self.schema.component_name(id)
        );
        let slot = record.data_slot;
        self.storage.get_mut::<C>(id, slot)
    }

    /// Borrows several distinct components of one entity mutably.
    ///
    /// # Panics
    ///
    /// Panics if `Q` names a kind twice or names an undeclared kind.
    pub fn components_mut<Q: ComponentSet>(&mut self, target: impl EntityTarget) -> Q::Mut<'_> {
        let slot = self.entities.record(target.resolve(self)).data_slot;
        Q::fetch_mut(&self.schema, &mut self.storage, slot)
    }

    /// Borrows exactly the components of signature `S`, in declared order.
    ///
    /// Debug builds assert the entity matches `S`.
    pub fn signature_components_mut<S: Signature>(
        &mut self,
        target: impl EntityTarget,
    ) -> <S::Components as ComponentSet>::Mut<'_> {
        let index = target.resolve(self);
        debug_assert!(
            self.matches_signature::<S>(index),
            "entity {index} does not match {}",
            std::any::type_name::<S>()
        );
        let slot = self.entities.record(index).data_slot;
        let ids = self.schema.signature_components::<S>();
        <S::Components as ComponentSet>::fetch_with_ids(ids, &mut self.storage, slot)
    }

    /// Returns `true` if the entity owns every component and tag of `S`.
    #[must_use]
    pub fn matches_signature<S: Signature>(&self, target: impl EntityTarget) -> bool {
        let mask = self.schema.signature_mask::<S>();
        mask.matches(&self.entities.record(target.resolve(self)).bitset)
    }

    // ========================================================================
    // ITERATION
    // ========================================================================

    /// Calls `f` for every entity visible since the last refresh, killed
    /// ones included, in index order.
    ///
    /// `f` gets the manager back and may create or kill entities; those
    /// changes take effect at the next refresh.
    pub fn for_entities<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Self, EntityIndex),
    {
        self.iteration_depth += 1;
        let mut i = 0;
        while i < self.entities.size() {
            f(self, EntityIndex::new(i));
            i += 1;
        }
        self.iteration_depth -= 1;
    }

    /// Like [`for_entities`](Self::for_entities), restricted to entities
    /// matching `S`.
    pub fn for_entities_matching<S: Signature>(
        &mut self,
        mut f: impl FnMut(&mut Self, EntityIndex),
    ) {
        let mask = *self.schema.signature_mask::<S>();
        self.iteration_depth += 1;
        let mut i = 0;
        while i < self.entities.size() {
            let index = EntityIndex::new(i);
            if mask.matches(&self.entities.record(index).bitset) {
                f(self, index);
            }
            i += 1;
        }
        self.iteration_depth -= 1;
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Reclaims killed entities and publishes pending ones.
    ///
    /// Call once per tick, outside iteration. Entity indices held across
    /// this call are meaningless afterwards; handles are not.
    ///
    /// # Panics
    ///
    /// Debug builds panic when called from inside an iteration callback.
    pub fn refresh(&mut self) {
        debug_assert_eq!(self.iteration_depth, 0, "refresh called during iteration");
        let reclaimed = self.entities.refresh(&mut self.handles);
        trace!(alive = self.entities.size(), reclaimed, "Entities refreshed");
    }

    /// Forgets every entity and invalidates every handle. Capacity is kept.
    ///
    /// # Panics
    ///
    /// Debug builds panic when called from inside an iteration callback.
    pub fn clear(&mut self) {
        debug_assert_eq!(self.iteration_depth, 0, "clear called during iteration");
        self.entities.clear(&mut self.handles);
        debug!(capacity = self.entities.capacity(), "Manager cleared");
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Entities visible to iteration.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.size()
    }

    /// Entities created since the last refresh.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entities.size_next() - self.entities.size()
    }

    /// Entity slots allocated.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entities.capacity()
    }

    /// The schema this manager was built with.
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The configuration this manager was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Whole column of component `C`, indexed by data slot.
    ///
    /// Slots of dead or unused entities hold stale values; pair with
    /// [`for_entities`](Self::for_entities) to know which are live.
    #[must_use]
    pub fn column<C: Component>(&self) -> &[C] {
        self.storage.column::<C>(self.schema.component_id::<C>())
    }

    /// Raw bytes of a plain-old-data column, for renderer uploads.
    #[must_use]
    pub fn column_bytes<C: Component + Pod>(&self) -> &[u8] {
        self.storage.column_bytes::<C>(self.schema.component_id::<C>())
    }

    /// Snapshot of table sizes and liveness, for debugging.
    #[must_use]
    pub fn state(&self) -> StateDump {
        StateDump {
            size: self.entities.size(),
            size_next: self.entities.size_next(),
            capacity: self.entities.capacity(),
            alive: self
                .entities
                .tracked()
                .iter()
                .map(|record| record.alive)
                .collect(),
        }
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("size", &self.entities.size())
            .field("size_next", &self.entities.size_next())
            .field("capacity", &self.entities.capacity())
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Point-in-time view of the entity table.
///
/// Displays as:
///
/// ```text
/// size: 3, size_next: 4, capacity: 100
/// AADA
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateDump {
    /// Entities visible to iteration.
    pub size: usize,
    /// Entities tracked, pending included.
    pub size_next: usize,
    /// Entity slots allocated.
    pub capacity: usize,
    /// Liveness of each tracked record, by index.
    pub alive: Vec<bool>,
}

impl fmt::Display for StateDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "size: {}, size_next: {}, capacity: {}",
            self.size, self.size_next, self.capacity
        )?;
        for &alive in &self.alive {
            f.write_str(if alive { "A" } else { "D" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature;

    #[derive(Debug, Default, PartialEq)]
    struct Position(i32);
    impl Component for Position {}

    #[derive(Debug, Default, PartialEq)]
    struct Velocity(i32);
    impl Component for Velocity {}

    struct Player;
    impl Tag for Player {}

    signature! {
        struct Moving {
            components: [Position, Velocity],
        }
    }

    fn manager() -> Manager {
        let schema = Schema::builder()
            .component::<Position>()
            .component::<Velocity>()
            .tag::<Player>()
            .signature::<Moving>()
            .build()
            .unwrap();
        Manager::new(schema)
    }

    #[test]
    fn test_initial_capacity_from_config() {
        assert_eq!(manager().capacity(), 100);

        let schema = Schema::builder().component::<Position>().build().unwrap();
        let config = ManagerConfig {
            initial_capacity: 7,
        };
        let manager = Manager::with_config(schema, config);
        assert_eq!(manager.capacity(), 7);
        assert_eq!(manager.config().initial_capacity, 7);
    }

    #[test]
    fn test_growth_when_full() {
        let schema = Schema::builder().component::<Position>().build().unwrap();
        let mut manager = Manager::with_config(
            schema,
            ManagerConfig {
                initial_capacity: 2,
            },
        );
        let first = manager.create_index();
        manager.add_component(first, Position(11));
        manager.create_index();
        manager.create_index();

        assert_eq!(manager.capacity(), 24);
        assert_eq!(manager.pending_count(), 3);
        assert_eq!(*manager.component::<Position>(first), Position(11));
    }

    #[test]
    fn test_component_roundtrip() {
        let mut manager = manager();
        let entity = manager.create_index();
        manager.add_component(entity, Position(3)).0 += 1;

        assert!(manager.has_component::<Position>(entity));
        assert!(!manager.has_component::<Velocity>(entity));
        assert_eq!(*manager.component::<Position>(entity), Position(4));

        manager.component_mut::<Position>(entity).0 = 9;
        assert_eq!(manager.component::<Position>(entity).0, 9);

        manager.remove_component::<Position>(entity);
        assert!(!manager.has_component::<Position>(entity));
    }

    #[test]
    fn test_tags() {
        let mut manager = manager();
        let handle = manager.create_handle();
        assert!(!manager.has_tag::<Player>(handle));

        manager.add_tag::<Player>(handle);
        assert!(manager.has_tag::<Player>(handle));
        assert!(!manager.has_component::<Position>(handle));

        manager.remove_tag::<Player>(handle);
        assert!(!manager.has_tag::<Player>(handle));
    }

    #[test]
    fn test_components_mut_disjoint() {
        let mut manager = manager();
        let entity = manager.create_index();
        manager.add_component(entity, Position(1));
        manager.add_component(entity, Velocity(5));

        let (velocity, position) = manager.components_mut::<(Velocity, Position)>(entity);
        position.0 += velocity.0;
        velocity.0 = 0;

        assert_eq!(manager.component::<Position>(entity).0, 6);
        assert_eq!(manager.component::<Velocity>(entity).0, 0);
    }

    #[test]
    fn test_handle_for_index() {
        let mut manager = manager();
        let created = manager.create_handle();
        let index = manager.entity_index(created);
        assert_eq!(manager.handle(index), created);
    }

    #[test]
    fn test_state_dump() {
        let mut manager = manager();
        for _ in 0..3 {
            manager.create_index();
        }
        manager.refresh();
        manager.kill(EntityIndex::new(1));
        manager.create_index();

        let state = manager.state();
        assert_eq!(state.size, 3);
        assert_eq!(state.size_next, 4);
        assert_eq!(state.to_string(), "size: 3, size_next: 4, capacity: 100\nADAA");
    }

    #[test]
    fn test_signature_components_follow_declared_order() {
        let mut manager = manager();
        let entity = manager.create_index();
        manager.add_component(entity, Position(2));
        manager.add_component(entity, Velocity(3));
        manager.refresh();

        manager.for_entities_matching::<Moving>(|manager, entity| {
            let (position, velocity) = manager.signature_components_mut::<Moving>(entity);
            position.0 *= velocity.0;
        });
        assert_eq!(manager.component::<Position>(entity).0, 6);
    }

    #[test]
    fn test_nested_iteration_allows_refresh_after() {
        let mut manager = manager();
        for _ in 0..3 {
            manager.create_index();
        }
        manager.refresh();

        let mut pairs = 0;
        manager.for_entities(|manager, _| {
            manager.for_entities(|_, _| pairs += 1);
        });
        assert_eq!(pairs, 9);

        manager.refresh();
        manager.clear();
        assert_eq!(manager.entity_count(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "refresh called during iteration")]
    fn test_refresh_inside_callback_panics() {
        let mut manager = manager();
        manager.create_index();
        manager.refresh();
        manager.for_entities(|manager, _| manager.refresh());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "clear called during iteration")]
    fn test_clear_inside_matching_callback_panics() {
        let mut manager = manager();
        let entity = manager.create_index();
        manager.add_component(entity, Position(0));
        manager.add_component(entity, Velocity(0));
        manager.refresh();
        manager.for_entities_matching::<Moving>(|manager, _| manager.clear());
    }

    #[test]
    #[should_panic(expected = "stale")]
    fn test_stale_handle_panics() {
        let mut manager = manager();
        let handle = manager.create_handle();
        manager.kill(handle);
        manager.refresh();
        let _ = manager.is_alive(handle);
    }
}
