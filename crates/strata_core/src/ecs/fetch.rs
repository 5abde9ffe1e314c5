//! # Component Fetching
//!
//! Mutable access to several component kinds of one entity at once.
//! Each kind lives in its own column, so the borrows are disjoint and can
//! coexist; asking for the same kind twice is a contract violation.

use std::any::type_name;

use super::entity::DataSlot;
use super::kind::{Component, KindId};
use super::schema::{ComponentId, Schema};
use super::storage::{Column, ComponentStorage, ErasedColumn};

/// A tuple of component kinds that can be borrowed mutably together.
///
/// Implemented for `()` and tuples of up to eight [`Component`] types.
/// Fetching never allocates.
pub trait ComponentSet: 'static {
    /// The tuple of mutable references produced by a fetch.
    type Mut<'a>;

    /// Kind identities, in tuple order.
    fn kinds() -> Vec<KindId>;

    /// Borrows every kind in the set at `slot`, looking IDs up in `schema`.
    ///
    /// # Panics
    ///
    /// Panics if a kind is undeclared in `schema` or appears twice.
    fn fetch_mut<'a>(
        schema: &Schema,
        storage: &'a mut ComponentStorage,
        slot: DataSlot,
    ) -> Self::Mut<'a>;

    /// Borrows every kind in the set at `slot`, with `ids` already resolved
    /// in tuple order (as returned by
    /// [`Schema::signature_components`]).
    ///
    /// # Panics
    ///
    /// Panics if `ids` does not hold exactly one distinct column per kind,
    /// in tuple order.
    fn fetch_with_ids<'a>(
        ids: &[ComponentId],
        storage: &'a mut ComponentStorage,
        slot: DataSlot,
    ) -> Self::Mut<'a>;
}

impl ComponentSet for () {
    type Mut<'a> = ();

    fn kinds() -> Vec<KindId> {
        Vec::new()
    }

    fn fetch_mut<'a>(_: &Schema, _: &'a mut ComponentStorage, _: DataSlot) -> Self::Mut<'a> {}

    fn fetch_with_ids<'a>(
        ids: &[ComponentId],
        _: &'a mut ComponentStorage,
        _: DataSlot,
    ) -> Self::Mut<'a> {
        assert!(ids.is_empty(), "expected 0 component ids");
    }
}

fn typed_slot<C: Component>(column: Option<&mut dyn ErasedColumn>, slot: DataSlot) -> &mut C {
    column
        .and_then(|column| column.as_any_mut().downcast_mut::<Column<C>>())
        .unwrap_or_else(|| {
            panic!(
                "component {} missing or requested twice in one fetch",
                type_name::<C>()
            )
        })
        .slot_mut(slot)
}

macro_rules! impl_component_set {
    ($($kind:ident),+) => {
        impl<$($kind: Component),+> ComponentSet for ($($kind,)+) {
            type Mut<'a> = ($(&'a mut $kind,)+);

            fn kinds() -> Vec<KindId> {
                vec![$(KindId::of::<$kind>()),+]
            }

            fn fetch_mut<'a>(
                schema: &Schema,
                storage: &'a mut ComponentStorage,
                slot: DataSlot,
            ) -> Self::Mut<'a> {
                let ids = [$(schema.component_id::<$kind>()),+];
                Self::fetch_with_ids(&ids, storage, slot)
            }

            #[allow(non_snake_case)]
            fn fetch_with_ids<'a>(
                ids: &[ComponentId],
                storage: &'a mut ComponentStorage,
                slot: DataSlot,
            ) -> Self::Mut<'a> {
                const ARITY: usize = [$(stringify!($kind)),+].len();
                let [$($kind),+] = storage.disjoint_columns_mut::<ARITY>(ids);
                ($(typed_slot::<$kind>($kind, slot),)+)
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);
