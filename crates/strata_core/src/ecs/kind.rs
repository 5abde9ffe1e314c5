//! # Component and Tag Kinds
//!
//! Components are plain data records stored densely, one column per kind.
//! Tags carry no data at all; they exist only as a bit on the entity.
//!
//! Neither trait carries an ID. Dense indices are handed out by the
//! [`Schema`](super::Schema) in declaration order, so the same type can sit
//! at different indices in different schemas.

use std::any::{type_name, TypeId};
use std::fmt;

/// Marker trait for data-bearing components.
///
/// `Default` is required because columns grow in bulk: new slots are
/// default-initialized and later overwritten by `add_component`.
///
/// # Example
///
/// ```rust
/// use strata_core::Component;
///
/// #[derive(Clone, Copy, Debug, Default, PartialEq)]
/// struct Position {
///     x: f32,
///     y: f32,
/// }
///
/// impl Component for Position {}
/// ```
pub trait Component: Default + 'static {}

/// Marker trait for zero-data tags.
///
/// # Example
///
/// ```rust
/// use strata_core::Tag;
///
/// struct Player;
///
/// impl Tag for Player {}
/// ```
pub trait Tag: 'static {}

/// Identity of a declared kind: its `TypeId` plus a name for diagnostics.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KindId {
    type_id: TypeId,
    name: &'static str,
}

impl KindId {
    /// Returns the identity of `T`.
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    #[inline]
    #[must_use]
    pub fn type_id(self) -> TypeId {
        self.type_id
    }

    /// Full type name, as reported by `std::any::type_name`.
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KindId({})", self.name)
    }
}
