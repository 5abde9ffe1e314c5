//! # Signatures
//!
//! A signature names the components and tags an entity must own for a
//! system to care about it. The schema folds each declared signature into
//! a [`SignatureMask`] once, at build time; matching is then a single
//! bitset intersection per entity.
//!
//! ```rust
//! use strata_core::{signature, Component, Tag};
//!
//! #[derive(Default)]
//! pub struct Position(f32, f32);
//! impl Component for Position {}
//!
//! #[derive(Default)]
//! pub struct Velocity(f32, f32);
//! impl Component for Velocity {}
//!
//! struct Player;
//! impl Tag for Player {}
//!
//! signature! {
//!     /// Moving player entities.
//!     pub struct MovingPlayer {
//!         components: [Position, Velocity],
//!         tags: [Player],
//!     }
//! }
//! ```

use super::bitset::Bitset;
use super::fetch::ComponentSet;
use super::kind::KindId;

/// A declarative group of required component and tag kinds.
///
/// Usually generated with [`signature!`](crate::signature). The order of
/// `Components` is the order in which
/// [`Manager::signature_components_mut`](crate::Manager::signature_components_mut)
/// yields references.
pub trait Signature: 'static {
    /// Required components, as a tuple.
    type Components: ComponentSet;

    /// Required tags.
    #[must_use]
    fn tags() -> Vec<KindId> {
        Vec::new()
    }
}

/// Precomputed union of a signature's component and tag bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignatureMask(Bitset);

impl SignatureMask {
    /// Wraps an already-assembled bitset.
    #[inline]
    #[must_use]
    pub const fn new(bits: Bitset) -> Self {
        Self(bits)
    }

    /// Returns `true` if `bits` owns every component and tag in the mask.
    ///
    /// An empty mask matches everything.
    #[inline]
    #[must_use]
    pub fn matches(&self, bits: &Bitset) -> bool {
        bits.contains_all(&self.0)
    }

    /// The underlying bits.
    #[inline]
    #[must_use]
    pub const fn bits(&self) -> &Bitset {
        &self.0
    }
}

/// Declares a [`Signature`] as a unit struct.
///
/// Components are listed in the order their references should be yielded;
/// the `tags` list is optional.
#[macro_export]
macro_rules! signature {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            components: [$($component:ty),* $(,)?]
            $(, tags: [$($tag:ty),* $(,)?])?
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        $vis struct $name;

        impl $crate::ecs::Signature for $name {
            type Components = ($($component,)*);

            fn tags() -> ::std::vec::Vec<$crate::ecs::KindId> {
                ::std::vec![$($($crate::ecs::KindId::of::<$tag>()),*)?]
            }
        }
    };
}
