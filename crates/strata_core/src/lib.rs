//! # STRATA Core
//!
//! Data-oriented Entity Component System with a compile-time schema:
//! - Components stored densely, one contiguous column per kind
//! - Entities matched against declarative signatures by bitset intersection
//! - Stable handles that survive growth and compaction
//!
//! ## Architecture Rules
//!
//! 1. **Schema first** - every component, tag and signature is declared
//!    before the manager exists, and never afterwards
//! 2. **Data never moves** - compaction reorders entity metadata only
//! 3. **One refresh per tick** - creations and kills become visible at
//!    [`Manager::refresh`]
//!
//! ## Example
//!
//! ```rust
//! use strata_core::{signature, Component, Manager, Schema, Tag};
//!
//! #[derive(Default)]
//! struct Health(u32);
//! impl Component for Health {}
//!
//! struct Enemy;
//! impl Tag for Enemy {}
//!
//! signature! {
//!     struct Enemies {
//!         components: [Health],
//!         tags: [Enemy],
//!     }
//! }
//!
//! let schema = Schema::builder()
//!     .component::<Health>()
//!     .tag::<Enemy>()
//!     .signature::<Enemies>()
//!     .build()
//!     .unwrap();
//! let mut manager = Manager::new(schema);
//!
//! let grunt = manager.create_handle();
//! manager.add_component(grunt, Health(10));
//! manager.add_tag::<Enemy>(grunt);
//! manager.refresh();
//!
//! let mut enemies = 0;
//! manager.for_entities_matching::<Enemies>(|_, _| enemies += 1);
//! assert_eq!(enemies, 1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::ManagerConfig;
pub use ecs::{
    Bitset, Component, ComponentId, ComponentSet, ComponentStorage, DataSlot, EntityIndex,
    EntityTarget, Handle, HandleSlot, KindId, Manager, Schema, SchemaBuilder, Signature,
    SignatureMask, StateDump, Tag,
};
pub use error::{ConfigError, EcsError, EcsResult, SchemaError};
