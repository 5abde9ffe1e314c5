//! # Entity Component System
//!
//! Signature-matched ECS with a schema fixed before the first entity
//! exists.
//!
//! ## Design
//!
//! - Kinds (components, tags, signatures) are declared once in a [`Schema`]
//! - Component data lives in one dense column per kind, never reordered
//! - Entity metadata is compacted in place by [`Manager::refresh`]
//! - [`Handle`]s survive compaction; raw [`EntityIndex`]es do not

mod bitset;
mod entity;
mod fetch;
mod handle;
mod kind;
mod manager;
mod schema;
mod signature;
mod storage;

pub use bitset::{Bitset, Ones};
pub use entity::{DataSlot, EntityIndex};
pub use fetch::ComponentSet;
pub use handle::{Handle, HandleSlot};
pub use kind::{Component, KindId, Tag};
pub use manager::{EntityTarget, Manager, StateDump};
pub use schema::{ComponentId, Schema, SchemaBuilder, SignatureId, TagId};
pub use signature::{Signature, SignatureMask};
pub use storage::ComponentStorage;
