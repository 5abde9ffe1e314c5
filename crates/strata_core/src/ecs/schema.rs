//! # Schema
//!
//! The closed set of component, tag and signature kinds a manager works
//! with. Built once, validated once, immutable afterwards.
//!
//! ```text
//! bit:   0        1        2        3       4
//!        Position Velocity Health | Player  Enemy
//!        \____ components ______/  \___ tags __/
//! ```
//!
//! Component IDs double as column indices and as bit positions. Tag bits
//! start right after the last component.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;

use tracing::info;

use super::bitset::Bitset;
use super::fetch::ComponentSet;
use super::kind::{Component, KindId, Tag};
use super::signature::{Signature, SignatureMask};
use super::storage::{Column, ColumnFactory};
use crate::error::SchemaError;

// ============================================================================
// IDS
// ============================================================================

/// Dense index of a component kind, in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(usize);

impl ComponentId {
    /// Column index and bit position.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Dense index of a tag kind, in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagId(usize);

impl TagId {
    /// Position among tags. The bit is offset by the component count.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Dense index of a signature kind, in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignatureId(usize);

impl SignatureId {
    /// Position among signatures.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug)]
enum Entry {
    Component(ComponentId),
    Tag(TagId),
    Signature(SignatureId),
}

#[derive(Clone, Debug)]
struct SignatureInfo {
    mask: SignatureMask,
    components: Vec<ComponentId>,
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Validated, immutable description of every kind a manager knows about.
#[derive(Clone, Debug)]
pub struct Schema {
    entries: HashMap<TypeId, Entry>,
    components: Vec<KindId>,
    column_factories: Vec<ColumnFactory>,
    tags: Vec<KindId>,
    signatures: Vec<SignatureInfo>,
}

impl Schema {
    /// Starts an empty declaration list.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Number of declared component kinds.
    #[inline]
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Number of declared tag kinds.
    #[inline]
    #[must_use]
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Number of declared signatures.
    #[inline]
    #[must_use]
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// Bits used per entity: components plus tags.
    #[inline]
    #[must_use]
    pub fn bit_count(&self) -> usize {
        self.components.len() + self.tags.len()
    }

    /// Returns `true` if `K` was declared as a component.
    #[must_use]
    pub fn is_component<K: ?Sized + 'static>(&self) -> bool {
        matches!(self.entry::<K>(), Some(Entry::Component(_)))
    }

    /// Returns `true` if `K` was declared as a tag.
    #[must_use]
    pub fn is_tag<K: ?Sized + 'static>(&self) -> bool {
        matches!(self.entry::<K>(), Some(Entry::Tag(_)))
    }

    /// Returns `true` if `K` was declared as a signature.
    #[must_use]
    pub fn is_signature<K: ?Sized + 'static>(&self) -> bool {
        matches!(self.entry::<K>(), Some(Entry::Signature(_)))
    }

    /// Looks up a component's ID without panicking.
    #[inline]
    #[must_use]
    pub fn try_component_id<C: Component>(&self) -> Option<ComponentId> {
        match self.entry::<C>() {
            Some(Entry::Component(id)) => Some(id),
            _ => None,
        }
    }

    /// Dense ID of component `C`.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not a declared component.
    #[inline]
    #[must_use]
    pub fn component_id<C: Component>(&self) -> ComponentId {
        self.try_component_id::<C>()
            .unwrap_or_else(|| undeclared::<C>("component"))
    }

    /// Bit position of component `C`.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not a declared component.
    #[inline]
    #[must_use]
    pub fn component_bit<C: Component>(&self) -> usize {
        self.component_id::<C>().index()
    }

    /// Dense ID of tag `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not a declared tag.
    #[inline]
    #[must_use]
    pub fn tag_id<T: Tag>(&self) -> TagId {
        match self.entry::<T>() {
            Some(Entry::Tag(id)) => id,
            _ => undeclared::<T>("tag"),
        }
    }

    /// Bit position of tag `T`: the component count plus its tag ID.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not a declared tag.
    #[inline]
    #[must_use]
    pub fn tag_bit<T: Tag>(&self) -> usize {
        self.components.len() + self.tag_id::<T>().index()
    }

    /// Dense ID of signature `S`.
    ///
    /// # Panics
    ///
    /// Panics if `S` is not a declared signature.
    #[inline]
    #[must_use]
    pub fn signature_id<S: Signature>(&self) -> SignatureId {
        match self.entry::<S>() {
            Some(Entry::Signature(id)) => id,
            _ => undeclared::<S>("signature"),
        }
    }

    /// Precomputed mask of signature `S`.
    ///
    /// # Panics
    ///
    /// Panics if `S` is not a declared signature.
    #[inline]
    #[must_use]
    pub fn signature_mask<S: Signature>(&self) -> &SignatureMask {
        &self.signatures[self.signature_id::<S>().index()].mask
    }

    /// Component IDs of signature `S`, in declared order.
    ///
    /// # Panics
    ///
    /// Panics if `S` is not a declared signature.
    #[must_use]
    pub fn signature_components<S: Signature>(&self) -> &[ComponentId] {
        &self.signatures[self.signature_id::<S>().index()].components
    }

    /// Diagnostic name of a component ID.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this schema.
    #[must_use]
    pub fn component_name(&self, id: ComponentId) -> &'static str {
        self.components[id.index()].name()
    }

    /// Column constructors, one per component, in `ComponentId` order.
    pub(crate) fn column_factories(&self) -> &[ColumnFactory] {
        &self.column_factories
    }

    #[inline]
    fn entry<K: ?Sized + 'static>(&self) -> Option<Entry> {
        self.entries.get(&TypeId::of::<K>()).copied()
    }
}

#[cold]
#[track_caller]
fn undeclared<K: ?Sized>(what: &str) -> ! {
    panic!("{} is not a declared {what}", type_name::<K>())
}

// ============================================================================
// BUILDER
// ============================================================================

enum Declaration {
    Component {
        kind: KindId,
        factory: ColumnFactory,
    },
    Tag {
        kind: KindId,
    },
    Signature {
        kind: KindId,
        components: Vec<KindId>,
        tags: Vec<KindId>,
    },
}

impl Declaration {
    fn kind(&self) -> KindId {
        match self {
            Self::Component { kind, .. } | Self::Tag { kind } | Self::Signature { kind, .. } => {
                *kind
            }
        }
    }
}

/// Collects kind declarations; [`SchemaBuilder::build`] validates them.
///
/// # Example
///
/// ```rust
/// use strata_core::{signature, Component, Schema, Tag};
///
/// #[derive(Default)]
/// struct Health(u32);
/// impl Component for Health {}
///
/// struct Enemy;
/// impl Tag for Enemy {}
///
/// signature! {
///     struct Enemies {
///         components: [Health],
///         tags: [Enemy],
///     }
/// }
///
/// let schema = Schema::builder()
///     .component::<Health>()
///     .tag::<Enemy>()
///     .signature::<Enemies>()
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.component_bit::<Health>(), 0);
/// assert_eq!(schema.tag_bit::<Enemy>(), 1);
/// ```
#[derive(Default)]
pub struct SchemaBuilder {
    declarations: Vec<Declaration>,
}

impl SchemaBuilder {
    /// Declares a component kind. IDs follow declaration order.
    #[must_use]
    pub fn component<C: Component>(mut self) -> Self {
        self.declarations.push(Declaration::Component {
            kind: KindId::of::<C>(),
            factory: Column::<C>::boxed,
        });
        self
    }

    /// Declares a tag kind.
    #[must_use]
    pub fn tag<T: Tag>(mut self) -> Self {
        self.declarations.push(Declaration::Tag {
            kind: KindId::of::<T>(),
        });
        self
    }

    /// Declares a signature. Every kind it names must be declared too,
    /// in any order.
    #[must_use]
    pub fn signature<S: Signature>(mut self) -> Self {
        self.declarations.push(Declaration::Signature {
            kind: KindId::of::<S>(),
            components: S::Components::kinds(),
            tags: S::tags(),
        });
        self
    }

    /// Assigns IDs, computes signature masks and validates everything.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::DuplicateKind`] if a type is declared twice, in any
    ///   role.
    /// - [`SchemaError::TooManyKinds`] if components plus tags exceed
    ///   [`Bitset::CAPACITY`].
    /// - [`SchemaError::UnknownKind`] if a signature names an undeclared
    ///   type.
    /// - [`SchemaError::MalformedSignature`] if a signature lists a kind
    ///   twice or in the wrong role.
    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut entries = HashMap::with_capacity(self.declarations.len());
        let mut components = Vec::new();
        let mut column_factories = Vec::new();
        let mut tags = Vec::new();
        let mut signature_count = 0;

        for declaration in &self.declarations {
            let kind = declaration.kind();
            let entry = match declaration {
                Declaration::Component { factory, .. } => {
                    components.push(kind);
                    column_factories.push(*factory);
                    Entry::Component(ComponentId(components.len() - 1))
                }
                Declaration::Tag { .. } => {
                    tags.push(kind);
                    Entry::Tag(TagId(tags.len() - 1))
                }
                Declaration::Signature { .. } => {
                    signature_count += 1;
                    Entry::Signature(SignatureId(signature_count - 1))
                }
            };
            if entries.insert(kind.type_id(), entry).is_some() {
                return Err(SchemaError::DuplicateKind { name: kind.name() });
            }
        }

        let bit_count = components.len() + tags.len();
        if bit_count > Bitset::CAPACITY {
            return Err(SchemaError::TooManyKinds {
                count: bit_count,
                max: Bitset::CAPACITY,
            });
        }

        let mut signatures = Vec::with_capacity(signature_count);
        for declaration in &self.declarations {
            if let Declaration::Signature {
                kind,
                components: wanted_components,
                tags: wanted_tags,
            } = declaration
            {
                signatures.push(resolve_signature(
                    &entries,
                    components.len(),
                    *kind,
                    wanted_components,
                    wanted_tags,
                )?);
            }
        }

        info!(
            components = components.len(),
            tags = tags.len(),
            signatures = signatures.len(),
            "Schema built"
        );

        Ok(Schema {
            entries,
            components,
            column_factories,
            tags,
            signatures,
        })
    }
}

impl fmt::Debug for SchemaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.declarations.iter().map(Declaration::kind))
            .finish()
    }
}

fn resolve_signature(
    entries: &HashMap<TypeId, Entry>,
    component_count: usize,
    signature: KindId,
    wanted_components: &[KindId],
    wanted_tags: &[KindId],
) -> Result<SignatureInfo, SchemaError> {
    let malformed = |reason: String| SchemaError::MalformedSignature {
        signature: signature.name(),
        reason,
    };
    let lookup = |kind: KindId| {
        entries
            .get(&kind.type_id())
            .copied()
            .ok_or_else(|| SchemaError::UnknownKind {
                signature: signature.name(),
                kind: kind.name(),
            })
    };

    let mut bits = Bitset::new();
    let mut ids = Vec::with_capacity(wanted_components.len());

    for &kind in wanted_components {
        let Entry::Component(id) = lookup(kind)? else {
            return Err(malformed(format!("`{}` is not a component", kind.name())));
        };
        if bits.contains(id.index()) {
            return Err(malformed(format!("component `{}` listed twice", kind.name())));
        }
        bits.set(id.index());
        ids.push(id);
    }

    for &kind in wanted_tags {
        let Entry::Tag(id) = lookup(kind)? else {
            return Err(malformed(format!("`{}` is not a tag", kind.name())));
        };
        let bit = component_count + id.index();
        if bits.contains(bit) {
            return Err(malformed(format!("tag `{}` listed twice", kind.name())));
        }
        bits.set(bit);
    }

    Ok(SignatureInfo {
        mask: SignatureMask::new(bits),
        components: ids,
    })
}
