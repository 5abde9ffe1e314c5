//! # Error Types
//!
//! Configuration mistakes are caught when the schema is built or the
//! config is loaded. Contract violations (stale handles, undeclared
//! kinds) are programmer errors and panic instead of appearing here.

use std::collections::TryReserveError;

use thiserror::Error;

/// Errors detected while building a [`Schema`](crate::ecs::Schema).
///
/// Any of these prevents a manager from being created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The same Rust type was declared more than once.
    #[error("kind `{name}` is declared more than once")]
    DuplicateKind {
        /// Type name of the repeated kind.
        name: &'static str,
    },

    /// A signature references a type that was never declared.
    #[error("signature `{signature}` references undeclared kind `{kind}`")]
    UnknownKind {
        /// The offending signature.
        signature: &'static str,
        /// The undeclared kind.
        kind: &'static str,
    },

    /// A signature is structurally invalid.
    #[error("signature `{signature}` is malformed: {reason}")]
    MalformedSignature {
        /// The offending signature.
        signature: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Components plus tags do not fit the entity bitset.
    #[error("{count} components and tags exceed the bitset capacity of {max}")]
    TooManyKinds {
        /// Declared component + tag count.
        count: usize,
        /// Maximum supported bit count.
        max: usize,
    },
}

/// Runtime errors raised by the entity manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Growing entity, handle or component arrays failed to allocate.
    #[error("failed to grow capacity from {from} to {to}: {source}")]
    AllocationFailed {
        /// Capacity before the attempt.
        from: usize,
        /// Requested capacity.
        to: usize,
        /// Allocator error.
        #[source]
        source: TryReserveError,
    },
}

/// Result type for manager operations.
pub type EcsResult<T> = Result<T, EcsError>;

/// Errors that can occur while loading a [`ManagerConfig`](crate::ManagerConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
