//! Entity contract consumed by the gateway.
//!
//! # Responsibility
//! - Bind a Rust type to its static descriptor.
//! - Convert between the type and a flat `Record`.
//!
//! # Invariants
//! - `id()` is `None` until the first successful save and never changes after.
//! - `to_record()` emits only attributes declared on the descriptor.

use super::descriptor::EntityDescriptor;
use super::record::Record;
use crate::error::RepoResult;

/// Storage-assigned identity.
pub type EntityId = i64;

/// Lifecycle of one entity instance relative to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// No identity assigned yet.
    Transient,
    /// Identity assigned and a stored row matches it.
    Persisted,
    /// Identity assigned but the stored row is gone.
    Deleted,
}

/// A persistable type described by a static `EntityDescriptor`.
pub trait Entity: Sized {
    fn descriptor() -> &'static EntityDescriptor;

    fn id(&self) -> Option<EntityId>;

    /// Called once by the gateway after the first insert commits.
    fn set_id(&mut self, id: EntityId);

    /// Snapshot of scalar, foreign-key and collection attributes.
    fn to_record(&self) -> Record;

    /// Rebuilds the entity from a stored record, collections included.
    fn from_record(record: &Record) -> RepoResult<Self>;

    /// In-memory collection backing a collection-typed association.
    ///
    /// Types without collections keep the default.
    fn collection_mut(&mut self, _association: &str) -> Option<&mut Vec<EntityId>> {
        None
    }
}
