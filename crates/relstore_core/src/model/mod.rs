//! Entity-facing model: descriptors, records and the `Entity` trait.
//!
//! # Responsibility
//! - Define what an entity type must declare to be persisted generically.
//! - Keep business rules out; entity types live with their callers.
//!
//! # Invariants
//! - Every entity is identified by a storage-assigned `EntityId`.
//! - Deletion is physical; there are no tombstones.

pub mod descriptor;
pub mod entity;
pub mod record;

pub use descriptor::{
    AssociationDescriptor, AssociationKind, AttributeLocation, Column, EntityDescriptor,
    SharedMapping,
};
pub use entity::{Entity, EntityId, EntityState};
pub use record::Record;
