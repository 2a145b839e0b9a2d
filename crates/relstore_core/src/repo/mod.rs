//! Repository layer: generic gateway, criteria and relationship queries.
//!
//! # Responsibility
//! - Expose entity-agnostic CRUD and relationship operations.
//! - Isolate SQL generation from entity types and callers.
//!
//! # Invariants
//! - Every public operation owns exactly one unit of work.
//! - Repository APIs return `Option` for absence and typed errors for
//!   failures.

pub mod criteria;
pub mod entity_repo;
mod mutator;
mod relationship;
mod statement;
