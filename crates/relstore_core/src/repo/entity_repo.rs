//! Generic entity repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide save/delete/find/list over any `Entity` type.
//! - Route relationship queries and association mutation through the same
//!   per-operation transaction boundary.
//!
//! # Invariants
//! - Each call opens, commits or rolls back, and releases exactly one unit
//!   of work; no call spans two.
//! - Descriptor and record checks run before storage is touched.
//! - Absence is `None`; failures are always returned, never logged and
//!   dropped.

use super::criteria::Criteria;
use super::statement;
use super::{mutator, relationship};
use crate::error::{PersistenceError, RepoError, RepoResult};
use crate::model::{Entity, EntityDescriptor, EntityId, EntityState};
use crate::session::{SessionFactory, TransactionMode};
use log::{debug, info, warn};
use rusqlite::Connection;

/// Repository interface for generic entity persistence.
pub trait EntityRepository {
    /// Inserts a transient entity or updates a persisted one.
    ///
    /// Assigns the identity on insert and returns it.
    fn save_or_update<E: Entity>(&self, entity: &mut E) -> RepoResult<EntityId>;
    /// Deletes by the entity's identity. Transient entities are rejected.
    fn delete<E: Entity>(&self, entity: &E) -> RepoResult<bool>;
    /// Deletes by identity; returns whether a row was removed.
    fn delete_by_id<E: Entity>(&self, id: EntityId) -> RepoResult<bool>;
    fn find_by_id<E: Entity>(&self, id: EntityId) -> RepoResult<Option<E>>;
    fn find_all<E: Entity>(&self) -> RepoResult<Vec<E>>;
    fn list_by<E: Entity>(&self, criteria: &Criteria) -> RepoResult<Vec<E>>;
    /// Like `list_by` but fails when more than one entity matches.
    fn unique_by<E: Entity>(&self, criteria: &Criteria) -> RepoResult<Option<E>>;
    fn state_of<E: Entity>(&self, entity: &E) -> RepoResult<EntityState>;
    /// Entities of `E` whose `association` contains `related`.
    fn query_by_association<E: Entity, R: Entity>(
        &self,
        association: &str,
        related: &R,
    ) -> RepoResult<Vec<E>>;
    /// Appends `related` to `owner`'s collection, saves `owner` and links
    /// `related` to it in the same unit of work.
    fn add_to_association<O: Entity, R: Entity>(
        &self,
        owner: &mut O,
        related: &R,
        association: &str,
    ) -> RepoResult<()>;
}

/// SQLite-backed repository. Cheap to clone; clones share one factory.
#[derive(Clone)]
pub struct SqliteEntityRepository {
    factory: SessionFactory,
}

impl SqliteEntityRepository {
    pub fn new(factory: SessionFactory) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &SessionFactory {
        &self.factory
    }

    /// Saves `entity`, then runs `after` with its identity inside the same
    /// unit of work. Failure in either step rolls both back.
    pub(crate) fn save_with<E, F>(
        &self,
        entity: &mut E,
        operation: &'static str,
        after: F,
    ) -> RepoResult<EntityId>
    where
        E: Entity,
        F: FnOnce(&Connection, EntityId) -> RepoResult<()>,
    {
        let descriptor = E::descriptor();
        let record = entity.to_record();
        let existing_id = entity.id();
        descriptor
            .validate()
            .map_err(RepoError::from)
            .and_then(|()| statement::check_record(descriptor, &record))
            .map_err(|err| rejected(operation, descriptor, err))?;

        let id = self
            .factory
            .with_transaction(operation, TransactionMode::Write, |unit| {
                let conn = unit.connection();
                statement::ensure_mapping(conn, descriptor)?;
                let id = match existing_id {
                    Some(id) => {
                        statement::update(conn, descriptor, &record, id)?;
                        id
                    }
                    None => statement::insert(conn, descriptor, &record)?,
                };
                statement::sync_collections(conn, descriptor, &record, id)?;
                after(conn, id)?;
                Ok(id)
            })?;

        if existing_id.is_none() {
            entity.set_id(id);
        }
        info!(
            "event=entity_save module=repo status=ok op={} mapping={} id={} mode={}",
            operation,
            descriptor.mapping,
            id,
            if existing_id.is_some() { "update" } else { "insert" }
        );
        Ok(id)
    }
}

impl EntityRepository for SqliteEntityRepository {
    fn save_or_update<E: Entity>(&self, entity: &mut E) -> RepoResult<EntityId> {
        self.save_with(entity, "save_or_update", |_, _| Ok(()))
    }

    fn delete<E: Entity>(&self, entity: &E) -> RepoResult<bool> {
        let descriptor = E::descriptor();
        match entity.id() {
            Some(id) => self.delete_by_id::<E>(id),
            None => Err(rejected(
                "delete",
                descriptor,
                PersistenceError::Unidentified {
                    mapping: descriptor.mapping,
                }
                .into(),
            )),
        }
    }

    fn delete_by_id<E: Entity>(&self, id: EntityId) -> RepoResult<bool> {
        let descriptor = E::descriptor();
        descriptor
            .validate()
            .map_err(|err| rejected("delete_by_id", descriptor, err.into()))?;

        let removed = self
            .factory
            .with_transaction("delete_by_id", TransactionMode::Write, |unit| {
                statement::delete(unit.connection(), descriptor, id)
            })?;

        info!(
            "event=entity_delete module=repo status=ok mapping={} id={} removed={}",
            descriptor.mapping, id, removed
        );
        Ok(removed)
    }

    fn find_by_id<E: Entity>(&self, id: EntityId) -> RepoResult<Option<E>> {
        let descriptor = E::descriptor();
        let query = Criteria::new()
            .eq(descriptor.identity, id)
            .max_results(2)
            .compile(descriptor)
            .map_err(|err| rejected("find_by_id", descriptor, err))?;

        self.factory
            .with_transaction("find_by_id", TransactionMode::Read, |unit| {
                let records = statement::fetch(unit.connection(), descriptor, &query)?;
                match records.as_slice() {
                    [] => Ok(None),
                    [record] => E::from_record(record).map(Some),
                    _ => Err(PersistenceError::DuplicateIdentity {
                        mapping: descriptor.mapping,
                        id,
                    }
                    .into()),
                }
            })
    }

    fn find_all<E: Entity>(&self) -> RepoResult<Vec<E>> {
        fetch_entities::<E>(&self.factory, "find_all", &Criteria::new())
    }

    fn list_by<E: Entity>(&self, criteria: &Criteria) -> RepoResult<Vec<E>> {
        fetch_entities::<E>(&self.factory, "list_by", criteria)
    }

    fn unique_by<E: Entity>(&self, criteria: &Criteria) -> RepoResult<Option<E>> {
        let descriptor = E::descriptor();
        let mut matches =
            fetch_entities::<E>(&self.factory, "unique_by", &criteria.clone().max_results(2))?;
        if matches.len() > 1 {
            return Err(rejected(
                "unique_by",
                descriptor,
                PersistenceError::NonUniqueResult {
                    mapping: descriptor.mapping,
                }
                .into(),
            ));
        }
        Ok(matches.pop())
    }

    fn state_of<E: Entity>(&self, entity: &E) -> RepoResult<EntityState> {
        let descriptor = E::descriptor();
        let Some(id) = entity.id() else {
            return Ok(EntityState::Transient);
        };
        descriptor
            .validate()
            .map_err(|err| rejected("state_of", descriptor, err.into()))?;

        let exists = self
            .factory
            .with_transaction("state_of", TransactionMode::Read, |unit| {
                statement::row_exists(unit.connection(), descriptor, id)
            })?;
        Ok(if exists {
            EntityState::Persisted
        } else {
            EntityState::Deleted
        })
    }

    fn query_by_association<E: Entity, R: Entity>(
        &self,
        association: &str,
        related: &R,
    ) -> RepoResult<Vec<E>> {
        relationship::query_by_association::<E, R>(&self.factory, association, related)
    }

    fn add_to_association<O: Entity, R: Entity>(
        &self,
        owner: &mut O,
        related: &R,
        association: &str,
    ) -> RepoResult<()> {
        mutator::add_to_association(self, owner, related, association)
    }
}

/// Compiles `criteria` for `E`, runs it in one read unit of work and
/// materializes every match.
pub(crate) fn fetch_entities<E: Entity>(
    factory: &SessionFactory,
    operation: &'static str,
    criteria: &Criteria,
) -> RepoResult<Vec<E>> {
    let descriptor = E::descriptor();
    let query = criteria
        .compile(descriptor)
        .map_err(|err| rejected(operation, descriptor, err))?;

    let entities = factory.with_transaction(operation, TransactionMode::Read, |unit| {
        statement::fetch(unit.connection(), descriptor, &query)?
            .iter()
            .map(E::from_record)
            .collect::<RepoResult<Vec<_>>>()
    })?;

    debug!(
        "event=entity_fetch module=repo status=ok op={} mapping={} count={}",
        operation,
        descriptor.mapping,
        entities.len()
    );
    Ok(entities)
}

/// Logs a failure detected outside a unit of work and hands it back.
pub(crate) fn rejected(
    operation: &'static str,
    descriptor: &EntityDescriptor,
    err: RepoError,
) -> RepoError {
    warn!(
        "event={} module=repo status=rejected mapping={} error={}",
        operation, descriptor.mapping, err
    );
    err
}
