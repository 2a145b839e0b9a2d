//! Association mutator.
//!
//! # Responsibility
//! - Append a related identity to an owner's collection, persist the owner
//!   and link the related row in one unit of work.
//!
//! # Invariants
//! - Only the owner passed in is mutated in memory; the related entity and
//!   the inverse side's collection stay as they were.
//! - The link is written even when the identity was already listed, so a
//!   one-to-many member moves to this owner.
//! - A failed save leaves the owner's collection as it was before the call.

use super::entity_repo::{rejected, SqliteEntityRepository};
use super::relationship::ensure_related_type;
use super::statement;
use crate::error::{ConfigurationError, RepoResult};
use crate::model::{Entity, EntityId};
use log::info;

pub(crate) fn add_to_association<O: Entity, R: Entity>(
    repo: &SqliteEntityRepository,
    owner: &mut O,
    related: &R,
    association: &str,
) -> RepoResult<()> {
    let descriptor = O::descriptor();
    let related_id = resolve_target::<O, R>(association, related)
        .map_err(|err| rejected("add_to_association", descriptor, err.into()))?;

    let not_a_collection = || ConfigurationError::NotACollection {
        mapping: descriptor.mapping,
        association: association.to_string(),
    };
    let collection = owner
        .collection_mut(association)
        .ok_or_else(not_a_collection)
        .map_err(|err| rejected("add_to_association", descriptor, err.into()))?;

    let appended = !collection.contains(&related_id);
    if appended {
        collection.push(related_id);
    }

    let saved = repo.save_with(owner, "add_to_association", |conn, owner_id| {
        statement::link_member(conn, descriptor, association, owner_id, related_id)
    });
    if let Err(err) = saved {
        if appended {
            if let Some(collection) = owner.collection_mut(association) {
                collection.retain(|id| *id != related_id);
            }
        }
        return Err(err);
    }

    info!(
        "event=association_add module=repo status=ok mapping={} association={} related_id={} appended={}",
        descriptor.mapping, association, related_id, appended
    );
    Ok(())
}

fn resolve_target<O: Entity, R: Entity>(
    association: &str,
    related: &R,
) -> Result<EntityId, ConfigurationError> {
    let descriptor = O::descriptor();
    descriptor.validate()?;
    let declared = descriptor.association(association)?;
    if !declared.kind.is_collection() {
        return Err(ConfigurationError::NotACollection {
            mapping: descriptor.mapping,
            association: association.to_string(),
        });
    }
    let related_descriptor = R::descriptor();
    ensure_related_type(declared, related_descriptor)?;

    related.id().ok_or(ConfigurationError::UnidentifiedRelated {
        mapping: related_descriptor.mapping,
    })
}
