//! Relationship query engine.
//!
//! # Responsibility
//! - Answer "which `E` are associated with this `R`" for any declared
//!   association kind by aliasing the association and restricting the alias
//!   identity.
//!
//! # Invariants
//! - The association must be declared on `E` and relate to `R`'s mapping.
//! - A related entity without identity is a caller error, not an empty
//!   result.
//! - Results are fully materialized and free of duplicates.

use super::criteria::Criteria;
use super::entity_repo::{fetch_entities, rejected};
use crate::error::{ConfigurationError, RepoResult};
use crate::model::{AssociationDescriptor, Entity, EntityDescriptor};
use crate::session::SessionFactory;

pub(crate) fn query_by_association<E: Entity, R: Entity>(
    factory: &SessionFactory,
    association: &str,
    related: &R,
) -> RepoResult<Vec<E>> {
    let criteria = association_criteria::<E, R>(association, related)
        .map_err(|err| rejected("query_by_association", E::descriptor(), err))?;
    fetch_entities::<E>(factory, "query_by_association", &criteria)
}

/// Builds `E` criteria aliasing `association` and pinning the alias
/// identity to `related`.
pub(crate) fn association_criteria<E: Entity, R: Entity>(
    association: &str,
    related: &R,
) -> RepoResult<Criteria> {
    let descriptor = E::descriptor();
    descriptor.validate()?;
    let declared = descriptor.association(association)?;
    let related_descriptor = R::descriptor();
    ensure_related_type(declared, related_descriptor)?;

    let related_id = related
        .id()
        .ok_or(ConfigurationError::UnidentifiedRelated {
            mapping: related_descriptor.mapping,
        })?;

    Ok(Criteria::new()
        .create_alias(association, association)
        .eq(
            format!("{association}.{}", related_descriptor.identity),
            related_id,
        ))
}

/// Fails when `declared` does not point at `actual`'s mapping.
pub(crate) fn ensure_related_type(
    declared: &AssociationDescriptor,
    actual: &EntityDescriptor,
) -> Result<(), ConfigurationError> {
    let expected = declared.related_descriptor().mapping;
    if expected == actual.mapping {
        Ok(())
    } else {
        Err(ConfigurationError::RelatedTypeMismatch {
            association: declared.name.to_string(),
            expected,
            actual: actual.mapping,
        })
    }
}
