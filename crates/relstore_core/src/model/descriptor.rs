//! Static entity descriptors.
//!
//! # Responsibility
//! - Describe how an entity type maps onto tables: identity, columns, an
//!   optional shared fragment table, and associations to other types.
//! - Validate descriptor names before they are interpolated into SQL.
//!
//! # Invariants
//! - Every table, column and association name is a plain identifier.
//! - To-one associations point at a foreign key declared in `columns`.
//! - Related descriptors are resolved lazily through a function pointer so
//!   two types can reference each other.

use crate::error::ConfigurationError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// One stored column of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    /// Saving fails with `MissingAttribute` when a required column is null.
    pub required: bool,
}

impl Column {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
        }
    }
}

/// Attribute fragment shared by several entity types and stored in its own
/// table, joined to each concrete table on identity.
///
/// The parent table assigns identities; concrete rows reuse them.
#[derive(Debug)]
pub struct SharedMapping {
    pub mapping: &'static str,
    pub identity: &'static str,
    pub columns: &'static [Column],
}

/// Relationship shape and its storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// Foreign key on this entity's table.
    ManyToOne { foreign_key: &'static str },
    /// Foreign key on this entity's table, at most one referrer per target.
    OneToOne { foreign_key: &'static str },
    /// Foreign key on the related table pointing back at this identity.
    OneToMany { foreign_key: &'static str },
    /// Link rows in `join_table`; `owner_column` holds this identity.
    ManyToMany {
        join_table: &'static str,
        owner_column: &'static str,
        related_column: &'static str,
    },
}

impl AssociationKind {
    /// Collection-typed associations can be mutated through
    /// `add_to_association`.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::OneToMany { .. } | Self::ManyToMany { .. })
    }
}

/// Named association declared on an entity type.
#[derive(Debug, Clone, Copy)]
pub struct AssociationDescriptor {
    pub name: &'static str,
    pub kind: AssociationKind,
    pub related: fn() -> &'static EntityDescriptor,
}

impl AssociationDescriptor {
    pub fn related_descriptor(&self) -> &'static EntityDescriptor {
        (self.related)()
    }
}

/// Where an attribute name resolves on a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeLocation {
    Identity,
    Own(Column),
    Shared(Column),
}

/// Mapping metadata for one entity type.
#[derive(Debug)]
pub struct EntityDescriptor {
    /// Table holding this type's own columns.
    pub mapping: &'static str,
    pub identity: &'static str,
    pub columns: &'static [Column],
    pub shared: Option<&'static SharedMapping>,
    pub associations: &'static [AssociationDescriptor],
}

impl EntityDescriptor {
    /// Validates names and key references.
    ///
    /// Runs on every gateway call; descriptors are never cached as valid.
    ///
    /// # Errors
    /// - `InvalidIdentifier` for any non-identifier name.
    /// - `DuplicateAttribute` for repeated column or association names.
    /// - `UnknownAttribute` when a to-one foreign key is not a declared column.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        ensure_identifier(self.mapping)?;
        ensure_identifier(self.identity)?;

        let mut attributes = BTreeSet::new();
        attributes.insert(self.identity);
        let shared_columns = self.shared.map_or(&[][..], |shared| shared.columns);
        for column in self.columns.iter().chain(shared_columns) {
            ensure_identifier(column.name)?;
            if !attributes.insert(column.name) {
                return Err(ConfigurationError::DuplicateAttribute {
                    mapping: self.mapping,
                    attribute: column.name.to_string(),
                });
            }
        }

        if let Some(shared) = self.shared {
            ensure_identifier(shared.mapping)?;
            ensure_identifier(shared.identity)?;
        }

        let mut associations = BTreeSet::new();
        for association in self.associations {
            ensure_identifier(association.name)?;
            if !associations.insert(association.name) {
                return Err(ConfigurationError::DuplicateAttribute {
                    mapping: self.mapping,
                    attribute: association.name.to_string(),
                });
            }

            match association.kind {
                AssociationKind::ManyToOne { foreign_key }
                | AssociationKind::OneToOne { foreign_key } => {
                    if !self.columns.iter().any(|column| column.name == foreign_key) {
                        return Err(ConfigurationError::UnknownAttribute {
                            mapping: self.mapping,
                            attribute: foreign_key.to_string(),
                        });
                    }
                }
                AssociationKind::OneToMany { foreign_key } => ensure_identifier(foreign_key)?,
                AssociationKind::ManyToMany {
                    join_table,
                    owner_column,
                    related_column,
                } => {
                    ensure_identifier(join_table)?;
                    ensure_identifier(owner_column)?;
                    ensure_identifier(related_column)?;
                }
            }
        }

        Ok(())
    }

    /// Looks up a declared association by name.
    pub fn association(&self, name: &str) -> Result<&AssociationDescriptor, ConfigurationError> {
        self.associations
            .iter()
            .find(|association| association.name == name)
            .ok_or_else(|| ConfigurationError::UnknownAssociation {
                mapping: self.mapping,
                association: name.to_string(),
            })
    }

    /// Resolves an attribute name to identity, own or shared column.
    pub fn locate(&self, attribute: &str) -> Option<AttributeLocation> {
        if attribute == self.identity {
            return Some(AttributeLocation::Identity);
        }
        if let Some(column) = self.columns.iter().find(|c| c.name == attribute) {
            return Some(AttributeLocation::Own(*column));
        }
        self.shared
            .and_then(|shared| shared.columns.iter().find(|c| c.name == attribute))
            .map(|column| AttributeLocation::Shared(*column))
    }

    /// Collection-typed associations in declaration order.
    pub fn collections(&self) -> impl Iterator<Item = &AssociationDescriptor> {
        self.associations
            .iter()
            .filter(|association| association.kind.is_collection())
    }
}

/// Rejects names that cannot be interpolated into SQL verbatim.
pub fn ensure_identifier(name: &str) -> Result<(), ConfigurationError> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidIdentifier(name.to_string()))
    }
}
