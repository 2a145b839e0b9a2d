//! Error taxonomy for gateway and query operations.
//!
//! # Responsibility
//! - Separate storage failures (`PersistenceError`) from caller mistakes
//!   (`ConfigurationError`).
//! - Keep absence out of the error path: lookups return `Option`.
//!
//! # Invariants
//! - Every storage failure inside a unit of work is returned after rollback,
//!   never swallowed.
//! - Configuration errors are raised before any storage call where the
//!   descriptor alone is enough to detect them.

use crate::db::DbError;
use crate::model::EntityId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Top-level error returned by every gateway operation.
#[derive(Debug)]
pub enum RepoError {
    Persistence(PersistenceError),
    Configuration(ConfigurationError),
}

impl RepoError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Persistence(err) => write!(f, "persistence error: {err}"),
            Self::Configuration(err) => write!(f, "configuration error: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            Self::Configuration(err) => Some(err),
        }
    }
}

impl From<PersistenceError> for RepoError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

impl From<ConfigurationError> for RepoError {
    fn from(value: ConfigurationError) -> Self {
        Self::Configuration(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Persistence(PersistenceError::Db(value))
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persistence(PersistenceError::Db(DbError::Sqlite(value)))
    }
}

/// Storage-level failure. Always rolls back the enclosing transaction.
#[derive(Debug)]
pub enum PersistenceError {
    /// SQLite or filesystem failure, including constraint violations.
    Db(DbError),
    /// The mapped table does not exist in storage.
    UnknownMapping(&'static str),
    /// A required column is absent or null in the entity record.
    MissingAttribute {
        mapping: &'static str,
        attribute: &'static str,
    },
    /// Operation needs an identity but the entity was never persisted.
    Unidentified { mapping: &'static str },
    /// Update targeted an identity with no stored row.
    StaleIdentity { mapping: &'static str, id: EntityId },
    /// More than one row shares one identity.
    DuplicateIdentity { mapping: &'static str, id: EntityId },
    /// A unique lookup matched more than one row.
    NonUniqueResult { mapping: &'static str },
    /// A collection member points at a row that does not exist.
    DanglingReference { mapping: &'static str, id: EntityId },
    /// Stored or converted data does not match the expected shape.
    InvalidData(String),
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UnknownMapping(mapping) => write!(f, "unknown mapping `{mapping}`"),
            Self::MissingAttribute { mapping, attribute } => {
                write!(f, "required attribute `{mapping}.{attribute}` is missing")
            }
            Self::Unidentified { mapping } => {
                write!(f, "`{mapping}` entity has no identity; it was never persisted")
            }
            Self::StaleIdentity { mapping, id } => {
                write!(f, "no stored `{mapping}` row matches identity {id}")
            }
            Self::DuplicateIdentity { mapping, id } => {
                write!(f, "identity {id} is shared by several `{mapping}` rows")
            }
            Self::NonUniqueResult { mapping } => {
                write!(f, "unique query on `{mapping}` matched several rows")
            }
            Self::DanglingReference { mapping, id } => {
                write!(f, "referenced `{mapping}` row {id} does not exist")
            }
            Self::InvalidData(message) => write!(f, "invalid data: {message}"),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

/// Caller error detected from descriptors and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A table, column, association or alias name is not a plain identifier.
    InvalidIdentifier(String),
    DuplicateAttribute {
        mapping: &'static str,
        attribute: String,
    },
    UnknownAttribute {
        mapping: &'static str,
        attribute: String,
    },
    UnknownAssociation {
        mapping: &'static str,
        association: String,
    },
    UnknownAlias(String),
    DuplicateAlias(String),
    /// Mutation attempted on a to-one association or one the entity does not
    /// expose as a collection.
    NotACollection {
        mapping: &'static str,
        association: String,
    },
    RelatedTypeMismatch {
        association: String,
        expected: &'static str,
        actual: &'static str,
    },
    /// The related entity in a query or mutation has no identity.
    UnidentifiedRelated { mapping: &'static str },
    /// A unit of work was requested while another is active on this thread.
    NestedTransaction,
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(name) => write!(f, "`{name}` is not a valid identifier"),
            Self::DuplicateAttribute { mapping, attribute } => {
                write!(f, "attribute `{attribute}` declared twice on `{mapping}`")
            }
            Self::UnknownAttribute { mapping, attribute } => {
                write!(f, "`{mapping}` declares no attribute `{attribute}`")
            }
            Self::UnknownAssociation {
                mapping,
                association,
            } => write!(f, "`{mapping}` declares no association `{association}`"),
            Self::UnknownAlias(alias) => write!(f, "alias `{alias}` was never created"),
            Self::DuplicateAlias(alias) => write!(f, "alias `{alias}` created twice"),
            Self::NotACollection {
                mapping,
                association,
            } => write!(
                f,
                "association `{mapping}.{association}` is not a collection"
            ),
            Self::RelatedTypeMismatch {
                association,
                expected,
                actual,
            } => write!(
                f,
                "association `{association}` relates to `{expected}`, got `{actual}`"
            ),
            Self::UnidentifiedRelated { mapping } => {
                write!(f, "related `{mapping}` entity has no identity")
            }
            Self::NestedTransaction => {
                write!(f, "a unit of work is already active on this thread")
            }
        }
    }
}

impl Error for ConfigurationError {}
