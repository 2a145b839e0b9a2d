//! Generic transactional persistence core.
//! Entity types describe themselves; this crate stores, finds and relates them.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod session;

pub use config::{ConfigError, DatabaseLocation, LoggingConfig, StoreConfig};
pub use error::{ConfigurationError, PersistenceError, RepoError, RepoResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{
    AssociationDescriptor, AssociationKind, Column, Entity, EntityDescriptor, EntityId,
    EntityState, Record, SharedMapping,
};
pub use repo::criteria::Criteria;
pub use repo::entity_repo::{EntityRepository, SqliteEntityRepository};
pub use session::{SessionFactory, TransactionMode, UnitOfWork};

/// Minimal health-check API for smoke checks.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Builds a repository over a fresh factory for `config`.
pub fn open_repository(config: StoreConfig) -> Result<SqliteEntityRepository, ConfigError> {
    config.validate()?;
    Ok(SqliteEntityRepository::new(SessionFactory::new(config)))
}
