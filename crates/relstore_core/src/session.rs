//! Session factory and per-operation transaction boundary.
//!
//! # Responsibility
//! - Hand out independent sessions, one connection each.
//! - Run exactly one operation per transaction: commit on success, roll back
//!   on failure, release the connection on every exit path.
//!
//! # Invariants
//! - The factory bootstraps its location at most once, lazily.
//! - No session or transaction is shared between operations or threads.
//! - At most one unit of work is active per thread; nesting is rejected.

use crate::config::StoreConfig;
use crate::db::{open_connection, prepare_location, schema, DbError};
use crate::error::{ConfigurationError, RepoResult};
use log::{debug, error, warn};
use once_cell::sync::OnceCell;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::cell::Cell;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

thread_local! {
    static UNIT_OF_WORK_ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Locking intent of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Deferred transaction; takes the write lock only if it writes.
    Read,
    /// Immediate transaction; takes the write lock up front.
    Write,
}

impl TransactionMode {
    fn behavior(self) -> TransactionBehavior {
        match self {
            Self::Read => TransactionBehavior::Deferred,
            Self::Write => TransactionBehavior::Immediate,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// Process-wide source of sessions. Cloning shares the same bootstrap state.
#[derive(Clone)]
pub struct SessionFactory {
    inner: Arc<FactoryInner>,
}

struct FactoryInner {
    config: StoreConfig,
    // Memory databases vanish when their last connection closes. The mutex
    // doubles as the memory-store transaction gate.
    anchor: OnceCell<Option<Mutex<Connection>>>,
}

impl SessionFactory {
    /// Creates a factory without touching storage.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(FactoryInner {
                config,
                anchor: OnceCell::new(),
            }),
        }
    }

    /// Opens an independent session, bootstrapping the location on first use.
    pub fn open_session(&self) -> RepoResult<Session> {
        self.bootstrap()?;
        let conn = open_connection(&self.inner.config)?;
        Ok(Session { conn })
    }

    /// Returns the memory anchor, if any, after preparing the location once.
    fn bootstrap(&self) -> RepoResult<Option<&Mutex<Connection>>> {
        let anchor = self
            .inner
            .anchor
            .get_or_try_init(|| -> Result<_, DbError> {
                Ok(prepare_location(&self.inner.config)?.map(Mutex::new))
            })?;
        Ok(anchor.as_ref())
    }

    /// Runs `operation` inside one fresh transaction.
    ///
    /// # Contract
    /// - `Ok` commits; `Err` rolls back and is returned unchanged.
    /// - Units of work on a memory store are serialized; file stores rely on
    ///   SQLite locking and the busy timeout.
    /// - A panic inside `operation` rolls back when the transaction drops.
    /// - The session connection is closed before this returns.
    ///
    /// # Errors
    /// - `ConfigurationError::NestedTransaction` when called from inside
    ///   another unit of work on this thread; storage is not touched.
    pub fn with_transaction<T, F>(
        &self,
        operation: &'static str,
        mode: TransactionMode,
        body: F,
    ) -> RepoResult<T>
    where
        F: FnOnce(&UnitOfWork<'_>) -> RepoResult<T>,
    {
        let _guard = ActiveGuard::acquire()?;
        let started_at = Instant::now();
        // Shared-cache tables report SQLITE_LOCKED, which the busy timeout
        // never retries, so memory units of work run one at a time.
        let _gate = self
            .bootstrap()?
            .map(|anchor| anchor.lock().unwrap_or_else(PoisonError::into_inner));
        let mut session = self.open_session()?;
        let tx = session.conn.transaction_with_behavior(mode.behavior())?;
        debug!(
            "event=tx_begin module=session op={} mode={}",
            operation,
            mode.label()
        );

        let unit = UnitOfWork { tx, operation };
        match body(&unit) {
            Ok(value) => {
                unit.tx.commit().map_err(|err| {
                    error!(
                        "event=tx_commit module=session status=error op={} duration_ms={} error={}",
                        operation,
                        started_at.elapsed().as_millis(),
                        err
                    );
                    err
                })?;
                debug!(
                    "event=tx_commit module=session status=ok op={} duration_ms={}",
                    operation,
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                match unit.tx.rollback() {
                    Ok(()) => warn!(
                        "event=tx_rollback module=session status=ok op={} duration_ms={} cause={}",
                        operation,
                        started_at.elapsed().as_millis(),
                        err
                    ),
                    Err(rollback_err) => error!(
                        "event=tx_rollback module=session status=error op={} duration_ms={} cause={} error={}",
                        operation,
                        started_at.elapsed().as_millis(),
                        err,
                        rollback_err
                    ),
                }
                Err(err)
            }
        }
    }

    /// Executes caller-owned DDL in one write transaction.
    pub fn apply_schema(&self, ddl: &str) -> RepoResult<()> {
        self.with_transaction("apply_schema", TransactionMode::Write, |unit| {
            schema::apply_schema(unit.connection(), ddl)?;
            Ok(())
        })
    }
}

/// One open connection. Dropping it closes the connection.
pub struct Session {
    conn: Connection,
}

impl Session {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Transaction scope handed to exactly one operation.
pub struct UnitOfWork<'conn> {
    tx: Transaction<'conn>,
    operation: &'static str,
}

impl UnitOfWork<'_> {
    pub fn connection(&self) -> &Connection {
        &self.tx
    }

    /// Name of the gateway operation owning this unit of work.
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

struct ActiveGuard;

impl ActiveGuard {
    fn acquire() -> Result<Self, ConfigurationError> {
        UNIT_OF_WORK_ACTIVE.with(|active| {
            if active.replace(true) {
                Err(ConfigurationError::NestedTransaction)
            } else {
                Ok(Self)
            }
        })
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        UNIT_OF_WORK_ACTIVE.with(|active| active.set(false));
    }
}
