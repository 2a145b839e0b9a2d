//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or shared-cache in-memory SQLite connections.
//! - Configure connection pragmas required by the gateway.
//! - Prepare the database location once per factory.
//!
//! # Invariants
//! - Returned connections have `foreign_keys` applied per config.
//! - A memory location stays alive only while its anchor connection is held.

use super::DbResult;
use crate::config::{DatabaseLocation, StoreConfig};
use log::{debug, error, info};
use rusqlite::Connection;
use std::time::{Duration, Instant};

/// Opens one configured connection for a single unit of work.
///
/// # Side effects
/// - Emits `db_open` debug events with duration and status.
pub fn open_connection(config: &StoreConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = config.database.mode();

    let result = raw_open(&config.database).and_then(|conn| {
        configure_connection(&conn, config)?;
        Ok(conn)
    });

    match &result {
        Ok(_) => debug!(
            "event=db_open module=db status=ok mode={} duration_ms={}",
            mode,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        ),
    }

    result
}

/// Prepares the database location before the first session opens.
///
/// Returns the anchor connection for memory locations; the caller must keep
/// it alive for as long as the database should exist.
///
/// # Side effects
/// - File: creates missing parent directories and switches to WAL if enabled.
/// - Emits one `session_bootstrap` info event.
pub fn prepare_location(config: &StoreConfig) -> DbResult<Option<Connection>> {
    let started_at = Instant::now();
    let mode = config.database.mode();

    let result = match &config.database {
        DatabaseLocation::File { path } => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let conn = raw_open(&config.database)?;
            if config.wal {
                let _mode: String =
                    conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            }
            Ok(None)
        }
        DatabaseLocation::Memory { .. } => {
            let conn = raw_open(&config.database)?;
            configure_connection(&conn, config)?;
            Ok(Some(conn))
        }
    };

    match &result {
        Ok(_) => info!(
            "event=session_bootstrap module=db status=ok mode={} duration_ms={}",
            mode,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=session_bootstrap module=db status=error mode={} duration_ms={} error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        ),
    }

    result
}

fn raw_open(location: &DatabaseLocation) -> DbResult<Connection> {
    let conn = match location {
        DatabaseLocation::File { path } => Connection::open(path)?,
        // Default open flags include SQLITE_OPEN_URI.
        DatabaseLocation::Memory { name } => {
            Connection::open(format!("file:{name}?mode=memory&cache=shared"))?
        }
    };
    Ok(conn)
}

fn configure_connection(conn: &Connection, config: &StoreConfig) -> DbResult<()> {
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}
