//! Schema inspection and caller-owned DDL execution.

use super::DbResult;
use rusqlite::Connection;

/// Returns whether a table named `table` exists in the main schema.
pub fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Executes caller-supplied DDL as one batch.
///
/// Callers own the schema; this is a fixture/bootstrap hook, not a migrator.
pub fn apply_schema(conn: &Connection, ddl: &str) -> DbResult<()> {
    conn.execute_batch(ddl)?;
    Ok(())
}
