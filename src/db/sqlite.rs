use std::path::Path;

use rusqlite::Connection;

use super::DatabaseError;

/// Embedded schema steps, applied in order above the stored version.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../resources/migrations/001_claims.sql"))];

/// Claim cache on disk. Missing parent directories are created.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)?,
        _ => {}
    }
    prepare(Connection::open(path)?)
}

/// Throwaway cache for tests and demos.
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(conn: Connection) -> Result<Connection, DatabaseError> {
    // One writer per device; a short busy wait covers a lingering handle.
    conn.busy_timeout(std::time::Duration::from_millis(500))?;
    conn.execute_batch("PRAGMA journal_mode=DELETE; PRAGMA foreign_keys=ON;")?;
    run_migrations(&conn)?;
    Ok(conn)
}

pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let from = schema_version(conn);
    for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > from) {
        tracing::info!(version, from, "Applying claims schema migration");
        conn.execute_batch(sql)
            .map_err(|e| DatabaseError::MigrationFailed { version, reason: e.to_string() })?;
    }
    Ok(())
}

/// Highest applied migration; 0 before the first one.
pub fn schema_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .ok()
    .flatten()
    .unwrap_or(0)
}
