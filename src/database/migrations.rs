//! Schema migrations for the tabrefresh SQLite database.
//!
//! Applied versions are recorded in `schema_version`; each entry in
//! [`MIGRATIONS`] runs once, inside its own transaction.

use rusqlite::{params, Connection, OptionalExtension};

/// One forward-only schema step.
struct Migration {
    version: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Key-value store for timer state",
    sql: "CREATE TABLE IF NOT EXISTS kv_store (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL,
              updated_at INTEGER NOT NULL
          );",
}];

/// Highest version in [`MIGRATIONS`].
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Highest applied version, or 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i32>>(0)
    })
    .optional()
    .ok()
    .flatten()
    .flatten()
    .unwrap_or(0)
}

/// Bring the schema up to [`CURRENT_SCHEMA_VERSION`]. Idempotent.
pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let applied = get_schema_version(conn);
    for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
        apply(conn, migration)?;
    }
    Ok(())
}

fn apply(conn: &Connection, migration: &Migration) -> Result<(), rusqlite::Error> {
    let applied_at = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();

    conn.execute_batch("BEGIN")?;
    let result = conn.execute_batch(migration.sql).and_then(|_| {
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at, description)
             VALUES (?1, ?2, ?3)",
            params![migration.version, applied_at, migration.description],
        )
    });
    match result {
        Ok(_) => conn.execute_batch("COMMIT"),
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}
