//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;
use trustdiary_core::now_millis;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(version = CURRENT_VERSION, "schema migrated");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- The local identity. At most one row.
        CREATE TABLE identity (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            sign_seed BLOB NOT NULL,          -- 32 bytes, Ed25519 secret seed
            sign_public_key BLOB NOT NULL,    -- 32 bytes
            enc_secret BLOB NOT NULL,         -- 32 bytes, X25519 static secret
            enc_public_key BLOB NOT NULL,     -- 32 bytes
            created_at INTEGER NOT NULL
        );

        -- Trust list. position preserves insertion order across upserts.
        CREATE TABLE trusted (
            position INTEGER PRIMARY KEY AUTOINCREMENT,
            sign_public_key BLOB NOT NULL UNIQUE,
            enc_public_key BLOB NOT NULL,
            display_name TEXT NOT NULL,
            permissions TEXT NOT NULL,        -- comma-separated names
            trusted_at INTEGER NOT NULL
        );

        -- Entry log.
        CREATE TABLE entries (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            mood TEXT,
            author TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            signature BLOB                    -- 64 bytes, nullable
        );
        "#,
    )?;

    Ok(())
}
