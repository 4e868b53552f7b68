//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for Trust Diary. It uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use trustdiary_core::{
    DiaryEntry, Ed25519PublicKey, Ed25519Signature, EntryId, IdentityRecord, PermissionSet,
    TrustRecord, X25519PublicKey,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            f(&mut conn)
        })
        .await?
    }
}

fn blob<const N: usize>(bytes: Vec<u8>, column: &str) -> Result<[u8; N]> {
    let got = bytes.len();
    bytes.try_into().map_err(|_| {
        StoreError::InvalidData(format!("{column}: expected {N} bytes, got {got}"))
    })
}

type IdentityRow = (Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>, i64);

fn identity_from_row(row: IdentityRow) -> Result<IdentityRecord> {
    let (sign_seed, sign_public_key, enc_secret, enc_public_key, created_at) = row;
    Ok(IdentityRecord {
        sign_seed: blob(sign_seed, "sign_seed")?,
        sign_public_key: Ed25519PublicKey::from_bytes(blob(sign_public_key, "sign_public_key")?),
        enc_secret: blob(enc_secret, "enc_secret")?,
        enc_public_key: X25519PublicKey::from_bytes(blob(enc_public_key, "enc_public_key")?),
        created_at,
    })
}

type TrustRow = (Vec<u8>, Vec<u8>, String, String, i64);

fn trust_from_row(row: TrustRow) -> Result<TrustRecord> {
    let (sign_public_key, enc_public_key, display_name, permissions, trusted_at) = row;
    Ok(TrustRecord {
        sign_public_key: Ed25519PublicKey::from_bytes(blob(sign_public_key, "sign_public_key")?),
        enc_public_key: X25519PublicKey::from_bytes(blob(enc_public_key, "enc_public_key")?),
        display_name,
        permissions: PermissionSet::from_csv(&permissions)?,
        trusted_at,
    })
}

type EntryRow = (i64, String, String, Option<String>, String, i64, Option<Vec<u8>>);

const ENTRY_COLUMNS: &str = "id, title, content, mood, author, created_at, signature";

fn read_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn entry_from_row(row: EntryRow) -> Result<DiaryEntry> {
    let (id, title, content, mood, author, created_at, signature) = row;
    let signature = signature
        .map(|bytes| blob(bytes, "signature").map(Ed25519Signature::from_bytes))
        .transpose()?;

    Ok(DiaryEntry {
        id: id as EntryId,
        title,
        content,
        mood,
        author,
        created_at,
        signature,
    })
}

fn select_entry(conn: &Connection, id: EntryId) -> Result<Option<DiaryEntry>> {
    let row = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
            params![id as i64],
            read_entry_row,
        )
        .optional()?;
    row.map(entry_from_row).transpose()
}

#[async_trait]
impl Store for SqliteStore {
    async fn load_identity(&self) -> Result<Option<IdentityRecord>> {
        self.run(|conn| {
            let row: Option<IdentityRow> = conn
                .query_row(
                    "SELECT sign_seed, sign_public_key, enc_secret, enc_public_key, created_at
                     FROM identity WHERE id = 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
                )
                .optional()?;
            row.map(identity_from_row).transpose()
        })
        .await
    }

    async fn save_identity(&self, record: &IdentityRecord) -> Result<()> {
        let record = record.clone();
        self.run(move |conn| {
            let tx = conn.transaction()?;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM identity WHERE id = 1)",
                [],
                |row| row.get(0),
            )?;
            if exists {
                return Err(StoreError::AlreadyExists("identity".into()));
            }

            tx.execute(
                "INSERT INTO identity
                     (id, sign_seed, sign_public_key, enc_secret, enc_public_key, created_at)
                 VALUES (1, ?1, ?2, ?3, ?4, ?5)",
                params![
                    record.sign_seed.as_slice(),
                    record.sign_public_key.as_bytes().as_slice(),
                    record.enc_secret.as_slice(),
                    record.enc_public_key.as_bytes().as_slice(),
                    record.created_at,
                ],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn upsert_trust_record(&self, record: &TrustRecord) -> Result<()> {
        let record = record.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO trusted
                     (sign_public_key, enc_public_key, display_name, permissions, trusted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(sign_public_key) DO UPDATE SET
                    enc_public_key = excluded.enc_public_key,
                    display_name = excluded.display_name,
                    permissions = excluded.permissions,
                    trusted_at = excluded.trusted_at",
                params![
                    record.sign_public_key.as_bytes().as_slice(),
                    record.enc_public_key.as_bytes().as_slice(),
                    record.display_name,
                    record.permissions.to_csv(),
                    record.trusted_at,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove_trust_record(&self, key: &Ed25519PublicKey) -> Result<bool> {
        let key = *key;
        self.run(move |conn| {
            let removed = conn.execute(
                "DELETE FROM trusted WHERE sign_public_key = ?1",
                params![key.as_bytes().as_slice()],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list_trust_records(&self) -> Result<Vec<TrustRecord>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT sign_public_key, enc_public_key, display_name, permissions, trusted_at
                 FROM trusted ORDER BY position",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                })?
                .collect::<rusqlite::Result<Vec<TrustRow>>>()?;

            rows.into_iter().map(trust_from_row).collect()
        })
        .await
    }

    async fn append_entry(&self, entry: &DiaryEntry) -> Result<InsertResult> {
        let entry = entry.clone();
        self.run(move |conn| {
            let tx = conn.transaction()?;

            if let Some(existing) = select_entry(&tx, entry.id)? {
                return Ok(if existing == entry {
                    InsertResult::AlreadyExists
                } else {
                    InsertResult::Conflict { existing: entry.id }
                });
            }

            tx.execute(
                &format!(
                    "INSERT INTO entries ({ENTRY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                ),
                params![
                    entry.id as i64,
                    entry.title,
                    entry.content,
                    entry.mood,
                    entry.author,
                    entry.created_at,
                    entry.signature.as_ref().map(|s| s.as_bytes().to_vec()),
                ],
            )?;

            tx.commit()?;
            Ok(InsertResult::Inserted)
        })
        .await
    }

    async fn list_entries(&self) -> Result<Vec<DiaryEntry>> {
        self.run(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {ENTRY_COLUMNS} FROM entries ORDER BY id"))?;
            let rows = stmt
                .query_map([], read_entry_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter().map(entry_from_row).collect()
        })
        .await
    }

    async fn get_entry(&self, id: EntryId) -> Result<Option<DiaryEntry>> {
        self.run(move |conn| select_entry(conn, id)).await
    }
}
