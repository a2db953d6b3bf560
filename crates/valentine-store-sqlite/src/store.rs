//! [`SqliteStore`] — the SQLite implementation of [`RecordStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use tracing::debug;
use valentine_core::store::{RecordStore, STORAGE_KEY};

use crate::{Error, Result, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A record store backed by one row of a SQLite key-value table.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  key:  String,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  /// Documents are kept under [`STORAGE_KEY`].
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, STORAGE_KEY).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, STORAGE_KEY).await
  }

  /// Use `key` instead of [`STORAGE_KEY`] for this handle.
  pub fn with_key(self, key: impl Into<String>) -> Result<Self> {
    let key = key.into();
    if key.is_empty() {
      return Err(Error::EmptyKey);
    }
    Ok(Self { key, ..self })
  }

  pub fn key(&self) -> &str { &self.key }

  async fn init(conn: tokio_rusqlite::Connection, key: &str) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, key: key.to_owned() })
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  async fn load(&self) -> Result<Option<String>> {
    let key = self.key.clone();

    let value: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM kv WHERE key = ?1",
              rusqlite::params![key],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(value)
  }

  async fn persist(&self, document: String) -> Result<()> {
    let key = self.key.clone();
    let len = document.len();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO kv (key, value) VALUES (?1, ?2)
           ON CONFLICT (key) DO UPDATE SET
             value      = excluded.value,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
          rusqlite::params![key, document],
        )?;
        Ok(())
      })
      .await?;

    debug!(key = %self.key, bytes = len, "document persisted");
    Ok(())
  }
}
