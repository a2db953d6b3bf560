//! The `RecordStore` port and an in-memory implementation.
//!
//! A record store holds the entire message collection as one serialised
//! document under a single key. It knows nothing about the document's shape;
//! (de)serialisation belongs to [`crate::repository::MessageRepository`].
//! Writes overwrite the whole document. There is no append and no
//! transaction, so two independent writers can lose each other's updates.

use std::{
  convert::Infallible,
  future::Future,
  sync::{Arc, Mutex, PoisonError},
};

/// The key under which the message collection is stored.
pub const STORAGE_KEY: &str = "valentine_messages";

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a whole-collection key-value backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the raw document. Returns `None` if nothing has been written yet.
  fn load(
    &self,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  /// Replace the stored document with `document`.
  fn persist(
    &self,
    document: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── In-memory backend ───────────────────────────────────────────────────────

/// A record store that lives only as long as the process.
///
/// Cloning is cheap and clones share the same document.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  document: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Start from a pre-existing raw document, valid or not.
  pub fn with_document(document: impl Into<String>) -> Self {
    Self { document: Arc::new(Mutex::new(Some(document.into()))) }
  }

  /// The raw document as last persisted.
  pub fn document(&self) -> Option<String> {
    self.document.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }
}

impl RecordStore for MemoryStore {
  type Error = Infallible;

  async fn load(&self) -> Result<Option<String>, Infallible> { Ok(self.document()) }

  async fn persist(&self, document: String) -> Result<(), Infallible> {
    *self.document.lock().unwrap_or_else(PoisonError::into_inner) = Some(document);
    Ok(())
  }
}
