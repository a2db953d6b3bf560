//! [`MessageRepository`] — the CRUD façade over a [`RecordStore`].
//!
//! Every operation reads the full collection from the store. Reads never
//! fail: a missing, unreadable or malformed document is treated as an empty
//! collection. Writes re-serialise and persist the whole collection.

use std::sync::Arc;

use chrono::Utc;
use rand_core::{OsRng, RngCore as _};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
  Error, Result,
  message::{Fid, Message, MessagePatch, NewMessage, now},
  store::RecordStore,
};

const ID_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Produce a fresh message id: `<unix millis>-<9 base36 chars>`.
///
/// Uniqueness is probabilistic; [`MessageRepository::create`] rejects the
/// rare collision.
pub fn generate_id() -> String {
  let mut rng = OsRng;
  let suffix: String = (0..ID_SUFFIX_LEN)
    .map(|_| {
      let idx = rng.next_u32() as usize % ID_ALPHABET.len();
      ID_ALPHABET[idx] as char
    })
    .collect();
  format!("{}-{suffix}", Utc::now().timestamp_millis())
}

// ─── Repository ──────────────────────────────────────────────────────────────

/// Message CRUD over any [`RecordStore`].
///
/// Cloning is cheap and clones share one write lock, so read-modify-write
/// cycles issued through the same repository never interleave. Writers
/// outside this process are not coordinated.
#[derive(Clone)]
pub struct MessageRepository<S> {
  store: S,
  write: Arc<Mutex<()>>,
}

impl<S: RecordStore> MessageRepository<S> {
  pub fn new(store: S) -> Self {
    Self { store, write: Arc::new(Mutex::new(())) }
  }

  pub fn store(&self) -> &S { &self.store }

  async fn load(&self) -> Vec<Message> {
    let document = match self.store.load().await {
      Ok(Some(document)) => document,
      Ok(None) => return Vec::new(),
      Err(error) => {
        warn!(%error, "failed to read message store; treating it as empty");
        return Vec::new();
      }
    };

    serde_json::from_str(&document).unwrap_or_else(|error| {
      warn!(%error, "message store holds malformed JSON; treating it as empty");
      Vec::new()
    })
  }

  async fn persist(&self, messages: &[Message]) -> Result<()> {
    let document = serde_json::to_string(messages)?;
    self
      .store
      .persist(document)
      .await
      .map_err(|e| Error::Store(Box::new(e)))
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// Every stored message in insertion order.
  pub async fn all(&self) -> Vec<Message> { self.load().await }

  /// The first message with `id`, if any.
  pub async fn get_by_id(&self, id: &str) -> Option<Message> {
    self.load().await.into_iter().find(|m| m.id == id)
  }

  /// Messages written by `sender`, in insertion order.
  pub async fn get_by_sender(&self, sender: Fid) -> Vec<Message> {
    let mut messages = self.load().await;
    messages.retain(|m| m.sender_id == sender);
    messages
  }

  /// Messages addressed to `recipient`, in insertion order.
  pub async fn get_by_recipient(&self, recipient: Fid) -> Vec<Message> {
    let mut messages = self.load().await;
    messages.retain(|m| m.recipient_id == recipient);
    messages
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Append a new, unanswered message and persist the collection.
  ///
  /// Returns [`Error::DuplicateId`] without touching the store if the id is
  /// already taken.
  pub async fn create(&self, input: NewMessage) -> Result<Message> {
    let _guard = self.write.lock().await;
    let mut messages = self.load().await;

    if messages.iter().any(|m| m.id == input.id) {
      return Err(Error::DuplicateId(input.id));
    }

    let message = input.into_message(now());
    messages.push(message.clone());
    self.persist(&messages).await?;

    debug!(id = %message.id, recipient = %message.recipient_id, "message created");
    Ok(message)
  }

  /// Merge `patch` into the message with `id` and persist the collection.
  ///
  /// An unknown id is a silent no-op and yields `Ok(None)`. A patch that
  /// leaves the record unchanged is not written back.
  pub async fn update(
    &self,
    id: &str,
    patch: MessagePatch,
  ) -> Result<Option<Message>> {
    let _guard = self.write.lock().await;
    let mut messages = self.load().await;

    let Some(message) = messages.iter_mut().find(|m| m.id == id) else {
      debug!(id, "update skipped; no such message");
      return Ok(None);
    };

    let changed = message.apply(&patch, now())?;
    let updated = message.clone();

    if changed {
      self.persist(&messages).await?;
      debug!(id, response = ?updated.response, "message updated");
    }
    Ok(Some(updated))
  }
}
