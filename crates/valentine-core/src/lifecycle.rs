//! The per-message view lifecycle, from the viewer's perspective.
//!
//! ```text
//! Loading ──► NotFound
//!    │
//!    ├──────► Unauthenticated ──(identity resolves)──► …
//!    ├──────► Forbidden
//!    ├──────► Responded(yes|no)
//!    └──────► AwaitingResponse ──respond──► Responded(yes|no)
//! ```
//!
//! The state is always derived from the stored record plus the viewer, so
//! reloading a message whose response is already set lands on the same
//! terminal state every time.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
  Error, Result,
  message::{Answer, Fid, Message, MessagePatch, now},
  repository::MessageRepository,
  store::RecordStore,
};

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState {
  /// The repository lookup has not completed yet.
  Loading,
  NotFound,
  /// No viewer identity is available yet.
  Unauthenticated,
  /// The viewer is not the intended recipient.
  Forbidden { recipient_id: Fid },
  AwaitingResponse { message: Message },
  Responded { answer: Answer, message: Message },
}

impl ViewState {
  /// Derive the state for a completed lookup.
  pub fn derive(message: Option<&Message>, viewer: Option<Fid>) -> Self {
    let Some(message) = message else {
      return Self::NotFound;
    };
    let Some(viewer) = viewer else {
      return Self::Unauthenticated;
    };
    if !message.is_for(viewer) {
      return Self::Forbidden { recipient_id: message.recipient_id };
    }
    match message.response {
      Some(answer) => Self::Responded { answer, message: message.clone() },
      None => Self::AwaitingResponse { message: message.clone() },
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      Self::Loading => "loading",
      Self::NotFound => "not_found",
      Self::Unauthenticated => "unauthenticated",
      Self::Forbidden { .. } => "forbidden",
      Self::AwaitingResponse { .. } => "awaiting_response",
      Self::Responded { .. } => "responded",
    }
  }

  /// Whether no further transition can happen without outside input.
  pub fn is_terminal(&self) -> bool {
    !matches!(self, Self::Loading | Self::AwaitingResponse { .. })
  }
}

// ─── Controller ──────────────────────────────────────────────────────────────

/// Drives one message view: load, authorise, respond once.
pub struct MessageController<'r, S> {
  repo:       &'r MessageRepository<S>,
  message_id: String,
  viewer:     Option<Fid>,
  message:    Option<Message>,
  state:      ViewState,
}

impl<'r, S: RecordStore> MessageController<'r, S> {
  pub fn new(
    repo: &'r MessageRepository<S>,
    message_id: impl Into<String>,
    viewer: Option<Fid>,
  ) -> Self {
    Self {
      repo,
      message_id: message_id.into(),
      viewer,
      message: None,
      state: ViewState::Loading,
    }
  }

  pub fn state(&self) -> &ViewState { &self.state }

  pub fn into_state(self) -> ViewState { self.state }

  /// Look the message up and derive the resulting state.
  pub async fn load(&mut self) -> &ViewState {
    self.message = self.repo.get_by_id(&self.message_id).await;
    self.state = ViewState::derive(self.message.as_ref(), self.viewer);
    &self.state
  }

  /// Supply the viewer identity once it resolves and re-derive the state
  /// from the already loaded record. Has no effect before [`Self::load`].
  pub fn identify(&mut self, viewer: Fid) -> &ViewState {
    self.viewer = Some(viewer);
    if !matches!(self.state, ViewState::Loading) {
      self.state = ViewState::derive(self.message.as_ref(), self.viewer);
    }
    &self.state
  }

  /// Record the recipient's answer.
  ///
  /// Legal only from [`ViewState::AwaitingResponse`]. The local state is
  /// taken from the record the repository returns, so it always matches
  /// what is stored. If another view answered first, the state moves to
  /// that answer and [`Error::AlreadyResponded`] is returned.
  pub async fn respond(&mut self, answer: Answer) -> Result<&ViewState> {
    let ViewState::AwaitingResponse { message } = &self.state else {
      return Err(Error::InvalidTransition {
        state:  self.state.name(),
        action: "respond to",
      });
    };

    let id = message.id.clone();
    let now = now();
    let stored = self
      .repo
      .update(&id, MessagePatch::answered_at(answer, now))
      .await?;

    let Some(stored) = stored else {
      self.message = None;
      self.state = ViewState::NotFound;
      return Ok(&self.state);
    };

    let answered_here = stored.responded_at == Some(now);
    self.state = ViewState::derive(Some(&stored), self.viewer);
    self.message = Some(stored);

    // Another view answered first; this call wrote nothing.
    if !answered_here {
      return Err(Error::AlreadyResponded(id));
    }
    info!(%id, %answer, "message answered");
    Ok(&self.state)
  }
}
