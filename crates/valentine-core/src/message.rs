//! Message records — the single entity of the Valentine store.
//!
//! The persisted layout is a JSON array of [`Message`] objects with camelCase
//! field names. Timestamps are Unix milliseconds and `response` is `"yes"`,
//! `"no"`, or `null`.

use std::{fmt, str::FromStr};

use chrono::{DateTime, SubsecRound as _, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The current time at the precision records are stored with (milliseconds),
/// so an in-memory record compares equal to its persisted form.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(3) }

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// A numeric user identity (Farcaster ID). Opaque to this system and never
/// cross-validated against the identity provider.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Fid(pub u64);

impl fmt::Display for Fid {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for Fid {
  type Err = std::num::ParseIntError;

  fn from_str(s: &str) -> Result<Self, Self::Err> { s.trim().parse().map(Fid) }
}

impl From<u64> for Fid {
  fn from(value: u64) -> Self { Fid(value) }
}

// ─── Answer ──────────────────────────────────────────────────────────────────

/// The recipient's one-time reply. An unset response is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
  Yes,
  No,
}

impl Answer {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Yes => "yes",
      Self::No => "no",
    }
  }
}

impl fmt::Display for Answer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Message ─────────────────────────────────────────────────────────────────

/// A gated message from one user to another.
///
/// Every field except `response` and `responded_at` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
  pub id:                  String,
  pub recipient_id:        Fid,
  pub body:                String,
  pub sender_id:           Fid,
  /// The sender's name as it was when the message was written.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sender_display_name: Option<String>,
  #[serde(default)]
  pub response:            Option<Answer>,
  #[serde(with = "chrono::serde::ts_milliseconds")]
  pub created_at:          DateTime<Utc>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    with = "chrono::serde::ts_milliseconds_option"
  )]
  pub responded_at:        Option<DateTime<Utc>>,
}

impl Message {
  pub fn is_answered(&self) -> bool { self.response.is_some() }

  pub fn is_for(&self, viewer: Fid) -> bool { self.recipient_id == viewer }

  /// Merge `patch` into this record.
  ///
  /// Only the first transition away from an unset response is accepted; it
  /// also stamps `responded_at` (the patch value, or `now`). Repeating the
  /// same answer changes nothing. A lone `responded_at` is ignored because it
  /// may only move together with the response.
  ///
  /// Returns whether the record changed.
  pub fn apply(&mut self, patch: &MessagePatch, now: DateTime<Utc>) -> Result<bool> {
    let Some(answer) = patch.response else {
      return Ok(false);
    };

    match self.response {
      None => {
        self.response = Some(answer);
        self.responded_at = Some(patch.responded_at.unwrap_or(now).trunc_subsecs(3));
        Ok(true)
      }
      Some(existing) if existing == answer => Ok(false),
      Some(_) => Err(Error::AlreadyResponded(self.id.clone())),
    }
  }
}

// ─── NewMessage ──────────────────────────────────────────────────────────────

/// Input to [`crate::repository::MessageRepository::create`].
///
/// The id is supplied by the caller, usually from
/// [`crate::repository::generate_id`]. `created_at` defaults to the time of
/// insertion.
#[derive(Debug, Clone)]
pub struct NewMessage {
  pub id:                  String,
  pub recipient_id:        Fid,
  pub body:                String,
  pub sender_id:           Fid,
  pub sender_display_name: Option<String>,
  pub created_at:          Option<DateTime<Utc>>,
}

impl NewMessage {
  pub fn new(
    id: impl Into<String>,
    recipient_id: Fid,
    sender_id: Fid,
    body: impl Into<String>,
  ) -> Self {
    Self {
      id: id.into(),
      recipient_id,
      body: body.into(),
      sender_id,
      sender_display_name: None,
      created_at: None,
    }
  }

  pub(crate) fn into_message(self, now: DateTime<Utc>) -> Message {
    Message {
      id:                  self.id,
      recipient_id:        self.recipient_id,
      body:                self.body,
      sender_id:           self.sender_id,
      sender_display_name: self.sender_display_name,
      response:            None,
      created_at:          self.created_at.unwrap_or(now).trunc_subsecs(3),
      responded_at:        None,
    }
  }
}

// ─── MessagePatch ────────────────────────────────────────────────────────────

/// Partial update for [`crate::repository::MessageRepository::update`].
/// Only the mutable fields of a record can be expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessagePatch {
  pub response:     Option<Answer>,
  pub responded_at: Option<DateTime<Utc>>,
}

impl MessagePatch {
  pub fn answer(answer: Answer) -> Self {
    Self { response: Some(answer), responded_at: None }
  }

  pub fn answered_at(answer: Answer, at: DateTime<Utc>) -> Self {
    Self { response: Some(answer), responded_at: Some(at) }
  }
}
