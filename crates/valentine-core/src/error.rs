//! Error types for `valentine-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("message {0:?} already exists")]
  DuplicateId(String),

  #[error("message {0:?} already has a response")]
  AlreadyResponded(String),

  #[error("cannot {action} a message in state {state:?}")]
  InvalidTransition {
    state:  &'static str,
    action: &'static str,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
