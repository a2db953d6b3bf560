//! Server assembly for Valentine: configuration and the top-level router.
//!
//! The binary in `main.rs` wires a [`valentine_store_sqlite::SqliteStore`]
//! and the stub identity provider into [`app`].

use std::path::{Path, PathBuf};

use axum::{Router, routing::get};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use valentine_api::{ApiState, api_router};
use valentine_core::{
  identity::IdentityProvider,
  store::{RecordStore, STORAGE_KEY},
};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `VALENTINE_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:        String,
  #[serde(default = "default_port")]
  pub port:        u16,
  /// Base URL that shareable message links point at.
  #[serde(default = "default_public_url")]
  pub public_url:  String,
  #[serde(default = "default_store_path")]
  pub store_path:  PathBuf,
  /// Key under which the message document is stored.
  #[serde(default = "default_storage_key")]
  pub storage_key: String,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 3000 }

fn default_public_url() -> String { "http://localhost:3000".to_string() }

fn default_store_path() -> PathBuf {
  PathBuf::from("~/.local/share/valentine/valentine.db")
}

fn default_storage_key() -> String { STORAGE_KEY.to_string() }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:        default_host(),
      port:        default_port(),
      public_url:  default_public_url(),
      store_path:  default_store_path(),
      storage_key: default_storage_key(),
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `VALENTINE_*` environment
  /// variables. Missing keys fall back to their defaults.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("VALENTINE").try_parsing(true))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// The store path with a leading `~` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: `/health` plus the JSON API under `/api`, with
/// request tracing.
pub fn app<S, I>(state: ApiState<S, I>) -> Router
where
  S: RecordStore + Clone + 'static,
  I: IdentityProvider + 'static,
{
  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}
