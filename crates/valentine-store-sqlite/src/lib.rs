//! SQLite backend for the Valentine message store.
//!
//! A single `kv` table plays the part of a browser's persistent key-value
//! store. Wraps [`tokio_rusqlite`] so all database access runs on a
//! dedicated thread without blocking the async runtime.

mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
