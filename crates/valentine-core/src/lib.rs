//! Core types and trait definitions for the Valentine message store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::RecordStore`]; the API layer talks to
//! the [`repository::MessageRepository`] and the lifecycle controller.

pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod message;
pub mod repository;
pub mod store;

pub use error::{Error, Result};
