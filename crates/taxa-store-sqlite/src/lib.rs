//! SQLite backend for the Taxa taxonomy store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Multi-row writes run inside a single
//! `IMMEDIATE` transaction.

mod encode;
mod hierarchy;
mod reader;
mod schema;
mod store;
mod transfer;

pub mod error;

pub use error::{Error, Result};
pub use schema::SCHEMA;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
