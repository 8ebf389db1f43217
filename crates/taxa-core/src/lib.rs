//! Core types and trait definitions for the Taxa taxonomy store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod dump;
pub mod error;
pub mod rank;
pub mod species;
pub mod store;
pub mod tag;
pub mod taxon;

pub use error::{Classify, Error, ErrorKind, Result};
pub use rank::{Rank, Table};
