//! Core types and watch orchestration for the tuplewatch change-watch
//! service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The storage and transport crates depend on it; it depends on nothing
//! heavier than the cursor codec stack.

pub mod changelog;
pub mod error;
pub mod snaptoken;
pub mod tuple;
pub mod watcher;

pub use error::{Error, Result};
