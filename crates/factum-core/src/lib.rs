//! Core types and trait definitions for the Factum fact store.
//!
//! Facts are attributed claims about a tracked document, extracted upstream
//! from several independent channels. This crate owns the data model, the
//! [`store::FactStore`] abstraction, and the conflict engine that detects,
//! classifies, and resolves disagreements between facts of one document.
//!
//! This crate is deliberately free of database dependencies; storage backends
//! (e.g. `factum-store-sqlite`) implement [`store::FactStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod config;
pub mod conflict;
pub mod detect;
pub mod engine;
pub mod error;
pub mod fact;
pub mod resolution;
pub mod severity;
pub mod similarity;
pub mod source;
pub mod store;
pub mod taxonomy;
pub mod value;

pub use config::EngineConfig;
pub use engine::ConflictEngine;
pub use error::{Error, Result};
