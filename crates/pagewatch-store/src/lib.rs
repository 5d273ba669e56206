//! `pagewatch-store` — SQLite-backed persistence for the two shared
//! documents: the target configuration and the per-target run state.
//!
//! Each document is one JSON object keyed by target id and is written with
//! whole-document replace semantics (read-modify-write, last writer wins).
//! The engine is the only writer of run state during a cycle; the config
//! document is written only by the editing collaborator through
//! [`DocumentStore::upsert_target`] / [`DocumentStore::delete_target`].

pub mod db;
pub mod documents;
pub mod error;

pub use documents::DocumentStore;
pub use error::{Result, StoreError};
