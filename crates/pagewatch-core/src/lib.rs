//! `pagewatch-core` — shared domain types, daemon configuration, and the
//! small pure helpers (target validation, error-message sanitization) used
//! by every other crate.

pub mod config;
pub mod error;
pub mod sanitize;
pub mod types;
pub mod validate;

pub use config::PagewatchConfig;
pub use error::{CoreError, Result};
pub use types::{RunState, RunStatus, ScheduleSpec, Target, TimeOfDay};
