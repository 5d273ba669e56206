//! `pagewatch-scheduler` — the wake/dispatch engine and the per-target
//! execution state machine.
//!
//! # Wake cycle
//!
//! A wake (timer tick, first-install trigger, manual) lands in a one-slot
//! queue consumed by a single worker, so two cycles can never overlap. Each
//! cycle reconciles run state against the config document, selects due
//! enabled targets in id order, and runs them strictly one after another.
//!
//! # Per-target run
//!
//! Open a fresh render session → wait for readiness → collect handshake →
//! submit the payload → record the outcome → close the session
//! unconditionally. Every failure is absorbed into a run-state write; none
//! escapes to the dispatch loop.
//!
//! | Failure                         | Recorded as                       |
//! |---------------------------------|-----------------------------------|
//! | id missing from config snapshot | `ConfigInconsistency`             |
//! | no readiness within budget      | `SessionTimeout`                  |
//! | send retries / reply deadline   | `Handshake`                       |
//! | explicit `{error}` reply        | `Extraction` (verbatim, sanitized)|
//! | disallowed endpoint scheme      | `SubmissionValidation`            |
//! | transport / non-2xx             | `SubmissionNetwork`               |

pub mod engine;
pub mod error;
pub mod executor;
pub mod schedule;
pub mod submit;

pub use engine::{wake_queue, SchedulerEngine, Wake, WakeHandle};
pub use error::{Result, RunError, SchedulerError, SubmitError};
pub use executor::Executor;
pub use schedule::{next_run_after_failure, next_run_after_success};
pub use submit::{validate_endpoint, HttpSink, PayloadSink};
