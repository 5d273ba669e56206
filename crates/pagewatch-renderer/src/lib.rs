//! `pagewatch-renderer` — the render-session boundary.
//!
//! A render session is a single-use environment created to load one page;
//! it is never pooled or reused across runs. [`backend::RenderBackend`] is
//! the seam the execution engine drives; [`http::HttpRenderer`] implements
//! it against the renderer sidecar's REST API. The two waiting problems
//! live here too:
//!
//! * [`readiness::await_ready`] — load completion can arrive on the event
//!   stream or on an immediate status poll; whichever answers first wins,
//!   exactly once.
//! * [`collect::collect`] — the extraction handshake, with a bounded
//!   fixed-delay retry for the send and a hard deadline for the response.

pub mod backend;
pub mod collect;
pub mod error;
pub mod http;
pub mod readiness;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{
    Capture, CollectReply, CollectRequest, LoadState, RenderBackend, SessionEvent, SessionId,
};
pub use collect::{collect, RetryPolicy};
pub use error::{RendererError, Result};
pub use http::HttpRenderer;
pub use readiness::await_ready;
