use thiserror::Error;

/// Errors that can occur at the render-session boundary.
#[derive(Debug, Error)]
pub enum RendererError {
    /// Transport-level failure talking to the renderer sidecar.
    #[error("renderer transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The sidecar answered with a non-success status.
    #[error("renderer API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The extraction side has not registered its listener yet — the
    /// collect send may be retried.
    #[error("extractor not ready in session {session}")]
    ExtractorNotReady { session: String },

    /// The session reported that the page load failed.
    #[error("page load failed in session {session}: {message}")]
    LoadFailed { session: String, message: String },

    /// The event stream ended before the load resolved either way.
    #[error("session event stream closed before load completed")]
    EventStreamClosed,

    /// No readiness signal within the target's timeout budget.
    #[error("session not ready within {secs}s")]
    ReadyTimeout { secs: u64 },

    /// Every collect send attempt failed.
    #[error("collect send failed after {attempts} attempts: {last}")]
    SendExhausted { attempts: u32, last: String },

    /// The collect response did not arrive within its deadline.
    #[error("no collect response within {ms}ms")]
    ResponseTimeout { ms: u64 },

    /// A sidecar payload could not be decoded.
    #[error("malformed renderer payload: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, RendererError>;
