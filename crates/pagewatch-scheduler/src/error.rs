use thiserror::Error;

/// Engine-level errors — these abort one wake cycle, never the process.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("state store error: {0}")]
    Store(#[from] pagewatch_store::StoreError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Why a single target run failed. Converted into a run-state write at the
/// per-target boundary; never propagated.
#[derive(Debug, Error)]
pub enum RunError {
    /// The id was selected for execution but is missing from the config
    /// snapshot — the two documents disagree.
    #[error("target '{id}' not found in configuration")]
    ConfigInconsistency { id: String },

    /// No readiness signal within the target's timeout budget.
    #[error("page not ready within {secs}s")]
    SessionTimeout { secs: u64 },

    /// Collect send retries exhausted, or the reply deadline elapsed.
    #[error("extraction handshake failed: {0}")]
    Handshake(String),

    /// The extraction side reported an explicit failure.
    #[error("{0}")]
    Extraction(String),

    /// The collection endpoint was rejected before any request was made.
    #[error("submission blocked: {0}")]
    SubmissionValidation(String),

    /// The submission call failed in transport or returned non-2xx.
    #[error("submission failed: {0}")]
    SubmissionNetwork(String),

    /// Any other render-session failure (open, event stream, load error).
    #[error("render session error: {0}")]
    Session(String),
}

/// Submission-step errors, split so validation failures can be told apart
/// from network ones in the run taxonomy.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("endpoint scheme '{scheme}' is not allowed")]
    SchemeNotAllowed { scheme: String },

    #[error("submission transport error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("collection endpoint returned status {status}")]
    Rejected { status: u16 },
}

impl SubmitError {
    /// True when the endpoint never passed validation — no request was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SubmitError::InvalidEndpoint { .. } | SubmitError::SchemeNotAllowed { .. }
        )
    }
}
