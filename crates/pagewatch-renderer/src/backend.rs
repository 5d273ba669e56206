use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;

/// Opaque identifier of one live render session, issued by the sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point-in-time load state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Loading,
    Complete,
    Failed,
}

/// Push notification on a session's event stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    LoadComplete,
    LoadFailed { message: String },
}

/// The extraction request sent into a running session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectRequest {
    pub command: String,
    pub target_id: String,
}

impl CollectRequest {
    pub fn collect(target_id: impl Into<String>) -> Self {
        Self {
            command: "collect".to_string(),
            target_id: target_id.into(),
        }
    }
}

/// The extracted result for one target visit. `payload` is opaque to the
/// engine — it is shipped to the collection endpoint as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capture {
    pub target_id: String,
    pub url: String,
    pub captured_at: String,
    pub payload: serde_json::Value,
}

/// Exactly one reply arrives per collect request: either the capture or an
/// explicit error from the extraction side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectReply {
    Capture(Capture),
    Failure { error: String },
}

/// The render-session driver the execution engine runs against.
///
/// One implementation talks to the real sidecar ([`crate::HttpRenderer`]);
/// tests substitute their own. Dropping the receiver returned by
/// [`RenderBackend::events`] tears the underlying subscription down.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Create a fresh session pointed at `url`. Sessions are single-use.
    async fn open(&self, url: &str) -> Result<SessionId>;

    /// One-shot status probe, used to catch a load that finished before
    /// any listener was attached.
    async fn status(&self, session: &SessionId) -> Result<LoadState>;

    /// Subscribe to the session's event stream.
    async fn events(&self, session: &SessionId) -> Result<mpsc::Receiver<SessionEvent>>;

    /// Send the collect command into the session. Fails with
    /// [`crate::RendererError::ExtractorNotReady`] while the extraction
    /// side's listener is still being registered.
    async fn request_collect(&self, session: &SessionId, request: &CollectRequest) -> Result<()>;

    /// Await the single reply to a previously sent collect command.
    async fn collect_response(&self, session: &SessionId) -> Result<CollectReply>;

    /// Release the session. Idempotent on the sidecar side.
    async fn close(&self, session: &SessionId) -> Result<()>;
}
