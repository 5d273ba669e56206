use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::backend::{
    CollectReply, CollectRequest, LoadState, RenderBackend, SessionEvent, SessionId,
};
use crate::error::{RendererError, Result};

/// [`RenderBackend`] implementation against the renderer sidecar's REST API.
///
/// One shared `reqwest::Client`; sessions are addressed as
/// `/sessions/{id}`. Readiness events arrive as an SSE stream on
/// `/sessions/{id}/events` and are forwarded into an mpsc channel by a
/// spawned reader task, which exits as soon as the receiver is dropped.
pub struct HttpRenderer {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionOpened {
    session_id: String,
}

#[derive(Deserialize)]
struct StatusReply {
    state: LoadState,
}

impl HttpRenderer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a non-success response to an API error with its body text.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(RendererError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RenderBackend for HttpRenderer {
    async fn open(&self, url: &str) -> Result<SessionId> {
        let resp = self
            .client
            .post(self.url("/sessions"))
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let opened: SessionOpened = resp
            .json()
            .await
            .map_err(|e| RendererError::Parse(e.to_string()))?;
        debug!(session = %opened.session_id, %url, "render session opened");
        Ok(SessionId(opened.session_id))
    }

    async fn status(&self, session: &SessionId) -> Result<LoadState> {
        let resp = self
            .client
            .get(self.url(&format!("/sessions/{session}/status")))
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let status: StatusReply = resp
            .json()
            .await
            .map_err(|e| RendererError::Parse(e.to_string()))?;
        Ok(status.state)
    }

    async fn events(&self, session: &SessionId) -> Result<mpsc::Receiver<SessionEvent>> {
        let resp = self
            .client
            .get(self.url(&format!("/sessions/{session}/events")))
            .send()
            .await?;
        let resp = Self::check(resp).await?;

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(forward_events(resp, tx));
        Ok(rx)
    }

    async fn request_collect(&self, session: &SessionId, request: &CollectRequest) -> Result<()> {
        let resp = self
            .client
            .post(self.url(&format!("/sessions/{session}/collect")))
            .json(request)
            .send()
            .await?;
        // 409/425: the extraction listener is not registered yet — the
        // caller's retry policy handles these.
        if matches!(resp.status().as_u16(), 409 | 425) {
            return Err(RendererError::ExtractorNotReady {
                session: session.to_string(),
            });
        }
        Self::check(resp).await?;
        Ok(())
    }

    async fn collect_response(&self, session: &SessionId) -> Result<CollectReply> {
        // Long-poll; the caller bounds this with its own deadline.
        let resp = self
            .client
            .get(self.url(&format!("/sessions/{session}/result")))
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        resp.json()
            .await
            .map_err(|e| RendererError::Parse(e.to_string()))
    }

    async fn close(&self, session: &SessionId) -> Result<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/sessions/{session}")))
            .send()
            .await?;
        Self::check(resp).await?;
        debug!(%session, "render session closed");
        Ok(())
    }
}

/// Read the SSE byte stream and forward parsed session events.
///
/// SSE frames arrive as `data: {json}` lines; chunks may split lines, so a
/// buffer carries the incomplete tail between chunks.
async fn forward_events(resp: reqwest::Response, tx: mpsc::Sender<SessionEvent>) {
    use futures_util::StreamExt;

    let mut byte_stream = resp.bytes_stream();
    let mut line_buf = String::new();

    while let Some(chunk) = byte_stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                warn!("session event stream error: {e}");
                return;
            }
        };
        let text = match std::str::from_utf8(&chunk) {
            Ok(t) => t,
            Err(_) => continue,
        };
        line_buf.push_str(text);

        while let Some(pos) = line_buf.find('\n') {
            let line: String = line_buf.drain(..=pos).collect();
            let line = line.trim();
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            match serde_json::from_str::<SessionEvent>(data.trim()) {
                Ok(event) => {
                    if tx.send(event).await.is_err() {
                        // Receiver dropped — the wait resolved; stop reading.
                        return;
                    }
                }
                Err(e) => debug!("ignoring unparsable session event: {e}"),
            }
        }
    }
}
