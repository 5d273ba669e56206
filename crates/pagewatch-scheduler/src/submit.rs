use async_trait::async_trait;
use tracing::debug;
use url::Url;

use pagewatch_renderer::Capture;

use crate::error::SubmitError;

/// Schemes the collection endpoint may use. Anything else — file, ftp,
/// data, extension-internal — is refused before a request is even built,
/// so a hijacked endpoint value cannot be used to reach local resources.
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Parse and allow-list the endpoint. Called on every submission, not only
/// when the configuration is saved.
pub fn validate_endpoint(endpoint: &str) -> Result<Url, SubmitError> {
    let parsed = Url::parse(endpoint).map_err(|e| SubmitError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;
    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return Err(SubmitError::SchemeNotAllowed {
            scheme: parsed.scheme().to_string(),
        });
    }
    Ok(parsed)
}

/// Where extracted payloads go. The engine only needs "accepted or not";
/// tests substitute a recording sink.
#[async_trait]
pub trait PayloadSink: Send + Sync {
    async fn submit(&self, capture: &Capture) -> Result<(), SubmitError>;
}

/// POSTs the capture payload as JSON to the configured collection endpoint.
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PayloadSink for HttpSink {
    async fn submit(&self, capture: &Capture) -> Result<(), SubmitError> {
        let url = validate_endpoint(&self.endpoint)?;
        let resp = self
            .client
            .post(url)
            .json(&capture.payload)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SubmitError::Rejected {
                status: resp.status().as_u16(),
            });
        }
        debug!(target = %capture.target_id, "payload submitted");
        Ok(())
    }
}
