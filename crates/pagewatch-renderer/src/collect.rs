use std::time::Duration;

use tracing::debug;

use crate::backend::{CollectReply, CollectRequest, RenderBackend, SessionId};
use crate::error::{RendererError, Result};

/// Bounded fixed-delay retry for the collect send.
///
/// The extraction side registers its listener asynchronously, so the first
/// sends may bounce; a handful of short retries covers that window. No
/// jitter, no growth.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(50),
        }
    }
}

/// Drive the extraction handshake for one session: send the collect
/// command under `policy`, then await the single reply within
/// `response_limit`.
///
/// The caller keeps `response_limit` strictly inside the session timeout so
/// this step always resolves before the outer budget runs out. An explicit
/// `{error}` reply is NOT an error here — it is a well-formed
/// [`CollectReply::Failure`] the caller turns into an extraction failure.
pub async fn collect(
    backend: &dyn RenderBackend,
    session: &SessionId,
    request: &CollectRequest,
    policy: RetryPolicy,
    response_limit: Duration,
) -> Result<CollectReply> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match backend.request_collect(session, request).await {
            Ok(()) => break,
            Err(e) if attempt < policy.max_attempts => {
                debug!(%session, attempt, "collect send bounced: {e}");
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                return Err(RendererError::SendExhausted {
                    attempts: attempt,
                    last: e.to_string(),
                })
            }
        }
    }

    match tokio::time::timeout(response_limit, backend.collect_response(session)).await {
        Ok(reply) => reply,
        Err(_) => Err(RendererError::ResponseTimeout {
            ms: response_limit.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Capture;
    use crate::mock::MockBackend;

    fn session() -> SessionId {
        SessionId("s-1".to_string())
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(1),
        }
    }

    fn capture() -> CollectReply {
        CollectReply::Capture(Capture {
            target_id: "t1".to_string(),
            url: "https://example.com".to_string(),
            captured_at: "2026-08-06T12:00:00Z".to_string(),
            payload: serde_json::json!({"title": "hi"}),
        })
    }

    #[tokio::test]
    async fn send_succeeding_within_budget_yields_reply() {
        // Four bounces, fifth attempt lands — still inside max_attempts.
        let backend = MockBackend::new()
            .with_send_failures(4)
            .with_reply(capture());
        let reply = collect(
            &backend,
            &session(),
            &CollectRequest::collect("t1"),
            fast_policy(),
            Duration::from_secs(1),
        )
        .await
        .expect("handshake should succeed on the fifth attempt");
        assert_eq!(reply, capture());
        assert_eq!(backend.send_calls(), 5);
    }

    #[tokio::test]
    async fn send_exhaustion_is_a_handshake_failure() {
        let backend = MockBackend::new()
            .with_send_failures(u32::MAX)
            .with_reply(capture());
        let result = collect(
            &backend,
            &session(),
            &CollectRequest::collect("t1"),
            fast_policy(),
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(
            result,
            Err(RendererError::SendExhausted { attempts: 5, .. })
        ));
        assert_eq!(backend.send_calls(), 5);
    }

    #[tokio::test]
    async fn missing_response_times_out() {
        // Send lands but no reply ever arrives.
        let backend = MockBackend::new();
        let result = collect(
            &backend,
            &session(),
            &CollectRequest::collect("t1"),
            fast_policy(),
            Duration::from_millis(50),
        )
        .await;
        assert!(matches!(result, Err(RendererError::ResponseTimeout { .. })));
    }

    #[tokio::test]
    async fn explicit_extraction_error_is_passed_through() {
        let backend = MockBackend::new().with_reply(CollectReply::Failure {
            error: "boom".to_string(),
        });
        let reply = collect(
            &backend,
            &session(),
            &CollectRequest::collect("t1"),
            fast_policy(),
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        assert_eq!(
            reply,
            CollectReply::Failure {
                error: "boom".to_string()
            }
        );
    }
}
