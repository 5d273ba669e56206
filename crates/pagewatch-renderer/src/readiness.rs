use std::time::Duration;

use tracing::debug;

use crate::backend::{LoadState, RenderBackend, SessionEvent, SessionId};
use crate::error::{RendererError, Result};

/// Wait until `session` reports that its page load is complete, bounded by
/// `limit`.
///
/// Readiness can arrive on two independent channels: the session event
/// stream, and a one-shot status poll issued right after subscribing (the
/// load may already have finished before the listener attached). The
/// `select!` resolves on whichever answers first and cancels the loser;
/// returning drops the event receiver, which tears the subscription down.
pub async fn await_ready(
    backend: &dyn RenderBackend,
    session: &SessionId,
    limit: Duration,
) -> Result<()> {
    let mut events = backend.events(session).await?;

    let wait = async {
        let poll = backend.status(session);
        tokio::pin!(poll);
        let mut polled = false;

        loop {
            tokio::select! {
                status = &mut poll, if !polled => {
                    polled = true;
                    match status {
                        Ok(LoadState::Complete) => return Ok(()),
                        Ok(LoadState::Failed) => {
                            return Err(RendererError::LoadFailed {
                                session: session.to_string(),
                                message: "load failed".to_string(),
                            })
                        }
                        // Still loading — the event stream will tell us.
                        Ok(LoadState::Loading) => {}
                        // A failed probe is not fatal; the event stream can
                        // still resolve the wait.
                        Err(e) => debug!(%session, "status probe failed: {e}"),
                    }
                }
                event = events.recv() => match event {
                    Some(SessionEvent::LoadComplete) => return Ok(()),
                    Some(SessionEvent::LoadFailed { message }) => {
                        return Err(RendererError::LoadFailed {
                            session: session.to_string(),
                            message,
                        })
                    }
                    None => return Err(RendererError::EventStreamClosed),
                },
            }
        }
    };

    match tokio::time::timeout(limit, wait).await {
        Ok(result) => result,
        Err(_) => Err(RendererError::ReadyTimeout {
            secs: limit.as_secs(),
        }),
    }
}
