use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use pagewatch_core::sanitize::sanitize_error;
use pagewatch_core::types::{RunState, RunStatus, ScheduleSpec, Target};
use pagewatch_renderer::{
    await_ready, collect, CollectReply, CollectRequest, RenderBackend, RendererError, RetryPolicy,
    SessionId,
};
use pagewatch_store::DocumentStore;

use crate::error::RunError;
use crate::schedule::{next_run_after_failure, next_run_after_success};
use crate::submit::PayloadSink;

/// Runs one target end-to-end and records the outcome.
///
/// Every failure at any step becomes a run-state write; nothing propagates
/// to the dispatch loop. The render session is released on every exit path.
pub struct Executor {
    store: Arc<DocumentStore>,
    backend: Arc<dyn RenderBackend>,
    sink: Arc<dyn PayloadSink>,
    retry: RetryPolicy,
    /// Headroom between the collect-reply deadline and the session timeout.
    response_margin: Duration,
}

impl Executor {
    pub fn new(
        store: Arc<DocumentStore>,
        backend: Arc<dyn RenderBackend>,
        sink: Arc<dyn PayloadSink>,
        retry: RetryPolicy,
        response_margin: Duration,
    ) -> Self {
        Self {
            store,
            backend,
            sink,
            retry,
            response_margin,
        }
    }

    /// Execute one target and write its new run state. Returns the recorded
    /// status so the cycle can tally outcomes.
    #[instrument(skip(self, targets), fields(target_id = id))]
    pub async fn execute(&self, id: &str, targets: &BTreeMap<String, Target>) -> RunStatus {
        let now = Utc::now();
        let mut session = None;

        // Success carries the schedule so the next slot can be computed;
        // it is taken from the same snapshot the run was driven from.
        let result: Result<&ScheduleSpec, RunError> = match targets.get(id) {
            Some(target) => match self.backend.open(&target.url).await {
                Ok(opened) => {
                    let outcome = self.run_session(&opened, target).await;
                    session = Some(opened);
                    outcome.map(|()| &target.schedule)
                }
                Err(e) => Err(RunError::Session(e.to_string())),
            },
            None => Err(RunError::ConfigInconsistency { id: id.to_string() }),
        };

        let status = match &result {
            Ok(_) => {
                info!("run succeeded");
                RunStatus::Ok
            }
            Err(e) => {
                warn!("run failed: {e}");
                RunStatus::Fail
            }
        };

        if let Err(e) = self.record(id, now, &result) {
            // The target stays due (next_run_at unchanged), so the next
            // wake retries it naturally.
            error!("run-state write failed: {e}");
        }

        // Release last, once the outcome is safely recorded. A failed close
        // is logged, never escalated.
        if let Some(session) = session {
            if let Err(e) = self.backend.close(&session).await {
                warn!(%session, "session close failed: {e}");
            }
        }
        status
    }

    async fn run_session(&self, session: &SessionId, target: &Target) -> Result<(), RunError> {
        let budget = Duration::from_secs(target.timeout_seconds as u64);

        await_ready(self.backend.as_ref(), session, budget)
            .await
            .map_err(|e| match e {
                RendererError::ReadyTimeout { secs } => RunError::SessionTimeout { secs },
                other => RunError::Session(other.to_string()),
            })?;

        // Keep the reply deadline strictly inside the session budget so
        // this step resolves before the outer timeout would.
        let reply_limit = budget
            .saturating_sub(self.response_margin)
            .max(Duration::from_secs(1));
        let request = CollectRequest::collect(&target.id);
        let reply = collect(
            self.backend.as_ref(),
            session,
            &request,
            self.retry,
            reply_limit,
        )
        .await
        .map_err(|e| match e {
            RendererError::SendExhausted { .. } | RendererError::ResponseTimeout { .. } => {
                RunError::Handshake(e.to_string())
            }
            other => RunError::Session(other.to_string()),
        })?;

        let capture = match reply {
            CollectReply::Capture(capture) => capture,
            CollectReply::Failure { error } => return Err(RunError::Extraction(error)),
        };

        self.sink.submit(&capture).await.map_err(|e| {
            if e.is_validation() {
                RunError::SubmissionValidation(e.to_string())
            } else {
                RunError::SubmissionNetwork(e.to_string())
            }
        })?;

        Ok(())
    }

    /// Read-modify-write of the state document with the run's outcome.
    fn record(
        &self,
        id: &str,
        now: DateTime<Utc>,
        result: &Result<&ScheduleSpec, RunError>,
    ) -> pagewatch_store::Result<()> {
        let mut states = self.store.load_run_states()?;
        let previous_failures = states.get(id).map_or(0, |s| s.fail_count);

        let state = match result {
            Ok(spec) => RunState {
                next_run_at: next_run_after_success(now, spec),
                last_status: Some(RunStatus::Ok),
                fail_count: 0,
                last_run_at: Some(now),
                last_error: None,
            },
            Err(e) => RunState {
                next_run_at: next_run_after_failure(now),
                last_status: Some(RunStatus::Fail),
                fail_count: previous_failures + 1,
                last_run_at: Some(now),
                last_error: Some(sanitize_error(&e.to_string())),
            },
        };

        states.insert(id.to_string(), state);
        self.store.save_run_states(&states)
    }
}
