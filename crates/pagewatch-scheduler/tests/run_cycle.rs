// Full wake cycles over an in-memory store with a scripted renderer and a
// recording collection sink.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as TimeDelta, Timelike, Utc};
use tokio::sync::mpsc;

use pagewatch_core::types::{RunState, RunStatus, ScheduleSpec, Target};
use pagewatch_renderer::{
    Capture, CollectReply, CollectRequest, LoadState, RenderBackend, RetryPolicy, SessionEvent,
    SessionId,
};
use pagewatch_scheduler::{
    next_run_after_failure, next_run_after_success, Executor, PayloadSink, SchedulerEngine,
    SubmitError,
};
use pagewatch_store::{db, DocumentStore};

/// Renderer whose sessions load instantly and answer every collect with a
/// fixed reply.
struct ScriptedBackend {
    reply: CollectReply,
    opened_urls: Mutex<Vec<String>>,
    closed: AtomicU32,
    // Held so the event stream stays open until the readiness wait drops
    // its receiver.
    event_txs: Mutex<Vec<mpsc::Sender<SessionEvent>>>,
}

impl ScriptedBackend {
    fn with_reply(reply: CollectReply) -> Self {
        Self {
            reply,
            opened_urls: Mutex::new(Vec::new()),
            closed: AtomicU32::new(0),
            event_txs: Mutex::new(Vec::new()),
        }
    }

    fn opened(&self) -> usize {
        self.opened_urls.lock().unwrap().len()
    }

    fn opened_urls(&self) -> Vec<String> {
        self.opened_urls.lock().unwrap().clone()
    }

    fn closed(&self) -> u32 {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderBackend for ScriptedBackend {
    async fn open(&self, url: &str) -> pagewatch_renderer::Result<SessionId> {
        let mut opened = self.opened_urls.lock().unwrap();
        opened.push(url.to_string());
        Ok(SessionId(format!("s-{}", opened.len())))
    }

    async fn status(&self, _session: &SessionId) -> pagewatch_renderer::Result<LoadState> {
        Ok(LoadState::Complete)
    }

    async fn events(
        &self,
        _session: &SessionId,
    ) -> pagewatch_renderer::Result<mpsc::Receiver<SessionEvent>> {
        let (tx, rx) = mpsc::channel(1);
        self.event_txs.lock().unwrap().push(tx);
        Ok(rx)
    }

    async fn request_collect(
        &self,
        _session: &SessionId,
        _request: &CollectRequest,
    ) -> pagewatch_renderer::Result<()> {
        Ok(())
    }

    async fn collect_response(
        &self,
        _session: &SessionId,
    ) -> pagewatch_renderer::Result<CollectReply> {
        Ok(self.reply.clone())
    }

    async fn close(&self, _session: &SessionId) -> pagewatch_renderer::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSink {
    accepted: Mutex<Vec<serde_json::Value>>,
}

impl RecordingSink {
    fn accepted(&self) -> Vec<serde_json::Value> {
        self.accepted.lock().unwrap().clone()
    }
}

#[async_trait]
impl PayloadSink for RecordingSink {
    async fn submit(&self, capture: &Capture) -> Result<(), SubmitError> {
        self.accepted.lock().unwrap().push(capture.payload.clone());
        Ok(())
    }
}

fn store() -> Arc<DocumentStore> {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    db::init_db(&conn).unwrap();
    Arc::new(DocumentStore::new(conn))
}

fn hourly_target(id: &str) -> Target {
    Target {
        id: id.into(),
        url: format!("https://example.com/{id}"),
        enabled: true,
        timeout_seconds: 30,
        schedule: ScheduleSpec::Hourly { minute: 0 },
    }
}

fn capture_reply(id: &str) -> CollectReply {
    CollectReply::Capture(Capture {
        target_id: id.into(),
        url: format!("https://example.com/{id}"),
        captured_at: "2026-08-06T12:00:00Z".into(),
        payload: serde_json::json!({"title": "hi"}),
    })
}

fn executor(
    store: &Arc<DocumentStore>,
    backend: &Arc<ScriptedBackend>,
    sink: &Arc<RecordingSink>,
) -> Executor {
    Executor::new(
        Arc::clone(store),
        Arc::clone(backend) as Arc<dyn RenderBackend>,
        Arc::clone(sink) as Arc<dyn PayloadSink>,
        RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(1),
        },
        Duration::from_secs(5),
    )
}

fn seed_overdue(store: &DocumentStore, id: &str, fail_count: u32) {
    let past = Utc::now() - TimeDelta::hours(2);
    let mut states = store.load_run_states().unwrap();
    let mut state = RunState::scheduled(past);
    state.fail_count = fail_count;
    states.insert(id.to_string(), state);
    store.save_run_states(&states).unwrap();
}

#[tokio::test]
async fn due_target_success_writes_fresh_state() {
    let store = store();
    store.upsert_target(hourly_target("t1")).unwrap();
    seed_overdue(&store, "t1", 0);

    let backend = Arc::new(ScriptedBackend::with_reply(capture_reply("t1")));
    let sink = Arc::new(RecordingSink::default());
    let engine = SchedulerEngine::new(Arc::clone(&store), executor(&store, &backend, &sink));

    let summary = engine.run_cycle().await.unwrap();
    assert_eq!(summary.selected, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);

    let states = store.load_run_states().unwrap();
    let state = &states["t1"];
    assert_eq!(state.last_status, Some(RunStatus::Ok));
    assert_eq!(state.fail_count, 0);
    assert!(state.last_error.is_none());

    // next_run_at is the top of the hour after the recorded run instant.
    let ran_at = state.last_run_at.expect("last_run_at must be recorded");
    assert_eq!(
        state.next_run_at,
        next_run_after_success(ran_at, &ScheduleSpec::Hourly { minute: 0 })
    );
    assert_eq!(state.next_run_at.minute(), 0);
    assert_eq!(state.next_run_at.second(), 0);
    assert!(state.next_run_at > ran_at);

    assert_eq!(sink.accepted(), vec![serde_json::json!({"title": "hi"})]);
    assert_eq!(backend.opened(), 1);
    assert_eq!(backend.closed(), 1, "session must be released");
}

#[tokio::test]
async fn extraction_error_increments_fail_count() {
    let store = store();
    store.upsert_target(hourly_target("t1")).unwrap();
    seed_overdue(&store, "t1", 2);

    let backend = Arc::new(ScriptedBackend::with_reply(CollectReply::Failure {
        error: "boom".to_string(),
    }));
    let sink = Arc::new(RecordingSink::default());
    let engine = SchedulerEngine::new(Arc::clone(&store), executor(&store, &backend, &sink));

    let summary = engine.run_cycle().await.unwrap();
    assert_eq!(summary.failed, 1);

    let states = store.load_run_states().unwrap();
    let state = &states["t1"];
    assert_eq!(state.last_status, Some(RunStatus::Fail));
    assert_eq!(state.fail_count, 3);
    assert_eq!(state.last_error.as_deref(), Some("boom"));

    let ran_at = state.last_run_at.unwrap();
    assert_eq!(state.next_run_at, next_run_after_failure(ran_at));

    assert!(sink.accepted().is_empty(), "nothing may be submitted");
    assert_eq!(backend.closed(), 1, "session released on failure too");
}

#[tokio::test]
async fn disabled_and_future_targets_are_not_selected() {
    let store = store();
    let mut disabled = hourly_target("off");
    disabled.enabled = false;
    store.upsert_target(disabled).unwrap();
    store.upsert_target(hourly_target("later")).unwrap();
    seed_overdue(&store, "off", 0);
    // "later" gets its slot from reconciliation, which is always in the
    // future — so neither target runs.

    let backend = Arc::new(ScriptedBackend::with_reply(capture_reply("x")));
    let sink = Arc::new(RecordingSink::default());
    let engine = SchedulerEngine::new(Arc::clone(&store), executor(&store, &backend, &sink));

    let summary = engine.run_cycle().await.unwrap();
    assert_eq!(summary.selected, 0);
    assert_eq!(backend.opened(), 0);
}

#[tokio::test]
async fn reconciliation_is_idempotent_across_cycles() {
    let store = store();
    store.upsert_target(hourly_target("t1")).unwrap();

    let backend = Arc::new(ScriptedBackend::with_reply(capture_reply("t1")));
    let sink = Arc::new(RecordingSink::default());
    let engine = SchedulerEngine::new(Arc::clone(&store), executor(&store, &backend, &sink));

    assert_eq!(engine.reconcile(Utc::now()).unwrap(), 1);
    let first = store.load_run_states().unwrap();
    assert!(first["t1"].next_run_at > Utc::now() - TimeDelta::seconds(1));

    // Second pass with unchanged config: zero additions, identical document.
    assert_eq!(engine.reconcile(Utc::now()).unwrap(), 0);
    assert_eq!(store.load_run_states().unwrap(), first);
}

#[tokio::test]
async fn missing_target_is_recorded_not_skipped() {
    let store = store();
    let backend = Arc::new(ScriptedBackend::with_reply(capture_reply("ghost")));
    let sink = Arc::new(RecordingSink::default());
    let exec = executor(&store, &backend, &sink);

    let status = exec.execute("ghost", &BTreeMap::new()).await;
    assert_eq!(status, RunStatus::Fail);
    assert_eq!(backend.opened(), 0, "no session for an unknown target");

    let states = store.load_run_states().unwrap();
    let state = &states["ghost"];
    assert_eq!(state.last_status, Some(RunStatus::Fail));
    assert_eq!(state.fail_count, 1);
    assert!(state.last_error.as_deref().unwrap().contains("not found"));
}

#[tokio::test]
async fn due_targets_run_in_id_order() {
    let store = store();
    for id in ["c", "a", "b"] {
        store.upsert_target(hourly_target(id)).unwrap();
        seed_overdue(&store, id, 0);
    }

    let backend = Arc::new(ScriptedBackend::with_reply(capture_reply("any")));
    let sink = Arc::new(RecordingSink::default());
    let engine = SchedulerEngine::new(Arc::clone(&store), executor(&store, &backend, &sink));

    let summary = engine.run_cycle().await.unwrap();
    assert_eq!(summary.succeeded, 3);
    assert_eq!(
        backend.opened_urls(),
        vec![
            "https://example.com/a".to_string(),
            "https://example.com/b".to_string(),
            "https://example.com/c".to_string(),
        ]
    );
}
