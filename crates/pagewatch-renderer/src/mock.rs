//! Scripted in-memory backend for the readiness and handshake tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::backend::{
    CollectReply, CollectRequest, LoadState, RenderBackend, SessionEvent, SessionId,
};
use crate::error::{RendererError, Result};

pub(crate) struct MockBackend {
    status: Mutex<LoadState>,
    status_calls: AtomicU32,
    queued_events: Mutex<Vec<SessionEvent>>,
    // Kept so the stream stays open after queued events are delivered, and
    // so tests can observe teardown of the subscription.
    event_tx: Mutex<Option<mpsc::Sender<SessionEvent>>>,
    send_failures: AtomicU32,
    send_calls: AtomicU32,
    reply: Mutex<Option<CollectReply>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            status: Mutex::new(LoadState::Loading),
            status_calls: AtomicU32::new(0),
            queued_events: Mutex::new(Vec::new()),
            event_tx: Mutex::new(None),
            send_failures: AtomicU32::new(0),
            send_calls: AtomicU32::new(0),
            reply: Mutex::new(None),
        }
    }

    pub(crate) fn with_status(self, state: LoadState) -> Self {
        *self.status.lock().unwrap() = state;
        self
    }

    pub(crate) fn with_event(self, event: SessionEvent) -> Self {
        self.queued_events.lock().unwrap().push(event);
        self
    }

    /// Bounce this many collect sends before accepting one.
    pub(crate) fn with_send_failures(self, failures: u32) -> Self {
        self.send_failures.store(failures, Ordering::SeqCst);
        self
    }

    pub(crate) fn with_reply(self, reply: CollectReply) -> Self {
        *self.reply.lock().unwrap() = Some(reply);
        self
    }

    pub(crate) fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn send_calls(&self) -> u32 {
        self.send_calls.load(Ordering::SeqCst)
    }

    /// True once the receiver side of the event stream has been dropped.
    pub(crate) fn events_torn_down(&self) -> bool {
        self.event_tx
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| tx.is_closed())
    }
}

#[async_trait]
impl RenderBackend for MockBackend {
    async fn open(&self, _url: &str) -> Result<SessionId> {
        Ok(SessionId("mock".to_string()))
    }

    async fn status(&self, _session: &SessionId) -> Result<LoadState> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.status.lock().unwrap())
    }

    async fn events(&self, _session: &SessionId) -> Result<mpsc::Receiver<SessionEvent>> {
        let (tx, rx) = mpsc::channel(16);
        for event in self.queued_events.lock().unwrap().drain(..) {
            tx.try_send(event).expect("mock event channel full");
        }
        *self.event_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn request_collect(&self, session: &SessionId, _request: &CollectRequest) -> Result<()> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.send_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != u32::MAX {
                self.send_failures.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(RendererError::ExtractorNotReady {
                session: session.to_string(),
            });
        }
        Ok(())
    }

    async fn collect_response(&self, _session: &SessionId) -> Result<CollectReply> {
        let reply = self.reply.lock().unwrap().take();
        match reply {
            Some(reply) => Ok(reply),
            // No scripted reply: hang until the caller's deadline fires.
            None => std::future::pending().await,
        }
    }

    async fn close(&self, _session: &SessionId) -> Result<()> {
        Ok(())
    }
}
