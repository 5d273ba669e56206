use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use pagewatch_core::types::{RunState, RunStatus, Target};
use pagewatch_store::DocumentStore;

use crate::error::Result;
use crate::executor::Executor;
use crate::schedule::next_run_after_success;

/// Why the engine woke up.
#[derive(Debug, Clone, Copy)]
pub enum Wake {
    Timer,
    FirstInstall,
    Manual,
}

/// Sending half of the one-slot wake queue.
///
/// Capacity one plus `try_send` makes overlapping cycles structurally
/// impossible: at most one wake can sit queued behind a running cycle, and
/// anything beyond that is dropped, not deferred.
#[derive(Clone)]
pub struct WakeHandle {
    tx: mpsc::Sender<Wake>,
}

impl WakeHandle {
    /// Enqueue a wake. Returns false when it was dropped because a cycle
    /// is already running with another wake pending.
    pub fn trigger(&self, wake: Wake) -> bool {
        match self.tx.try_send(wake) {
            Ok(()) => true,
            Err(_) => {
                warn!(?wake, "wake skipped — a cycle is running and one is already queued");
                false
            }
        }
    }
}

/// Build the one-slot wake queue.
pub fn wake_queue() -> (WakeHandle, mpsc::Receiver<Wake>) {
    let (tx, rx) = mpsc::channel(1);
    (WakeHandle { tx }, rx)
}

/// Tally of one wake cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// The wake/dispatch engine: reconciles state against config and runs due
/// targets strictly one after another.
pub struct SchedulerEngine {
    store: Arc<DocumentStore>,
    executor: Executor,
}

impl SchedulerEngine {
    pub fn new(store: Arc<DocumentStore>, executor: Executor) -> Self {
        Self { store, executor }
    }

    /// Ensure every configured target has a run-state entry. Existing
    /// entries are never touched; the document is only written when
    /// something was added, so a second pass with unchanged config is a
    /// no-op. Returns the number of entries created.
    pub fn reconcile(&self, now: DateTime<Utc>) -> Result<usize> {
        let targets = self.store.load_targets()?;
        let mut states = self.store.load_run_states()?;

        let added = add_missing_states(&targets, &mut states, now);
        if added > 0 {
            self.store.save_run_states(&states)?;
            info!(added, "run state created for new targets");
        }
        Ok(added)
    }

    /// One full wake cycle: reconcile, select due enabled targets, execute
    /// each sequentially. Individual run failures never abort the cycle.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let cycle = Uuid::new_v4();
        let now = Utc::now();

        self.reconcile(now)?;

        let targets = self.store.load_targets()?;
        let states = self.store.load_run_states()?;

        // Not-before semantics: anything at or past its slot is due, no
        // matter how late. BTreeMap iteration already yields ids in
        // lexicographic order, which fixes the execution order.
        let due: Vec<&str> = targets
            .iter()
            .filter(|(id, target)| {
                target.enabled
                    && states
                        .get(id.as_str())
                        .map_or(true, |state| state.next_run_at <= now)
            })
            .map(|(id, _)| id.as_str())
            .collect();

        let mut summary = CycleSummary {
            selected: due.len(),
            ..CycleSummary::default()
        };
        debug!(%cycle, selected = due.len(), "cycle selection complete");

        for id in due {
            match self.executor.execute(id, &targets).await {
                RunStatus::Ok => summary.succeeded += 1,
                RunStatus::Fail => summary.failed += 1,
            }
        }

        info!(
            %cycle,
            selected = summary.selected,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "cycle complete"
        );
        Ok(summary)
    }

    /// Worker loop: consumes the wake queue until shutdown broadcasts
    /// `true` or the queue closes. The single consumer is what guarantees
    /// cycles never overlap.
    pub async fn run(self, mut wake_rx: mpsc::Receiver<Wake>, mut shutdown: watch::Receiver<bool>) {
        info!("scheduler engine started");
        loop {
            tokio::select! {
                wake = wake_rx.recv() => match wake {
                    Some(wake) => {
                        debug!(?wake, "wake received");
                        if let Err(e) = self.run_cycle().await {
                            error!("wake cycle failed: {e}");
                        }
                    }
                    None => break,
                },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }
}

/// Pure half of reconciliation: insert a fresh entry for every target id
/// absent from `states`. Never modifies an existing entry.
fn add_missing_states(
    targets: &BTreeMap<String, Target>,
    states: &mut BTreeMap<String, RunState>,
    now: DateTime<Utc>,
) -> usize {
    let mut added = 0;
    for (id, target) in targets {
        if !states.contains_key(id) {
            let next = next_run_after_success(now, &target.schedule);
            states.insert(id.clone(), RunState::scheduled(next));
            added += 1;
        }
    }
    added
}
