use std::collections::BTreeMap;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use pagewatch_core::types::{RunState, Target};
use pagewatch_core::validate::validate_target;

use crate::error::{Result, StoreError};

/// Name of the target-configuration document.
pub const TARGETS_DOC: &str = "targets";
/// Name of the run-state document.
pub const RUN_STATE_DOC: &str = "run_state";

/// Thread-safe access to the two persisted documents.
///
/// Wraps a single SQLite connection in a `Mutex` — the scheduler worker is
/// the only run-state writer, so a Mutex is sufficient.
pub struct DocumentStore {
    db: Mutex<Connection>,
}

impl DocumentStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Load the full target configuration, keyed by id.
    ///
    /// An absent document reads as an empty map — the first-ever startup has
    /// no configuration yet.
    pub fn load_targets(&self) -> Result<BTreeMap<String, Target>> {
        let db = self.db.lock().unwrap();
        decode(read_doc(&db, TARGETS_DOC)?)
    }

    /// Load the full run-state document, keyed by target id.
    pub fn load_run_states(&self) -> Result<BTreeMap<String, RunState>> {
        let db = self.db.lock().unwrap();
        decode(read_doc(&db, RUN_STATE_DOC)?)
    }

    /// Replace the run-state document wholesale.
    pub fn save_run_states(&self, states: &BTreeMap<String, RunState>) -> Result<()> {
        let db = self.db.lock().unwrap();
        write_doc(&db, RUN_STATE_DOC, &serde_json::to_string(states)?)?;
        debug!(entries = states.len(), "run-state document saved");
        Ok(())
    }

    /// True once the run-state document has been written at least once.
    /// Used to tell a first-ever install apart from a restart.
    pub fn has_run_state_doc(&self) -> Result<bool> {
        let db = self.db.lock().unwrap();
        Ok(read_doc(&db, RUN_STATE_DOC)?.is_some())
    }

    /// Insert or replace a target definition. Editing-collaborator
    /// operation; the definition is validated before anything is written.
    pub fn upsert_target(&self, target: Target) -> Result<()> {
        validate_target(&target)?;
        let db = self.db.lock().unwrap();
        let mut targets: BTreeMap<String, Target> = decode(read_doc(&db, TARGETS_DOC)?)?;
        targets.insert(target.id.clone(), target);
        write_doc(&db, TARGETS_DOC, &serde_json::to_string(&targets)?)?;
        Ok(())
    }

    /// Delete a target and its run state in one transaction, so the two
    /// documents can never disagree about a removed id.
    pub fn delete_target(&self, id: &str) -> Result<()> {
        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;

        let mut targets: BTreeMap<String, Target> = decode(read_doc(&tx, TARGETS_DOC)?)?;
        if targets.remove(id).is_none() {
            return Err(StoreError::TargetNotFound { id: id.to_string() });
        }
        let mut states: BTreeMap<String, RunState> = decode(read_doc(&tx, RUN_STATE_DOC)?)?;
        states.remove(id);

        write_doc(&tx, TARGETS_DOC, &serde_json::to_string(&targets)?)?;
        write_doc(&tx, RUN_STATE_DOC, &serde_json::to_string(&states)?)?;
        tx.commit()?;

        info!(target = id, "target and run state deleted");
        Ok(())
    }
}

/// Read a document body, `None` when it has never been written.
fn read_doc(conn: &Connection, name: &str) -> Result<Option<String>> {
    match conn.query_row(
        "SELECT body FROM documents WHERE name = ?1",
        [name],
        |row| row.get::<_, String>(0),
    ) {
        Ok(body) => Ok(Some(body)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(StoreError::Database(e)),
    }
}

/// Replace a document body wholesale.
fn write_doc(conn: &Connection, name: &str, body: &str) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO documents (name, body, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(name) DO UPDATE SET body = ?2, updated_at = ?3",
        rusqlite::params![name, body, now],
    )?;
    Ok(())
}

fn decode<T: serde::de::DeserializeOwned + Default>(body: Option<String>) -> Result<T> {
    match body {
        Some(body) => Ok(serde_json::from_str(&body)?),
        None => Ok(T::default()),
    }
}
