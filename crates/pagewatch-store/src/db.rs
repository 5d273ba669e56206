use rusqlite::Connection;

use crate::error::Result;

/// Initialise the document schema in `conn`.
///
/// One row per document; the body is the whole JSON object. Safe to call on
/// every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            name        TEXT NOT NULL PRIMARY KEY,
            body        TEXT NOT NULL,   -- whole JSON document
            updated_at  TEXT NOT NULL
        ) STRICT;
        ",
    )?;
    Ok(())
}
