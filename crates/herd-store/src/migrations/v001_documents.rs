//! v001 -- the single `documents` table.
//!
//! Every collection, including nested ones such as `users/{uuid}/drafts`,
//! shares this table. Bodies are JSON-serialised `Document`s.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,                 -- collection path
    key        TEXT NOT NULL,                 -- document key within the collection
    body       TEXT NOT NULL,                 -- JSON
    updated_at TEXT NOT NULL,                 -- RFC-3339
    PRIMARY KEY (collection, key)
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
