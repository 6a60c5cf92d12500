//! SQLite-backed [`DocumentStore`].
//!
//! Every collection lives in the single `documents` table with JSON bodies.
//! Queries load the collection and filter in process, which is fine for the
//! per-device cache sizes this store is used for. Listeners are notified
//! while the connection lock is held so they observe writes in commit order.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use directories::ProjectDirs;
use herd_shared::{triple_id, Document};
use rusqlite::{params, Connection, OptionalExtension};

use crate::backend::DocumentStore;
use crate::error::{Result, StoreError};
use crate::migrations;
use crate::query::Query;
use crate::subscription::{Subscribers, Subscription, Target};

pub struct SqliteStore {
    conn: Mutex<Connection>,
    subscribers: Subscribers,
}

impl SqliteStore {
    /// Open (or create) the default application database.
    ///
    /// - Linux:   `~/.local/share/theherd/herd.db`
    /// - macOS:   `~/Library/Application Support/app.theherd.theherd/herd.db`
    pub fn open_default() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("app", "theherd", "theherd").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Self::open_at(&data_dir.join("herd.db"))
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "opening document database");
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    /// A private database that disappears when the store is dropped.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            subscribers: Subscribers::new(),
        })
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.lock().path().map(PathBuf::from)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn notify(&self, conn: &Connection, collection: &str) {
        self.subscribers
            .publish(collection, |target| resolve(conn, collection, target));
    }
}

fn load(conn: &Connection, collection: &str, key: &str) -> Result<Option<Document>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND key = ?2",
            params![collection, key],
            |row| row.get(0),
        )
        .optional()?;
    body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
        .transpose()
}

fn load_all(conn: &Connection, collection: &str) -> Result<Vec<(String, Document)>> {
    let mut stmt = conn.prepare(
        "SELECT key, body FROM documents WHERE collection = ?1 ORDER BY key",
    )?;
    let rows = stmt.query_map(params![collection], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut docs = Vec::new();
    for row in rows {
        let (key, body) = row?;
        docs.push((key, serde_json::from_str(&body)?));
    }
    Ok(docs)
}

fn store(conn: &Connection, collection: &str, key: &str, document: &Document) -> Result<()> {
    let body = serde_json::to_string(document)?;
    conn.execute(
        "INSERT INTO documents (collection, key, body, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(collection, key) DO UPDATE SET body = ?3, updated_at = ?4",
        params![collection, key, body, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn resolve(conn: &Connection, collection: &str, target: &Target) -> Result<Vec<(String, Document)>> {
    match target {
        Target::Key(key) => Ok(load(conn, collection, key)?
            .map(|d| vec![(key.clone(), d)])
            .unwrap_or_default()),
        Target::Query(query) => Ok(query.apply(load_all(conn, collection)?)),
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get_document(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        load(&self.lock(), collection, key)
    }

    async fn set_document(&self, collection: &str, key: &str, document: Document) -> Result<()> {
        let conn = self.lock();
        store(&conn, collection, key, &document)?;
        tracing::debug!(collection, key, "document stored");
        self.notify(&conn, collection);
        Ok(())
    }

    async fn update_fields(&self, collection: &str, key: &str, fields: Document) -> Result<()> {
        let conn = self.lock();
        let mut existing = load(&conn, collection, key)?.ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            key: key.to_string(),
        })?;
        existing.extend(fields);
        store(&conn, collection, key, &existing)?;
        self.notify(&conn, collection);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, key: &str) -> Result<()> {
        let conn = self.lock();
        let removed = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND key = ?2",
            params![collection, key],
        )?;
        if removed > 0 {
            tracing::debug!(collection, key, "document deleted");
            self.notify(&conn, collection);
        }
        Ok(())
    }

    async fn add_document(&self, collection: &str, document: Document) -> Result<String> {
        let key = triple_id();
        self.set_document(collection, &key, document).await?;
        Ok(key)
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<(String, Document)>> {
        let docs = load_all(&self.lock(), collection)?;
        Ok(query.apply(docs))
    }

    async fn subscribe(&self, collection: &str, target: Target) -> Result<Subscription> {
        let conn = self.lock();
        let initial = resolve(&conn, collection, &target)?;
        Ok(self.subscribers.register(collection, target, initial))
    }
}
