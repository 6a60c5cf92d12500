//! In-process [`DocumentStore`] used by tests and offline sessions.
//!
//! All state sits behind one async mutex, and listeners are notified while
//! that lock is held, so every listener observes changes in the order they
//! were applied. Faults can be injected to exercise failure paths: a call
//! that fails this way never changes stored data.

use std::collections::BTreeMap;

use async_trait::async_trait;
use herd_shared::{triple_id, Document};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::backend::DocumentStore;
use crate::error::{Result, StoreError};
use crate::query::Query;
use crate::subscription::{Subscribers, Subscription, Target};

#[derive(Default)]
struct State {
    collections: BTreeMap<String, BTreeMap<String, Document>>,
    offline: bool,
    failing_writes: usize,
}

impl State {
    fn check_reachable(&self) -> Result<()> {
        if self.offline {
            return Err(StoreError::Transport("store is offline".into()));
        }
        Ok(())
    }

    fn check_writable(&mut self) -> Result<()> {
        self.check_reachable()?;
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(StoreError::Transport("injected write failure".into()));
        }
        Ok(())
    }

    fn resolve(&self, collection: &str, target: &Target) -> Vec<(String, Document)> {
        let Some(docs) = self.collections.get(collection) else {
            return Vec::new();
        };
        match target {
            Target::Key(key) => docs
                .get(key)
                .map(|d| vec![(key.clone(), d.clone())])
                .unwrap_or_default(),
            Target::Query(query) => {
                query.apply(docs.iter().map(|(k, d)| (k.clone(), d.clone())))
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    subscribers: Subscribers,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with a transport error.
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
        debug!(offline, "memory store reachability changed");
    }

    /// Make the next `count` mutating calls fail with a transport error.
    pub async fn fail_next_writes(&self, count: usize) {
        self.state.lock().await.failing_writes = count;
    }

    /// Number of documents stored in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .await
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub fn listener_count(&self) -> usize {
        self.subscribers.live()
    }

    fn notify(&self, state: &State, collection: &str) {
        self.subscribers
            .publish(collection, |target| Ok(state.resolve(collection, target)));
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let state = self.state.lock().await;
        state.check_reachable()?;
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned())
    }

    async fn set_document(&self, collection: &str, key: &str, document: Document) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_writable()?;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), document);
        debug!(collection, key, "document stored");
        self.notify(&state, collection);
        Ok(())
    }

    async fn update_fields(&self, collection: &str, key: &str, fields: Document) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_writable()?;
        let Some(existing) = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(key))
        else {
            warn!(collection, key, "update on missing document");
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                key: key.to_string(),
            });
        };
        existing.extend(fields);
        debug!(collection, key, "document fields updated");
        self.notify(&state, collection);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, key: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_writable()?;
        let removed = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(key))
            .is_some();
        if removed {
            debug!(collection, key, "document deleted");
            self.notify(&state, collection);
        }
        Ok(())
    }

    async fn add_document(&self, collection: &str, document: Document) -> Result<String> {
        let key = triple_id();
        self.set_document(collection, &key, document).await?;
        Ok(key)
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<(String, Document)>> {
        let state = self.state.lock().await;
        state.check_reachable()?;
        Ok(state.resolve(collection, &Target::Query(query.clone())))
    }

    async fn subscribe(&self, collection: &str, target: Target) -> Result<Subscription> {
        let state = self.state.lock().await;
        state.check_reachable()?;
        let initial = state.resolve(collection, &target);
        Ok(self.subscribers.register(collection, target, initial))
    }
}
