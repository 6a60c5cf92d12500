//! Typed access to one collection.
//!
//! A [`Repository`] pairs a [`DocumentStore`] with a collection path and an
//! entity type, encoding on the way out and decoding on the way in. It never
//! retries: each write is issued at most once per call and its fate is
//! recorded in the caller's [`Operation`].
//!
//! # Concurrent writers
//!
//! Writes replace whole documents. Two sessions that read, modify and write
//! the same document concurrently race, and the later acknowledgement wins;
//! the earlier change is silently lost. Nested data such as a post's comment
//! tree is always rewritten from the root, so this applies to every reply,
//! vote and deletion as well. No version token guards against it.

use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use herd_shared::{Codec, Document};
use tracing::{debug, error};

use crate::backend::DocumentStore;
use crate::error::{Result, StoreError};
use crate::operation::Operation;
use crate::query::Query;
use crate::subscription::{Snapshot, Subscription, Target};

pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    collection: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            collection: self.collection.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl<T: Codec + Send + 'static> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            _entity: PhantomData,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Upsert `entity` at `key`, or at a store-assigned key when `key` is
    /// `None`. Returns the key written.
    pub async fn write(&self, entity: &T, key: Option<&str>, op: &Operation) -> Result<String> {
        let document = entity.encode();
        let collection = self.collection.as_str();
        op.track(async {
            match key {
                Some(key) => {
                    self.store.set_document(collection, key, document).await?;
                    Ok(key.to_string())
                }
                None => self.store.add_document(collection, document).await,
            }
        })
        .await
    }

    /// Overwrite selected top-level fields of an existing document.
    pub async fn update_fields(&self, key: &str, fields: Document, op: &Operation) -> Result<()> {
        op.track(self.store.update_fields(&self.collection, key, fields))
            .await
    }

    pub async fn delete(&self, key: &str, op: &Operation) -> Result<()> {
        op.track(self.store.delete_document(&self.collection, key))
            .await
    }

    /// Fetch and decode one document; `NotFound` if nothing is stored.
    pub async fn read(&self, key: &str) -> Result<T> {
        self.try_read(key).await?.ok_or_else(|| StoreError::NotFound {
            collection: self.collection.clone(),
            key: key.to_string(),
        })
    }

    pub async fn try_read(&self, key: &str) -> Result<Option<T>> {
        match self.store.get_document(&self.collection, key).await? {
            Some(doc) => Ok(Some(self.decode(key, &doc)?)),
            None => Ok(None),
        }
    }

    /// Fetch and decode every match. One malformed document fails the call.
    pub async fn read_collection(&self, query: &Query) -> Result<Vec<T>> {
        let docs = self.store.query(&self.collection, query).await?;
        self.decode_all(&docs)
    }

    /// Like [`read_collection`](Self::read_collection), keeping each key.
    pub async fn read_keyed(&self, query: &Query) -> Result<Vec<(String, T)>> {
        let docs = self.store.query(&self.collection, query).await?;
        docs.iter()
            .map(|(key, doc)| Ok((key.clone(), self.decode(key, doc)?)))
            .collect()
    }

    /// Snapshots of one key: `None` while nothing is stored there.
    ///
    /// The stream is lazy (nothing is registered until first polled), never
    /// ends on its own and stops delivering once dropped. Calling `watch`
    /// again starts a fresh listener.
    pub fn watch(&self, key: &str) -> BoxStream<'static, Result<Option<T>>> {
        let repo = self.clone();
        self.snapshots(Target::Key(key.to_string()))
            .map(move |snapshot| {
                let snapshot = snapshot?;
                match snapshot.documents.first() {
                    Some((key, doc)) => Ok(Some(repo.decode(key, doc)?)),
                    None => Ok(None),
                }
            })
            .boxed()
    }

    /// Snapshots of a query's full result set.
    pub fn watch_query(&self, query: Query) -> BoxStream<'static, Result<Vec<T>>> {
        let repo = self.clone();
        self.snapshots(Target::Query(query))
            .map(move |snapshot| repo.decode_all(&snapshot?.documents))
            .boxed()
    }

    fn snapshots(&self, target: Target) -> BoxStream<'static, Result<Snapshot>> {
        enum State {
            Pending(Arc<dyn DocumentStore>, String, Target),
            Live(Subscription),
            Done,
        }

        let initial = State::Pending(Arc::clone(&self.store), self.collection.clone(), target);
        stream::unfold(initial, |state| async move {
            match state {
                State::Pending(store, collection, target) => {
                    match store.subscribe(&collection, target).await {
                        Ok(mut sub) => {
                            debug!(collection = %collection, listener = sub.id(), "watch started");
                            let next = sub.next().await?;
                            Some((Ok(next), State::Live(sub)))
                        }
                        Err(e) => Some((Err(e), State::Done)),
                    }
                }
                State::Live(mut sub) => {
                    let next = sub.next().await?;
                    Some((Ok(next), State::Live(sub)))
                }
                State::Done => None,
            }
        })
        .boxed()
    }

    fn decode(&self, key: &str, doc: &Document) -> Result<T> {
        T::decode(doc).map_err(|e| {
            error!(collection = %self.collection, key, error = %e, "malformed document");
            StoreError::from(e)
        })
    }

    fn decode_all(&self, docs: &[(String, Document)]) -> Result<Vec<T>> {
        docs.iter().map(|(key, doc)| self.decode(key, doc)).collect()
    }
}
