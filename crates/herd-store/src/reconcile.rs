//! Local copies of remote entities, kept current by realtime snapshots.
//!
//! A [`Reconciler`] holds one value per identity (a user's profile, a chat,
//! the feed query...). Each identity can be fed by one snapshot stream; every
//! snapshot replaces the local value wholesale. Local optimistic writes are
//! applied immediately and rolled back if the remote write fails, but only
//! when nothing has replaced the optimistic value in the meantime.
//!
//! The server is authoritative: a snapshot that arrives while a local write
//! for the same identity is still in flight replaces the optimistic value,
//! and the later outcome of that write does not bring it back.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::{Stream, StreamExt};
use herd_shared::Codec;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::Result;
use crate::query::Query;
use crate::repository::Repository;

const EVENT_CAPACITY: usize = 64;

/// Why a local value changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Snapshot,
    Local,
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileEvent {
    pub identity: String,
    pub origin: Origin,
}

/// Handle for an optimistic write in flight; see
/// [`Reconciler::begin_local`].
#[derive(Debug)]
#[must_use = "pass the handle to finish_local once the remote call completes"]
pub struct LocalWrite<V> {
    identity: String,
    generation: u64,
    previous: Option<V>,
}

struct Entry<V> {
    value: Option<V>,
    generation: u64,
}

struct Registration {
    id: u64,
    task: JoinHandle<()>,
}

struct State<V> {
    entries: HashMap<String, Entry<V>>,
    registrations: HashMap<String, Registration>,
    next_generation: u64,
    next_registration: u64,
}

struct Inner<V> {
    state: Mutex<State<V>>,
    events: broadcast::Sender<ReconcileEvent>,
}

impl<V> Inner<V> {
    fn lock(&self) -> MutexGuard<'_, State<V>> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl<V> Drop for Inner<V> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|p| p.into_inner());
        for (_, registration) in state.registrations.drain() {
            registration.task.abort();
        }
    }
}

impl<V> State<V> {
    fn replace(&mut self, identity: &str, value: Option<V>) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        let entry = self
            .entries
            .entry(identity.to_string())
            .or_insert(Entry {
                value: None,
                generation,
            });
        entry.value = value;
        entry.generation = generation;
        generation
    }
}

pub struct Reconciler<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for Reconciler<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone + Send + 'static> Default for Reconciler<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + 'static> Reconciler<V> {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    entries: HashMap::new(),
                    registrations: HashMap::new(),
                    next_generation: 0,
                    next_registration: 0,
                }),
                events,
            }),
        }
    }

    /// The locally held value for `identity`.
    pub fn get(&self, identity: &str) -> Option<V> {
        self.inner
            .lock()
            .entries
            .get(identity)
            .and_then(|e| e.value.clone())
    }

    pub fn changes(&self) -> broadcast::Receiver<ReconcileEvent> {
        self.inner.events.subscribe()
    }

    pub fn is_attached(&self, identity: &str) -> bool {
        self.inner.lock().registrations.contains_key(identity)
    }

    /// Feed `identity` from `snapshots`, replacing any stream already
    /// attached to it. `None` snapshots clear the local value; errors are
    /// logged and leave it untouched.
    pub fn attach<S>(&self, identity: &str, snapshots: S)
    where
        S: Stream<Item = Result<Option<V>>> + Send + 'static,
    {
        let mut state = self.inner.lock();
        state.next_registration += 1;
        let id = state.next_registration;

        let weak = Arc::downgrade(&self.inner);
        let owned_identity = identity.to_string();
        let task = tokio::spawn(async move {
            let mut snapshots = std::pin::pin!(snapshots);
            while let Some(snapshot) = snapshots.next().await {
                let Some(inner) = weak.upgrade() else { break };
                if !apply(&inner, &owned_identity, id, snapshot) {
                    break;
                }
            }
        });

        if let Some(previous) = state
            .registrations
            .insert(identity.to_string(), Registration { id, task })
        {
            previous.task.abort();
        }
        debug!(identity, registration = id, "snapshot stream attached");
    }

    /// Stop listening for `identity`. No snapshot is applied afterwards.
    pub fn detach(&self, identity: &str) -> bool {
        match self.inner.lock().registrations.remove(identity) {
            Some(registration) => {
                registration.task.abort();
                debug!(identity, "snapshot stream detached");
                true
            }
            None => false,
        }
    }

    /// Apply `value` locally ahead of the remote write that will carry it.
    pub fn begin_local(&self, identity: &str, value: V) -> LocalWrite<V> {
        let mut state = self.inner.lock();
        let previous = state.entries.get(identity).and_then(|e| e.value.clone());
        let generation = state.replace(identity, Some(value));
        drop(state);
        self.emit(identity, Origin::Local);
        LocalWrite {
            identity: identity.to_string(),
            generation,
            previous,
        }
    }

    /// Settle an optimistic write. On failure the previous value comes back,
    /// unless a snapshot or another local write has replaced the optimistic
    /// one since. Returns whether a rollback happened.
    pub fn finish_local(&self, write: LocalWrite<V>, succeeded: bool) -> bool {
        if succeeded {
            return false;
        }
        let mut state = self.inner.lock();
        let current = state
            .entries
            .get(&write.identity)
            .map(|e| e.generation);
        if current != Some(write.generation) {
            debug!(identity = %write.identity, "optimistic value superseded, no rollback");
            return false;
        }
        state.replace(&write.identity, write.previous);
        drop(state);
        self.emit(&write.identity, Origin::Rollback);
        true
    }

    /// [`begin_local`](Self::begin_local), run `call`, then
    /// [`finish_local`](Self::finish_local).
    pub async fn optimistic<R, F>(&self, identity: &str, value: V, call: F) -> Result<R>
    where
        F: Future<Output = Result<R>>,
    {
        let write = self.begin_local(identity, value);
        let result = call.await;
        self.finish_local(write, result.is_ok());
        result
    }

    fn emit(&self, identity: &str, origin: Origin) {
        let _ = self.inner.events.send(ReconcileEvent {
            identity: identity.to_string(),
            origin,
        });
    }
}

impl<T: Codec + Clone + Send + 'static> Reconciler<T> {
    /// Keep `key` of `repo` mirrored under the identity `key`.
    pub fn watch_document(&self, repo: &Repository<T>, key: &str) {
        self.attach(key, repo.watch(key));
    }
}

impl<T: Codec + Clone + Send + 'static> Reconciler<Vec<T>> {
    /// Keep the result set of `query` mirrored under `identity`.
    pub fn watch_query(&self, repo: &Repository<T>, identity: &str, query: Query) {
        self.attach(identity, repo.watch_query(query).map(|r| r.map(Some)));
    }
}

/// Returns false once the registration has been replaced or removed.
fn apply<V>(inner: &Inner<V>, identity: &str, registration: u64, snapshot: Result<Option<V>>) -> bool {
    let mut state = inner.lock();
    if state.registrations.get(identity).map(|r| r.id) != Some(registration) {
        return false;
    }
    match snapshot {
        Ok(value) => {
            state.replace(identity, value);
            drop(state);
            let _ = inner.events.send(ReconcileEvent {
                identity: identity.to_string(),
                origin: Origin::Snapshot,
            });
        }
        Err(e) => {
            error!(identity, error = %e, "dropping undecodable snapshot");
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use futures::channel::mpsc;
    use herd_shared::{Color, User};

    use super::*;
    use crate::backend::DocumentStore;
    use crate::error::StoreError;
    use crate::memory::MemoryStore;
    use crate::operation::{Operation, OperationStatus};

    async fn next_event(rx: &mut broadcast::Receiver<ReconcileEvent>) -> ReconcileEvent {
        tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("event in time")
            .expect("channel open")
    }

    #[tokio::test]
    async fn snapshots_replace_wholesale() {
        let reconciler: Reconciler<String> = Reconciler::new();
        let mut events = reconciler.changes();
        let (tx, rx) = mpsc::unbounded();
        reconciler.attach("x", rx);

        tx.unbounded_send(Ok(Some("one".to_string()))).unwrap();
        assert_eq!(next_event(&mut events).await.origin, Origin::Snapshot);
        assert_eq!(reconciler.get("x").as_deref(), Some("one"));

        tx.unbounded_send(Ok(None)).unwrap();
        next_event(&mut events).await;
        assert_eq!(reconciler.get("x"), None);
    }

    #[tokio::test]
    async fn errors_keep_the_last_good_value() {
        let reconciler: Reconciler<String> = Reconciler::new();
        let mut events = reconciler.changes();
        let (tx, rx) = mpsc::unbounded();
        reconciler.attach("x", rx);

        tx.unbounded_send(Ok(Some("good".into()))).unwrap();
        next_event(&mut events).await;
        tx.unbounded_send(Err(StoreError::Transport("blip".into()))).unwrap();
        tx.unbounded_send(Ok(Some("better".into()))).unwrap();
        next_event(&mut events).await;
        assert_eq!(reconciler.get("x").as_deref(), Some("better"));
    }

    #[tokio::test]
    async fn detach_is_immediate() {
        let reconciler: Reconciler<String> = Reconciler::new();
        let (tx, rx) = mpsc::unbounded();
        reconciler.attach("x", rx);
        assert!(reconciler.detach("x"));
        assert!(!reconciler.is_attached("x"));

        let _ = tx.unbounded_send(Ok(Some("late".into())));
        tokio::task::yield_now().await;
        assert_eq!(reconciler.get("x"), None);
        assert!(!reconciler.detach("x"));
    }

    #[tokio::test]
    async fn failed_write_rolls_back() {
        let reconciler: Reconciler<String> = Reconciler::new();
        let write = reconciler.begin_local("x", "first".into());
        assert!(!reconciler.finish_local(write, true));

        let write = reconciler.begin_local("x", "second".into());
        assert_eq!(reconciler.get("x").as_deref(), Some("second"));
        assert!(reconciler.finish_local(write, false));
        assert_eq!(reconciler.get("x").as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn snapshot_wins_over_in_flight_write() {
        let store = Arc::new(MemoryStore::new());
        let repo: Repository<User> =
            Repository::new(store.clone() as Arc<dyn DocumentStore>, "users");
        let server = User::new("🐄", Color::BLUE, Utc::now());
        repo.write(&server, Some(&server.uuid), &Operation::new())
            .await
            .unwrap();

        let reconciler: Reconciler<User> = Reconciler::new();
        let mut events = reconciler.changes();
        reconciler.watch_document(&repo, &server.uuid);
        next_event(&mut events).await;

        // Local optimistic edit, remote write still pending.
        let mut local = server.clone();
        local.emoji = "🐑".into();
        let op = Operation::new();
        op.begin().unwrap();
        let write = reconciler.begin_local(&server.uuid, local);
        assert_eq!(next_event(&mut events).await.origin, Origin::Local);

        // Another session's write lands first.
        let mut remote = server.clone();
        remote.emoji = "🐖".into();
        store
            .set_document("users", &server.uuid, remote.encode())
            .await
            .unwrap();
        assert_eq!(next_event(&mut events).await.origin, Origin::Snapshot);
        assert_eq!(op.status(), OperationStatus::InProgress);
        assert_eq!(reconciler.get(&server.uuid), Some(remote.clone()));

        // The pending write fails: nothing to roll back over server truth.
        op.fail("network").unwrap();
        assert!(!reconciler.finish_local(write, false));
        assert_eq!(reconciler.get(&server.uuid), Some(remote));
    }

    #[tokio::test]
    async fn query_mirror_follows_collection() {
        let store = Arc::new(MemoryStore::new());
        let repo: Repository<User> =
            Repository::new(store.clone() as Arc<dyn DocumentStore>, "users");
        let reconciler: Reconciler<Vec<User>> = Reconciler::new();
        let mut events = reconciler.changes();
        reconciler.watch_query(&repo, "everyone", Query::all());
        next_event(&mut events).await;
        assert_eq!(reconciler.get("everyone"), Some(vec![]));

        let u = User::new("🐄", Color::BLUE, Utc::now());
        repo.write(&u, Some(&u.uuid), &Operation::new()).await.unwrap();
        next_event(&mut events).await;
        assert_eq!(reconciler.get("everyone"), Some(vec![u]));
    }

    #[tokio::test]
    async fn optimistic_wrapper_rolls_back_on_failure() {
        let reconciler: Reconciler<i64> = Reconciler::new();
        let result: Result<()> = reconciler
            .optimistic("n", 5, async { Err(StoreError::Transport("down".into())) })
            .await;
        assert!(result.is_err());
        assert_eq!(reconciler.get("n"), None);
    }
}
