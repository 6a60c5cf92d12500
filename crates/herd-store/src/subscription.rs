//! Realtime listeners.
//!
//! Backends keep a [`Subscribers`] registry. After every mutation they
//! recompute the snapshot of each listener registered on the touched
//! collection and push it down that listener's channel. A listener is fed
//! its current snapshot as soon as it registers.
//!
//! A [`Subscription`] never ends on its own. Dropping it or calling
//! [`Subscription::cancel`] stops deliveries immediately; the backend prunes
//! the dead sender on its next fan-out.

use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};

use futures::Stream;
use herd_shared::Document;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::Result;
use crate::query::Query;

/// What a listener watches inside one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Key(String),
    Query(Query),
}

/// The full state of a listener's target at one point in store order.
///
/// A `Key` target yields zero documents once the document is deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub collection: String,
    pub documents: Vec<(String, Document)>,
}

struct Listener {
    id: u64,
    collection: String,
    target: Target,
    tx: mpsc::UnboundedSender<Snapshot>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<Listener>,
}

/// Listener bookkeeping shared by every backend.
#[derive(Default)]
pub struct Subscribers {
    inner: Mutex<Registry>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and hand it `initial` as its first snapshot.
    pub fn register(&self, collection: &str, target: Target, initial: Vec<(String, Document)>) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Snapshot {
            collection: collection.to_string(),
            documents: initial,
        });

        let mut registry = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        registry.next_id += 1;
        let id = registry.next_id;
        registry.listeners.push(Listener {
            id,
            collection: collection.to_string(),
            target,
            tx,
        });
        debug!(collection, listener = id, "listener registered");

        Subscription {
            id,
            rx,
            cancelled: false,
        }
    }

    /// Recompute and deliver snapshots for every live listener on
    /// `collection`. Listeners whose receiving side is gone are dropped.
    pub fn publish<F>(&self, collection: &str, mut compute: F)
    where
        F: FnMut(&Target) -> Result<Vec<(String, Document)>>,
    {
        let mut registry = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        registry.listeners.retain(|l| !l.tx.is_closed());

        for listener in registry.listeners.iter().filter(|l| l.collection == collection) {
            match compute(&listener.target) {
                Ok(documents) => {
                    let _ = listener.tx.send(Snapshot {
                        collection: collection.to_string(),
                        documents,
                    });
                }
                Err(e) => {
                    error!(collection, listener = listener.id, error = %e, "failed to build snapshot");
                }
            }
        }
    }

    /// Number of listeners still attached.
    pub fn live(&self) -> usize {
        let registry = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        registry.listeners.iter().filter(|l| !l.tx.is_closed()).count()
    }
}

/// An infinite stream of [`Snapshot`]s for one listener.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<Snapshot>,
    cancelled: bool,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop deliveries. Snapshots already buffered are discarded.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            debug!(listener = self.id, "listener cancelled");
        }
        self.cancelled = true;
        self.rx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Stream for Subscription {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Snapshot>> {
        if self.cancelled {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}
