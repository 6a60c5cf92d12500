//! # herd-store
//!
//! The document-sync layer. A [`DocumentStore`] backend (in-memory or local
//! SQLite) holds documents and pushes realtime snapshots; a typed
//! [`Repository`] maps them to entities and reports each remote call through
//! an [`Operation`]; a [`Reconciler`] keeps local copies current with those
//! snapshots while honouring optimistic writes.

pub mod backend;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod operation;
pub mod query;
pub mod reconcile;
pub mod repository;
pub mod subscription;

mod error;

pub use backend::{subcollection, DocumentStore};
pub use database::SqliteStore;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use operation::{Operation, OperationStatus};
pub use query::{Direction, Filter, Query};
pub use reconcile::{LocalWrite, Origin, ReconcileEvent, Reconciler};
pub use repository::Repository;
pub use subscription::{Snapshot, Subscription, Target};
