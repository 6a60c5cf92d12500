//! The document-store contract every backend fulfils.

use async_trait::async_trait;
use herd_shared::Document;

use crate::error::Result;
use crate::query::Query;
use crate::subscription::{Subscription, Target};

/// A remote (or local) store of documents grouped into named collections.
///
/// Sub-collections are addressed by path, e.g. `users/{uuid}/drafts`; see
/// [`subcollection`]. No call is retried internally: a failing call returns
/// once, and a call that fails leaves stored state untouched.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `Ok(None)` when nothing is stored at the key.
    async fn get_document(&self, collection: &str, key: &str) -> Result<Option<Document>>;

    /// Create or wholly replace the document at `key`.
    async fn set_document(&self, collection: &str, key: &str, document: Document) -> Result<()>;

    /// Overwrite the given top-level fields of an existing document.
    /// Fails with `NotFound` if there is no document at `key`.
    async fn update_fields(&self, collection: &str, key: &str, fields: Document) -> Result<()>;

    /// Remove the document at `key`; removing an absent document succeeds.
    async fn delete_document(&self, collection: &str, key: &str) -> Result<()>;

    /// Store a document under a key chosen by the store, returning the key.
    async fn add_document(&self, collection: &str, document: Document) -> Result<String>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<(String, Document)>>;

    /// Listen to a key or a query. The current snapshot is delivered first,
    /// then one snapshot per observed change, until cancelled.
    async fn subscribe(&self, collection: &str, target: Target) -> Result<Subscription>;
}

/// Path of a sub-collection nested under one document.
pub fn subcollection(collection: &str, key: &str, name: &str) -> String {
    format!("{collection}/{key}/{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subcollection_paths() {
        assert_eq!(subcollection("users", "u1", "drafts"), "users/u1/drafts");
    }
}
