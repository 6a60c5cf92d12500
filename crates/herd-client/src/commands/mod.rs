//! Commands the app issues on behalf of the signed-in user.
//!
//! Each sub-module groups related commands by domain. Mutating commands take
//! a caller-owned [`Operation`] and leave it in `Success` or `Failure`, even
//! when they fail before reaching the store (unavailable service, invalid
//! text, missing document). Writes are whole-document read-modify-write; a
//! concurrent writer on the same document can overwrite the change.

pub mod chats;
pub mod drafts;
pub mod posts;
pub mod profile;
pub mod saved;
pub mod status;

use herd_store::{Operation, Result, StoreError};

use crate::state::Session;

/// Record a failure that happened before the remote call was issued.
pub(crate) trait FailOperation<T> {
    fn or_fail(self, op: &Operation) -> Result<T>;
}

impl<T, E: Into<StoreError>> FailOperation<T> for std::result::Result<T, E> {
    fn or_fail(self, op: &Operation) -> Result<T> {
        self.map_err(|e| {
            let e = e.into();
            tracing::warn!(error = %e, "command rejected");
            if op.begin().is_ok() {
                let _ = op.fail(e.user_message());
            }
            e
        })
    }
}

/// Gate a mutation on service availability.
pub(crate) async fn ensure_writable(session: &Session, op: &Operation) -> Result<()> {
    session.ensure_available().await.or_fail(op)
}
