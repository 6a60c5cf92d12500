//! Saved posts, recorded at `posts/{post}/saved/{user}`.

use chrono::Utc;
use herd_shared::SavedPostRecord;
use herd_store::{Operation, Result};

use super::{ensure_writable, FailOperation};
use crate::state::Session;

pub async fn save_post(session: &Session, post_uuid: &str, op: &Operation) -> Result<SavedPostRecord> {
    ensure_writable(session, op).await?;
    // The post must still exist.
    session.posts.read(post_uuid).await.or_fail(op)?;

    let record = SavedPostRecord::new(session.user_uuid(), post_uuid, Utc::now());
    session
        .saved_records(post_uuid)
        .write(&record, Some(session.user_uuid()), op)
        .await?;
    Ok(record)
}

pub async fn unsave_post(session: &Session, post_uuid: &str, op: &Operation) -> Result<()> {
    ensure_writable(session, op).await?;
    session
        .saved_records(post_uuid)
        .delete(session.user_uuid(), op)
        .await
}

pub async fn is_saved(session: &Session, post_uuid: &str) -> Result<bool> {
    Ok(session
        .saved_records(post_uuid)
        .try_read(session.user_uuid())
        .await?
        .is_some())
}
