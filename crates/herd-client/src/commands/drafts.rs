//! Unsent posts under `users/{me}/drafts`.

use chrono::Utc;
use futures::stream::BoxStream;
use herd_shared::constants::MAX_POST_LENGTH;
use herd_shared::{Draft, TreeError};
use herd_store::{Direction, Operation, Query, Result};

use super::{ensure_writable, FailOperation};
use crate::state::Session;

/// Save `text` as a new draft. Empty drafts are allowed; overlong ones are
/// not, since they could never be posted.
pub async fn save_draft(session: &Session, text: &str, op: &Operation) -> Result<Draft> {
    ensure_writable(session, op).await?;
    let len = text.chars().count();
    if len > MAX_POST_LENGTH {
        return Err::<Draft, _>(TreeError::TextLength {
            len,
            max: MAX_POST_LENGTH,
        })
        .or_fail(op);
    }
    let draft = Draft::new(session.user_uuid(), text, Utc::now());
    session.drafts().write(&draft, Some(&draft.uuid), op).await?;
    Ok(draft)
}

/// Overwrite an existing draft.
pub async fn update_draft(session: &Session, draft: &Draft, op: &Operation) -> Result<()> {
    ensure_writable(session, op).await?;
    session.drafts().write(draft, Some(&draft.uuid), op).await?;
    Ok(())
}

pub async fn delete_draft(session: &Session, draft_uuid: &str, op: &Operation) -> Result<()> {
    ensure_writable(session, op).await?;
    session.drafts().delete(draft_uuid, op).await
}

fn newest_first() -> Query {
    Query::all().order_by("dateCreated", Direction::Descending)
}

pub async fn list_drafts(session: &Session) -> Result<Vec<Draft>> {
    session.drafts().read_collection(&newest_first()).await
}

pub fn watch_drafts(session: &Session) -> BoxStream<'static, Result<Vec<Draft>>> {
    session.drafts().watch_query(newest_first())
}
