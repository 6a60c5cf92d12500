//! The read-only `system/status` document.

use futures::stream::{BoxStream, StreamExt};
use herd_shared::constants::{STATUS_DOCUMENT, STATUS_OPERATIONAL};
use herd_shared::SystemStatus;
use herd_store::Result;

use crate::state::Session;

pub async fn fetch_status(session: &Session) -> Result<SystemStatus> {
    session.status().await
}

/// Live service status. A missing document reads as operational.
pub fn watch_status(session: &Session) -> BoxStream<'static, Result<SystemStatus>> {
    session
        .system
        .watch(STATUS_DOCUMENT)
        .map(|snapshot| {
            Ok(snapshot?.unwrap_or(SystemStatus {
                code: STATUS_OPERATIONAL,
            }))
        })
        .boxed()
}
