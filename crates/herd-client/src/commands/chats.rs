//! Direct and group chats.

use chrono::Utc;
use herd_shared::{Chat, ChatMember, Message};
use herd_store::{Direction, Filter, Operation, Query, Result, StoreError};
use tracing::info;

use super::{ensure_writable, FailOperation};
use crate::state::Session;

/// Start a chat between the user and `others`.
pub async fn create_chat(session: &Session, others: &[ChatMember], op: &Operation) -> Result<Chat> {
    ensure_writable(session, op).await?;
    let me = session.current_user().await.or_fail(op)?;
    let mut members = vec![me.as_member()];
    members.extend_from_slice(others);

    let chat = Chat::new(&members, Utc::now());
    if chat.member_ids.len() < 2 {
        return Err::<Chat, _>(StoreError::Rejected("A chat needs someone to talk to.".into())).or_fail(op);
    }
    session.chats.write(&chat, Some(&chat.uuid), op).await?;
    info!(chat = %chat.uuid, members = chat.member_ids.len(), "chat created");
    Ok(chat)
}

/// Append a message to a chat the user belongs to.
pub async fn send_message(session: &Session, chat_uuid: &str, text: &str, op: &Operation) -> Result<Chat> {
    ensure_writable(session, op).await?;
    if text.trim().is_empty() {
        return Err::<Chat, _>(StoreError::Rejected("Messages cannot be empty.".into())).or_fail(op);
    }
    let me = session.current_user().await.or_fail(op)?;
    let mut chat = session.chats.read(chat_uuid).await.or_fail(op)?;
    if !chat.is_member(&me.uuid) {
        return Err::<Chat, _>(StoreError::Rejected("You are not part of this chat.".into())).or_fail(op);
    }

    chat.messages.push(Message::new(me.as_member(), text, Utc::now()));
    session.chats.write(&chat, Some(chat_uuid), op).await?;
    Ok(chat)
}

/// Add `member` to a chat. Adding an existing member writes nothing.
pub async fn add_member(session: &Session, chat_uuid: &str, member: &ChatMember, op: &Operation) -> Result<Chat> {
    ensure_writable(session, op).await?;
    let mut chat = session.chats.read(chat_uuid).await.or_fail(op)?;
    if !chat.is_member(session.user_uuid()) {
        return Err::<Chat, _>(StoreError::Rejected("You are not part of this chat.".into())).or_fail(op);
    }
    if chat.add_member(member) {
        session.chats.write(&chat, Some(chat_uuid), op).await?;
    } else {
        op.track(async { Ok(()) }).await?;
    }
    Ok(chat)
}

/// Chats the user belongs to and has not hidden, newest first.
pub async fn my_chats(session: &Session) -> Result<Vec<Chat>> {
    let me = session.current_user().await?;
    let query = Query::all()
        .filter(Filter::array_contains("memberIDs", me.uuid.as_str()))
        .order_by("dateCreated", Direction::Descending);
    let chats = session.chats.read_collection(&query).await?;
    Ok(chats
        .into_iter()
        .filter(|c| !me.hidden_chat_ids.contains(&c.uuid))
        .collect())
}

/// Mirror one chat into the session's chat reconciler.
pub fn watch_chat(session: &Session, chat_uuid: &str) {
    session.open_chats.watch_document(&session.chats, chat_uuid);
}

/// Stop mirroring a chat, e.g. when its view closes.
pub fn close_chat(session: &Session, chat_uuid: &str) -> bool {
    session.open_chats.detach(chat_uuid)
}
