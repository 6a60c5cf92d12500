//! Profile edits for the signed-in user.
//!
//! Every edit reads the whole profile, changes it, and writes it back
//! optimistically through the profile reconciler: the new value shows up
//! locally at once and is rolled back if the write fails.

use chrono::Utc;
use herd_shared::{
    Address, BlockRecord, Color, FontPreference, GeoPoint, LocationMode, SavedLocation, User,
};
use herd_store::{Operation, Result, StoreError};
use tracing::{debug, info};

use super::{ensure_writable, FailOperation};
use crate::state::Session;

/// Store the session's user profile for the first time.
pub async fn register(session: &Session, user: &User, op: &Operation) -> Result<()> {
    if user.uuid != session.user_uuid() {
        return Err::<(), _>(StoreError::Rejected(
            "A session can only register its own profile.".into(),
        ))
        .or_fail(op);
    }
    ensure_writable(session, op).await?;
    session
        .profiles
        .optimistic(
            &user.uuid,
            user.clone(),
            session.users.write(user, Some(&user.uuid), op),
        )
        .await?;
    info!(user = %user.uuid, "profile registered");
    Ok(())
}

/// Read-modify-write the profile. `edit` may refuse the change.
async fn edit_profile<F>(session: &Session, op: &Operation, edit: F) -> Result<User>
where
    F: FnOnce(&mut User) -> Result<()>,
{
    ensure_writable(session, op).await?;
    let mut user = session.users.read(session.user_uuid()).await.or_fail(op)?;
    edit(&mut user).or_fail(op)?;

    session
        .profiles
        .optimistic(
            &user.uuid,
            user.clone(),
            session.users.write(&user, Some(&user.uuid), op),
        )
        .await?;
    debug!(user = %user.uuid, "profile updated");
    Ok(user)
}

pub async fn change_identity(session: &Session, emoji: &str, color: Color, op: &Operation) -> Result<User> {
    if emoji.trim().is_empty() {
        return Err::<User, _>(StoreError::Rejected("Pick an emoji.".into())).or_fail(op);
    }
    edit_profile(session, op, |user| {
        user.emoji = emoji.to_string();
        user.color = color;
        Ok(())
    })
    .await
}

/// Add `contact` to the address book under a random nickname.
pub async fn add_address(session: &Session, contact: &User, op: &Operation) -> Result<Address> {
    let address = Address::new(contact.uuid.clone(), contact.emoji.clone(), contact.color);
    let entry = address.clone();
    edit_profile(session, op, move |user| {
        user.addresses.insert(entry.user_uuid.clone(), entry);
        Ok(())
    })
    .await?;
    Ok(address)
}

/// Rename an address-book entry and set its note.
pub async fn edit_address(
    session: &Session,
    contact_uuid: &str,
    nickname: &str,
    comment: &str,
    op: &Operation,
) -> Result<User> {
    edit_profile(session, op, |user| {
        let entry = user
            .addresses
            .get_mut(contact_uuid)
            .ok_or_else(|| StoreError::Rejected("That contact is not in your address book.".into()))?;
        entry.nickname = nickname.to_string();
        entry.comment = comment.to_string();
        Ok(())
    })
    .await
}

pub async fn remove_address(session: &Session, contact_uuid: &str, op: &Operation) -> Result<User> {
    edit_profile(session, op, |user| {
        user.addresses.remove(contact_uuid);
        Ok(())
    })
    .await
}

/// Block `other`, remembering how they looked at the time.
pub async fn block(session: &Session, other: &User, op: &Operation) -> Result<User> {
    if other.uuid == session.user_uuid() {
        return Err::<User, _>(StoreError::Rejected("You cannot block yourself.".into())).or_fail(op);
    }
    let record = BlockRecord::new(other.uuid.clone(), other.emoji.clone(), other.color, Utc::now());
    edit_profile(session, op, move |user| {
        if !user.is_blocked(&record.user_uuid) {
            user.blocked_user_ids.push(record.user_uuid.clone());
        }
        user.block_details.insert(record.user_uuid.clone(), record);
        Ok(())
    })
    .await
}

pub async fn unblock(session: &Session, other_uuid: &str, op: &Operation) -> Result<User> {
    edit_profile(session, op, |user| {
        user.blocked_user_ids.retain(|id| id != other_uuid);
        user.block_details.remove(other_uuid);
        Ok(())
    })
    .await
}

pub async fn add_saved_location(
    session: &Session,
    emoji: &str,
    nickname: &str,
    at: GeoPoint,
    op: &Operation,
) -> Result<SavedLocation> {
    let location = SavedLocation::new(emoji, nickname, at);
    let entry = location.clone();
    edit_profile(session, op, move |user| {
        user.saved_locations.insert(entry.uuid.clone(), entry);
        Ok(())
    })
    .await?;
    Ok(location)
}

/// Removing the selected location switches the feed back to the device's.
pub async fn remove_saved_location(session: &Session, location_uuid: &str, op: &Operation) -> Result<User> {
    edit_profile(session, op, |user| {
        user.saved_locations.remove(location_uuid);
        if user.location_mode == LocationMode::Saved(location_uuid.to_string()) {
            user.location_mode = LocationMode::Current;
        }
        Ok(())
    })
    .await
}

pub async fn set_location_mode(session: &Session, mode: LocationMode, op: &Operation) -> Result<User> {
    edit_profile(session, op, |user| {
        if let LocationMode::Saved(id) = &mode {
            if !user.saved_locations.contains_key(id) {
                return Err(StoreError::Rejected("That saved location no longer exists.".into()));
            }
        }
        user.location_mode = mode;
        Ok(())
    })
    .await
}

pub async fn hide_chat(session: &Session, chat_uuid: &str, op: &Operation) -> Result<User> {
    edit_profile(session, op, |user| {
        if !user.hidden_chat_ids.iter().any(|id| id == chat_uuid) {
            user.hidden_chat_ids.push(chat_uuid.to_string());
        }
        Ok(())
    })
    .await
}

pub async fn restore_chat(session: &Session, chat_uuid: &str, op: &Operation) -> Result<User> {
    edit_profile(session, op, |user| {
        user.hidden_chat_ids.retain(|id| id != chat_uuid);
        Ok(())
    })
    .await
}

pub async fn set_font_preference(session: &Session, font: FontPreference, op: &Operation) -> Result<User> {
    edit_profile(session, op, |user| {
        user.font_preference = font;
        Ok(())
    })
    .await
}
