use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{encode_color, encode_map, encode_strings, Codec, Fields};
use crate::doc;
use crate::document::Document;
use crate::error::DecodeError;
use crate::models::{Address, BlockRecord, ChatMember, SavedLocation};
use crate::types::{triple_id, Color, FontPreference, GeoPoint, LocationMode};

/// A signed-in user's profile, stored at `users/{uuid}`.
///
/// All embedded maps and lists are owned outright by the profile and are
/// rewritten as a whole whenever one entry changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub uuid: String,
    pub emoji: String,
    pub color: Color,
    pub join_date: DateTime<Utc>,
    /// Contact user UUID to address-book entry.
    pub addresses: BTreeMap<String, Address>,
    pub blocked_user_ids: Vec<String>,
    /// Blocked user UUID to what they looked like when blocked.
    pub block_details: BTreeMap<String, BlockRecord>,
    /// Saved location UUID to location.
    pub saved_locations: BTreeMap<String, SavedLocation>,
    pub location_mode: LocationMode,
    pub hidden_chat_ids: Vec<String>,
    pub font_preference: FontPreference,
}

impl User {
    pub fn new(emoji: impl Into<String>, color: Color, join_date: DateTime<Utc>) -> Self {
        Self {
            uuid: triple_id(),
            emoji: emoji.into(),
            color,
            join_date,
            addresses: BTreeMap::new(),
            blocked_user_ids: Vec::new(),
            block_details: BTreeMap::new(),
            saved_locations: BTreeMap::new(),
            location_mode: LocationMode::Current,
            hidden_chat_ids: Vec::new(),
            font_preference: FontPreference::Regular,
        }
    }

    pub fn is_blocked(&self, user_uuid: &str) -> bool {
        self.blocked_user_ids.iter().any(|id| id == user_uuid)
    }

    pub fn as_member(&self) -> ChatMember {
        ChatMember::new(self.uuid.clone(), self.emoji.clone(), self.color)
    }

    /// Feed centre: the selected saved location, or `device` when the mode
    /// is `Current` or the saved location no longer exists.
    pub fn effective_location(&self, device: Option<GeoPoint>) -> Option<GeoPoint> {
        match &self.location_mode {
            LocationMode::Current => device,
            LocationMode::Saved(id) => self
                .saved_locations
                .get(id)
                .map(SavedLocation::point)
                .or(device),
        }
    }
}

impl Codec for User {
    fn encode(&self) -> Document {
        doc! {
            "UUID" => self.uuid.clone(),
            "emoji" => self.emoji.clone(),
            "color" => encode_color(&self.color),
            "joinDate" => self.join_date,
            "addresses" => encode_map(&self.addresses),
            "blockedUserIDs" => encode_strings(&self.blocked_user_ids),
            "blockDetails" => encode_map(&self.block_details),
            "savedLocations" => encode_map(&self.saved_locations),
            "locationMode" => self.location_mode.encode(),
            "hiddenChatIDs" => encode_strings(&self.hidden_chat_ids),
            "fontPreference" => self.font_preference.as_str(),
        }
    }

    fn decode(doc: &Document) -> Result<Self, DecodeError> {
        let f = Fields::new(doc);
        Ok(Self {
            uuid: f.string("UUID")?,
            emoji: f.string("emoji")?,
            color: f.color("color")?,
            join_date: f.timestamp("joinDate")?,
            addresses: f.map("addresses")?,
            blocked_user_ids: f.strings("blockedUserIDs")?,
            block_details: f.opt_map("blockDetails")?,
            saved_locations: f.map("savedLocations")?,
            location_mode: LocationMode::decode(&f.string("locationMode")?),
            hidden_chat_ids: f.opt_strings("hiddenChatIDs")?,
            font_preference: FontPreference::from_name(&f.string("fontPreference")?),
        })
    }
}
