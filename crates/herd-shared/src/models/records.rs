//! Small keyed records owned by a [`User`](super::User) or a post.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::codec::{encode_color, Codec, Fields};
use crate::doc;
use crate::document::Document;
use crate::error::DecodeError;
use crate::types::{triple_id, Color, GeoPoint};

const NICKNAME_ADJECTIVES: &[&str] = &[
    "Quiet", "Sunny", "Curious", "Brave", "Gentle", "Swift", "Lucky", "Witty",
];
const NICKNAME_NOUNS: &[&str] = &[
    "Otter", "Falcon", "Maple", "Comet", "Badger", "Willow", "Pebble", "Heron",
];

/// An address-book entry pointing at another user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub uuid: String,
    pub user_uuid: String,
    pub user_emoji: String,
    pub user_color: Color,
    pub nickname: String,
    pub comment: String,
}

impl Address {
    /// New entry with a random two-word nickname.
    pub fn new(user_uuid: impl Into<String>, user_emoji: impl Into<String>, user_color: Color) -> Self {
        Self {
            uuid: triple_id(),
            user_uuid: user_uuid.into(),
            user_emoji: user_emoji.into(),
            user_color,
            nickname: random_nickname(),
            comment: String::new(),
        }
    }
}

pub fn random_nickname() -> String {
    let mut rng = rand::thread_rng();
    let adjective = NICKNAME_ADJECTIVES.choose(&mut rng).copied().unwrap_or("Quiet");
    let noun = NICKNAME_NOUNS.choose(&mut rng).copied().unwrap_or("Otter");
    format!("{adjective} {noun}")
}

impl Codec for Address {
    fn encode(&self) -> Document {
        doc! {
            "UUID" => self.uuid.clone(),
            "userUUID" => self.user_uuid.clone(),
            "userEmoji" => self.user_emoji.clone(),
            "userColor" => encode_color(&self.user_color),
            "nickname" => self.nickname.clone(),
            "comment" => self.comment.clone(),
        }
    }

    fn decode(doc: &Document) -> Result<Self, DecodeError> {
        let f = Fields::new(doc);
        Ok(Self {
            uuid: f.string("UUID")?,
            user_uuid: f.string("userUUID")?,
            user_emoji: f.string("userEmoji")?,
            user_color: f.color("userColor")?,
            nickname: f.string("nickname")?,
            comment: f.string("comment")?,
        })
    }
}

/// A named place the feed can be centred on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub uuid: String,
    pub emoji: String,
    pub nickname: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl SavedLocation {
    pub fn new(emoji: impl Into<String>, nickname: impl Into<String>, at: GeoPoint) -> Self {
        Self {
            uuid: triple_id(),
            emoji: emoji.into(),
            nickname: nickname.into(),
            latitude: at.latitude,
            longitude: at.longitude,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

impl Codec for SavedLocation {
    fn encode(&self) -> Document {
        doc! {
            "UUID" => self.uuid.clone(),
            "emoji" => self.emoji.clone(),
            "nickname" => self.nickname.clone(),
            "latitude" => self.latitude,
            "longitude" => self.longitude,
        }
    }

    fn decode(doc: &Document) -> Result<Self, DecodeError> {
        let f = Fields::new(doc);
        Ok(Self {
            uuid: f.string("UUID")?,
            emoji: f.string("emoji")?,
            nickname: f.string("nickname")?,
            latitude: f.f64("latitude")?,
            longitude: f.f64("longitude")?,
        })
    }
}

/// Marks a post as bookmarked by a user; stored at `posts/{post}/saved/{user}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPostRecord {
    pub uuid: String,
    pub user_uuid: String,
    pub post_uuid: String,
    pub date_saved: DateTime<Utc>,
}

impl SavedPostRecord {
    pub fn new(user_uuid: impl Into<String>, post_uuid: impl Into<String>, date_saved: DateTime<Utc>) -> Self {
        Self {
            uuid: triple_id(),
            user_uuid: user_uuid.into(),
            post_uuid: post_uuid.into(),
            date_saved,
        }
    }
}

impl Codec for SavedPostRecord {
    fn encode(&self) -> Document {
        doc! {
            "UUID" => self.uuid.clone(),
            "userUUID" => self.user_uuid.clone(),
            "postUUID" => self.post_uuid.clone(),
            "dateSaved" => self.date_saved,
        }
    }

    fn decode(doc: &Document) -> Result<Self, DecodeError> {
        let f = Fields::new(doc);
        Ok(Self {
            uuid: f.string("UUID")?,
            user_uuid: f.string("userUUID")?,
            post_uuid: f.string("postUUID")?,
            date_saved: f.timestamp("dateSaved")?,
        })
    }
}

/// What the blocker saw of the blocked user at block time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub uuid: String,
    pub user_uuid: String,
    pub user_emoji: String,
    pub user_color: Color,
    pub date_blocked: DateTime<Utc>,
}

impl BlockRecord {
    pub fn new(
        user_uuid: impl Into<String>,
        user_emoji: impl Into<String>,
        user_color: Color,
        date_blocked: DateTime<Utc>,
    ) -> Self {
        Self {
            uuid: triple_id(),
            user_uuid: user_uuid.into(),
            user_emoji: user_emoji.into(),
            user_color,
            date_blocked,
        }
    }
}

impl Codec for BlockRecord {
    fn encode(&self) -> Document {
        doc! {
            "UUID" => self.uuid.clone(),
            "userUUID" => self.user_uuid.clone(),
            "userEmoji" => self.user_emoji.clone(),
            "userColor" => encode_color(&self.user_color),
            "dateBlocked" => self.date_blocked,
        }
    }

    fn decode(doc: &Document) -> Result<Self, DecodeError> {
        let f = Fields::new(doc);
        Ok(Self {
            uuid: f.string("UUID")?,
            user_uuid: f.string("userUUID")?,
            user_emoji: f.string("userEmoji")?,
            user_color: f.color("userColor")?,
            date_blocked: f.timestamp("dateBlocked")?,
        })
    }
}
