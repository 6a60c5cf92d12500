use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{encode_color, encode_list, encode_strings, Codec, Fields};
use crate::doc;
use crate::document::{Document, Value};
use crate::error::DecodeError;
use crate::types::{triple_id, Color};

/// A snapshot of a user's public identity, embedded in chats, messages and
/// post mentions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMember {
    pub uuid: String,
    pub user_id: String,
    pub emoji: String,
    pub color: Color,
}

impl ChatMember {
    pub fn new(user_id: impl Into<String>, emoji: impl Into<String>, color: Color) -> Self {
        Self {
            uuid: triple_id(),
            user_id: user_id.into(),
            emoji: emoji.into(),
            color,
        }
    }
}

impl Codec for ChatMember {
    fn encode(&self) -> Document {
        doc! {
            "UUID" => self.uuid.clone(),
            "userID" => self.user_id.clone(),
            "emoji" => self.emoji.clone(),
            "color" => encode_color(&self.color),
        }
    }

    fn decode(doc: &Document) -> Result<Self, DecodeError> {
        let f = Fields::new(doc);
        Ok(Self {
            uuid: f.string("UUID")?,
            user_id: f.string("userID")?,
            emoji: f.string("emoji")?,
            color: f.color("color")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub uuid: String,
    pub sender: ChatMember,
    pub text: String,
    pub time_sent: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: ChatMember, text: impl Into<String>, time_sent: DateTime<Utc>) -> Self {
        Self {
            uuid: triple_id(),
            sender,
            text: text.into(),
            time_sent,
        }
    }
}

impl Codec for Message {
    fn encode(&self) -> Document {
        doc! {
            "UUID" => self.uuid.clone(),
            "sender" => self.sender.encode(),
            "text" => self.text.clone(),
            "timeSent" => self.time_sent,
        }
    }

    fn decode(doc: &Document) -> Result<Self, DecodeError> {
        let f = Fields::new(doc);
        Ok(Self {
            uuid: f.string("UUID")?,
            sender: f.entity("sender")?,
            text: f.string("text")?,
            time_sent: f.timestamp("timeSent")?,
        })
    }
}

/// A group conversation.
///
/// Members are persisted as three index-aligned arrays; member `i` is
/// `(member_ids[i], member_emojis[i], member_colors[i])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub uuid: String,
    pub member_ids: Vec<String>,
    pub member_emojis: Vec<String>,
    pub member_colors: Vec<Color>,
    pub messages: Vec<Message>,
    pub date_created: DateTime<Utc>,
}

impl Chat {
    pub fn new(members: &[ChatMember], date_created: DateTime<Utc>) -> Self {
        let mut chat = Self {
            uuid: triple_id(),
            member_ids: Vec::new(),
            member_emojis: Vec::new(),
            member_colors: Vec::new(),
            messages: Vec::new(),
            date_created,
        };
        for m in members {
            chat.add_member(m);
        }
        chat
    }

    /// Reassemble member `i` from the parallel arrays.
    pub fn member(&self, index: usize) -> Option<ChatMember> {
        Some(ChatMember {
            uuid: self.member_ids.get(index)?.clone(),
            user_id: self.member_ids.get(index)?.clone(),
            emoji: self.member_emojis.get(index)?.clone(),
            color: *self.member_colors.get(index)?,
        })
    }

    pub fn members(&self) -> Vec<ChatMember> {
        (0..self.member_ids.len())
            .filter_map(|i| self.member(i))
            .collect()
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|id| id == user_id)
    }

    /// Append a member unless already present. Returns whether it was added.
    pub fn add_member(&mut self, member: &ChatMember) -> bool {
        if self.is_member(&member.user_id) {
            return false;
        }
        self.member_ids.push(member.user_id.clone());
        self.member_emojis.push(member.emoji.clone());
        self.member_colors.push(member.color);
        true
    }
}

impl Codec for Chat {
    fn encode(&self) -> Document {
        doc! {
            "UUID" => self.uuid.clone(),
            "memberIDs" => encode_strings(&self.member_ids),
            "memberEmojis" => encode_strings(&self.member_emojis),
            "memberColors" => Value::Array(self.member_colors.iter().map(encode_color).collect()),
            "messages" => encode_list(&self.messages),
            "dateCreated" => self.date_created,
        }
    }

    fn decode(doc: &Document) -> Result<Self, DecodeError> {
        let f = Fields::new(doc);
        let member_ids = f.strings("memberIDs")?;
        let member_emojis = f.strings("memberEmojis")?;
        let member_colors = f.colors("memberColors")?;
        if member_emojis.len() != member_ids.len() || member_colors.len() != member_ids.len() {
            return Err(DecodeError::Invalid {
                field: "memberIDs".to_string(),
                reason: format!(
                    "member arrays are not aligned ({} ids, {} emojis, {} colors)",
                    member_ids.len(),
                    member_emojis.len(),
                    member_colors.len()
                ),
            });
        }
        Ok(Self {
            uuid: f.string("UUID")?,
            member_ids,
            member_emojis,
            member_colors,
            messages: f.list("messages")?,
            date_created: f.timestamp("dateCreated")?,
        })
    }
}
