use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{encode_list, Codec, Fields};
use crate::doc;
use crate::document::{Document, Value};
use crate::error::DecodeError;
use crate::models::{ChatMember, Post};
use crate::types::triple_id;

/// An unsent post kept under `users/{author}/drafts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub uuid: String,
    pub text: String,
    pub date_created: DateTime<Utc>,
    pub author_uuid: String,
    pub repost: Option<Box<Post>>,
    pub mentions: Vec<ChatMember>,
}

impl Draft {
    pub fn new(author_uuid: impl Into<String>, text: impl Into<String>, date_created: DateTime<Utc>) -> Self {
        Self {
            uuid: triple_id(),
            text: text.into(),
            date_created,
            author_uuid: author_uuid.into(),
            repost: None,
            mentions: Vec::new(),
        }
    }
}

impl Codec for Draft {
    fn encode(&self) -> Document {
        doc! {
            "UUID" => self.uuid.clone(),
            "text" => self.text.clone(),
            "dateCreated" => self.date_created,
            "authorUUID" => self.author_uuid.clone(),
            "repost" => Value::Array(
                self.repost.iter().map(|p| Value::Map(p.encode())).collect()
            ),
            "mentions" => encode_list(&self.mentions),
        }
    }

    fn decode(doc: &Document) -> Result<Self, DecodeError> {
        let f = Fields::new(doc);
        let mut reposts: Vec<Post> = f.opt_list("repost")?;
        if reposts.len() > 1 {
            return Err(DecodeError::Invalid {
                field: "repost".to_string(),
                reason: format!("at most one repost allowed, found {}", reposts.len()),
            });
        }
        Ok(Self {
            uuid: f.string("UUID")?,
            text: f.string("text")?,
            date_created: f.timestamp("dateCreated")?,
            author_uuid: f.string("authorUUID")?,
            repost: reposts.pop().map(Box::new),
            mentions: f.opt_list("mentions")?,
        })
    }
}
