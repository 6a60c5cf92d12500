use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{encode_color, encode_list, encode_map, encode_strings, Codec, Fields};
use crate::constants::{MAX_COMMENT_LENGTH, MAX_COMMENT_LEVEL, MAX_POST_LENGTH};
use crate::doc;
use crate::document::{Document, Value};
use crate::error::{DecodeError, TreeError};
use crate::models::{ChatMember, User, Vote};
use crate::types::{triple_id, Color, GeoPoint};

/// A top-level post or a comment; comments are posts nested in `comments`.
///
/// The author fields are a snapshot taken at posting time and are never
/// re-resolved, so later identity changes do not rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub uuid: String,
    pub author_uuid: String,
    pub author_emoji: String,
    pub author_color: Color,
    pub text: String,
    /// Voter UUID to that voter's vote.
    pub votes: BTreeMap<String, Vote>,
    /// 0 for a post, 1 for a reply to it, 2 for a reply to a reply.
    pub comment_level: u8,
    pub comments: Vec<Post>,
    pub time_posted: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub mentions: Vec<ChatMember>,
    pub repost: Option<Box<Post>>,
    /// User UUID to the number shown in place of their emoji on this thread.
    pub anonymous_identifier_table: BTreeMap<String, i64>,
    /// Everyone who has replied anywhere in this thread.
    pub associated_user_ids: Vec<String>,
}

/// Check a body against the limit for its comment level.
pub fn validate_text(text: &str, comment_level: u8) -> Result<(), TreeError> {
    let max = if comment_level == 0 {
        MAX_POST_LENGTH
    } else {
        MAX_COMMENT_LENGTH
    };
    let len = text.chars().count();
    if len == 0 || len > max {
        return Err(TreeError::TextLength { len, max });
    }
    Ok(())
}

impl Post {
    /// A new top-level post, upvoted by its author.
    pub fn new(
        author: &User,
        text: impl Into<String>,
        at: GeoPoint,
        now: DateTime<Utc>,
    ) -> Result<Self, TreeError> {
        Self::authored(author, text.into(), 0, at, now)
    }

    /// A new comment to be attached beneath a node at `parent_level`.
    pub fn new_reply(
        author: &User,
        text: impl Into<String>,
        parent_level: u8,
        now: DateTime<Utc>,
    ) -> Result<Self, TreeError> {
        if parent_level >= MAX_COMMENT_LEVEL {
            return Err(TreeError::TooDeep {
                level: parent_level,
            });
        }
        Self::authored(author, text.into(), parent_level + 1, GeoPoint::default(), now)
    }

    fn authored(
        author: &User,
        text: String,
        comment_level: u8,
        at: GeoPoint,
        now: DateTime<Utc>,
    ) -> Result<Self, TreeError> {
        validate_text(&text, comment_level)?;
        let mut votes = BTreeMap::new();
        votes.insert(author.uuid.clone(), Vote::new(author.uuid.clone(), 1, now)?);
        Ok(Self {
            uuid: triple_id(),
            author_uuid: author.uuid.clone(),
            author_emoji: author.emoji.clone(),
            author_color: author.color,
            text,
            votes,
            comment_level,
            comments: Vec::new(),
            time_posted: now,
            latitude: at.latitude,
            longitude: at.longitude,
            mentions: Vec::new(),
            repost: None,
            anonymous_identifier_table: BTreeMap::new(),
            associated_user_ids: Vec::new(),
        })
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Sum of every vote value on this node (children not included).
    pub fn score(&self) -> i64 {
        self.votes.values().map(|v| i64::from(v.value)).sum()
    }

    /// The caller's current vote value on this node, 0 if none.
    pub fn vote_of(&self, user_uuid: &str) -> i8 {
        self.votes.get(user_uuid).map(|v| v.value).unwrap_or(0)
    }
}

impl Codec for Post {
    fn encode(&self) -> Document {
        doc! {
            "UUID" => self.uuid.clone(),
            "authorUUID" => self.author_uuid.clone(),
            "authorEmoji" => self.author_emoji.clone(),
            "authorColor" => encode_color(&self.author_color),
            "text" => self.text.clone(),
            "votes" => encode_map(&self.votes),
            "commentLevel" => i64::from(self.comment_level),
            "comments" => encode_list(&self.comments),
            "timePosted" => self.time_posted,
            "latitude" => self.latitude,
            "longitude" => self.longitude,
            "mentions" => encode_list(&self.mentions),
            "repost" => Value::Array(
                self.repost.iter().map(|p| Value::Map(p.encode())).collect()
            ),
            "anonymousIdentifierTable" => Value::Map(
                self.anonymous_identifier_table
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::Integer(*v)))
                    .collect()
            ),
            "associatedUserIDs" => encode_strings(&self.associated_user_ids),
        }
    }

    fn decode(doc: &Document) -> Result<Self, DecodeError> {
        let f = Fields::new(doc);

        let raw_level = f.i64("commentLevel")?;
        let comment_level = u8::try_from(raw_level)
            .ok()
            .filter(|l| *l <= MAX_COMMENT_LEVEL)
            .ok_or_else(|| DecodeError::Invalid {
                field: "commentLevel".to_string(),
                reason: format!("level {raw_level} is outside 0..={MAX_COMMENT_LEVEL}"),
            })?;

        let comments: Vec<Post> = f.list("comments")?;
        for (i, child) in comments.iter().enumerate() {
            if child.comment_level != comment_level + 1 {
                return Err(DecodeError::Invalid {
                    field: format!("comments[{i}].commentLevel"),
                    reason: TreeError::LevelMismatch {
                        expected: comment_level + 1,
                        found: child.comment_level,
                    }
                    .to_string(),
                });
            }
        }

        let votes: BTreeMap<String, Vote> = f.map("votes")?;
        if let Some((key, vote)) = votes.iter().find(|(k, v)| **k != v.voter_uuid) {
            return Err(DecodeError::Invalid {
                field: format!("votes.{key}"),
                reason: format!("keyed by {key} but cast by {}", vote.voter_uuid),
            });
        }

        let mut reposts: Vec<Post> = f.opt_list("repost")?;
        if reposts.len() > 1 {
            return Err(DecodeError::Invalid {
                field: "repost".to_string(),
                reason: format!("at most one repost allowed, found {}", reposts.len()),
            });
        }

        Ok(Self {
            uuid: f.string("UUID")?,
            author_uuid: f.string("authorUUID")?,
            author_emoji: f.string("authorEmoji")?,
            author_color: f.color("authorColor")?,
            text: f.string("text")?,
            votes,
            comment_level,
            comments,
            time_posted: f.timestamp("timePosted")?,
            latitude: f.f64("latitude")?,
            longitude: f.f64("longitude")?,
            mentions: f.opt_list("mentions")?,
            repost: reposts.pop().map(Box::new),
            anonymous_identifier_table: f.opt_int_map("anonymousIdentifierTable")?,
            associated_user_ids: f.opt_strings("associatedUserIDs")?,
        })
    }
}
