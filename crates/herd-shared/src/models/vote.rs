use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{Codec, Fields};
use crate::doc;
use crate::document::Document;
use crate::error::{DecodeError, TreeError};
use crate::types::triple_id;

/// One user's vote on a post or comment. Posts key votes by voter UUID, so a
/// voter holds at most one vote per node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub uuid: String,
    pub voter_uuid: String,
    /// -1, 0 (retracted) or +1.
    pub value: i8,
    pub time_posted: DateTime<Utc>,
}

impl Vote {
    pub fn new(
        voter_uuid: impl Into<String>,
        value: i8,
        time_posted: DateTime<Utc>,
    ) -> Result<Self, TreeError> {
        if !(-1..=1).contains(&value) {
            return Err(TreeError::VoteValue { value });
        }
        Ok(Self {
            uuid: triple_id(),
            voter_uuid: voter_uuid.into(),
            value,
            time_posted,
        })
    }
}

impl Codec for Vote {
    fn encode(&self) -> Document {
        doc! {
            "UUID" => self.uuid.clone(),
            "voterUUID" => self.voter_uuid.clone(),
            "value" => i64::from(self.value),
            "timePosted" => self.time_posted,
        }
    }

    fn decode(doc: &Document) -> Result<Self, DecodeError> {
        let f = Fields::new(doc);
        let raw = f.i64("value")?;
        let value = match raw {
            -1..=1 => raw as i8,
            other => {
                return Err(DecodeError::Invalid {
                    field: "value".to_string(),
                    reason: format!("vote value {other} is not -1, 0 or 1"),
                })
            }
        };
        Ok(Self {
            uuid: f.string("UUID")?,
            voter_uuid: f.string("voterUUID")?,
            value,
            time_posted: f.timestamp("timePosted")?,
        })
    }
}
