//! Bidirectional mapping between typed entities and [`Document`]s.
//!
//! Every entity implements [`Codec`]. Encoding is infallible; decoding goes
//! through [`Fields`], a schema-checking reader that turns a missing key or a
//! value of the wrong shape into a [`DecodeError`] naming the field. Decoders
//! never substitute defaults for required fields.
//!
//! Colours are written as a four-element array of normalised doubles
//! (red, green, blue, alpha). Timestamps are written as the native
//! [`Value::Timestamp`]; on the way back in, the textual fallback
//! [`FALLBACK_TIMESTAMP_FORMAT`] is accepted too.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::constants::FALLBACK_TIMESTAMP_FORMAT;
use crate::document::{Document, Value};
use crate::error::DecodeError;
use crate::types::Color;

pub trait Codec: Sized {
    fn encode(&self) -> Document;
    fn decode(doc: &Document) -> Result<Self, DecodeError>;
}

pub fn encode_color(color: &Color) -> Value {
    Value::Array(color.components().iter().map(|c| Value::Double(*c)).collect())
}

pub fn encode_list<T: Codec>(items: &[T]) -> Value {
    Value::Array(items.iter().map(|i| Value::Map(i.encode())).collect())
}

pub fn encode_map<T: Codec>(items: &BTreeMap<String, T>) -> Value {
    Value::Map(
        items
            .iter()
            .map(|(k, v)| (k.clone(), Value::Map(v.encode())))
            .collect(),
    )
}

pub fn encode_strings<'a>(items: impl IntoIterator<Item = &'a String>) -> Value {
    Value::Array(items.into_iter().map(|s| Value::String(s.clone())).collect())
}

/// Parse a timestamp value: either native, or a string in the fallback format.
pub fn decode_timestamp(value: &Value, field: &str) -> Result<DateTime<Utc>, DecodeError> {
    match value {
        Value::Timestamp(ts) => Ok(*ts),
        Value::String(s) => DateTime::parse_from_str(s, FALLBACK_TIMESTAMP_FORMAT)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DecodeError::Invalid {
                field: field.to_string(),
                reason: format!("unparseable timestamp {s:?}: {e}"),
            }),
        _ => Err(DecodeError::WrongType {
            field: field.to_string(),
            expected: "a timestamp",
        }),
    }
}

pub fn decode_color(value: &Value, field: &str) -> Result<Color, DecodeError> {
    let wrong = || DecodeError::WrongType {
        field: field.to_string(),
        expected: "a 4-element colour array",
    };
    let items = value.as_array().ok_or_else(wrong)?;
    if items.len() != 4 {
        return Err(wrong());
    }
    let mut channels = [0.0; 4];
    for (slot, item) in channels.iter_mut().zip(items) {
        *slot = item.as_f64().ok_or_else(wrong)?;
    }
    Color::from_components(channels).ok_or_else(|| DecodeError::Invalid {
        field: field.to_string(),
        reason: "colour channels must lie in [0, 1]".to_string(),
    })
}

fn decode_nested<T: Codec>(value: &Value, field: &str) -> Result<T, DecodeError> {
    let map = value.as_map().ok_or_else(|| DecodeError::WrongType {
        field: field.to_string(),
        expected: "a map",
    })?;
    T::decode(map).map_err(|e| e.nested(field))
}

/// Schema-checking view over a document being decoded.
pub struct Fields<'a> {
    doc: &'a Document,
}

impl<'a> Fields<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc }
    }

    fn get(&self, key: &str) -> Result<&'a Value, DecodeError> {
        self.doc.get(key).ok_or_else(|| DecodeError::Missing {
            field: key.to_string(),
        })
    }

    /// Absent and explicit `null` are both treated as "not provided".
    fn get_opt(&self, key: &str) -> Option<&'a Value> {
        match self.doc.get(key) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }

    fn wrong(key: &str, expected: &'static str) -> DecodeError {
        DecodeError::WrongType {
            field: key.to_string(),
            expected,
        }
    }

    pub fn string(&self, key: &str) -> Result<String, DecodeError> {
        self.get(key)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Self::wrong(key, "a string"))
    }

    pub fn i64(&self, key: &str) -> Result<i64, DecodeError> {
        self.get(key)?
            .as_i64()
            .ok_or_else(|| Self::wrong(key, "an integer"))
    }

    pub fn f64(&self, key: &str) -> Result<f64, DecodeError> {
        self.get(key)?
            .as_f64()
            .ok_or_else(|| Self::wrong(key, "a number"))
    }

    pub fn timestamp(&self, key: &str) -> Result<DateTime<Utc>, DecodeError> {
        decode_timestamp(self.get(key)?, key)
    }

    pub fn color(&self, key: &str) -> Result<Color, DecodeError> {
        decode_color(self.get(key)?, key)
    }

    pub fn strings(&self, key: &str) -> Result<Vec<String>, DecodeError> {
        Self::strings_of(self.get(key)?, key)
    }

    pub fn opt_strings(&self, key: &str) -> Result<Vec<String>, DecodeError> {
        match self.get_opt(key) {
            Some(v) => Self::strings_of(v, key),
            None => Ok(Vec::new()),
        }
    }

    fn strings_of(value: &Value, key: &str) -> Result<Vec<String>, DecodeError> {
        let items = value
            .as_array()
            .ok_or_else(|| Self::wrong(key, "an array"))?;
        items
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Self::wrong(&format!("{key}[{i}]"), "a string"))
            })
            .collect()
    }

    pub fn colors(&self, key: &str) -> Result<Vec<Color>, DecodeError> {
        let items = self
            .get(key)?
            .as_array()
            .ok_or_else(|| Self::wrong(key, "an array"))?;
        items
            .iter()
            .enumerate()
            .map(|(i, v)| decode_color(v, &format!("{key}[{i}]")))
            .collect()
    }

    pub fn entity<T: Codec>(&self, key: &str) -> Result<T, DecodeError> {
        decode_nested(self.get(key)?, key)
    }

    pub fn list<T: Codec>(&self, key: &str) -> Result<Vec<T>, DecodeError> {
        Self::list_of(self.get(key)?, key)
    }

    pub fn opt_list<T: Codec>(&self, key: &str) -> Result<Vec<T>, DecodeError> {
        match self.get_opt(key) {
            Some(v) => Self::list_of(v, key),
            None => Ok(Vec::new()),
        }
    }

    fn list_of<T: Codec>(value: &Value, key: &str) -> Result<Vec<T>, DecodeError> {
        let items = value
            .as_array()
            .ok_or_else(|| Self::wrong(key, "an array"))?;
        items
            .iter()
            .enumerate()
            .map(|(i, v)| decode_nested(v, &format!("{key}[{i}]")))
            .collect()
    }

    pub fn map<T: Codec>(&self, key: &str) -> Result<BTreeMap<String, T>, DecodeError> {
        Self::map_of(self.get(key)?, key)
    }

    pub fn opt_map<T: Codec>(&self, key: &str) -> Result<BTreeMap<String, T>, DecodeError> {
        match self.get_opt(key) {
            Some(v) => Self::map_of(v, key),
            None => Ok(BTreeMap::new()),
        }
    }

    fn map_of<T: Codec>(value: &Value, key: &str) -> Result<BTreeMap<String, T>, DecodeError> {
        let entries = value.as_map().ok_or_else(|| Self::wrong(key, "a map"))?;
        entries
            .iter()
            .map(|(k, v)| Ok((k.clone(), decode_nested(v, &format!("{key}.{k}"))?)))
            .collect()
    }

    /// A map of string keys to integers (e.g. the anonymous identifier table).
    pub fn opt_int_map(&self, key: &str) -> Result<BTreeMap<String, i64>, DecodeError> {
        let Some(value) = self.get_opt(key) else {
            return Ok(BTreeMap::new());
        };
        let entries = value.as_map().ok_or_else(|| Self::wrong(key, "a map"))?;
        entries
            .iter()
            .map(|(k, v)| {
                v.as_i64()
                    .map(|n| (k.clone(), n))
                    .ok_or_else(|| Self::wrong(&format!("{key}.{k}"), "an integer"))
            })
            .collect()
    }
}
