use crate::codec::{Codec, Fields};
use crate::constants::STATUS_OPERATIONAL;
use crate::doc;
use crate::document::Document;
use crate::error::DecodeError;

/// The read-only `system/status` document gating overall availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemStatus {
    pub code: i64,
}

impl SystemStatus {
    pub fn is_operational(&self) -> bool {
        self.code == STATUS_OPERATIONAL
    }
}

impl Codec for SystemStatus {
    fn encode(&self) -> Document {
        doc! { "code" => self.code }
    }

    fn decode(doc: &Document) -> Result<Self, DecodeError> {
        Ok(Self {
            code: Fields::new(doc).i64("code")?,
        })
    }
}
