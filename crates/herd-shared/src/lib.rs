//! # herd-shared
//!
//! Entities, the generic [`Document`] representation they are stored as,
//! their codecs, and the comment tree algorithms. Nothing in this crate does
//! I/O.

pub mod codec;
pub mod constants;
pub mod document;
pub mod error;
pub mod models;
pub mod tree;
pub mod types;

pub use codec::{Codec, Fields};
pub use document::{Document, Value};
pub use error::{DecodeError, TreeError};
pub use models::*;
pub use tree::{NodeId, Thread};
pub use types::{triple_id, Color, FontPreference, GeoPoint, LocationMode};
