//! Domain entities and their document codecs.
//!
//! Field names in the encoded documents are part of the on-store format and
//! are shared with other clients; they must not be renamed.

mod chat;
mod draft;
mod post;
mod records;
mod status;
mod user;
mod vote;

pub use chat::{Chat, ChatMember, Message};
pub use draft::Draft;
pub use post::{validate_text, Post};
pub use records::{random_nickname, Address, BlockRecord, SavedLocation, SavedPostRecord};
pub use status::SystemStatus;
pub use user::User;
pub use vote::Vote;
