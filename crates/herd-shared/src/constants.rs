/// Application name
pub const APP_NAME: &str = "The Herd";

/// Top-level collection holding user profiles
pub const USERS_COLLECTION: &str = "users";

/// Top-level collection holding posts (with their comment trees embedded)
pub const POSTS_COLLECTION: &str = "posts";

/// Top-level collection holding chats
pub const CHATS_COLLECTION: &str = "chats";

/// Per-user sub-collection holding drafts (`users/{uuid}/drafts`)
pub const DRAFTS_SUBCOLLECTION: &str = "drafts";

/// Per-post sub-collection holding save records (`posts/{uuid}/saved`)
pub const SAVED_SUBCOLLECTION: &str = "saved";

/// Collection holding service-wide documents
pub const SYSTEM_COLLECTION: &str = "system";

/// Key of the read-only availability document inside `system`
pub const STATUS_DOCUMENT: &str = "status";

/// Status code reported by `system/status` when the service is operational
pub const STATUS_OPERATIONAL: i64 = 1;

/// Maximum length of a top-level post, in characters
pub const MAX_POST_LENGTH: usize = 500;

/// Maximum length of a comment or reply, in characters
pub const MAX_COMMENT_LENGTH: usize = 250;

/// Deepest comment level a node may have (0 = post, 1 = reply, 2 = reply to a reply)
pub const MAX_COMMENT_LEVEL: u8 = 2;

/// Textual timestamp format accepted for externally-authored documents
pub const FALLBACK_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f%z";

/// Failure text shown for every transport-level error
pub const NETWORK_ERROR_MESSAGE: &str =
    "There was an error connecting to the network. Please check your Internet connection and try again!";

/// Mean Earth radius used for feed distance calculations
pub const EARTH_RADIUS_KM: f64 = 6371.0;
