//! Per-session state shared by every command.
//!
//! A [`Session`] owns the repositories and reconcilers a signed-in user
//! works with. Nothing here is global: each session is built from an
//! explicit backend and handed to the commands that need it.

use std::sync::{Arc, RwLock};

use anyhow::Context;
use herd_shared::constants::{
    CHATS_COLLECTION, DRAFTS_SUBCOLLECTION, POSTS_COLLECTION, SAVED_SUBCOLLECTION,
    STATUS_DOCUMENT, SYSTEM_COLLECTION, USERS_COLLECTION,
};
use herd_shared::{Chat, Draft, GeoPoint, Post, SavedPostRecord, SystemStatus, User};
use herd_store::{
    subcollection, DocumentStore, MemoryStore, Reconciler, Repository, Result, SqliteStore,
    StoreError,
};

use crate::config::ClientConfig;

/// Reconciler identity of the signed-in user's feed.
pub const FEED_IDENTITY: &str = "feed";

pub struct Session {
    pub config: ClientConfig,
    user_uuid: String,
    store: Arc<dyn DocumentStore>,

    pub users: Repository<User>,
    pub posts: Repository<Post>,
    pub chats: Repository<Chat>,
    pub system: Repository<SystemStatus>,

    /// Profiles kept current by snapshots, keyed by user UUID.
    pub profiles: Reconciler<User>,
    /// Open chats, keyed by chat UUID.
    pub open_chats: Reconciler<Chat>,
    /// The unfiltered feed query result, under [`FEED_IDENTITY`].
    pub feed: Reconciler<Vec<Post>>,

    device_location: RwLock<Option<GeoPoint>>,
}

impl Session {
    /// Build a session for `user_uuid` over an existing backend.
    pub fn new(config: ClientConfig, store: Arc<dyn DocumentStore>, user_uuid: impl Into<String>) -> Self {
        Self {
            config,
            user_uuid: user_uuid.into(),
            users: Repository::new(Arc::clone(&store), USERS_COLLECTION),
            posts: Repository::new(Arc::clone(&store), POSTS_COLLECTION),
            chats: Repository::new(Arc::clone(&store), CHATS_COLLECTION),
            system: Repository::new(Arc::clone(&store), SYSTEM_COLLECTION),
            store,
            profiles: Reconciler::new(),
            open_chats: Reconciler::new(),
            feed: Reconciler::new(),
            device_location: RwLock::new(None),
        }
    }

    /// Open the backend `config` selects and build a session on it.
    pub fn open(config: ClientConfig, user_uuid: impl Into<String>) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = if config.in_memory {
            tracing::info!("using in-memory document store");
            Arc::new(MemoryStore::new())
        } else {
            let sqlite = match &config.db_path {
                Some(path) => SqliteStore::open_at(path)
                    .with_context(|| format!("opening document store at {}", path.display()))?,
                None => SqliteStore::open_default().context("opening default document store")?,
            };
            Arc::new(sqlite)
        };
        Ok(Self::new(config, store, user_uuid))
    }

    pub fn user_uuid(&self) -> &str {
        &self.user_uuid
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// `users/{me}/drafts`
    pub fn drafts(&self) -> Repository<Draft> {
        Repository::new(
            Arc::clone(&self.store),
            subcollection(USERS_COLLECTION, &self.user_uuid, DRAFTS_SUBCOLLECTION),
        )
    }

    /// `posts/{post}/saved`, keyed by the saving user's UUID.
    pub fn saved_records(&self, post_uuid: &str) -> Repository<SavedPostRecord> {
        Repository::new(
            Arc::clone(&self.store),
            subcollection(POSTS_COLLECTION, post_uuid, SAVED_SUBCOLLECTION),
        )
    }

    /// Mirror the signed-in user's profile from the store.
    pub fn start(&self) {
        self.profiles.watch_document(&self.users, &self.user_uuid);
    }

    /// The signed-in user's profile: the mirrored copy when available,
    /// otherwise a fresh read.
    pub async fn current_user(&self) -> Result<User> {
        if let Some(user) = self.profiles.get(&self.user_uuid) {
            return Ok(user);
        }
        self.users.read(&self.user_uuid).await
    }

    pub fn set_device_location(&self, location: Option<GeoPoint>) {
        *self
            .device_location
            .write()
            .unwrap_or_else(|p| p.into_inner()) = location;
    }

    pub fn device_location(&self) -> Option<GeoPoint> {
        *self.device_location.read().unwrap_or_else(|p| p.into_inner())
    }

    /// Where the feed is centred for `user`.
    pub fn feed_centre(&self, user: &User) -> Result<GeoPoint> {
        user.effective_location(self.device_location())
            .ok_or_else(|| StoreError::Rejected("Your location is not available yet.".into()))
    }

    /// A missing status document counts as operational.
    pub async fn status(&self) -> Result<SystemStatus> {
        Ok(self
            .system
            .try_read(STATUS_DOCUMENT)
            .await?
            .unwrap_or(SystemStatus {
                code: herd_shared::constants::STATUS_OPERATIONAL,
            }))
    }

    /// Fails with `Rejected` during an outage when the config asks for it.
    pub async fn ensure_available(&self) -> Result<()> {
        if !self.config.require_status {
            return Ok(());
        }
        let status = self.status().await?;
        if status.is_operational() {
            Ok(())
        } else {
            tracing::warn!(code = status.code, "service unavailable, refusing write");
            Err(StoreError::Rejected(format!(
                "{} is temporarily unavailable. Please try again later.",
                herd_shared::constants::APP_NAME
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use herd_shared::{doc, Color, LocationMode, SavedLocation};
    use herd_store::Operation;

    use super::*;

    fn memory_session() -> (Arc<MemoryStore>, Session) {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(
            ClientConfig::default(),
            store.clone() as Arc<dyn DocumentStore>,
            "me",
        );
        (store, session)
    }

    #[tokio::test]
    async fn outage_blocks_writes_unless_disabled() {
        let (store, mut session) = memory_session();
        session.ensure_available().await.unwrap();

        store
            .set_document("system", "status", doc! { "code" => 0i64 })
            .await
            .unwrap();
        assert!(matches!(
            session.ensure_available().await,
            Err(StoreError::Rejected(_))
        ));

        session.config.require_status = false;
        session.ensure_available().await.unwrap();
    }

    #[tokio::test]
    async fn feed_centre_prefers_saved_location() {
        let (_, session) = memory_session();
        let mut user = User::new("🐄", Color::BLUE, Utc::now());
        assert!(session.feed_centre(&user).is_err());

        session.set_device_location(Some(GeoPoint::new(1.0, 1.0)));
        assert_eq!(session.feed_centre(&user).unwrap(), GeoPoint::new(1.0, 1.0));

        let home = SavedLocation::new("🏠", "Home", GeoPoint::new(5.0, 5.0));
        user.location_mode = LocationMode::Saved(home.uuid.clone());
        user.saved_locations.insert(home.uuid.clone(), home);
        assert_eq!(session.feed_centre(&user).unwrap(), GeoPoint::new(5.0, 5.0));
    }

    #[tokio::test]
    async fn sub_collections_are_per_owner() {
        let (_, session) = memory_session();
        assert_eq!(session.drafts().collection(), "users/me/drafts");
        assert_eq!(session.saved_records("p1").collection(), "posts/p1/saved");

        let draft = Draft::new("me", "later", Utc::now());
        session
            .drafts()
            .write(&draft, Some(&draft.uuid), &Operation::new())
            .await
            .unwrap();
        assert_eq!(session.drafts().read(&draft.uuid).await.unwrap(), draft);
    }

    #[test]
    fn open_in_memory_from_config() {
        let config = ClientConfig {
            in_memory: true,
            ..ClientConfig::default()
        };
        let session = Session::open(config, "me").unwrap();
        assert_eq!(session.user_uuid(), "me");
    }

    #[test]
    fn open_sqlite_at_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            db_path: Some(dir.path().join("herd.db")),
            ..ClientConfig::default()
        };
        assert!(Session::open(config, "me").is_ok());
    }
}
