use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use herd_client::commands::{chats, drafts, posts, profile, saved, status};
use herd_client::{ClientConfig, Session};
use herd_shared::{doc, Color, FontPreference, GeoPoint, LocationMode, User};
use herd_store::{DocumentStore, MemoryStore, Operation, OperationStatus, StoreError};

const NYC: GeoPoint = GeoPoint {
    latitude: 40.7128,
    longitude: -74.0060,
};

async fn signed_in(store: &Arc<MemoryStore>, emoji: &str) -> (Session, User) {
    let user = User::new(emoji, Color::BLUE, Utc::now());
    let session = Session::new(
        ClientConfig::default(),
        store.clone() as Arc<dyn DocumentStore>,
        user.uuid.clone(),
    );
    session.set_device_location(Some(NYC));
    profile::register(&session, &user, &Operation::new())
        .await
        .unwrap();
    (session, user)
}

#[tokio::test]
async fn post_reply_vote_and_feed() {
    let store = Arc::new(MemoryStore::new());
    let (alice, _) = signed_in(&store, "🐄").await;
    let (bob, bob_user) = signed_in(&store, "🐑").await;

    let op = Operation::new();
    let post = posts::submit_post(&alice, "Anyone seen the geese?", false, &op)
        .await
        .unwrap();
    assert_eq!(op.status(), OperationStatus::Success);
    assert_eq!(post.anonymous_number(&post.author_uuid), None);

    let thread = posts::reply(&bob, &post.uuid, &post.uuid, 0, "By the pond", false, &Operation::new())
        .await
        .unwrap();
    assert_eq!(thread.count_comments(), 1);
    assert_eq!(thread.anonymous_number(&bob_user.uuid), None);
    assert!(thread.anonymous_identifier_table.is_empty());
    assert!(thread.associated_user_ids.contains(&bob_user.uuid));

    let comment_uuid = thread.comments[0].uuid.clone();
    let thread = posts::vote(&alice, &post.uuid, &comment_uuid, -1, &Operation::new())
        .await
        .unwrap();
    // Bob's self-upvote plus Alice's downvote.
    assert_eq!(thread.comments[0].score(), 0);

    let feed = posts::feed(&bob).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].comments.len(), 1);
}

#[tokio::test]
async fn anonymity_is_opt_in_and_sticks_to_the_thread() {
    let store = Arc::new(MemoryStore::new());
    let (alice, alice_user) = signed_in(&store, "🐄").await;
    let (bob, bob_user) = signed_in(&store, "🐑").await;
    let (carol, carol_user) = signed_in(&store, "🐖").await;

    let post = posts::submit_post(&alice, "who goes there", true, &Operation::new())
        .await
        .unwrap();
    assert_eq!(post.anonymous_number(&alice_user.uuid), Some(0));

    let thread = posts::reply(&bob, &post.uuid, &post.uuid, 0, "a stranger", true, &Operation::new())
        .await
        .unwrap();
    assert_eq!(thread.anonymous_number(&bob_user.uuid), Some(1));

    let thread = posts::reply(&carol, &post.uuid, &post.uuid, 0, "it's me, carol", false, &Operation::new())
        .await
        .unwrap();
    assert_eq!(thread.anonymous_number(&carol_user.uuid), None);

    let thread = posts::reply(&bob, &post.uuid, &post.uuid, 0, "still me", false, &Operation::new())
        .await
        .unwrap();
    assert_eq!(thread.anonymous_number(&bob_user.uuid), Some(1));
    assert_eq!(thread.anonymous_identifier_table.len(), 2);
}

#[tokio::test]
async fn out_of_range_vote_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let (alice, _) = signed_in(&store, "🐄").await;
    let (bob, bob_user) = signed_in(&store, "🐑").await;
    let post = posts::submit_post(&alice, "rate me", false, &Operation::new())
        .await
        .unwrap();

    let op = Operation::new();
    let err = posts::vote(&bob, &post.uuid, &post.uuid, 5, &op).await.unwrap_err();
    assert!(matches!(err, StoreError::Tree(_)));
    assert!(op.status().failure_message().is_some());

    let stored = alice.posts.read(&post.uuid).await.unwrap();
    assert!(!stored.votes.contains_key(&bob_user.uuid));
    assert_eq!(stored.score(), 1);
}

#[tokio::test]
async fn third_level_reply_is_rejected_and_nothing_written() {
    let store = Arc::new(MemoryStore::new());
    let (alice, _) = signed_in(&store, "🐄").await;
    let post = posts::submit_post(&alice, "root", false, &Operation::new())
        .await
        .unwrap();
    let thread = posts::reply(&alice, &post.uuid, &post.uuid, 0, "one", false, &Operation::new())
        .await
        .unwrap();
    let level1 = thread.comments[0].uuid.clone();
    let thread = posts::reply(&alice, &post.uuid, &level1, 1, "two", false, &Operation::new())
        .await
        .unwrap();
    let level2 = thread.comments[0].comments[0].uuid.clone();

    let op = Operation::new();
    let err = posts::reply(&alice, &post.uuid, &level2, 2, "three", false, &op)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Tree(_)));
    assert!(op.status().failure_message().is_some());

    let stored = alice.posts.read(&post.uuid).await.unwrap();
    assert_eq!(stored, thread);
}

#[tokio::test]
async fn failed_write_surfaces_in_operation_and_can_retry() {
    let store = Arc::new(MemoryStore::new());
    let (alice, _) = signed_in(&store, "🐄").await;
    let before = store.count("posts").await;

    store.fail_next_writes(1).await;
    let op = Operation::new();
    assert!(posts::submit_post(&alice, "hello", false, &op).await.is_err());
    assert!(op.status().failure_message().is_some_and(|m| !m.is_empty()));
    assert_eq!(store.count("posts").await, before);

    op.reset().unwrap();
    posts::submit_post(&alice, "hello", false, &op).await.unwrap();
    assert_eq!(op.status(), OperationStatus::Success);
}

#[tokio::test]
async fn deleting_all_comments_leaves_other_content() {
    let store = Arc::new(MemoryStore::new());
    let (alice, _) = signed_in(&store, "🐄").await;
    let (bob, bob_user) = signed_in(&store, "🐑").await;

    let post = posts::submit_post(&alice, "root", false, &Operation::new())
        .await
        .unwrap();
    for text in ["b1", "b2"] {
        posts::reply(&bob, &post.uuid, &post.uuid, 0, text, false, &Operation::new())
            .await
            .unwrap();
    }
    let thread = posts::reply(&alice, &post.uuid, &post.uuid, 0, "a1", false, &Operation::new())
        .await
        .unwrap();
    let bob_first = thread.comments[0].uuid.clone();
    posts::reply(&alice, &post.uuid, &bob_first, 1, "reply to bob", false, &Operation::new())
        .await
        .unwrap();

    let removed = posts::delete_all_comments(&bob, &Operation::new())
        .await
        .unwrap();
    assert_eq!(removed, 2, "only bob's own comments are counted");

    let stored = alice.posts.read(&post.uuid).await.unwrap();
    assert_eq!(stored.comments.len(), 1);
    assert_eq!(stored.comments[0].text, "a1");
    assert!(!stored.has_authored(&bob_user.uuid));
}

#[tokio::test]
async fn deleting_all_posts_only_touches_own() {
    let store = Arc::new(MemoryStore::new());
    let (alice, _) = signed_in(&store, "🐄").await;
    let (bob, _) = signed_in(&store, "🐑").await;
    posts::submit_post(&alice, "a", false, &Operation::new()).await.unwrap();
    posts::submit_post(&alice, "b", false, &Operation::new()).await.unwrap();
    let bobs = posts::submit_post(&bob, "c", false, &Operation::new()).await.unwrap();

    assert_eq!(posts::delete_all_posts(&alice, &Operation::new()).await.unwrap(), 2);
    assert_eq!(store.count("posts").await, 1);

    let op = Operation::new();
    assert!(posts::delete_post(&alice, &bobs.uuid, &op).await.is_err());
    assert!(op.status().failure_message().is_some());
}

#[tokio::test]
async fn blocked_authors_leave_the_feed() {
    let store = Arc::new(MemoryStore::new());
    let (alice, _) = signed_in(&store, "🐄").await;
    let (bob, bob_user) = signed_in(&store, "🐑").await;
    posts::submit_post(&bob, "hi", false, &Operation::new()).await.unwrap();
    assert_eq!(posts::feed(&alice).await.unwrap().len(), 1);

    let me = profile::block(&alice, &bob_user, &Operation::new())
        .await
        .unwrap();
    assert!(me.block_details.contains_key(&bob_user.uuid));
    assert!(posts::feed(&alice).await.unwrap().is_empty());

    profile::unblock(&alice, &bob_user.uuid, &Operation::new())
        .await
        .unwrap();
    assert_eq!(posts::feed(&alice).await.unwrap().len(), 1);
}

#[tokio::test]
async fn profile_edits_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let (alice, alice_user) = signed_in(&store, "🐄").await;
    let (_, bob_user) = signed_in(&store, "🐑").await;

    profile::change_identity(&alice, "🦆", Color::GRAY, &Operation::new())
        .await
        .unwrap();
    let address = profile::add_address(&alice, &bob_user, &Operation::new())
        .await
        .unwrap();
    assert!(!address.nickname.is_empty());

    let home = profile::add_saved_location(&alice, "🏠", "Home", GeoPoint::new(1.0, 2.0), &Operation::new())
        .await
        .unwrap();
    profile::set_location_mode(&alice, LocationMode::Saved(home.uuid.clone()), &Operation::new())
        .await
        .unwrap();
    profile::set_font_preference(&alice, FontPreference::Serif, &Operation::new())
        .await
        .unwrap();
    profile::hide_chat(&alice, "c1", &Operation::new()).await.unwrap();

    let stored = alice.users.read(&alice_user.uuid).await.unwrap();
    assert_eq!(stored.emoji, "🦆");
    assert!(stored.addresses.contains_key(&bob_user.uuid));
    assert_eq!(stored.location_mode, LocationMode::Saved(home.uuid.clone()));
    assert_eq!(stored.font_preference, FontPreference::Serif);
    assert_eq!(stored.hidden_chat_ids, ["c1"]);

    let stored = profile::remove_saved_location(&alice, &home.uuid, &Operation::new())
        .await
        .unwrap();
    assert_eq!(stored.location_mode, LocationMode::Current);

    let op = Operation::new();
    assert!(profile::set_location_mode(&alice, LocationMode::Saved("gone".into()), &op)
        .await
        .is_err());
    assert!(op.status().failure_message().is_some());
}

#[tokio::test]
async fn failed_profile_edit_rolls_back_locally() {
    let store = Arc::new(MemoryStore::new());
    let (alice, alice_user) = signed_in(&store, "🐄").await;
    assert_eq!(alice.profiles.get(&alice_user.uuid).map(|u| u.emoji), Some("🐄".to_string()));

    store.fail_next_writes(1).await;
    let op = Operation::new();
    assert!(profile::change_identity(&alice, "🦆", Color::GRAY, &op).await.is_err());
    assert_eq!(alice.profiles.get(&alice_user.uuid).map(|u| u.emoji), Some("🐄".to_string()));
}

#[tokio::test]
async fn chats_and_messages() {
    let store = Arc::new(MemoryStore::new());
    let (alice, _) = signed_in(&store, "🐄").await;
    let (bob, bob_user) = signed_in(&store, "🐑").await;
    let (carol, carol_user) = signed_in(&store, "🐖").await;

    let chat = chats::create_chat(&alice, &[bob_user.as_member()], &Operation::new())
        .await
        .unwrap();
    chats::send_message(&bob, &chat.uuid, "moo?", &Operation::new())
        .await
        .unwrap();

    let op = Operation::new();
    assert!(chats::send_message(&carol, &chat.uuid, "let me in", &op).await.is_err());
    assert!(op.status().failure_message().is_some());

    let chat = chats::add_member(&alice, &chat.uuid, &carol_user.as_member(), &Operation::new())
        .await
        .unwrap();
    assert_eq!(chat.members().len(), 3);
    assert_eq!(chats::my_chats(&carol).await.unwrap().len(), 1);

    profile::hide_chat(&bob, &chat.uuid, &Operation::new()).await.unwrap();
    assert!(chats::my_chats(&bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn watched_chat_follows_new_messages() {
    let store = Arc::new(MemoryStore::new());
    let (alice, _) = signed_in(&store, "🐄").await;
    let (bob, bob_user) = signed_in(&store, "🐑").await;
    let chat = chats::create_chat(&alice, &[bob_user.as_member()], &Operation::new())
        .await
        .unwrap();

    let mut changes = alice.open_chats.changes();
    chats::watch_chat(&alice, &chat.uuid);
    tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .unwrap()
        .unwrap();

    chats::send_message(&bob, &chat.uuid, "hello", &Operation::new())
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .unwrap()
        .unwrap();
    let mirrored = alice.open_chats.get(&chat.uuid).unwrap();
    assert_eq!(mirrored.messages.len(), 1);

    assert!(chats::close_chat(&alice, &chat.uuid));
}

#[tokio::test]
async fn drafts_and_saved_posts() {
    let store = Arc::new(MemoryStore::new());
    let (alice, _) = signed_in(&store, "🐄").await;

    let mut watch = drafts::watch_drafts(&alice);
    assert!(watch.next().await.unwrap().unwrap().is_empty());

    let draft = drafts::save_draft(&alice, "half a thought", &Operation::new())
        .await
        .unwrap();
    assert_eq!(watch.next().await.unwrap().unwrap(), vec![draft.clone()]);
    assert_eq!(drafts::list_drafts(&alice).await.unwrap().len(), 1);

    let op = Operation::new();
    assert!(drafts::save_draft(&alice, &"x".repeat(501), &op).await.is_err());
    assert!(op.status().failure_message().is_some());

    drafts::delete_draft(&alice, &draft.uuid, &Operation::new())
        .await
        .unwrap();
    assert!(watch.next().await.unwrap().unwrap().is_empty());

    let post = posts::submit_post(&alice, "keep me", false, &Operation::new())
        .await
        .unwrap();
    assert!(!saved::is_saved(&alice, &post.uuid).await.unwrap());
    saved::save_post(&alice, &post.uuid, &Operation::new()).await.unwrap();
    assert!(saved::is_saved(&alice, &post.uuid).await.unwrap());
    saved::unsave_post(&alice, &post.uuid, &Operation::new()).await.unwrap();
    assert!(!saved::is_saved(&alice, &post.uuid).await.unwrap());
}

#[tokio::test]
async fn outage_gates_writes() {
    let store = Arc::new(MemoryStore::new());
    let (alice, _) = signed_in(&store, "🐄").await;

    let mut live = status::watch_status(&alice);
    assert!(live.next().await.unwrap().unwrap().is_operational());

    store
        .set_document("system", "status", doc! { "code" => 2i64 })
        .await
        .unwrap();
    assert!(!live.next().await.unwrap().unwrap().is_operational());
    assert!(!status::fetch_status(&alice).await.unwrap().is_operational());

    let op = Operation::new();
    let err = posts::submit_post(&alice, "during outage", false, &op).await.unwrap_err();
    assert!(matches!(err, StoreError::Rejected(_)));
    assert_eq!(op.status().failure_message(), Some(err.user_message().as_str()));

    let op = Operation::new();
    let err = drafts::save_draft(&alice, "for later", &op).await.unwrap_err();
    assert!(matches!(err, StoreError::Rejected(_)));
    assert!(drafts::list_drafts(&alice).await.unwrap().is_empty());
    assert!(saved::unsave_post(&alice, "any", &Operation::new()).await.is_err());
}

#[tokio::test]
async fn feed_mirror_tracks_new_posts() {
    let store = Arc::new(MemoryStore::new());
    let (alice, _) = signed_in(&store, "🐄").await;
    let (bob, _) = signed_in(&store, "🐑").await;

    let mut changes = alice.feed.changes();
    posts::watch_feed(&alice);
    tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(posts::current_feed(&alice).await.unwrap().is_empty());

    posts::submit_post(&bob, "fresh", false, &Operation::new()).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(posts::current_feed(&alice).await.unwrap().len(), 1);
}
