//! Posts, replies, votes and the location feed.

use chrono::Utc;
use futures::stream::BoxStream;
use herd_shared::{Codec, GeoPoint, Post, User, Vote};
use herd_store::{Direction, Filter, Operation, Query, Result, StoreError};
use tracing::info;

use super::{ensure_writable, FailOperation};
use crate::state::{Session, FEED_IDENTITY};

/// Publish a new top-level post at the user's feed centre. With
/// `anonymously` the author takes number 0 on the thread.
pub async fn submit_post(
    session: &Session,
    text: &str,
    anonymously: bool,
    op: &Operation,
) -> Result<Post> {
    ensure_writable(session, op).await?;
    let user = session.current_user().await.or_fail(op)?;
    let at = session.feed_centre(&user).or_fail(op)?;
    let mut post = Post::new(&user, text, at, Utc::now()).or_fail(op)?;
    if anonymously {
        post = post.with_anonymous_number(&user.uuid);
    }

    session.posts.write(&post, Some(&post.uuid), op).await?;
    info!(post = %post.uuid, "post submitted");
    Ok(post)
}

/// Reply beneath `target_uuid` (at `target_level`) in the thread rooted at
/// `root_uuid`. Returns the rewritten thread.
///
/// A user who has already spoken anonymously on the thread keeps their
/// number; otherwise one is assigned only when `anonymously` is set.
pub async fn reply(
    session: &Session,
    root_uuid: &str,
    target_uuid: &str,
    target_level: u8,
    text: &str,
    anonymously: bool,
    op: &Operation,
) -> Result<Post> {
    ensure_writable(session, op).await?;
    let user = session.current_user().await.or_fail(op)?;
    let root = session.posts.read(root_uuid).await.or_fail(op)?;

    let comment = Post::new_reply(&user, text, target_level, Utc::now()).or_fail(op)?;
    let mut thread = root
        .append_reply(target_level, target_uuid, comment)
        .or_fail(op)?
        .with_associated_user(&user.uuid);
    if anonymously {
        thread = thread.with_anonymous_number(&user.uuid);
    }

    session.posts.write(&thread, Some(root_uuid), op).await?;
    Ok(thread)
}

/// Cast (or replace) the user's vote on any node of a thread.
pub async fn vote(
    session: &Session,
    root_uuid: &str,
    target_uuid: &str,
    value: i8,
    op: &Operation,
) -> Result<Post> {
    ensure_writable(session, op).await?;
    let root = session.posts.read(root_uuid).await.or_fail(op)?;
    let ballot = Vote::new(session.user_uuid(), value, Utc::now()).or_fail(op)?;
    let thread = root.set_vote(target_uuid, ballot).or_fail(op)?;

    session.posts.write(&thread, Some(root_uuid), op).await?;
    Ok(thread)
}

/// Delete one of the user's own posts together with its comments.
pub async fn delete_post(session: &Session, post_uuid: &str, op: &Operation) -> Result<()> {
    ensure_writable(session, op).await?;
    let post = session.posts.read(post_uuid).await.or_fail(op)?;
    if post.author_uuid != session.user_uuid() {
        return Err::<(), _>(StoreError::Rejected("You can only delete your own posts.".into())).or_fail(op);
    }
    session.posts.delete(post_uuid, op).await
}

/// Query for the newest posts, before any location filtering.
pub fn feed_query(session: &Session) -> Query {
    Query::all()
        .order_by("timePosted", Direction::Descending)
        .limit(session.config.feed_limit)
}

/// Keep `posts` within `radius_km` of `centre`, dropping blocked authors.
pub fn filter_feed(posts: Vec<Post>, viewer: &User, centre: &GeoPoint, radius_km: f64) -> Vec<Post> {
    posts
        .into_iter()
        .filter(|p| !viewer.is_blocked(&p.author_uuid))
        .filter(|p| p.location().distance_km(centre) <= radius_km)
        .collect()
}

/// One-shot fetch of the local feed.
pub async fn feed(session: &Session) -> Result<Vec<Post>> {
    let user = session.current_user().await?;
    let centre = session.feed_centre(&user)?;
    let posts = session.posts.read_collection(&feed_query(session)).await?;
    Ok(filter_feed(posts, &user, &centre, session.config.feed_radius_km))
}

/// Mirror the feed query into the session's feed reconciler.
pub fn watch_feed(session: &Session) {
    session
        .feed
        .watch_query(&session.posts, FEED_IDENTITY, feed_query(session));
}

/// The mirrored feed, filtered for the current viewer. Empty until the
/// first snapshot arrives.
pub async fn current_feed(session: &Session) -> Result<Vec<Post>> {
    let user = session.current_user().await?;
    let centre = session.feed_centre(&user)?;
    let posts = session.feed.get(FEED_IDENTITY).unwrap_or_default();
    Ok(filter_feed(posts, &user, &centre, session.config.feed_radius_km))
}

/// Posts written by `user_uuid`, newest first.
pub async fn user_posts(session: &Session, user_uuid: &str) -> Result<Vec<Post>> {
    let query = Query::all()
        .filter(Filter::eq("authorUUID", user_uuid))
        .order_by("timePosted", Direction::Descending);
    session.posts.read_collection(&query).await
}

/// Live view of a single thread.
pub fn watch_thread(session: &Session, root_uuid: &str) -> BoxStream<'static, Result<Option<Post>>> {
    session.posts.watch(root_uuid)
}

/// Delete every post the user wrote. Returns how many were removed.
pub async fn delete_all_posts(session: &Session, op: &Operation) -> Result<usize> {
    ensure_writable(session, op).await?;
    let query = Query::all().filter(Filter::eq("authorUUID", session.user_uuid()));
    let keyed = session.posts.read_keyed(&query).await.or_fail(op)?;

    let store = session.posts.store();
    let collection = session.posts.collection();
    let count = keyed.len();
    op.track(async {
        for (key, _) in &keyed {
            store.delete_document(collection, key).await?;
        }
        Ok(())
    })
    .await?;

    info!(count, "deleted all own posts");
    Ok(count)
}

/// Remove every comment the user wrote, in every thread they took part in.
/// Returns how many comments the user had written. Other users' replies
/// beneath those comments go with them but are not counted.
pub async fn delete_all_comments(session: &Session, op: &Operation) -> Result<usize> {
    ensure_writable(session, op).await?;
    let uid = session.user_uuid();
    let query = Query::all().filter(Filter::Or(vec![
        Filter::array_contains("associatedUserIDs", uid),
        Filter::eq("authorUUID", uid),
    ]));
    let keyed = session.posts.read_keyed(&query).await.or_fail(op)?;

    let rewrites: Vec<(String, Post, usize)> = keyed
        .into_iter()
        .filter(|(_, post)| post.has_authored(uid))
        .map(|(key, post)| {
            let pruned = post.without_authored(uid);
            let removed = post.count_comments_by(uid);
            (key, pruned, removed)
        })
        .collect();

    let store = session.posts.store();
    let collection = session.posts.collection();
    op.track(async {
        for (key, post, _) in &rewrites {
            store.set_document(collection, key, post.encode()).await?;
        }
        Ok(())
    })
    .await?;

    let removed: usize = rewrites.iter().map(|(_, _, n)| n).sum();
    info!(threads = rewrites.len(), removed, "deleted all own comments");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use herd_shared::Color;

    use super::*;

    fn post_at(author: &User, lat: f64, lon: f64) -> Post {
        Post::new(author, "moo", GeoPoint::new(lat, lon), Utc::now()).unwrap()
    }

    #[test]
    fn feed_filter_drops_far_and_blocked() {
        let mut viewer = User::new("🐄", Color::BLUE, Utc::now());
        let near = User::new("🐑", Color::GRAY, Utc::now());
        let blocked = User::new("🐖", Color::GRAY, Utc::now());
        viewer.blocked_user_ids.push(blocked.uuid.clone());

        let centre = GeoPoint::new(40.7128, -74.0060);
        let posts = vec![
            post_at(&near, 40.7130, -74.0050),
            post_at(&near, 41.5, -74.0),
            post_at(&blocked, 40.7128, -74.0060),
        ];

        let shown = filter_feed(posts, &viewer, &centre, 8.0);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].author_uuid, near.uuid);
    }
}
