//! Comment tree algorithms.
//!
//! A thread is a root [`Post`] whose `comments` recursively hold more posts.
//! Everything here is pure: each mutation takes the current tree and returns
//! a new one, which the caller persists as a whole. The backing store cannot
//! address a node inside the nested array, so two writers racing on the same
//! root both rewrite the full document and the later write wins.
//!
//! Read-only aggregates walk the owned tree recursively. Mutations that
//! target a node by UUID go through [`Thread`], an arena view with parent
//! links and depths kept beside the node data.

use std::collections::HashMap;

use crate::constants::MAX_COMMENT_LEVEL;
use crate::error::TreeError;
use crate::models::{Post, Vote};

impl Post {
    /// Every descendant, at any depth.
    pub fn count_comments(&self) -> usize {
        self.comments
            .iter()
            .map(|child| 1 + child.count_comments())
            .sum()
    }

    /// Descendants written by `user_uuid`.
    pub fn count_comments_by(&self, user_uuid: &str) -> usize {
        self.comments
            .iter()
            .map(|child| usize::from(child.author_uuid == user_uuid) + child.count_comments_by(user_uuid))
            .sum()
    }

    /// Whether `user_uuid` wrote any descendant. Every sibling at every level
    /// is examined, not only the first.
    pub fn has_authored(&self, user_uuid: &str) -> bool {
        self.comments
            .iter()
            .any(|child| child.author_uuid == user_uuid || child.has_authored(user_uuid))
    }

    /// A copy of this tree with every descendant written by `user_uuid`
    /// removed together with its replies. Surviving siblings keep their order
    /// and their own subtrees.
    pub fn without_authored(&self, user_uuid: &str) -> Post {
        let mut pruned = self.clone();
        pruned.comments = prune(&self.comments, user_uuid);
        pruned
    }

    /// Attach `reply` beneath the node `target_uuid`, which must sit at
    /// `target_level`. Level 0 is the root itself. Targets at level 2 cannot
    /// take replies.
    pub fn append_reply(
        &self,
        target_level: u8,
        target_uuid: &str,
        reply: Post,
    ) -> Result<Post, TreeError> {
        if target_level >= MAX_COMMENT_LEVEL {
            return Err(TreeError::TooDeep {
                level: target_level,
            });
        }
        let mut thread = Thread::from_post(self);
        let target = thread.locate(target_uuid)?;
        let found = thread.depth(target);
        if found != target_level {
            return Err(TreeError::LevelMismatch {
                expected: target_level,
                found,
            });
        }
        thread.push_child(target, reply)?;
        Ok(thread.into_post())
    }

    /// Replace (or place) `vote` on the node `target_uuid`, keyed by voter.
    pub fn set_vote(&self, target_uuid: &str, vote: Vote) -> Result<Post, TreeError> {
        let mut thread = Thread::from_post(self);
        let target = thread.locate(target_uuid)?;
        thread
            .post_mut(target)
            .votes
            .insert(vote.voter_uuid.clone(), vote);
        Ok(thread.into_post())
    }

    /// The number standing in for `user_uuid` on this thread, if any.
    pub fn anonymous_number(&self, user_uuid: &str) -> Option<i64> {
        self.anonymous_identifier_table.get(user_uuid).copied()
    }

    /// Give `user_uuid` the next anonymous number unless they already have
    /// one. The thread's author is always 0; everyone else counts up from 1.
    pub fn with_anonymous_number(&self, user_uuid: &str) -> Post {
        let mut next = self.clone();
        if self.anonymous_number(user_uuid).is_none() {
            let size = self.anonymous_identifier_table.len() as i64;
            let number = if user_uuid == self.author_uuid {
                0
            } else if self.anonymous_identifier_table.contains_key(&self.author_uuid) {
                size
            } else {
                size + 1
            };
            next.anonymous_identifier_table
                .insert(user_uuid.to_string(), number);
        }
        next
    }

    /// Record `user_uuid` as a participant in this thread.
    pub fn with_associated_user(&self, user_uuid: &str) -> Post {
        let mut next = self.clone();
        if !next.associated_user_ids.iter().any(|id| id == user_uuid) {
            next.associated_user_ids.push(user_uuid.to_string());
        }
        next
    }

    /// Whether `user_uuid` wrote this post or any comment under it.
    pub fn involves(&self, user_uuid: &str) -> bool {
        self.author_uuid == user_uuid || self.has_authored(user_uuid)
    }
}

fn prune(comments: &[Post], user_uuid: &str) -> Vec<Post> {
    comments
        .iter()
        .filter(|c| c.author_uuid != user_uuid)
        .map(|c| {
            let mut kept = c.clone();
            kept.comments = prune(&c.comments, user_uuid);
            kept
        })
        .collect()
}

/// `post` must sit at `level` and every descendant one level below its
/// parent, never past [`MAX_COMMENT_LEVEL`].
fn check_subtree(post: &Post, level: u8) -> Result<(), TreeError> {
    if post.comment_level != level {
        return Err(TreeError::LevelMismatch {
            expected: level,
            found: post.comment_level,
        });
    }
    if !post.comments.is_empty() && level >= MAX_COMMENT_LEVEL {
        return Err(TreeError::TooDeep { level });
    }
    post.comments
        .iter()
        .try_for_each(|child| check_subtree(child, level + 1))
}

/// Index of a node inside a [`Thread`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    /// Node data with `comments` emptied; structure lives in `children`.
    post: Post,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: u8,
}

/// Arena view of a comment tree, addressed by UUID.
#[derive(Debug, Clone)]
pub struct Thread {
    nodes: Vec<Node>,
    by_uuid: HashMap<String, NodeId>,
}

impl Thread {
    pub fn from_post(root: &Post) -> Self {
        let mut thread = Self {
            nodes: Vec::new(),
            by_uuid: HashMap::new(),
        };
        thread.insert(root, None, root.comment_level);
        thread
    }

    fn insert(&mut self, post: &Post, parent: Option<NodeId>, depth: u8) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut data = post.clone();
        data.comments = Vec::new();
        self.by_uuid.entry(post.uuid.clone()).or_insert(id);
        self.nodes.push(Node {
            post: data,
            parent,
            children: Vec::new(),
            depth,
        });
        for child in &post.comments {
            let child_id = self.insert(child, Some(id), depth.saturating_add(1));
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, uuid: &str) -> Option<NodeId> {
        self.by_uuid.get(uuid).copied()
    }

    fn locate(&self, uuid: &str) -> Result<NodeId, TreeError> {
        self.find(uuid).ok_or_else(|| TreeError::TargetNotFound {
            uuid: uuid.to_string(),
        })
    }

    /// Node data; its `comments` field is always empty inside the arena.
    pub fn post(&self, id: NodeId) -> &Post {
        &self.nodes[id.0].post
    }

    pub fn post_mut(&mut self, id: NodeId) -> &mut Post {
        &mut self.nodes[id.0].post
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn depth(&self, id: NodeId) -> u8 {
        self.nodes[id.0].depth
    }

    /// Path from `id` up to the root, excluding `id`.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            out.push(p);
            cursor = self.parent(p);
        }
        out
    }

    /// Attach `post` (and its own subtree) as the last child of `parent`.
    pub fn push_child(&mut self, parent: NodeId, post: Post) -> Result<NodeId, TreeError> {
        let depth = self.depth(parent);
        if depth >= MAX_COMMENT_LEVEL {
            return Err(TreeError::TooDeep { level: depth });
        }
        check_subtree(&post, depth + 1)?;
        let id = self.insert(&post, Some(parent), depth + 1);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Rebuild the owned, persisted form.
    pub fn into_post(self) -> Post {
        self.build(self.root())
    }

    fn build(&self, id: NodeId) -> Post {
        let node = &self.nodes[id.0];
        let mut post = node.post.clone();
        post.comments = node.children.iter().map(|c| self.build(*c)).collect();
        post
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::User;
    use crate::types::{Color, GeoPoint};

    fn user(emoji: &str) -> User {
        User::new(emoji, Color::BLUE, Utc::now())
    }

    fn post(author: &User, text: &str) -> Post {
        Post::new(author, text, GeoPoint::default(), Utc::now()).unwrap()
    }

    fn reply(author: &User, text: &str, parent_level: u8) -> Post {
        Post::new_reply(author, text, parent_level, Utc::now()).unwrap()
    }

    #[test]
    fn counts_full_subtree() {
        let a = user("🐟");
        let mut root = post(&a, "root");
        let mut first = reply(&a, "first", 0);
        first.comments.push(reply(&a, "nested", 1));
        root.comments.push(first);
        root.comments.push(reply(&a, "second", 0));

        assert_eq!(root.count_comments(), 3);
    }

    #[test]
    fn counts_per_author() {
        let (u, v) = (user("🐟"), user("🦊"));
        let mut root = post(&v, "root");
        let mut first = reply(&u, "a", 0);
        first.comments.push(reply(&u, "b", 1));
        first.comments.push(reply(&v, "c", 1));
        root.comments.push(first);
        root.comments.push(reply(&v, "d", 0));

        assert_eq!(root.count_comments_by(&u.uuid), 2);
        assert_eq!(root.count_comments_by(&v.uuid), 2);
    }

    #[test]
    fn has_authored_checks_every_sibling() {
        let (u, v) = (user("🐟"), user("🦊"));
        let mut root = post(&v, "root");
        root.comments.push(reply(&v, "first", 0));
        let mut second = reply(&v, "second", 0);
        second.comments.push(reply(&v, "x", 1));
        second.comments.push(reply(&u, "y", 1));
        root.comments.push(second);

        assert!(root.has_authored(&u.uuid));
        assert!(!post(&u, "alone").has_authored(&u.uuid));
        assert!(post(&u, "alone").involves(&u.uuid));
    }

    #[test]
    fn removal_keeps_survivors_in_place() {
        let (u, v) = (user("🐟"), user("🦊"));
        let mut root = post(&v, "root");
        let mut u_first = reply(&u, "u1", 0);
        u_first.comments.push(reply(&v, "under u", 1));
        let mut v_mid = reply(&v, "v", 0);
        v_mid.comments.push(reply(&v, "kept", 1));
        v_mid.comments.push(reply(&u, "dropped", 1));
        v_mid.comments.push(reply(&v, "kept too", 1));
        root.comments = vec![u_first, v_mid.clone(), reply(&u, "u2", 0)];

        let pruned = root.without_authored(&u.uuid);

        assert_eq!(pruned.comments.len(), 1);
        let survivor = &pruned.comments[0];
        assert_eq!(survivor.uuid, v_mid.uuid);
        let texts: Vec<_> = survivor.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["kept", "kept too"]);
        assert_eq!(root.comments.len(), 3, "input tree is untouched");
    }

    #[test]
    fn removal_of_top_level_nodes() {
        let (u, v) = (user("🐟"), user("🦊"));
        let mut root = post(&v, "root");
        let mut v_node = reply(&v, "v", 0);
        v_node.comments.push(reply(&v, "v child", 1));
        root.comments = vec![reply(&u, "u1", 0), v_node.clone(), reply(&u, "u2", 0)];

        let pruned = root.without_authored(&u.uuid);
        assert_eq!(pruned.comments, vec![v_node]);
    }

    #[test]
    fn append_reply_at_each_level() {
        let a = user("🐟");
        let root = post(&a, "root");
        let child = reply(&a, "child", 0);
        let child_uuid = child.uuid.clone();

        let root = root.append_reply(0, &root.uuid, child).unwrap();
        assert_eq!(root.comments.len(), 1);

        let grandchild = reply(&a, "grandchild", 1);
        let root = root.append_reply(1, &child_uuid, grandchild).unwrap();
        assert_eq!(root.comments[0].comments.len(), 1);
        assert_eq!(root.comments[0].comments[0].comment_level, 2);
        assert_eq!(root.count_comments(), 2);
    }

    #[test]
    fn append_reply_too_deep_leaves_tree_unmodified() {
        let a = user("🐟");
        let mut root = post(&a, "root");
        let mut child = reply(&a, "child", 0);
        let grandchild = reply(&a, "grandchild", 1);
        let grandchild_uuid = grandchild.uuid.clone();
        child.comments.push(grandchild);
        root.comments.push(child);
        let before = root.clone();

        let mut deep = reply(&a, "deeper", 1);
        deep.comment_level = 3;
        assert_eq!(
            root.append_reply(2, &grandchild_uuid, deep),
            Err(TreeError::TooDeep { level: 2 })
        );
        assert_eq!(root, before);
    }

    #[test]
    fn append_reply_rejects_overdeep_subtree() {
        let a = user("🐟");
        let mut root = post(&a, "root");
        let child = reply(&a, "child", 0);
        let child_uuid = child.uuid.clone();
        root.comments.push(child);

        let mut carried = reply(&a, "level two", 1);
        let mut level_three = reply(&a, "level three", 1);
        level_three.comment_level = 3;
        carried.comments.push(level_three);
        assert_eq!(
            root.append_reply(1, &child_uuid, carried),
            Err(TreeError::TooDeep { level: 2 })
        );

        let mut skewed = reply(&a, "level one", 0);
        skewed.comments.push(reply(&a, "wrongly placed", 0));
        assert_eq!(
            root.append_reply(0, &root.uuid, skewed),
            Err(TreeError::LevelMismatch { expected: 2, found: 1 })
        );
    }

    #[test]
    fn append_reply_rejects_wrong_target() {
        let a = user("🐟");
        let root = post(&a, "root");
        assert!(matches!(
            root.append_reply(0, "missing", reply(&a, "x", 0)),
            Err(TreeError::TargetNotFound { .. })
        ));
        assert!(matches!(
            root.append_reply(1, &root.uuid, reply(&a, "x", 1)),
            Err(TreeError::LevelMismatch { expected: 1, found: 0 })
        ));
        assert!(matches!(
            root.append_reply(0, &root.uuid, reply(&a, "x", 1)),
            Err(TreeError::LevelMismatch { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn set_vote_reaches_nested_nodes() {
        let (a, voter) = (user("🐟"), user("🦊"));
        let mut root = post(&a, "root");
        let mut child = reply(&a, "child", 0);
        let grandchild = reply(&a, "grandchild", 1);
        let target = grandchild.uuid.clone();
        child.comments.push(grandchild);
        root.comments.push(child);

        let voted = root
            .set_vote(&target, Vote::new(voter.uuid.clone(), -1, Utc::now()).unwrap())
            .unwrap();
        assert_eq!(voted.comments[0].comments[0].score(), 0);
        let revoted = voted
            .set_vote(&target, Vote::new(voter.uuid.clone(), 1, Utc::now()).unwrap())
            .unwrap();
        let node = &revoted.comments[0].comments[0];
        assert_eq!(node.votes.len(), 2);
        assert_eq!(node.score(), 2);
    }

    #[test]
    fn anonymous_numbers_start_at_one() {
        let (a, b, c) = (user("🐟"), user("🦊"), user("🐢"));
        let root = post(&a, "root");

        let root = root.with_anonymous_number(&b.uuid);
        assert_eq!(root.anonymous_number(&b.uuid), Some(1));
        let root = root.with_anonymous_number(&b.uuid);
        assert_eq!(root.anonymous_identifier_table.len(), 1);

        let root = root.with_anonymous_number(&a.uuid);
        assert_eq!(root.anonymous_number(&a.uuid), Some(0));
        let root = root.with_anonymous_number(&c.uuid);
        assert_eq!(root.anonymous_number(&c.uuid), Some(2));
    }

    #[test]
    fn arena_tracks_parents_and_depths() {
        let a = user("🐟");
        let mut root = post(&a, "root");
        let mut child = reply(&a, "child", 0);
        let grandchild = reply(&a, "grandchild", 1);
        let g_uuid = grandchild.uuid.clone();
        child.comments.push(grandchild);
        root.comments.push(child.clone());

        let thread = Thread::from_post(&root);
        assert_eq!(thread.len(), 3);
        let g = thread.find(&g_uuid).unwrap();
        assert_eq!(thread.depth(g), 2);
        assert_eq!(thread.ancestors(g).len(), 2);
        assert_eq!(thread.post(thread.parent(g).unwrap()).uuid, child.uuid);
        assert!(thread.post(thread.root()).comments.is_empty());
        assert_eq!(thread.into_post(), root);
    }
}
