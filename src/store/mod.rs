// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relational Store
//!
//! Single owner of all forum state: users, categories, topics, posts,
//! groups and the secondary collections. Entities live in one arena of
//! id-keyed maps and refer to each other by integer id only.
//!
//! ## Consistency Model
//!
//! The store itself is a plain value with `&mut self` mutators. Callers wrap
//! it in one `tokio::sync::RwLock` (see [`AppState`](crate::state::AppState)),
//! so every mutation runs under a single exclusive lock and is linearizable.
//!
//! Each mutating operation validates everything first and only then touches
//! state. A failed operation therefore leaves the store exactly as it was.
//!
//! ## Invariants
//!
//! - Secondary indices (username, email, external id, slug, group name) hold
//!   an entry iff the primary record exists, under its current key
//! - `Category.topic_count` / `post_count` equal the counts over its topics,
//!   maintained incrementally
//! - `Topic.highest_post_number` is the max `post_number` of its posts and
//!   `posts_count` their count
//! - `Group.user_count == members.len()`
//!
//! Everything returned is a clone; callers never hold references into the
//! store.

mod categories;
mod extras;
mod groups;
mod posts;
mod seed;
mod topics;
mod users;

use std::collections::{BTreeMap, HashMap};

use crate::models::{
    Badge, Category, Group, Invite, Notification, Post, PostAction, PostRevision, SiteSetting,
    Tag, Topic, Upload, User, UserBadge,
};

pub use posts::PostFlag;
pub use seed::SYSTEM_USER_ID;
pub use users::UserListKind;

/// Errors produced by store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A referenced id, slug or name does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// A unique key is already taken.
    #[error("{0}")]
    Conflict(String),
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Monotonic id allocator.
#[derive(Debug, Clone, Copy)]
struct Sequence(i64);

impl Sequence {
    fn starting_at(first: i64) -> Self {
        Self(first)
    }

    fn next(&mut self) -> i64 {
        let id = self.0;
        self.0 += 1;
        id
    }

    /// Ensure the next allocated id is above `id`.
    fn bump_past(&mut self, id: i64) {
        if self.0 <= id {
            self.0 = id + 1;
        }
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

#[derive(Debug, Default)]
pub struct Store {
    users: BTreeMap<i64, User>,
    users_by_username: HashMap<String, i64>,
    users_by_email: HashMap<String, i64>,
    users_by_external_id: HashMap<String, i64>,

    categories: BTreeMap<i64, Category>,
    categories_by_slug: HashMap<String, i64>,

    topics: BTreeMap<i64, Topic>,
    topics_by_external_id: HashMap<String, i64>,

    posts: BTreeMap<i64, Post>,
    /// Post ids per topic, ordered by `post_number`.
    posts_by_topic: HashMap<i64, Vec<i64>>,
    revisions: HashMap<i64, Vec<PostRevision>>,

    groups: BTreeMap<i64, Group>,
    groups_by_name: HashMap<String, i64>,

    tags: BTreeMap<i64, Tag>,
    tags_by_name: HashMap<String, i64>,
    badges: BTreeMap<i64, Badge>,
    user_badges: BTreeMap<i64, UserBadge>,
    notifications: BTreeMap<i64, Notification>,
    invites: BTreeMap<i64, Invite>,
    uploads: BTreeMap<i64, Upload>,
    post_actions: BTreeMap<i64, PostAction>,
    site_settings: BTreeMap<String, SiteSetting>,

    next_user_id: Sequence,
    next_category_id: Sequence,
    next_topic_id: Sequence,
    next_post_id: Sequence,
    next_group_id: Sequence,
    next_tag_id: Sequence,
    next_badge_id: Sequence,
    next_user_badge_id: Sequence,
    next_notification_id: Sequence,
    next_invite_id: Sequence,
    next_upload_id: Sequence,
    next_post_action_id: Sequence,
}

impl Store {
    /// An empty store with no seed data.
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Shared lookups
    // -------------------------------------------------------------------------

    fn user_ref(&self, id: i64) -> StoreResult<&User> {
        self.users
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("User {id}")))
    }

    fn topic_ref(&self, id: i64) -> StoreResult<&Topic> {
        self.topics
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Topic {id}")))
    }

    fn post_ref(&self, id: i64) -> StoreResult<&Post> {
        self.posts
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Post {id}")))
    }

    fn category_ref(&self, id: i64) -> StoreResult<&Category> {
        self.categories
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Category {id}")))
    }

    fn group_ref(&self, id: i64) -> StoreResult<&Group> {
        self.groups
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Group {id}")))
    }

    /// Apply a delta to a category's derived counters. `None` is the
    /// uncategorized bucket and has no counters.
    fn adjust_category_counts(&mut self, category_id: Option<i64>, topics: i64, posts: i64) {
        if let Some(category) = category_id.and_then(|id| self.categories.get_mut(&id)) {
            category.topic_count += topics;
            category.post_count += posts;
        }
    }
}

/// Reject empty or whitespace-only required text.
fn require_text(field: &str, value: &str) -> StoreResult<()> {
    if value.trim().is_empty() {
        Err(StoreError::Validation(format!("{field} can't be blank")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_allocates_and_bumps() {
        let mut seq = Sequence::default();
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
        seq.bump_past(10);
        assert_eq!(seq.next(), 11);
        seq.bump_past(3);
        assert_eq!(seq.next(), 12);
    }

    #[test]
    fn require_text_rejects_blank() {
        assert!(require_text("raw", "hello").is_ok());
        assert_eq!(
            require_text("raw", "   "),
            Err(StoreError::Validation("raw can't be blank".into()))
        );
    }

    #[test]
    fn error_messages_name_the_entity() {
        assert_eq!(StoreError::NotFound("Topic 9".into()).to_string(), "Topic 9 not found");
    }
}
