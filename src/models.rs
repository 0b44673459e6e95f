// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Models
//!
//! Entity records owned by the [`Store`](crate::store::Store) and the input
//! structures its operations accept. Every record is handed out as an
//! independent clone; mutating a returned value never touches store state.
//!
//! ## Cross-References
//!
//! Entities refer to each other by integer id only (`Post::topic_id`,
//! `Topic::category_id`, `Group::members`). Author names copied onto posts
//! are denormalized strings, not live references.
//!
//! ## Model Categories
//!
//! - **Users**, **Categories**, **Topics**, **Posts**, **Groups**: the
//!   relational core with derived counters
//! - **Tags**, **Badges**, **Notifications**, **Invites**, **Uploads**,
//!   **Post actions**: secondary keyed collections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Users
// =============================================================================

/// A forum account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    /// Unique, compared case-insensitively.
    pub username: String,
    pub name: String,
    /// Unique, compared case-insensitively.
    pub email: String,
    pub avatar_template: String,
    pub active: bool,
    pub approved: bool,
    pub admin: bool,
    pub moderator: bool,
    /// 0 (new) through 4 (leader).
    pub trust_level: u8,
    pub suspended: bool,
    pub silenced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Identity-provider id, unique when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub primary_group_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Minimal user projection used in topic details and member listings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BasicUser {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub avatar_template: String,
}

impl From<&User> for BasicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            avatar_template: user.avatar_template.clone(),
        }
    }
}

/// Request to create a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Accepted for wire compatibility; never stored.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub approved: Option<bool>,
    #[serde(default)]
    pub external_id: Option<String>,
}

/// Partial user update. Only the fields present are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub title: Option<String>,
    pub trust_level: Option<u8>,
    pub active: Option<bool>,
    pub admin: Option<bool>,
    pub moderator: Option<bool>,
    pub suspended: Option<bool>,
    pub silenced: Option<bool>,
}

/// Administrative state change on a single user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    Approve,
    Activate,
    Deactivate,
    GrantAdmin,
    RevokeAdmin,
    GrantModeration,
    RevokeModeration,
    TrustLevel(u8),
    Suspend,
    Unsuspend,
    Silence,
    Unsilence,
    Anonymize,
    PrimaryGroup(Option<i64>),
}

/// Identity fields delivered by a DiscourseConnect provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SsoIdentity {
    pub external_id: String,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

// =============================================================================
// Categories
// =============================================================================

/// A topic category. `topic_count` and `post_count` are derived counters.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Unique.
    pub slug: String,
    pub color: String,
    pub text_color: String,
    pub description: String,
    pub position: i64,
    pub parent_category_id: Option<i64>,
    pub topic_count: i64,
    pub post_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_category_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub description: Option<String>,
}

// =============================================================================
// Topics
// =============================================================================

/// Topic classification controlling visibility in public listings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    #[default]
    Regular,
    PrivateMessage,
}

/// A topic. `posts_count`, `reply_count` and `highest_post_number` track
/// the topic's current posts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    pub fancy_title: String,
    pub slug: String,
    pub category_id: Option<i64>,
    pub archetype: Archetype,
    pub posts_count: i64,
    pub reply_count: i64,
    pub highest_post_number: i64,
    pub like_count: i64,
    pub views: i64,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub visible: bool,
    pub closed: bool,
    pub archived: bool,
    pub pinned: bool,
    pub pinned_globally: bool,
    pub last_poster_username: String,
    pub created_at: DateTime<Utc>,
    pub last_posted_at: DateTime<Utc>,
    pub bumped_at: DateTime<Utc>,
}

/// A topic with its post stream and creator, as returned by a single-topic
/// lookup.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TopicView {
    #[serde(flatten)]
    pub topic: Topic,
    pub posts: Vec<Post>,
    pub created_by: Option<BasicUser>,
    pub last_poster: Option<BasicUser>,
}

/// Request to create a topic together with its first post.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NewTopic {
    pub title: String,
    pub raw: String,
    pub author_id: i64,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub archetype: Archetype,
    #[serde(default)]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TopicUpdate {
    pub title: Option<String>,
    pub category_id: Option<i64>,
    pub visible: Option<bool>,
    pub external_id: Option<String>,
}

/// Boolean topic flags settable through the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicStatus {
    Closed,
    Archived,
    Pinned,
    PinnedGlobally,
    Visible,
}

impl TopicStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "closed" => Some(Self::Closed),
            "archived" => Some(Self::Archived),
            "pinned" => Some(Self::Pinned),
            "pinned_globally" => Some(Self::PinnedGlobally),
            "visible" => Some(Self::Visible),
            _ => None,
        }
    }
}

// =============================================================================
// Posts
// =============================================================================

/// A post. `post_number` is unique within its topic, starting at 1.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Post {
    pub id: i64,
    pub topic_id: i64,
    pub post_number: i64,
    pub user_id: i64,
    /// Author name at posting time (denormalized).
    pub username: String,
    pub name: String,
    pub raw: String,
    pub cooked: String,
    /// Edit counter, starting at 1.
    pub version: i64,
    pub reply_to_post_number: Option<i64>,
    pub reply_count: i64,
    pub like_count: i64,
    pub wiki: bool,
    pub locked: bool,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to append a post to an existing topic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NewPost {
    pub topic_id: i64,
    pub raw: String,
    pub author_id: i64,
    #[serde(default)]
    pub reply_to_post_number: Option<i64>,
}

/// One recorded edit of a post.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PostRevision {
    pub post_id: i64,
    /// Matches the post `version` the edit produced (first edit is 2).
    pub number: i64,
    pub previous_raw: String,
    pub current_raw: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Groups
// =============================================================================

/// A user group. `user_count` mirrors `members.len()`; owners are a subset
/// of members.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    /// Unique.
    pub name: String,
    pub full_name: Option<String>,
    pub automatic: bool,
    pub visibility_level: i32,
    pub members: Vec<i64>,
    pub owners: Vec<i64>,
    pub user_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NewGroup {
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub visibility_level: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub visibility_level: Option<i32>,
}

// =============================================================================
// Secondary Collections
// =============================================================================

/// A tag. `topic_count` counts topics currently carrying it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub topic_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Badge {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub badge_type_id: i64,
    /// Number of current grants.
    pub grant_count: i64,
    pub enabled: bool,
    pub system: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NewBadge {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub badge_type_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BadgeUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserBadge {
    pub id: i64,
    pub badge_id: i64,
    pub user_id: i64,
    pub granted_by_id: i64,
    pub granted_at: DateTime<Utc>,
}

/// Notification type sent to a topic creator when someone replies.
pub const NOTIFICATION_REPLIED: i32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub notification_type: i32,
    pub read: bool,
    pub topic_id: Option<i64>,
    pub post_number: Option<i64>,
    pub slug: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Invite {
    pub id: i64,
    pub link: String,
    pub email: Option<String>,
    pub topic_id: Option<i64>,
    pub group_ids: Vec<i64>,
    pub max_redemptions_allowed: i64,
    pub redemption_count: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NewInvite {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub topic_id: Option<i64>,
    #[serde(default)]
    pub group_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Upload {
    pub id: i64,
    pub original_filename: String,
    pub extension: String,
    pub filesize: u64,
    pub url: String,
    pub short_url: String,
    pub human_filesize: String,
}

/// Post action type id for a like.
pub const POST_ACTION_LIKE: i32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PostAction {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub post_action_type_id: i32,
}

/// Full-text search hits over post bodies and public topic titles.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SearchResult {
    pub posts: Vec<Post>,
    pub topics: Vec<Topic>,
}

/// An admin-editable site setting. `default` is the seeded value and is
/// kept when the setting changes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct SiteSetting {
    pub setting: String,
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
    #[schema(value_type = Object)]
    pub default: serde_json::Value,
}

// =============================================================================
// Helpers
// =============================================================================

/// Derive a URL slug from a display title: lowercase, runs of
/// non-alphanumerics collapsed to a single `-`.
///
/// An all-digit slug would be read back as an id in `/t/{slug}/{id}` and
/// `/c/{slug}`, so it falls back to `topic` like an empty one.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() || slug.bytes().all(|b| b.is_ascii_digit()) {
        "topic".to_string()
    } else {
        slug
    }
}

/// Minimal markdown-to-HTML stand-in used for `cooked`.
pub fn cook(raw: &str) -> String {
    format!("<p>{raw}</p>")
}

pub fn avatar_template(username: &str) -> String {
    let letter = username
        .chars()
        .next()
        .map(|c| c.to_ascii_lowercase())
        .unwrap_or('x');
    format!("/letter_avatar_proxy/v4/letter/{letter}/b4e14e/{{size}}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Welcome to Discourse"), "welcome-to-discourse");
        assert_eq!(slugify("  How -- to use the API?! "), "how-to-use-the-api");
        assert_eq!(slugify("!!!"), "topic");
    }

    #[test]
    fn slugify_never_yields_a_numeric_slug() {
        assert_eq!(slugify("2024"), "topic");
        assert_eq!(slugify("2024 - 25"), "2024-25");
        assert_eq!(slugify("Release 2024"), "release-2024");
    }

    #[test]
    fn topic_status_parses_known_flags_only() {
        assert_eq!(TopicStatus::parse("closed"), Some(TopicStatus::Closed));
        assert_eq!(
            TopicStatus::parse("pinned_globally"),
            Some(TopicStatus::PinnedGlobally)
        );
        assert_eq!(TopicStatus::parse("banner"), None);
    }

    #[test]
    fn archetype_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&Archetype::PrivateMessage).unwrap();
        assert_eq!(json, r#""private_message""#);
    }

    #[test]
    fn avatar_template_uses_first_letter() {
        assert_eq!(
            avatar_template("Alice"),
            "/letter_avatar_proxy/v4/letter/a/b4e14e/{size}.png"
        );
    }
}
