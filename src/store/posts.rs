// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Post operations.
//!
//! `post_number` is allocated as `highest_post_number + 1` under the store
//! lock, so numbers within a topic are unique and gap-free while posts are
//! only appended. The first post of a topic is never deleted on its own;
//! delete the topic instead.

use std::collections::HashSet;

use chrono::Utc;

use super::{require_text, Store, StoreError, StoreResult};
use crate::models::{
    cook, Archetype, NewPost, Notification, Post, PostRevision, User, NOTIFICATION_REPLIED,
    POST_ACTION_LIKE,
};

/// Boolean moderation flags on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFlag {
    Wiki,
    Locked,
    Hidden,
}

impl Store {
    fn post_id_by_number(&self, topic_id: i64, post_number: i64) -> Option<i64> {
        self.posts_by_topic
            .get(&topic_id)?
            .iter()
            .copied()
            .find(|id| {
                self.posts
                    .get(id)
                    .is_some_and(|p| p.post_number == post_number)
            })
    }

    /// Append a post to an existing topic and carry every derived counter.
    /// Callers validate the author and reply target beforehand.
    pub(super) fn append_post(
        &mut self,
        topic_id: i64,
        author: &User,
        raw: String,
        reply_to_post_number: Option<i64>,
    ) -> StoreResult<Post> {
        let now = Utc::now();
        let creator_id = self.topic_creator(topic_id).map(|p| p.user_id);
        let topic = self
            .topics
            .get_mut(&topic_id)
            .ok_or_else(|| StoreError::NotFound(format!("Topic {topic_id}")))?;
        topic.highest_post_number += 1;
        topic.posts_count += 1;
        topic.reply_count = topic.posts_count - 1;
        topic.last_posted_at = now;
        topic.bumped_at = now;
        topic.last_poster_username = author.username.clone();
        let post_number = topic.highest_post_number;
        let category_id = topic.category_id;
        let slug = topic.slug.clone();

        let id = self.next_post_id.next();
        let post = Post {
            id,
            topic_id,
            post_number,
            user_id: author.id,
            username: author.username.clone(),
            name: author.name.clone(),
            cooked: cook(&raw),
            raw,
            version: 1,
            reply_to_post_number,
            reply_count: 0,
            like_count: 0,
            wiki: false,
            locked: false,
            hidden: false,
            created_at: now,
            updated_at: now,
        };
        self.posts.insert(id, post.clone());
        self.posts_by_topic.entry(topic_id).or_default().push(id);
        self.adjust_category_counts(category_id, 0, 1);

        if let Some(parent) =
            reply_to_post_number.and_then(|n| self.post_id_by_number(topic_id, n))
        {
            if let Some(parent) = self.posts.get_mut(&parent) {
                parent.reply_count += 1;
            }
        }

        if let Some(creator_id) = creator_id.filter(|&c| c != author.id) {
            let notification_id = self.next_notification_id.next();
            self.notifications.insert(
                notification_id,
                Notification {
                    id: notification_id,
                    user_id: creator_id,
                    notification_type: NOTIFICATION_REPLIED,
                    read: false,
                    topic_id: Some(topic_id),
                    post_number: Some(post_number),
                    slug: Some(slug),
                    created_at: now,
                },
            );
        }
        Ok(post)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn get_post(&self, id: i64) -> StoreResult<Post> {
        self.post_ref(id).cloned()
    }

    pub fn get_post_by_number(&self, topic_id: i64, post_number: i64) -> StoreResult<Post> {
        self.topic_ref(topic_id)?;
        self.post_id_by_number(topic_id, post_number)
            .and_then(|id| self.posts.get(&id))
            .cloned()
            .ok_or_else(|| {
                StoreError::NotFound(format!("Post {post_number} in topic {topic_id}"))
            })
    }

    /// Posts of a topic in `post_number` order, optionally restricted to the
    /// given post ids.
    pub fn topic_posts(&self, topic_id: i64, only: Option<&[i64]>) -> StoreResult<Vec<Post>> {
        self.topic_ref(topic_id)?;
        Ok(self
            .posts_by_topic
            .get(&topic_id)
            .into_iter()
            .flatten()
            .filter(|id| only.is_none_or(|ids| ids.contains(id)))
            .filter_map(|id| self.posts.get(id))
            .cloned()
            .collect())
    }

    pub fn topic_post_ids(&self, topic_id: i64) -> StoreResult<Vec<i64>> {
        self.topic_ref(topic_id)?;
        Ok(self.posts_by_topic.get(&topic_id).cloned().unwrap_or_default())
    }

    /// Newest posts across public topics.
    pub fn latest_posts(&self, limit: usize) -> Vec<Post> {
        self.posts
            .values()
            .rev()
            .filter(|p| {
                self.topics
                    .get(&p.topic_id)
                    .is_some_and(|t| t.archetype == Archetype::Regular)
            })
            .take(limit)
            .cloned()
            .collect()
    }

    /// Direct replies to a post.
    pub fn post_replies(&self, id: i64) -> StoreResult<Vec<Post>> {
        let post = self.post_ref(id)?;
        Ok(self
            .topic_posts(post.topic_id, None)?
            .into_iter()
            .filter(|p| p.reply_to_post_number == Some(post.post_number))
            .collect())
    }

    /// Ids of every post in the reply tree below `id`, breadth first.
    pub fn post_reply_ids(&self, id: i64) -> StoreResult<Vec<i64>> {
        let post = self.post_ref(id)?;
        let posts = self.topic_posts(post.topic_id, None)?;
        let mut frontier = vec![post.post_number];
        let mut ids = Vec::new();
        while let Some(number) = frontier.pop() {
            for reply in posts
                .iter()
                .filter(|p| p.reply_to_post_number == Some(number))
            {
                if !ids.contains(&reply.id) {
                    ids.push(reply.id);
                    frontier.insert(0, reply.post_number);
                }
            }
        }
        Ok(ids)
    }

    /// Ancestors of a post, oldest first.
    pub fn post_reply_history(&self, id: i64) -> StoreResult<Vec<Post>> {
        let post = self.post_ref(id)?;
        let mut history = Vec::new();
        let mut seen = HashSet::new();
        let mut next = post.reply_to_post_number;
        while let Some(number) = next {
            if !seen.insert(number) {
                break;
            }
            match self.post_id_by_number(post.topic_id, number) {
                Some(parent_id) => {
                    let parent = self.post_ref(parent_id)?;
                    next = parent.reply_to_post_number;
                    history.push(parent.clone());
                }
                None => break,
            }
        }
        history.reverse();
        Ok(history)
    }

    /// A recorded revision: the latest when `number` is `None`.
    pub fn post_revision(&self, post_id: i64, number: Option<i64>) -> StoreResult<PostRevision> {
        self.post_ref(post_id)?;
        let revisions = self.revisions.get(&post_id);
        let found = match number {
            Some(n) => revisions.and_then(|r| r.iter().find(|rev| rev.number == n)),
            None => revisions.and_then(|r| r.last()),
        };
        found.cloned().ok_or_else(|| match number {
            Some(n) => StoreError::NotFound(format!("Revision {n} of post {post_id}")),
            None => StoreError::NotFound(format!("Revisions of post {post_id}")),
        })
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    pub fn create_post(&mut self, request: NewPost) -> StoreResult<Post> {
        require_text("raw", &request.raw)?;
        self.topic_ref(request.topic_id)?;
        let author = self.user_ref(request.author_id)?.clone();
        if let Some(number) = request.reply_to_post_number {
            if self.post_id_by_number(request.topic_id, number).is_none() {
                return Err(StoreError::Validation(format!(
                    "reply_to_post_number {number} does not exist in topic {}",
                    request.topic_id
                )));
            }
        }
        self.append_post(
            request.topic_id,
            &author,
            request.raw,
            request.reply_to_post_number,
        )
    }

    /// Replace the raw text, bump `version` and record the revision.
    /// Submitting identical text is a no-op.
    pub fn update_post(&mut self, id: i64, raw: &str) -> StoreResult<Post> {
        require_text("raw", raw)?;
        let post = self
            .posts
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Post {id}")))?;
        if post.raw == raw {
            return Ok(post.clone());
        }
        let now = Utc::now();
        let revision = PostRevision {
            post_id: id,
            number: post.version + 1,
            previous_raw: std::mem::replace(&mut post.raw, raw.to_string()),
            current_raw: raw.to_string(),
            created_at: now,
        };
        post.cooked = cook(raw);
        post.version += 1;
        post.updated_at = now;
        let updated = post.clone();
        self.revisions.entry(id).or_default().push(revision);
        Ok(updated)
    }

    /// Restore the text a revision replaced, recorded as a new edit.
    pub fn revert_post(&mut self, post_id: i64, revision: i64) -> StoreResult<Post> {
        let previous = self.post_revision(post_id, Some(revision))?.previous_raw;
        self.update_post(post_id, &previous)
    }

    pub fn set_post_flag(&mut self, id: i64, flag: PostFlag, enabled: bool) -> StoreResult<Post> {
        let post = self
            .posts
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Post {id}")))?;
        match flag {
            PostFlag::Wiki => post.wiki = enabled,
            PostFlag::Locked => post.locked = enabled,
            PostFlag::Hidden => post.hidden = enabled,
        }
        Ok(post.clone())
    }

    fn ensure_deletable(&self, id: i64) -> StoreResult<&Post> {
        let post = self.post_ref(id)?;
        if post.post_number == 1 {
            return Err(StoreError::Validation(format!(
                "Post {id} is the first post of topic {}; delete the topic instead",
                post.topic_id
            )));
        }
        Ok(post)
    }

    /// Remove a reply and take it off every derived counter.
    pub fn delete_post(&mut self, id: i64) -> StoreResult<Post> {
        let post = self.ensure_deletable(id)?.clone();
        let topic_id = post.topic_id;

        self.posts.remove(&id);
        self.revisions.remove(&id);
        let remaining = match self.posts_by_topic.get_mut(&topic_id) {
            Some(ids) => {
                ids.retain(|&p| p != id);
                ids.last().copied()
            }
            None => None,
        };
        let highest = remaining
            .and_then(|last| self.posts.get(&last))
            .map(|p| p.post_number)
            .unwrap_or(0);

        let likes_removed = self
            .post_actions
            .values()
            .filter(|a| a.post_id == id && a.post_action_type_id == POST_ACTION_LIKE)
            .count() as i64;
        self.post_actions.retain(|_, a| a.post_id != id);
        self.notifications.retain(|_, n| {
            !(n.topic_id == Some(topic_id) && n.post_number == Some(post.post_number))
        });

        if let Some(parent) = post
            .reply_to_post_number
            .and_then(|n| self.post_id_by_number(topic_id, n))
        {
            if let Some(parent) = self.posts.get_mut(&parent) {
                parent.reply_count = (parent.reply_count - 1).max(0);
            }
        }

        let category_id = match self.topics.get_mut(&topic_id) {
            Some(topic) => {
                topic.posts_count -= 1;
                topic.reply_count = (topic.posts_count - 1).max(0);
                topic.highest_post_number = highest;
                topic.like_count -= likes_removed;
                topic.category_id
            }
            None => None,
        };
        self.adjust_category_counts(category_id, 0, -1);

        tracing::info!(post_id = %id, topic_id = %topic_id, "post deleted");
        Ok(post)
    }

    /// Delete every listed post, or none if any is missing, repeated or a
    /// first post.
    pub fn delete_posts(&mut self, ids: &[i64]) -> StoreResult<Vec<Post>> {
        let mut seen = HashSet::new();
        for &id in ids {
            self.ensure_deletable(id)?;
            if !seen.insert(id) {
                return Err(StoreError::Validation(format!("Post {id} listed twice")));
            }
        }
        let mut deleted = Vec::with_capacity(ids.len());
        for &id in ids {
            deleted.push(self.delete_post(id)?);
        }
        Ok(deleted)
    }

    /// Fold several posts of one topic into the earliest of them. The
    /// others are deleted.
    pub fn merge_posts(&mut self, ids: &[i64]) -> StoreResult<Post> {
        if ids.len() < 2 {
            return Err(StoreError::Validation(
                "at least two posts are required to merge".into(),
            ));
        }
        let mut posts = Vec::with_capacity(ids.len());
        for &id in ids {
            posts.push(self.post_ref(id)?.clone());
        }
        let topic_id = posts[0].topic_id;
        if posts.iter().any(|p| p.topic_id != topic_id) {
            return Err(StoreError::Validation(
                "posts to merge must belong to the same topic".into(),
            ));
        }
        posts.sort_by_key(|p| p.post_number);
        posts.dedup_by_key(|p| p.id);

        let target = posts[0].id;
        let rest: Vec<i64> = posts[1..].iter().map(|p| p.id).collect();
        let merged_raw = posts
            .iter()
            .map(|p| p.raw.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        self.delete_posts(&rest)?;
        self.update_post(target, &merged_raw)
    }
}
