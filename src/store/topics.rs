// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Topic operations.
//!
//! A topic always owns at least its first post. Creating, moving and
//! deleting topics carries the owning category's counters along in the same
//! call, so the category never observes a half-applied change.

use chrono::Utc;

use super::{require_text, Store, StoreError, StoreResult};
use crate::models::{
    slugify, Archetype, BasicUser, NewTopic, Post, Topic, TopicStatus, TopicUpdate, TopicView,
};

/// Lowercase, dash-joined, de-duplicated tag names in first-seen order.
pub(super) fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let name = tag
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
            .to_lowercase();
        if !name.is_empty() && !normalized.contains(&name) {
            normalized.push(name);
        }
    }
    normalized
}

fn fancy_title(title: &str) -> String {
    title
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl Store {
    fn ensure_topic_external_id_free(
        &self,
        external_id: &str,
        owner: Option<i64>,
    ) -> StoreResult<()> {
        match self.topics_by_external_id.get(external_id) {
            Some(&id) if Some(id) != owner => Err(StoreError::Conflict(format!(
                "Topic external id {external_id} is already in use"
            ))),
            _ => Ok(()),
        }
    }

    /// First post of the topic, whose author is the topic creator.
    pub(super) fn topic_creator(&self, topic_id: i64) -> Option<&Post> {
        self.posts_by_topic
            .get(&topic_id)
            .and_then(|ids| ids.first())
            .and_then(|id| self.posts.get(id))
    }

    fn public_topics(&self) -> impl Iterator<Item = &Topic> {
        self.topics
            .values()
            .filter(|t| t.archetype == Archetype::Regular && t.visible)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn get_topic(&self, id: i64) -> StoreResult<Topic> {
        self.topic_ref(id).cloned()
    }

    /// The topic with its posts in `post_number` order, creator and last
    /// poster.
    pub fn get_topic_view(&self, id: i64) -> StoreResult<TopicView> {
        let topic = self.topic_ref(id)?.clone();
        let posts = self.topic_posts(id, None)?;
        let created_by = self
            .topic_creator(id)
            .and_then(|post| self.users.get(&post.user_id))
            .map(BasicUser::from);
        let last_poster = posts
            .last()
            .and_then(|post| self.users.get(&post.user_id))
            .map(BasicUser::from);
        Ok(TopicView {
            topic,
            posts,
            created_by,
            last_poster,
        })
    }

    pub fn get_topic_by_external_id(&self, external_id: &str) -> StoreResult<Topic> {
        self.topics_by_external_id
            .get(external_id)
            .and_then(|id| self.topics.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Topic with external id {external_id}")))
    }

    /// Lowest topic id carrying `slug`.
    pub fn topic_id_for_slug(&self, slug: &str) -> StoreResult<i64> {
        self.topics
            .values()
            .find(|t| t.slug == slug)
            .map(|t| t.id)
            .ok_or_else(|| StoreError::NotFound(format!("Topic {slug}")))
    }

    /// Every topic, private messages included.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Public topics, most recently bumped first. Private messages and
    /// unlisted topics are excluded.
    pub fn latest_topics(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self.public_topics().cloned().collect();
        topics.sort_by(|a, b| b.bumped_at.cmp(&a.bumped_at).then(b.id.cmp(&a.id)));
        topics
    }

    /// Most viewed and liked public topics.
    pub fn top_topics(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self.public_topics().cloned().collect();
        topics.sort_by(|a, b| {
            (b.like_count + b.views, b.posts_count)
                .cmp(&(a.like_count + a.views, a.posts_count))
                .then(a.id.cmp(&b.id))
        });
        topics
    }

    pub fn topics_by_category(&self, category_id: i64) -> StoreResult<Vec<Topic>> {
        self.category_ref(category_id)?;
        Ok(self
            .public_topics()
            .filter(|t| t.category_id == Some(category_id))
            .cloned()
            .collect())
    }

    /// Public topics whose first post was written by `username`.
    pub fn topics_by_creator(&self, username: &str) -> Vec<Topic> {
        self.public_topics()
            .filter(|t| {
                self.topic_creator(t.id)
                    .is_some_and(|p| p.username.eq_ignore_ascii_case(username))
            })
            .cloned()
            .collect()
    }

    pub fn topics_by_tag(&self, tag: &str) -> Vec<Topic> {
        let tag = tag.to_lowercase();
        self.public_topics()
            .filter(|t| t.tags.contains(&tag))
            .cloned()
            .collect()
    }

    /// Private message threads `username` has posted in.
    pub fn private_messages(&self, username: &str) -> Vec<Topic> {
        self.private_messages_where(|posts| {
            posts.iter().any(|p| p.username.eq_ignore_ascii_case(username))
        })
    }

    /// Private message threads `username` started.
    pub fn sent_private_messages(&self, username: &str) -> Vec<Topic> {
        self.private_messages_where(|posts| {
            posts
                .first()
                .is_some_and(|p| p.username.eq_ignore_ascii_case(username))
        })
    }

    fn private_messages_where(&self, keep: impl Fn(&[&Post]) -> bool) -> Vec<Topic> {
        self.topics
            .values()
            .filter(|t| t.archetype == Archetype::PrivateMessage)
            .filter(|t| {
                let posts: Vec<&Post> = self
                    .posts_by_topic
                    .get(&t.id)
                    .into_iter()
                    .flatten()
                    .filter_map(|id| self.posts.get(id))
                    .collect();
                keep(&posts)
            })
            .cloned()
            .collect()
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Create a topic and its first post.
    ///
    /// `category_id: None` leaves the topic uncategorized; a category id that
    /// does not exist is `NotFound`.
    pub fn create_topic(&mut self, request: NewTopic) -> StoreResult<(Topic, Post)> {
        require_text("title", &request.title)?;
        require_text("raw", &request.raw)?;
        let author = self.user_ref(request.author_id)?.clone();
        if let Some(category_id) = request.category_id {
            self.category_ref(category_id)?;
        }
        if let Some(external_id) = &request.external_id {
            require_text("external_id", external_id)?;
            self.ensure_topic_external_id_free(external_id, None)?;
        }
        let tags = normalize_tags(&request.tags);

        let id = self.next_topic_id.next();
        let now = Utc::now();
        let title = request.title.trim().to_string();
        let topic = Topic {
            id,
            fancy_title: fancy_title(&title),
            slug: slugify(&title),
            title,
            category_id: request.category_id,
            archetype: request.archetype,
            posts_count: 0,
            reply_count: 0,
            highest_post_number: 0,
            like_count: 0,
            views: 0,
            tags: tags.clone(),
            external_id: request.external_id.clone(),
            visible: true,
            closed: false,
            archived: false,
            pinned: false,
            pinned_globally: false,
            last_poster_username: author.username.clone(),
            created_at: now,
            last_posted_at: now,
            bumped_at: now,
        };

        self.topics.insert(id, topic);
        self.posts_by_topic.insert(id, Vec::new());
        if let Some(external_id) = request.external_id {
            self.topics_by_external_id.insert(external_id, id);
        }
        self.adjust_category_counts(request.category_id, 1, 0);
        self.adjust_tag_counts(&[], &tags);
        let post = self.append_post(id, &author, request.raw, None)?;

        let topic = self.topic_ref(id)?.clone();
        tracing::debug!(topic_id = %id, category_id = ?topic.category_id, "topic created");
        Ok((topic, post))
    }

    /// Apply title, category, visibility and external id changes. Moving
    /// category moves the topic's counters with it.
    pub fn update_topic(&mut self, id: i64, update: TopicUpdate) -> StoreResult<Topic> {
        let mut topic = self.topic_ref(id)?.clone();
        if let Some(title) = &update.title {
            require_text("title", title)?;
        }
        if let Some(category_id) = update.category_id {
            self.category_ref(category_id)?;
        }
        if let Some(external_id) = &update.external_id {
            require_text("external_id", external_id)?;
            self.ensure_topic_external_id_free(external_id, Some(id))?;
        }

        if let Some(title) = update.title {
            let title = title.trim().to_string();
            topic.slug = slugify(&title);
            topic.fancy_title = fancy_title(&title);
            topic.title = title;
        }
        if let Some(category_id) = update.category_id {
            if topic.category_id != Some(category_id) {
                self.adjust_category_counts(topic.category_id, -1, -topic.posts_count);
                self.adjust_category_counts(Some(category_id), 1, topic.posts_count);
                topic.category_id = Some(category_id);
            }
        }
        if let Some(visible) = update.visible {
            topic.visible = visible;
        }
        if let Some(external_id) = update.external_id {
            if let Some(previous) = &topic.external_id {
                self.topics_by_external_id.remove(previous);
            }
            self.topics_by_external_id.insert(external_id.clone(), id);
            topic.external_id = Some(external_id);
        }
        self.topics.insert(id, topic.clone());
        Ok(topic)
    }

    pub fn set_topic_status(
        &mut self,
        id: i64,
        status: TopicStatus,
        enabled: bool,
    ) -> StoreResult<Topic> {
        let topic = self
            .topics
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Topic {id}")))?;
        match status {
            TopicStatus::Closed => topic.closed = enabled,
            TopicStatus::Archived => topic.archived = enabled,
            TopicStatus::Pinned => topic.pinned = enabled,
            TopicStatus::PinnedGlobally => {
                topic.pinned_globally = enabled;
                topic.pinned = enabled;
            }
            TopicStatus::Visible => topic.visible = enabled,
        }
        Ok(topic.clone())
    }

    /// Replace the topic's tag set, keeping tag counters in step.
    pub fn set_topic_tags(&mut self, id: i64, tags: &[String]) -> StoreResult<Topic> {
        let previous = self.topic_ref(id)?.tags.clone();
        let tags = normalize_tags(tags);
        self.adjust_tag_counts(&previous, &tags);
        let topic = self
            .topics
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Topic {id}")))?;
        topic.tags = tags;
        Ok(topic.clone())
    }

    pub fn convert_topic(&mut self, id: i64, archetype: Archetype) -> StoreResult<Topic> {
        let topic = self
            .topics
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Topic {id}")))?;
        topic.archetype = archetype;
        Ok(topic.clone())
    }

    /// Move the bump date to now without touching posts.
    pub fn reset_bump_date(&mut self, id: i64) -> StoreResult<Topic> {
        let topic = self
            .topics
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Topic {id}")))?;
        topic.bumped_at = Utc::now();
        Ok(topic.clone())
    }

    /// Reassign posts of a topic to another user. Every post must belong to
    /// the topic.
    pub fn change_post_owner(
        &mut self,
        topic_id: i64,
        post_ids: &[i64],
        username: &str,
    ) -> StoreResult<Vec<Post>> {
        self.topic_ref(topic_id)?;
        let owner = self.get_user_by_username(username)?;
        for &post_id in post_ids {
            if self.post_ref(post_id)?.topic_id != topic_id {
                return Err(StoreError::Validation(format!(
                    "Post {post_id} does not belong to topic {topic_id}"
                )));
            }
        }

        let mut changed = Vec::with_capacity(post_ids.len());
        for post_id in post_ids {
            if let Some(post) = self.posts.get_mut(post_id) {
                post.user_id = owner.id;
                post.username = owner.username.clone();
                post.name = owner.name.clone();
                changed.push(post.clone());
            }
        }
        Ok(changed)
    }

    /// Remove a topic and all of its posts, taking their weight off the
    /// owning category.
    pub fn delete_topic(&mut self, id: i64) -> StoreResult<Topic> {
        let topic = self.topic_ref(id)?.clone();
        let post_ids = self.posts_by_topic.remove(&id).unwrap_or_default();

        self.adjust_category_counts(topic.category_id, -1, -(post_ids.len() as i64));
        self.adjust_tag_counts(&topic.tags, &[]);
        for post_id in &post_ids {
            self.posts.remove(post_id);
            self.revisions.remove(post_id);
        }
        self.post_actions
            .retain(|_, action| !post_ids.contains(&action.post_id));
        self.notifications.retain(|_, n| n.topic_id != Some(id));
        if let Some(external_id) = &topic.external_id {
            self.topics_by_external_id.remove(external_id);
        }
        self.topics.remove(&id);

        tracing::info!(topic_id = %id, posts = post_ids.len(), "topic deleted");
        Ok(topic)
    }
}
