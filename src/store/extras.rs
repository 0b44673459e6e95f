// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secondary collections: tags, badges, notifications, invites, uploads,
//! post actions, site settings and search.

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{require_text, Store, StoreError, StoreResult};
use crate::models::{
    Archetype, Badge, BadgeUpdate, Invite, NewBadge, NewInvite, Notification, PostAction,
    SearchResult, SiteSetting, Tag, Upload, UserBadge, POST_ACTION_LIKE,
};

const INVITE_LIFETIME_DAYS: i64 = 7;

fn human_filesize(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    match bytes {
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{b} Bytes"),
    }
}

impl Store {
    // -------------------------------------------------------------------------
    // Tags
    // -------------------------------------------------------------------------

    /// Move tag counters from `old` to `new`, creating tags on first use.
    pub(super) fn adjust_tag_counts(&mut self, old: &[String], new: &[String]) {
        for name in old.iter().filter(|t| !new.contains(t)) {
            if let Some(tag) = self
                .tags_by_name
                .get(name)
                .and_then(|id| self.tags.get_mut(id))
            {
                tag.topic_count -= 1;
            }
        }
        for name in new.iter().filter(|t| !old.contains(t)) {
            let id = match self.tags_by_name.get(name) {
                Some(&id) => id,
                None => {
                    let id = self.next_tag_id.next();
                    self.tags.insert(
                        id,
                        Tag {
                            id,
                            name: name.clone(),
                            topic_count: 0,
                        },
                    );
                    self.tags_by_name.insert(name.clone(), id);
                    id
                }
            };
            if let Some(tag) = self.tags.get_mut(&id) {
                tag.topic_count += 1;
            }
        }
    }

    pub fn get_tag(&self, name: &str) -> StoreResult<Tag> {
        self.tags_by_name
            .get(&name.to_lowercase())
            .and_then(|id| self.tags.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Tag {name}")))
    }

    pub fn list_tags(&self) -> Vec<Tag> {
        self.tags.values().cloned().collect()
    }

    // -------------------------------------------------------------------------
    // Badges
    // -------------------------------------------------------------------------

    pub fn list_badges(&self) -> Vec<Badge> {
        self.badges.values().cloned().collect()
    }

    pub fn get_badge(&self, id: i64) -> StoreResult<Badge> {
        self.badges
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Badge {id}")))
    }

    fn ensure_badge_name_free(&self, name: &str, owner: Option<i64>) -> StoreResult<()> {
        if self
            .badges
            .values()
            .any(|b| b.name.eq_ignore_ascii_case(name) && Some(b.id) != owner)
        {
            Err(StoreError::Conflict(format!("Badge {name} already exists")))
        } else {
            Ok(())
        }
    }

    pub fn create_badge(&mut self, request: NewBadge) -> StoreResult<Badge> {
        let name = request.name.trim().to_string();
        require_text("name", &name)?;
        self.ensure_badge_name_free(&name, None)?;
        let id = self.next_badge_id.next();
        let badge = Badge {
            id,
            name,
            description: request.description.unwrap_or_default(),
            badge_type_id: request.badge_type_id.unwrap_or(3),
            grant_count: 0,
            enabled: true,
            system: false,
        };
        self.badges.insert(id, badge.clone());
        Ok(badge)
    }

    /// Seed badges are marked as system badges.
    pub(super) fn insert_system_badge(
        &mut self,
        name: &str,
        description: &str,
        badge_type_id: i64,
    ) -> StoreResult<Badge> {
        let mut badge = self.create_badge(NewBadge {
            name: name.into(),
            description: Some(description.into()),
            badge_type_id: Some(badge_type_id),
        })?;
        badge.system = true;
        self.badges.insert(badge.id, badge.clone());
        Ok(badge)
    }

    pub fn update_badge(&mut self, id: i64, update: BadgeUpdate) -> StoreResult<Badge> {
        let mut badge = self.get_badge(id)?;
        let new_name = update.name.map(|n| n.trim().to_string());
        if let Some(name) = &new_name {
            require_text("name", name)?;
            self.ensure_badge_name_free(name, Some(id))?;
        }
        if let Some(name) = new_name {
            badge.name = name;
        }
        if let Some(description) = update.description {
            badge.description = description;
        }
        if let Some(enabled) = update.enabled {
            badge.enabled = enabled;
        }
        self.badges.insert(id, badge.clone());
        Ok(badge)
    }

    /// Delete a badge and every grant of it. System badges are permanent.
    pub fn delete_badge(&mut self, id: i64) -> StoreResult<Badge> {
        let badge = self.get_badge(id)?;
        if badge.system {
            return Err(StoreError::Validation(format!(
                "{} is a system badge and cannot be deleted",
                badge.name
            )));
        }
        self.badges.remove(&id);
        self.user_badges.retain(|_, grant| grant.badge_id != id);
        Ok(badge)
    }

    pub fn grant_badge(
        &mut self,
        user_id: i64,
        badge_id: i64,
        granted_by_id: i64,
    ) -> StoreResult<UserBadge> {
        self.user_ref(user_id)?;
        let badge = self.get_badge(badge_id)?;
        if !badge.enabled {
            return Err(StoreError::Validation(format!("Badge {} is disabled", badge.name)));
        }
        if self
            .user_badges
            .values()
            .any(|g| g.user_id == user_id && g.badge_id == badge_id)
        {
            return Err(StoreError::Conflict(format!(
                "User {user_id} already has badge {}",
                badge.name
            )));
        }
        let id = self.next_user_badge_id.next();
        let grant = UserBadge {
            id,
            badge_id,
            user_id,
            granted_by_id,
            granted_at: Utc::now(),
        };
        self.user_badges.insert(id, grant.clone());
        if let Some(badge) = self.badges.get_mut(&badge_id) {
            badge.grant_count += 1;
        }
        Ok(grant)
    }

    pub fn revoke_user_badge(&mut self, user_badge_id: i64) -> StoreResult<UserBadge> {
        let grant = self
            .user_badges
            .remove(&user_badge_id)
            .ok_or_else(|| StoreError::NotFound(format!("User badge {user_badge_id}")))?;
        if let Some(badge) = self.badges.get_mut(&grant.badge_id) {
            badge.grant_count -= 1;
        }
        Ok(grant)
    }

    /// Badges held by a user together with the grant records.
    pub fn user_badges(&self, username: &str) -> StoreResult<(Vec<Badge>, Vec<UserBadge>)> {
        let user = self.get_user_by_username(username)?;
        let grants: Vec<UserBadge> = self
            .user_badges
            .values()
            .filter(|g| g.user_id == user.id)
            .cloned()
            .collect();
        let badges = grants
            .iter()
            .filter_map(|g| self.badges.get(&g.badge_id))
            .cloned()
            .collect();
        Ok((badges, grants))
    }

    // -------------------------------------------------------------------------
    // Notifications
    // -------------------------------------------------------------------------

    /// A user's notifications, newest first.
    pub fn notifications_for(&self, user_id: i64) -> Vec<Notification> {
        self.notifications
            .values()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Mark one notification, or all of them when `id` is `None`, as read.
    /// Returns how many changed.
    pub fn mark_notifications_read(&mut self, user_id: i64, id: Option<i64>) -> StoreResult<usize> {
        self.user_ref(user_id)?;
        if let Some(id) = id {
            match self.notifications.get(&id) {
                Some(n) if n.user_id == user_id => {}
                _ => return Err(StoreError::NotFound(format!("Notification {id}"))),
            }
        }
        let mut changed = 0;
        for notification in self
            .notifications
            .values_mut()
            .filter(|n| n.user_id == user_id && id.is_none_or(|id| n.id == id))
        {
            if !notification.read {
                notification.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    // -------------------------------------------------------------------------
    // Invites
    // -------------------------------------------------------------------------

    pub fn create_invite(&mut self, request: NewInvite) -> StoreResult<Invite> {
        if let Some(email) = &request.email {
            if !email.contains('@') {
                return Err(StoreError::Validation(format!("{email} is not a valid email")));
            }
        }
        if let Some(topic_id) = request.topic_id {
            self.topic_ref(topic_id)?;
        }
        for &group_id in &request.group_ids {
            self.group_ref(group_id)?;
        }
        let id = self.next_invite_id.next();
        let now = Utc::now();
        let invite = Invite {
            id,
            link: format!("/invites/{}", Uuid::new_v4().simple()),
            max_redemptions_allowed: if request.email.is_some() { 1 } else { 10 },
            email: request.email,
            topic_id: request.topic_id,
            group_ids: request.group_ids,
            redemption_count: 0,
            created_at: now,
            expires_at: now + Duration::days(INVITE_LIFETIME_DAYS),
        };
        self.invites.insert(id, invite.clone());
        Ok(invite)
    }

    pub fn get_invite(&self, id: i64) -> StoreResult<Invite> {
        self.invites
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Invite {id}")))
    }

    pub fn list_invites(&self) -> Vec<Invite> {
        self.invites.values().cloned().collect()
    }

    pub fn delete_invite(&mut self, id: i64) -> StoreResult<Invite> {
        self.invites
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Invite {id}")))
    }

    // -------------------------------------------------------------------------
    // Uploads
    // -------------------------------------------------------------------------

    pub fn create_upload(&mut self, filename: &str, filesize: u64) -> StoreResult<Upload> {
        require_text("file", filename)?;
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        let id = self.next_upload_id.next();
        let sha = Uuid::new_v4().simple().to_string();
        let upload = Upload {
            id,
            original_filename: filename.to_string(),
            url: format!("/uploads/default/original/1X/{sha}.{extension}"),
            short_url: format!("upload://{sha}.{extension}"),
            extension,
            filesize,
            human_filesize: human_filesize(filesize),
        };
        self.uploads.insert(id, upload.clone());
        Ok(upload)
    }

    pub fn get_upload(&self, id: i64) -> StoreResult<Upload> {
        self.uploads
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Upload {id}")))
    }

    // -------------------------------------------------------------------------
    // Post actions
    // -------------------------------------------------------------------------

    /// Record an action (like, flag, ...) by a user on a post. Likes raise
    /// the post's and topic's `like_count`.
    pub fn create_post_action(
        &mut self,
        post_id: i64,
        user_id: i64,
        action_type: i32,
    ) -> StoreResult<PostAction> {
        let topic_id = self.post_ref(post_id)?.topic_id;
        self.user_ref(user_id)?;
        if self.post_actions.values().any(|a| {
            a.post_id == post_id && a.user_id == user_id && a.post_action_type_id == action_type
        }) {
            return Err(StoreError::Conflict(format!(
                "User {user_id} already performed action {action_type} on post {post_id}"
            )));
        }
        let id = self.next_post_action_id.next();
        let action = PostAction {
            id,
            post_id,
            user_id,
            post_action_type_id: action_type,
        };
        self.post_actions.insert(id, action.clone());
        if action_type == POST_ACTION_LIKE {
            self.adjust_likes(post_id, topic_id, 1);
        }
        Ok(action)
    }

    pub fn delete_post_action(
        &mut self,
        post_id: i64,
        user_id: i64,
        action_type: i32,
    ) -> StoreResult<PostAction> {
        let topic_id = self.post_ref(post_id)?.topic_id;
        let id = self
            .post_actions
            .values()
            .find(|a| {
                a.post_id == post_id && a.user_id == user_id && a.post_action_type_id == action_type
            })
            .map(|a| a.id)
            .ok_or_else(|| {
                StoreError::NotFound(format!("Action {action_type} on post {post_id}"))
            })?;
        let action = self
            .post_actions
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Post action {id}")))?;
        if action_type == POST_ACTION_LIKE {
            self.adjust_likes(post_id, topic_id, -1);
        }
        Ok(action)
    }

    fn adjust_likes(&mut self, post_id: i64, topic_id: i64, delta: i64) {
        if let Some(post) = self.posts.get_mut(&post_id) {
            post.like_count += delta;
        }
        if let Some(topic) = self.topics.get_mut(&topic_id) {
            topic.like_count += delta;
        }
    }

    // -------------------------------------------------------------------------
    // Site settings
    // -------------------------------------------------------------------------

    pub(super) fn insert_site_setting(&mut self, name: &str, default: serde_json::Value) {
        self.site_settings.insert(
            name.to_string(),
            SiteSetting {
                setting: name.to_string(),
                value: default.clone(),
                default,
            },
        );
    }

    /// All settings, ordered by name.
    pub fn list_site_settings(&self) -> Vec<SiteSetting> {
        self.site_settings.values().cloned().collect()
    }

    /// Replace a known setting's value. The default is left alone.
    pub fn update_site_setting(
        &mut self,
        name: &str,
        value: serde_json::Value,
    ) -> StoreResult<SiteSetting> {
        let setting = self
            .site_settings
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(format!("Site setting {name}")))?;
        setting.value = value;
        Ok(setting.clone())
    }

    // -------------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------------

    /// Case-insensitive substring search over post text and topic titles.
    /// Private messages never match.
    pub fn search(&self, term: &str) -> StoreResult<SearchResult> {
        let term = term.trim().to_lowercase();
        require_text("term", &term)?;
        let is_public = |topic_id: i64| {
            self.topics
                .get(&topic_id)
                .is_some_and(|t| t.archetype == Archetype::Regular)
        };
        let posts = self
            .posts
            .values()
            .filter(|p| is_public(p.topic_id) && p.raw.to_lowercase().contains(&term))
            .cloned()
            .collect();
        let topics = self
            .topics
            .values()
            .filter(|t| is_public(t.id) && t.title.to_lowercase().contains(&term))
            .cloned()
            .collect();
        Ok(SearchResult { posts, topics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewPost, NewTopic, NewUser};

    fn store_with_topic() -> (Store, i64, i64, i64) {
        let mut store = Store::new();
        let user = store
            .create_user(NewUser {
                username: "liker".into(),
                email: "liker@example.com".into(),
                ..Default::default()
            })
            .unwrap()
            .id;
        let (topic, post) = store
            .create_topic(NewTopic {
                title: "Searchable Title".into(),
                raw: "The quick brown fox".into(),
                author_id: user,
                ..Default::default()
            })
            .unwrap();
        (store, user, topic.id, post.id)
    }

    #[test]
    fn likes_maintain_post_and_topic_counts() {
        let (mut store, user, topic, post) = store_with_topic();
        store.create_post_action(post, user, POST_ACTION_LIKE).unwrap();
        assert!(matches!(
            store.create_post_action(post, user, POST_ACTION_LIKE),
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(store.get_post(post).unwrap().like_count, 1);
        assert_eq!(store.get_topic(topic).unwrap().like_count, 1);

        store.delete_post_action(post, user, POST_ACTION_LIKE).unwrap();
        assert_eq!(store.get_post(post).unwrap().like_count, 0);
        assert_eq!(store.get_topic(topic).unwrap().like_count, 0);
    }

    #[test]
    fn deleting_a_liked_reply_takes_its_likes_off_the_topic() {
        let (mut store, user, topic, _) = store_with_topic();
        let reply = store
            .create_post(NewPost {
                topic_id: topic,
                raw: "reply".into(),
                author_id: user,
                reply_to_post_number: None,
            })
            .unwrap();
        store.create_post_action(reply.id, user, POST_ACTION_LIKE).unwrap();
        store.delete_post(reply.id).unwrap();
        assert_eq!(store.get_topic(topic).unwrap().like_count, 0);
    }

    #[test]
    fn badge_grants_are_counted() {
        let (mut store, user, _, _) = store_with_topic();
        let badge = store
            .create_badge(NewBadge {
                name: "Helper".into(),
                ..Default::default()
            })
            .unwrap();
        let grant = store.grant_badge(user, badge.id, -1).unwrap();
        assert!(matches!(
            store.grant_badge(user, badge.id, -1),
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(store.get_badge(badge.id).unwrap().grant_count, 1);

        let (badges, grants) = store.user_badges("liker").unwrap();
        assert_eq!(badges[0].name, "Helper");
        assert_eq!(grants[0].id, grant.id);

        store.revoke_user_badge(grant.id).unwrap();
        assert_eq!(store.get_badge(badge.id).unwrap().grant_count, 0);
    }

    #[test]
    fn invites_validate_references() {
        let (mut store, _, topic, _) = store_with_topic();
        let invite = store
            .create_invite(NewInvite {
                email: Some("friend@example.com".into()),
                topic_id: Some(topic),
                group_ids: vec![],
            })
            .unwrap();
        assert_eq!(store.get_invite(invite.id).unwrap(), invite);
        assert_eq!(invite.max_redemptions_allowed, 1);
        assert!(invite.link.starts_with("/invites/"));

        let missing_group = store.create_invite(NewInvite {
            group_ids: vec![77],
            ..Default::default()
        });
        assert!(matches!(missing_group, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn search_matches_posts_and_titles() {
        let (store, _, topic, post) = store_with_topic();
        let result = store.search("QUICK").unwrap();
        assert_eq!(result.posts.len(), 1);
        assert_eq!(result.posts[0].id, post);
        assert!(result.topics.is_empty());

        let result = store.search("searchable").unwrap();
        assert_eq!(result.topics[0].id, topic);
        assert!(matches!(store.search("  "), Err(StoreError::Validation(_))));
    }

    #[test]
    fn site_settings_update_in_place() {
        let mut store = Store::new();
        store.insert_site_setting("min_post_length", serde_json::json!(10));

        let updated = store
            .update_site_setting("min_post_length", serde_json::json!(20))
            .unwrap();
        assert_eq!(updated.value, serde_json::json!(20));
        assert_eq!(updated.default, serde_json::json!(10));
        assert_eq!(store.list_site_settings(), vec![updated]);

        let unknown = store.update_site_setting("no_such_setting", serde_json::json!(true));
        assert!(matches!(unknown, Err(StoreError::NotFound(_))));
        assert_eq!(store.list_site_settings().len(), 1);
    }

    #[test]
    fn uploads_derive_extension_and_size() {
        let mut store = Store::new();
        let upload = store.create_upload("Photo.PNG", 2048).unwrap();
        assert_eq!(upload.extension, "png");
        assert_eq!(upload.human_filesize, "2.0 KB");
        assert_eq!(store.get_upload(upload.id).unwrap(), upload);
    }

    #[test]
    fn marking_notifications_read() {
        let (mut store, author, topic, _) = store_with_topic();
        let other = store
            .create_user(NewUser {
                username: "other".into(),
                email: "other@example.com".into(),
                ..Default::default()
            })
            .unwrap()
            .id;
        store
            .create_post(NewPost {
                topic_id: topic,
                raw: "ping".into(),
                author_id: other,
                reply_to_post_number: Some(1),
            })
            .unwrap();
        assert_eq!(store.mark_notifications_read(author, None).unwrap(), 1);
        assert_eq!(store.mark_notifications_read(author, None).unwrap(), 0);
        assert!(store.notifications_for(author)[0].read);
    }
}
