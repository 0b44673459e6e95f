// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User operations.
//!
//! Usernames and emails are unique case-insensitively; external ids are
//! unique as given. All three indices are rewritten together whenever a
//! user's keys change.

use chrono::Utc;

use super::{require_text, Store, StoreError, StoreResult};
use crate::models::{
    avatar_template, AdminAction, NewUser, SsoIdentity, User, UserUpdate,
};

/// Filters accepted by the admin user listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserListKind {
    Active,
    New,
    Staff,
    Suspended,
    Silenced,
    All,
}

impl UserListKind {
    /// Unrecognized list names fall back to every user.
    pub fn parse(value: &str) -> Self {
        match value.trim_end_matches(".json") {
            "active" => Self::Active,
            "new" => Self::New,
            "staff" => Self::Staff,
            "suspended" => Self::Suspended,
            "silenced" => Self::Silenced,
            _ => Self::All,
        }
    }

    fn matches(self, user: &User) -> bool {
        match self {
            Self::Active => user.active,
            Self::New => user.trust_level == 0,
            Self::Staff => user.admin || user.moderator,
            Self::Suspended => user.suspended,
            Self::Silenced => user.silenced,
            Self::All => true,
        }
    }
}

const MAX_TRUST_LEVEL: u8 = 4;

fn require_email(email: &str) -> StoreResult<()> {
    require_text("email", email)?;
    if email.contains('@') {
        Ok(())
    } else {
        Err(StoreError::Validation(format!("{email} is not a valid email")))
    }
}

impl Store {
    // -------------------------------------------------------------------------
    // Index maintenance
    // -------------------------------------------------------------------------

    fn index_user(&mut self, user: &User) {
        self.users_by_username
            .insert(user.username.to_lowercase(), user.id);
        self.users_by_email.insert(user.email.to_lowercase(), user.id);
        if let Some(external_id) = &user.external_id {
            self.users_by_external_id
                .insert(external_id.clone(), user.id);
        }
    }

    fn unindex_user(&mut self, user: &User) {
        self.users_by_username.remove(&user.username.to_lowercase());
        self.users_by_email.remove(&user.email.to_lowercase());
        if let Some(external_id) = &user.external_id {
            self.users_by_external_id.remove(external_id);
        }
    }

    fn ensure_username_free(&self, username: &str, owner: Option<i64>) -> StoreResult<()> {
        match self.users_by_username.get(&username.to_lowercase()) {
            Some(&id) if Some(id) != owner => Err(StoreError::Conflict(format!(
                "Username {username} is already taken"
            ))),
            _ => Ok(()),
        }
    }

    fn ensure_email_free(&self, email: &str, owner: Option<i64>) -> StoreResult<()> {
        match self.users_by_email.get(&email.to_lowercase()) {
            Some(&id) if Some(id) != owner => Err(StoreError::Conflict(format!(
                "Email {email} is already taken"
            ))),
            _ => Ok(()),
        }
    }

    fn ensure_external_id_free(&self, external_id: &str, owner: Option<i64>) -> StoreResult<()> {
        match self.users_by_external_id.get(external_id) {
            Some(&id) if Some(id) != owner => Err(StoreError::Conflict(format!(
                "External id {external_id} is already linked"
            ))),
            _ => Ok(()),
        }
    }

    /// Swap a user record, rewriting its index entries. Key conflicts must
    /// already have been checked.
    fn replace_user(&mut self, updated: User) -> User {
        if let Some(previous) = self.users.get(&updated.id).cloned() {
            self.unindex_user(&previous);
        }
        self.index_user(&updated);
        self.users.insert(updated.id, updated.clone());
        updated
    }

    /// Insert a fully formed record, used for fixed seed accounts.
    pub(super) fn insert_user_record(&mut self, user: User) -> StoreResult<User> {
        self.ensure_username_free(&user.username, None)?;
        self.ensure_email_free(&user.email, None)?;
        if let Some(external_id) = &user.external_id {
            self.ensure_external_id_free(external_id, None)?;
        }
        if self.users.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("User {} already exists", user.id)));
        }
        self.next_user_id.bump_past(user.id);
        Ok(self.replace_user(user))
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn get_user(&self, id: i64) -> StoreResult<User> {
        self.user_ref(id).cloned()
    }

    pub fn get_user_by_username(&self, username: &str) -> StoreResult<User> {
        self.users_by_username
            .get(&username.to_lowercase())
            .and_then(|id| self.users.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("User {username}")))
    }

    pub fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        self.users_by_email
            .get(&email.to_lowercase())
            .and_then(|id| self.users.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("User with email {email}")))
    }

    pub fn get_user_by_external_id(&self, external_id: &str) -> StoreResult<User> {
        self.users_by_external_id
            .get(external_id)
            .and_then(|id| self.users.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("User with external id {external_id}")))
    }

    /// Real accounts matching `kind`, ordered by id. The system account is
    /// never listed.
    pub fn list_users(&self, kind: UserListKind) -> Vec<User> {
        self.users
            .values()
            .filter(|user| user.id > 0 && kind.matches(user))
            .cloned()
            .collect()
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    pub fn create_user(&mut self, request: NewUser) -> StoreResult<User> {
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_string();
        require_text("username", &username)?;
        require_email(&email)?;
        self.ensure_username_free(&username, None)?;
        self.ensure_email_free(&email, None)?;
        if let Some(external_id) = &request.external_id {
            require_text("external_id", external_id)?;
            self.ensure_external_id_free(external_id, None)?;
        }

        let id = self.next_user_id.next();
        let user = User {
            id,
            name: request.name.unwrap_or_else(|| username.clone()),
            avatar_template: avatar_template(&username),
            username,
            email,
            active: request.active.unwrap_or(true),
            approved: request.approved.unwrap_or(false),
            admin: false,
            moderator: false,
            trust_level: 1,
            suspended: false,
            silenced: false,
            title: None,
            external_id: request.external_id,
            primary_group_id: None,
            created_at: Utc::now(),
        };
        Ok(self.replace_user(user))
    }

    /// Apply the fields present in `update`. Keys are not touched here; see
    /// [`Store::change_username`] and [`Store::change_email`].
    pub fn update_user(&mut self, id: i64, update: UserUpdate) -> StoreResult<User> {
        let mut user = self.user_ref(id)?.clone();
        if let Some(level) = update.trust_level {
            if level > MAX_TRUST_LEVEL {
                return Err(StoreError::Validation(format!(
                    "trust_level must be between 0 and {MAX_TRUST_LEVEL}"
                )));
            }
            user.trust_level = level;
        }
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(title) = update.title {
            user.title = Some(title);
        }
        if let Some(active) = update.active {
            user.active = active;
        }
        if let Some(admin) = update.admin {
            user.admin = admin;
        }
        if let Some(moderator) = update.moderator {
            user.moderator = moderator;
        }
        if let Some(suspended) = update.suspended {
            user.suspended = suspended;
        }
        if let Some(silenced) = update.silenced {
            user.silenced = silenced;
        }
        Ok(self.replace_user(user))
    }

    pub fn change_username(&mut self, id: i64, new_username: &str) -> StoreResult<User> {
        let new_username = new_username.trim();
        require_text("username", new_username)?;
        let mut user = self.user_ref(id)?.clone();
        self.ensure_username_free(new_username, Some(id))?;
        user.username = new_username.to_string();
        user.avatar_template = avatar_template(new_username);
        Ok(self.replace_user(user))
    }

    pub fn change_email(&mut self, id: i64, new_email: &str) -> StoreResult<User> {
        let new_email = new_email.trim();
        require_email(new_email)?;
        let mut user = self.user_ref(id)?.clone();
        self.ensure_email_free(new_email, Some(id))?;
        user.email = new_email.to_string();
        Ok(self.replace_user(user))
    }

    pub fn admin_action(&mut self, id: i64, action: AdminAction) -> StoreResult<User> {
        let mut user = self.user_ref(id)?.clone();
        match action {
            AdminAction::Approve => user.approved = true,
            AdminAction::Activate => user.active = true,
            AdminAction::Deactivate => user.active = false,
            AdminAction::GrantAdmin => user.admin = true,
            AdminAction::RevokeAdmin => user.admin = false,
            AdminAction::GrantModeration => user.moderator = true,
            AdminAction::RevokeModeration => user.moderator = false,
            AdminAction::TrustLevel(level) => {
                if level > MAX_TRUST_LEVEL {
                    return Err(StoreError::Validation(format!(
                        "trust_level must be between 0 and {MAX_TRUST_LEVEL}"
                    )));
                }
                user.trust_level = level;
            }
            AdminAction::Suspend => user.suspended = true,
            AdminAction::Unsuspend => user.suspended = false,
            AdminAction::Silence => user.silenced = true,
            AdminAction::Unsilence => user.silenced = false,
            AdminAction::Anonymize => {
                let username = format!("anon{id}");
                let email = format!("{username}@anonymized.invalid");
                self.ensure_username_free(&username, Some(id))?;
                self.ensure_email_free(&email, Some(id))?;
                user.name = String::new();
                user.avatar_template = avatar_template(&username);
                user.username = username;
                user.email = email;
                user.title = None;
                user.external_id = None;
            }
            AdminAction::PrimaryGroup(group_id) => {
                if let Some(group_id) = group_id {
                    self.group_ref(group_id)?;
                }
                user.primary_group_id = group_id;
            }
        }
        Ok(self.replace_user(user))
    }

    /// Approve every listed user, or none if any id is unknown.
    pub fn approve_users(&mut self, ids: &[i64]) -> StoreResult<Vec<User>> {
        for &id in ids {
            self.user_ref(id)?;
        }
        let mut approved = Vec::with_capacity(ids.len());
        for &id in ids {
            approved.push(self.admin_action(id, AdminAction::Approve)?);
        }
        Ok(approved)
    }

    /// Remove a user together with their memberships, badges and
    /// notifications. Posts and topics they authored stay in place.
    pub fn delete_user(&mut self, id: i64) -> StoreResult<User> {
        let user = self.user_ref(id)?.clone();
        if id <= 0 {
            return Err(StoreError::Validation(format!(
                "{} is a system account and cannot be deleted",
                user.username
            )));
        }

        self.unindex_user(&user);
        self.users.remove(&id);

        for group in self.groups.values_mut() {
            group.members.retain(|&member| member != id);
            group.owners.retain(|&owner| owner != id);
            group.user_count = group.members.len() as i64;
        }

        let revoked: Vec<i64> = self
            .user_badges
            .values()
            .filter(|grant| grant.user_id == id)
            .map(|grant| grant.badge_id)
            .collect();
        self.user_badges.retain(|_, grant| grant.user_id != id);
        for badge_id in revoked {
            if let Some(badge) = self.badges.get_mut(&badge_id) {
                badge.grant_count -= 1;
            }
        }
        self.notifications.retain(|_, n| n.user_id != id);

        Ok(user)
    }

    /// Delete every listed user, or none if any id is unknown or protected.
    pub fn delete_users(&mut self, ids: &[i64]) -> StoreResult<Vec<User>> {
        let mut seen = std::collections::HashSet::new();
        for &id in ids {
            self.user_ref(id)?;
            if id <= 0 {
                return Err(StoreError::Validation(format!(
                    "User {id} is a system account and cannot be deleted"
                )));
            }
            if !seen.insert(id) {
                return Err(StoreError::Validation(format!("User {id} listed twice")));
            }
        }
        let mut deleted = Vec::with_capacity(ids.len());
        for &id in ids {
            deleted.push(self.delete_user(id)?);
        }
        Ok(deleted)
    }

    /// Upsert by external id. Returns the user and whether it was created.
    ///
    /// Existing users get their username, name and email refreshed; new users
    /// start approved at trust level 0.
    pub fn sync_sso(&mut self, identity: SsoIdentity) -> StoreResult<(User, bool)> {
        let external_id = identity.external_id.trim().to_string();
        let email = identity.email.trim().to_string();
        require_text("external_id", &external_id)?;
        require_email(&email)?;
        let username = identity
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| external_id.clone());

        let existing = self.users_by_external_id.get(&external_id).copied();
        self.ensure_username_free(&username, existing)?;
        self.ensure_email_free(&email, existing)?;

        match existing.and_then(|id| self.users.get(&id)).cloned() {
            Some(mut user) => {
                if let Some(name) = identity.name {
                    user.name = name;
                }
                user.avatar_template = avatar_template(&username);
                user.username = username;
                user.email = email;
                Ok((self.replace_user(user), false))
            }
            None => {
                let id = self.next_user_id.next();
                let user = User {
                    id,
                    name: identity.name.unwrap_or_else(|| username.clone()),
                    avatar_template: avatar_template(&username),
                    username,
                    email,
                    active: true,
                    approved: true,
                    admin: false,
                    moderator: false,
                    trust_level: 0,
                    suspended: false,
                    silenced: false,
                    title: None,
                    external_id: Some(external_id),
                    primary_group_id: None,
                    created_at: Utc::now(),
                };
                Ok((self.replace_user(user), true))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewGroup;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            name: Some(format!("{username} name")),
            ..Default::default()
        }
    }

    #[test]
    fn create_then_get_round_trips() {
        let mut store = Store::new();
        let created = store
            .create_user(NewUser {
                external_id: Some("ext-1".into()),
                approved: Some(true),
                ..new_user("Carol", "carol@example.com")
            })
            .unwrap();

        let fetched = store.get_user(created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.username, "Carol");
        assert_eq!(fetched.email, "carol@example.com");
        assert_eq!(fetched.name, "Carol name");
        assert!(fetched.approved);
        assert_eq!(fetched.external_id.as_deref(), Some("ext-1"));

        assert_eq!(store.get_user_by_username("carol").unwrap().id, created.id);
        assert_eq!(store.get_user_by_email("CAROL@example.com").unwrap().id, created.id);
        assert_eq!(store.get_user_by_external_id("ext-1").unwrap().id, created.id);
    }

    #[test]
    fn duplicate_username_or_email_conflicts_case_insensitively() {
        let mut store = Store::new();
        store.create_user(new_user("dave", "dave@example.com")).unwrap();

        let by_name = store.create_user(new_user("DAVE", "other@example.com"));
        assert!(matches!(by_name, Err(StoreError::Conflict(_))));

        let by_email = store.create_user(new_user("david", "Dave@Example.com"));
        assert!(matches!(by_email, Err(StoreError::Conflict(_))));

        assert_eq!(store.list_users(UserListKind::All).len(), 1);
    }

    #[test]
    fn blank_fields_are_validation_errors() {
        let mut store = Store::new();
        assert!(matches!(
            store.create_user(new_user("  ", "x@example.com")),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.create_user(new_user("erin", "not-an-email")),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn change_username_rewrites_index() {
        let mut store = Store::new();
        let user = store.create_user(new_user("frank", "frank@example.com")).unwrap();
        store.create_user(new_user("grace", "grace@example.com")).unwrap();

        assert!(matches!(
            store.change_username(user.id, "Grace"),
            Err(StoreError::Conflict(_))
        ));

        store.change_username(user.id, "franklin").unwrap();
        assert!(store.get_user_by_username("frank").is_err());
        assert_eq!(store.get_user_by_username("FRANKLIN").unwrap().id, user.id);
        // Renaming to a different case of your own name is allowed.
        store.change_username(user.id, "Franklin").unwrap();
    }

    #[test]
    fn update_applies_only_present_fields() {
        let mut store = Store::new();
        let user = store.create_user(new_user("heidi", "heidi@example.com")).unwrap();
        let updated = store
            .update_user(
                user.id,
                UserUpdate {
                    title: Some("Helper".into()),
                    trust_level: Some(3),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title.as_deref(), Some("Helper"));
        assert_eq!(updated.trust_level, 3);
        assert_eq!(updated.name, user.name);

        let too_high = store.update_user(
            user.id,
            UserUpdate {
                trust_level: Some(5),
                ..Default::default()
            },
        );
        assert!(matches!(too_high, Err(StoreError::Validation(_))));
        assert_eq!(store.get_user(user.id).unwrap().trust_level, 3);
    }

    #[test]
    fn delete_removes_indices_and_memberships() {
        let mut store = Store::new();
        let user = store
            .create_user(NewUser {
                external_id: Some("ext-ivan".into()),
                ..new_user("ivan", "ivan@example.com")
            })
            .unwrap();
        let group = store
            .create_group(NewGroup {
                name: "testers".into(),
                ..Default::default()
            })
            .unwrap();
        store.add_group_owners(group.id, &[user.id]).unwrap();

        store.delete_user(user.id).unwrap();
        assert!(store.get_user(user.id).is_err());
        assert!(store.get_user_by_username("ivan").is_err());
        assert!(store.get_user_by_email("ivan@example.com").is_err());
        assert!(store.get_user_by_external_id("ext-ivan").is_err());

        let group = store.get_group(group.id).unwrap();
        assert!(group.members.is_empty());
        assert!(group.owners.is_empty());
        assert_eq!(group.user_count, 0);

        // The username is free again.
        store.create_user(new_user("ivan", "ivan@example.com")).unwrap();
    }

    #[test]
    fn bulk_delete_is_all_or_nothing() {
        let mut store = Store::new();
        let a = store.create_user(new_user("judy", "judy@example.com")).unwrap();
        let result = store.delete_users(&[a.id, 999]);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(store.get_user(a.id).is_ok());
    }

    #[test]
    fn admin_actions_toggle_flags() {
        let mut store = Store::new();
        let user = store.create_user(new_user("mallory", "m@example.com")).unwrap();
        store.admin_action(user.id, AdminAction::Suspend).unwrap();
        store.admin_action(user.id, AdminAction::GrantModeration).unwrap();
        assert_eq!(store.list_users(UserListKind::Suspended).len(), 1);
        assert_eq!(store.list_users(UserListKind::Staff).len(), 1);

        let anon = store.admin_action(user.id, AdminAction::Anonymize).unwrap();
        assert_eq!(anon.username, format!("anon{}", user.id));
        assert!(store.get_user_by_username("mallory").is_err());

        assert!(matches!(
            store.admin_action(user.id, AdminAction::PrimaryGroup(Some(77))),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn sync_sso_creates_then_updates() {
        let mut store = Store::new();
        let (created, is_new) = store
            .sync_sso(SsoIdentity {
                external_id: "idp-1".into(),
                email: "sso@example.com".into(),
                username: None,
                name: Some("Sso User".into()),
            })
            .unwrap();
        assert!(is_new);
        assert_eq!(created.username, "idp-1");
        assert_eq!(created.trust_level, 0);
        assert!(created.approved);

        let (updated, is_new) = store
            .sync_sso(SsoIdentity {
                external_id: "idp-1".into(),
                email: "new@example.com".into(),
                username: Some("ssouser".into()),
                name: None,
            })
            .unwrap();
        assert!(!is_new);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.email, "new@example.com");
        assert!(store.get_user_by_email("sso@example.com").is_err());
        assert_eq!(store.get_user_by_username("ssouser").unwrap().id, created.id);
    }

    #[test]
    fn sync_sso_refuses_to_steal_another_users_email() {
        let mut store = Store::new();
        store.create_user(new_user("oscar", "oscar@example.com")).unwrap();
        let result = store.sync_sso(SsoIdentity {
            external_id: "idp-2".into(),
            email: "oscar@example.com".into(),
            ..Default::default()
        });
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert!(store.get_user_by_external_id("idp-2").is_err());
    }
}
