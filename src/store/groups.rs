// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Group operations. Owners are always members, and `user_count` is
//! rewritten from the member list on every membership change.

use chrono::Utc;

use super::{require_text, Store, StoreError, StoreResult};
use crate::models::{BasicUser, Group, GroupUpdate, NewGroup};

fn sync_count(group: &mut Group) {
    group.user_count = group.members.len() as i64;
    group.updated_at = Utc::now();
}

impl Store {
    fn ensure_group_name_free(&self, name: &str, owner: Option<i64>) -> StoreResult<()> {
        match self.groups_by_name.get(&name.to_lowercase()) {
            Some(&id) if Some(id) != owner => Err(StoreError::Conflict(format!(
                "Group name {name} is already taken"
            ))),
            _ => Ok(()),
        }
    }

    fn ensure_users_exist(&self, user_ids: &[i64]) -> StoreResult<()> {
        for &id in user_ids {
            self.user_ref(id)?;
        }
        Ok(())
    }

    fn group_mut(&mut self, id: i64) -> StoreResult<&mut Group> {
        self.groups
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Group {id}")))
    }

    /// Insert a group with a fixed id and members, used for seed groups.
    pub(super) fn insert_group_record(
        &mut self,
        id: i64,
        name: &str,
        automatic: bool,
        members: &[i64],
    ) -> StoreResult<Group> {
        self.ensure_group_name_free(name, None)?;
        self.ensure_users_exist(members)?;
        let now = Utc::now();
        let mut group = Group {
            id,
            name: name.to_string(),
            full_name: None,
            automatic,
            visibility_level: 0,
            members: Vec::new(),
            owners: Vec::new(),
            user_count: 0,
            created_at: now,
            updated_at: now,
        };
        for &member in members {
            if !group.members.contains(&member) {
                group.members.push(member);
            }
        }
        sync_count(&mut group);
        self.next_group_id.bump_past(id);
        self.groups_by_name.insert(name.to_lowercase(), id);
        self.groups.insert(id, group.clone());
        Ok(group)
    }

    pub fn get_group(&self, id: i64) -> StoreResult<Group> {
        self.group_ref(id).cloned()
    }

    /// Case-insensitive lookup by name.
    pub fn get_group_by_name(&self, name: &str) -> StoreResult<Group> {
        self.groups_by_name
            .get(&name.to_lowercase())
            .and_then(|id| self.groups.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Group {name}")))
    }

    pub fn list_groups(&self) -> Vec<Group> {
        self.groups.values().cloned().collect()
    }

    /// Members and owners as user projections. Members that no longer exist
    /// are skipped.
    pub fn group_members(&self, id: i64) -> StoreResult<(Vec<BasicUser>, Vec<BasicUser>)> {
        let group = self.group_ref(id)?;
        let project = |ids: &[i64]| -> Vec<BasicUser> {
            ids.iter()
                .filter_map(|id| self.users.get(id))
                .map(BasicUser::from)
                .collect()
        };
        Ok((project(&group.members), project(&group.owners)))
    }

    pub fn create_group(&mut self, request: NewGroup) -> StoreResult<Group> {
        let name = request.name.trim().to_string();
        require_text("name", &name)?;
        self.ensure_group_name_free(&name, None)?;
        let id = self.next_group_id.next();
        let now = Utc::now();
        let group = Group {
            id,
            name: name.clone(),
            full_name: request.full_name,
            automatic: false,
            visibility_level: request.visibility_level.unwrap_or(0),
            members: Vec::new(),
            owners: Vec::new(),
            user_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.groups_by_name.insert(name.to_lowercase(), id);
        self.groups.insert(id, group.clone());
        Ok(group)
    }

    pub fn update_group(&mut self, id: i64, update: GroupUpdate) -> StoreResult<Group> {
        let mut group = self.group_ref(id)?.clone();
        let new_name = update.name.map(|n| n.trim().to_string());
        if let Some(name) = &new_name {
            require_text("name", name)?;
            self.ensure_group_name_free(name, Some(id))?;
        }
        if let Some(name) = new_name {
            self.groups_by_name.remove(&group.name.to_lowercase());
            self.groups_by_name.insert(name.to_lowercase(), id);
            group.name = name;
        }
        if let Some(full_name) = update.full_name {
            group.full_name = Some(full_name);
        }
        if let Some(level) = update.visibility_level {
            group.visibility_level = level;
        }
        group.updated_at = Utc::now();
        self.groups.insert(id, group.clone());
        Ok(group)
    }

    /// Remove a group. Users whose primary group it was lose that setting.
    pub fn delete_group(&mut self, id: i64) -> StoreResult<Group> {
        let group = self.group_ref(id)?.clone();
        if group.automatic {
            return Err(StoreError::Validation(format!(
                "{} is an automatic group and cannot be deleted",
                group.name
            )));
        }
        self.groups.remove(&id);
        self.groups_by_name.remove(&group.name.to_lowercase());
        for user in self.users.values_mut() {
            if user.primary_group_id == Some(id) {
                user.primary_group_id = None;
            }
        }
        Ok(group)
    }

    /// Add members, ignoring ids already present.
    pub fn add_group_members(&mut self, id: i64, user_ids: &[i64]) -> StoreResult<Group> {
        self.ensure_users_exist(user_ids)?;
        let group = self.group_mut(id)?;
        for &user_id in user_ids {
            if !group.members.contains(&user_id) {
                group.members.push(user_id);
            }
        }
        sync_count(group);
        Ok(group.clone())
    }

    /// Remove members. A removed member also stops being an owner.
    pub fn remove_group_members(&mut self, id: i64, user_ids: &[i64]) -> StoreResult<Group> {
        let group = self.group_mut(id)?;
        group.members.retain(|m| !user_ids.contains(m));
        group.owners.retain(|o| !user_ids.contains(o));
        sync_count(group);
        Ok(group.clone())
    }

    /// Add owners, making them members first where needed.
    pub fn add_group_owners(&mut self, id: i64, user_ids: &[i64]) -> StoreResult<Group> {
        self.ensure_users_exist(user_ids)?;
        let group = self.group_mut(id)?;
        for &user_id in user_ids {
            if !group.members.contains(&user_id) {
                group.members.push(user_id);
            }
            if !group.owners.contains(&user_id) {
                group.owners.push(user_id);
            }
        }
        sync_count(group);
        Ok(group.clone())
    }

    /// Demote owners to plain members.
    pub fn remove_group_owners(&mut self, id: i64, user_ids: &[i64]) -> StoreResult<Group> {
        let group = self.group_mut(id)?;
        group.owners.retain(|o| !user_ids.contains(o));
        sync_count(group);
        Ok(group.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;

    fn store_with_users(n: usize) -> (Store, Vec<i64>) {
        let mut store = Store::new();
        let ids = (0..n)
            .map(|i| {
                store
                    .create_user(NewUser {
                        username: format!("member{i}"),
                        email: format!("member{i}@example.com"),
                        ..Default::default()
                    })
                    .unwrap()
                    .id
            })
            .collect();
        (store, ids)
    }

    fn named(name: &str) -> NewGroup {
        NewGroup {
            name: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn create_then_get_round_trips() {
        let mut store = Store::new();
        let created = store
            .create_group(NewGroup {
                full_name: Some("Beta Testers".into()),
                visibility_level: Some(2),
                ..named("beta")
            })
            .unwrap();
        let fetched = store.get_group(created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.full_name.as_deref(), Some("Beta Testers"));
        assert_eq!(fetched.visibility_level, 2);
        assert_eq!(store.get_group_by_name("BETA").unwrap().id, created.id);
    }

    #[test]
    fn membership_is_deduplicated_and_counted() {
        let (mut store, users) = store_with_users(3);
        let group = store.create_group(named("crew")).unwrap();

        store
            .add_group_members(group.id, &[users[0], users[1], users[0]])
            .unwrap();
        let group = store.add_group_members(group.id, &[users[1]]).unwrap();
        assert_eq!(group.members, vec![users[0], users[1]]);
        assert_eq!(group.user_count, 2);

        let group = store.add_group_owners(group.id, &[users[2]]).unwrap();
        assert_eq!(group.user_count, 3);
        assert_eq!(group.owners, vec![users[2]]);

        let group = store.remove_group_members(group.id, &[users[2]]).unwrap();
        assert!(group.owners.is_empty());
        assert_eq!(group.user_count, 2);
    }

    #[test]
    fn unknown_member_is_rejected_without_changes() {
        let (mut store, users) = store_with_users(1);
        let group = store.create_group(named("crew")).unwrap();
        let result = store.add_group_members(group.id, &[users[0], 404]);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert_eq!(store.get_group(group.id).unwrap().user_count, 0);
    }

    #[test]
    fn rename_reindexes_and_conflicts() {
        let mut store = Store::new();
        let a = store.create_group(named("alpha")).unwrap();
        store.create_group(named("bravo")).unwrap();
        assert!(matches!(
            store.update_group(
                a.id,
                GroupUpdate {
                    name: Some("Bravo".into()),
                    ..Default::default()
                }
            ),
            Err(StoreError::Conflict(_))
        ));
        store
            .update_group(
                a.id,
                GroupUpdate {
                    name: Some("charlie".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(store.get_group_by_name("alpha").is_err());
        assert_eq!(store.get_group_by_name("charlie").unwrap().id, a.id);
    }

    #[test]
    fn delete_clears_index_and_primary_group() {
        let (mut store, users) = store_with_users(1);
        let group = store.create_group(named("temp")).unwrap();
        store
            .admin_action(
                users[0],
                crate::models::AdminAction::PrimaryGroup(Some(group.id)),
            )
            .unwrap();
        store.delete_group(group.id).unwrap();
        assert!(store.get_group_by_name("temp").is_err());
        assert_eq!(store.get_user(users[0]).unwrap().primary_group_id, None);
    }
}
