// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Group endpoints, including the admin membership operations.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use super::extract::Payload;
use crate::{
    dispatch::{parse_id, strip_json},
    error::ApiError,
    models::{BasicUser, Group, GroupUpdate, NewGroup},
    state::AppState,
    store::{Store, StoreResult},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupListResponse {
    pub groups: Vec<Group>,
    pub total_rows_groups: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupResponse {
    pub group: Group,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MembersMeta {
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupMembersResponse {
    pub members: Vec<BasicUser>,
    pub owners: Vec<BasicUser>,
    pub meta: MembersMeta,
}

/// Groups are addressed by name; a purely numeric segment that names no
/// group is taken as an id.
fn find_group(store: &Store, key: &str) -> StoreResult<Group> {
    let name = strip_json(key);
    match (store.get_group_by_name(name), parse_id(key)) {
        (Ok(group), _) => Ok(group),
        (Err(_), Some(id)) => store.get_group(id),
        (Err(error), None) => Err(error),
    }
}

/// Users named by `usernames` and `user_ids`, in that order. Any unknown
/// username fails the whole request.
fn member_ids(store: &Store, payload: &Payload) -> Result<Vec<i64>, ApiError> {
    let mut ids = Vec::new();
    for username in payload.strings("usernames") {
        ids.push(store.get_user_by_username(&username)?.id);
    }
    ids.extend(payload.ints("user_ids"));
    if ids.is_empty() {
        return Err(ApiError::unprocessable("usernames or user_ids are required"));
    }
    Ok(ids)
}

#[utoipa::path(
    get,
    path = "/groups.json",
    tag = "Groups",
    responses((status = 200, body = GroupListResponse))
)]
pub async fn list_groups(State(state): State<AppState>) -> Json<GroupListResponse> {
    let groups = state.store.read().await.list_groups();
    Json(GroupListResponse {
        total_rows_groups: groups.len(),
        groups,
    })
}

#[utoipa::path(
    get,
    path = "/groups/{group}",
    params(("group" = String, Path, description = "Group name, optionally with .json")),
    tag = "Groups",
    responses((status = 200, body = GroupResponse), (status = 404))
)]
pub async fn get_group(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> Result<Json<GroupResponse>, ApiError> {
    let store = state.store.read().await;
    let group = find_group(&store, &group)?;
    Ok(Json(GroupResponse { group }))
}

#[utoipa::path(
    get,
    path = "/groups/{group}/members.json",
    params(("group" = String, Path, description = "Group name")),
    tag = "Groups",
    responses((status = 200, body = GroupMembersResponse), (status = 404))
)]
pub async fn group_members(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> Result<Json<GroupMembersResponse>, ApiError> {
    let store = state.store.read().await;
    let group = find_group(&store, &group)?;
    let (members, owners) = store.group_members(group.id)?;
    Ok(Json(GroupMembersResponse {
        meta: MembersMeta {
            total: members.len(),
        },
        members,
        owners,
    }))
}

#[utoipa::path(
    put,
    path = "/groups/{group}",
    params(("group" = String, Path, description = "Group name or id")),
    tag = "Groups",
    responses((status = 200, body = GroupResponse), (status = 404), (status = 409))
)]
pub async fn update_group(
    State(state): State<AppState>,
    Path(group): Path<String>,
    payload: Payload,
) -> Result<Json<GroupResponse>, ApiError> {
    let fields = payload.section("group");
    let update = GroupUpdate {
        name: fields.text("name"),
        full_name: fields.text("full_name"),
        visibility_level: fields.int("visibility_level").and_then(|l| i32::try_from(l).ok()),
    };
    let mut store = state.store.write().await;
    let id = find_group(&store, &group)?.id;
    let group = store.update_group(id, update)?;
    Ok(Json(GroupResponse { group }))
}

#[utoipa::path(
    post,
    path = "/admin/groups.json",
    tag = "Groups",
    request_body = NewGroup,
    responses(
        (status = 200, description = "Group created"),
        (status = 409, description = "Name already taken"),
        (status = 422, description = "Missing name")
    )
)]
pub async fn create_group(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<Value>, ApiError> {
    let fields = payload.section("group");
    let request = NewGroup {
        name: fields.text("name").unwrap_or_default(),
        full_name: fields.text("full_name"),
        visibility_level: fields.int("visibility_level").and_then(|l| i32::try_from(l).ok()),
    };
    let group = state.store.write().await.create_group(request)?;
    tracing::info!(group_id = group.id, name = %group.name, "group created");
    Ok(Json(json!({ "basic_group": group })))
}

#[utoipa::path(
    delete,
    path = "/admin/groups/{group}",
    params(("group" = String, Path, description = "Group id or name")),
    tag = "Groups",
    responses(
        (status = 200, description = "Deleted"),
        (status = 404),
        (status = 422, description = "Automatic groups cannot be deleted")
    )
)]
pub async fn delete_group(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let mut store = state.store.write().await;
    let id = find_group(&store, &group)?.id;
    store.delete_group(id)?;
    tracing::info!(group_id = id, "group deleted");
    Ok(super::success())
}

#[utoipa::path(
    put,
    path = "/admin/groups/{group}/members.json",
    params(("group" = String, Path, description = "Group id or name")),
    tag = "Groups",
    responses((status = 200, description = "Members added"), (status = 404), (status = 422))
)]
pub async fn add_members(
    State(state): State<AppState>,
    Path(group): Path<String>,
    payload: Payload,
) -> Result<Json<Value>, ApiError> {
    let mut store = state.store.write().await;
    let id = find_group(&store, &group)?.id;
    let user_ids = member_ids(&store, &payload)?;
    let group = store.add_group_members(id, &user_ids)?;
    Ok(Json(json!({ "success": "OK", "user_count": group.user_count })))
}

#[utoipa::path(
    delete,
    path = "/admin/groups/{group}/members.json",
    params(("group" = String, Path, description = "Group id or name")),
    tag = "Groups",
    responses((status = 200, description = "Members removed"), (status = 404), (status = 422))
)]
pub async fn remove_members(
    State(state): State<AppState>,
    Path(group): Path<String>,
    payload: Payload,
) -> Result<Json<Value>, ApiError> {
    let mut store = state.store.write().await;
    let id = find_group(&store, &group)?.id;
    let user_ids = member_ids(&store, &payload)?;
    let group = store.remove_group_members(id, &user_ids)?;
    Ok(Json(json!({ "success": "OK", "user_count": group.user_count })))
}

#[utoipa::path(
    put,
    path = "/admin/groups/{group}/owners.json",
    params(("group" = String, Path, description = "Group id or name")),
    tag = "Groups",
    responses((status = 200, description = "Owners added"), (status = 404), (status = 422))
)]
pub async fn add_owners(
    State(state): State<AppState>,
    Path(group): Path<String>,
    payload: Payload,
) -> Result<Json<Value>, ApiError> {
    let fields = payload.section("group");
    let mut store = state.store.write().await;
    let id = find_group(&store, &group)?.id;
    let user_ids = member_ids(&store, &fields)?;
    let group = store.add_group_owners(id, &user_ids)?;
    Ok(Json(json!({ "success": "OK", "owners": group.owners })))
}

#[utoipa::path(
    delete,
    path = "/admin/groups/{group}/owners.json",
    params(("group" = String, Path, description = "Group id or name")),
    tag = "Groups",
    responses((status = 200, description = "Owners removed"), (status = 404), (status = 422))
)]
pub async fn remove_owners(
    State(state): State<AppState>,
    Path(group): Path<String>,
    payload: Payload,
) -> Result<Json<Value>, ApiError> {
    let fields = payload.section("group");
    let mut store = state.store.write().await;
    let id = find_group(&store, &group)?.id;
    let user_ids = member_ids(&store, &fields)?;
    let group = store.remove_group_owners(id, &user_ids)?;
    Ok(Json(json!({ "success": "OK", "owners": group.owners })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn form(body: &str) -> Payload {
        Payload::parse(None, None, body.as_bytes()).unwrap()
    }

    async fn created(state: &AppState, name: &str) -> i64 {
        let payload = form(&format!("group%5Bname%5D={name}"));
        let Json(value) = create_group(State(state.clone()), payload).await.unwrap();
        value["basic_group"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn create_then_lookup_by_name_and_id() {
        let state = AppState::default();
        let id = created(&state, "moderators-club").await;

        let Json(by_name) = get_group(State(state.clone()), Path("moderators-club.json".into()))
            .await
            .unwrap();
        let Json(by_id) = get_group(State(state), Path(id.to_string())).await.unwrap();
        assert_eq!(by_name.group.id, by_id.group.id);
    }

    #[tokio::test]
    async fn members_by_username_list_and_ids() {
        let state = AppState::default();
        let id = created(&state, "testers").await;
        add_members(
            State(state.clone()),
            Path(id.to_string()),
            form("usernames=alice,bob"),
        )
        .await
        .unwrap();

        let Json(listing) = group_members(State(state.clone()), Path("testers".into()))
            .await
            .unwrap();
        assert_eq!(listing.meta.total, 2);
        assert!(listing.owners.is_empty());

        remove_members(State(state.clone()), Path(id.to_string()), form("user_ids=3"))
            .await
            .unwrap();
        assert_eq!(state.store.read().await.get_group(id).unwrap().members, vec![2]);

        let err = add_members(State(state), Path(id.to_string()), form("usernames=ghost"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn owners_are_members_too() {
        let state = AppState::default();
        let id = created(&state, "leads").await;
        add_owners(
            State(state.clone()),
            Path(id.to_string()),
            form("group%5Busernames%5D=bob"),
        )
        .await
        .unwrap();
        let group = state.store.read().await.get_group(id).unwrap();
        assert_eq!(group.members, vec![3]);
        assert_eq!(group.owners, vec![3]);

        remove_owners(State(state.clone()), Path(id.to_string()), form("user_ids=3"))
            .await
            .unwrap();
        let group = state.store.read().await.get_group(id).unwrap();
        assert_eq!(group.members, vec![3]);
        assert!(group.owners.is_empty());
    }

    #[tokio::test]
    async fn automatic_groups_are_protected() {
        let state = AppState::default();
        let err = delete_group(State(state.clone()), Path("staff".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let id = created(&state, "temporary").await;
        delete_group(State(state.clone()), Path(id.to_string()))
            .await
            .unwrap();
        assert!(get_group(State(state), Path("temporary".into())).await.is_err());
    }

    #[tokio::test]
    async fn rename_updates_the_name_index() {
        let state = AppState::default();
        created(&state, "old-name").await;
        update_group(
            State(state.clone()),
            Path("old-name".into()),
            form("group%5Bname%5D=new-name"),
        )
        .await
        .unwrap();
        assert!(get_group(State(state.clone()), Path("new-name".into())).await.is_ok());
        assert!(get_group(State(state), Path("old-name".into())).await.is_err());
    }
}
