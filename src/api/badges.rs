// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Badge administration and grants.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::{
    entity_id,
    extract::{Actor, Payload},
};
use crate::{
    dispatch::{parse_id, strip_json},
    error::ApiError,
    models::{Badge, BadgeUpdate, NewBadge, UserBadge},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct BadgeListResponse {
    pub badges: Vec<Badge>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BadgeResponse {
    pub badge: Badge,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserBadgesResponse {
    pub badges: Vec<Badge>,
    pub user_badges: Vec<UserBadge>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserBadgeResponse {
    pub user_badge: UserBadge,
}

#[utoipa::path(
    get,
    path = "/admin/badges.json",
    tag = "Badges",
    responses((status = 200, body = BadgeListResponse))
)]
pub async fn list_badges(State(state): State<AppState>) -> Json<BadgeListResponse> {
    Json(BadgeListResponse {
        badges: state.store.read().await.list_badges(),
    })
}

#[utoipa::path(
    post,
    path = "/admin/badges.json",
    tag = "Badges",
    request_body = NewBadge,
    responses((status = 200, body = BadgeResponse), (status = 409), (status = 422))
)]
pub async fn create_badge(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<BadgeResponse>, ApiError> {
    let request = NewBadge {
        name: payload.text("name").unwrap_or_default(),
        description: payload.text("description"),
        badge_type_id: payload.int("badge_type_id"),
    };
    let badge = state.store.write().await.create_badge(request)?;
    Ok(Json(BadgeResponse { badge }))
}

#[utoipa::path(
    put,
    path = "/admin/badges/{id}",
    params(("id" = String, Path, description = "Badge id, optionally with .json")),
    tag = "Badges",
    request_body = BadgeUpdate,
    responses((status = 200, body = BadgeResponse), (status = 404), (status = 409))
)]
pub async fn update_badge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Json<BadgeResponse>, ApiError> {
    let update = BadgeUpdate {
        name: payload.text("name"),
        description: payload.text("description"),
        enabled: payload.flag("enabled"),
    };
    let badge = state
        .store
        .write()
        .await
        .update_badge(entity_id(parse_id(&id))?, update)?;
    Ok(Json(BadgeResponse { badge }))
}

/// Delete a badge and revoke it from everyone holding it.
#[utoipa::path(
    delete,
    path = "/admin/badges/{id}",
    params(("id" = String, Path, description = "Badge id, optionally with .json")),
    tag = "Badges",
    responses(
        (status = 200),
        (status = 404),
        (status = 422, description = "System badges cannot be deleted")
    )
)]
pub async fn delete_badge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .write()
        .await
        .delete_badge(entity_id(parse_id(&id))?)?;
    Ok(super::success())
}

#[utoipa::path(
    get,
    path = "/user-badges/{username}",
    params(("username" = String, Path, description = "Username, optionally with .json")),
    tag = "Badges",
    responses((status = 200, body = UserBadgesResponse), (status = 404))
)]
pub async fn user_badges(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserBadgesResponse>, ApiError> {
    let (badges, user_badges) = state
        .store
        .read()
        .await
        .user_badges(strip_json(&username))?;
    Ok(Json(UserBadgesResponse {
        badges,
        user_badges,
    }))
}

/// Grant `badge_id` to `username`, recorded as granted by the acting user.
#[utoipa::path(
    post,
    path = "/user_badges.json",
    params(("Api-Username" = Option<String>, Header, description = "Granting user, defaults to system")),
    tag = "Badges",
    responses(
        (status = 200, body = UserBadgeResponse),
        (status = 404),
        (status = 409, description = "Badge already granted")
    )
)]
pub async fn grant_badge(
    State(state): State<AppState>,
    Actor(granter): Actor,
    payload: Payload,
) -> Result<Json<UserBadgeResponse>, ApiError> {
    let username = payload
        .text("username")
        .ok_or_else(|| ApiError::unprocessable("username is required"))?;
    let badge_id = payload
        .int("badge_id")
        .ok_or_else(|| ApiError::unprocessable("badge_id is required"))?;
    let mut store = state.store.write().await;
    let user = store.get_user_by_username(&username)?;
    let user_badge = store.grant_badge(user.id, badge_id, granter.id)?;
    tracing::info!(user_id = user.id, badge_id, "badge granted");
    Ok(Json(UserBadgeResponse { user_badge }))
}

#[utoipa::path(
    delete,
    path = "/user_badges/{id}",
    params(("id" = String, Path, description = "Grant id, optionally with .json")),
    tag = "Badges",
    responses((status = 200), (status = 404))
)]
pub async fn revoke_badge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .write()
        .await
        .revoke_user_badge(entity_id(parse_id(&id))?)?;
    Ok(super::success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    async fn system(state: &AppState) -> Actor {
        Actor(state.store.read().await.get_user_by_username("system").unwrap())
    }

    fn json_payload(body: &str) -> Payload {
        Payload::parse(Some("application/json"), None, body.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn grant_increments_count_once() {
        let state = AppState::default();
        let Json(created) = create_badge(State(state.clone()), json_payload(r#"{"name":"Helper"}"#))
            .await
            .unwrap();
        let badge_id = created.badge.id;

        let body = format!(r#"{{"username":"bob","badge_id":{badge_id}}}"#);
        let system_user = system(&state).await;
        let Json(grant) = grant_badge(State(state.clone()), system_user, json_payload(&body))
            .await
            .unwrap();
        assert_eq!(grant.user_badge.user_id, 3);

        let err = grant_badge(State(state.clone()), system(&state).await, json_payload(&body))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(state.store.read().await.get_badge(badge_id).unwrap().grant_count, 1);
    }

    #[tokio::test]
    async fn user_badges_lists_seed_grants() {
        let state = AppState::default();
        let Json(response) = user_badges(State(state), Path("alice.json".into()))
            .await
            .unwrap();
        assert_eq!(response.badges.len(), 2);
        assert_eq!(response.user_badges.len(), 2);
    }

    #[tokio::test]
    async fn system_badges_cannot_be_deleted() {
        let state = AppState::default();
        let err = delete_badge(State(state.clone()), Path("1".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn disabled_badge_cannot_be_granted_and_revoke_restores_count() {
        let state = AppState::default();
        let disable = json_payload(r#"{"enabled":false}"#);
        update_badge(State(state.clone()), Path("2.json".into()), disable)
            .await
            .unwrap();
        let err = grant_badge(
            State(state.clone()),
            system(&state).await,
            json_payload(r#"{"username":"bob","badge_id":2}"#),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let grant_id = {
            let store = state.store.read().await;
            store.user_badges("bob").unwrap().1[0].id
        };
        revoke_badge(State(state.clone()), Path(grant_id.to_string()))
            .await
            .unwrap();
        assert_eq!(state.store.read().await.get_badge(1).unwrap().grant_count, 1);
    }
}
