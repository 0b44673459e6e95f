// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::extract::Payload;
use crate::{
    dispatch::strip_json,
    error::ApiError,
    models::{NewUser, User, UserUpdate},
    state::AppState,
};

/// Response for GET /u/{username}
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub user: User,
}

/// Response for POST /users
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateUserResponse {
    pub success: bool,
    pub active: bool,
    pub user_id: i64,
    pub message: String,
}

/// Register a user. `username` and `email` are required and unique.
#[utoipa::path(
    post,
    path = "/users.json",
    tag = "Users",
    request_body = NewUser,
    responses(
        (status = 200, description = "User created", body = CreateUserResponse),
        (status = 409, description = "Username or email already taken"),
        (status = 422, description = "Missing username or email")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<CreateUserResponse>, ApiError> {
    let request = NewUser {
        username: payload.text("username").unwrap_or_default(),
        email: payload.text("email").unwrap_or_default(),
        name: payload.text("name"),
        password: payload.text("password"),
        active: payload.flag("active"),
        approved: payload.flag("approved"),
        external_id: payload.text("external_id"),
    };
    let user = state.store.write().await.create_user(request)?;
    tracing::info!(user_id = user.id, username = %user.username, "user created");
    Ok(Json(CreateUserResponse {
        success: true,
        active: user.active,
        user_id: user.id,
        message: "Your account is activated and ready to use.".into(),
    }))
}

#[utoipa::path(
    get,
    path = "/u/{username}",
    params(("username" = String, Path, description = "Username, optionally with .json")),
    tag = "Users",
    responses((status = 200, body = UserResponse), (status = 404))
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .store
        .read()
        .await
        .get_user_by_username(strip_json(&username))?;
    Ok(Json(UserResponse { user }))
}

#[utoipa::path(
    get,
    path = "/users/by-external/{external_id}",
    params(("external_id" = String, Path, description = "Identity provider id, optionally with .json")),
    tag = "Users",
    responses((status = 200, body = UserResponse), (status = 404))
)]
pub async fn get_user_by_external_id(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .store
        .read()
        .await
        .get_user_by_external_id(strip_json(&external_id))?;
    Ok(Json(UserResponse { user }))
}

/// Update profile fields. Accepts the fields at the top level or nested
/// under `user`.
#[utoipa::path(
    put,
    path = "/u/{username}",
    params(("username" = String, Path, description = "Username, optionally with .json")),
    tag = "Users",
    request_body = UserUpdate,
    responses((status = 200, body = UserResponse), (status = 404))
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    payload: Payload,
) -> Result<Json<UserResponse>, ApiError> {
    let fields = payload.section("user");
    let update = UserUpdate {
        name: fields.text("name"),
        title: fields.text("title"),
        ..Default::default()
    };
    let mut store = state.store.write().await;
    let id = store.get_user_by_username(strip_json(&username))?.id;
    let user = store.update_user(id, update)?;
    Ok(Json(UserResponse { user }))
}

#[utoipa::path(
    put,
    path = "/u/{username}/preferences/email",
    params(("username" = String, Path, description = "Username")),
    tag = "Users",
    responses((status = 200, body = UserResponse), (status = 409), (status = 422))
)]
pub async fn update_email(
    State(state): State<AppState>,
    Path(username): Path<String>,
    payload: Payload,
) -> Result<Json<UserResponse>, ApiError> {
    let email = payload.text("email").unwrap_or_default();
    let mut store = state.store.write().await;
    let id = store.get_user_by_username(&username)?.id;
    let user = store.change_email(id, &email)?;
    Ok(Json(UserResponse { user }))
}

#[utoipa::path(
    put,
    path = "/u/{username}/preferences/username",
    params(("username" = String, Path, description = "Current username")),
    tag = "Users",
    responses((status = 200, body = UserResponse), (status = 409), (status = 422))
)]
pub async fn update_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
    payload: Payload,
) -> Result<Json<UserResponse>, ApiError> {
    let new_username = payload.text("new_username").unwrap_or_default();
    let mut store = state.store.write().await;
    let id = store.get_user_by_username(&username)?.id;
    let user = store.change_username(id, &new_username)?;
    tracing::info!(user_id = id, from = %username, to = %user.username, "username changed");
    Ok(Json(UserResponse { user }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn form(body: &str) -> Payload {
        Payload::parse(Some("application/x-www-form-urlencoded"), None, body.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn create_then_fetch_by_username() {
        let state = AppState::default();
        let Json(created) = create_user(
            State(state.clone()),
            form("username=carol&email=carol%40example.com&password=hunter2&active=true"),
        )
        .await
        .unwrap();
        assert!(created.success);
        assert!(created.active);

        let Json(response) = get_user(State(state.clone()), Path("carol.json".into()))
            .await
            .unwrap();
        assert_eq!(response.user.id, created.user_id);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let state = AppState::default();
        let err = create_user(
            State(state.clone()),
            form("username=alice2&email=ALICE%40example.com"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err = create_user(State(state), form("username=dave"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn external_id_lookup() {
        let state = AppState::default();
        let Json(response) = get_user_by_external_id(State(state.clone()), Path("ext-bob".into()))
            .await
            .unwrap();
        assert_eq!(response.user.username, "bob");

        let err = get_user_by_external_id(State(state), Path("ext-nobody".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn username_change_frees_the_old_name() {
        let state = AppState::default();
        let Json(response) = update_username(
            State(state.clone()),
            Path("bob".into()),
            form("new_username=robert"),
        )
        .await
        .unwrap();
        assert_eq!(response.user.id, 3);

        assert!(get_user(State(state.clone()), Path("bob".into())).await.is_err());
        let err = update_username(State(state), Path("alice".into()), form("new_username=robert"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn profile_update_accepts_nested_fields() {
        let state = AppState::default();
        let payload = Payload::parse(None, None, br#"{"user":{"title":"Gardener"}}"#).unwrap();
        let Json(response) = update_user(State(state), Path("alice".into()), payload)
            .await
            .unwrap();
        assert_eq!(response.user.title.as_deref(), Some("Gardener"));
        assert_eq!(response.user.name, "Alice Wonderland");
    }
}
