// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Likes and other post actions, performed as the acting user.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{
    entity_id,
    extract::{Actor, Payload},
};
use crate::{
    dispatch::parse_id,
    error::ApiError,
    models::{Post, POST_ACTION_LIKE},
    state::AppState,
};

fn action_type(payload: &Payload) -> Result<i32, ApiError> {
    match payload.int("post_action_type_id") {
        None => Ok(POST_ACTION_LIKE),
        Some(kind) => i32::try_from(kind)
            .map_err(|_| ApiError::unprocessable("post_action_type_id is out of range")),
    }
}

/// Act on post `id`. The type defaults to a like.
#[utoipa::path(
    post,
    path = "/post_actions.json",
    params(("Api-Username" = Option<String>, Header, description = "Acting user, defaults to system")),
    tag = "Posts",
    responses(
        (status = 200, description = "The post with updated counters", body = Post),
        (status = 404),
        (status = 409, description = "Action already taken")
    )
)]
pub async fn create_post_action(
    State(state): State<AppState>,
    Actor(user): Actor,
    payload: Payload,
) -> Result<Json<Post>, ApiError> {
    let post_id = payload
        .int("id")
        .ok_or_else(|| ApiError::unprocessable("id is required"))?;
    let kind = action_type(&payload)?;
    let mut store = state.store.write().await;
    store.create_post_action(post_id, user.id, kind)?;
    Ok(Json(store.get_post(post_id)?))
}

/// Undo the acting user's action on post `id`.
#[utoipa::path(
    delete,
    path = "/post_actions/{id}",
    params(
        ("id" = String, Path, description = "Post id, optionally with .json"),
        ("Api-Username" = Option<String>, Header, description = "Acting user, defaults to system")
    ),
    tag = "Posts",
    responses((status = 200, body = Post), (status = 404))
)]
pub async fn delete_post_action(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Json<Post>, ApiError> {
    let post_id = entity_id(parse_id(&id))?;
    let kind = action_type(&payload)?;
    let mut store = state.store.write().await;
    store.delete_post_action(post_id, user.id, kind)?;
    Ok(Json(store.get_post(post_id)?))
}
