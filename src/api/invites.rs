// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde_json::Value;

use super::extract::Payload;
use crate::{
    error::ApiError,
    models::{Invite, NewInvite},
    state::AppState,
};

/// Create an invite link, optionally bound to an email, a topic and groups.
#[utoipa::path(
    post,
    path = "/invites.json",
    request_body = NewInvite,
    tag = "Invites",
    responses(
        (status = 200, body = Invite),
        (status = 404, description = "Topic or group missing"),
        (status = 422, description = "Malformed email")
    )
)]
pub async fn create_invite(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<Invite>, ApiError> {
    let mut group_ids = payload.ints("group_ids");
    group_ids.extend(payload.ints("group_id"));
    let request = NewInvite {
        email: payload.text("email"),
        topic_id: payload.int("topic_id"),
        group_ids,
    };
    let invite = state.store.write().await.create_invite(request)?;
    tracing::info!(invite_id = invite.id, "invite created");
    Ok(Json(invite))
}

#[utoipa::path(
    delete,
    path = "/invites.json",
    params(("id" = i64, Query, description = "Invite id")),
    tag = "Invites",
    responses((status = 200), (status = 404))
)]
pub async fn delete_invite(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<Value>, ApiError> {
    let id = payload
        .int("id")
        .ok_or_else(|| ApiError::unprocessable("id is required"))?;
    state.store.write().await.delete_invite(id)?;
    Ok(super::success())
}
