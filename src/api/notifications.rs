// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use super::extract::{Actor, Payload};
use crate::{error::ApiError, models::Notification, state::AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub total_rows_notifications: usize,
}

/// The acting user's notifications, newest first.
#[utoipa::path(
    get,
    path = "/notifications.json",
    params(("Api-Username" = Option<String>, Header, description = "Whose notifications, defaults to system")),
    tag = "Notifications",
    responses((status = 200, body = NotificationListResponse))
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Actor(user): Actor,
) -> Json<NotificationListResponse> {
    let notifications = state.store.read().await.notifications_for(user.id);
    Json(NotificationListResponse {
        total_rows_notifications: notifications.len(),
        notifications,
    })
}

/// Mark one notification (`id`) or all of the acting user's as read.
#[utoipa::path(
    put,
    path = "/notifications/mark-read.json",
    params(("Api-Username" = Option<String>, Header, description = "Whose notifications, defaults to system")),
    tag = "Notifications",
    responses((status = 200), (status = 404, description = "Notification not owned by the user"))
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Actor(user): Actor,
    payload: Payload,
) -> Result<Json<Value>, ApiError> {
    let changed = state
        .store
        .write()
        .await
        .mark_notifications_read(user.id, payload.int("id"))?;
    tracing::debug!(user_id = user.id, changed, "notifications marked read");
    Ok(Json(json!({ "success": "OK" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    async fn actor(state: &AppState, username: &str) -> Actor {
        Actor(state.store.read().await.get_user_by_username(username).unwrap())
    }

    #[tokio::test]
    async fn reply_notifies_topic_creator() {
        let state = AppState::default();
        let admin = actor(&state, "admin").await;
        let Json(response) = list_notifications(State(state.clone()), admin).await;
        assert_eq!(response.total_rows_notifications, 1);
        assert_eq!(response.notifications[0].topic_id, Some(1));
        assert!(!response.notifications[0].read);

        let Json(bob) = list_notifications(State(state.clone()), actor(&state, "bob").await).await;
        assert!(bob.notifications.is_empty());
    }

    #[tokio::test]
    async fn mark_read_is_scoped_to_the_actor() {
        let state = AppState::default();
        let id = state.store.read().await.notifications_for(1)[0].id;

        let foreign = Payload::parse(None, Some(&format!("id={id}")), b"").unwrap();
        let err = mark_read(State(state.clone()), actor(&state, "bob").await, foreign)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        mark_read(State(state.clone()), actor(&state, "admin").await, Payload::default())
            .await
            .unwrap();
        assert!(state.store.read().await.notifications_for(1)[0].read);
    }
}
