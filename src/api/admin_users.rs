// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The `/admin/users/` family.

use axum::{
    extract::{Path, State},
    http::Method,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use super::{entity_id, extract::Payload, resolve, success};
use crate::{
    dispatch::{AdminUserOp, ADMIN_USERS},
    error::ApiError,
    models::{AdminAction, SsoIdentity},
    state::AppState,
    store::UserListKind,
};

/// Everything under `/admin/users/`, resolved through the admin user table.
#[utoipa::path(
    method(get, put, post, delete),
    path = "/admin/users/{tail}",
    params(("tail" = String, Path, description = "Path after /admin/users/, e.g. `2.json`, `list/active.json`, `2/suspend`, `sync_sso`")),
    tag = "Admin",
    responses(
        (status = 200, description = "Operation result"),
        (status = 404, description = "Unknown path shape or user"),
        (status = 422, description = "Invalid parameters")
    )
)]
pub async fn admin_user_family(
    method: Method,
    State(state): State<AppState>,
    Path(tail): Path<String>,
    payload: Payload,
) -> Result<Response, ApiError> {
    let route = resolve(&ADMIN_USERS, &method, &tail)?;
    let id = route.id("id");
    tracing::debug!(operation = route.operation.name(), user_id = ?id, "admin user request");

    let action = match route.operation {
        AdminUserOp::Approve => Some(AdminAction::Approve),
        AdminUserOp::Activate => Some(AdminAction::Activate),
        AdminUserOp::Deactivate => Some(AdminAction::Deactivate),
        AdminUserOp::GrantAdmin => Some(AdminAction::GrantAdmin),
        AdminUserOp::RevokeAdmin => Some(AdminAction::RevokeAdmin),
        AdminUserOp::GrantModeration => Some(AdminAction::GrantModeration),
        AdminUserOp::RevokeModeration => Some(AdminAction::RevokeModeration),
        AdminUserOp::Suspend => Some(AdminAction::Suspend),
        AdminUserOp::Unsuspend => Some(AdminAction::Unsuspend),
        AdminUserOp::Silence => Some(AdminAction::Silence),
        AdminUserOp::Unsilence => Some(AdminAction::Unsilence),
        AdminUserOp::Anonymize => Some(AdminAction::Anonymize),
        AdminUserOp::TrustLevel => {
            let level = payload
                .int("level")
                .ok_or_else(|| ApiError::unprocessable("level is required"))?;
            let level = u8::try_from(level)
                .map_err(|_| ApiError::unprocessable("trust_level must be between 0 and 4"))?;
            Some(AdminAction::TrustLevel(level))
        }
        AdminUserOp::PrimaryGroup => {
            Some(AdminAction::PrimaryGroup(payload.int("primary_group_id")))
        }
        _ => None,
    };
    if let Some(action) = action {
        let user = state.store.write().await.admin_action(entity_id(id)?, action)?;
        tracing::info!(
            user_id = user.id,
            operation = route.operation.name(),
            "admin action applied"
        );
        return Ok(Json(json!({ "success": "OK", "user": user })).into_response());
    }

    let response = match route.operation {
        AdminUserOp::ListUsers => {
            let kind = UserListKind::parse(route.text("type").unwrap_or_default());
            Json(state.store.read().await.list_users(kind)).into_response()
        }
        AdminUserOp::GetUser => {
            Json(state.store.read().await.get_user(entity_id(id)?)?).into_response()
        }
        AdminUserOp::ApproveBulk => {
            let approved = state.store.write().await.approve_users(&payload.ints("users"))?;
            Json(json!({ "success": "OK", "approved": approved.len() })).into_response()
        }
        AdminUserOp::DestroyBulk => {
            let deleted = state.store.write().await.delete_users(&payload.ints("users"))?;
            Json(json!({ "success": "OK", "deleted": deleted.len() })).into_response()
        }
        AdminUserOp::DeleteUser => {
            let user = state.store.write().await.delete_user(entity_id(id)?)?;
            tracing::info!(user_id = user.id, username = %user.username, "user deleted");
            Json(json!({ "deleted": true })).into_response()
        }
        AdminUserOp::SyncSso => {
            let (Some(external_id), Some(email)) =
                (payload.text("external_id"), payload.text("email"))
            else {
                return Err(ApiError::unprocessable("external_id and email are required"));
            };
            let identity = SsoIdentity {
                external_id,
                email,
                username: payload.text("username"),
                name: payload.text("name"),
            };
            let (user, created) = state.store.write().await.sync_sso(identity)?;
            tracing::info!(user_id = user.id, created, "user synced from sso");
            Json(user).into_response()
        }
        AdminUserOp::GenerateApiKey => {
            state.store.read().await.get_user(entity_id(id)?)?;
            let key = Uuid::new_v4().simple().to_string();
            Json(json!({ "api_key": { "key": key } })).into_response()
        }
        AdminUserOp::IpInfo => {
            state.store.read().await.get_user(entity_id(id)?)?;
            Json(json!({ "ip": "127.0.0.1" })).into_response()
        }
        _ => {
            state.store.read().await.get_user(entity_id(id)?)?;
            success().into_response()
        }
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};
    use serde_json::Value;

    async fn call(
        state: &AppState,
        method: Method,
        tail: &str,
        body: &str,
    ) -> Result<Response, ApiError> {
        let payload = Payload::parse(Some("application/json"), None, body.as_bytes()).unwrap();
        admin_user_family(
            method,
            State(state.clone()),
            Path(tail.to_string()),
            payload,
        )
        .await
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn list_filters_by_type() {
        let state = AppState::default();
        let staff = call(&state, Method::GET, "list/staff.json", "").await.unwrap();
        let staff = body_json(staff).await;
        assert_eq!(staff.as_array().unwrap().len(), 1);
        let all = body_json(call(&state, Method::GET, "list/whatever", "").await.unwrap()).await;
        assert_eq!(all.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn state_changes_apply_to_the_user() {
        let state = AppState::default();
        call(&state, Method::PUT, "3/suspend", "").await.unwrap();
        call(&state, Method::PUT, "3/trust_level", r#"{"level":3}"#).await.unwrap();
        let bob = state.store.read().await.get_user(3).unwrap();
        assert!(bob.suspended);
        assert_eq!(bob.trust_level, 3);

        let err = call(&state, Method::PUT, "3/trust_level", r#"{"level":9}"#).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        let err = call(&state, Method::PUT, "99/suspend", "").await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn sync_sso_requires_identity_fields() {
        let state = AppState::default();
        let err = call(&state, Method::POST, "sync_sso", r#"{"email":"x@example.com"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let user = body_json(
            call(
                &state,
                Method::POST,
                "sync_sso",
                r#"{"external_id":"ext-carol","email":"carol@example.com","username":"carol"}"#,
            )
            .await
            .unwrap(),
        )
        .await;
        assert_eq!(user["username"], "carol");
        assert_eq!(user["trust_level"], 0);
    }

    #[tokio::test]
    async fn bulk_delete_is_all_or_nothing() {
        let state = AppState::default();
        let err = call(&state, Method::DELETE, "destroy-bulk", r#"{"users":[2,99]}"#)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(state.store.read().await.get_user(2).is_ok());

        call(&state, Method::DELETE, "destroy-bulk", r#"{"users":[2,3]}"#)
            .await
            .unwrap();
        assert!(state.store.read().await.get_user(3).is_err());
    }

    #[tokio::test]
    async fn system_user_cannot_be_deleted() {
        let state = AppState::default();
        let err = call(&state, Method::DELETE, "-1.json", "").await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
