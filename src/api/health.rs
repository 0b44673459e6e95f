// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;
use crate::store::UserListKind;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status.
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Registered users, excluding the system account.
    pub users: usize,
    /// Number of topics in the store.
    pub topics: usize,
    /// "configured" when a DiscourseConnect secret is set, else "disabled".
    pub sso: String,
    /// SSO logins started but not yet completed or expired.
    pub pending_sso_nonces: usize,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check endpoint handler.
///
/// The store lives in memory, so once the lock is acquired the service is
/// ready. The counts help confirm which data a test run is talking to.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<ReadyResponse> {
    let (users, topics) = {
        let store = state.store.read().await;
        (
            store.list_users(UserListKind::All).len(),
            store.topic_count(),
        )
    };

    Json(ReadyResponse {
        status: "ok".to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            users,
            topics,
            sso: if state.sso.is_configured() {
                "configured"
            } else {
                "disabled"
            }
            .to_string(),
            pending_sso_nonces: state.sso.pending_nonces(),
        },
    })
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
