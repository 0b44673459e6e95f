// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! DiscourseConnect login endpoints and the current session.

use axum::{
    extract::{Query, State},
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::extract::Actor;
use crate::{
    error::ApiError,
    models::User,
    sso::{SsoStart, FALLBACK_SSO_URL},
    state::AppState,
};

/// Where a completed login lands.
const AFTER_LOGIN: &str = "/";

/// Answer to a login start while SSO is disabled.
#[derive(Debug, Serialize, ToSchema)]
pub struct SsoFallback {
    pub sso_url: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SsoCallbackQuery {
    /// Base64 payload as returned by the identity provider.
    pub sso: Option<String>,
    /// Lowercase hex HMAC-SHA256 of `sso`.
    pub sig: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUserResponse {
    pub current_user: User,
}

fn found(location: impl Into<String>) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.into())]).into_response()
}

/// Start a DiscourseConnect login.
///
/// Redirects to the identity provider with a signed single-use nonce, or
/// answers with the local login URL when SSO is not configured.
#[utoipa::path(
    get,
    path = "/session/sso",
    tag = "Session",
    responses(
        (status = 302, description = "Redirect to the identity provider"),
        (status = 200, description = "SSO disabled", body = SsoFallback)
    )
)]
pub async fn sso_initiate(State(state): State<AppState>) -> Result<Response, ApiError> {
    let response = match state.sso.initiate()? {
        SsoStart::Redirect(target) => found(target),
        SsoStart::Fallback => Json(SsoFallback {
            sso_url: FALLBACK_SSO_URL.to_string(),
        })
        .into_response(),
    };
    Ok(response)
}

/// Finish a DiscourseConnect login.
///
/// The signature is checked before anything else; the nonce is then
/// consumed and the user upserted by external id.
#[utoipa::path(
    get,
    path = "/session/sso_login",
    params(SsoCallbackQuery),
    tag = "Session",
    responses(
        (status = 302, description = "Login complete"),
        (status = 400, description = "SSO disabled or parameters missing"),
        (status = 403, description = "Bad signature or unknown nonce"),
        (status = 422, description = "external_id or email missing")
    )
)]
pub async fn sso_login(
    State(state): State<AppState>,
    Query(query): Query<SsoCallbackQuery>,
) -> Result<Response, ApiError> {
    state
        .sso
        .complete(&state.store, query.sso.as_deref(), query.sig.as_deref())
        .await?;
    Ok(found(AFTER_LOGIN))
}

/// The user requests are performed as.
#[utoipa::path(
    get,
    path = "/session/current.json",
    params(("Api-Username" = Option<String>, Header, description = "Acting user, defaults to system")),
    tag = "Session",
    responses((status = 200, body = CurrentUserResponse), (status = 403))
)]
pub async fn current_user(Actor(user): Actor) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse { current_user: user })
}
