// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::extract::Payload;
use crate::{dispatch::strip_json, error::ApiError, models::SiteSetting, state::AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct SiteSettingsResponse {
    pub site_settings: Vec<SiteSetting>,
}

#[utoipa::path(
    get,
    path = "/admin/site_settings.json",
    tag = "Admin",
    responses((status = 200, body = SiteSettingsResponse))
)]
pub async fn list_site_settings(State(state): State<AppState>) -> Json<SiteSettingsResponse> {
    Json(SiteSettingsResponse {
        site_settings: state.store.read().await.list_site_settings(),
    })
}

/// Change one setting. The new value is read from a field named after the
/// setting, or from `value`.
#[utoipa::path(
    put,
    path = "/admin/site_settings/{name}",
    params(("name" = String, Path, description = "Setting name, optionally with .json")),
    tag = "Admin",
    responses(
        (status = 200, description = "Setting updated"),
        (status = 404, description = "Unknown setting"),
        (status = 422, description = "No value sent")
    )
)]
pub async fn update_site_setting(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Payload,
) -> Result<Json<Value>, ApiError> {
    let name = strip_json(&name);
    let value = payload
        .get(name)
        .or_else(|| payload.get("value"))
        .cloned()
        .ok_or_else(|| ApiError::unprocessable(format!("{name} value is required")))?;

    let setting = state.store.write().await.update_site_setting(name, value)?;
    tracing::info!(setting = %setting.setting, value = %setting.value, "site setting changed");
    Ok(super::success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    fn body(value: Value) -> Payload {
        Payload::parse(Some("application/json"), None, value.to_string().as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn update_round_trips_through_the_listing() {
        let state = AppState::default();
        update_site_setting(
            State(state.clone()),
            Path("title.json".into()),
            body(json!({ "title": "SDK Sandbox" })),
        )
        .await
        .unwrap();
        update_site_setting(
            State(state.clone()),
            Path("max_tags_per_topic".into()),
            body(json!({ "value": 8 })),
        )
        .await
        .unwrap();

        let Json(listing) = list_site_settings(State(state)).await;
        let find = |name: &str| {
            listing
                .site_settings
                .iter()
                .find(|s| s.setting == name)
                .cloned()
                .unwrap()
        };
        let title = find("title");
        assert_eq!(title.value, json!("SDK Sandbox"));
        assert_eq!(title.default, json!("Discourse Twin"));
        assert_eq!(find("max_tags_per_topic").value, json!(8));
        assert_eq!(find("tagging_enabled").value, json!(true));
    }

    #[tokio::test]
    async fn unknown_setting_or_missing_value_is_rejected() {
        let state = AppState::default();
        let err = update_site_setting(
            State(state.clone()),
            Path("no_such_setting".into()),
            body(json!({ "value": 1 })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = update_site_setting(State(state), Path("title".into()), body(json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
