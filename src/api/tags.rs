// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::topics::TopicListResponse;
use crate::{dispatch::strip_json, error::ApiError, models::Tag, state::AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct TagListResponse {
    pub tags: Vec<Tag>,
}

#[utoipa::path(
    get,
    path = "/tags.json",
    tag = "Tags",
    responses((status = 200, body = TagListResponse))
)]
pub async fn list_tags(State(state): State<AppState>) -> Json<TagListResponse> {
    Json(TagListResponse {
        tags: state.store.read().await.list_tags(),
    })
}

/// Public topics carrying a tag.
#[utoipa::path(
    get,
    path = "/tag/{tag}",
    params(("tag" = String, Path, description = "Tag name, optionally with .json")),
    tag = "Tags",
    responses((status = 200, body = TopicListResponse), (status = 404))
)]
pub async fn tag_topics(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Json<TopicListResponse>, ApiError> {
    let store = state.store.read().await;
    let tag = store.get_tag(strip_json(&tag))?;
    Ok(Json(store.topics_by_tag(&tag.name).into()))
}

#[utoipa::path(
    get,
    path = "/tag/{tag}/l/{list}",
    params(
        ("tag" = String, Path, description = "Tag name"),
        ("list" = String, Path, description = "List name, e.g. latest.json")
    ),
    tag = "Tags",
    responses((status = 200, body = TopicListResponse), (status = 404))
)]
pub async fn tag_topics_list(
    state: State<AppState>,
    Path((tag, _list)): Path<(String, String)>,
) -> Result<Json<TopicListResponse>, ApiError> {
    tag_topics(state, Path(tag)).await
}
