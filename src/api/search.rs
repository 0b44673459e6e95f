// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use super::extract::Payload;
use crate::{
    error::ApiError,
    models::{Post, Topic},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupedSearchResult {
    pub term: String,
    pub post_ids: Vec<i64>,
    pub topic_ids: Vec<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    pub posts: Vec<Post>,
    pub topics: Vec<Topic>,
    pub grouped_search_result: GroupedSearchResult,
}

/// Substring search over post text and topic titles. The term comes from
/// `q` or `term`.
#[utoipa::path(
    get,
    path = "/search.json",
    params(("q" = String, Query, description = "Search term")),
    tag = "Search",
    responses(
        (status = 200, body = SearchResponse),
        (status = 422, description = "Empty search term")
    )
)]
pub async fn search(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<SearchResponse>, ApiError> {
    let term = payload
        .text("q")
        .or_else(|| payload.text("term"))
        .unwrap_or_default();
    let result = state.store.read().await.search(&term)?;
    Ok(Json(SearchResponse {
        grouped_search_result: GroupedSearchResult {
            term,
            post_ids: result.posts.iter().map(|p| p.id).collect(),
            topic_ids: result.topics.iter().map(|t| t.id).collect(),
        },
        posts: result.posts,
        topics: result.topics,
    }))
}
