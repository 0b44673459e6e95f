// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Category endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use super::{entity_id, extract::Payload, topics::TopicListResponse};
use crate::{
    dispatch::{parse_id, strip_json},
    error::ApiError,
    models::{Category, CategoryUpdate, NewCategory},
    state::AppState,
    store::{Store, StoreResult},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub can_create_category: bool,
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryListResponse {
    pub category_list: CategoryList,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub category: Category,
}

/// A `/c/` segment is an id when numeric and a slug otherwise.
fn find_category(store: &Store, key: &str) -> StoreResult<Category> {
    match parse_id(key) {
        Some(id) => store.get_category(id),
        None => store.get_category_by_slug(strip_json(key)),
    }
}

#[utoipa::path(
    get,
    path = "/categories.json",
    tag = "Categories",
    responses((status = 200, body = CategoryListResponse))
)]
pub async fn list_categories(State(state): State<AppState>) -> Json<CategoryListResponse> {
    Json(CategoryListResponse {
        category_list: CategoryList {
            can_create_category: true,
            categories: state.store.read().await.list_categories(),
        },
    })
}

#[utoipa::path(
    post,
    path = "/categories.json",
    tag = "Categories",
    request_body = NewCategory,
    responses(
        (status = 200, body = CategoryResponse),
        (status = 409, description = "Slug already in use"),
        (status = 422, description = "Missing name")
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<CategoryResponse>, ApiError> {
    let request = NewCategory {
        name: payload.text("name").unwrap_or_default(),
        slug: payload.text("slug"),
        color: payload.text("color"),
        text_color: payload.text("text_color"),
        description: payload.text("description"),
        parent_category_id: payload.int("parent_category_id"),
    };
    let category = state.store.write().await.create_category(request)?;
    tracing::info!(category_id = category.id, slug = %category.slug, "category created");
    Ok(Json(CategoryResponse { category }))
}

#[utoipa::path(
    put,
    path = "/categories/{id}",
    params(("id" = String, Path, description = "Category id, optionally with .json")),
    tag = "Categories",
    responses((status = 200, description = "Updated category"), (status = 404), (status = 409))
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Json<Value>, ApiError> {
    let update = CategoryUpdate {
        name: payload.text("name"),
        slug: payload.text("slug"),
        color: payload.text("color"),
        text_color: payload.text("text_color"),
        description: payload.text("description"),
    };
    let category = state
        .store
        .write()
        .await
        .update_category(entity_id(parse_id(&id))?, update)?;
    Ok(Json(json!({ "success": "OK", "category": category })))
}

/// Delete a category that holds no topics.
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    params(("id" = String, Path, description = "Category id, optionally with .json")),
    tag = "Categories",
    responses(
        (status = 200, description = "Deleted"),
        (status = 404),
        (status = 409, description = "Category still has topics")
    )
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let category = state
        .store
        .write()
        .await
        .delete_category(entity_id(parse_id(&id))?)?;
    tracing::info!(category_id = category.id, "category deleted");
    Ok(super::success())
}

#[utoipa::path(
    get,
    path = "/c/{category}/show.json",
    params(("category" = String, Path, description = "Category id or slug")),
    tag = "Categories",
    responses((status = 200, body = CategoryResponse), (status = 404))
)]
pub async fn show_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let store = state.store.read().await;
    let category = find_category(&store, &category)?;
    Ok(Json(CategoryResponse { category }))
}

/// Topics in a category. Every list name (`latest`, `top`, ...) returns
/// the same public topics.
#[utoipa::path(
    get,
    path = "/c/{category}/l/{list}",
    params(
        ("category" = String, Path, description = "Category id or slug"),
        ("list" = String, Path, description = "List name, e.g. latest.json")
    ),
    tag = "Categories",
    responses((status = 200, body = TopicListResponse), (status = 404))
)]
pub async fn category_topics(
    State(state): State<AppState>,
    Path((category, _list)): Path<(String, String)>,
) -> Result<Json<TopicListResponse>, ApiError> {
    let store = state.store.read().await;
    let category = find_category(&store, &category)?;
    Ok(Json(store.topics_by_category(category.id)?.into()))
}

/// Slug and id form of the category listing. The id wins.
#[utoipa::path(
    get,
    path = "/c/{category}/{category_id}/l/{list}",
    params(
        ("category" = String, Path, description = "Category slug"),
        ("category_id" = i64, Path, description = "Category id"),
        ("list" = String, Path, description = "List name, e.g. latest.json")
    ),
    tag = "Categories",
    responses((status = 200, body = TopicListResponse), (status = 404))
)]
pub async fn category_topics_by_id(
    State(state): State<AppState>,
    Path((_slug, category_id, _list)): Path<(String, String, String)>,
) -> Result<Json<TopicListResponse>, ApiError> {
    let id = entity_id(parse_id(&category_id))?;
    Ok(Json(state.store.read().await.topics_by_category(id)?.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn json_payload(body: &str) -> Payload {
        Payload::parse(Some("application/json"), None, body.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn listing_is_ordered_by_position() {
        let state = AppState::default();
        let Json(response) = list_categories(State(state)).await;
        let slugs: Vec<_> = response
            .category_list
            .categories
            .iter()
            .map(|c| c.slug.as_str())
            .collect();
        assert_eq!(slugs, ["general", "support", "meta"]);
    }

    #[tokio::test]
    async fn create_derives_slug_and_rejects_duplicates() {
        let state = AppState::default();
        let Json(created) = create_category(
            State(state.clone()),
            json_payload(r#"{"name":"Feature Requests","color":"25AAE2"}"#),
        )
        .await
        .unwrap();
        assert_eq!(created.category.slug, "feature-requests");

        let err = create_category(
            State(state),
            json_payload(r#"{"name":"Another","slug":"feature-requests"}"#),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn show_accepts_slug_or_id() {
        let state = AppState::default();
        let Json(by_slug) = show_category(State(state.clone()), Path("support".into()))
            .await
            .unwrap();
        let Json(by_id) = show_category(State(state), Path("2".into())).await.unwrap();
        assert_eq!(by_slug.category, by_id.category);
    }

    #[tokio::test]
    async fn topics_listing_by_slug_and_by_id() {
        let state = AppState::default();
        let Json(by_slug) = category_topics(
            State(state.clone()),
            Path(("general".into(), "latest.json".into())),
        )
        .await
        .unwrap();
        assert_eq!(by_slug.topic_list.topics.len(), 2);

        let Json(by_id) = category_topics_by_id(
            State(state.clone()),
            Path(("ignored".into(), "2".into(), "latest.json".into())),
        )
        .await
        .unwrap();
        assert_eq!(by_id.topic_list.topics[0].id, 3);

        let err = category_topics(State(state), Path(("missing".into(), "latest".into())))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_refuses_non_empty_category() {
        let state = AppState::default();
        let err = delete_category(State(state.clone()), Path("1".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        delete_category(State(state.clone()), Path("3.json".into()))
            .await
            .unwrap();
        assert!(state.store.read().await.get_category(3).is_err());
    }

    #[tokio::test]
    async fn update_renames_and_moves_slug() {
        let state = AppState::default();
        update_category(
            State(state.clone()),
            Path("3".into()),
            json_payload(r#"{"name":"Site Feedback","slug":"feedback"}"#),
        )
        .await
        .unwrap();
        let store = state.store.read().await;
        assert_eq!(store.get_category_by_slug("feedback").unwrap().name, "Site Feedback");
        assert!(store.get_category_by_slug("meta").is_err());
    }
}
