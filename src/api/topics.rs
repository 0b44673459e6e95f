// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Topic endpoints: the `/t/` family and the topic listings.

use axum::{
    extract::{Path, State},
    http::{header::LOCATION, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use super::{entity_id, extract::Payload, resolve, success};
use crate::{
    dispatch::{strip_json, TopicOp, TOPICS},
    error::ApiError,
    models::{Archetype, Topic, TopicStatus, TopicUpdate},
    state::AppState,
};

/// Topics come back 30 to a page in every listing.
const PER_PAGE: usize = 30;
const EXCERPT_CHARS: usize = 200;
const STATUS_NAMES: &str =
    "status must be one of closed, archived, pinned, pinned_globally, visible";

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicList {
    pub can_create_topic: bool,
    pub per_page: usize,
    pub topics: Vec<Topic>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicListResponse {
    pub topic_list: TopicList,
}

impl From<Vec<Topic>> for TopicListResponse {
    fn from(topics: Vec<Topic>) -> Self {
        Self {
            topic_list: TopicList {
                can_create_topic: true,
                per_page: PER_PAGE,
                topics,
            },
        }
    }
}

/// Everything under `/t/`, resolved through the topic decision table.
#[utoipa::path(
    method(get, put, post, delete),
    path = "/t/{tail}",
    params(("tail" = String, Path, description = "Path after /t/, e.g. `42.json`, `my-topic/42`, `42/status`, `external_id/abc`")),
    tag = "Topics",
    responses(
        (status = 200, description = "Operation result"),
        (status = 302, description = "External id lookups redirect to the topic URL"),
        (status = 404, description = "Unknown path shape or topic")
    )
)]
pub async fn topic_family(
    method: Method,
    State(state): State<AppState>,
    Path(tail): Path<String>,
    payload: Payload,
) -> Result<Response, ApiError> {
    let route = resolve(&TOPICS, &method, &tail)?;
    let id = route.id("id").or_else(|| route.id("topic_id"));
    tracing::debug!(operation = route.operation.name(), topic_id = ?id, "topic request");

    let response = match route.operation {
        TopicOp::GetTopicByExternalId => {
            let external_id = route.text("external_id").unwrap_or_default();
            let topic = state.store.read().await.get_topic_by_external_id(external_id)?;
            let location = format!("/t/{}/{}", topic.slug, topic.id);
            (StatusCode::FOUND, [(LOCATION, location)]).into_response()
        }
        TopicOp::GetTopicIdForSlug => {
            let slug = route.text("slug").unwrap_or_default();
            let topic_id = state.store.read().await.topic_id_for_slug(slug)?;
            Json(json!({
                "topic_id": topic_id,
                "slug": slug,
                "url": format!("/t/{slug}/{topic_id}"),
            }))
            .into_response()
        }
        TopicOp::GetTopic => {
            Json(state.store.read().await.get_topic_view(entity_id(id)?)?).into_response()
        }
        TopicOp::GetTopicPosts => {
            let topic_id = entity_id(id)?;
            let only = payload.ints("post_ids");
            let filter = (!only.is_empty()).then_some(only.as_slice());
            let posts = state.store.read().await.topic_posts(topic_id, filter)?;
            let stream: Vec<i64> = posts.iter().map(|post| post.id).collect();
            Json(json!({
                "id": topic_id,
                "post_stream": { "posts": posts, "stream": stream },
            }))
            .into_response()
        }
        TopicOp::GetTopicPostIds => {
            Json(state.store.read().await.topic_post_ids(entity_id(id)?)?).into_response()
        }
        TopicOp::GetTopicExcerpts => {
            let posts = state.store.read().await.topic_posts(entity_id(id)?, None)?;
            let excerpts: Vec<_> = posts
                .iter()
                .map(|post| {
                    json!({
                        "post_id": post.id,
                        "post_number": post.post_number,
                        "excerpt": post.raw.chars().take(EXCERPT_CHARS).collect::<String>(),
                    })
                })
                .collect();
            Json(excerpts).into_response()
        }
        TopicOp::GetTopicViewStats => {
            let topic = state.store.read().await.get_topic(entity_id(id)?)?;
            Json(json!({ "topic_id": topic.id, "views": topic.views, "stats": [] })).into_response()
        }
        TopicOp::UpdateTopic => {
            let fields = payload.section("topic");
            let update = TopicUpdate {
                title: fields.text("title"),
                category_id: fields.int("category_id").or_else(|| fields.int("category")),
                visible: fields.flag("visible"),
                external_id: fields.text("external_id"),
            };
            let topic = state.store.write().await.update_topic(entity_id(id)?, update)?;
            Json(json!({ "basic_topic": topic })).into_response()
        }
        TopicOp::UpdateStatus => {
            let status = payload
                .text("status")
                .and_then(|status| TopicStatus::parse(&status))
                .ok_or_else(|| ApiError::unprocessable(STATUS_NAMES))?;
            let enabled = payload.flag("enabled").unwrap_or(false);
            let topic = state
                .store
                .write()
                .await
                .set_topic_status(entity_id(id)?, status, enabled)?;
            Json(json!({
                "success": "OK",
                "topic_status_update": null,
                "topic": topic,
            }))
            .into_response()
        }
        TopicOp::ClearPin | TopicOp::RePin => {
            let pinned = route.operation == TopicOp::RePin;
            state
                .store
                .write()
                .await
                .set_topic_status(entity_id(id)?, TopicStatus::Pinned, pinned)?;
            success().into_response()
        }
        TopicOp::ConvertTopic => {
            let target = route
                .text("type")
                .map(str::to_string)
                .or_else(|| payload.text("type"))
                .unwrap_or_else(|| "public".to_string());
            let archetype = match target.as_str() {
                "public" | "regular" => Archetype::Regular,
                "private" | "private_message" => Archetype::PrivateMessage,
                other => return Err(ApiError::unprocessable(format!("unknown topic type {other}"))),
            };
            let topic = state.store.write().await.convert_topic(entity_id(id)?, archetype)?;
            Json(json!({ "success": "OK", "url": format!("/t/{}/{}", topic.slug, topic.id) }))
                .into_response()
        }
        TopicOp::ResetBumpDate => {
            state.store.write().await.reset_bump_date(entity_id(id)?)?;
            success().into_response()
        }
        TopicOp::UpdateTags => {
            let tags = payload.strings("tags");
            let topic = state.store.write().await.set_topic_tags(entity_id(id)?, &tags)?;
            Json(json!({ "success": "OK", "topic": topic })).into_response()
        }
        TopicOp::ChangeOwner => {
            let username = payload
                .text("username")
                .ok_or_else(|| ApiError::unprocessable("username is required"))?;
            let post_ids = payload.ints("post_ids");
            state
                .store
                .write()
                .await
                .change_post_owner(entity_id(id)?, &post_ids, &username)?;
            success().into_response()
        }
        TopicOp::DeleteTopic => {
            state.store.write().await.delete_topic(entity_id(id)?)?;
            success().into_response()
        }
        TopicOp::ChangeTimestamp
        | TopicOp::Bookmark
        | TopicOp::RemoveBookmarks
        | TopicOp::ArchiveMessage
        | TopicOp::MoveToInbox
        | TopicOp::Publish
        | TopicOp::Mute
        | TopicOp::Unmute
        | TopicOp::MakeBanner
        | TopicOp::RemoveBanner
        | TopicOp::RemoveAllowedUser
        | TopicOp::RemoveAllowedGroup
        | TopicOp::Recover
        | TopicOp::SlowMode
        | TopicOp::SetNotificationLevel
        | TopicOp::Invite
        | TopicOp::MovePosts
        | TopicOp::MergeTopic
        | TopicOp::InviteGroup
        | TopicOp::DeleteTimings => {
            // Accepted without state change once the topic is known.
            state.store.read().await.get_topic(entity_id(id)?)?;
            success().into_response()
        }
    };
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/latest.json",
    tag = "Topics",
    responses((status = 200, body = TopicListResponse))
)]
pub async fn latest(State(state): State<AppState>) -> Json<TopicListResponse> {
    Json(state.store.read().await.latest_topics().into())
}

#[utoipa::path(
    get,
    path = "/top.json",
    tag = "Topics",
    responses((status = 200, body = TopicListResponse))
)]
pub async fn top(State(state): State<AppState>) -> Json<TopicListResponse> {
    Json(state.store.read().await.top_topics().into())
}

#[utoipa::path(
    get,
    path = "/topics/created-by/{username}",
    params(("username" = String, Path, description = "Creator username, optionally with .json")),
    tag = "Topics",
    responses((status = 200, body = TopicListResponse))
)]
pub async fn created_by(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Json<TopicListResponse> {
    let username = strip_json(&username);
    Json(state.store.read().await.topics_by_creator(username).into())
}

#[utoipa::path(
    get,
    path = "/topics/private-messages/{username}",
    params(("username" = String, Path, description = "Participant username")),
    tag = "Topics",
    responses((status = 200, body = TopicListResponse), (status = 404))
)]
pub async fn private_messages(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<TopicListResponse>, ApiError> {
    let store = state.store.read().await;
    let user = store.get_user_by_username(strip_json(&username))?;
    Ok(Json(store.private_messages(&user.username).into()))
}

#[utoipa::path(
    get,
    path = "/topics/private-messages-sent/{username}",
    params(("username" = String, Path, description = "Sender username")),
    tag = "Topics",
    responses((status = 200, body = TopicListResponse), (status = 404))
)]
pub async fn private_messages_sent(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<TopicListResponse>, ApiError> {
    let store = state.store.read().await;
    let user = store.get_user_by_username(strip_json(&username))?;
    Ok(Json(store.sent_private_messages(&user.username).into()))
}
