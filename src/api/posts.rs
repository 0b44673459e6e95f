// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Post endpoints: creation, the latest feed and the `/posts/` family.

use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, Method},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use super::{
    entity_id,
    extract::{Actor, Payload},
    resolve, success,
};
use crate::{
    dispatch::{PostOp, POSTS},
    error::ApiError,
    models::{Archetype, NewPost, NewTopic, Post},
    state::AppState,
    store::PostFlag,
};

const LATEST_POSTS: usize = 50;

#[derive(Debug, Serialize, ToSchema)]
pub struct LatestPostsResponse {
    pub latest_posts: Vec<Post>,
}

/// Create a post. With a `title` this starts a new topic and returns its
/// first post; otherwise `topic_id` names the topic to reply to.
#[utoipa::path(
    post,
    path = "/posts.json",
    tag = "Posts",
    params(("Api-Username" = Option<String>, Header, description = "Acting user, defaults to system")),
    responses(
        (status = 200, body = Post),
        (status = 404, description = "Topic, category or reply target missing"),
        (status = 422, description = "Missing raw, title or topic_id")
    )
)]
pub async fn create_post(
    State(state): State<AppState>,
    Actor(author): Actor,
    payload: Payload,
) -> Result<Json<Post>, ApiError> {
    let raw = payload.text("raw").unwrap_or_default();

    if let Some(title) = payload.text("title") {
        let target_usernames = payload.text("target_usernames");
        let archetype = match payload.text("archetype").as_deref() {
            Some("private_message") => Archetype::PrivateMessage,
            Some(_) => Archetype::Regular,
            None if target_usernames.is_some() => Archetype::PrivateMessage,
            None => Archetype::Regular,
        };
        let request = NewTopic {
            title,
            raw,
            author_id: author.id,
            category_id: payload.int("category"),
            tags: payload.strings("tags"),
            archetype,
            external_id: payload.text("external_id"),
        };
        let (_, post) = state.store.write().await.create_topic(request)?;
        return Ok(Json(post));
    }

    let topic_id = payload
        .int("topic_id")
        .ok_or_else(|| ApiError::unprocessable("topic_id is required for replies"))?;
    let post = state.store.write().await.create_post(NewPost {
        topic_id,
        raw,
        author_id: author.id,
        reply_to_post_number: payload.int("reply_to_post_number"),
    })?;
    Ok(Json(post))
}

#[utoipa::path(
    get,
    path = "/posts.json",
    tag = "Posts",
    responses((status = 200, body = LatestPostsResponse))
)]
pub async fn latest_posts(State(state): State<AppState>) -> Json<LatestPostsResponse> {
    Json(LatestPostsResponse {
        latest_posts: state.store.read().await.latest_posts(LATEST_POSTS),
    })
}

/// Everything under `/posts/`, resolved through the post decision table.
#[utoipa::path(
    method(get, put, post, delete),
    path = "/posts/{tail}",
    params(("tail" = String, Path, description = "Path after /posts/, e.g. `5.json`, `by_number/5/3`, `5/revisions/latest`, `alice/deleted`")),
    tag = "Posts",
    responses(
        (status = 200, description = "Operation result"),
        (status = 404, description = "Unknown path shape or post")
    )
)]
pub async fn post_family(
    method: Method,
    State(state): State<AppState>,
    Path(tail): Path<String>,
    payload: Payload,
) -> Result<Response, ApiError> {
    let route = resolve(&POSTS, &method, &tail)?;
    let id = route.id("id");
    tracing::debug!(operation = route.operation.name(), post_id = ?id, "post request");

    let response = match route.operation {
        PostOp::GetPost => Json(state.store.read().await.get_post(entity_id(id)?)?).into_response(),
        PostOp::GetPostByNumber => {
            let topic_id = entity_id(route.id("topic_id"))?;
            let post_number = entity_id(route.id("post_number"))?;
            let post = state.store.read().await.get_post_by_number(topic_id, post_number)?;
            Json(post).into_response()
        }
        PostOp::GetLatestRevision => {
            Json(state.store.read().await.post_revision(entity_id(id)?, None)?).into_response()
        }
        PostOp::GetRevision => {
            let number = route.id("revision");
            Json(state.store.read().await.post_revision(entity_id(id)?, number)?).into_response()
        }
        PostOp::GetReplyHistory => {
            Json(state.store.read().await.post_reply_history(entity_id(id)?)?).into_response()
        }
        PostOp::GetReplyIds => {
            let ids = state.store.read().await.post_reply_ids(entity_id(id)?)?;
            let ids: Vec<_> = ids.into_iter().map(|id| json!({ "id": id })).collect();
            Json(ids).into_response()
        }
        PostOp::GetCooked => {
            let post = state.store.read().await.get_post(entity_id(id)?)?;
            Json(json!({ "cooked": post.cooked })).into_response()
        }
        PostOp::GetRaw => {
            let post = state.store.read().await.get_post(entity_id(id)?)?;
            ([(CONTENT_TYPE, "text/plain; charset=utf-8")], post.raw).into_response()
        }
        PostOp::GetReplies => {
            Json(state.store.read().await.post_replies(entity_id(id)?)?).into_response()
        }
        PostOp::UpdatePost => {
            let raw = payload
                .section("post")
                .text("raw")
                .ok_or_else(|| ApiError::unprocessable("raw can't be blank"))?;
            let post = state.store.write().await.update_post(entity_id(id)?, &raw)?;
            Json(json!({ "post": post })).into_response()
        }
        PostOp::SetWiki | PostOp::SetLocked | PostOp::Unhide => {
            let (flag, enabled) = match route.operation {
                PostOp::SetWiki => (PostFlag::Wiki, payload.flag("wiki").unwrap_or(true)),
                PostOp::SetLocked => (PostFlag::Locked, payload.flag("locked").unwrap_or(true)),
                _ => (PostFlag::Hidden, false),
            };
            let post = state
                .store
                .write()
                .await
                .set_post_flag(entity_id(id)?, flag, enabled)?;
            Json(json!({ "success": "OK", "post": post })).into_response()
        }
        PostOp::RevertRevision => {
            let revision = entity_id(route.id("revision"))?;
            let post = state.store.write().await.revert_post(entity_id(id)?, revision)?;
            Json(json!({ "post": post })).into_response()
        }
        PostOp::MergePosts => {
            let post = state.store.write().await.merge_posts(&payload.ints("post_ids"))?;
            Json(json!({ "success": "OK", "post": post })).into_response()
        }
        PostOp::DeletePost => {
            state.store.write().await.delete_post(entity_id(id)?)?;
            success().into_response()
        }
        PostOp::DestroyMany => {
            let deleted = state.store.write().await.delete_posts(&payload.ints("post_ids"))?;
            Json(json!({ "success": "OK", "deleted": deleted.len() })).into_response()
        }
        PostOp::GetUserDeletedPosts | PostOp::GetUserPendingPosts => {
            // Posts are deleted outright and never queued, so both lists are
            // empty for any known user.
            let username = route.text("username").unwrap_or_default();
            state.store.read().await.get_user_by_username(username)?;
            Json(Vec::<Post>::new()).into_response()
        }
        PostOp::Recover
        | PostOp::Rebake
        | PostOp::SetPostType
        | PostOp::SetNotice
        | PostOp::HideRevision
        | PostOp::ShowRevision
        | PostOp::PermanentlyDeleteRevisions
        | PostOp::DeleteBookmark => {
            state.store.read().await.get_post(entity_id(id)?)?;
            success().into_response()
        }
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SYSTEM_USER_ID;
    use axum::{body::to_bytes, http::StatusCode};

    async fn actor(state: &AppState, username: &str) -> Actor {
        Actor(state.store.read().await.get_user_by_username(username).unwrap())
    }

    fn json_payload(body: &str) -> Payload {
        Payload::parse(Some("application/json"), None, body.as_bytes()).unwrap()
    }

    async fn call(
        state: &AppState,
        method: Method,
        tail: &str,
        body: &str,
    ) -> Result<Response, ApiError> {
        post_family(
            method,
            State(state.clone()),
            Path(tail.to_string()),
            json_payload(body),
        )
        .await
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_with_title_starts_a_topic() {
        let state = AppState::default();
        let Json(post) = create_post(
            State(state.clone()),
            actor(&state, "alice").await,
            json_payload(
                r#"{"title":"Fresh topic","raw":"Body text","category":2,"tags":["new"]}"#,
            ),
        )
        .await
        .unwrap();
        assert_eq!(post.post_number, 1);
        assert_eq!(post.username, "alice");

        let store = state.store.read().await;
        assert_eq!(store.get_topic(post.topic_id).unwrap().category_id, Some(2));
        assert_eq!(store.get_category(2).unwrap().topic_count, 2);
    }

    #[tokio::test]
    async fn create_without_title_replies() {
        let state = AppState::default();
        let Json(post) = create_post(
            State(state.clone()),
            actor(&state, "bob").await,
            json_payload(r#"{"topic_id":"1","raw":"Me too","reply_to_post_number":1}"#),
        )
        .await
        .unwrap();
        assert_eq!(post.post_number, 3);
        assert_eq!(post.reply_to_post_number, Some(1));

        let err = create_post(
            State(state.clone()),
            actor(&state, "bob").await,
            json_payload(r#"{"raw":"orphan"}"#),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn by_number_differs_from_id() {
        let state = AppState::default();
        let by_number = call(&state, Method::GET, "by_number/1/2", "").await.unwrap();
        let by_number = body_json(by_number).await;
        let by_id = body_json(call(&state, Method::GET, "4.json", "").await.unwrap()).await;
        assert_eq!(by_number["id"], 2);
        assert_eq!(by_id["topic_id"], 3);
    }

    #[tokio::test]
    async fn edits_record_revisions_that_can_be_reverted() {
        let state = AppState::default();
        call(&state, Method::PUT, "2", r#"{"post":{"raw":"Edited reply"}}"#)
            .await
            .unwrap();
        let revision = call(&state, Method::GET, "2/revisions/latest", "").await.unwrap();
        let revision = body_json(revision).await;
        assert_eq!(revision["current_raw"], "Edited reply");

        call(&state, Method::PUT, "2/revisions/2/revert", "").await.unwrap();
        assert_eq!(
            state.store.read().await.get_post(2).unwrap().raw,
            "Thanks for the warm welcome!"
        );
    }

    #[tokio::test]
    async fn raw_is_plain_text_and_first_post_cannot_be_deleted() {
        let state = AppState::default();
        let response = call(&state, Method::GET, "1/raw", "").await.unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");

        let err = call(&state, Method::DELETE, "1", "").await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        call(&state, Method::DELETE, "2.json", "").await.unwrap();
        assert_eq!(state.store.read().await.get_topic(1).unwrap().posts_count, 1);
    }

    #[tokio::test]
    async fn username_shapes_and_unknown_keywords() {
        let state = AppState::default();
        let value = body_json(call(&state, Method::GET, "alice/deleted", "").await.unwrap()).await;
        assert_eq!(value, json!([]));

        let err = call(&state, Method::GET, "nobody/pending", "").await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        let err = call(&state, Method::GET, "merge_posts", "").await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn system_author_is_accepted() {
        let state = AppState::default();
        let system = Actor(state.store.read().await.get_user(SYSTEM_USER_ID).unwrap());
        let Json(post) = create_post(
            State(state.clone()),
            system,
            json_payload(r#"{"topic_id":2,"raw":"Automated note"}"#),
        )
        .await
        .unwrap();
        assert_eq!(post.user_id, SYSTEM_USER_ID);
    }
}
