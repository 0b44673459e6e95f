// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::Method,
    routing::{any, delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    dispatch::{Route, RouteTable, Verb},
    error::ApiError,
    models::{
        Badge, BasicUser, Category, Group, Invite, Notification, Post, PostAction, PostRevision,
        SiteSetting, Tag, Topic, TopicView, Upload, User, UserBadge,
    },
    state::AppState,
};

pub mod admin_users;
pub mod badges;
pub mod categories;
pub mod extract;
pub mod groups;
pub mod health;
pub mod invites;
pub mod notifications;
pub mod post_actions;
pub mod posts;
pub mod search;
pub mod session;
pub mod site_settings;
pub mod tags;
pub mod topics;
pub mod uploads;
pub mod users;

/// Resolve a family path tail, mapping every miss to a 404.
pub(crate) fn resolve<Op: Copy>(
    table: &RouteTable<Op>,
    method: &Method,
    tail: &str,
) -> Result<Route<Op>, ApiError> {
    Verb::from_method(method)
        .and_then(|verb| table.resolve(verb, tail))
        .ok_or_else(|| ApiError::not_found("not found"))
}

/// The id a resolved operation is scoped to.
pub(crate) fn entity_id(id: Option<i64>) -> Result<i64, ApiError> {
    id.ok_or_else(|| ApiError::not_found("not found"))
}

pub(crate) fn success() -> Json<Value> {
    Json(json!({ "success": "OK" }))
}

async fn not_found() -> ApiError {
    ApiError::not_found("not found")
}

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        // Session and DiscourseConnect
        .route("/session/sso", get(session::sso_initiate))
        .route("/session/sso_provider", get(session::sso_initiate))
        .route("/session/sso_login", get(session::sso_login))
        .route("/session/current.json", get(session::current_user))
        // Topics
        .route("/t/{*tail}", any(topics::topic_family))
        .route("/latest.json", get(topics::latest))
        .route("/top.json", get(topics::top))
        .route("/topics/created-by/{username}", get(topics::created_by))
        .route(
            "/topics/private-messages/{username}",
            get(topics::private_messages),
        )
        .route(
            "/topics/private-messages-sent/{username}",
            get(topics::private_messages_sent),
        )
        // Posts
        .route("/posts", post(posts::create_post))
        .route(
            "/posts.json",
            get(posts::latest_posts).post(posts::create_post),
        )
        .route("/posts/{*tail}", any(posts::post_family))
        .route("/post_actions", post(post_actions::create_post_action))
        .route("/post_actions.json", post(post_actions::create_post_action))
        .route(
            "/post_actions/{id}",
            delete(post_actions::delete_post_action),
        )
        // Users
        .route("/users", post(users::create_user))
        .route("/users.json", post(users::create_user))
        .route("/users/{username}", get(users::get_user))
        .route(
            "/users/by-external/{external_id}",
            get(users::get_user_by_external_id),
        )
        .route(
            "/u/{username}",
            get(users::get_user).put(users::update_user),
        )
        .route("/u/{username}/preferences/email", put(users::update_email))
        .route(
            "/u/{username}/preferences/username",
            put(users::update_username),
        )
        .route("/admin/users/{*tail}", any(admin_users::admin_user_family))
        .route(
            "/admin/site_settings.json",
            get(site_settings::list_site_settings),
        )
        .route(
            "/admin/site_settings/{name}",
            put(site_settings::update_site_setting),
        )
        // Categories
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories.json",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/{id}",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route("/c/{category}/show", get(categories::show_category))
        .route("/c/{category}/show.json", get(categories::show_category))
        .route("/c/{category}/l/{list}", get(categories::category_topics))
        .route(
            "/c/{category}/{category_id}/l/{list}",
            get(categories::category_topics_by_id),
        )
        // Tags
        .route("/tags.json", get(tags::list_tags))
        .route("/tag/{tag}", get(tags::tag_topics))
        .route("/tag/{tag}/l/{list}", get(tags::tag_topics_list))
        // Groups
        .route("/groups.json", get(groups::list_groups))
        .route(
            "/groups/{group}",
            get(groups::get_group).put(groups::update_group),
        )
        .route(
            "/groups/{group}/members.json",
            get(groups::group_members)
                .put(groups::add_members)
                .delete(groups::remove_members),
        )
        .route("/admin/groups", post(groups::create_group))
        .route("/admin/groups.json", post(groups::create_group))
        .route("/admin/groups/{group}", delete(groups::delete_group))
        .route(
            "/admin/groups/{group}/members.json",
            put(groups::add_members).delete(groups::remove_members),
        )
        .route(
            "/admin/groups/{group}/owners.json",
            put(groups::add_owners).delete(groups::remove_owners),
        )
        // Badges
        .route(
            "/admin/badges.json",
            get(badges::list_badges).post(badges::create_badge),
        )
        .route(
            "/admin/badges/{id}",
            put(badges::update_badge).delete(badges::delete_badge),
        )
        .route("/user-badges/{username}", get(badges::user_badges))
        .route("/user_badges", post(badges::grant_badge))
        .route("/user_badges.json", post(badges::grant_badge))
        .route("/user_badges/{id}", delete(badges::revoke_badge))
        // Notifications, invites, uploads, search
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications.json",
            get(notifications::list_notifications),
        )
        .route("/notifications/mark-read", put(notifications::mark_read))
        .route(
            "/notifications/mark-read.json",
            put(notifications::mark_read),
        )
        .route(
            "/invites",
            post(invites::create_invite).delete(invites::delete_invite),
        )
        .route(
            "/invites.json",
            post(invites::create_invite).delete(invites::delete_invite),
        )
        .route("/uploads", post(uploads::create_upload))
        .route("/uploads.json", post(uploads::create_upload))
        .route("/search", get(search::search))
        .route("/search.json", get(search::search))
        .fallback(not_found)
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        session::sso_initiate,
        session::sso_login,
        session::current_user,
        topics::topic_family,
        topics::latest,
        topics::top,
        topics::created_by,
        topics::private_messages,
        topics::private_messages_sent,
        posts::create_post,
        posts::latest_posts,
        posts::post_family,
        post_actions::create_post_action,
        post_actions::delete_post_action,
        users::create_user,
        users::get_user,
        users::get_user_by_external_id,
        users::update_user,
        users::update_email,
        users::update_username,
        admin_users::admin_user_family,
        site_settings::list_site_settings,
        site_settings::update_site_setting,
        categories::list_categories,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        categories::show_category,
        categories::category_topics,
        categories::category_topics_by_id,
        tags::list_tags,
        tags::tag_topics,
        tags::tag_topics_list,
        groups::list_groups,
        groups::get_group,
        groups::group_members,
        groups::update_group,
        groups::create_group,
        groups::delete_group,
        groups::add_members,
        groups::remove_members,
        groups::add_owners,
        groups::remove_owners,
        badges::list_badges,
        badges::create_badge,
        badges::update_badge,
        badges::delete_badge,
        badges::user_badges,
        badges::grant_badge,
        badges::revoke_badge,
        notifications::list_notifications,
        notifications::mark_read,
        invites::create_invite,
        invites::delete_invite,
        uploads::create_upload,
        search::search
    ),
    components(
        schemas(
            User,
            BasicUser,
            Category,
            Topic,
            TopicView,
            Post,
            PostRevision,
            PostAction,
            Group,
            Tag,
            Badge,
            UserBadge,
            Notification,
            Invite,
            Upload,
            SiteSetting
        )
    ),
    tags(
        (name = "Health", description = "Liveness and store summary"),
        (name = "Session", description = "DiscourseConnect login and the acting user"),
        (name = "Topics", description = "Topic family and listings"),
        (name = "Posts", description = "Post family, creation and actions"),
        (name = "Users", description = "User registration and profiles"),
        (name = "Admin", description = "Administrative user operations"),
        (name = "Categories", description = "Categories and their topic lists"),
        (name = "Tags", description = "Tags and tagged topics"),
        (name = "Groups", description = "Groups, members and owners"),
        (name = "Badges", description = "Badge administration and grants"),
        (name = "Notifications", description = "Per-user notifications"),
        (name = "Invites", description = "Invite links"),
        (name = "Uploads", description = "Upload metadata"),
        (name = "Search", description = "Full text search")
    )
)]
struct ApiDoc;
