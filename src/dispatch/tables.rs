// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Decision tables for the `/t/`, `/posts/` and `/admin/users/` families.
//!
//! Rules are tried in order within a verb, so more specific literal shapes
//! are listed before captures that could also match them.

use super::{EntityRule, Fallback, KeywordRule, RouteTable, Seg, Verb};

use Seg::{Any, Lit, Num};
use Verb::{Delete, Get, Post, Put};

const fn kw<Op>(verb: Verb, pattern: &'static [Seg], op: Op) -> KeywordRule<Op> {
    KeywordRule { verb, pattern, op }
}

const fn on<Op>(verb: Verb, id: &'static str, rest: &'static [Seg], op: Op) -> EntityRule<Op> {
    EntityRule { verb, id, rest, op }
}

// =============================================================================
// Topics (/t/)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicOp {
    GetTopic,
    GetTopicPosts,
    GetTopicPostIds,
    GetTopicExcerpts,
    GetTopicViewStats,
    GetTopicByExternalId,
    GetTopicIdForSlug,
    UpdateTopic,
    UpdateStatus,
    ChangeTimestamp,
    Bookmark,
    RemoveBookmarks,
    ArchiveMessage,
    MoveToInbox,
    ConvertTopic,
    Publish,
    ResetBumpDate,
    ClearPin,
    RePin,
    Mute,
    Unmute,
    MakeBanner,
    RemoveBanner,
    RemoveAllowedUser,
    RemoveAllowedGroup,
    Recover,
    UpdateTags,
    SlowMode,
    ChangeOwner,
    SetNotificationLevel,
    Invite,
    MovePosts,
    MergeTopic,
    InviteGroup,
    DeleteTopic,
    DeleteTimings,
}

impl TopicOp {
    pub fn name(self) -> &'static str {
        match self {
            Self::GetTopic => "get_topic",
            Self::GetTopicPosts => "get_topic_posts",
            Self::GetTopicPostIds => "get_topic_post_ids",
            Self::GetTopicExcerpts => "get_topic_excerpts",
            Self::GetTopicViewStats => "get_topic_view_stats",
            Self::GetTopicByExternalId => "get_topic_by_external_id",
            Self::GetTopicIdForSlug => "get_topic_id_for_slug",
            Self::UpdateTopic => "update_topic",
            Self::UpdateStatus => "update_topic_status",
            Self::ChangeTimestamp => "change_topic_timestamp",
            Self::Bookmark => "bookmark_topic",
            Self::RemoveBookmarks => "remove_topic_bookmarks",
            Self::ArchiveMessage => "archive_message",
            Self::MoveToInbox => "move_to_inbox",
            Self::ConvertTopic => "convert_topic",
            Self::Publish => "publish_topic",
            Self::ResetBumpDate => "reset_bump_date",
            Self::ClearPin => "clear_pin",
            Self::RePin => "re_pin",
            Self::Mute => "mute_topic",
            Self::Unmute => "unmute_topic",
            Self::MakeBanner => "make_banner",
            Self::RemoveBanner => "remove_banner",
            Self::RemoveAllowedUser => "remove_allowed_user",
            Self::RemoveAllowedGroup => "remove_allowed_group",
            Self::Recover => "recover_topic",
            Self::UpdateTags => "update_topic_tags",
            Self::SlowMode => "set_slow_mode",
            Self::ChangeOwner => "change_post_owner",
            Self::SetNotificationLevel => "set_topic_notification_level",
            Self::Invite => "invite_to_topic",
            Self::MovePosts => "move_posts",
            Self::MergeTopic => "merge_topic",
            Self::InviteGroup => "invite_group_to_topic",
            Self::DeleteTopic => "delete_topic",
            Self::DeleteTimings => "delete_topic_timings",
        }
    }
}

const TOPIC_ENTITY: &[EntityRule<TopicOp>] = &[
    on(Get, "id", &[], TopicOp::GetTopic),
    on(Get, "id", &[Num("post_number")], TopicOp::GetTopic),
    on(Get, "topic_id", &[Lit("posts")], TopicOp::GetTopicPosts),
    on(Get, "topic_id", &[Lit("post_ids")], TopicOp::GetTopicPostIds),
    on(Get, "topic_id", &[Lit("excerpts")], TopicOp::GetTopicExcerpts),
    on(Get, "topic_id", &[Lit("view-stats")], TopicOp::GetTopicViewStats),
    on(Put, "id", &[], TopicOp::UpdateTopic),
    on(Put, "topic_id", &[Lit("status")], TopicOp::UpdateStatus),
    on(Put, "topic_id", &[Lit("change-timestamp")], TopicOp::ChangeTimestamp),
    on(Put, "topic_id", &[Lit("bookmark")], TopicOp::Bookmark),
    on(Put, "topic_id", &[Lit("remove_bookmarks")], TopicOp::RemoveBookmarks),
    on(Put, "topic_id", &[Lit("archive-message")], TopicOp::ArchiveMessage),
    on(Put, "topic_id", &[Lit("move-to-inbox")], TopicOp::MoveToInbox),
    on(Put, "topic_id", &[Lit("convert-topic")], TopicOp::ConvertTopic),
    on(Put, "topic_id", &[Lit("convert-topic"), Any("type")], TopicOp::ConvertTopic),
    on(Put, "topic_id", &[Lit("publish")], TopicOp::Publish),
    on(Put, "topic_id", &[Lit("reset-bump-date")], TopicOp::ResetBumpDate),
    on(Put, "topic_id", &[Lit("clear-pin")], TopicOp::ClearPin),
    on(Put, "topic_id", &[Lit("re-pin")], TopicOp::RePin),
    on(Put, "topic_id", &[Lit("mute")], TopicOp::Mute),
    on(Put, "topic_id", &[Lit("unmute")], TopicOp::Unmute),
    on(Put, "topic_id", &[Lit("make-banner")], TopicOp::MakeBanner),
    on(Put, "topic_id", &[Lit("remove-banner")], TopicOp::RemoveBanner),
    on(Put, "topic_id", &[Lit("remove-allowed-user")], TopicOp::RemoveAllowedUser),
    on(Put, "topic_id", &[Lit("remove-allowed-group")], TopicOp::RemoveAllowedGroup),
    on(Put, "topic_id", &[Lit("recover")], TopicOp::Recover),
    on(Put, "topic_id", &[Lit("tags")], TopicOp::UpdateTags),
    on(Put, "topic_id", &[Lit("slow_mode")], TopicOp::SlowMode),
    on(Post, "topic_id", &[Lit("change-owner")], TopicOp::ChangeOwner),
    on(Post, "topic_id", &[Lit("notifications")], TopicOp::SetNotificationLevel),
    on(Post, "topic_id", &[Lit("invite")], TopicOp::Invite),
    on(Post, "topic_id", &[Lit("move-posts")], TopicOp::MovePosts),
    on(Post, "topic_id", &[Lit("merge-topic")], TopicOp::MergeTopic),
    on(Post, "topic_id", &[Lit("invite-group")], TopicOp::InviteGroup),
    on(Delete, "id", &[], TopicOp::DeleteTopic),
    on(Delete, "topic_id", &[Lit("timings")], TopicOp::DeleteTimings),
];

pub static TOPICS: RouteTable<TopicOp> = RouteTable {
    family: "topics",
    keywords: &[
        kw(Get, &[Lit("external_id"), Any("external_id")], TopicOp::GetTopicByExternalId),
        kw(Get, &[Lit("id_for"), Any("slug")], TopicOp::GetTopicIdForSlug),
    ],
    entity: TOPIC_ENTITY,
    fallback: Fallback::SlugThenId,
};

// =============================================================================
// Posts (/posts/)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostOp {
    GetPost,
    GetPostByNumber,
    GetLatestRevision,
    GetRevision,
    GetReplyHistory,
    GetReplyIds,
    GetCooked,
    GetRaw,
    GetReplies,
    UpdatePost,
    SetWiki,
    Recover,
    Rebake,
    SetLocked,
    SetPostType,
    Unhide,
    SetNotice,
    HideRevision,
    ShowRevision,
    RevertRevision,
    MergePosts,
    DeletePost,
    DestroyMany,
    PermanentlyDeleteRevisions,
    DeleteBookmark,
    GetUserDeletedPosts,
    GetUserPendingPosts,
}

impl PostOp {
    pub fn name(self) -> &'static str {
        match self {
            Self::GetPost => "get_post",
            Self::GetPostByNumber => "get_post_by_number",
            Self::GetLatestRevision => "get_latest_revision",
            Self::GetRevision => "get_revision",
            Self::GetReplyHistory => "get_reply_history",
            Self::GetReplyIds => "get_reply_ids",
            Self::GetCooked => "get_cooked",
            Self::GetRaw => "get_raw",
            Self::GetReplies => "get_replies",
            Self::UpdatePost => "update_post",
            Self::SetWiki => "set_wiki",
            Self::Recover => "recover_post",
            Self::Rebake => "rebake_post",
            Self::SetLocked => "set_locked",
            Self::SetPostType => "set_post_type",
            Self::Unhide => "unhide_post",
            Self::SetNotice => "set_notice",
            Self::HideRevision => "hide_revision",
            Self::ShowRevision => "show_revision",
            Self::RevertRevision => "revert_revision",
            Self::MergePosts => "merge_posts",
            Self::DeletePost => "delete_post",
            Self::DestroyMany => "destroy_many",
            Self::PermanentlyDeleteRevisions => "permanently_delete_revisions",
            Self::DeleteBookmark => "delete_bookmark",
            Self::GetUserDeletedPosts => "get_user_deleted_posts",
            Self::GetUserPendingPosts => "get_user_pending_posts",
        }
    }
}

const POST_ENTITY: &[EntityRule<PostOp>] = &[
    on(Get, "id", &[], PostOp::GetPost),
    on(Get, "id", &[Lit("revisions"), Lit("latest")], PostOp::GetLatestRevision),
    on(Get, "id", &[Lit("revisions"), Num("revision")], PostOp::GetRevision),
    on(Get, "id", &[Lit("reply-history")], PostOp::GetReplyHistory),
    on(Get, "id", &[Lit("reply-ids")], PostOp::GetReplyIds),
    on(Get, "id", &[Lit("cooked")], PostOp::GetCooked),
    on(Get, "id", &[Lit("raw")], PostOp::GetRaw),
    on(Get, "id", &[Lit("replies")], PostOp::GetReplies),
    on(Put, "id", &[], PostOp::UpdatePost),
    on(Put, "id", &[Lit("wiki")], PostOp::SetWiki),
    on(Put, "id", &[Lit("recover")], PostOp::Recover),
    on(Put, "id", &[Lit("rebake")], PostOp::Rebake),
    on(Put, "id", &[Lit("locked")], PostOp::SetLocked),
    on(Put, "id", &[Lit("post_type")], PostOp::SetPostType),
    on(Put, "id", &[Lit("unhide")], PostOp::Unhide),
    on(Put, "id", &[Lit("notice")], PostOp::SetNotice),
    on(Put, "id", &[Lit("revisions"), Num("revision"), Lit("hide")], PostOp::HideRevision),
    on(Put, "id", &[Lit("revisions"), Num("revision"), Lit("show")], PostOp::ShowRevision),
    on(Put, "id", &[Lit("revisions"), Num("revision"), Lit("revert")], PostOp::RevertRevision),
    on(Delete, "id", &[], PostOp::DeletePost),
    on(
        Delete,
        "id",
        &[Lit("revisions"), Lit("permanently_delete")],
        PostOp::PermanentlyDeleteRevisions,
    ),
    on(Delete, "id", &[Lit("bookmark")], PostOp::DeleteBookmark),
];

pub static POSTS: RouteTable<PostOp> = RouteTable {
    family: "posts",
    keywords: &[
        kw(Get, &[Lit("by_number"), Num("topic_id"), Num("post_number")], PostOp::GetPostByNumber),
        kw(Put, &[Lit("merge_posts")], PostOp::MergePosts),
        kw(Delete, &[Lit("destroy_many")], PostOp::DestroyMany),
    ],
    entity: POST_ENTITY,
    fallback: Fallback::Named {
        param: "username",
        rules: &[
            on(Get, "username", &[Lit("deleted")], PostOp::GetUserDeletedPosts),
            on(Get, "username", &[Lit("pending")], PostOp::GetUserPendingPosts),
        ],
    },
};

// =============================================================================
// Admin users (/admin/users/)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminUserOp {
    ListUsers,
    ApproveBulk,
    DestroyBulk,
    SyncSso,
    GetUser,
    IpInfo,
    Approve,
    Activate,
    Deactivate,
    TrustLevel,
    GrantAdmin,
    RevokeAdmin,
    GrantModeration,
    RevokeModeration,
    Suspend,
    Unsuspend,
    Silence,
    Unsilence,
    Anonymize,
    PrimaryGroup,
    LogOut,
    Merge,
    ResetBounceScore,
    GenerateApiKey,
    DeleteUser,
    DeletePostsBatch,
}

impl AdminUserOp {
    pub fn name(self) -> &'static str {
        match self {
            Self::ListUsers => "list_users",
            Self::ApproveBulk => "approve_bulk",
            Self::DestroyBulk => "destroy_bulk",
            Self::SyncSso => "sync_sso",
            Self::GetUser => "get_admin_user",
            Self::IpInfo => "ip_info",
            Self::Approve => "approve_user",
            Self::Activate => "activate_user",
            Self::Deactivate => "deactivate_user",
            Self::TrustLevel => "set_trust_level",
            Self::GrantAdmin => "grant_admin",
            Self::RevokeAdmin => "revoke_admin",
            Self::GrantModeration => "grant_moderation",
            Self::RevokeModeration => "revoke_moderation",
            Self::Suspend => "suspend_user",
            Self::Unsuspend => "unsuspend_user",
            Self::Silence => "silence_user",
            Self::Unsilence => "unsilence_user",
            Self::Anonymize => "anonymize_user",
            Self::PrimaryGroup => "set_primary_group",
            Self::LogOut => "log_out_user",
            Self::Merge => "merge_user",
            Self::ResetBounceScore => "reset_bounce_score",
            Self::GenerateApiKey => "generate_api_key",
            Self::DeleteUser => "delete_user",
            Self::DeletePostsBatch => "delete_posts_batch",
        }
    }
}

const ADMIN_USER_ENTITY: &[EntityRule<AdminUserOp>] = &[
    on(Get, "id", &[], AdminUserOp::GetUser),
    on(Get, "id", &[Lit("ip_info")], AdminUserOp::IpInfo),
    on(Put, "id", &[Lit("approve")], AdminUserOp::Approve),
    on(Put, "id", &[Lit("activate")], AdminUserOp::Activate),
    on(Put, "id", &[Lit("deactivate")], AdminUserOp::Deactivate),
    on(Put, "id", &[Lit("trust_level")], AdminUserOp::TrustLevel),
    on(Put, "id", &[Lit("grant_admin")], AdminUserOp::GrantAdmin),
    on(Put, "id", &[Lit("revoke_admin")], AdminUserOp::RevokeAdmin),
    on(Put, "id", &[Lit("grant_moderation")], AdminUserOp::GrantModeration),
    on(Put, "id", &[Lit("revoke_moderation")], AdminUserOp::RevokeModeration),
    on(Put, "id", &[Lit("suspend")], AdminUserOp::Suspend),
    on(Put, "id", &[Lit("unsuspend")], AdminUserOp::Unsuspend),
    on(Put, "id", &[Lit("silence")], AdminUserOp::Silence),
    on(Put, "id", &[Lit("unsilence")], AdminUserOp::Unsilence),
    on(Put, "id", &[Lit("anonymize")], AdminUserOp::Anonymize),
    on(Put, "id", &[Lit("primary_group")], AdminUserOp::PrimaryGroup),
    on(Post, "id", &[Lit("log_out")], AdminUserOp::LogOut),
    on(Post, "id", &[Lit("merge")], AdminUserOp::Merge),
    on(Post, "id", &[Lit("reset_bounce_score")], AdminUserOp::ResetBounceScore),
    on(Post, "id", &[Lit("generate_api_key")], AdminUserOp::GenerateApiKey),
    on(Delete, "id", &[], AdminUserOp::DeleteUser),
    on(Delete, "id", &[Lit("posts_batch")], AdminUserOp::DeletePostsBatch),
];

pub static ADMIN_USERS: RouteTable<AdminUserOp> = RouteTable {
    family: "admin_users",
    keywords: &[
        kw(Get, &[Lit("list"), Any("type")], AdminUserOp::ListUsers),
        kw(Put, &[Lit("approve-bulk")], AdminUserOp::ApproveBulk),
        kw(Delete, &[Lit("destroy-bulk")], AdminUserOp::DestroyBulk),
        kw(Post, &[Lit("sync_sso")], AdminUserOp::SyncSso),
    ],
    entity: ADMIN_USER_ENTITY,
    fallback: Fallback::None,
};
