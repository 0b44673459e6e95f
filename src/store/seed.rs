// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed start-up data.
//!
//! Everything except the user and group records is created through the
//! regular operations, so the derived counters start out consistent.

use chrono::{Duration, Utc};
use serde_json::json;

use super::{Store, StoreResult};
use crate::models::{avatar_template, NewCategory, NewPost, NewTopic, User};

/// Id of the built-in `system` account that acts when no user is named.
pub const SYSTEM_USER_ID: i64 = -1;

struct SeedUser {
    id: i64,
    username: &'static str,
    name: &'static str,
    staff: bool,
    trust_level: u8,
    external_id: Option<&'static str>,
    age_days: i64,
}

const USERS: &[SeedUser] = &[
    SeedUser {
        id: SYSTEM_USER_ID,
        username: "system",
        name: "System",
        staff: true,
        trust_level: 4,
        external_id: None,
        age_days: 365,
    },
    SeedUser {
        id: 1,
        username: "admin",
        name: "Admin User",
        staff: true,
        trust_level: 4,
        external_id: None,
        age_days: 30,
    },
    SeedUser {
        id: 2,
        username: "alice",
        name: "Alice Wonderland",
        staff: false,
        trust_level: 2,
        external_id: Some("ext-alice"),
        age_days: 20,
    },
    SeedUser {
        id: 3,
        username: "bob",
        name: "Bob Builder",
        staff: false,
        trust_level: 1,
        external_id: Some("ext-bob"),
        age_days: 10,
    },
];

const CATEGORIES: &[(&str, &str, &str)] = &[
    ("General", "0088CC", "General discussion"),
    ("Support", "ED207B", "Get help here"),
    ("Meta", "808281", "Discussion about this site"),
];

impl Store {
    /// A store holding the fixed seed: four users, three categories, three
    /// topics with four posts, two automatic groups, two badges and the
    /// default site settings.
    pub fn seeded() -> StoreResult<Self> {
        let mut store = Self::new();
        let now = Utc::now();

        for seed in USERS {
            let email = if seed.id == SYSTEM_USER_ID {
                "system@localhost".to_string()
            } else {
                format!("{}@example.com", seed.username)
            };
            store.insert_user_record(User {
                id: seed.id,
                username: seed.username.to_string(),
                name: seed.name.to_string(),
                email,
                avatar_template: avatar_template(seed.username),
                active: true,
                approved: true,
                admin: seed.staff,
                moderator: seed.staff,
                trust_level: seed.trust_level,
                suspended: false,
                silenced: false,
                title: None,
                external_id: seed.external_id.map(str::to_string),
                primary_group_id: None,
                created_at: now - Duration::days(seed.age_days),
            })?;
        }

        let mut category_ids = Vec::with_capacity(CATEGORIES.len());
        for (name, color, description) in CATEGORIES {
            let category = store.create_category(NewCategory {
                name: (*name).to_string(),
                color: Some((*color).to_string()),
                description: Some((*description).to_string()),
                ..Default::default()
            })?;
            category_ids.push(category.id);
        }

        let topic = |title: &str, raw: &str, author_id, category_id, tags: &[&str]| NewTopic {
            title: title.to_string(),
            raw: raw.to_string(),
            author_id,
            category_id: Some(category_id),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        };
        let (welcome, _) = store.create_topic(topic(
            "Welcome to Discourse",
            "Welcome to Discourse! This is your first topic.",
            1,
            category_ids[0],
            &["welcome", "intro"],
        ))?;
        store.create_post(NewPost {
            topic_id: welcome.id,
            raw: "Thanks for the warm welcome!".into(),
            author_id: 2,
            reply_to_post_number: None,
        })?;
        store.create_topic(topic(
            "How to use the API",
            "Here is a guide on using the Discourse API.",
            1,
            category_ids[0],
            &["api", "howto"],
        ))?;
        store.create_topic(topic(
            "Need help with plugins",
            "Can someone help me install a plugin?",
            3,
            category_ids[1],
            &["plugins", "help"],
        ))?;

        store.insert_group_record(1, "staff", true, &[1])?;
        store.insert_group_record(10, "trust_level_0", true, &[1, 2, 3])?;

        let basic = store.insert_system_badge(
            "Basic",
            "Granted when you complete the basic tutorial",
            3,
        )?;
        let member =
            store.insert_system_badge("Member", "Granted when you reach trust level 2", 3)?;
        store.grant_badge(2, basic.id, SYSTEM_USER_ID)?;
        store.grant_badge(3, basic.id, SYSTEM_USER_ID)?;
        store.grant_badge(2, member.id, SYSTEM_USER_ID)?;

        for (name, default) in [
            ("title", json!("Discourse Twin")),
            ("site_description", json!("In-memory Discourse for SDK tests")),
            ("allow_user_locale", json!(true)),
            ("default_locale", json!("en")),
            ("min_topic_title_length", json!(5)),
            ("max_topic_title_length", json!(255)),
            ("min_post_length", json!(10)),
            ("max_post_length", json!(32000)),
            ("tagging_enabled", json!(true)),
            ("max_tags_per_topic", json!(5)),
        ] {
            store.insert_site_setting(name, default);
        }

        Ok(store)
    }
}
