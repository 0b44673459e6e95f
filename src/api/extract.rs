// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request extractors shared by the handlers.
//!
//! SDK clients send bodies as JSON or as form data with bracketed keys
//! (`post[raw]=..`, `usernames[]=..`). [`Payload`] normalizes both into one
//! JSON object, with query parameters filling in keys the body lacks.
//!
//! [`Actor`] resolves the acting user from the `Api-Username` header
//! (or `api_username` query parameter), defaulting to `system`.

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::CONTENT_TYPE, request::Parts},
};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::{error::ApiError, models::User, state::AppState};

pub const API_USERNAME_HEADER: &str = "api-username";
const DEFAULT_ACTOR: &str = "system";

/// Loosely typed request fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload(pub Map<String, Value>);

impl Payload {
    pub fn parse(
        content_type: Option<&str>,
        query: Option<&str>,
        body: &[u8],
    ) -> Result<Self, ApiError> {
        let mut fields = Map::new();
        let is_json = content_type.is_some_and(|ct| ct.contains("json"))
            || body.first().is_some_and(|b| *b == b'{');

        if !body.is_empty() {
            if is_json {
                match serde_json::from_slice(body) {
                    Ok(Value::Object(map)) => fields = map,
                    Ok(_) => return Err(ApiError::bad_request("request body must be an object")),
                    Err(_) => return Err(ApiError::bad_request("invalid request body")),
                }
            } else {
                insert_form(&mut fields, body);
            }
        }

        if let Some(query) = query {
            let mut from_query = Map::new();
            insert_form(&mut from_query, query.as_bytes());
            for (key, value) in from_query {
                fields.entry(key).or_insert(value);
            }
        }
        Ok(Self(fields))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    /// Fields of a nested object (`{"topic": {...}}` or `topic[..]=`) laid
    /// over the top-level ones.
    pub fn section(&self, outer: &str) -> Payload {
        let mut fields = self.0.clone();
        if let Some(Value::Object(inner)) = self.0.get(outer) {
            for (key, value) in inner {
                fields.insert(key.clone(), value.clone());
            }
        }
        Payload(fields)
    }

    /// A non-empty string; numbers and booleans are rendered as text.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        as_int(self.get(key)?)
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            Value::String(s) => match s.as_str() {
                "true" | "1" | "on" => Some(true),
                "false" | "0" | "off" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Integer list from an array, a single value or a comma separated
    /// string.
    pub fn ints(&self, key: &str) -> Vec<i64> {
        match self.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(as_int).collect(),
            Some(Value::String(s)) => s
                .split(',')
                .filter_map(|part| part.trim().parse().ok())
                .collect(),
            Some(value) => as_int(value).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// String list from an array or a comma separated string.
    pub fn strings(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Decode form pairs: `a[b]=v` nests, `a[]=v` and repeated keys collect into
/// arrays.
fn insert_form(fields: &mut Map<String, Value>, input: &[u8]) {
    for (key, value) in form_urlencoded::parse(input) {
        let value = Value::String(value.into_owned());
        match key.split_once('[') {
            Some((outer, rest)) if !outer.is_empty() && rest.ends_with(']') => {
                let inner = &rest[..rest.len() - 1];
                if inner.is_empty() {
                    push(fields, outer, value);
                } else {
                    let nested = fields
                        .entry(outer.to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(nested) = nested {
                        push(nested, inner, value);
                    }
                }
            }
            _ => push(fields, &key, value),
        }
    }
}

fn push(fields: &mut Map<String, Value>, key: &str, value: Value) {
    match fields.get_mut(key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(key.to_string(), value);
        }
    }
}

impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let query = req.uri().query().map(str::to_owned);
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Self::parse(content_type.as_deref(), query.as_deref(), &body)
    }
}

/// The user a write is performed as.
#[derive(Debug, Clone)]
pub struct Actor(pub User);

impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(API_USERNAME_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned);
        let from_query = || {
            form_urlencoded::parse(parts.uri.query().unwrap_or_default().as_bytes())
                .find(|(key, _)| key == "api_username")
                .map(|(_, value)| value.into_owned())
                .filter(|value| !value.is_empty())
        };
        let username = from_header
            .or_else(from_query)
            .unwrap_or_else(|| DEFAULT_ACTOR.to_string());

        let store = state.store.read().await;
        store
            .get_user_by_username(&username)
            .map(Actor)
            .map_err(|_| ApiError::forbidden(format!("user {username} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn json_body_with_query_fallback() {
        let payload = Payload::parse(
            Some("application/json"),
            Some("topic_id=7&raw=ignored"),
            br#"{"raw":"hello","tags":["a","b"]}"#,
        )
        .unwrap();
        assert_eq!(payload.text("raw").as_deref(), Some("hello"));
        assert_eq!(payload.int("topic_id"), Some(7));
        assert_eq!(payload.strings("tags"), vec!["a", "b"]);
    }

    #[test]
    fn form_body_nests_brackets_and_collects_arrays() {
        let payload = Payload::parse(
            Some("application/x-www-form-urlencoded"),
            None,
            b"post%5Braw%5D=edited&post_ids%5B%5D=3&post_ids%5B%5D=4&enabled=true",
        )
        .unwrap();
        assert_eq!(payload.section("post").text("raw").as_deref(), Some("edited"));
        assert_eq!(payload.ints("post_ids"), vec![3, 4]);
        assert_eq!(payload.flag("enabled"), Some(true));
    }

    #[test]
    fn scalar_coercions() {
        let payload = Payload::parse(
            None,
            None,
            br#"{"level":"3","ids":"1, 2,x","user_ids":5,"name":""}"#,
        )
        .unwrap();
        assert_eq!(payload.int("level"), Some(3));
        assert_eq!(payload.ints("ids"), vec![1, 2]);
        assert_eq!(payload.ints("user_ids"), vec![5]);
        assert_eq!(payload.text("name"), None);
    }

    #[test]
    fn malformed_json_is_bad_request() {
        let err = Payload::parse(Some("application/json"), None, b"{nope").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let err = Payload::parse(Some("application/json"), None, b"[1]").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn actor_defaults_to_system_and_rejects_unknown() {
        let state = AppState::default();

        let (mut parts, _) = Request::new(axum::body::Body::empty()).into_parts();
        let Actor(user) = Actor::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.username, "system");

        let request = Request::builder()
            .uri("/posts.json?api_username=alice")
            .body(axum::body::Body::empty())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let Actor(user) = Actor::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.id, 2);

        let request = Request::builder()
            .header(API_USERNAME_HEADER, "nobody")
            .body(axum::body::Body::empty())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let err = Actor::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }
}
