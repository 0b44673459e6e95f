// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Path Resolver
//!
//! The topic, post and admin-user families expose path shapes that overlap
//! (`/t/{id}`, `/t/{keyword}/..`, `/t/{slug}/{id}`) and cannot be told apart
//! by independent route registrations. Each family is therefore mounted as a
//! catch-all and the tail after its prefix is resolved here, against a
//! static decision table per family (see [`tables`]).
//!
//! ## Precedence
//!
//! Fixed, in this order:
//!
//! 1. **Keyword**: segment 0 (minus `.json`) is one of the family's literal
//!    keywords. Only that keyword's rules for the request verb are tried; a
//!    keyword never falls through to the id or slug shapes.
//! 2. **Numeric id**: segment 0 parses as an integer. The remaining
//!    segments are matched against the family's entity rules.
//! 3. **Fallback**: the `{slug}/{id}` shape (slug discarded, then as in 2),
//!    or a family-specific named first segment.
//!
//! Anything else resolves to `None`, which the HTTP layer reports as 404.
//!
//! ## Segment Matching
//!
//! Literal segments compare with a trailing `.json` removed. Numeric
//! captures are stored in canonical integer form; other captures are kept
//! exactly as received and handlers strip `.json` through [`Route::text`].

pub mod tables;

use std::collections::BTreeMap;

use axum::http::Method;

pub use tables::{AdminUserOp, PostOp, TopicOp, ADMIN_USERS, POSTS, TOPICS};

/// HTTP verbs the resolver distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Put,
    Post,
    Delete,
}

impl Verb {
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" | "HEAD" => Some(Self::Get),
            "PUT" | "PATCH" => Some(Self::Put),
            "POST" => Some(Self::Post),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn from_method(method: &Method) -> Option<Self> {
        Self::parse(method.as_str())
    }
}

/// One path segment of a rule pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seg {
    /// Fixed text, compared without a trailing `.json`.
    Lit(&'static str),
    /// Any non-empty segment, captured verbatim under the given name.
    Any(&'static str),
    /// An integer segment, captured canonically under the given name.
    Num(&'static str),
}

/// Rule keyed by a literal first segment, matched against the whole tail.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule<Op: 'static> {
    pub verb: Verb,
    /// Starts with a [`Seg::Lit`] naming the keyword.
    pub pattern: &'static [Seg],
    pub op: Op,
}

/// Rule applied after a numeric entity id, matched against the segments
/// that follow it.
#[derive(Debug, Clone, Copy)]
pub struct EntityRule<Op: 'static> {
    pub verb: Verb,
    /// Parameter name the entity id is stored under.
    pub id: &'static str,
    pub rest: &'static [Seg],
    pub op: Op,
}

/// What a non-numeric, non-keyword first segment means.
#[derive(Debug, Clone, Copy)]
pub enum Fallback<Op: 'static> {
    /// `{slug}/{id}/...`: the slug is discarded and segment 1 is the id.
    SlugThenId,
    /// The first segment is captured as `param` and the rest matched
    /// against `rules`.
    Named {
        param: &'static str,
        rules: &'static [EntityRule<Op>],
    },
    /// No other shapes exist.
    None,
}

/// A family's complete decision table.
#[derive(Debug)]
pub struct RouteTable<Op: 'static> {
    pub family: &'static str,
    pub keywords: &'static [KeywordRule<Op>],
    pub entity: &'static [EntityRule<Op>],
    pub fallback: Fallback<Op>,
}

/// A resolved operation with its extracted parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route<Op> {
    pub operation: Op,
    pub params: BTreeMap<&'static str, String>,
}

impl<Op> Route<Op> {
    /// A captured parameter with any trailing `.json` removed.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|value| strip_json(value))
    }

    /// A captured parameter parsed as an integer id.
    pub fn id(&self, name: &str) -> Option<i64> {
        self.params.get(name).and_then(|value| parse_id(value))
    }
}

/// Remove one trailing `.json`.
pub fn strip_json(segment: &str) -> &str {
    segment.strip_suffix(".json").unwrap_or(segment)
}

/// Parse an integer segment: optional `-`, then ASCII digits, optionally
/// followed by `.json`.
pub fn parse_id(segment: &str) -> Option<i64> {
    let segment = strip_json(segment);
    let digits = segment.strip_prefix('-').unwrap_or(segment);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

type Params = BTreeMap<&'static str, String>;

/// Match `segments` against `pattern`, adding captures to a copy of `base`.
fn match_segments(pattern: &[Seg], segments: &[&str], base: &Params) -> Option<Params> {
    if pattern.len() != segments.len() {
        return None;
    }
    let mut params = base.clone();
    for (seg, raw) in pattern.iter().zip(segments) {
        match *seg {
            Seg::Lit(lit) => {
                if strip_json(raw) != lit {
                    return None;
                }
            }
            Seg::Any(name) => {
                if raw.is_empty() {
                    return None;
                }
                params.insert(name, (*raw).to_string());
            }
            Seg::Num(name) => {
                params.insert(name, parse_id(raw)?.to_string());
            }
        }
    }
    Some(params)
}

impl<Op: Copy> KeywordRule<Op> {
    fn keyword(&self) -> Option<&'static str> {
        match self.pattern.first() {
            Some(Seg::Lit(keyword)) => Some(*keyword),
            _ => None,
        }
    }
}

impl<Op: Copy> RouteTable<Op> {
    /// Resolve an HTTP method and path tail to an operation.
    pub fn resolve(&self, verb: Verb, tail: &str) -> Option<Route<Op>> {
        let route = self.resolve_segments(verb, tail);
        if route.is_none() {
            tracing::debug!(family = self.family, ?verb, tail, "no route for path");
        }
        route
    }

    fn resolve_segments(&self, verb: Verb, tail: &str) -> Option<Route<Op>> {
        let tail = tail.strip_prefix('/').unwrap_or(tail);
        let tail = tail.strip_suffix('/').unwrap_or(tail);
        if tail.is_empty() {
            return None;
        }
        let segments: Vec<&str> = tail.split('/').collect();
        let head = strip_json(segments[0]);

        if self.keywords.iter().any(|rule| rule.keyword() == Some(head)) {
            return self
                .keywords
                .iter()
                .filter(|rule| rule.verb == verb)
                .find_map(|rule| {
                    match_segments(rule.pattern, &segments, &Params::new()).map(|params| Route {
                        operation: rule.op,
                        params,
                    })
                });
        }

        if let Some(id) = parse_id(segments[0]) {
            return Self::resolve_rules(self.entity, verb, id, &segments[1..]);
        }

        match self.fallback {
            Fallback::SlugThenId => {
                let id = parse_id(segments.get(1)?)?;
                Self::resolve_rules(self.entity, verb, id, &segments[2..])
            }
            Fallback::Named { param, rules } => {
                let mut base = Params::new();
                base.insert(param, segments[0].to_string());
                rules
                    .iter()
                    .filter(|rule| rule.verb == verb)
                    .find_map(|rule| {
                        match_segments(rule.rest, &segments[1..], &base).map(|params| Route {
                            operation: rule.op,
                            params,
                        })
                    })
            }
            Fallback::None => None,
        }
    }

    fn resolve_rules(
        rules: &[EntityRule<Op>],
        verb: Verb,
        id: i64,
        rest: &[&str],
    ) -> Option<Route<Op>> {
        rules
            .iter()
            .filter(|rule| rule.verb == verb)
            .find_map(|rule| {
                let mut base = Params::new();
                base.insert(rule.id, id.to_string());
                match_segments(rule.rest, rest, &base).map(|params| Route {
                    operation: rule.op,
                    params,
                })
            })
    }
}
