// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Discourse Twin - Stateful Discourse REST API Emulator
//!
//! An in-memory stand-in for a Discourse forum that client SDKs can run
//! their integration tests against. State survives across requests for the
//! life of the process and starts from a fixed seed.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `dispatch` - Resolver for the ambiguous `/t/`, `/posts/` and `/admin/users/` paths
//! - `store` - Relational in-memory store with derived counters
//! - `sso` - DiscourseConnect nonce signing and verification

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod sso;
pub mod state;
pub mod store;
