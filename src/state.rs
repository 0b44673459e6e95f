// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::sso::SsoProvider;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    pub sso: Arc<SsoProvider>,
}

impl AppState {
    pub fn new(store: Store, config: &Config) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            sso: Arc::new(SsoProvider::from_config(config)),
        }
    }
}

impl Default for AppState {
    /// Seeded store with SSO disabled.
    fn default() -> Self {
        let store = Store::seeded().unwrap_or_else(|error| {
            tracing::error!(%error, "seed data rejected, starting empty");
            Store::new()
        });
        Self::new(store, &Config::default())
    }
}
