// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use discourse_twin::{
    api::router,
    config::{Config, LogFormat, DEFAULT_LOG_FILTER},
    state::AppState,
    store::Store,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_logging(config.log_format);

    let store = Store::seeded()?;
    let state = AppState::new(store, &config);
    let app = router(state);
    let addr = config.bind_addr();

    tracing::info!(
        %addr,
        sso = config.sso.is_some(),
        nonce_ttl_secs = config.sso_nonce_ttl.as_secs(),
        "discourse twin listening (docs at /docs)"
    );

    let server = axum_server::bind(addr).serve(app.into_make_service());
    tokio::select! {
        result = server => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
    }

    tracing::info!("server stopped");
    Ok(())
}
