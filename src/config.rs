// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`Config`] value read once
//! at startup and handed to [`AppState`](crate::state::AppState).
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `4200` |
//! | `DISCOURSE_CONNECT_SECRET` | Shared secret for DiscourseConnect SSO | Unset (SSO disabled) |
//! | `SSO_CALLBACK_URL` | Identity provider URL the login start redirects to | Unset (SSO disabled) |
//! | `SSO_NONCE_TTL_SECS` | Lifetime of an issued SSO nonce | `600` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Shared secret used to sign and verify DiscourseConnect payloads.
///
/// SSO is only enabled when both this and [`SSO_CALLBACK_URL_ENV`] are set.
pub const DISCOURSE_CONNECT_SECRET_ENV: &str = "DISCOURSE_CONNECT_SECRET";

/// Absolute URL of the identity provider. The login start redirects here
/// with `sso` and `sig` appended to the query string.
pub const SSO_CALLBACK_URL_ENV: &str = "SSO_CALLBACK_URL";

pub const SSO_NONCE_TTL_ENV: &str = "SSO_NONCE_TTL_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 4200;
pub const DEFAULT_SSO_NONCE_TTL_SECS: u64 = 600;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a valid {expected}: {value}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// DiscourseConnect settings. Present only when fully configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoSettings {
    pub secret: String,
    pub callback_url: Url,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub sso: Option<SsoSettings>,
    pub sso_nonce_ttl: Duration,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            sso: None,
            sso_nonce_ttl: Duration::from_secs(DEFAULT_SSO_NONCE_TTL_SECS),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source. Empty values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let host_value = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host: IpAddr = host_value.parse().map_err(|_| ConfigError::Invalid {
            var: HOST_ENV,
            expected: "IP address",
            value: host_value.clone(),
        })?;

        let port: u16 = match get(PORT_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: PORT_ENV,
                expected: "port number",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let ttl_secs: u64 = match get(SSO_NONCE_TTL_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: SSO_NONCE_TTL_ENV,
                expected: "number of seconds",
                value,
            })?,
            None => DEFAULT_SSO_NONCE_TTL_SECS,
        };

        let callback_url = match get(SSO_CALLBACK_URL_ENV) {
            Some(value) => Some(Url::parse(&value).map_err(|_| ConfigError::Invalid {
                var: SSO_CALLBACK_URL_ENV,
                expected: "absolute URL",
                value,
            })?),
            None => None,
        };
        let sso = match (get(DISCOURSE_CONNECT_SECRET_ENV), callback_url) {
            (Some(secret), Some(callback_url)) => Some(SsoSettings {
                secret,
                callback_url,
            }),
            _ => None,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            host,
            port,
            sso,
            sso_nonce_ttl: Duration::from_secs(ttl_secs),
            log_format,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
