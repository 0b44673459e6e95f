// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # DiscourseConnect SSO
//!
//! Redirect-based single sign-on authenticated with a shared-secret
//! HMAC-SHA256.
//!
//! ## Flow
//!
//! 1. [`SsoProvider::initiate`] issues a nonce, encodes `nonce=<value>` as
//!    standard base64 and redirects to the identity provider with
//!    `sso=<payload>&sig=<hex hmac>`.
//! 2. The provider redirects back with a payload of its own carrying
//!    `nonce`, `external_id`, `email`, `username` and `name`.
//!    [`SsoProvider::complete`] verifies the signature over the exact payload
//!    bytes before anything else, then consumes the nonce and upserts the
//!    user while holding the store's write lock.
//!
//! ## Nonces
//!
//! Pending nonces live in this provider, not in the store. A nonce is
//! removed on its first validation attempt whatever the outcome, so it can
//! succeed at most once. Entries older than the configured TTL count as
//! absent.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::RwLock;
use url::form_urlencoded;
use uuid::Uuid;

use crate::config::{Config, SsoSettings};
use crate::models::{SsoIdentity, User};
use crate::store::{Store, StoreError};

type HmacSha256 = Hmac<Sha256>;

/// Where a client is sent when SSO is not configured.
pub const FALLBACK_SSO_URL: &str = "/session/sso_login";

#[derive(Debug, thiserror::Error)]
pub enum SsoError {
    #[error("SSO not configured")]
    NotConfigured,
    #[error("missing {0} parameter")]
    MissingParameter(&'static str),
    #[error("invalid sso payload")]
    MalformedPayload,
    /// Signature or nonce rejected.
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of starting a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsoStart {
    /// Identity provider URL carrying the signed nonce payload.
    Redirect(String),
    /// SSO is disabled; the caller answers with [`FALLBACK_SSO_URL`].
    Fallback,
}

/// Signs outgoing payloads, verifies returning ones and tracks pending
/// nonces.
#[derive(Debug)]
pub struct SsoProvider {
    settings: Option<SsoSettings>,
    ttl: Duration,
    pending: Mutex<HashMap<String, Instant>>,
}

impl Default for SsoProvider {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SsoProvider {
    pub fn new(settings: Option<SsoSettings>, ttl: Duration) -> Self {
        Self {
            settings,
            ttl,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.sso.clone(), config.sso_nonce_ttl)
    }

    pub fn is_configured(&self) -> bool {
        self.settings.is_some()
    }

    /// Number of nonces issued and not yet consumed or expired.
    pub fn pending_nonces(&self) -> usize {
        let ttl = self.ttl;
        self.pending_set()
            .values()
            .filter(|issued| issued.elapsed() < ttl)
            .count()
    }

    fn pending_set(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        // Entries are plain values; a panic elsewhere cannot leave them torn.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a login: issue a nonce and build the signed redirect.
    pub fn initiate(&self) -> Result<SsoStart, SsoError> {
        let Some(settings) = &self.settings else {
            return Ok(SsoStart::Fallback);
        };

        let nonce = Uuid::new_v4().simple().to_string();
        let payload = Base64::encode_string(format!("nonce={nonce}").as_bytes());
        let sig = sign(&settings.secret, &payload)?;

        {
            let ttl = self.ttl;
            let mut pending = self.pending_set();
            pending.retain(|_, issued| issued.elapsed() < ttl);
            pending.insert(nonce, Instant::now());
        }

        let mut target = settings.callback_url.clone();
        target
            .query_pairs_mut()
            .append_pair("sso", &payload)
            .append_pair("sig", &sig);
        tracing::debug!(pending = self.pending_nonces(), "issued sso nonce");
        Ok(SsoStart::Redirect(target.into()))
    }

    /// Finish a login with the `sso` and `sig` query values the identity
    /// provider sent back.
    ///
    /// Nonce consumption and the user upsert happen under one store write
    /// lock, so a concurrent retry of the same nonce sees either nothing or
    /// the finished login.
    pub async fn complete(
        &self,
        store: &RwLock<Store>,
        sso: Option<&str>,
        sig: Option<&str>,
    ) -> Result<User, SsoError> {
        let result = self.complete_inner(store, sso, sig).await;
        match &result {
            Ok(user) => tracing::info!(user_id = user.id, username = %user.username, "sso login"),
            Err(error) => tracing::warn!(%error, "sso login rejected"),
        }
        result
    }

    async fn complete_inner(
        &self,
        store: &RwLock<Store>,
        sso: Option<&str>,
        sig: Option<&str>,
    ) -> Result<User, SsoError> {
        let settings = self.settings.as_ref().ok_or(SsoError::NotConfigured)?;
        let sso = sso
            .filter(|value| !value.is_empty())
            .ok_or(SsoError::MissingParameter("sso"))?;
        let sig = sig
            .filter(|value| !value.is_empty())
            .ok_or(SsoError::MissingParameter("sig"))?;

        verify(&settings.secret, sso, sig)?;
        let mut fields = decode_payload(sso)?;

        let mut store = store.write().await;

        let nonce = fields.remove("nonce").unwrap_or_default();
        let issued = self.pending_set().remove(&nonce);
        match issued {
            Some(issued) if issued.elapsed() < self.ttl => {}
            _ => return Err(SsoError::Forbidden("invalid or expired nonce")),
        }

        let external_id = fields
            .remove("external_id")
            .filter(|value| !value.is_empty());
        let email = fields.remove("email").filter(|value| !value.is_empty());
        let (Some(external_id), Some(email)) = (external_id, email) else {
            return Err(SsoError::Validation(
                "external_id and email are required".into(),
            ));
        };

        let (user, created) = store.sync_sso(SsoIdentity {
            external_id,
            email,
            username: fields.remove("username").filter(|value| !value.is_empty()),
            name: fields.remove("name").filter(|value| !value.is_empty()),
        })?;
        tracing::debug!(user_id = user.id, created, "sso identity synced");
        Ok(user)
    }
}

/// Lowercase hex HMAC-SHA256 of `payload` under `secret`.
pub fn sign(secret: &str, payload: &str) -> Result<String, SsoError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SsoError::NotConfigured)?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of `sig` against the HMAC of the exact `payload`
/// bytes. Only lowercase hex is accepted.
fn verify(secret: &str, payload: &str, sig: &str) -> Result<(), SsoError> {
    const INVALID: SsoError = SsoError::Forbidden("invalid signature");

    if !sig.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(INVALID);
    }
    let expected = hex::decode(sig).map_err(|_| INVALID)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SsoError::NotConfigured)?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&expected).map_err(|_| INVALID)
}

/// Base64-encode a URL-encoded query string built from `fields`.
pub fn encode_payload(fields: &[(&str, &str)]) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish();
    Base64::encode_string(query.as_bytes())
}

/// Decode a standard base64 payload into its query fields. Repeated keys
/// keep the first value.
pub fn decode_payload(payload: &str) -> Result<HashMap<String, String>, SsoError> {
    let bytes = Base64::decode_vec(payload).map_err(|_| SsoError::MalformedPayload)?;
    let mut fields = HashMap::new();
    for (key, value) in form_urlencoded::parse(&bytes) {
        fields
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use url::Url;

    use super::*;

    const SECRET: &str = "test-secret";

    fn provider(ttl: Duration) -> SsoProvider {
        SsoProvider::new(
            Some(SsoSettings {
                secret: SECRET.into(),
                callback_url: Url::parse("https://idp.example.com/sso?site=forum").unwrap(),
            }),
            ttl,
        )
    }

    fn seeded() -> RwLock<Store> {
        RwLock::new(Store::seeded().unwrap())
    }

    /// Start a login and return the nonce the identity provider would see.
    fn issue_nonce(provider: &SsoProvider) -> String {
        let SsoStart::Redirect(target) = provider.initiate().unwrap() else {
            panic!("expected redirect");
        };
        let target = Url::parse(&target).unwrap();
        let query: HashMap<_, _> = target.query_pairs().into_owned().collect();
        decode_payload(&query["sso"]).unwrap().remove("nonce").unwrap()
    }

    fn signed(fields: &[(&str, &str)]) -> (String, String) {
        let payload = encode_payload(fields);
        let sig = sign(SECRET, &payload).unwrap();
        (payload, sig)
    }

    fn flip(value: &str, index: usize) -> String {
        let mut chars: Vec<char> = value.chars().collect();
        chars[index] = match chars[index] {
            'a' => 'b',
            '0' => '1',
            'A' => 'B',
            _ => 'a',
        };
        chars.into_iter().collect()
    }

    #[test]
    fn unconfigured_initiate_falls_back() {
        let provider = SsoProvider::default();
        assert!(!provider.is_configured());
        assert_eq!(provider.initiate().unwrap(), SsoStart::Fallback);
    }

    #[test]
    fn initiate_signs_the_exact_payload() {
        let provider = provider(Duration::from_secs(600));
        let SsoStart::Redirect(target) = provider.initiate().unwrap() else {
            panic!("expected redirect");
        };
        let target = Url::parse(&target).unwrap();
        assert_eq!(target.host_str(), Some("idp.example.com"));

        let query: HashMap<_, _> = target.query_pairs().into_owned().collect();
        assert_eq!(query["site"], "forum");
        assert_eq!(query["sig"], sign(SECRET, &query["sso"]).unwrap());
        let fields = decode_payload(&query["sso"]).unwrap();
        assert_eq!(fields["nonce"].len(), 32);
        assert_eq!(provider.pending_nonces(), 1);
    }

    #[tokio::test]
    async fn completion_creates_user_once_per_nonce() {
        let provider = provider(Duration::from_secs(600));
        let store = seeded();
        let nonce = issue_nonce(&provider);
        let (sso, sig) = signed(&[
            ("nonce", nonce.as_str()),
            ("external_id", "ext-carol"),
            ("email", "carol@example.com"),
            ("username", "carol"),
            ("name", "Carol"),
        ]);

        let user = provider
            .complete(&store, Some(&sso), Some(&sig))
            .await
            .unwrap();
        assert_eq!(user.username, "carol");
        assert_eq!(user.trust_level, 0);
        assert!(user.approved);
        assert_eq!(provider.pending_nonces(), 0);

        let replay = provider.complete(&store, Some(&sso), Some(&sig)).await;
        assert!(matches!(replay, Err(SsoError::Forbidden(_))));
        assert_eq!(
            store.read().await.get_user_by_external_id("ext-carol").unwrap().id,
            user.id
        );
    }

    #[tokio::test]
    async fn username_defaults_to_external_id_and_existing_users_update() {
        let provider = provider(Duration::from_secs(600));
        let store = seeded();

        let nonce = issue_nonce(&provider);
        let (sso, sig) = signed(&[
            ("nonce", nonce.as_str()),
            ("external_id", "ext-dave"),
            ("email", "dave@example.com"),
        ]);
        let dave = provider
            .complete(&store, Some(&sso), Some(&sig))
            .await
            .unwrap();
        assert_eq!(dave.username, "ext-dave");

        let nonce = issue_nonce(&provider);
        let (sso, sig) = signed(&[
            ("nonce", nonce.as_str()),
            ("external_id", "ext-alice"),
            ("email", "alice@new.example.com"),
            ("username", "alice2"),
        ]);
        let alice = provider
            .complete(&store, Some(&sso), Some(&sig))
            .await
            .unwrap();
        assert_eq!(alice.id, 2);
        assert_eq!(alice.username, "alice2");
        assert_eq!(alice.trust_level, 2);
        assert!(store.read().await.get_user_by_username("alice").is_err());
    }

    #[tokio::test]
    async fn tampering_is_rejected_before_the_nonce_is_touched() {
        let provider = provider(Duration::from_secs(600));
        let store = seeded();
        let nonce = issue_nonce(&provider);
        let (sso, sig) = signed(&[
            ("nonce", nonce.as_str()),
            ("external_id", "ext-erin"),
            ("email", "erin@example.com"),
        ]);

        for index in [0, sso.len() / 2, sso.len() - 3] {
            let tampered = flip(&sso, index);
            let result = provider.complete(&store, Some(&tampered), Some(&sig)).await;
            assert!(matches!(result, Err(SsoError::Forbidden("invalid signature"))));
        }
        for index in [0, 31, 63] {
            let tampered = flip(&sig, index);
            let result = provider.complete(&store, Some(&sso), Some(&tampered)).await;
            assert!(matches!(result, Err(SsoError::Forbidden("invalid signature"))));
        }
        let upper = sig.to_uppercase();
        if upper != sig {
            let result = provider.complete(&store, Some(&sso), Some(&upper)).await;
            assert!(matches!(result, Err(SsoError::Forbidden(_))));
        }

        assert_eq!(provider.pending_nonces(), 1);
        assert!(store.read().await.get_user_by_external_id("ext-erin").is_err());
        provider
            .complete(&store, Some(&sso), Some(&sig))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_and_expired_nonces_are_forbidden() {
        let store = seeded();
        let provider = provider(Duration::from_secs(600));
        let (sso, sig) = signed(&[
            ("nonce", "never-issued"),
            ("external_id", "ext-frank"),
            ("email", "frank@example.com"),
        ]);
        let result = provider.complete(&store, Some(&sso), Some(&sig)).await;
        assert!(matches!(result, Err(SsoError::Forbidden(_))));

        let expiring = self::provider(Duration::ZERO);
        let nonce = issue_nonce(&expiring);
        let (sso, sig) = signed(&[
            ("nonce", nonce.as_str()),
            ("external_id", "ext-frank"),
            ("email", "frank@example.com"),
        ]);
        let result = expiring.complete(&store, Some(&sso), Some(&sig)).await;
        assert!(matches!(result, Err(SsoError::Forbidden(_))));
        assert!(store.read().await.get_user_by_external_id("ext-frank").is_err());
    }

    #[tokio::test]
    async fn missing_identity_fields_still_consume_the_nonce() {
        let provider = provider(Duration::from_secs(600));
        let store = seeded();
        let nonce = issue_nonce(&provider);

        let (sso, sig) = signed(&[("nonce", nonce.as_str()), ("external_id", "ext-gina")]);
        let result = provider.complete(&store, Some(&sso), Some(&sig)).await;
        assert!(matches!(result, Err(SsoError::Validation(_))));

        let (sso, sig) = signed(&[
            ("nonce", nonce.as_str()),
            ("external_id", "ext-gina"),
            ("email", "gina@example.com"),
        ]);
        let retry = provider.complete(&store, Some(&sso), Some(&sig)).await;
        assert!(matches!(retry, Err(SsoError::Forbidden(_))));
    }

    #[tokio::test]
    async fn missing_parameters_and_unconfigured() {
        let store = seeded();
        let provider = provider(Duration::from_secs(600));
        let result = provider.complete(&store, None, Some("00")).await;
        assert!(matches!(result, Err(SsoError::MissingParameter("sso"))));
        let result = provider.complete(&store, Some("abc"), Some("")).await;
        assert!(matches!(result, Err(SsoError::MissingParameter("sig"))));

        let result = SsoProvider::default()
            .complete(&store, Some("abc"), Some("00"))
            .await;
        assert!(matches!(result, Err(SsoError::NotConfigured)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_completions_share_one_success() {
        let provider = Arc::new(provider(Duration::from_secs(600)));
        let store = Arc::new(seeded());
        let nonce = issue_nonce(&provider);
        let (sso, sig) = signed(&[
            ("nonce", nonce.as_str()),
            ("external_id", "ext-hank"),
            ("email", "hank@example.com"),
        ]);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let provider = Arc::clone(&provider);
                let store = Arc::clone(&store);
                let (sso, sig) = (sso.clone(), sig.clone());
                tokio::spawn(async move {
                    provider.complete(&store, Some(&sso), Some(&sig)).await
                })
            })
            .collect();

        let mut successes = 0;
        let mut forbidden = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(SsoError::Forbidden(_)) => forbidden += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((successes, forbidden), (1, 1));
    }
}
