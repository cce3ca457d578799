//! Read-through caching client
//!
//! Sits in front of [`ThrottledTransport`] and decides per call whether a
//! cached response may be served. Cache policy is explicit in
//! [`RequestOptions`]:
//!
//! - `ignore_cache`: always live, cache neither read nor written
//! - `checksum`: a cached entry is only served when it was stored under the
//!   same freshness token; entries stored without one carry `"latest"`
//! - `sign`: adds `request_ts`, `request_sig`, `app_id` and
//!   `user_auth_token` before dispatch
//!
//! Transport and API failures are logged by the transport and surface here as
//! `Ok(None)`. Authentication problems are the only errors returned.

use bridge_traits::cache::CacheStore;
use bridge_traits::time::Clock;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{QobuzError, Result};
use crate::session::SessionManager;
use crate::signing::signed_params;
use crate::transport::ThrottledTransport;
use crate::types::Params;
use crate::PROVIDER_ID;

/// Checksum recorded for entries stored without an explicit freshness token
const LATEST_CHECKSUM: &str = "latest";

/// Per-call cache and signing policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub sign: bool,
    pub ignore_cache: bool,
    pub checksum: Option<String>,
}

impl RequestOptions {
    /// Serve from cache when any entry exists
    pub fn cached() -> Self {
        Self::default()
    }

    /// Bypass the cache entirely
    pub fn live() -> Self {
        Self {
            ignore_cache: true,
            ..Self::default()
        }
    }

    /// Signed and live; protected endpoints are never cached
    pub fn signed() -> Self {
        Self {
            sign: true,
            ignore_cache: true,
            checksum: None,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    checksum: String,
    payload: Value,
}

pub struct CachingClient {
    transport: ThrottledTransport,
    session: SessionManager,
    cache: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    app_secret: String,
    cache_max_age_days: u32,
}

impl CachingClient {
    pub fn new(
        transport: ThrottledTransport,
        session: SessionManager,
        cache: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        app_secret: impl Into<String>,
        cache_max_age_days: u32,
    ) -> Self {
        Self {
            transport,
            session,
            cache,
            clock,
            app_secret: app_secret.into(),
            cache_max_age_days,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn transport(&self) -> &ThrottledTransport {
        &self.transport
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// GET `endpoint` honouring `options`.
    ///
    /// Returns `Ok(None)` when the request failed for any reason other than
    /// authentication. An `Unauthorized` answer drops the session and the
    /// request is re-issued once with a fresh login.
    pub async fn get(
        &self,
        endpoint: &str,
        params: Params,
        options: &RequestOptions,
    ) -> Result<Option<Value>> {
        let key = cache_key(endpoint, &params);

        if !options.ignore_cache {
            if let Some(payload) = self.lookup(&key, options.checksum.as_deref()).await {
                debug!(endpoint, "Serving cached response");
                return Ok(Some(payload));
            }
        }

        let result = match self.fetch(endpoint, &params, options.sign).await {
            Err(e) if e.is_unauthorized() => {
                warn!(endpoint, "Session token rejected, logging in again");
                self.session.invalidate().await;
                self.fetch(endpoint, &params, options.sign).await
            }
            other => other,
        };

        match result {
            Ok(payload) => {
                if !options.ignore_cache {
                    self.store(&key, options.checksum.as_deref(), &payload).await;
                }
                Ok(Some(payload))
            }
            Err(e @ (QobuzError::AuthenticationFailed(_) | QobuzError::Unauthorized(_))) => Err(e),
            Err(_) => Ok(None),
        }
    }

    /// POST a JSON body with the current session's token. Never cached.
    pub async fn post(&self, endpoint: &str, body: &Value) -> Result<Option<Value>> {
        let session = self.session.token(&self.transport).await?;
        match self
            .transport
            .post_json(endpoint, body, &session.user_auth_token)
            .await
        {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.is_unauthorized() => {
                self.session.invalidate().await;
                Err(e)
            }
            Err(_) => Ok(None),
        }
    }

    async fn fetch(&self, endpoint: &str, params: &Params, sign: bool) -> Result<Value> {
        let session = self.session.token(&self.transport).await?;
        let token = session.user_auth_token.as_str();

        if sign {
            let signed = signed_params(
                endpoint,
                params,
                self.clock.unix_timestamp(),
                self.transport.app_id(),
                &self.app_secret,
                token,
            );
            self.transport.get(endpoint, &signed, Some(token)).await
        } else {
            self.transport.get(endpoint, params, Some(token)).await
        }
    }

    async fn lookup(&self, key: &str, checksum: Option<&str>) -> Option<Value> {
        let bytes = match self.cache.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Discarding unreadable cache entry");
                return None;
            }
        };

        match checksum {
            Some(expected) if entry.checksum != expected => {
                debug!(key, stored = %entry.checksum, expected, "Cache entry is stale");
                None
            }
            _ => Some(entry.payload),
        }
    }

    async fn store(&self, key: &str, checksum: Option<&str>, payload: &Value) {
        let entry = CacheEntry {
            checksum: checksum.unwrap_or(LATEST_CHECKSUM).to_string(),
            payload: payload.clone(),
        };

        let bytes = match serde_json::to_vec(&entry) {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        if let Err(e) = self.cache.set(key, bytes, self.cache_max_age_days).await {
            warn!(key, error = %e, "Cache write failed");
        }
    }
}

/// Cache key over the endpoint and the parameters in key order
pub fn cache_key(endpoint: &str, params: &Params) -> String {
    let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{}:{}?{}", PROVIDER_ID, endpoint, query.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::params;

    #[test]
    fn test_cache_key_ignores_insertion_order() {
        let a = params([("type", "albums"), ("limit", "200"), ("offset", "0")]);
        let b = params([("offset", "0"), ("type", "albums"), ("limit", "200")]);

        assert_eq!(cache_key("favorite/getUserFavorites", &a), cache_key("favorite/getUserFavorites", &b));
        assert_eq!(
            cache_key("favorite/getUserFavorites", &a),
            "qobuz:favorite/getUserFavorites?limit=200&offset=0&type=albums"
        );
    }

    #[test]
    fn test_cache_key_distinguishes_endpoints() {
        let p = params([("album_id", "1")]);
        assert_ne!(cache_key("album/get", &p), cache_key("track/get", &p));
    }

    #[test]
    fn test_request_options() {
        assert!(!RequestOptions::cached().ignore_cache);
        assert!(RequestOptions::live().ignore_cache);

        let signed = RequestOptions::signed();
        assert!(signed.sign && signed.ignore_cache);

        let opts = RequestOptions::cached().with_checksum("42");
        assert_eq!(opts.checksum.as_deref(), Some("42"));
    }

    #[test]
    fn test_cache_entry_format() {
        let entry = CacheEntry {
            checksum: LATEST_CHECKSUM.to_string(),
            payload: serde_json::json!({"id": 1}),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value, serde_json::json!({"checksum": "latest", "payload": {"id": 1}}));
    }
}
