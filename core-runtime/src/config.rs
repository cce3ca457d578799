//! # Provider Configuration
//!
//! Settings for a streaming catalog provider instance, built through
//! [`ProviderConfig::builder`] with fail-fast validation.
//!
//! ## Overview
//!
//! The host stores three user-facing settings per provider (enabled flag,
//! username, password). Everything else has a working default: the API base
//! URL, the device identifier sent at login, the request throttle, the cache
//! max age and the listing page size. Application credentials (`app_id`,
//! `app_secret`) are issued by the remote service and must be injected by the
//! host.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ProviderConfig;
//!
//! let config = ProviderConfig::builder()
//!     .enabled(true)
//!     .username("listener@example.com")
//!     .password("hunter2")
//!     .app_id("123456789")
//!     .app_secret("0123456789abcdef")
//!     .build()?;
//!
//! assert!(config.is_usable());
//! ```
//!
//! ## Error Handling
//!
//! `build()` returns [`Error::Config`] with a message naming the offending
//! setting and the builder method that fixes it.

use crate::error::{Error, Result};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://www.qobuz.com/api.json/0.2";
pub const DEFAULT_DEVICE_MANUFACTURER_ID: &str = "music_platform";
pub const DEFAULT_CACHE_MAX_AGE_DAYS: u32 = 7;
pub const DEFAULT_PAGE_SIZE: u32 = 200;
pub const MAX_PAGE_SIZE: u32 = 500;

/// Outbound request budget shared by every call of one provider instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed inside one window
    pub max_requests: u32,
    /// Window length
    pub period: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 2,
            period: Duration::from_secs(1),
        }
    }
}

impl RateLimitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(Error::Config(
                "Rate limit must allow at least one request per window".to_string(),
            ));
        }

        if self.period.is_zero() {
            return Err(Error::Config(
                "Rate limit window must be longer than 0ms".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration of one streaming provider account.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub enabled: bool,
    pub username: String,
    pub password: String,
    /// Application id issued by the remote service
    pub app_id: String,
    /// Application secret used for request signing
    pub app_secret: String,
    pub api_base_url: String,
    /// Device identifier sent with the login request
    pub device_manufacturer_id: String,
    pub rate_limit: RateLimitConfig,
    pub cache_max_age_days: u32,
    /// Items requested per page in full listings
    pub page_size: u32,
    pub request_timeout: Duration,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("enabled", &self.enabled)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("app_id", &self.app_id)
            .field("app_secret", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("device_manufacturer_id", &self.device_manufacturer_id)
            .field("rate_limit", &self.rate_limit)
            .field("cache_max_age_days", &self.cache_max_age_days)
            .field("page_size", &self.page_size)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ProviderConfig {
    pub fn builder() -> ProviderConfigBuilder {
        ProviderConfigBuilder::default()
    }

    /// Whether the host should instantiate the provider at all.
    ///
    /// A provider is only set up when it is enabled and both account
    /// credentials are present.
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.username.is_empty() && !self.password.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.enabled && (self.username.is_empty() || self.password.is_empty()) {
            return Err(Error::Config(
                "Enabled provider requires a username and password. \
                 Use .username() and .password() or disable the provider."
                    .to_string(),
            ));
        }

        if self.app_id.is_empty() {
            return Err(Error::Config(
                "Application id is required. Use .app_id() to set it.".to_string(),
            ));
        }

        if self.app_secret.is_empty() {
            return Err(Error::Config(
                "Application secret is required for signed requests. Use .app_secret() to set it."
                    .to_string(),
            ));
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "API base URL must be an http(s) URL, got '{}'",
                self.api_base_url
            )));
        }

        self.rate_limit.validate()?;

        if self.cache_max_age_days == 0 {
            return Err(Error::Config(
                "Cache max age must be at least 1 day".to_string(),
            ));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be longer than 0ms".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`ProviderConfig`].
#[derive(Default)]
pub struct ProviderConfigBuilder {
    enabled: bool,
    username: Option<String>,
    password: Option<String>,
    app_id: Option<String>,
    app_secret: Option<String>,
    api_base_url: Option<String>,
    device_manufacturer_id: Option<String>,
    rate_limit: Option<RateLimitConfig>,
    cache_max_age_days: Option<u32>,
    page_size: Option<u32>,
    request_timeout: Option<Duration>,
}

impl ProviderConfigBuilder {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn app_secret(mut self, secret: impl Into<String>) -> Self {
        self.app_secret = Some(secret.into());
        self
    }

    /// Override the API root, e.g. to point at a mock server.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn device_manufacturer_id(mut self, id: impl Into<String>) -> Self {
        self.device_manufacturer_id = Some(id.into());
        self
    }

    pub fn rate_limit(mut self, max_requests: u32, period: Duration) -> Self {
        self.rate_limit = Some(RateLimitConfig {
            max_requests,
            period,
        });
        self
    }

    pub fn cache_max_age_days(mut self, days: u32) -> Self {
        self.cache_max_age_days = Some(days);
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<ProviderConfig> {
        let config = ProviderConfig {
            enabled: self.enabled,
            username: self.username.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            app_id: self.app_id.unwrap_or_default(),
            app_secret: self.app_secret.unwrap_or_default(),
            api_base_url: self
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            device_manufacturer_id: self
                .device_manufacturer_id
                .unwrap_or_else(|| DEFAULT_DEVICE_MANUFACTURER_ID.to_string()),
            rate_limit: self.rate_limit.unwrap_or_default(),
            cache_max_age_days: self.cache_max_age_days.unwrap_or(DEFAULT_CACHE_MAX_AGE_DAYS),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(30)),
        };

        config.validate()?;

        Ok(config)
    }
}
