//! Client configuration
//!
//! Settings are loaded from a TOML file, then overridden by environment
//! variables, then by command-line flags. Every field has a default so an
//! empty file (or no file) yields a working configuration.

use crate::types::AuthMode;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for the refresh window and the legacy token lifetime
pub const MAX_SESSION_SECS: u64 = 7 * 24 * 60 * 60;

// Helper functions for serde defaults
fn default_auth_base_url() -> String {
    "https://rest-prod.immedia-semi.com".to_string()
}

fn default_tier_url_template() -> String {
    "https://rest-{tier}.immedia-semi.com".to_string()
}

fn default_oauth_client_id() -> String {
    "android".to_string()
}

fn default_oauth_scope() -> String {
    "client".to_string()
}

fn default_app_build() -> String {
    "ANDROID_28799573".to_string()
}

fn default_locale() -> String {
    "en_US".to_string()
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

fn default_client_name() -> String {
    "blink-client".to_string()
}

fn default_user_agent() -> String {
    format!("blink-client v{}", crate::utils::version::get_version())
}

fn default_refresh_window_secs() -> u64 {
    300
}

fn default_legacy_token_lifetime_secs() -> u64 {
    24 * 60 * 60
}

fn default_settle_delay_ms() -> u64 {
    3500
}

fn default_try_count() -> u32 {
    3
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Vendor API endpoints and client identity
    #[serde(default)]
    pub api: ApiSettings,
    /// Session lifetime handling
    #[serde(default)]
    pub session: SessionSettings,
    /// Manifest and clip retrieval
    #[serde(default)]
    pub video: VideoSettings,
    /// Network configuration
    #[serde(default)]
    pub network: NetworkSettings,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Stored account credentials used by the CLI
    #[serde(default)]
    pub account: AccountSettings,
}

/// Vendor API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Host used before a tier is known (login, token grants, tier lookup)
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,
    /// Template for the regional host; `{tier}` is replaced by the session tier
    #[serde(default = "default_tier_url_template")]
    pub tier_url_template: String,
    /// Which login protocol `Credentials` authentication uses
    #[serde(default)]
    pub auth_mode: AuthMode,
    /// OAuth `client_id` form field
    #[serde(default = "default_oauth_client_id")]
    pub oauth_client_id: String,
    /// OAuth `scope` form field
    #[serde(default = "default_oauth_scope")]
    pub oauth_scope: String,
    /// Value of the `APP-BUILD` header
    #[serde(default = "default_app_build")]
    pub app_build: String,
    /// Value of the `LOCALE` header
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Value of the `X-Blink-Time-Zone` header
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// `client_name` sent with legacy logins
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// `unique_id` sent with legacy logins; defaults to the user agent
    #[serde(default)]
    pub unique_id: Option<String>,
}

/// Session lifetime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Refresh the access token when it expires within this many seconds
    #[serde(default = "default_refresh_window_secs")]
    pub refresh_window_secs: u64,
    /// Assumed lifetime for tokens issued without an expiry (legacy and preset sessions)
    #[serde(default = "default_legacy_token_lifetime_secs")]
    pub legacy_token_lifetime_secs: u64,
}

/// Video retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSettings {
    /// Wait between a materialization request and the following poll, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Request/poll cycles for a clip before giving up
    #[serde(default = "default_try_count")]
    pub clip_try_count: u32,
    /// Polls for a manifest before giving up
    #[serde(default = "default_try_count")]
    pub manifest_try_count: u32,
}

/// Network and proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// HTTPS proxy URL
    #[serde(default)]
    pub https_proxy: Option<String>,
    /// HTTP proxy URL
    #[serde(default)]
    pub http_proxy: Option<String>,
    /// All protocols proxy URL
    #[serde(default)]
    pub all_proxy: Option<String>,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    /// Whole-request timeout in seconds; unset leaves the HTTP client default
    #[serde(default)]
    pub request_timeout: Option<u64>,
    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
}

/// Stored credentials
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccountSettings {
    /// Account email
    #[serde(default)]
    pub email: Option<String>,
    /// Account password
    #[serde(default)]
    pub password: Option<String>,
    /// Refresh token from a previous login
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            auth_base_url: default_auth_base_url(),
            tier_url_template: default_tier_url_template(),
            auth_mode: AuthMode::default(),
            oauth_client_id: default_oauth_client_id(),
            oauth_scope: default_oauth_scope(),
            app_build: default_app_build(),
            locale: default_locale(),
            time_zone: default_time_zone(),
            client_name: default_client_name(),
            unique_id: None,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_window_secs: default_refresh_window_secs(),
            legacy_token_lifetime_secs: default_legacy_token_lifetime_secs(),
        }
    }
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            clip_try_count: default_try_count(),
            manifest_try_count: default_try_count(),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            https_proxy: None,
            http_proxy: None,
            all_proxy: None,
            connect_timeout: default_connect_timeout(),
            request_timeout: None,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            verbose: false,
        }
    }
}

impl SessionSettings {
    /// Look-ahead window for the silent token refresh
    pub fn refresh_window(&self) -> chrono::Duration {
        bounded_seconds(self.refresh_window_secs)
    }

    /// Lifetime stamped on tokens that arrive without one
    pub fn legacy_token_lifetime(&self) -> chrono::Duration {
        bounded_seconds(self.legacy_token_lifetime_secs)
    }
}

/// Clamped to [`MAX_SESSION_SECS`]; `validate` rejects anything larger
fn bounded_seconds(secs: u64) -> chrono::Duration {
    i64::try_from(secs.min(MAX_SESSION_SECS))
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or_else(chrono::Duration::zero)
}

impl VideoSettings {
    /// Settle delay as a duration
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl ApiSettings {
    /// `unique_id` for legacy logins
    pub fn unique_id(&self, user_agent: &str) -> String {
        self.unique_id
            .clone()
            .unwrap_or_else(|| user_agent.to_string())
    }
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from environment variables on top of the defaults
    pub fn from_env() -> crate::Result<Self> {
        Self::default().merge_with_env()
    }

    /// Load settings from configuration file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let settings: Settings = toml::from_str(&content)?;

        Ok(settings)
    }

    /// Apply environment variable overrides; unset variables leave values untouched
    pub fn merge_with_env(mut self) -> crate::Result<Self> {
        if let Some(url) = env_string("BLINK_AUTH_URL") {
            self.api.auth_base_url = url;
        }
        if let Some(template) = env_string("BLINK_TIER_URL_TEMPLATE") {
            self.api.tier_url_template = template;
        }
        if let Some(mode) = env_parse::<AuthMode>("BLINK_AUTH_MODE")? {
            self.api.auth_mode = mode;
        }
        if let Some(time_zone) = env_string("BLINK_TIME_ZONE") {
            self.api.time_zone = time_zone;
        }

        if let Some(window) = env_parse("BLINK_REFRESH_WINDOW_SECS")? {
            self.session.refresh_window_secs = window;
        }

        if let Some(delay) = env_parse("BLINK_SETTLE_DELAY_MS")? {
            self.video.settle_delay_ms = delay;
        }
        if let Some(tries) = env_parse("BLINK_CLIP_TRY_COUNT")? {
            self.video.clip_try_count = tries;
        }
        if let Some(tries) = env_parse("BLINK_MANIFEST_TRY_COUNT")? {
            self.video.manifest_try_count = tries;
        }

        // Proxy variables always override when present
        if let Some(proxy) = env_string("HTTPS_PROXY") {
            self.network.https_proxy = Some(proxy);
        }
        if let Some(proxy) = env_string("HTTP_PROXY") {
            self.network.http_proxy = Some(proxy);
        }
        if let Some(proxy) = env_string("ALL_PROXY") {
            self.network.all_proxy = Some(proxy);
        }

        if let Some(level) = env_string("BLINK_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(email) = env_string("BLINK_EMAIL") {
            self.account.email = Some(email);
        }
        if let Some(password) = env_string("BLINK_PASSWORD") {
            self.account.password = Some(password);
        }
        if let Some(token) = env_string("BLINK_REFRESH_TOKEN") {
            self.account.refresh_token = Some(token);
        }

        Ok(self)
    }

    /// Get effective proxy URL based on priority
    pub fn get_proxy_url(&self) -> Option<String> {
        self.network
            .https_proxy
            .as_ref()
            .or(self.network.http_proxy.as_ref())
            .or(self.network.all_proxy.as_ref())
            .cloned()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> crate::Result<()> {
        if let Err(e) = url::Url::parse(&self.api.auth_base_url) {
            return Err(crate::Error::config(
                "api.auth_base_url",
                &format!("Invalid URL '{}': {}", self.api.auth_base_url, e),
            ));
        }

        // The template must yield a valid URL for any plausible tier
        let sample = self.api.tier_url_template.replace("{tier}", "u001");
        if let Err(e) = url::Url::parse(&sample) {
            return Err(crate::Error::config(
                "api.tier_url_template",
                &format!(
                    "Template '{}' does not produce a valid URL: {}",
                    self.api.tier_url_template, e
                ),
            ));
        }

        for (name, secs) in [
            ("session.refresh_window_secs", self.session.refresh_window_secs),
            (
                "session.legacy_token_lifetime_secs",
                self.session.legacy_token_lifetime_secs,
            ),
        ] {
            if secs > MAX_SESSION_SECS {
                return Err(crate::Error::config(
                    name,
                    &format!(
                        "Invalid duration {}s: must not exceed {}s",
                        secs, MAX_SESSION_SECS
                    ),
                ));
            }
        }

        if self.video.clip_try_count == 0 {
            return Err(crate::Error::config(
                "video.clip_try_count",
                "Invalid clip try count: cannot be 0",
            ));
        }
        if self.video.manifest_try_count == 0 {
            return Err(crate::Error::config(
                "video.manifest_try_count",
                "Invalid manifest try count: cannot be 0",
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(crate::Error::config(
                    "logging.level",
                    &format!("Invalid log level: {}", self.logging.level),
                ));
            }
        }

        for (name, proxy_url) in [
            ("network.https_proxy", &self.network.https_proxy),
            ("network.http_proxy", &self.network.http_proxy),
            ("network.all_proxy", &self.network.all_proxy),
        ]
        .iter()
        {
            if let Some(url_str) = proxy_url
                && let Err(e) = url::Url::parse(url_str)
            {
                return Err(crate::Error::config(
                    *name,
                    &format!("Invalid proxy URL '{}': {}", url_str, e),
                ));
            }
        }

        Ok(())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn env_parse<T>(name: &str) -> crate::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw.parse::<T>().map(Some).map_err(|e| {
            crate::Error::config(name, &format!("Invalid value '{}': {}", raw, e))
        }),
        None => Ok(None),
    }
}
