//! Session data structures
//!
//! Defines the client-side session model: the token/tier state owned by the
//! authentication protocol, the states of the login state machine, and the
//! ways a session can be established.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Placeholder replaced by the tier in the regional host template
pub const TIER_PLACEHOLDER: &str = "{tier}";

/// Which login protocol issued the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// OAuth grants; requests carry `Authorization: Bearer <token>`
    #[default]
    OAuth,
    /// `/api/v5/account/login`; requests carry `TOKEN-AUTH: <token>`
    Legacy,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::OAuth => write!(f, "oauth"),
            AuthMode::Legacy => write!(f, "legacy"),
        }
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oauth" => Ok(AuthMode::OAuth),
            "legacy" => Ok(AuthMode::Legacy),
            other => Err(format!(
                "unknown auth mode '{}', expected 'oauth' or 'legacy'",
                other
            )),
        }
    }
}

/// States of the login state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AuthState {
    /// No session yet, or the last attempt was rejected
    #[default]
    Unauthenticated,
    /// The server asked for a one-time code
    ChallengeIssued,
    /// Protected calls may proceed
    Authenticated,
    /// A silent token refresh is in flight
    Refreshing,
}

impl AuthState {
    /// Whether protected calls may be issued in this state
    pub fn permits_protected_calls(&self) -> bool {
        matches!(self, AuthState::Authenticated | AuthState::Refreshing)
    }
}

/// Outcome of a login or verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthChallengeResult {
    /// Session established
    Accepted,
    /// An additional verification step (2FA PIN) is required
    ChallengePending,
    /// Bad credentials
    Rejected,
}

/// Current credentials of a client instance
///
/// A non-empty `access_token` always comes with `valid_until`, and a
/// non-empty `tier` always derives a well-formed base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionState {
    /// Login protocol that issued the token
    #[serde(default)]
    pub mode: AuthMode,
    /// Regional API shard, e.g. `u011`
    #[serde(default)]
    pub tier: String,
    /// Account identifier
    #[serde(default)]
    pub account_id: u64,
    /// Client (device) identifier; only known in legacy mode
    #[serde(default)]
    pub client_id: u64,
    /// Access token sent with protected requests
    #[serde(default)]
    pub access_token: String,
    /// Refresh token for the next grant; empty in legacy mode
    #[serde(default)]
    pub refresh_token: String,
    /// Expiry of the access token
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a session from a stored token (preset authentication)
    pub fn preset(
        mode: AuthMode,
        access_token: impl Into<String>,
        tier: impl Into<String>,
        account_id: u64,
        client_id: u64,
    ) -> Self {
        Self {
            mode,
            tier: tier.into(),
            account_id,
            client_id,
            access_token: access_token.into(),
            refresh_token: String::new(),
            valid_until: None,
        }
    }

    /// Set the refresh token
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = refresh_token.into();
        self
    }

    /// Set the expiry instant
    pub fn with_valid_until(mut self, valid_until: DateTime<Utc>) -> Self {
        self.valid_until = Some(valid_until);
        self
    }

    /// Whether an access token is present
    pub fn has_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Whether tier and account are resolved
    pub fn has_tier(&self) -> bool {
        !self.tier.is_empty() && self.account_id != 0
    }

    /// Regional base URL derived from the tier
    pub fn base_url(&self, template: &str) -> crate::Result<Url> {
        if self.tier.is_empty() {
            return Err(crate::Error::not_authorized(
                "resolve the regional host",
                "no tier has been resolved for this session",
            ));
        }
        if !self
            .tier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(crate::Error::validation_with_value(
                "tier",
                "tier must be alphanumeric",
                self.tier.as_str(),
            ));
        }
        let url = template.replace(TIER_PLACEHOLDER, &self.tier);
        Ok(Url::parse(&url)?)
    }

    /// Whether the token expires within `window` of `now`
    ///
    /// Sessions without a token never need a refresh; there is nothing to refresh.
    pub fn needs_refresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        if !self.has_token() {
            return false;
        }
        match self.valid_until {
            Some(valid_until) => valid_until
                .checked_sub_signed(window)
                .is_none_or(|edge| now >= edge),
            None => true,
        }
    }

    /// Time remaining until the access token expires
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.valid_until.map(|valid_until| valid_until - Utc::now())
    }
}

/// Ways to establish a session through a single entry point
#[derive(Debug, Clone)]
pub enum Authentication {
    /// Email and password; may lead to a 2FA challenge
    Credentials {
        /// Account email
        email: String,
        /// Account password
        password: String,
    },
    /// Refresh token saved from a previous run
    RefreshToken(String),
    /// Already established session (token, tier, account)
    PresetSession(SessionState),
}

impl Authentication {
    /// Credentials authentication
    pub fn credentials(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Credentials {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Refresh-token authentication
    pub fn refresh_token(token: impl Into<String>) -> Self {
        Self::RefreshToken(token.into())
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Authentication::Credentials { .. } => "credentials",
            Authentication::RefreshToken(_) => "refresh_token",
            Authentication::PresetSession(_) => "preset_session",
        }
    }
}

/// A refresh token issued by the server, to be persisted by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRotation {
    /// The new refresh token
    pub refresh_token: String,
    /// When the grant completed
    pub issued_at: DateTime<Utc>,
    /// Expiry of the access token issued alongside
    pub valid_until: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_expiry(valid_until: DateTime<Utc>) -> SessionState {
        SessionState::preset(AuthMode::OAuth, "token", "u011", 1234, 0)
            .with_refresh_token("refresh")
            .with_valid_until(valid_until)
    }

    #[test]
    fn test_empty_session() {
        let session = SessionState::new();
        assert!(!session.has_token());
        assert!(!session.has_tier());
        assert!(!session.needs_refresh(Utc::now(), Duration::minutes(5)));
        assert!(session.time_until_expiry().is_none());
    }

    #[test]
    fn test_base_url_from_tier() {
        let session = SessionState::preset(AuthMode::OAuth, "token", "u011", 1, 0);
        let url = session
            .base_url("https://rest-{tier}.immedia-semi.com")
            .unwrap();
        assert_eq!(url.as_str(), "https://rest-u011.immedia-semi.com/");
    }

    #[test]
    fn test_base_url_requires_tier() {
        let session = SessionState::new();
        let result = session.base_url("https://rest-{tier}.immedia-semi.com");
        assert!(matches!(result, Err(crate::Error::NotAuthorized { .. })));
    }

    #[test]
    fn test_base_url_rejects_malformed_tier() {
        let session = SessionState::preset(AuthMode::OAuth, "token", "u011/../evil", 1, 0);
        let result = session.base_url("https://rest-{tier}.immedia-semi.com");
        assert!(matches!(result, Err(crate::Error::Validation { .. })));
    }

    #[test]
    fn test_needs_refresh_window() {
        let now = Utc::now();
        let window = Duration::minutes(5);

        assert!(!session_with_expiry(now + Duration::hours(1)).needs_refresh(now, window));
        assert!(session_with_expiry(now + Duration::minutes(4)).needs_refresh(now, window));
        assert!(session_with_expiry(now - Duration::minutes(1)).needs_refresh(now, window));
        // Exactly at the window boundary counts as near expiry
        assert!(session_with_expiry(now + window).needs_refresh(now, window));
        // Expiry at the edge of the representable range does not overflow
        assert!(session_with_expiry(DateTime::<Utc>::MIN_UTC).needs_refresh(now, window));
    }

    #[test]
    fn test_auth_mode_parsing() {
        assert_eq!("oauth".parse::<AuthMode>().unwrap(), AuthMode::OAuth);
        assert_eq!(" Legacy ".parse::<AuthMode>().unwrap(), AuthMode::Legacy);
        assert!("basic".parse::<AuthMode>().is_err());
        assert_eq!(AuthMode::Legacy.to_string(), "legacy");
    }

    #[test]
    fn test_auth_state_permissions() {
        assert!(!AuthState::Unauthenticated.permits_protected_calls());
        assert!(!AuthState::ChallengeIssued.permits_protected_calls());
        assert!(AuthState::Authenticated.permits_protected_calls());
        assert!(AuthState::Refreshing.permits_protected_calls());
    }

    #[test]
    fn test_authentication_kind() {
        assert_eq!(
            Authentication::credentials("a@b.c", "pw").kind(),
            "credentials"
        );
        assert_eq!(Authentication::refresh_token("t").kind(), "refresh_token");
        assert_eq!(
            Authentication::PresetSession(SessionState::new()).kind(),
            "preset_session"
        );
    }
}
