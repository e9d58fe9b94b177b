//! Request payload definitions
//!
//! Bodies sent to the authentication endpoints. Video endpoints take no body.

use serde::{Deserialize, Serialize};

/// OAuth grant type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Email/password grant
    Password,
    /// Refresh-token grant
    RefreshToken,
}

/// Form body for `POST /oauth/token`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrantRequest {
    /// Grant type
    pub grant_type: GrantType,
    /// Account email (password grant)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Account password (password grant)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Refresh token (refresh grant)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// OAuth client identifier
    pub client_id: String,
    /// Requested scope
    pub scope: String,
}

impl TokenGrantRequest {
    /// Build a password grant
    pub fn password(
        email: impl Into<String>,
        password: impl Into<String>,
        client_id: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            grant_type: GrantType::Password,
            username: Some(email.into()),
            password: Some(password.into()),
            refresh_token: None,
            client_id: client_id.into(),
            scope: scope.into(),
        }
    }

    /// Build a refresh-token grant
    pub fn refresh(
        refresh_token: impl Into<String>,
        client_id: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            grant_type: GrantType::RefreshToken,
            username: None,
            password: None,
            refresh_token: Some(refresh_token.into()),
            client_id: client_id.into(),
            scope: scope.into(),
        }
    }
}

/// JSON body for `POST /api/v5/account/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyLoginRequest {
    /// Stable identifier of this client installation
    pub unique_id: String,
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
    /// Human-readable client name shown in the vendor app
    pub client_name: String,
    /// Set when this client already passed PIN verification once
    pub reauth: bool,
}

/// JSON body for `POST /api/v4/account/{account}/client/{client}/pin/verify`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinVerifyRequest {
    /// One-time code sent by the vendor
    pub pin: String,
}

impl PinVerifyRequest {
    /// Create a PIN verification body
    pub fn new(pin: impl Into<String>) -> Self {
        Self { pin: pin.into() }
    }
}
