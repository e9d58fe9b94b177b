//! Response type definitions
//!
//! Wire payloads returned by the vendor API. Most fields are optional on the
//! server side, so everything not needed for the protocol defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token envelope returned by `POST /oauth/token`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEnvelope {
    /// Bearer token for protected requests
    pub access_token: String,
    /// Token for the next refresh grant
    #[serde(default)]
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Granted scope
    #[serde(default)]
    pub scope: String,
    /// Token type, normally `Bearer`
    #[serde(default)]
    pub token_type: String,
}

/// Result of `GET /api/v1/users/tier_info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierInfo {
    /// Regional shard
    pub tier: String,
    /// Account identifier
    pub account_id: u64,
    /// Vendor-internal identifier
    #[serde(default)]
    pub tulsa_id: u64,
}

/// Result of the legacy `POST /api/v5/account/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Account information
    pub account: Account,
    /// Authentication token
    pub auth: Auth,
    /// Phone used for PIN delivery
    #[serde(default)]
    pub phone: Option<Phone>,
    /// Lockout time remaining, if lockout is active
    #[serde(default)]
    pub lockout_time_remaining: u64,
    /// Force password reset flag
    #[serde(default)]
    pub force_password_reset: bool,
    /// Seconds before another PIN may be requested
    #[serde(default)]
    pub allow_pin_resend_seconds: u64,
}

/// Account section of the legacy login response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Account {
    #[serde(default)]
    pub account_id: u64,
    #[serde(default)]
    pub user_id: u64,
    #[serde(default)]
    pub client_id: u64,
    #[serde(default)]
    pub client_trusted: bool,
    #[serde(default)]
    pub new_account: bool,
    /// Regional shard, e.g. tier `u018` maps to `https://rest-u018.immedia-semi.com`
    #[serde(default)]
    pub tier: String,
    /// Region, e.g. `us`, `eu`
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub account_verification_required: bool,
    #[serde(default)]
    pub phone_verification_required: bool,
    /// The server wants a PIN before this client may be used
    #[serde(default)]
    pub client_verification_required: bool,
    #[serde(default)]
    pub require_trust_client_device: bool,
    #[serde(default)]
    pub country_required: bool,
    #[serde(default)]
    pub verification_channel: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub amazon_account_linked: bool,
    #[serde(default)]
    pub braze_external_id: String,
}

/// Authentication section of the legacy login response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Auth {
    /// Value for the `TOKEN-AUTH` header
    #[serde(default)]
    pub token: String,
}

/// Phone information
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Phone {
    #[serde(default)]
    pub number: String,
    #[serde(default, rename = "last_4_digits")]
    pub last_four_digits: String,
    #[serde(default)]
    pub country_calling_code: String,
    #[serde(default)]
    pub valid: bool,
}

/// User information
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct User {
    #[serde(default)]
    pub user_id: u64,
    #[serde(default)]
    pub country: String,
}

/// Home screen, reduced to what the video pipeline needs
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Dashboard {
    /// Sync modules in dashboard order
    #[serde(default)]
    pub sync_modules: Vec<SyncModule>,
}

/// A local hub grouping cameras on a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncModule {
    /// Module identifier
    pub id: u64,
    /// Network the module belongs to
    pub network_id: u64,
    /// Display name
    #[serde(default)]
    pub name: String,
}

impl SyncModule {
    /// Create a sync module reference
    pub fn new(id: u64, network_id: u64) -> Self {
        Self {
            id,
            network_id,
            name: String::new(),
        }
    }
}

/// Returned by the manifest request call; identifies the manifest to poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestHandle {
    /// Opaque manifest identifier
    #[serde(rename = "id", deserialize_with = "wire::string_or_number")]
    pub manifest_id: String,
    /// Network identifier
    #[serde(default)]
    pub network_id: u64,
}

/// Materialized manifest: the clips stored on a sync module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestResponse {
    #[serde(default)]
    pub version: String,
    /// Manifest identifier used in clip URLs
    #[serde(default, deserialize_with = "wire::string_or_number")]
    pub manifest_id: String,
    /// Clips in server order
    #[serde(default)]
    pub clips: Vec<VideoDescriptor>,
}

/// A clip stored on a sync module
///
/// `network_id`, `module_id` and `manifest_id` are not sent by the server;
/// the pipeline stamps them after the manifest phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    /// Clip identifier
    #[serde(deserialize_with = "wire::string_or_number")]
    pub id: String,
    /// Clip size as reported by the server
    #[serde(default, deserialize_with = "wire::string_or_number")]
    pub size: String,
    /// Camera that recorded the clip
    #[serde(default)]
    pub camera_name: String,
    /// Recording time, normalized to UTC
    #[serde(deserialize_with = "wire::vendor_timestamp")]
    pub created_at: DateTime<Utc>,
    /// Network the clip belongs to
    #[serde(default, skip_deserializing)]
    pub network_id: u64,
    /// Sync module the clip belongs to
    #[serde(default, skip_deserializing)]
    pub module_id: u64,
    /// Manifest the clip was listed in
    #[serde(default, skip_deserializing)]
    pub manifest_id: String,
}

impl VideoDescriptor {
    /// Attach the network/module/manifest the clip was listed under
    pub fn stamp(&mut self, network_id: u64, module_id: u64, manifest_id: impl Into<String>) {
        self.network_id = network_id;
        self.module_id = module_id;
        self.manifest_id = manifest_id.into();
    }

    /// Whether the clip can be addressed by the clip endpoints
    pub fn is_stamped(&self) -> bool {
        self.network_id != 0 && self.module_id != 0 && !self.manifest_id.trim().is_empty()
    }

    /// Fail with a validation error unless the clip is addressable
    pub fn require_stamped(&self) -> crate::Result<()> {
        if self.id.trim().is_empty() {
            return Err(crate::Error::validation("video.id", "clip id is empty"));
        }
        if !self.is_stamped() {
            return Err(crate::Error::validation_with_value(
                "video",
                "network, module and manifest ids must be set; list clips through a manifest first",
                self.id.as_str(),
            ));
        }
        Ok(())
    }
}

/// Deserialization helpers for vendor quirks
mod wire {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
    }

    /// Accept an identifier sent either as a JSON string or number
    pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<StringOrNumber>::deserialize(deserializer)? {
            Some(StringOrNumber::String(s)) => s,
            Some(StringOrNumber::Unsigned(n)) => n.to_string(),
            Some(StringOrNumber::Signed(n)) => n.to_string(),
            Some(StringOrNumber::Float(n)) => n.to_string(),
            None => String::new(),
        })
    }

    /// Parse an ISO-8601 timestamp with a vendor offset into UTC
    ///
    /// Timestamps without an offset are taken as UTC.
    pub fn vendor_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| D::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
    }
}
