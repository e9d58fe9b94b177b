//! Error taxonomy for the Blink client
//!
//! Every transport or protocol failure raised by the client is normalized
//! into [`Error`]. Authentication outcomes that the caller is expected to
//! act on (wrong password, pending 2FA, bad PIN) are not errors; they are
//! returned as values from the login operations.

use thiserror::Error;

/// Main error type for the client
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP transport errors (connect, TLS, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid caller input, raised before any network call
    #[error("Validation failed for {field}: {message}")]
    Validation {
        /// The input that failed validation
        field: String,
        /// What is wrong with it
        message: String,
        /// The offending value, when it is safe to echo
        value: Option<String>,
    },

    /// A protected operation was attempted without an established session
    #[error("Not authorized to {operation}: {reason}")]
    NotAuthorized {
        /// The operation that was refused
        operation: String,
        /// Why the session cannot serve it
        reason: String,
    },

    /// The server rejected stored credentials outside of an interactive login
    #[error("Authentication rejected during {operation}")]
    AuthRejected {
        /// The operation whose credentials were rejected
        operation: String,
    },

    /// Unexpected non-success HTTP status
    #[error("{operation} failed with status {status} ({reason}): {body}")]
    Protocol {
        /// The API operation that failed
        operation: String,
        /// HTTP status code
        status: u16,
        /// Reason phrase for the status
        reason: String,
        /// Response body as returned by the server
        body: String,
    },

    /// Bounded polling exhausted while waiting for the backend to materialize content
    #[error(
        "{resource} was not materialized after {attempts} attempts (content type '{content_type}', {reason})"
    )]
    MaterializationTimeout {
        /// What was being materialized (manifest or clip)
        resource: String,
        /// Number of request/poll cycles performed
        attempts: u32,
        /// Last observed Content-Type
        content_type: String,
        /// Last observed reason phrase
        reason: String,
        /// Last observed response body, for diagnostics
        body: String,
    },

    /// Dashboard does not hold exactly the sync modules an operation needs
    #[error("Sync module selection failed ({found} found): {message}")]
    SyncModule {
        /// Number of sync modules listed on the dashboard
        found: usize,
        /// Description of the problem
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error in {field}: {message}")]
    Config {
        /// The configuration field that has an error
        field: String,
        /// Error message describing the issue
        message: String,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal issue
        message: String,
    },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    /// Create a validation error that echoes the offending value
    pub fn validation_with_value<S: Into<String>>(field: S, message: S, value: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
            value: Some(value.into()),
        }
    }

    /// Create a not-authorized error
    pub fn not_authorized<S: Into<String>>(operation: S, reason: S) -> Self {
        Self::NotAuthorized {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an auth-rejected error
    pub fn auth_rejected<S: Into<String>>(operation: S) -> Self {
        Self::AuthRejected {
            operation: operation.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol<S: Into<String>>(operation: S, status: u16, reason: S, body: S) -> Self {
        Self::Protocol {
            operation: operation.into(),
            status,
            reason: reason.into(),
            body: body.into(),
        }
    }

    /// Create a sync module selection error
    pub fn sync_module<S: Into<String>>(found: usize, message: S) -> Self {
        Self::SyncModule {
            found,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(field: S, message: S) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Protocol { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this is a retryable error
    ///
    /// Only connection-level transport failures qualify. Protocol errors and
    /// exhausted materialization polls are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Http(..) => "http",
            Error::Json(..) => "json",
            Error::Toml(..) => "toml",
            Error::Url(..) => "url",
            Error::Io(..) => "io",
            Error::Validation { .. } => "validation",
            Error::NotAuthorized { .. } => "not_authorized",
            Error::AuthRejected { .. } => "auth_rejected",
            Error::Protocol { .. } => "protocol",
            Error::MaterializationTimeout { .. } => "materialization_timeout",
            Error::SyncModule { .. } => "sync_module",
            Error::Config { .. } => "config",
            Error::Internal { .. } => "internal",
        }
    }
}
