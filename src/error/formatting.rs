//! Error formatting utilities
//!
//! Renders [`Error`] values for terminal output and for structured log
//! records, walking the chain of underlying causes.

use crate::Error;
use std::error::Error as StdError;

/// Longest response body echoed back in a formatted message
const MAX_BODY_CHARS: usize = 512;

/// Format error for display
///
/// Includes the server response body for protocol and materialization
/// failures and appends nested causes that are not already part of the message.
pub fn format_error(error: &Error) -> String {
    let formatted = match error {
        Error::Protocol {
            operation,
            status,
            reason,
            body,
        } => {
            if body.trim().is_empty() {
                format!("{} failed: HTTP {} {}", operation, status, reason)
            } else {
                format!(
                    "{} failed: HTTP {} {} - {}",
                    operation,
                    status,
                    reason,
                    truncate_body(body)
                )
            }
        }

        Error::MaterializationTimeout {
            resource,
            attempts,
            content_type,
            reason,
            body,
        } => format!(
            "Failed to get {} after {} attempts, content type '{}' - {}. Content: {}",
            resource,
            attempts,
            content_type,
            reason,
            truncate_body(body)
        ),

        Error::Validation {
            field,
            message,
            value,
        } => match value {
            Some(val) => format!(
                "Validation failed for {} (value: '{}'): {}",
                field, val, message
            ),
            None => format!("Validation failed for {}: {}", field, message),
        },

        // For the remaining variants the Display implementation is enough
        _ => error.to_string(),
    };

    let mut result = formatted;
    let mut source = error.source();

    while let Some(cause) = source {
        if !result.contains(&cause.to_string()) {
            result = format!("{} (caused by {})", result, cause);
        }
        source = cause.source();
    }

    result
}

/// Format error for logging with structured data
pub fn format_error_for_logging(error: &Error) -> serde_json::Value {
    let mut log_data = serde_json::json!({
        "message": format_error(error),
        "category": error.category(),
        "retryable": error.is_retryable(),
    });

    match error {
        Error::Protocol {
            operation, status, ..
        } => {
            log_data["operation"] = serde_json::Value::String(operation.clone());
            log_data["status"] = serde_json::Value::Number((*status).into());
        }
        Error::MaterializationTimeout {
            resource,
            attempts,
            content_type,
            ..
        } => {
            log_data["resource"] = serde_json::Value::String(resource.clone());
            log_data["attempts"] = serde_json::Value::Number((*attempts).into());
            log_data["content_type"] = serde_json::Value::String(content_type.clone());
        }
        Error::SyncModule { found, .. } => {
            log_data["sync_modules"] = serde_json::Value::Number((*found).into());
        }
        _ => {}
    }

    log_data
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_BODY_CHARS {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(MAX_BODY_CHARS).collect();
    format!("{}...", head)
}
