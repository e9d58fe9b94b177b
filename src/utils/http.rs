//! Response inspection helpers shared by the auth and video code

use crate::{Error, Result};
use reqwest::{Response, StatusCode, header::CONTENT_TYPE};
use serde::de::DeserializeOwned;

/// Reason phrase for a status, empty when the status has none
pub fn reason_phrase(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

/// Media type of the response without parameters, lowercased
pub fn media_type(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(parse_media_type)
        .unwrap_or_default()
}

/// Strip parameters from a Content-Type value
pub fn parse_media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Consume a non-success response into a protocol error
pub async fn protocol_error(operation: &str, response: Response) -> Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
    tracing::error!(
        "{} failed with status {}: {}",
        operation,
        status,
        body.trim()
    );
    Error::protocol(
        operation,
        status.as_u16(),
        reason_phrase(status).as_str(),
        body.as_str(),
    )
}

/// Decode a successful JSON response
///
/// An empty body is reported as a protocol error carrying the status.
pub async fn read_json<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Err(Error::protocol(
            operation,
            status.as_u16(),
            "empty response body",
            "",
        ));
    }
    serde_json::from_str(&body).map_err(|e| {
        tracing::error!("Failed to parse {} response: {}", operation, e);
        Error::Json(e)
    })
}
