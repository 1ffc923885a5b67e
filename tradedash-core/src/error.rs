//! Structured error types for API operations.
//!
//! Errors are shaped after what the API sends back: either a non-2xx status
//! with an `{ "error": ... }` body, or a transport failure. They are displayable
//! in both CLI and TUI contexts.

use serde::Deserialize;
use thiserror::Error;

/// Message fragment the API uses when a bearer token is missing or expired.
pub const AUTH_FAILED_MARKER: &str = "Authentication failed";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network unreachable: {0}")]
    Network(String),

    #[error("{message} (HTTP {status})")]
    Http { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("unexpected response format: {0}")]
    Decode(String),

    #[error("{0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("session storage error: {0}")]
    Session(String),
}

impl ApiError {
    /// True for the one failure class the UI treats specially: a rejected or
    /// expired token. Some endpoints report it inside a non-401 body, so the
    /// server's own message is checked for the marker. Local failures never
    /// count, whatever their text.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            ApiError::Unauthorized(_) => true,
            ApiError::Http { status: 401, .. } => true,
            ApiError::Http { message, .. } => message.contains(AUTH_FAILED_MARKER),
            ApiError::Network(_)
            | ApiError::Decode(_)
            | ApiError::Validation(_)
            | ApiError::Config(_)
            | ApiError::Session(_) => false,
        }
    }

    /// HTTP status, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Unauthorized(_) => Some(401),
            _ => None,
        }
    }

    /// Build an error from a non-success response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = error_message(body).unwrap_or_else(|| "request failed".to_string());
        if status == 401 {
            ApiError::Unauthorized(message)
        } else {
            ApiError::Http { status, message }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::from_response(status.as_u16(), "")
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Extract `error` (or `message`) from a JSON error body.
///
/// Falls back to `None` for non-JSON or empty messages so the caller can
/// substitute a generic one.
pub fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .error
        .or(parsed.message)
        .filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_error_field() {
        assert_eq!(
            error_message(r#"{"error":"Invalid credentials"}"#).as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(
            error_message(r#"{"message":"Not found"}"#).as_deref(),
            Some("Not found")
        );
        assert!(error_message("<html>").is_none());
        assert!(error_message(r#"{"error":""}"#).is_none());
    }

    #[test]
    fn status_401_becomes_unauthorized() {
        let err = ApiError::from_response(401, r#"{"error":"Token expired"}"#);
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert!(err.is_auth_failure());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn message_marker_counts_as_auth_failure() {
        let err = ApiError::from_response(500, r#"{"error":"Authentication failed"}"#);
        assert!(err.is_auth_failure());

        let err = ApiError::from_response(500, r#"{"error":"Database down"}"#);
        assert!(!err.is_auth_failure());
    }

    #[test]
    fn local_failures_mentioning_401_are_not_auth_failures() {
        let decode = ApiError::Decode(
            "/orders: expected value at line 1 column 401".to_string(),
        );
        assert!(!decode.is_auth_failure());

        let network = ApiError::Network(
            "error sending request for url (http://localhost:4010/api/orders)".to_string(),
        );
        assert!(!network.is_auth_failure());

        let config = ApiError::Config("Authentication failed to load".to_string());
        assert!(!config.is_auth_failure());

        let server = ApiError::Http {
            status: 500,
            message: "upstream returned 401".to_string(),
        };
        assert!(!server.is_auth_failure());
    }

    #[test]
    fn missing_body_falls_back_to_status() {
        let err = ApiError::from_response(503, "");
        assert_eq!(err.to_string(), "request failed (HTTP 503)");
        assert!(!err.is_auth_failure());
    }
}
