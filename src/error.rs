use serde_json::Value;
use thiserror::Error;

/// Errors raised while talking to the console backend.
///
/// A failed level fetch travels inside a `FetchOutcome` as one of these; the
/// navigation controller reports it but never returns it from an operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("no active cluster selected")]
    NoActiveCluster,
}

impl ApiError {
    /// Build a status error from a non-success response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        ApiError::Status {
            status,
            message: extract_error_message(status, body),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Pull the operator-facing message out of a backend error body.
///
/// The backend answers `{"code": .., "message": ..}`; some proxies wrap that
/// in an `error` object. Anything else falls back to a message by status.
pub fn extract_error_message(status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(message) = json.get("message").and_then(Value::as_str) {
            if !message.is_empty() {
                return message.to_string();
            }
        }
        if let Some(message) = json
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
        {
            if !message.is_empty() {
                return message.to_string();
            }
        }
    }
    default_message_for_status(status).to_string()
}

fn default_message_for_status(status: u16) -> &'static str {
    match status {
        400 => "Bad request parameters",
        401 => "Unauthorized, please log in again",
        403 => "Not permitted to perform this operation",
        404 => "Requested resource does not exist",
        500 => "Internal server error",
        503 => "Service temporarily unavailable",
        _ => "Network request failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_body() {
        let body = r#"{"code": 2002, "message": "Cluster connection failed"}"#;
        assert_eq!(extract_error_message(502, body), "Cluster connection failed");
    }

    #[test]
    fn test_nested_message() {
        let body = r#"{"error": {"message": "token expired"}}"#;
        assert_eq!(extract_error_message(401, body), "token expired");
    }

    #[test]
    fn test_status_fallback() {
        assert_eq!(extract_error_message(404, "not json"), "Requested resource does not exist");
        assert_eq!(extract_error_message(418, "{}"), "Network request failed");
    }

    #[test]
    fn test_display_uses_extracted_message() {
        let err = ApiError::from_response(500, r#"{"message": "boom"}"#);
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.status(), Some(500));
    }
}
