//! Typed errors for API gateway operations
//!
//! Provides structured error types so callers can distinguish common
//! failure modes (unreachable server, rejected request, bad payload)
//! without string matching.

use thiserror::Error;

/// Outcome classification for a single API call
///
/// - `Network` - the server could not be reached (refused, timeout, DNS)
/// - `Status` - the server answered with a non-2xx status; `message` holds
///   the server-provided explanation when the body was parseable
/// - `Decode` - the server answered 2xx but the body did not match the
///   expected shape
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection failed, timed out, or the request never left
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response, with the server's message when one was present
    #[error("{}", display_status(*status, message.as_deref()))]
    Status {
        status: u16,
        message: Option<String>,
    },

    /// 2xx response with an unparseable body
    #[error("Unexpected response: {0}")]
    Decode(String),
}

fn display_status(status: u16, message: Option<&str>) -> String {
    match message {
        Some(msg) => msg.to_string(),
        None => format!("Server error (HTTP {status})"),
    }
}

impl ApiError {
    /// True when the failure indicates the session credential was rejected
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401, .. })
    }

    /// Build a `Status` error from a non-2xx response, extracting the
    /// server's `{"message": ...}` body when present.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let message = match response.text().await {
            Ok(body) => serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.is_empty()),
            Err(_) => None,
        };
        ApiError::Status { status, message }
    }

    /// Classify a transport-level failure from reqwest
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Network(format!("Request timeout: {e}"))
        } else if e.is_connect() {
            ApiError::Network(format!("Connection failed: {e}"))
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

/// Error body shape used by the MemoryForge backend
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_with_message_displays_server_text() {
        let err = ApiError::Status {
            status: 400,
            message: Some("Username already exists".to_string()),
        };
        assert_eq!(err.to_string(), "Username already exists");
    }

    #[test]
    fn status_without_message_displays_code() {
        let err = ApiError::Status {
            status: 502,
            message: None,
        };
        assert_eq!(err.to_string(), "Server error (HTTP 502)");
    }

    #[test]
    fn unauthorized_detection() {
        let err = ApiError::Status {
            status: 401,
            message: None,
        };
        assert!(err.is_unauthorized());

        let err = ApiError::Status {
            status: 403,
            message: None,
        };
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn network_error_display() {
        let err = ApiError::Network("Connection refused".to_string());
        assert_eq!(err.to_string(), "Network error: Connection refused");
    }
}
