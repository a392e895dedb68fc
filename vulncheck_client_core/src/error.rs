//! Error types for the VulnCheck API client
//!
//! This module defines the outcome taxonomy for HTTP lookups: transport
//! failures, authentication failures, client and server errors, and the
//! non-fatal rate-limit case the executor converts into result data.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpe::CpeError;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for VulnCheck API operations
#[derive(Error, Debug)]
pub enum Error {
    /// Network-level failure (connect, TLS, timeout, body read)
    #[error("Unable to reach the VulnCheck API: {0}")]
    Transport(#[from] reqwest::Error),

    /// Credential exchange or bearer authorization rejected
    #[error("Authentication failed ({status}): {message}")]
    Authentication { status: u16, message: String },

    /// Request rejected as malformed (HTTP 400, other than the
    /// known non-routable-address case)
    #[error("Bad request: {detail}")]
    BadRequest { detail: String },

    /// Lookup quota exhausted (HTTP 429); converted by the executor
    /// into a limit-marked result rather than propagated
    #[error("Lookup limit reached for the current API key")]
    RateLimited,

    /// Server-side failure (HTTP 5xx)
    #[error("VulnCheck API server error ({status}): {detail}")]
    Server { status: u16, detail: String },

    /// Response that fits no known classification
    #[error("Unexpected API response ({status}): {detail}")]
    Unexpected { status: u16, detail: String },

    /// Malformed CPE identifier in response data
    #[error(transparent)]
    Cpe(#[from] CpeError),

    /// Invalid client or batch configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// Create an authentication error
    pub fn authentication(status: u16, message: impl Into<String>) -> Self {
        Self::Authentication {
            status,
            message: message.into(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest {
            detail: detail.into(),
        }
    }

    /// Create a server error
    pub fn server(status: u16, detail: impl Into<String>) -> Self {
        Self::Server {
            status,
            detail: detail.into(),
        }
    }

    /// Create an unexpected response error
    pub fn unexpected(status: u16, detail: impl Into<String>) -> Self {
        Self::Unexpected {
            status,
            detail: detail.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if this error indicates the credential must be re-obtained
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Check if this error aborts a batch
    ///
    /// Everything except the rate-limit case is fatal; 429 is carried as
    /// data so the summary layer can report it.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::RateLimited)
    }

    /// HTTP status associated with this error, when one exists
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. }
            | Self::Server { status, .. }
            | Self::Unexpected { status, .. } => Some(*status),
            Self::BadRequest { .. } => Some(400),
            Self::RateLimited => Some(429),
            Self::Transport(source) => source.status().map(|s| s.as_u16()),
            Self::Cpe(_) | Self::Configuration(_) => None,
        }
    }

    /// Convert into a structured payload for callers that surface errors
    /// outside this process
    pub fn payload(&self) -> ErrorPayload {
        let title = match self {
            Self::Transport(_) => "Network Error",
            Self::Authentication { .. } => "Authentication Failed",
            Self::BadRequest { .. } => "Bad Request",
            Self::RateLimited => "Lookup Limit Reached",
            Self::Server { .. } => "VulnCheck Server Error",
            Self::Unexpected { .. } => "Unexpected Response",
            Self::Cpe(_) => "Malformed CPE Identifier",
            Self::Configuration(_) => "Invalid Configuration",
        };
        let cause = match self {
            Self::Transport(source) => Some(source.to_string()),
            Self::Cpe(source) => Some(source.to_string()),
            _ => None,
        };
        ErrorPayload {
            title: title.to_string(),
            status: self.status(),
            detail: self.to_string(),
            cause,
        }
    }
}

/// Structured error payload surfaced to callers when a batch aborts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Short human-readable title
    pub title: String,
    /// HTTP status, when the failure carries one
    pub status: Option<u16>,
    /// Full detail string
    pub detail: String,
    /// Underlying cause, when distinct from the detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::authentication(401, "invalid secret key");
        assert!(matches!(err, Error::Authentication { status: 401, .. }));
        assert!(err.to_string().contains("invalid secret key"));
    }

    #[test]
    fn test_requires_reauth() {
        assert!(Error::authentication(403, "expired").requires_reauth());
        assert!(!Error::server(500, "boom").requires_reauth());
        assert!(!Error::RateLimited.requires_reauth());
    }

    #[test]
    fn test_fatal_classification() {
        let fatal = vec![
            Error::authentication(401, "denied"),
            Error::bad_request("missing aql"),
            Error::server(503, "unavailable"),
            Error::unexpected(302, "redirect"),
            Error::configuration("empty api key"),
        ];
        for err in fatal {
            assert!(err.is_fatal(), "{err:?} should abort a batch");
        }
        assert!(!Error::RateLimited.is_fatal());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::authentication(403, "denied").status(), Some(403));
        assert_eq!(Error::bad_request("nope").status(), Some(400));
        assert_eq!(Error::RateLimited.status(), Some(429));
        assert_eq!(Error::server(502, "bad gateway").status(), Some(502));
        assert_eq!(Error::configuration("bad").status(), None);
    }

    #[test]
    fn test_payload_shape() {
        let payload = Error::server(500, "internal error").payload();
        assert_eq!(payload.title, "VulnCheck Server Error");
        assert_eq!(payload.status, Some(500));
        assert!(payload.detail.contains("internal error"));
        assert!(payload.cause.is_none());
    }

    #[test]
    fn test_payload_serializes_without_null_cause() {
        let payload = Error::bad_request("bad aql").payload();
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("cause").is_none());
        assert_eq!(json["status"], 400);
    }

    #[test]
    fn test_cpe_error_carries_cause() {
        let err = Error::from(CpeError::not_a_cpe("bogus"));
        let payload = err.payload();
        assert_eq!(payload.title, "Malformed CPE Identifier");
        assert!(payload.cause.is_some());
    }
}
