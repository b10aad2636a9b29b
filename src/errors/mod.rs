//! Domain-specific error types for the card-room load generator
//!
//! Runtime failures observed by a virtual user (connection, transport,
//! protocol, application) are never fatal: they are turned into metric
//! samples and diagnostics by the VU that saw them. Only configuration
//! errors stop the process.

use crate::client::ConnectionState;
use thiserror::Error;

/// Main error type for the load generator
#[derive(Error, Debug)]
pub enum LoadError {
    /// Configuration-related errors (CLI parsing, validation, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The websocket handshake did not answer with 101 Switching Protocols
    #[error("Connection error: handshake failed ({}): {reason}", status_label(.status))]
    Connection { status: Option<u16>, reason: String },

    /// Mid-stream transport failure other than our own close
    #[error("Transport error: {0}")]
    Transport(String),

    /// Inbound payload is not structured data
    #[error("Error parsing message: {payload} ({reason})")]
    Protocol { payload: String, reason: String },

    /// The server reported an `error` field
    #[error("Error from server: {0}")]
    Application(String),

    /// Attempted to send on a connection that is not open
    #[error("Cannot send on a {0} connection")]
    SendOnClosed(ConnectionState),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// JSON serialization errors
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no response".to_string(),
    }
}

/// Result type using LoadError
pub type Result<T> = std::result::Result<T, LoadError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_config_context(self, msg: &str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn with_config_context(self, msg: &str) -> Result<T> {
        self.map_err(|e| LoadError::Config(format!("{}: {}", msg, e)))
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn with_config_context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| LoadError::Config(msg.to_string()))
    }
}

// Convenience constructors
impl LoadError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        LoadError::Config(msg.into())
    }

    pub fn transport<S: Into<String>>(msg: S) -> Self {
        LoadError::Transport(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_names_status() {
        let err = LoadError::Connection {
            status: Some(500),
            reason: "Internal Server Error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Connection error: handshake failed (status 500): Internal Server Error"
        );

        let refused = LoadError::Connection {
            status: None,
            reason: "connection refused".to_string(),
        };
        assert!(refused.to_string().contains("no response"));
    }

    #[test]
    fn test_diagnostics_carry_offending_text() {
        let protocol = LoadError::Protocol {
            payload: "not-json".to_string(),
            reason: "expected value".to_string(),
        };
        assert!(protocol.to_string().contains("not-json"));

        let application = LoadError::Application("room not found".to_string());
        assert_eq!(application.to_string(), "Error from server: room not found");
    }

    #[test]
    fn test_error_context_on_option() {
        let missing: Option<u8> = None;
        let err = missing.with_config_context("no scenarios").unwrap_err();
        assert!(matches!(err, LoadError::Config(msg) if msg == "no scenarios"));
    }
}
