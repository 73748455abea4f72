//! Error handling types for the Ada language-server bridge.
//!
//! Every fault the bridge can observe (a typed error response from the
//! language server, a request timeout, a lost connection, a failed
//! bootstrap) maps onto one variant here. Tool translators convert
//! these into structured error payloads; nothing crosses the tool boundary
//! as a panic.

use serde_json::Value;
use thiserror::Error;

/// Comprehensive error type for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Typed error response from the language server
    #[error("language server error {code}: {message}")]
    Protocol {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// Request did not complete within its timeout
    #[error("request timed out")]
    Timeout,

    /// The language-server subprocess exited or its stdio closed
    #[error("language server connection lost")]
    ConnectionLost,

    /// Spawning or initializing the language server failed
    #[error("language server bootstrap failed: {0}")]
    Bootstrap(String),

    /// A path could not be converted to a file URI or back
    #[error("invalid file URI: {0}")]
    Uri(String),

    /// Tool argument rejected before any server contact
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    /// Create a protocol error without additional data
    pub fn protocol(code: i64, message: impl Into<String>) -> Self {
        BridgeError::Protocol {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a bootstrap error
    pub fn bootstrap(message: impl Into<String>) -> Self {
        BridgeError::Bootstrap(message.into())
    }

    /// The message a tool translator should surface for this error.
    ///
    /// Protocol errors carry the server's own message; everything else uses
    /// the display form.
    pub fn tool_message(&self) -> String {
        match self {
            BridgeError::Protocol { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
