//! Error types for webapp-kit

use std::fmt;
use std::io;

use thiserror::Error;

use crate::json::ParseOutcome;

/// Result type alias for webapp-kit
pub type Result<T> = std::result::Result<T, Error>;

/// webapp-kit errors
#[derive(Error, Debug)]
pub enum Error {
    /// Required configuration missing or malformed (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Underlying key-value backend failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Outbound HTTP call failed
    #[error("Transport error: {0}")]
    Transport(TransportFault),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// The transport fault carried by this error, if any
    #[must_use]
    pub fn as_transport(&self) -> Option<&TransportFault> {
        match self {
            Self::Transport(fault) => Some(fault),
            _ => None,
        }
    }
}

impl From<TransportFault> for Error {
    fn from(fault: TransportFault) -> Self {
        Self::Transport(fault)
    }
}

/// Classification of a failed outbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Request was sent but nothing came back (connect refused, reset, DNS)
    NoResponse,
    /// No response within the per-call timeout
    Timeout,
    /// Server answered with a non-2xx status
    ErrorResponse,
    /// Request could not be built (bad URL, header, body)
    Setup,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoResponse => "no-response",
            Self::Timeout => "timeout",
            Self::ErrorResponse => "error-response",
            Self::Setup => "setup",
        };
        f.write_str(name)
    }
}

/// A classified transport failure.
///
/// `status` and `body` are only populated for [`FaultKind::ErrorResponse`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransportFault {
    /// Fault classification
    pub kind: FaultKind,
    /// HTTP status, when the server answered
    pub status: Option<u16>,
    /// Human-readable summary
    pub message: String,
    /// Response body, when the server answered
    pub body: Option<ParseOutcome>,
}

impl TransportFault {
    /// No response was received
    pub fn no_response(message: impl Into<String>) -> Self {
        Self::bare(FaultKind::NoResponse, message)
    }

    /// The call timed out
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::bare(FaultKind::Timeout, message)
    }

    /// The request could not be constructed
    pub fn setup(message: impl Into<String>) -> Self {
        Self::bare(FaultKind::Setup, message)
    }

    /// The server returned a non-2xx status
    pub fn error_response(status: u16, body: ParseOutcome) -> Self {
        Self {
            kind: FaultKind::ErrorResponse,
            status: Some(status),
            message: format!("server responded with status {status}"),
            body: Some(body),
        }
    }

    fn bare(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            body: None,
        }
    }
}

impl fmt::Display for TransportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({status}): {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}
