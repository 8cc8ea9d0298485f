//! Error taxonomy and the `{code, message}` envelope
//!
//! Information Hiding:
//! - Callers match on `Error` variants to decide recovery
//! - The wire/text form of a failure is always a `Code` envelope

use serde::{Deserialize, Serialize};
use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("agent '{0}' is already registered")]
    Conflict(String),

    #[error("agent '{0}' not found")]
    NotFound(String),

    #[error("unsupported mode '{0}'")]
    UnsupportedMode(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("invalid agent card from {url}: {reason}")]
    InvalidCard { url: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Integer code carried in the envelope
    pub fn code(&self) -> u16 {
        match self {
            Error::Conflict(_) => 400,
            Error::NotFound(_) => 404,
            Error::UnsupportedMode(_) => 500,
            Error::Upstream(_) | Error::InvalidCard { .. } => 502,
            Error::Config(_) => 500,
        }
    }

    pub fn envelope(&self) -> Code {
        Code::new(self.code(), self.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Upstream(e.to_string())
    }
}

impl From<::config::ConfigError> for Error {
    fn from(e: ::config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

/// Structured status reported to callers, rendered as JSON text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub code: u16,
    pub message: String,
}

impl Code {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(200, message)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn json(&self) -> String {
        serde_json::json!({ "code": self.code, "message": self.message }).to_string()
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {}: {}", self.code, self.message)
    }
}

impl From<&Error> for Code {
    fn from(e: &Error) -> Self {
        e.envelope()
    }
}
