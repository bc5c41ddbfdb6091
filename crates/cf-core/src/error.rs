//! Error types for the cosmetic filtering pipeline.
//!
//! Nothing here is fatal to a page: callers log and skip. The types exist so
//! the host bindings can report what went wrong.

use std::path::PathBuf;

/// Failure raised by a [`Dom`](crate::dom::Dom) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("Node is not attached to a parent")]
    Detached,
    #[error("Node does not support this operation")]
    Unsupported,
    #[error("Host exception: {0}")]
    Host(String),
}

impl DomError {
    pub fn invalid_selector(selector: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure decoding or encoding a wire message.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Message has no type")]
    MissingType,
}

/// Invalid or unreadable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(&'static str),
    #[error("Failed to parse public suffix list: {0}")]
    SuffixList(String),
}

/// Error surfaced by a [`PageSession`](crate::session::PageSession).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Message(#[from] MessageError),
    #[error(transparent)]
    Dom(#[from] DomError),
}
