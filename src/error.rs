//! Error types for feed operations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeedError>;

/// Failure of a single backend call, before the feed policy classifies it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("backend rejected credentials (401)")]
    Unauthorized,

    #[error("not connected: {0}")]
    NotConnected(String),

    #[error("request failed: {0}")]
    Transient(String),
}

#[derive(Error, Debug)]
pub enum FeedError {
    /// HTTP 401. The host is sent to the login boundary.
    #[error("session expired")]
    AuthExpired,

    /// No connectivity. The cached snapshot is shown instead.
    #[error("offline: {0}")]
    Offline(String),

    /// Any other network or server failure. Recoverable through a manual retry.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Malformed cached or stored JSON.
    #[error("parse failure: {0}")]
    ParseFailure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl FeedError {
    pub fn parse<T: ToString>(msg: T) -> Self {
        Self::ParseFailure(msg.to_string())
    }

    pub fn config<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Everything except an expired session degrades to a stale or empty view.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FeedError::AuthExpired | FeedError::Config(_))
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::ParseFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_auth_and_config_are_unrecoverable() {
        assert!(!FeedError::AuthExpired.is_recoverable());
        assert!(!FeedError::config("missing url").is_recoverable());
        assert!(FeedError::Offline("dns".into()).is_recoverable());
        assert!(FeedError::Transient("500".into()).is_recoverable());
        assert!(FeedError::parse("eof").is_recoverable());
    }

    #[test]
    fn json_errors_become_parse_failures() {
        let err = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        assert!(matches!(FeedError::from(err), FeedError::ParseFailure(_)));
    }
}
