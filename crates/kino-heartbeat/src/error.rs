//! Error types for Kino Heartbeat

use crate::tracker::TrackerError;
use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Adapter error types
#[derive(Error, Debug)]
pub enum Error {
    // Environment errors
    #[error("Video analytics SDK is not configured: tracker factory unavailable")]
    AnalyticsUnavailable,

    // Tracker errors
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    // Event errors
    #[error("Unknown player event type: {0}")]
    UnknownEventKind(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    /// Returns true if retrying the failed operation can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    /// Returns the error code reported to the host
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::AnalyticsUnavailable => "ANALYTICS_UNAVAILABLE",
            Error::Tracker(_) => "TRACKER",
            Error::UnknownEventKind(_) => "UNKNOWN_EVENT",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
            Error::Io(_) => "IO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::AnalyticsUnavailable.error_code(), "ANALYTICS_UNAVAILABLE");
        assert_eq!(Error::config("bad").error_code(), "INVALID_CONFIG");
        assert_eq!(
            Error::from(TrackerError::Abandoned).error_code(),
            "TRACKER"
        );
    }

    #[test]
    fn test_configuration_errors_are_fatal() {
        assert!(!Error::AnalyticsUnavailable.is_recoverable());
        assert!(!Error::config("empty tracking server").is_recoverable());
        assert!(Error::Io(std::io::Error::other("disk")).is_recoverable());
    }
}
