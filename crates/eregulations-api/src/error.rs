//! Error types for the eRegulations API client

use std::fmt;

/// Errors that can occur when calling the eRegulations API
#[derive(Debug)]
pub enum ApiError {
    /// Missing or invalid call configuration (empty base URL or path)
    Config(String),
    /// Transport-level failure: connect error, timeout, aborted stream
    Transport(reqwest::Error),
    /// Remote returned a non-success status other than 404
    Status { status: u16, url: String },
    /// Remote confirmed the resource does not exist
    NotFound { resource: String },
    /// The call's cancellation token was signalled
    Cancelled,
}

impl ApiError {
    /// Whether the retry loop may attempt this failure again
    ///
    /// Transport errors and 5xx statuses are transient; 4xx responses are
    /// permanent and retrying them would only burn the retry budget.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Transport(e) => write!(f, "Transport error: {e}"),
            Self::Status { status, url } => {
                write!(f, "eRegulations returned status {status} for {url}")
            }
            Self::NotFound { resource } => write!(f, "Not found: {resource}"),
            Self::Cancelled => write!(f, "Request cancelled"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e)
    }
}

/// Result type for eRegulations API operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ApiError::Status {
            status: 503,
            url: "http://x".to_string()
        }
        .is_transient());
        assert!(!ApiError::Status {
            status: 400,
            url: "http://x".to_string()
        }
        .is_transient());
        assert!(!ApiError::Config("empty".to_string()).is_transient());
        assert!(!ApiError::NotFound {
            resource: "http://x".to_string()
        }
        .is_transient());
        assert!(!ApiError::Cancelled.is_transient());
    }

    #[test]
    fn test_display_names_resource() {
        let err = ApiError::NotFound {
            resource: "http://example.org/Procedures/9".to_string(),
        };
        assert!(format!("{err}").contains("/Procedures/9"));
    }
}
