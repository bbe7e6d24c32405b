//! Error types for the caching client
//!
//! Storage failures never appear here: the store swallows and logs its own
//! errors, degrading to "no cache" rather than failing a caller.

use crate::resource::ResourceKey;
use eregulations_api::ApiError;
use std::fmt;

#[derive(Debug)]
pub enum ClientError {
    /// Missing or invalid client configuration (no remote address, bad URL)
    Config(String),
    /// A remote fetch failed and no cached copy existed
    Fetch { resource: String, source: ApiError },
    /// The remote responded, but the payload is unusable for this resource
    Data { resource: String, detail: String },
}

impl ClientError {
    pub(crate) fn fetch(resource: &ResourceKey, source: ApiError) -> Self {
        Self::Fetch {
            resource: resource.to_string(),
            source,
        }
    }

    pub(crate) fn data(resource: &ResourceKey, detail: impl Into<String>) -> Self {
        Self::Data {
            resource: resource.to_string(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Fetch { resource, source } => {
                write!(f, "Failed to fetch '{resource}': {source}")
            }
            Self::Data { resource, detail } => {
                write!(f, "Unusable response for '{resource}': {detail}")
            }
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
