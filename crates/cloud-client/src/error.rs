//! Cloud client errors

use thiserror::Error;

/// Errors that can occur when talking to the provider APIs
///
/// Provider-specific error codes (`NoSuchEntity`, `ResourceNotFoundException`,
/// `InvalidVpcID.NotFound`, HTTP 403 on `HeadBucket`, ...) are collapsed into
/// these variants by the client implementations.
#[derive(Debug, Error)]
pub enum CloudError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Caller is not allowed to perform the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// An existing resource blocks the requested operation
    #[error("Conflict on {resource}: {message}")]
    Conflict {
        /// Identifier of the blocking resource
        resource: String,
        /// Provider message
        message: String,
    },

    /// Transient provider-side failure (throttling, 5xx, connection reset)
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Invalid request (e.g., malformed document, value out of range)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Any other provider error
    #[error("Provider API error: {0}")]
    Api(String),
}

impl CloudError {
    /// Shorthand for building a [`CloudError::Conflict`]
    pub fn conflict(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_resource() {
        let err = CloudError::conflict("function:other", "role in use");
        assert_eq!(err.to_string(), "Conflict on function:other: role in use");
    }
}
