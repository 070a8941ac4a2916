//! Error types for GitLab client operations

use std::error::Error as StdError;

use compact_str::CompactString;
use thiserror::Error;

/// Structured error types for GitLab client operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error with endpoint context
    #[error("Failed to parse JSON response from {endpoint}")]
    JsonParse {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// GitLab API returned an error response
    #[error("GitLab API error: {message}")]
    GitlabApi { message: CompactString },

    /// Configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication failed
    #[error("Authentication failed")]
    Authentication,

    /// Resource not found
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,
}

impl ClientError {
    /// Create a JSON parsing error with endpoint context
    pub fn json_parse(endpoint: impl Into<String>, source: serde_json::Error) -> Self {
        Self::JsonParse { endpoint: endpoint.into(), source }
    }

    /// Create a GitLab API error
    pub fn gitlab_api(message: impl Into<CompactString>) -> Self {
        Self::GitlabApi { message: message.into() }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Check if this error was caused by TLS certificate verification
    ///
    /// The TLS backend only exposes the failure through its message, so the
    /// whole source chain is searched for a certificate complaint.
    pub fn is_certificate_error(&self) -> bool {
        let ClientError::Http(e) = self else {
            return false;
        };

        let mut source: Option<&(dyn StdError + 'static)> = Some(e);
        while let Some(err) = source {
            let message = err.to_string().to_lowercase();
            if message.contains("certificate") || message.contains("unable to get local issuer") {
                return true;
            }
            source = err.source();
        }

        false
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
