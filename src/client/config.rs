//! Configuration management for GitLab client

use std::{path::PathBuf, time::Duration};

use compact_str::{format_compact, CompactString};

use super::error::{ClientError, Result};

/// Path of the REST API below a GitLab instance origin
pub const API_PATH: &str = "/api/v4";

/// Main configuration for GitLab client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// GitLab API base URL, including the `/api/v4` suffix
    pub base_url: CompactString,
    /// Private access token
    pub private_token: CompactString,
    /// Skip TLS certificate verification
    pub insecure: bool,
    /// Only list groups and projects the token owner is a member of
    pub membership: bool,
    /// Request configuration
    pub request: RequestConfig,
    /// Debug configuration
    pub debug: DebugConfig,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Number of items per page for paginated requests
    pub per_page: u32,
    /// Request timeout
    pub timeout: Duration,
}

/// Debug and logging configuration
#[derive(Debug, Clone)]
pub struct DebugConfig {
    /// Enable debug logging of HTTP responses
    pub log_responses: bool,
    /// Directory for storing debug logs
    pub log_directory: Option<PathBuf>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { per_page: 100, timeout: Duration::from_secs(30) }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_responses: false,
            log_directory: Some(PathBuf::from("isren-logs")),
        }
    }
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(
        base_url: impl Into<CompactString>,
        private_token: impl Into<CompactString>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            private_token: private_token.into(),
            insecure: false,
            membership: false,
            request: RequestConfig::default(),
            debug: DebugConfig::default(),
        }
    }

    /// Create a configuration for the REST API of the instance at `origin`
    pub fn for_origin(origin: &str, private_token: impl Into<CompactString>) -> Self {
        let base_url = format_compact!("{}{}", origin.trim_end_matches('/'), API_PATH);
        Self::new(base_url, private_token)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ClientError::config("Base URL cannot be empty"));
        }

        if self.private_token.is_empty() {
            return Err(ClientError::config("Private token cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::config("Base URL must start with http:// or https://"));
        }

        if self.request.per_page == 0 || self.request.per_page > 100 {
            return Err(ClientError::config("per_page must be between 1 and 100"));
        }

        if self.request.timeout.is_zero() {
            return Err(ClientError::config("Timeout must be greater than zero"));
        }

        Ok(())
    }

    /// Disable TLS certificate verification
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Restrict group and project listings to memberships
    pub fn with_membership(mut self, membership: bool) -> Self {
        self.membership = membership;
        self
    }

    /// Set debug configuration
    pub fn with_debug(mut self, debug: DebugConfig) -> Self {
        self.debug = debug;
        self
    }
}
