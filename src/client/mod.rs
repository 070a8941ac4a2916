//! GitLab client modules
//!
//! The transport a forge provider talks through: configuration, the
//! HTTP-backed API client and the [`ForgeApi`] seam that lets tests and
//! future forges swap the transport out.

pub mod api;
pub mod config;
pub mod error;

#[cfg(test)]
pub mod tests;

// Re-export main types for convenience
pub use api::{Connector, ForgeApi, HttpConnector};
pub use config::{ClientConfig, DebugConfig};
pub use error::ClientError;
