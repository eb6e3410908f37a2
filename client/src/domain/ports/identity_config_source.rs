//! Driven port for the deployed identity provider configuration.

use async_trait::async_trait;

use crate::domain::DeployedIdentityConfig;

use super::define_port_error;

define_port_error! {
    /// Errors raised while fetching the deployed identity configuration.
    pub enum IdentityConfigSourceError {
        /// The request never produced an HTTP response.
        Transport {
            /// Detail reported by the underlying client or server.
            message: String,
        } => "identity config transport failed: {message}",
        /// The request exceeded the configured timeout.
        Timeout {
            /// Detail reported by the underlying client or server.
            message: String,
        } => "identity config request timed out: {message}",
        /// The server answered with a non-success status.
        Rejected {
            /// HTTP status code returned by the server.
            status: u16,
            /// Detail reported by the underlying client or server.
            message: String,
        } => "identity config request rejected with status {status}: {message}",
        /// The response body could not be decoded.
        Decode {
            /// Detail reported by the underlying client or server.
            message: String,
        } => "identity config could not be decoded: {message}",
    }
}

/// Port returning the identity configuration published by the backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityConfigSource: Send + Sync {
    /// Fetch the current deployed configuration.
    async fn fetch_config(&self) -> Result<DeployedIdentityConfig, IdentityConfigSourceError>;
}

/// Source that always answers with a fixed configuration.
#[derive(Debug, Clone)]
pub struct FixtureIdentityConfigSource {
    config: DeployedIdentityConfig,
}

impl FixtureIdentityConfigSource {
    /// Serve `config` on every fetch.
    pub fn new(config: DeployedIdentityConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl IdentityConfigSource for FixtureIdentityConfigSource {
    async fn fetch_config(&self) -> Result<DeployedIdentityConfig, IdentityConfigSourceError> {
        Ok(self.config.clone())
    }
}
