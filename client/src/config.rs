//! Client configuration loaded via OrthoConfig.
//!
//! Values are layered from defaults, a configuration file, `COMMENTS_CLIENT_*`
//! environment variables, and command-line style arguments. Accessors validate
//! the raw strings into [`Url`] and [`Duration`] values.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::Error;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_DEVELOPMENT_REDIRECT_URL: &str = "http://localhost:3000/user";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Configuration values for the comment client.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "COMMENTS_CLIENT")]
pub struct ClientSettings {
    /// Base URL of the comment backend.
    pub api_base_url: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Select the production redirect URL for hosted login.
    #[ortho_config(default = false)]
    pub production: bool,
    /// Redirect URL registered for the production deployment.
    pub production_redirect_url: Option<String>,
    /// Redirect URL used outside production.
    pub development_redirect_url: Option<String>,
}

fn parse_url(field: &str, raw: &str) -> Result<Url, Error> {
    Url::parse(raw).map_err(|err| Error::misconfigured(format!("{field} is not a valid URL: {err}")))
}

impl ClientSettings {
    /// Load settings from the process environment and configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::ErrorCode::Misconfigured`] when a layer
    /// cannot be parsed.
    pub fn load() -> Result<Self, Error> {
        Self::load_from_iter([std::ffi::OsString::from("client")])
            .map_err(|err| Error::misconfigured(format!("failed to load client settings: {err}")))
    }

    /// Base URL of the comment backend.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::ErrorCode::Misconfigured`] for an invalid URL.
    pub fn api_base_url(&self) -> Result<Url, Error> {
        parse_url(
            "api_base_url",
            self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL),
        )
    }

    /// Per-request timeout, falling back to ten seconds.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Redirect URL for hosted login in the selected environment.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::ErrorCode::Misconfigured`] when production is
    /// selected without a production redirect URL, or when the chosen URL
    /// does not parse.
    pub fn redirect_url(&self) -> Result<Url, Error> {
        if self.production {
            let raw = self.production_redirect_url.as_deref().ok_or_else(|| {
                Error::misconfigured("production_redirect_url is required in production")
            })?;
            return parse_url("production_redirect_url", raw);
        }
        parse_url(
            "development_redirect_url",
            self.development_redirect_url
                .as_deref()
                .unwrap_or(DEFAULT_DEVELOPMENT_REDIRECT_URL),
        )
    }
}
