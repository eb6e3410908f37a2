//! Reqwest-backed adapters for the comment backend's REST API.
//!
//! The adapters own transport details only: URL building, request
//! serialisation, timeout and HTTP error mapping, and JSON decoding into
//! domain records. They contain no business logic.

mod comments;
mod dto;
mod identity_config;
mod users;

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub use comments::HttpCommentApi;
pub use identity_config::HttpIdentityConfigSource;
pub use users::HttpUserDirectory;

/// Errors raised while building an [`ApiClient`].
#[derive(Debug, thiserror::Error)]
pub enum ApiClientBuildError {
    /// The base URL cannot carry path segments (for example `mailto:`).
    #[error("API base URL {0} cannot be used as a base")]
    UnsupportedBase(Url),
    /// The underlying reqwest client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Shared HTTP client rooted at the API base URL.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    /// Build a client with an explicit per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL cannot carry a path or the reqwest
    /// client cannot be constructed.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, ApiClientBuildError> {
        if base.cannot_be_a_base() {
            return Err(ApiClientBuildError::UnsupportedBase(base));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    /// API base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Append path `segments` to the base URL, percent-encoding each one.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, HttpFailure> {
        let body = self.execute(self.client.get(url)).await?;
        decode(&body)
    }

    pub(crate) async fn post_json<B, T>(&self, url: Url, payload: &B) -> Result<T, HttpFailure>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.execute(self.client.post(url).json(payload)).await?;
        decode(&body)
    }

    pub(crate) async fn delete(&self, url: Url) -> Result<(), HttpFailure> {
        self.execute(self.client.delete(url)).await.map(|_| ())
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Vec<u8>, HttpFailure> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(HttpFailure::from_transport)?;
        let status = response.status();
        let url = response.url().clone();
        let body = response
            .bytes()
            .await
            .map_err(HttpFailure::from_transport)?
            .to_vec();
        debug!(%url, status = status.as_u16(), bytes = body.len(), "API response received");
        if !status.is_success() {
            return Err(HttpFailure::from_status(status, body));
        }
        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, HttpFailure> {
    serde_json::from_slice(body)
        .map_err(|error| HttpFailure::Decode(format!("invalid JSON payload: {error}")))
}

/// Transport-level failure shared by every adapter before it is mapped into
/// the port's own error type.
#[derive(Debug)]
pub(crate) enum HttpFailure {
    Transport(String),
    Timeout(String),
    Status { status: StatusCode, body: Vec<u8> },
    Decode(String),
}

impl HttpFailure {
    fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }

    fn from_status(status: StatusCode, body: Vec<u8>) -> Self {
        match status {
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                Self::Timeout(status_message(status, &body))
            }
            _ => Self::Status { status, body },
        }
    }
}

/// Map an [`HttpFailure`] into a port error with the shared variant set.
macro_rules! map_http_failure {
    ($error:ty) => {
        impl From<$crate::outbound::http::HttpFailure> for $error {
            fn from(failure: $crate::outbound::http::HttpFailure) -> Self {
                use $crate::outbound::http::HttpFailure;
                match failure {
                    HttpFailure::Transport(message) => Self::transport(message),
                    HttpFailure::Timeout(message) => Self::timeout(message),
                    HttpFailure::Status { status, body } => Self::rejected(
                        status.as_u16(),
                        $crate::outbound::http::body_preview(&body),
                    ),
                    HttpFailure::Decode(message) => Self::decode(message),
                }
            }
        }
    };
}
pub(crate) use map_http_failure;

fn status_message(status: StatusCode, body: &[u8]) -> String {
    let preview = body_preview(body);
    if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    }
}

pub(crate) fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
