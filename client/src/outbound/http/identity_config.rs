//! HTTP adapter for the deployed identity configuration (`GET /cognito`).

use async_trait::async_trait;

use super::dto::IdentityConfigDto;
use super::{ApiClient, map_http_failure};
use crate::domain::DeployedIdentityConfig;
use crate::domain::ports::{IdentityConfigSource, IdentityConfigSourceError};

map_http_failure!(IdentityConfigSourceError);

/// Identity configuration source backed by the backend's `/cognito` route.
#[derive(Debug, Clone)]
pub struct HttpIdentityConfigSource {
    client: ApiClient,
}

impl HttpIdentityConfigSource {
    /// Build the adapter over a shared API client.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityConfigSource for HttpIdentityConfigSource {
    async fn fetch_config(&self) -> Result<DeployedIdentityConfig, IdentityConfigSourceError> {
        let url = self.client.endpoint(&["cognito"]);
        let dto: IdentityConfigDto = self.client.get_json(url).await?;
        dto.into_domain().map_err(IdentityConfigSourceError::decode)
    }
}
