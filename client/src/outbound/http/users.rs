//! HTTP adapter for the user directory port.
//!
//! The backend answers a lookup miss with an error whose `detail` reads
//! `Users not found with email "<email>"`, or with `code: "user_not_found"`.
//! Both are translated into [`UserDirectoryError::NotFound`] here so the
//! resolver never inspects transport payloads.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use super::dto::{ApiErrorDto, NewUserDto, UserDto};
use super::{ApiClient, HttpFailure, map_http_failure};
use crate::domain::ports::{UserDirectory, UserDirectoryError};
use crate::domain::{EmailAddress, User};

map_http_failure!(UserDirectoryError);

const NOT_FOUND_CODE: &str = "user_not_found";

/// User directory backed by `GET /users?email=` and `POST /users`.
#[derive(Debug, Clone)]
pub struct HttpUserDirectory {
    client: ApiClient,
}

impl HttpUserDirectory {
    /// Build the adapter over a shared API client.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

fn is_not_found(email: &EmailAddress, status: StatusCode, body: &[u8]) -> bool {
    if !status.is_client_error() {
        return false;
    }
    let parsed: ApiErrorDto = serde_json::from_slice(body).unwrap_or_default();
    if parsed.code.as_deref() == Some(NOT_FOUND_CODE) {
        return true;
    }
    let needle = format!("Users not found with email \"{email}\"");
    match parsed.detail {
        Some(Value::String(detail)) => detail.contains(&needle),
        _ => false,
    }
}

fn decode_user(dto: UserDto) -> Result<User, UserDirectoryError> {
    dto.into_domain().map_err(UserDirectoryError::decode)
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Vec<User>, UserDirectoryError> {
        let mut url = self.client.endpoint(&["users"]);
        url.query_pairs_mut().append_pair("email", email.as_ref());
        match self.client.get_json::<Vec<UserDto>>(url).await {
            Ok(users) => users.into_iter().map(decode_user).collect(),
            Err(HttpFailure::Status { status, body }) if is_not_found(email, status, &body) => {
                Err(UserDirectoryError::not_found(email.as_ref()))
            }
            Err(failure) => Err(failure.into()),
        }
    }

    async fn create_user(&self, email: &EmailAddress) -> Result<User, UserDirectoryError> {
        let url = self.client.endpoint(&["users"]);
        let created: UserDto = self
            .client
            .post_json(url, &NewUserDto::from(email))
            .await?;
        decode_user(created)
    }
}
