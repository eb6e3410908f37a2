//! Wire DTOs for the comment backend.
//!
//! Adapters decode into these transport shapes first, then map into domain
//! records in one pass so validation failures surface as decode errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    Comment, CommentId, DeployedIdentityConfig, EmailAddress, PostId, User,
};

#[derive(Debug, Deserialize)]
pub(super) struct CommentDto {
    id: i64,
    user: String,
    content: String,
    post_id: i64,
}

impl CommentDto {
    pub(super) fn into_domain(self) -> Result<Comment, String> {
        let id = CommentId::new(self.id).map_err(|err| format!("comment {}: {err}", self.id))?;
        let post_id =
            PostId::new(self.post_id).map_err(|err| format!("comment {}: {err}", self.id))?;
        Ok(Comment::new(id, post_id, self.user, self.content))
    }
}

#[derive(Debug, Serialize)]
pub(super) struct NewCommentDto<'a> {
    pub(super) user: &'a str,
    pub(super) content: &'a str,
    pub(super) post_id: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserDto {
    id: i64,
    email: String,
}

impl UserDto {
    pub(super) fn into_domain(self) -> Result<User, String> {
        User::try_from_parts(self.id, self.email).map_err(|err| format!("user {}: {err}", self.id))
    }
}

#[derive(Debug, Serialize)]
pub(super) struct NewUserDto<'a> {
    pub(super) email: &'a str,
}

impl<'a> From<&'a EmailAddress> for NewUserDto<'a> {
    fn from(email: &'a EmailAddress) -> Self {
        Self {
            email: email.as_ref(),
        }
    }
}

/// Error body returned by the backend for non-success statuses.
///
/// `detail` is usually a string but validation errors carry a list.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ApiErrorDto {
    #[serde(default)]
    pub(super) detail: Option<Value>,
    #[serde(default)]
    pub(super) code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct IdentityConfigDto {
    user_pool_id: String,
    user_pool_client_id: String,
    cognito_domain: String,
    callback_urls: CallbackUrlsDto,
}

/// Callback URLs arrive either as an array or as a JSON-encoded array string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CallbackUrlsDto {
    List(Vec<String>),
    Encoded(String),
}

impl CallbackUrlsDto {
    fn into_urls(self) -> Result<Vec<String>, String> {
        match self {
            Self::List(urls) => Ok(urls),
            Self::Encoded(raw) => serde_json::from_str(&raw)
                .map_err(|err| format!("callbackUrls is not an encoded list: {err}")),
        }
    }
}

impl IdentityConfigDto {
    pub(super) fn into_domain(self) -> Result<DeployedIdentityConfig, String> {
        Ok(DeployedIdentityConfig {
            user_pool_id: self.user_pool_id,
            user_pool_client_id: self.user_pool_client_id,
            cognito_domain: self.cognito_domain,
            callback_urls: self.callback_urls.into_urls()?,
        })
    }
}
