//! HTTP adapter for the comment API port.

use async_trait::async_trait;
use tracing::debug;

use super::dto::{CommentDto, NewCommentDto};
use super::{ApiClient, map_http_failure};
use crate::domain::ports::{CommentApi, CommentApiError, CreateCommentRequest};
use crate::domain::{Comment, CommentId, PostId};

map_http_failure!(CommentApiError);

/// Comment API backed by `GET /posts/{id}/comments`, `POST /comments`, and
/// `DELETE /comments/{id}`.
#[derive(Debug, Clone)]
pub struct HttpCommentApi {
    client: ApiClient,
}

impl HttpCommentApi {
    /// Build the adapter over a shared API client.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

fn decode_comment(dto: CommentDto) -> Result<Comment, CommentApiError> {
    dto.into_domain().map_err(CommentApiError::decode)
}

#[async_trait]
impl CommentApi for HttpCommentApi {
    async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>, CommentApiError> {
        let post = post_id.to_string();
        let url = self.client.endpoint(&["posts", post.as_str(), "comments"]);
        let listed: Vec<CommentDto> = self.client.get_json(url).await?;
        debug!(%post_id, count = listed.len(), "comments listed");
        listed.into_iter().map(decode_comment).collect()
    }

    async fn create_comment(
        &self,
        request: &CreateCommentRequest,
    ) -> Result<Comment, CommentApiError> {
        let url = self.client.endpoint(&["comments"]);
        let payload = NewCommentDto {
            user: request.author.as_str(),
            content: request.content.as_str(),
            post_id: request.post_id.get(),
        };
        let created: CommentDto = self.client.post_json(url, &payload).await?;
        decode_comment(created)
    }

    async fn delete_comment(&self, comment_id: CommentId) -> Result<(), CommentApiError> {
        let id = comment_id.to_string();
        let url = self.client.endpoint(&["comments", id.as_str()]);
        self.client.delete(url).await.map_err(CommentApiError::from)
    }
}
