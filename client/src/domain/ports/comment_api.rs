//! Driven port for the remote comment store.
//!
//! The optimistic store talks to the server only through this trait, so the
//! reconciliation logic can be exercised with scripted doubles.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{Comment, CommentId, PostId, SpeculativeComment};

use super::define_port_error;

define_port_error! {
    /// Errors raised by comment API adapters.
    pub enum CommentApiError {
        /// The request never produced an HTTP response.
        Transport {
            /// Detail reported by the underlying client or server.
            message: String,
        } => "comment API transport failed: {message}",
        /// The request exceeded the configured timeout.
        Timeout {
            /// Detail reported by the underlying client or server.
            message: String,
        } => "comment API request timed out: {message}",
        /// The server answered with a non-success status.
        Rejected {
            /// HTTP status code returned by the server.
            status: u16,
            /// Detail reported by the underlying client or server.
            message: String,
        } => "comment API rejected the request with status {status}: {message}",
        /// The response body could not be decoded.
        Decode {
            /// Detail reported by the underlying client or server.
            message: String,
        } => "comment API response could not be decoded: {message}",
    }
}

/// Payload for creating a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCommentRequest {
    /// Thread the comment is added to.
    pub post_id: PostId,
    /// Author name sent as `user`.
    pub author: String,
    /// Comment body.
    pub content: String,
}

impl From<&SpeculativeComment> for CreateCommentRequest {
    fn from(value: &SpeculativeComment) -> Self {
        Self {
            post_id: value.post_id(),
            author: value.author().to_owned(),
            content: value.content().to_owned(),
        }
    }
}

/// Port for listing, creating, and deleting comments remotely.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentApi: Send + Sync {
    /// Fetch every confirmed comment of a thread, in server order.
    async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>, CommentApiError>;

    /// Create a comment and return the server's confirmed record.
    async fn create_comment(
        &self,
        request: &CreateCommentRequest,
    ) -> Result<Comment, CommentApiError>;

    /// Delete a comment by id.
    async fn delete_comment(&self, comment_id: CommentId) -> Result<(), CommentApiError>;
}

/// In-memory comment API used for demos and tests that do not script calls.
///
/// Ids are allocated sequentially from one. Deleting an unknown id answers
/// with a 404 rejection, mirroring a strict server.
#[derive(Debug)]
pub struct FixtureCommentApi {
    state: Mutex<FixtureComments>,
}

#[derive(Debug)]
struct FixtureComments {
    comments: Vec<Comment>,
    next_id: i64,
}

impl Default for FixtureCommentApi {
    fn default() -> Self {
        Self::with_comments(Vec::new())
    }
}

impl FixtureCommentApi {
    /// Seed the fixture with existing comments.
    pub fn with_comments(comments: Vec<Comment>) -> Self {
        let next_id = comments
            .iter()
            .map(|comment| comment.id().get())
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        Self {
            state: Mutex::new(FixtureComments { comments, next_id }),
        }
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut FixtureComments) -> Result<T, CommentApiError>,
    ) -> Result<T, CommentApiError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| CommentApiError::transport("fixture comment state poisoned"))?;
        f(&mut state)
    }
}

#[async_trait]
impl CommentApi for FixtureCommentApi {
    async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>, CommentApiError> {
        self.with_state(|state| {
            Ok(state
                .comments
                .iter()
                .filter(|comment| comment.post_id() == post_id)
                .cloned()
                .collect())
        })
    }

    async fn create_comment(
        &self,
        request: &CreateCommentRequest,
    ) -> Result<Comment, CommentApiError> {
        self.with_state(|state| {
            let id = CommentId::new(state.next_id)
                .map_err(|err| CommentApiError::decode(err.to_string()))?;
            state.next_id = state.next_id.saturating_add(1);
            let comment = Comment::new(
                id,
                request.post_id,
                request.author.as_str(),
                request.content.as_str(),
            );
            state.comments.push(comment.clone());
            Ok(comment)
        })
    }

    async fn delete_comment(&self, comment_id: CommentId) -> Result<(), CommentApiError> {
        self.with_state(|state| {
            let before = state.comments.len();
            state.comments.retain(|comment| comment.id() != comment_id);
            if state.comments.len() == before {
                return Err(CommentApiError::rejected(
                    404_u16,
                    format!("comment {comment_id} not found"),
                ));
            }
            Ok(())
        })
    }
}
