//! Test utilities for the client crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled for tests or with the
//! `test-support` feature.

pub mod comments {
    //! Comment API double whose calls settle only when the test says so.
    //!
    //! Each call is handed to the test as a [`PendingCall`] through an
    //! unbounded channel; the adapter future stays suspended until the test
    //! replies. This makes interleavings such as "B acknowledged before A"
    //! deterministic.

    use async_trait::async_trait;
    use tokio::sync::{mpsc, oneshot};

    use crate::domain::ports::{CommentApi, CommentApiError, CreateCommentRequest};
    use crate::domain::{Comment, CommentId, PostId};

    /// Request observed by the controlled API.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum CallRequest {
        /// `list_comments(post_id)`.
        List(PostId),
        /// `create_comment(request)`.
        Create(CreateCommentRequest),
        /// `delete_comment(comment_id)`.
        Delete(CommentId),
    }

    enum CallReply {
        Listed(Result<Vec<Comment>, CommentApiError>),
        Created(Result<Comment, CommentApiError>),
        Deleted(Result<(), CommentApiError>),
    }

    /// A call waiting for the test's answer.
    pub struct PendingCall {
        request: CallRequest,
        reply: oneshot::Sender<CallReply>,
    }

    impl PendingCall {
        /// What the store asked for.
        pub fn request(&self) -> &CallRequest {
            &self.request
        }

        /// Answer a `List` call.
        pub fn reply_list(self, result: Result<Vec<Comment>, CommentApiError>) {
            self.send(CallReply::Listed(result));
        }

        /// Answer a `Create` call.
        pub fn reply_create(self, result: Result<Comment, CommentApiError>) {
            self.send(CallReply::Created(result));
        }

        /// Answer a `Delete` call.
        pub fn reply_delete(self, result: Result<(), CommentApiError>) {
            self.send(CallReply::Deleted(result));
        }

        fn send(self, reply: CallReply) {
            // The caller may have been cancelled already; nothing to deliver.
            if self.reply.send(reply).is_err() {
                tracing::debug!("controlled call was abandoned before the reply");
            }
        }
    }

    /// Receives the calls made against a [`ControlledCommentApi`].
    pub struct CallQueue {
        calls: mpsc::UnboundedReceiver<PendingCall>,
    }

    impl CallQueue {
        /// Wait for the next call.
        ///
        /// # Panics
        /// Panics when the API was dropped without making another call.
        pub async fn next(&mut self) -> PendingCall {
            match self.calls.recv().await {
                Some(call) => call,
                None => panic!("controlled comment API dropped"),
            }
        }

        /// Whether a call is queued right now.
        pub fn has_pending(&self) -> bool {
            !self.calls.is_empty()
        }
    }

    /// Comment API whose answers are supplied by the test.
    pub struct ControlledCommentApi {
        calls: mpsc::UnboundedSender<PendingCall>,
    }

    impl ControlledCommentApi {
        /// Build the API together with the queue that receives its calls.
        pub fn new() -> (Self, CallQueue) {
            let (tx, rx) = mpsc::unbounded_channel();
            (Self { calls: tx }, CallQueue { calls: rx })
        }

        async fn call(&self, request: CallRequest) -> Result<CallReply, CommentApiError> {
            let (reply, answer) = oneshot::channel();
            self.calls
                .send(PendingCall { request, reply })
                .map_err(|_| CommentApiError::transport("call queue closed"))?;
            answer
                .await
                .map_err(|_| CommentApiError::transport("call dropped without a reply"))
        }
    }

    fn mismatch() -> CommentApiError {
        CommentApiError::decode("reply does not match the call")
    }

    #[async_trait]
    impl CommentApi for ControlledCommentApi {
        async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>, CommentApiError> {
            match self.call(CallRequest::List(post_id)).await? {
                CallReply::Listed(result) => result,
                _ => Err(mismatch()),
            }
        }

        async fn create_comment(
            &self,
            request: &CreateCommentRequest,
        ) -> Result<Comment, CommentApiError> {
            match self.call(CallRequest::Create(request.clone())).await? {
                CallReply::Created(result) => result,
                _ => Err(mismatch()),
            }
        }

        async fn delete_comment(&self, comment_id: CommentId) -> Result<(), CommentApiError> {
            match self.call(CallRequest::Delete(comment_id)).await? {
                CallReply::Deleted(result) => result,
                _ => Err(mismatch()),
            }
        }
    }
}

pub mod sessions {
    //! Session helpers for identity tests.

    use async_trait::async_trait;
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::Value;

    use crate::domain::ports::{SessionProvider, SessionProviderError};
    use crate::domain::{AuthSession, IdToken};

    /// Encode `claims` as an unsigned compact JWT.
    pub fn unsigned_jwt(claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.")
    }

    /// Session carrying an id token with `claims`.
    ///
    /// # Panics
    /// Panics when `claims` is not a JSON object.
    pub fn session_with_claims(claims: &Value) -> AuthSession {
        match IdToken::from_jwt(&unsigned_jwt(claims)) {
            Ok(token) => AuthSession::with_id_token(token),
            Err(error) => panic!("claims must encode to a token: {error}"),
        }
    }

    /// Provider that always returns the same answer.
    #[derive(Debug, Clone, Default)]
    pub struct StaticSessionProvider {
        session: Option<AuthSession>,
    }

    impl StaticSessionProvider {
        /// Provider returning `session` on every fetch.
        pub fn new(session: Option<AuthSession>) -> Self {
            Self { session }
        }
    }

    #[async_trait]
    impl SessionProvider for StaticSessionProvider {
        async fn fetch_session(&self) -> Result<Option<AuthSession>, SessionProviderError> {
            Ok(self.session.clone())
        }
    }
}
