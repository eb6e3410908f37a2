//! Optimistic comment store.
//!
//! Every operation applies its local effect synchronously, before the
//! returned future is first polled, and only then talks to the server. The
//! future is the operation's result channel; a watch channel carries the
//! recomputed view and a broadcast channel carries one [`ThreadEvent`] per
//! settled operation.
//!
//! The state lock is never held across an `.await`. Every completion checks
//! that the store is still open, and that its thread is still current, before
//! touching state.

use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, ready};
use serde_json::json;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::cancellation::OrCancelExt;
use crate::domain::ports::{CommentApi, CommentApiError, CreateCommentRequest};
use crate::domain::{Comment, CommentDraft, CommentId, Error, PostId, SpeculativeComment, TemporaryId};

use super::state::{DeleteTicket, LoadTicket, ThreadState};
use super::{LoadOutcome, MutationKind, ThreadEntry, ThreadEvent, ThreadView};

const EVENT_CAPACITY: usize = 64;

/// Comment store that shows mutations before the server confirms them.
///
/// Cloning is cheap; clones share the same thread.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use client::domain::ports::FixtureCommentApi;
/// use client::domain::{CommentDraft, OptimisticCommentStore, PostId};
///
/// # async fn demo() -> Result<(), client::domain::Error> {
/// let store = OptimisticCommentStore::new(Arc::new(FixtureCommentApi::default()));
/// store.load(PostId::new(1).unwrap()).await?;
///
/// let pending = store.submit_create(CommentDraft::try_new("ada", "First!").unwrap());
/// // The placeholder is visible before the server answers.
/// assert!(!store.view().entries()[0].is_confirmed());
///
/// let confirmed = pending.await?;
/// assert_eq!(store.view().entries()[0].key(), confirmed.id().get());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct OptimisticCommentStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    api: Arc<dyn CommentApi>,
    guarded: Mutex<Guarded>,
    lifetime: CancellationToken,
    views: watch::Sender<ThreadView>,
    events: broadcast::Sender<ThreadEvent>,
}

#[derive(Default)]
struct Guarded {
    thread: ThreadState,
    load_cancel: Option<CancellationToken>,
}

impl OptimisticCommentStore {
    /// Build an empty store over a comment API.
    pub fn new(api: Arc<dyn CommentApi>) -> Self {
        let (views, _) = watch::channel(ThreadView::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                api,
                guarded: Mutex::new(Guarded::default()),
                lifetime: CancellationToken::new(),
                views,
                events,
            }),
        }
    }

    /// Load the confirmed comments of `post_id`.
    ///
    /// Switching threads clears the old thread immediately and aborts its
    /// in-flight load. Reloading the same thread keeps pending mutations.
    /// A result that arrives after a newer load started resolves to
    /// [`LoadOutcome::Superseded`] and changes nothing.
    pub fn load(&self, post_id: PostId) -> BoxFuture<'static, Result<LoadOutcome, Error>> {
        match self.start_load(post_id) {
            Err(error) => ready(Err(error)).boxed(),
            Ok(load) => load,
        }
    }

    /// Switch to `post_id` now, or report why the store refused to.
    pub(crate) fn start_load(
        &self,
        post_id: PostId,
    ) -> Result<BoxFuture<'static, Result<LoadOutcome, Error>>, Error> {
        let (ticket, token) = self.inner.begin_load(post_id)?;
        let inner = Arc::clone(&self.inner);
        Ok(async move { inner.finish_load(ticket, token).await }.boxed())
    }

    /// Show `draft` immediately and ask the server to create it.
    ///
    /// Resolves to the confirmed comment, or to a `mutation_rejected` error
    /// once the placeholder has been removed again.
    pub fn submit_create(&self, draft: CommentDraft) -> BoxFuture<'static, Result<Comment, Error>> {
        match self.inner.begin_create(draft) {
            Err(error) => ready(Err(error)).boxed(),
            Ok(speculative) => {
                let inner = Arc::clone(&self.inner);
                async move { inner.finish_create(speculative).await }.boxed()
            }
        }
    }

    /// Hide `comment_id` immediately and ask the server to delete it.
    ///
    /// A rejected delete restores the comment unchanged. A second delete of a
    /// comment whose delete is still in flight is refused up front.
    pub fn submit_delete(&self, comment_id: CommentId) -> BoxFuture<'static, Result<(), Error>> {
        match self.inner.begin_delete(comment_id) {
            Err(error) => ready(Err(error)).boxed(),
            Ok(ticket) => {
                let inner = Arc::clone(&self.inner);
                async move { inner.finish_delete(ticket).await }.boxed()
            }
        }
    }

    /// Current view.
    pub fn view(&self) -> ThreadView {
        self.inner.views.borrow().clone()
    }

    /// Receive every recomputed view.
    pub fn subscribe(&self) -> watch::Receiver<ThreadView> {
        self.inner.views.subscribe()
    }

    /// Receive an event per settled operation.
    pub fn events(&self) -> broadcast::Receiver<ThreadEvent> {
        self.inner.events.subscribe()
    }

    /// Thread currently shown.
    pub fn post_id(&self) -> Option<PostId> {
        self.inner.views.borrow().post_id()
    }

    /// Confirmed comments, including those with a delete in flight.
    pub fn confirmed(&self) -> Result<Vec<Comment>, Error> {
        Ok(self.inner.lock()?.thread.confirmed())
    }

    /// Snapshot of the tagged entry collection.
    pub fn entries(&self) -> Result<Vec<ThreadEntry>, Error> {
        Ok(self.inner.lock()?.thread.entries().to_vec())
    }

    /// Abort every in-flight call. Late results are dropped.
    pub fn close(&self) {
        debug!("closing comment store");
        self.inner.lifetime.cancel();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.lifetime.is_cancelled()
    }
}

impl StoreInner {
    fn lock(&self) -> Result<MutexGuard<'_, Guarded>, Error> {
        self.guarded
            .lock()
            .map_err(|_| Error::internal("comment store state poisoned"))
    }

    fn ensure_open(&self, operation: &str) -> Result<(), Error> {
        if self.lifetime.is_cancelled() {
            return Err(Error::cancelled(format!(
                "{operation} refused: comment store is closed"
            )));
        }
        Ok(())
    }

    fn publish(&self, thread: &ThreadState) {
        let view = thread.view();
        self.views.send_modify(|current| *current = view);
    }

    fn emit(&self, event: ThreadEvent) {
        if self.events.send(event).is_err() {
            debug!("no thread event subscribers");
        }
    }

    fn begin_load(&self, post_id: PostId) -> Result<(LoadTicket, CancellationToken), Error> {
        self.ensure_open("thread load")?;
        let mut guarded = self.lock()?;
        let switching = guarded.thread.post_id() != Some(post_id);
        let ticket = guarded.thread.begin_thread(post_id);
        let token = self.lifetime.child_token();
        if let Some(previous) = guarded.load_cancel.replace(token.clone()) {
            previous.cancel();
        }
        if switching {
            self.publish(&guarded.thread);
        }
        debug!(%post_id, switching, "thread load started");
        Ok((ticket, token))
    }

    async fn finish_load(
        &self,
        ticket: LoadTicket,
        token: CancellationToken,
    ) -> Result<LoadOutcome, Error> {
        let post_id = ticket.post_id();
        match self.api.list_comments(post_id).or_cancel(&token).await {
            Err(cancelled) if self.lifetime.is_cancelled() => {
                Err(cancelled.into_error("thread load"))
            }
            Err(_) => {
                debug!(%post_id, "thread load superseded before completion");
                Ok(LoadOutcome::Superseded)
            }
            Ok(Ok(comments)) => self.apply_listing(ticket, comments),
            Ok(Err(err)) => self.fail_load(ticket, &err),
        }
    }

    fn apply_listing(
        &self,
        ticket: LoadTicket,
        comments: Vec<Comment>,
    ) -> Result<LoadOutcome, Error> {
        let post_id = ticket.post_id();
        let mut guarded = self.lock()?;
        self.ensure_open("thread load")?;
        if !guarded.thread.apply_load(ticket, comments.clone()) {
            debug!(%post_id, "discarding stale thread listing");
            return Ok(LoadOutcome::Superseded);
        }
        guarded.load_cancel = None;
        self.publish(&guarded.thread);
        debug!(%post_id, count = comments.len(), "thread listing applied");
        self.emit(ThreadEvent::Loaded {
            post_id,
            count: comments.len(),
        });
        Ok(LoadOutcome::Applied { comments })
    }

    fn fail_load(&self, ticket: LoadTicket, err: &CommentApiError) -> Result<LoadOutcome, Error> {
        let post_id = ticket.post_id();
        let mut guarded = self.lock()?;
        self.ensure_open("thread load")?;
        if !guarded.thread.is_current(ticket) {
            debug!(%post_id, error = %err, "ignoring failure of a superseded load");
            return Ok(LoadOutcome::Superseded);
        }
        guarded.load_cancel = None;
        let error = with_status(
            Error::load_failed(format!("failed to load comments for post {post_id}: {err}")),
            err,
        );
        warn!(%post_id, error = %err, "thread load failed");
        self.emit(ThreadEvent::LoadFailed {
            post_id,
            error: error.clone(),
        });
        Err(error)
    }

    fn begin_create(&self, draft: CommentDraft) -> Result<SpeculativeComment, Error> {
        self.ensure_open("comment create")?;
        let mut guarded = self.lock()?;
        let speculative = guarded.thread.begin_create(draft)?;
        self.publish(&guarded.thread);
        debug!(
            temporary_id = %speculative.temporary_id(),
            post_id = %speculative.post_id(),
            "speculative comment shown"
        );
        Ok(speculative)
    }

    async fn finish_create(&self, speculative: SpeculativeComment) -> Result<Comment, Error> {
        let temporary_id = speculative.temporary_id();
        let request = CreateCommentRequest::from(&speculative);
        match self
            .api
            .create_comment(&request)
            .or_cancel(&self.lifetime)
            .await
        {
            Err(cancelled) => Err(cancelled.into_error("comment create")),
            Ok(Ok(comment)) => self.settle_create(temporary_id, comment),
            Ok(Err(err)) => Err(self.undo(MutationKind::Create { temporary_id }, &err, |thread| {
                thread.reject_create(temporary_id)
            })),
        }
    }

    fn settle_create(&self, temporary_id: TemporaryId, comment: Comment) -> Result<Comment, Error> {
        let mut guarded = self.lock()?;
        self.ensure_open("comment create")?;
        if guarded.thread.confirm_create(temporary_id, comment.clone()) {
            self.publish(&guarded.thread);
            debug!(%temporary_id, comment_id = %comment.id(), "speculative comment confirmed");
            self.emit(ThreadEvent::CreateConfirmed {
                temporary_id,
                comment: comment.clone(),
            });
        } else {
            debug!(%temporary_id, "create settled after its thread was left");
        }
        Ok(comment)
    }

    fn begin_delete(&self, comment_id: CommentId) -> Result<DeleteTicket, Error> {
        self.ensure_open("comment delete")?;
        let mut guarded = self.lock()?;
        let ticket = guarded.thread.begin_delete(comment_id)?;
        self.publish(&guarded.thread);
        debug!(%comment_id, "comment hidden pending delete");
        Ok(ticket)
    }

    async fn finish_delete(&self, ticket: DeleteTicket) -> Result<(), Error> {
        let comment_id = ticket.comment_id();
        match self
            .api
            .delete_comment(comment_id)
            .or_cancel(&self.lifetime)
            .await
        {
            Err(cancelled) => Err(cancelled.into_error("comment delete")),
            Ok(Ok(())) => self.settle_delete(ticket),
            Ok(Err(err)) => Err(self.undo(MutationKind::Delete { comment_id }, &err, |thread| {
                thread.reject_delete(ticket)
            })),
        }
    }

    fn settle_delete(&self, ticket: DeleteTicket) -> Result<(), Error> {
        let comment_id = ticket.comment_id();
        let mut guarded = self.lock()?;
        self.ensure_open("comment delete")?;
        if guarded.thread.confirm_delete(ticket) {
            self.publish(&guarded.thread);
            debug!(%comment_id, "comment delete confirmed");
            self.emit(ThreadEvent::DeleteConfirmed { comment_id });
        } else {
            debug!(%comment_id, "delete settled after its thread was left");
        }
        Ok(())
    }

    /// Revert a refused mutation and report it once.
    fn undo(
        &self,
        mutation: MutationKind,
        err: &CommentApiError,
        revert: impl FnOnce(&mut ThreadState) -> bool,
    ) -> Error {
        let error = with_status(
            Error::mutation_rejected(format!("{mutation} was rejected: {err}")),
            err,
        );
        let mut guarded = match self.lock() {
            Ok(guarded) => guarded,
            Err(poisoned) => return poisoned,
        };
        if let Err(closed) = self.ensure_open("mutation rollback") {
            return closed;
        }
        if revert(&mut guarded.thread) {
            self.publish(&guarded.thread);
        }
        warn!(%mutation, error = %err, "mutation rejected; local change undone");
        self.emit(ThreadEvent::MutationRejected {
            mutation,
            error: error.clone(),
        });
        error
    }
}

fn with_status(error: Error, source: &CommentApiError) -> Error {
    match source {
        CommentApiError::Rejected { status, .. } => error.with_details(json!({ "status": status })),
        _ => error,
    }
}
