//! Keeps the store pointed at the thread being viewed.

use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, ready};
use tracing::debug;

use crate::domain::{Error, PostId};

use super::{LoadOutcome, OptimisticCommentStore};

/// What [`ThreadLoader::show`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowOutcome {
    /// The thread was already shown; nothing was fetched.
    Unchanged,
    /// A load was started and finished with this outcome.
    Loaded(LoadOutcome),
}

/// Loads a thread once per distinct id.
///
/// Showing a new id supersedes the old thread's in-flight load; its result is
/// discarded by the store. Use [`refresh`](Self::refresh) to fetch the current
/// thread again, for example after a failed load.
#[derive(Clone)]
pub struct ThreadLoader {
    store: OptimisticCommentStore,
    current: Arc<Mutex<Option<PostId>>>,
}

impl ThreadLoader {
    /// Build a loader feeding `store`.
    pub fn new(store: OptimisticCommentStore) -> Self {
        Self {
            store,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// The store being fed.
    pub fn store(&self) -> &OptimisticCommentStore {
        &self.store
    }

    /// Thread id last passed to [`show`](Self::show).
    pub fn current(&self) -> Option<PostId> {
        self.current.lock().ok().and_then(|current| *current)
    }

    /// Show `post_id`, loading it unless it is already shown.
    pub fn show(&self, post_id: PostId) -> BoxFuture<'static, Result<ShowOutcome, Error>> {
        let load = {
            let mut current = match self.current.lock() {
                Ok(current) => current,
                Err(_) => return ready(Err(Error::internal("thread loader state poisoned"))).boxed(),
            };
            if *current == Some(post_id) {
                debug!(%post_id, "thread already shown");
                return ready(Ok(ShowOutcome::Unchanged)).boxed();
            }
            let started = match self.store.start_load(post_id) {
                Ok(started) => started,
                Err(error) => return ready(Err(error)).boxed(),
            };
            *current = Some(post_id);
            started
        };
        load.map(|outcome| outcome.map(ShowOutcome::Loaded)).boxed()
    }

    /// Fetch the current thread again.
    pub fn refresh(&self) -> BoxFuture<'static, Result<LoadOutcome, Error>> {
        match self.current() {
            Some(post_id) => self.store.load(post_id),
            None => ready(Err(Error::invalid_request("no thread is shown"))).boxed(),
        }
    }
}
