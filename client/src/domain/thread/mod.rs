//! Optimistic comment thread: state, store, and loader.
//!
//! The store shows local mutations immediately and reconciles them with the
//! server's answers. The loader keeps the store pointed at the thread the
//! user is looking at.

mod loader;
mod state;
mod store;

pub use loader::{ShowOutcome, ThreadLoader};
pub use state::{PendingDelete, PendingMutation, ThreadEntry, ThreadView, ViewEntry};
pub use store::OptimisticCommentStore;

use std::fmt;

use crate::domain::{Comment, CommentId, Error, PostId, TemporaryId};

/// Result of a load that finished without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The listing replaced the confirmed comments.
    Applied {
        /// Comments returned by the server, in server order.
        comments: Vec<Comment>,
    },
    /// A newer load or a thread switch made this result obsolete.
    Superseded,
}

/// Which kind of mutation an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// A comment creation.
    Create {
        /// Placeholder of the failed create.
        temporary_id: TemporaryId,
    },
    /// A comment deletion.
    Delete {
        /// Comment whose delete failed.
        comment_id: CommentId,
    },
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { temporary_id } => write!(f, "create of {temporary_id}"),
            Self::Delete { comment_id } => write!(f, "delete of comment {comment_id}"),
        }
    }
}

/// Notification published once per settled store operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadEvent {
    /// A listing replaced the confirmed comments.
    Loaded {
        /// Thread that was loaded.
        post_id: PostId,
        /// Number of confirmed comments received.
        count: usize,
    },
    /// The current thread could not be loaded.
    LoadFailed {
        /// Thread that failed to load.
        post_id: PostId,
        /// Domain error describing the failure.
        error: Error,
    },
    /// The server acknowledged a create and the placeholder was promoted.
    CreateConfirmed {
        /// Placeholder that was replaced.
        temporary_id: TemporaryId,
        /// Confirmed comment.
        comment: Comment,
    },
    /// The server acknowledged a delete.
    DeleteConfirmed {
        /// Deleted comment.
        comment_id: CommentId,
    },
    /// The server refused a mutation and the local change was undone.
    MutationRejected {
        /// Mutation that was undone.
        mutation: MutationKind,
        /// Domain error describing the refusal.
        error: Error,
    },
}

#[cfg(test)]
mod tests;
