//! Pure reconciliation state for one comment thread.
//!
//! The thread is a single ordered collection of tagged entries. Confirmed
//! comments come first in server order; pending deletes stay in place as
//! tombstones; pending creates always sit at the tail. The [`ThreadView`] is a
//! projection recomputed from the entries on demand, never stored.
//!
//! Nothing here suspends. The store drives these transitions under a lock and
//! performs the remote calls in between.

use std::collections::HashSet;
use std::num::NonZeroU64;

use crate::domain::{
    Comment, CommentDraft, CommentId, Error, PostId, SpeculativeComment, TemporaryId,
};

/// Mutation awaiting a server answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingMutation {
    /// Placeholder for a comment being created.
    Create(SpeculativeComment),
    /// Confirmed comment whose delete is in flight.
    Delete(PendingDelete),
}

/// Tombstone for an in-flight delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    comment: Comment,
    ticket: DeleteTicket,
}

impl PendingDelete {
    /// Comment being deleted, restored verbatim on rejection.
    pub fn comment(&self) -> &Comment {
        &self.comment
    }
}

/// One slot in the thread's ordered collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadEntry {
    /// Server-acknowledged comment.
    Confirmed(Comment),
    /// Local mutation not yet settled.
    Pending(PendingMutation),
}

/// Entry rendered by the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEntry {
    /// Server-acknowledged comment.
    Confirmed(Comment),
    /// Comment shown ahead of the server's acknowledgement.
    Speculative(SpeculativeComment),
}

impl ViewEntry {
    /// Whether the server has acknowledged this entry.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    /// Integer key for list rendering: the comment id, or a negative
    /// sentinel for speculative entries.
    #[must_use]
    pub fn key(&self) -> i64 {
        match self {
            Self::Confirmed(comment) => comment.id().get(),
            Self::Speculative(speculative) => speculative.temporary_id().as_sentinel(),
        }
    }

    /// Author name.
    #[must_use]
    pub fn author(&self) -> &str {
        match self {
            Self::Confirmed(comment) => comment.author(),
            Self::Speculative(speculative) => speculative.author(),
        }
    }

    /// Comment body.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Confirmed(comment) => comment.content(),
            Self::Speculative(speculative) => speculative.content(),
        }
    }
}

/// Ordered projection of the thread shown to the user.
///
/// Pending deletes are absent from `entries` and listed in `hidden`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadView {
    post_id: Option<PostId>,
    entries: Vec<ViewEntry>,
    hidden: Vec<CommentId>,
}

impl ThreadView {
    /// Thread shown, if any.
    #[must_use]
    pub const fn post_id(&self) -> Option<PostId> {
        self.post_id
    }

    /// Visible entries in display order.
    #[must_use]
    pub fn entries(&self) -> &[ViewEntry] {
        &self.entries
    }

    /// Confirmed comments hidden while their delete is in flight.
    #[must_use]
    pub fn hidden(&self) -> &[CommentId] {
        &self.hidden
    }

    /// Number of visible entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Proof that a load was started for a particular thread generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LoadTicket {
    post_id: PostId,
    generation: u64,
}

impl LoadTicket {
    pub(crate) const fn post_id(self) -> PostId {
        self.post_id
    }
}

/// Correlates a delete request with its tombstone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeleteTicket {
    comment_id: CommentId,
    sequence: u64,
}

impl DeleteTicket {
    pub(crate) const fn comment_id(self) -> CommentId {
        self.comment_id
    }
}

/// Mutable thread state guarded by the store.
#[derive(Debug, Default)]
pub(crate) struct ThreadState {
    post_id: Option<PostId>,
    generation: u64,
    entries: Vec<ThreadEntry>,
    sequence: u64,
}

impl ThreadState {
    pub(crate) const fn post_id(&self) -> Option<PostId> {
        self.post_id
    }

    /// Start (or restart) loading `post_id`.
    ///
    /// Switching threads drops every entry of the old thread at once.
    /// Reloading the same thread keeps pending entries. Either way the
    /// generation advances, so older loads can no longer apply.
    pub(crate) fn begin_thread(&mut self, post_id: PostId) -> LoadTicket {
        if self.post_id != Some(post_id) {
            self.entries.clear();
            self.post_id = Some(post_id);
        }
        self.generation = self.generation.wrapping_add(1);
        LoadTicket {
            post_id,
            generation: self.generation,
        }
    }

    pub(crate) fn is_current(&self, ticket: LoadTicket) -> bool {
        self.generation == ticket.generation && self.post_id == Some(ticket.post_id)
    }

    /// Replace the confirmed entries with a fresh server listing.
    ///
    /// Returns `false`, changing nothing, when a newer load has started.
    /// Tombstones survive for comments still listed. Pending creates are
    /// re-appended in submission order.
    pub(crate) fn apply_load(&mut self, ticket: LoadTicket, comments: Vec<Comment>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }

        let mut tombstones: Vec<PendingDelete> = Vec::new();
        let mut creates: Vec<ThreadEntry> = Vec::new();
        for entry in self.entries.drain(..) {
            match entry {
                ThreadEntry::Pending(PendingMutation::Delete(pending)) => tombstones.push(pending),
                ThreadEntry::Pending(PendingMutation::Create(_)) => creates.push(entry),
                ThreadEntry::Confirmed(_) => {}
            }
        }

        let mut seen: HashSet<CommentId> = HashSet::with_capacity(comments.len());
        for comment in comments {
            if !seen.insert(comment.id()) {
                continue;
            }
            let tombstone = tombstones
                .iter()
                .position(|pending| pending.comment.id() == comment.id());
            let entry = match tombstone {
                Some(index) => {
                    let pending = tombstones.swap_remove(index);
                    ThreadEntry::Pending(PendingMutation::Delete(PendingDelete {
                        comment,
                        ticket: pending.ticket,
                    }))
                }
                None => ThreadEntry::Confirmed(comment),
            };
            self.entries.push(entry);
        }
        self.entries.extend(creates);
        true
    }

    /// Append a placeholder for `draft` at the tail of the thread.
    pub(crate) fn begin_create(&mut self, draft: CommentDraft) -> Result<SpeculativeComment, Error> {
        let post_id = self
            .post_id
            .ok_or_else(|| Error::invalid_request("no thread is loaded"))?;
        let temporary_id = TemporaryId::from_sequence(self.next_sequence()?);
        let speculative = SpeculativeComment::new(temporary_id, post_id, draft);
        self.entries.push(ThreadEntry::Pending(PendingMutation::Create(
            speculative.clone(),
        )));
        Ok(speculative)
    }

    /// Promote the placeholder `temporary_id` to `comment`.
    ///
    /// The confirmed comment lands after every confirmed entry, ahead of the
    /// placeholders still waiting. Returns `false` when the placeholder is
    /// gone (the thread was switched away).
    pub(crate) fn confirm_create(&mut self, temporary_id: TemporaryId, comment: Comment) -> bool {
        if !self.remove_placeholder(temporary_id) {
            return false;
        }
        if self.post_id != Some(comment.post_id()) || self.contains_comment(comment.id()) {
            return true;
        }
        let slot = self
            .entries
            .iter()
            .position(|entry| matches!(entry, ThreadEntry::Pending(PendingMutation::Create(_))))
            .unwrap_or(self.entries.len());
        self.entries.insert(slot, ThreadEntry::Confirmed(comment));
        true
    }

    /// Drop the placeholder `temporary_id`.
    pub(crate) fn reject_create(&mut self, temporary_id: TemporaryId) -> bool {
        self.remove_placeholder(temporary_id)
    }

    /// Turn the confirmed comment `comment_id` into a tombstone.
    pub(crate) fn begin_delete(&mut self, comment_id: CommentId) -> Result<DeleteTicket, Error> {
        if self.post_id.is_none() {
            return Err(Error::invalid_request("no thread is loaded"));
        }
        let index = self
            .entries
            .iter()
            .position(|entry| entry_comment_id(entry) == Some(comment_id))
            .ok_or_else(|| {
                Error::invalid_request(format!("comment {comment_id} is not in this thread"))
            })?;
        let sequence = self.next_sequence()?.get();
        let Some(slot) = self.entries.get_mut(index) else {
            return Err(Error::internal("thread entry vanished while deleting"));
        };
        let ThreadEntry::Confirmed(comment) = slot else {
            return Err(Error::invalid_request(format!(
                "comment {comment_id} is already being deleted"
            )));
        };
        let ticket = DeleteTicket {
            comment_id,
            sequence,
        };
        let pending = PendingDelete {
            comment: comment.clone(),
            ticket,
        };
        *slot = ThreadEntry::Pending(PendingMutation::Delete(pending));
        Ok(ticket)
    }

    /// Remove the tombstone matching `ticket` for good.
    pub(crate) fn confirm_delete(&mut self, ticket: DeleteTicket) -> bool {
        let Some(index) = self.tombstone_index(ticket) else {
            return false;
        };
        self.entries.remove(index);
        true
    }

    /// Restore the comment behind the tombstone matching `ticket`.
    pub(crate) fn reject_delete(&mut self, ticket: DeleteTicket) -> bool {
        let Some(slot) = self
            .tombstone_index(ticket)
            .and_then(|index| self.entries.get_mut(index))
        else {
            return false;
        };
        if let ThreadEntry::Pending(PendingMutation::Delete(pending)) = slot {
            *slot = ThreadEntry::Confirmed(pending.comment.clone());
            return true;
        }
        false
    }

    /// Confirmed comments, including those whose delete is still in flight.
    pub(crate) fn confirmed(&self) -> Vec<Comment> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                ThreadEntry::Confirmed(comment) => Some(comment.clone()),
                ThreadEntry::Pending(PendingMutation::Delete(pending)) => {
                    Some(pending.comment.clone())
                }
                ThreadEntry::Pending(PendingMutation::Create(_)) => None,
            })
            .collect()
    }

    /// Entries in collection order.
    pub(crate) fn entries(&self) -> &[ThreadEntry] {
        &self.entries
    }

    /// Recompute the view from the current entries.
    pub(crate) fn view(&self) -> ThreadView {
        let mut entries = Vec::with_capacity(self.entries.len());
        let mut hidden = Vec::new();
        for entry in &self.entries {
            match entry {
                ThreadEntry::Confirmed(comment) => entries.push(ViewEntry::Confirmed(comment.clone())),
                ThreadEntry::Pending(PendingMutation::Create(speculative)) => {
                    entries.push(ViewEntry::Speculative(speculative.clone()));
                }
                ThreadEntry::Pending(PendingMutation::Delete(pending)) => {
                    hidden.push(pending.comment.id());
                }
            }
        }
        ThreadView {
            post_id: self.post_id,
            entries,
            hidden,
        }
    }

    fn next_sequence(&mut self) -> Result<NonZeroU64, Error> {
        let next = self
            .sequence
            .checked_add(1)
            .ok_or_else(|| Error::internal("local sequence exhausted"))?;
        self.sequence = next;
        NonZeroU64::new(next).ok_or_else(|| Error::internal("local sequence wrapped to zero"))
    }

    fn remove_placeholder(&mut self, temporary_id: TemporaryId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| {
            !matches!(
                entry,
                ThreadEntry::Pending(PendingMutation::Create(speculative))
                    if speculative.temporary_id() == temporary_id
            )
        });
        self.entries.len() != before
    }

    fn contains_comment(&self, comment_id: CommentId) -> bool {
        self.entries
            .iter()
            .any(|entry| entry_comment_id(entry) == Some(comment_id))
    }

    fn tombstone_index(&self, ticket: DeleteTicket) -> Option<usize> {
        self.entries.iter().position(|entry| {
            matches!(
                entry,
                ThreadEntry::Pending(PendingMutation::Delete(pending)) if pending.ticket == ticket
            )
        })
    }
}

fn entry_comment_id(entry: &ThreadEntry) -> Option<CommentId> {
    match entry {
        ThreadEntry::Confirmed(comment) => Some(comment.id()),
        ThreadEntry::Pending(PendingMutation::Delete(pending)) => Some(pending.comment.id()),
        ThreadEntry::Pending(PendingMutation::Create(_)) => None,
    }
}
