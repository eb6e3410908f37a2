//! Comment thread data model.
//!
//! Confirmed comments carry server-assigned [`CommentId`]s. Speculative
//! comments carry a [`TemporaryId`], a separate type that can never be turned
//! into a [`CommentId`], so the two id spaces stay disjoint by construction.

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// Validation errors returned by the comment constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentValidationError {
    /// Comment ids are server-assigned and strictly positive.
    NonPositiveCommentId,
    /// Post ids are server-assigned and strictly positive.
    NonPositivePostId,
    /// The author was blank once trimmed.
    EmptyAuthor,
    /// The content was blank once trimmed.
    EmptyContent,
}

impl fmt::Display for CommentValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveCommentId => write!(f, "comment id must be a positive integer"),
            Self::NonPositivePostId => write!(f, "post id must be a positive integer"),
            Self::EmptyAuthor => write!(f, "comment author must not be empty"),
            Self::EmptyContent => write!(f, "comment content must not be empty"),
        }
    }
}

impl std::error::Error for CommentValidationError {}

macro_rules! positive_id {
    ($(#[$meta:meta])* $name:ident, $error:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            /// Validate and construct the identifier.
            pub fn new(raw: i64) -> Result<Self, CommentValidationError> {
                if raw <= 0 {
                    return Err(CommentValidationError::$error);
                }
                Ok(Self(raw))
            }

            /// Raw integer value as sent on the wire.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = CommentValidationError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

positive_id!(
    /// Server-assigned comment identifier.
    CommentId,
    NonPositiveCommentId
);

positive_id!(
    /// Identifier of the post a thread hangs off.
    PostId,
    NonPositivePostId
);

/// Server-confirmed comment.
///
/// Serialises with the wire names `{id, user, content, post_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    id: CommentId,
    post_id: PostId,
    #[serde(rename = "user")]
    author: String,
    content: String,
}

impl Comment {
    /// Build a confirmed comment from validated parts.
    pub fn new(
        id: CommentId,
        post_id: PostId,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            post_id,
            author: author.into(),
            content: content.into(),
        }
    }

    /// Server-assigned identifier.
    pub fn id(&self) -> CommentId {
        self.id
    }

    /// Post the comment belongs to.
    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    /// Author name as stored by the server.
    pub fn author(&self) -> &str {
        self.author.as_str()
    }

    /// Comment body.
    pub fn content(&self) -> &str {
        self.content.as_str()
    }
}

/// Validated user input for a new comment.
///
/// ## Invariants
/// - `author` and `content` are non-blank. Content keeps caller whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    author: String,
    content: String,
}

impl CommentDraft {
    /// Validate author and content.
    ///
    /// # Examples
    /// ```
    /// use client::domain::CommentDraft;
    ///
    /// assert!(CommentDraft::try_new("ada@example.com", "  ").is_err());
    /// let draft = CommentDraft::try_new("ada@example.com", "Nice post").unwrap();
    /// assert_eq!(draft.content(), "Nice post");
    /// ```
    pub fn try_new(
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self, CommentValidationError> {
        let author = author.into();
        let content = content.into();
        if author.trim().is_empty() {
            return Err(CommentValidationError::EmptyAuthor);
        }
        if content.trim().is_empty() {
            return Err(CommentValidationError::EmptyContent);
        }
        Ok(Self {
            author: author.trim().to_owned(),
            content,
        })
    }

    /// Author name to post under.
    pub fn author(&self) -> &str {
        self.author.as_str()
    }

    /// Comment body.
    pub fn content(&self) -> &str {
        self.content.as_str()
    }
}

/// Locally allocated identifier for a comment the server has not confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemporaryId(NonZeroU64);

impl TemporaryId {
    pub(crate) const fn from_sequence(sequence: NonZeroU64) -> Self {
        Self(sequence)
    }

    /// Allocation sequence number, starting at one per store.
    #[must_use]
    pub const fn sequence(self) -> u64 {
        self.0.get()
    }

    /// Negative integer key for renderers that need a single integer space.
    ///
    /// Confirmed ids are positive, so the sentinel never equals one.
    #[must_use]
    pub fn as_sentinel(self) -> i64 {
        i64::try_from(self.0.get()).map_or(i64::MIN, |value| -value)
    }
}

impl fmt::Display for TemporaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tmp-{}", self.0)
    }
}

/// Comment shown before the server acknowledged its creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeculativeComment {
    temporary_id: TemporaryId,
    post_id: PostId,
    author: String,
    content: String,
}

impl SpeculativeComment {
    pub(crate) fn new(temporary_id: TemporaryId, post_id: PostId, draft: CommentDraft) -> Self {
        let CommentDraft { author, content } = draft;
        Self {
            temporary_id,
            post_id,
            author,
            content,
        }
    }

    /// Correlation token linking the placeholder to its create request.
    pub fn temporary_id(&self) -> TemporaryId {
        self.temporary_id
    }

    /// Post the comment is being added to.
    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    /// Author name the comment was submitted under.
    pub fn author(&self) -> &str {
        self.author.as_str()
    }

    /// Submitted body.
    pub fn content(&self) -> &str {
        self.content.as_str()
    }

    /// Always `false`; speculative entries are unconfirmed until promoted.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        false
    }
}
