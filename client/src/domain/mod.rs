//! Domain primitives, services, and ports.
//!
//! Purpose: hold everything the comment client decides on its own. Remote
//! collaborators are reached only through the traits in [`ports`]; adapters
//! live in `crate::outbound`.
//!
//! Public surface:
//! - Error (alias to `error::Error`): transport-agnostic failure payload.
//! - Comment, CommentDraft, SpeculativeComment: thread data model.
//! - OptimisticCommentStore, ThreadLoader: the optimistic thread.
//! - IdentityClaimExtractor, UserResolver, CurrentUserService: who is posting.
//! - IdentityProviderBuilder: hosted-login setup.

pub(crate) mod cancellation;
pub mod comment;
pub mod current_user;
pub mod error;
pub mod identity;
pub mod identity_provider;
pub mod ports;
pub mod thread;
pub mod user;
pub mod user_resolver;

pub use self::cancellation::Cancelled;
pub use self::comment::{
    Comment, CommentDraft, CommentId, CommentValidationError, PostId, SpeculativeComment,
    TemporaryId,
};
pub use self::current_user::CurrentUserService;
pub use self::error::{DomainError, Error, ErrorCode, ErrorValidationError};
pub use self::identity::{AuthSession, IdToken, IdTokenError, IdentityClaimExtractor, SessionTokens};
pub use self::identity_provider::{
    DeployedIdentityConfig, IdentityProvider, IdentityProviderBuilder,
};
pub use self::thread::{
    LoadOutcome, MutationKind, OptimisticCommentStore, ShowOutcome, ThreadEvent, ThreadLoader,
    ThreadView, ViewEntry,
};
pub use self::user::{EmailAddress, User, UserId, UserValidationError};
pub use self::user_resolver::UserResolver;

