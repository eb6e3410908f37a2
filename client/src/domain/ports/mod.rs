//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Every remote collaborator of the comment client sits behind one of these
//! traits. Adapters in `crate::outbound` implement them over HTTP; the
//! `Fixture*` implementations serve demos and tests.

mod macros;
pub(crate) use macros::define_port_error;

mod comment_api;
mod identity_config_source;
mod session_provider;
mod user_directory;

#[cfg(test)]
pub use comment_api::MockCommentApi;
pub use comment_api::{CommentApi, CommentApiError, CreateCommentRequest, FixtureCommentApi};
#[cfg(test)]
pub use identity_config_source::MockIdentityConfigSource;
pub use identity_config_source::{
    FixtureIdentityConfigSource, IdentityConfigSource, IdentityConfigSourceError,
};
#[cfg(test)]
pub use session_provider::MockSessionProvider;
pub use session_provider::{SessionProvider, SessionProviderError};
#[cfg(test)]
pub use user_directory::MockUserDirectory;
pub use user_directory::{FixtureUserDirectory, UserDirectory, UserDirectoryError};
