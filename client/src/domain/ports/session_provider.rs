//! Driven port for the federated identity provider's session store.

use async_trait::async_trait;

use crate::domain::AuthSession;

use super::define_port_error;

define_port_error! {
    /// Errors raised while fetching the current session.
    pub enum SessionProviderError {
        /// The provider could not be queried.
        Unavailable {
            /// Detail reported by the underlying client or server.
            message: String,
        } => "session provider unavailable: {message}",
    }
}

/// Port returning the current authentication session, if any.
///
/// Implementations must not cache on behalf of callers; every call reflects
/// the provider's state at that moment.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Fetch the active session, or `None` when signed out.
    async fn fetch_session(&self) -> Result<Option<AuthSession>, SessionProviderError>;
}
