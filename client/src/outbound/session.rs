//! In-process session holder.
//!
//! Hosts that complete the hosted-login redirect themselves store the issued
//! id token here; the identity claim extractor reads it back through the
//! [`SessionProvider`] port.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{SessionProvider, SessionProviderError};
use crate::domain::{AuthSession, IdToken, IdTokenError};

/// Session provider keeping the current session in memory.
#[derive(Debug, Default)]
pub struct InMemorySessionProvider {
    session: Mutex<Option<AuthSession>>,
}

impl InMemorySessionProvider {
    /// Replace the current session.
    pub fn sign_in(&self, session: AuthSession) {
        if let Ok(mut current) = self.session.lock() {
            *current = Some(session);
        }
    }

    /// Decode `raw` as a compact JWT and store it as the session's id token.
    ///
    /// # Errors
    ///
    /// Returns an error when the token's payload cannot be decoded; the
    /// current session is left untouched in that case.
    pub fn sign_in_with_id_token(&self, raw: &str) -> Result<(), IdTokenError> {
        let token = IdToken::from_jwt(raw)?;
        self.sign_in(AuthSession::with_id_token(token));
        info!("session stored from id token");
        Ok(())
    }

    /// Forget the current session.
    pub fn sign_out(&self) {
        if let Ok(mut current) = self.session.lock() {
            current.take();
        }
    }
}

#[async_trait]
impl SessionProvider for InMemorySessionProvider {
    async fn fetch_session(&self) -> Result<Option<AuthSession>, SessionProviderError> {
        self.session
            .lock()
            .map(|current| current.clone())
            .map_err(|_| SessionProviderError::unavailable("session state poisoned"))
    }
}
