//! "Who is posting": the session's email resolved to an application user.

use tokio_util::sync::CancellationToken;

use super::cancellation::OrCancelExt;
use super::{Error, IdentityClaimExtractor, User, UserResolver};

/// Composes claim extraction and user resolution behind one call.
#[derive(Clone)]
pub struct CurrentUserService {
    claims: IdentityClaimExtractor,
    resolver: UserResolver,
}

impl CurrentUserService {
    /// Build the service from its two collaborators.
    pub fn new(claims: IdentityClaimExtractor, resolver: UserResolver) -> Self {
        Self { claims, resolver }
    }

    /// Resolve the signed-in user.
    ///
    /// Identity failures are returned as-is and the user directory is never
    /// queried. Both steps race `cancel`.
    pub async fn current_user(&self, cancel: &CancellationToken) -> Result<User, Error> {
        let email = self
            .claims
            .current_email()
            .or_cancel(cancel)
            .await
            .map_err(|cancelled| cancelled.into_error("identity lookup"))??;
        self.resolver
            .resolve_user(&email)
            .or_cancel(cancel)
            .await
            .map_err(|cancelled| cancelled.into_error("user resolution"))?
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{
        FixtureUserDirectory, MockSessionProvider, MockUserDirectory, SessionProviderError,
    };
    use crate::test_support::sessions::{StaticSessionProvider, session_with_claims};
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Arc;

    fn untouched_directory() -> MockUserDirectory {
        let mut directory = MockUserDirectory::new();
        directory.expect_find_by_email().never();
        directory.expect_create_user().never();
        directory
    }

    #[rstest]
    #[tokio::test]
    async fn session_failure_never_reaches_the_directory() {
        let mut sessions = MockSessionProvider::new();
        sessions
            .expect_fetch_session()
            .return_once(|| Err(SessionProviderError::unavailable("offline")));
        let service = CurrentUserService::new(
            IdentityClaimExtractor::new(Arc::new(sessions)),
            UserResolver::new(Arc::new(untouched_directory())),
        );

        let error = service
            .current_user(&CancellationToken::new())
            .await
            .expect_err("not signed in");
        assert_eq!(error.code(), ErrorCode::NotAuthenticated);
    }

    #[rstest]
    #[tokio::test]
    async fn missing_claim_never_reaches_the_directory() {
        let session = session_with_claims(&json!({"sub": "abc"}));
        let service = CurrentUserService::new(
            IdentityClaimExtractor::new(Arc::new(StaticSessionProvider::new(Some(session)))),
            UserResolver::new(Arc::new(untouched_directory())),
        );

        let error = service
            .current_user(&CancellationToken::new())
            .await
            .expect_err("no email");
        assert_eq!(error.code(), ErrorCode::ClaimMissing);
    }

    #[rstest]
    #[tokio::test]
    async fn first_contact_provisions_the_user() {
        let session = session_with_claims(&json!({"email": "a@b.com"}));
        let directory = Arc::new(FixtureUserDirectory::default());
        let service = CurrentUserService::new(
            IdentityClaimExtractor::new(Arc::new(StaticSessionProvider::new(Some(session)))),
            UserResolver::new(directory.clone()),
        );

        let user = service
            .current_user(&CancellationToken::new())
            .await
            .expect("resolved");
        assert_eq!(user.email().as_ref(), "a@b.com");
        assert_eq!(directory.users(), vec![user]);
    }

    #[rstest]
    #[tokio::test]
    async fn cancelled_token_stops_the_flow() {
        let session = session_with_claims(&json!({"email": "a@b.com"}));
        let service = CurrentUserService::new(
            IdentityClaimExtractor::new(Arc::new(StaticSessionProvider::new(Some(session)))),
            UserResolver::new(Arc::new(untouched_directory())),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = service.current_user(&cancel).await.expect_err("cancelled");
        assert_eq!(error.code(), ErrorCode::Cancelled);
    }
}
