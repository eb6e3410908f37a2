//! Builders for port adapters and the domain services composed over them.
//!
//! [`ClientPorts`] selects the adapter set (HTTP against the configured
//! backend, or in-memory fixtures); [`ClientServices`] composes the comment
//! store, thread loader, user resolution flow, and identity provider builder
//! from whichever set it is given.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::ClientSettings;
use crate::domain::ports::{
    CommentApi, FixtureCommentApi, FixtureIdentityConfigSource, FixtureUserDirectory,
    IdentityConfigSource, SessionProvider, UserDirectory,
};
use crate::domain::{
    CurrentUserService, DeployedIdentityConfig, Error, IdentityClaimExtractor, IdentityProvider,
    IdentityProviderBuilder, OptimisticCommentStore, ThreadLoader, UserResolver,
};
use crate::outbound::http::{
    ApiClient, HttpCommentApi, HttpIdentityConfigSource, HttpUserDirectory,
};

/// Adapter set backing the domain services.
#[derive(Clone)]
pub struct ClientPorts {
    /// Remote comment endpoints.
    pub comments: Arc<dyn CommentApi>,
    /// Remote user directory.
    pub users: Arc<dyn UserDirectory>,
    /// Source of the signed-in session.
    pub sessions: Arc<dyn SessionProvider>,
    /// Source of the deployed identity configuration.
    pub identity_config: Arc<dyn IdentityConfigSource>,
}

impl ClientPorts {
    /// Build reqwest-backed adapters sharing one client for the configured
    /// backend.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::ErrorCode::Misconfigured`] when the base URL
    /// is invalid or the HTTP client cannot be constructed.
    pub fn http(
        settings: &ClientSettings,
        sessions: Arc<dyn SessionProvider>,
    ) -> Result<Self, Error> {
        let client = ApiClient::new(settings.api_base_url()?, settings.request_timeout())
            .map_err(|err| Error::misconfigured(format!("failed to build API client: {err}")))?;
        Ok(Self {
            comments: Arc::new(HttpCommentApi::new(client.clone())),
            users: Arc::new(HttpUserDirectory::new(client.clone())),
            sessions,
            identity_config: Arc::new(HttpIdentityConfigSource::new(client)),
        })
    }

    /// Build in-memory adapters for demos and tests without a backend.
    pub fn fixtures(sessions: Arc<dyn SessionProvider>, identity: DeployedIdentityConfig) -> Self {
        Self {
            comments: Arc::new(FixtureCommentApi::default()),
            users: Arc::new(FixtureUserDirectory::default()),
            sessions,
            identity_config: Arc::new(FixtureIdentityConfigSource::new(identity)),
        }
    }
}

/// Domain services composed over one adapter set.
#[derive(Clone)]
pub struct ClientServices {
    loader: ThreadLoader,
    current_user: CurrentUserService,
    identity: IdentityProviderBuilder,
    identity_config: Arc<dyn IdentityConfigSource>,
}

impl ClientServices {
    /// Compose the services; hosted login redirects to `redirect_url`.
    pub fn new(ports: ClientPorts, redirect_url: Url) -> Self {
        let store = OptimisticCommentStore::new(ports.comments);
        let claims = IdentityClaimExtractor::new(ports.sessions);
        let resolver = UserResolver::new(ports.users);
        Self {
            loader: ThreadLoader::new(store),
            current_user: CurrentUserService::new(claims, resolver),
            identity: IdentityProviderBuilder::new(redirect_url),
            identity_config: ports.identity_config,
        }
    }

    /// Compose HTTP-backed services from settings.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::ErrorCode::Misconfigured`] when a configured
    /// URL is invalid or the HTTP client cannot be built.
    pub fn from_settings(
        settings: &ClientSettings,
        sessions: Arc<dyn SessionProvider>,
    ) -> Result<Self, Error> {
        let ports = ClientPorts::http(settings, sessions)?;
        Ok(Self::new(ports, settings.redirect_url()?))
    }

    /// Thread loader driving the comment store.
    pub fn loader(&self) -> &ThreadLoader {
        &self.loader
    }

    /// Comment store for the displayed thread.
    pub fn store(&self) -> &OptimisticCommentStore {
        self.loader.store()
    }

    /// "Who is posting" flow.
    pub fn current_user(&self) -> &CurrentUserService {
        &self.current_user
    }

    /// Finish hosted-login setup against the deployed identity configuration.
    ///
    /// # Errors
    ///
    /// Propagates the builder's `load_failed`, `misconfigured`, or
    /// `cancelled` errors.
    pub async fn identity_provider(
        &self,
        cancel: &CancellationToken,
    ) -> Result<IdentityProvider, Error> {
        self.identity
            .clone()
            .finalize(self.identity_config.as_ref(), cancel)
            .await
    }

    /// Cancel outstanding work and stop accepting new store operations.
    pub fn shutdown(&self) {
        self.store().close();
    }
}

#[cfg(test)]
mod tests {
    //! Composition checks over the fixture adapter set.

    use super::*;
    use crate::domain::{CommentDraft, ErrorCode, PostId, ShowOutcome};
    use crate::test_support::sessions::{StaticSessionProvider, session_with_claims};
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn identity() -> DeployedIdentityConfig {
        DeployedIdentityConfig {
            user_pool_id: "pool".into(),
            user_pool_client_id: "client".into(),
            cognito_domain: "https://auth.example.com".into(),
            callback_urls: vec!["http://localhost:3000/user".into()],
        }
    }

    fn services(identity: DeployedIdentityConfig, redirect: &str) -> ClientServices {
        let sessions = Arc::new(StaticSessionProvider::new(Some(session_with_claims(
            &json!({"email": "ada@example.com"}),
        ))));
        ClientServices::new(
            ClientPorts::fixtures(sessions, identity),
            Url::parse(redirect).expect("redirect url"),
        )
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_services_post_and_resolve(identity: DeployedIdentityConfig) {
        let services = services(identity, "http://localhost:3000/user");
        let post = PostId::new(1).expect("post id");

        let shown = services.loader().show(post).await.expect("show");
        assert!(matches!(shown, ShowOutcome::Loaded(_)));

        let user = services
            .current_user()
            .current_user(&CancellationToken::new())
            .await
            .expect("user resolves");
        assert_eq!(user.email().as_ref(), "ada@example.com");

        let draft = CommentDraft::try_new(user.email().as_ref(), "hello").expect("draft");
        services
            .store()
            .submit_create(draft)
            .await
            .expect("create confirmed");
        let view = services.store().view();
        assert_eq!(view.len(), 1);
        assert!(view.entries().iter().all(|entry| entry.is_confirmed()));
    }

    #[rstest]
    #[tokio::test]
    async fn identity_provider_uses_the_configured_redirect(identity: DeployedIdentityConfig) {
        let services = services(identity, "http://localhost:3000/user");
        let provider = services
            .identity_provider(&CancellationToken::new())
            .await
            .expect("provider");
        assert_eq!(provider.domain(), "auth.example.com");
    }

    #[rstest]
    #[tokio::test]
    async fn unregistered_redirect_is_misconfigured(identity: DeployedIdentityConfig) {
        let services = services(identity, "https://elsewhere.example.com/");
        let err = services
            .identity_provider(&CancellationToken::new())
            .await
            .expect_err("redirect is not registered");
        assert_eq!(err.code(), ErrorCode::Misconfigured);
    }

    #[rstest]
    #[tokio::test]
    async fn shutdown_closes_the_store(identity: DeployedIdentityConfig) {
        let services = services(identity, "http://localhost:3000/user");
        services.shutdown();
        assert!(services.store().is_closed());
    }
}
