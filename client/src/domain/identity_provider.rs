//! Hosted-login configuration for the federated identity provider.
//!
//! Setup happens in two phases. [`IdentityProviderBuilder::new`] captures the
//! local choices synchronously; [`IdentityProviderBuilder::finalize`] fetches
//! the deployed configuration and yields an [`IdentityProvider`] only once
//! everything needed to build login URLs is known. There is no half-configured
//! provider value.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use super::Error;
use super::cancellation::OrCancelExt;
use super::ports::IdentityConfigSource;

/// Federated providers offered on the hosted login page by default.
pub const DEFAULT_PROVIDERS: &[&str] = &["Google"];

/// OAuth scopes requested by default.
pub const DEFAULT_SCOPES: &[&str] = &[
    "phone",
    "email",
    "profile",
    "openid",
    "aws.cognito.signin.user.admin",
];

/// OAuth response type used by the hosted login flow.
pub const RESPONSE_TYPE: &str = "code";

/// Identity configuration published by the deployed backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedIdentityConfig {
    /// User pool identifier.
    pub user_pool_id: String,
    /// App client identifier registered with the pool.
    pub user_pool_client_id: String,
    /// Hosted UI domain, with or without a scheme.
    pub cognito_domain: String,
    /// Redirect URLs registered for the app client.
    pub callback_urls: Vec<String>,
}

/// First, synchronous phase of provider setup.
#[derive(Debug, Clone)]
pub struct IdentityProviderBuilder {
    redirect_url: Url,
    providers: Vec<String>,
    scopes: Vec<String>,
}

impl IdentityProviderBuilder {
    /// Start a builder redirecting back to `redirect_url` after sign-in and
    /// sign-out.
    pub fn new(redirect_url: Url) -> Self {
        Self {
            redirect_url,
            providers: DEFAULT_PROVIDERS.iter().map(|p| (*p).to_owned()).collect(),
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// Replace the federated providers.
    #[must_use]
    pub fn providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = providers.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the requested scopes.
    #[must_use]
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Fetch the deployed configuration and complete setup.
    ///
    /// Fails with `cancelled` when `cancel` fires first, `load_failed` when the
    /// configuration cannot be fetched, and `misconfigured` when the domain is
    /// unusable or the redirect URL is not a registered callback.
    pub async fn finalize(
        self,
        source: &dyn IdentityConfigSource,
        cancel: &CancellationToken,
    ) -> Result<IdentityProvider, Error> {
        let config = source
            .fetch_config()
            .or_cancel(cancel)
            .await
            .map_err(|cancelled| cancelled.into_error("identity provider setup"))?
            .map_err(|err| {
                Error::load_failed(format!("failed to load identity configuration: {err}"))
            })?;

        let domain = strip_scheme(&config.cognito_domain);
        let hosted_ui = Url::parse(&format!("https://{domain}/")).map_err(|err| {
            Error::misconfigured(format!(
                "identity domain `{}` is not usable: {err}",
                config.cognito_domain
            ))
        })?;
        if domain.is_empty() || hosted_ui.host_str().is_none() {
            return Err(Error::misconfigured("identity domain is empty"));
        }

        if !is_registered(&self.redirect_url, &config.callback_urls) {
            warn!(
                redirect = %self.redirect_url,
                registered = config.callback_urls.len(),
                "redirect URL is not a registered callback"
            );
            return Err(Error::misconfigured(format!(
                "redirect URL {} is not a registered callback",
                self.redirect_url
            )));
        }

        debug!(domain, client_id = %config.user_pool_client_id, "identity provider configured");
        Ok(IdentityProvider {
            user_pool_id: config.user_pool_id,
            client_id: config.user_pool_client_id,
            hosted_ui,
            redirect_url: self.redirect_url,
            providers: self.providers,
            scopes: self.scopes,
        })
    }
}

fn strip_scheme(domain: &str) -> &str {
    let trimmed = domain.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/')
}

fn is_registered(redirect: &Url, callbacks: &[String]) -> bool {
    callbacks
        .iter()
        .filter_map(|callback| Url::parse(callback.trim()).ok())
        .any(|callback| &callback == redirect)
}

/// Fully configured hosted-login provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProvider {
    user_pool_id: String,
    client_id: String,
    hosted_ui: Url,
    redirect_url: Url,
    providers: Vec<String>,
    scopes: Vec<String>,
}

impl IdentityProvider {
    /// User pool identifier.
    pub fn user_pool_id(&self) -> &str {
        self.user_pool_id.as_str()
    }

    /// App client identifier.
    pub fn client_id(&self) -> &str {
        self.client_id.as_str()
    }

    /// Hosted UI domain without scheme.
    pub fn domain(&self) -> &str {
        self.hosted_ui.host_str().unwrap_or_default()
    }

    /// Redirect target for sign-in and sign-out.
    pub fn redirect_url(&self) -> &Url {
        &self.redirect_url
    }

    /// Federated providers offered on the login page.
    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    /// Requested OAuth scopes.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Hosted UI authorization URL carrying `state`.
    ///
    /// The first configured provider is preselected when there is one.
    pub fn authorize_url(&self, state: &str) -> Url {
        let mut url = self.hosted_ui.clone();
        url.set_path("oauth2/authorize");
        {
            let mut query = url.query_pairs_mut();
            if let Some(provider) = self.providers.first() {
                query.append_pair("identity_provider", provider);
            }
            query
                .append_pair("client_id", &self.client_id)
                .append_pair("response_type", RESPONSE_TYPE)
                .append_pair("scope", &self.scopes.join(" "))
                .append_pair("redirect_uri", self.redirect_url.as_str())
                .append_pair("state", state);
        }
        url
    }

    /// Hosted UI logout URL returning to the redirect target.
    pub fn logout_url(&self) -> Url {
        let mut url = self.hosted_ui.clone();
        url.set_path("logout");
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("logout_uri", self.redirect_url.as_str());
        url
    }
}
