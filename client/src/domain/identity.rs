//! Authentication sessions and identity claim extraction.
//!
//! A session mirrors what the hosted identity provider hands back:
//! `{ tokens?: { idToken?: { payload } } }`. Only the `email` claim of the id
//! token is consumed here.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::ports::SessionProvider;
use crate::domain::{EmailAddress, Error};

/// Claim holding the user's email in the id token payload.
pub const EMAIL_CLAIM: &str = "email";

/// Errors raised while decoding a raw id token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdTokenError {
    /// The token is not three dot-separated segments.
    Malformed,
    /// The payload segment is not valid base64url.
    Encoding(String),
    /// The payload is not a JSON object.
    Payload(String),
}

impl fmt::Display for IdTokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "id token must have header, payload, and signature"),
            Self::Encoding(message) => write!(f, "id token payload is not base64url: {message}"),
            Self::Payload(message) => write!(f, "id token payload is not a JSON object: {message}"),
        }
    }
}

impl std::error::Error for IdTokenError {}

/// Decoded identity token.
///
/// The signature is not checked here; the identity provider verified the
/// token before handing it over.
#[derive(Clone)]
pub struct IdToken {
    raw: Option<Zeroizing<String>>,
    claims: Map<String, Value>,
}

impl IdToken {
    /// Build a token from an already decoded claim payload.
    pub fn from_claims(claims: Map<String, Value>) -> Self {
        Self { raw: None, claims }
    }

    /// Decode the payload segment of a compact JWT.
    ///
    /// # Examples
    /// ```
    /// use client::domain::IdToken;
    ///
    /// // {"email":"a@b.com"}
    /// let token = IdToken::from_jwt("e30.eyJlbWFpbCI6ImFAYi5jb20ifQ.c2ln").unwrap();
    /// assert_eq!(token.claim("email").and_then(|v| v.as_str()), Some("a@b.com"));
    /// ```
    pub fn from_jwt(raw: &str) -> Result<Self, IdTokenError> {
        let raw = Zeroizing::new(raw.trim().to_owned());
        let mut segments = raw.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(IdTokenError::Malformed);
        };

        let decoded = Zeroizing::new(
            URL_SAFE_NO_PAD
                .decode(payload.trim_end_matches('='))
                .map_err(|err| IdTokenError::Encoding(err.to_string()))?,
        );
        let claims: Map<String, Value> = serde_json::from_slice(&decoded)
            .map_err(|err| IdTokenError::Payload(err.to_string()))?;

        Ok(Self {
            raw: Some(raw),
            claims,
        })
    }

    /// Every decoded claim.
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Look up a single claim.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// The compact JWT this token was decoded from, when known.
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref().map(String::as_str)
    }
}

impl fmt::Debug for IdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdToken")
            .field("raw", &self.raw.as_ref().map(|_| "<redacted>"))
            .field("claims", &self.claims)
            .finish()
    }
}

/// Tokens attached to a session.
#[derive(Debug, Clone, Default)]
pub struct SessionTokens {
    /// OpenID Connect id token, when issued.
    pub id_token: Option<IdToken>,
}

/// Authentication session returned by the identity provider.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    /// Tokens of a signed-in session; `None` when the provider has none.
    pub tokens: Option<SessionTokens>,
}

impl AuthSession {
    /// Session carrying a single id token.
    pub fn with_id_token(id_token: IdToken) -> Self {
        Self {
            tokens: Some(SessionTokens {
                id_token: Some(id_token),
            }),
        }
    }

    /// The id token, if the session has one.
    pub fn id_token(&self) -> Option<&IdToken> {
        self.tokens.as_ref()?.id_token.as_ref()
    }
}

/// Extracts the email claim from the current session.
///
/// No caching: every call asks the provider again.
#[derive(Clone)]
pub struct IdentityClaimExtractor {
    sessions: Arc<dyn SessionProvider>,
}

impl IdentityClaimExtractor {
    /// Build an extractor over a session provider.
    pub fn new(sessions: Arc<dyn SessionProvider>) -> Self {
        Self { sessions }
    }

    /// Fetch the current session.
    ///
    /// Fails with `not_authenticated` when the provider has no session, the
    /// session carries no id token, or the provider cannot be queried.
    pub async fn session(&self) -> Result<AuthSession, Error> {
        let session = self
            .sessions
            .fetch_session()
            .await
            .map_err(|err| Error::not_authenticated(err.to_string()))?
            .ok_or_else(|| Error::not_authenticated("no active session"))?;
        if session.id_token().is_none() {
            return Err(Error::not_authenticated("session has no id token"));
        }
        Ok(session)
    }

    /// Extract the email claim from `session`.
    pub fn email_claim(session: &AuthSession) -> Result<EmailAddress, Error> {
        let token = session
            .id_token()
            .ok_or_else(|| Error::not_authenticated("session has no id token"))?;
        let raw = token
            .claim(EMAIL_CLAIM)
            .ok_or_else(|| Error::claim_missing("email claim not found in id token"))?
            .as_str()
            .ok_or_else(|| Error::claim_missing("email claim is not a string"))?;
        EmailAddress::new(raw)
            .map_err(|err| Error::claim_missing(format!("email claim is unusable: {err}")))
    }

    /// Fetch the session and extract its email claim.
    pub async fn current_email(&self) -> Result<EmailAddress, Error> {
        let session = self.session().await?;
        let email = Self::email_claim(&session)?;
        debug!(%email, "extracted identity claim");
        Ok(email)
    }
}
