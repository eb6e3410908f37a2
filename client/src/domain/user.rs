//! Application user model.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Validation errors returned by the user constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// User ids are server-assigned and strictly positive.
    NonPositiveId,
    /// The email was blank once trimmed.
    EmptyEmail,
    /// The email does not look like `local@domain`.
    MalformedEmail,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveId => write!(f, "user id must be a positive integer"),
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::MalformedEmail => write!(f, "email must look like local@domain"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Server-assigned user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct UserId(i64);

impl UserId {
    /// Validate and construct a [`UserId`].
    pub fn new(raw: i64) -> Result<Self, UserValidationError> {
        if raw <= 0 {
            return Err(UserValidationError::NonPositiveId);
        }
        Ok(Self(raw))
    }

    /// Raw integer value as sent on the wire.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for i64 {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<i64> for UserId {
    type Error = UserValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Email address used as the identity claim and the user lookup key.
///
/// Surrounding whitespace is trimmed; the remaining value is compared as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        // Shape check only; the identity provider owns real verification.
        let pattern = r"^[^@\s]+@[^@\s]+$";
        Regex::new(pattern).unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

impl EmailAddress {
    /// Validate and construct an [`EmailAddress`].
    pub fn new(email: impl Into<String>) -> Result<Self, UserValidationError> {
        Self::from_owned(email.into())
    }

    fn from_owned(email: String) -> Result<Self, UserValidationError> {
        let trimmed = email.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        if !email_regex().is_match(trimmed) {
            return Err(UserValidationError::MalformedEmail);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Application user.
///
/// Created lazily on first resolution miss and never updated by this crate.
///
/// # Examples
/// ```
/// use client::domain::{EmailAddress, User, UserId};
///
/// let user = User::new(
///     UserId::new(4).unwrap(),
///     EmailAddress::new("ada@example.com").unwrap(),
/// );
/// assert_eq!(user.email().as_ref(), "ada@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    email: EmailAddress,
}

impl User {
    /// Build a new [`User`] from validated components.
    pub fn new(id: UserId, email: EmailAddress) -> Self {
        Self { id, email }
    }

    /// Fallible constructor from raw wire values.
    pub fn try_from_parts(id: i64, email: impl Into<String>) -> Result<Self, UserValidationError> {
        Ok(Self::new(UserId::new(id)?, EmailAddress::new(email)?))
    }

    /// Server-assigned identifier.
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Email the user was provisioned for.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }
}
