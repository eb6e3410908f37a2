//! Driven port for the remote user store.
//!
//! Adapters translate the remote "no user with this email" answer into
//! [`UserDirectoryError::NotFound`]; the resolver never inspects transport
//! payloads itself.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{EmailAddress, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user directory adapters.
    pub enum UserDirectoryError {
        /// No user is registered for the email.
        NotFound {
            /// Email address that had no match.
            email: String,
        } => "no user registered for {email}",
        /// The request never produced an HTTP response.
        Transport {
            /// Detail reported by the underlying client or server.
            message: String,
        } => "user directory transport failed: {message}",
        /// The request exceeded the configured timeout.
        Timeout {
            /// Detail reported by the underlying client or server.
            message: String,
        } => "user directory request timed out: {message}",
        /// The server answered with a non-success status.
        Rejected {
            /// HTTP status code returned by the server.
            status: u16,
            /// Detail reported by the underlying client or server.
            message: String,
        } => "user directory rejected the request with status {status}: {message}",
        /// The response body could not be decoded.
        Decode {
            /// Detail reported by the underlying client or server.
            message: String,
        } => "user directory response could not be decoded: {message}",
    }
}

/// Port for looking up and provisioning application users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Return every user registered for `email`.
    ///
    /// Adapters may answer a miss either with an empty list or with
    /// [`UserDirectoryError::NotFound`].
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Vec<User>, UserDirectoryError>;

    /// Create a user for `email` and return the stored record.
    async fn create_user(&self, email: &EmailAddress) -> Result<User, UserDirectoryError>;
}

/// In-memory directory that reports misses as `NotFound`, like the HTTP API.
///
/// Creation does not enforce email uniqueness; counting duplicates is what
/// makes it useful for exercising the resolver's de-duplication.
#[derive(Debug, Default)]
pub struct FixtureUserDirectory {
    users: Mutex<Vec<User>>,
}

impl FixtureUserDirectory {
    /// Users created so far, in creation order.
    pub fn users(&self) -> Vec<User> {
        self.users
            .lock()
            .map(|users| users.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl UserDirectory for FixtureUserDirectory {
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Vec<User>, UserDirectoryError> {
        let users = self
            .users
            .lock()
            .map_err(|_| UserDirectoryError::transport("fixture user state poisoned"))?;
        let matches: Vec<User> = users
            .iter()
            .filter(|user| user.email() == email)
            .cloned()
            .collect();
        if matches.is_empty() {
            return Err(UserDirectoryError::not_found(email.as_ref()));
        }
        Ok(matches)
    }

    async fn create_user(&self, email: &EmailAddress) -> Result<User, UserDirectoryError> {
        let mut users = self
            .users
            .lock()
            .map_err(|_| UserDirectoryError::transport("fixture user state poisoned"))?;
        let next = i64::try_from(users.len())
            .map_err(|err| UserDirectoryError::decode(err.to_string()))?
            .saturating_add(1);
        let id = UserId::new(next).map_err(|err| UserDirectoryError::decode(err.to_string()))?;
        let user = User::new(id, email.clone());
        users.push(user.clone());
        Ok(user)
    }
}
