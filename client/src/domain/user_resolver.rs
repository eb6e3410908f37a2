//! Get-or-create resolution of application users by email.
//!
//! Concurrent resolutions of the same email share one in-flight request, so
//! two callers racing on a brand-new user produce a single create. The entry
//! is dropped as soon as a caller observes the result, or once every waiting
//! call has gone away; nothing is cached beyond the calls that were waiting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tracing::{debug, info};

use crate::domain::ports::{UserDirectory, UserDirectoryError};
use crate::domain::{EmailAddress, Error, User};

type InFlight = Shared<BoxFuture<'static, Result<User, Error>>>;
type InFlightMap = Arc<Mutex<HashMap<EmailAddress, Resolution>>>;

/// Shared request plus the number of calls currently awaiting it.
struct Resolution {
    request: InFlight,
    waiters: usize,
}

/// Resolves an email to a user record, provisioning one on first contact.
#[derive(Clone)]
pub struct UserResolver {
    directory: Arc<dyn UserDirectory>,
    in_flight: InFlightMap,
}

impl UserResolver {
    /// Build a resolver over a user directory.
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            directory,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Return the user registered for `email`, creating one when absent.
    ///
    /// The first match wins when several users share the email. Lookup and
    /// provisioning failures surface as `resolution_failed`. Dropping the
    /// returned future withdraws this call; the shared request is abandoned
    /// once no call is left waiting on it.
    pub async fn resolve_user(&self, email: &EmailAddress) -> Result<User, Error> {
        let waiter = self.join_or_start(email)?;
        let result = waiter.request.clone().await;
        waiter.settle();
        result
    }

    fn join_or_start(&self, email: &EmailAddress) -> Result<Waiter, Error> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| Error::internal("user resolver state poisoned"))?;
        let entry = in_flight.entry(email.clone()).or_insert_with(|| {
            let directory = Arc::clone(&self.directory);
            let key = email.clone();
            Resolution {
                request: async move { lookup_or_create(directory.as_ref(), &key).await }
                    .boxed()
                    .shared(),
                waiters: 0,
            }
        });
        if entry.waiters > 0 {
            debug!(%email, "joining in-flight user resolution");
        }
        entry.waiters += 1;
        let request = entry.request.clone();
        Ok(Waiter {
            in_flight: Arc::clone(&self.in_flight),
            email: email.clone(),
            request,
        })
    }
}

/// One call's claim on a shared request; withdraws the claim on drop.
struct Waiter {
    in_flight: InFlightMap,
    email: EmailAddress,
    request: InFlight,
}

impl Waiter {
    /// Forget the request now that its result has been observed.
    fn settle(&self) {
        let Ok(mut in_flight) = self.in_flight.lock() else {
            return;
        };
        if in_flight
            .get(&self.email)
            .is_some_and(|current| current.request.ptr_eq(&self.request))
        {
            in_flight.remove(&self.email);
        }
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        let Ok(mut in_flight) = self.in_flight.lock() else {
            return;
        };
        let Some(entry) = in_flight.get_mut(&self.email) else {
            return;
        };
        if !entry.request.ptr_eq(&self.request) {
            return;
        }
        entry.waiters = entry.waiters.saturating_sub(1);
        if entry.waiters == 0 {
            debug!(email = %self.email, "abandoning user resolution with no waiters");
            in_flight.remove(&self.email);
        }
    }
}

async fn lookup_or_create(
    directory: &dyn UserDirectory,
    email: &EmailAddress,
) -> Result<User, Error> {
    let found = match directory.find_by_email(email).await {
        Ok(users) => users.into_iter().next(),
        Err(UserDirectoryError::NotFound { .. }) => None,
        Err(err) => {
            return Err(Error::resolution_failed(format!(
                "user lookup for {email} failed: {err}"
            )));
        }
    };
    if let Some(user) = found {
        debug!(%email, user_id = %user.id(), "resolved existing user");
        return Ok(user);
    }

    info!(%email, "no user registered for email; provisioning one");
    let user = directory.create_user(email).await.map_err(|err| {
        Error::resolution_failed(format!("user provisioning for {email} failed: {err}"))
    })?;
    info!(%email, user_id = %user.id(), "user provisioned");
    Ok(user)
}
