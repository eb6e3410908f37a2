//! Cancellation helpers shared by every suspension point in the domain.
//!
//! Remote calls race a [`CancellationToken`]; callers map [`Cancelled`] into
//! a domain error with [`Cancelled::into_error`].

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::Error;

/// Marker returned when the token fired before the future finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl Cancelled {
    /// Convert into a `cancelled` domain error naming the interrupted work.
    pub fn into_error(self, operation: &str) -> Error {
        Error::cancelled(format!("{operation} was cancelled"))
    }
}

/// Race a future against a cancellation token.
#[async_trait]
pub trait OrCancelExt: Sized {
    /// Output of the wrapped future.
    type Output;

    /// Resolve to `Err(Cancelled)` as soon as `token` fires.
    ///
    /// A token that is already cancelled wins even if the future is ready.
    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, Cancelled>;
}

#[async_trait]
impl<F> OrCancelExt for F
where
    F: Future + Send,
    F::Output: Send,
{
    type Output = F::Output;

    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, Cancelled> {
        tokio::select! {
            biased;
            () = token.cancelled() => Err(Cancelled),
            output = self => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let token = CancellationToken::new();
        assert_eq!(async { 7 }.or_cancel(&token).await, Ok(7));
    }

    #[rstest]
    #[tokio::test]
    async fn pre_cancelled_token_wins_over_ready_future() {
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(async { 7 }.or_cancel(&token).await, Err(Cancelled));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_pending_future() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel();
        });

        let result = tokio::time::sleep(Duration::from_secs(60))
            .or_cancel(&token)
            .await;
        assert_eq!(result, Err(Cancelled));
    }

    #[rstest]
    fn cancelled_maps_to_domain_error() {
        let error = Cancelled.into_error("thread load");
        assert_eq!(error.code(), ErrorCode::Cancelled);
        assert_eq!(error.message(), "thread load was cancelled");
    }
}
