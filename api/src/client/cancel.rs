//! Cooperative cancellation of in-flight calls.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{ApiError, ClientError};

/// Cancels every call it was passed to.
///
/// Clones share state: cancelling any clone cancels them all. Cancelling
/// aborts the HTTP exchange, a pending backoff sleep and stream decoding;
/// the call returns [`ClientError::Cancelled`].
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Completes once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // the sender lives as long as `self`, so this only returns once set
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

/// Runs `work` unless `token` is cancelled first.
pub(crate) async fn run_cancellable<T, F>(token: Option<&CancelToken>, work: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    let Some(token) = token else {
        return work.await;
    };
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ClientError::Cancelled.into()),
        result = work => result,
    }
}
