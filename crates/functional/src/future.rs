//! Completion handle for map operations
//!
//! Every map operation returns an [`EvalFuture`] immediately while the
//! function runs on a worker thread. The handle can be awaited from any
//! async runtime or joined from synchronous code.
//!
//! Dropping the handle does not cancel the work.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use cachet_core::{Error, Result};

/// Pending result of a map operation
#[must_use = "the operation runs regardless, but its outcome is only observable through the future"]
pub struct EvalFuture<R> {
    rx: oneshot::Receiver<Result<R>>,
}

/// Producer side of an [`EvalFuture`]
pub(crate) struct Completer<R> {
    tx: oneshot::Sender<Result<R>>,
}

impl<R> Completer<R> {
    /// Complete the paired future. A dropped future is not an error.
    pub(crate) fn complete(self, outcome: Result<R>) {
        let _ = self.tx.send(outcome);
    }
}

impl<R> EvalFuture<R> {
    /// A pending future and the handle that completes it
    pub(crate) fn pending() -> (Completer<R>, EvalFuture<R>) {
        let (tx, rx) = oneshot::channel();
        (Completer { tx }, EvalFuture { rx })
    }

    /// A future that is already complete
    pub fn ready(outcome: Result<R>) -> EvalFuture<R> {
        let (completer, future) = Self::pending();
        completer.complete(outcome);
        future
    }

    /// Block the calling thread until the operation completes.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime; await the future
    /// there instead. Must not be called from a map's own worker thread
    /// while that map's pool is saturated.
    pub fn join(self) -> Result<R> {
        self.rx.blocking_recv().unwrap_or(Err(Error::Cancelled))
    }
}

impl<R> Future for EvalFuture<R> {
    type Output = Result<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(Error::Cancelled)))
    }
}

impl<R> std::fmt::Debug for EvalFuture<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalFuture").finish_non_exhaustive()
    }
}
