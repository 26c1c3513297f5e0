//! Awaiting a [`Deferred`] from async code.
use crate::{event_loop, Deferred, Error};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

/// Future returned by [`Deferred::settled`].
///
/// Every poll of a still-pending value runs one turn of this thread's event
/// loop. If the value is pending and the loop is idle, nothing left can
/// settle it and the future completes with [`Error::Stalled`].
///
/// # Examples
///
/// ```
/// use promised::Deferred;
/// use futures::executor::block_on;
///
/// let answer = Deferred::<i32, ()>::resolve(41).map(|v| v + 1);
/// assert_eq!(block_on(answer.settled()), Ok(Ok(42)));
/// ```
#[derive(Debug)]
pub struct Settled<T, E> {
    deferred: Deferred<T, E>,
}

impl<T, E> Settled<T, E> {
    pub(crate) fn new(deferred: Deferred<T, E>) -> Self {
        Self { deferred }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Future for Settled<T, E> {
    type Output = Result<Result<T, E>, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.deferred.outcome() {
            return Poll::Ready(Ok(outcome));
        }
        if event_loop::turn() {
            cx.waker().wake_by_ref();
            Poll::Pending
        } else {
            Poll::Ready(Err(Error::Stalled))
        }
    }
}
