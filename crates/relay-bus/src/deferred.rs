//! # Deferred Results
//!
//! A thread-safe, single-shot completion handle. The producing side holds a
//! [`Completer`], the consuming side holds a [`Deferred`] and either attaches
//! observers with [`Deferred::observe`] or awaits it.
//!
//! ```text
//! Completer ──complete(result)──→ [slot] ──→ observer(success | failure)
//!                                   │
//!                                   └──→ waker (if awaited)
//! ```
//!
//! Observers run on whichever thread completes the slot. If the slot is
//! already complete when `observe` is called, they run immediately on the
//! caller's thread. A `Completer` dropped without completing resolves the slot
//! with `E::from(Canceled)`, so exactly one observer fires on every path.

use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use thiserror::Error;

/// The completing side went away without producing a result.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("completion handle dropped before a result was produced")]
pub struct Canceled;

type Observer<T, E> = Box<dyn FnOnce(Result<T, E>) + Send + 'static>;

enum State<T, E> {
    Pending {
        observer: Option<Observer<T, E>>,
        waker: Option<Waker>,
    },
    Done(Result<T, E>),
    Consumed,
}

struct Slot<T, E> {
    state: Mutex<State<T, E>>,
}

impl<T, E> Slot<T, E> {
    fn pending() -> Self {
        Self {
            state: Mutex::new(State::Pending {
                observer: None,
                waker: None,
            }),
        }
    }

    fn resolve(&self, result: Result<T, E>) {
        let mut state = self.state.lock();
        let previous = std::mem::replace(&mut *state, State::Consumed);
        match previous {
            State::Pending {
                observer: Some(observer),
                ..
            } => {
                drop(state);
                observer(result);
            }
            State::Pending {
                observer: None,
                waker,
            } => {
                *state = State::Done(result);
                drop(state);
                if let Some(waker) = waker {
                    waker.wake();
                }
            }
            // Completer is consumed on completion, so a second result cannot arrive.
            previous => *state = previous,
        }
    }
}

/// Creates a linked completer/deferred pair.
pub fn deferred<T, E>() -> (Completer<T, E>, Deferred<T, E>)
where
    E: From<Canceled>,
{
    let slot = Arc::new(Slot::pending());
    (
        Completer {
            slot: Some(Arc::clone(&slot)),
        },
        Deferred { slot },
    )
}

/// Producing half of a deferred result.
pub struct Completer<T, E>
where
    E: From<Canceled>,
{
    slot: Option<Arc<Slot<T, E>>>,
}

impl<T, E> Completer<T, E>
where
    E: From<Canceled>,
{
    /// Complete the deferred result. Consumes the completer.
    pub fn complete(mut self, result: Result<T, E>) {
        if let Some(slot) = self.slot.take() {
            slot.resolve(result);
        }
    }

    /// Complete with a success value.
    pub fn succeed(self, value: T) {
        self.complete(Ok(value));
    }

    /// Complete with a failure.
    pub fn fail(self, error: E) {
        self.complete(Err(error));
    }
}

impl<T, E> Drop for Completer<T, E>
where
    E: From<Canceled>,
{
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.resolve(Err(E::from(Canceled)));
        }
    }
}

impl<T, E> fmt::Debug for Completer<T, E>
where
    E: From<Canceled>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("completed", &self.slot.is_none())
            .finish()
    }
}

/// Consuming half of a deferred result.
pub struct Deferred<T, E> {
    slot: Arc<Slot<T, E>>,
}

impl<T, E> Deferred<T, E> {
    /// A deferred result that is already complete.
    pub fn ready(result: Result<T, E>) -> Self {
        Self {
            slot: Arc::new(Slot {
                state: Mutex::new(State::Done(result)),
            }),
        }
    }

    /// Whether a result is already available.
    pub fn is_complete(&self) -> bool {
        matches!(*self.slot.state.lock(), State::Done(_))
    }
}

impl<T, E> Deferred<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Attach success and failure observers. Exactly one of them runs, once.
    pub fn observe<S, F>(self, on_success: S, on_failure: F)
    where
        S: FnOnce(T) + Send + 'static,
        F: FnOnce(E) + Send + 'static,
    {
        self.on_complete(move |result| match result {
            Ok(value) => on_success(value),
            Err(error) => on_failure(error),
        });
    }

    /// Attach a single observer receiving the whole result.
    pub fn on_complete<O>(self, observer: O)
    where
        O: FnOnce(Result<T, E>) + Send + 'static,
    {
        let mut state = self.slot.state.lock();
        let previous = std::mem::replace(&mut *state, State::Consumed);
        match previous {
            State::Done(result) => {
                drop(state);
                observer(result);
            }
            State::Pending { waker, .. } => {
                *state = State::Pending {
                    observer: Some(Box::new(observer)),
                    waker,
                };
            }
            State::Consumed => {}
        }
    }
}

impl<T, E> Future for Deferred<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.slot.state.lock();
        let previous = std::mem::replace(&mut *state, State::Consumed);
        match previous {
            State::Done(result) => Poll::Ready(result),
            State::Pending { observer, .. } => {
                *state = State::Pending {
                    observer,
                    waker: Some(cx.waker().clone()),
                };
                Poll::Pending
            }
            State::Consumed => panic!("Deferred polled after completion"),
        }
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("complete", &self.is_complete())
            .finish()
    }
}
