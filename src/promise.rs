//! The base settlement cell.
//!
//! Cancellation here is not a state of its own: an accepted `cancel()` rejects
//! the cell with [`Reason::Cancelled`] and raises a separate flag, so the cell
//! reads as *both* rejected and cancelled afterwards. Code that only knows how
//! to handle rejections keeps working; code that cares can ask
//! [`Settle::is_cancelled`].

use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use crate::{Reason, Settle};

/// A shared, single-settlement promise cell.
///
/// Every clone points at the same cell; any clone may settle it, and the
/// first settlement wins. Cloned handles can also be awaited: they resolve
/// to `Ok(value)` or `Err(reason)` once the cell settles.
///
/// # Examples
///
/// ```
/// use promise_cell::{Promise, Settle};
/// use futures::executor::block_on;
/// use std::thread;
///
/// let promise = Promise::<String, String>::new();
/// let waiter = promise.clone();
/// let task = thread::spawn(move || block_on(async { waiter.await }));
///
/// promise.resolve("done".into());
/// assert_eq!(task.join().unwrap(), Ok("done".into()));
/// ```
pub struct Promise<T, E> {
    cell: Arc<Mutex<Inner<T, E>>>,
}

enum State<T, E> {
    Pending,
    Resolved(T),
    Rejected(Reason<E>),
}

impl<T, E> State<T, E> {
    fn tag(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved(_) => "resolved",
            Self::Rejected(_) => "rejected",
        }
    }
}

struct Inner<T, E> {
    state: State<T, E>,
    /// Raised only by an accepted `cancel()`, never inferred from the stored
    /// reason.
    cancelled: bool,
    wakers: Vec<Waker>,
}

impl<T, E> Promise<T, E> {
    /// Creates a fresh pending promise.
    pub fn new() -> Self {
        Self {
            cell: Arc::new(Mutex::new(Inner {
                state: State::Pending,
                cancelled: false,
                wakers: Vec::new(),
            })),
        }
    }

    /// Creates a promise and runs `init` against it synchronously.
    ///
    /// The initializer may settle the promise inline or stash a clone to
    /// settle later. An `Err` returned by the initializer is routed into
    /// `reject`, so construction itself never fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_cell::{Promise, Settle};
    ///
    /// let promise = Promise::<i32, String>::with(|p| {
    ///     p.resolve(7);
    ///     Ok(())
    /// });
    /// assert_eq!(promise.value(), Some(7));
    ///
    /// let failed = Promise::<i32, String>::with(|_| Err("setup failed".into()));
    /// assert!(failed.is_rejected());
    /// ```
    pub fn with<F>(init: F) -> Self
    where
        F: FnOnce(&Self) -> Result<(), E>,
    {
        let promise = Self::new();
        if let Err(reason) = init(&promise) {
            promise.reject(reason);
        }
        promise
    }

    /// Commits `next` if the cell is still pending and returns the wakers to
    /// wake, empty when the settlement lost the race. Wakers must be woken by
    /// the caller, after the lock is released.
    fn settle(&self, next: State<T, E>, via_cancel: bool) -> Vec<Waker> {
        let mut cell = self.cell.lock().unwrap();
        if !matches!(cell.state, State::Pending) {
            tracing::trace!(
                state = cell.state.tag(),
                "settlement ignored; promise already settled"
            );
            return Vec::new();
        }
        tracing::trace!(state = next.tag(), cancelled = via_cancel, "promise settled");
        cell.state = next;
        cell.cancelled = via_cancel;
        mem::take(&mut cell.wakers)
    }
}

impl<T, E> Settle for Promise<T, E> {
    type Output = T;
    type Error = E;

    fn resolve(&self, value: T) {
        for waker in self.settle(State::Resolved(value), false) {
            waker.wake();
        }
    }

    fn reject(&self, reason: E) {
        for waker in self.settle(State::Rejected(Reason::Rejected(reason)), false) {
            waker.wake();
        }
    }

    /// Rejects the cell with [`Reason::Cancelled`] and raises the cancelled
    /// flag. A cell that already settled is left untouched.
    fn cancel(&self) {
        for waker in self.settle(State::Rejected(Reason::Cancelled), true) {
            waker.wake();
        }
    }

    fn is_pending(&self) -> bool {
        matches!(self.cell.lock().unwrap().state, State::Pending)
    }

    fn is_resolved(&self) -> bool {
        matches!(self.cell.lock().unwrap().state, State::Resolved(_))
    }

    fn is_rejected(&self) -> bool {
        matches!(self.cell.lock().unwrap().state, State::Rejected(_))
    }

    fn is_cancelled(&self) -> bool {
        self.cell.lock().unwrap().cancelled
    }

    fn value(&self) -> Option<T>
    where
        T: Clone,
    {
        match &self.cell.lock().unwrap().state {
            State::Resolved(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn reason(&self) -> Option<Reason<E>>
    where
        E: Clone,
    {
        match &self.cell.lock().unwrap().state {
            State::Rejected(reason) => Some(reason.clone()),
            _ => None,
        }
    }
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T, E> Default for Promise<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = self.cell.lock().unwrap();
        f.debug_struct("Promise")
            .field("state", &cell.state.tag())
            .field("cancelled", &cell.cancelled)
            .finish()
    }
}

impl<T: Clone, E: Clone> Future for Promise<T, E> {
    type Output = Result<T, Reason<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut cell = self.cell.lock().unwrap();
        match &cell.state {
            State::Resolved(value) => Poll::Ready(Ok(value.clone())),
            State::Rejected(reason) => Poll::Ready(Err(reason.clone())),
            State::Pending => {
                cell.wakers.push(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
