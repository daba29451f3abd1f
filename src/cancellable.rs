//! The cancellation-aware settlement cell.
//!
//! Unlike [`Promise`](crate::Promise), cancellation is a terminal state of its
//! own rather than a flavour of rejection:
//!
//! ```text
//! Pending -- resolve --> Resolved(T)
//! Pending -- reject  --> Rejected(E)
//! Pending -- cancel  --> Cancelled     (fires the cancel handler once)
//! ```
//!
//! Every transition out of `Pending` is final; later settlement calls are
//! silent no-ops. The cell also carries an optional cancel handler, run
//! exactly once when a `cancel()` is accepted, and an opaque timer token for
//! drivers that need to tie the cell back to a scheduled timeout.

use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use crate::{Reason, Settle};

/// Callback run when a pending cell is cancelled.
type CancelHandler = Box<dyn FnOnce() + Send>;

/// A shared, single-settlement promise cell with first-class cancellation.
///
/// Clones share one cell; the first settlement wins. Awaiting a handle yields
/// `Ok(value)` on resolution and `Err(reason)` on rejection or cancellation.
///
/// # Examples
///
/// ```
/// use promise_cell::{CancellablePromise, Settle};
///
/// let promise = CancellablePromise::<i32, String>::new();
/// promise.set_cancel_handler(|| println!("timer torn down"));
/// promise.cancel();
///
/// assert!(promise.is_cancelled());
/// assert!(!promise.is_rejected());
/// ```
pub struct CancellablePromise<T, E> {
    cell: Arc<Mutex<Inner<T, E>>>,
}

enum State<T, E> {
    Pending,
    Resolved(T),
    Rejected(E),
    Cancelled,
}

impl<T, E> State<T, E> {
    fn tag(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved(_) => "resolved",
            Self::Rejected(_) => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

struct Inner<T, E> {
    state: State<T, E>,
    on_cancel: Option<CancelHandler>,
    timer_id: Option<String>,
    wakers: Vec<Waker>,
}

impl<T, E> CancellablePromise<T, E> {
    /// Creates a fresh pending promise with no cancel handler and no timer
    /// token.
    pub fn new() -> Self {
        Self {
            cell: Arc::new(Mutex::new(Inner {
                state: State::Pending,
                on_cancel: None,
                timer_id: None,
                wakers: Vec::new(),
            })),
        }
    }

    /// Creates a promise and runs `init` against it synchronously.
    ///
    /// An `Err` returned by the initializer is routed into `reject`.
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

    /// Registers the handler to run when a `cancel()` is accepted.
    ///
    /// The last registration wins; an earlier handler is discarded unrun.
    /// Registering after the cell has settled keeps the handler but it can
    /// never fire.
    pub fn set_cancel_handler<F>(&self, handler: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // The displaced handler must drop outside the lock in case it owns a
        // clone of this promise.
        let _previous = self.cell.lock().unwrap().on_cancel.replace(Box::new(handler));
    }

    /// Records an opaque timer token for this cell.
    ///
    /// The token is driver bookkeeping; the cell only stores it. Setting it
    /// again overwrites the previous token, and an empty string is a valid
    /// token.
    pub fn set_timer_id(&self, id: impl Into<String>) {
        let id = id.into();
        tracing::trace!(timer_id = %id, "timer token recorded");
        self.cell.lock().unwrap().timer_id = Some(id);
    }

    /// Returns the recorded timer token, if any.
    pub fn timer_id(&self) -> Option<String> {
        self.cell.lock().unwrap().timer_id.clone()
    }

    /// Commits `next` if the cell is still pending. Returns the cancel
    /// handler slot and the parked wakers, or `None` when the settlement lost
    /// the race. Both must be handled by the caller after the lock is
    /// released.
    fn settle(&self, next: State<T, E>) -> Option<(Option<CancelHandler>, Vec<Waker>)> {
        let mut cell = self.cell.lock().unwrap();
        if !matches!(cell.state, State::Pending) {
            tracing::trace!(
                state = cell.state.tag(),
                "settlement ignored; promise already settled"
            );
            return None;
        }
        tracing::trace!(state = next.tag(), "promise settled");
        cell.state = next;
        Some((cell.on_cancel.take(), mem::take(&mut cell.wakers)))
    }
}

impl<T, E> Settle for CancellablePromise<T, E> {
    type Output = T;
    type Error = E;

    fn resolve(&self, value: T) {
        if let Some((_stale_handler, wakers)) = self.settle(State::Resolved(value)) {
            for waker in wakers {
                waker.wake();
            }
        }
    }

    fn reject(&self, reason: E) {
        if let Some((_stale_handler, wakers)) = self.settle(State::Rejected(reason)) {
            for waker in wakers {
                waker.wake();
            }
        }
    }

    /// Moves the cell to `Cancelled` and runs the registered cancel handler.
    ///
    /// The handler runs after the state change and outside the cell lock, so
    /// it may inspect this promise or even call `cancel()` again; repeat
    /// calls find the cell settled and do nothing.
    fn cancel(&self) {
        if let Some((handler, wakers)) = self.settle(State::Cancelled) {
            if let Some(handler) = handler {
                tracing::trace!("running cancellation handler");
                handler();
            }
            for waker in wakers {
                waker.wake();
            }
        }
    }

    fn is_pending(&self) -> bool {
        matches!(self.cell.lock().unwrap().state, State::Pending)
    }

    fn is_resolved(&self) -> bool {
        matches!(self.cell.lock().unwrap().state, State::Resolved(_))
    }

    /// True only for a collaborator rejection; a cancelled cell is not
    /// rejected here.
    fn is_rejected(&self) -> bool {
        matches!(self.cell.lock().unwrap().state, State::Rejected(_))
    }

    fn is_cancelled(&self) -> bool {
        matches!(self.cell.lock().unwrap().state, State::Cancelled)
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
            State::Rejected(reason) => Some(Reason::Rejected(reason.clone())),
            State::Cancelled => Some(Reason::Cancelled),
            _ => None,
        }
    }
}

impl<T, E> Clone for CancellablePromise<T, E> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T, E> Default for CancellablePromise<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for CancellablePromise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = self.cell.lock().unwrap();
        f.debug_struct("CancellablePromise")
            .field("state", &cell.state.tag())
            .field("has_cancel_handler", &cell.on_cancel.is_some())
            .field("timer_id", &cell.timer_id)
            .finish()
    }
}

impl<T: Clone, E: Clone> Future for CancellablePromise<T, E> {
    type Output = Result<T, Reason<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut cell = self.cell.lock().unwrap();
        match &cell.state {
            State::Resolved(value) => Poll::Ready(Ok(value.clone())),
            State::Rejected(reason) => Poll::Ready(Err(Reason::Rejected(reason.clone()))),
            State::Cancelled => Poll::Ready(Err(Reason::Cancelled)),
            State::Pending => {
                cell.wakers.push(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
