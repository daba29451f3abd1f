//! Single-settlement promise cells with cooperative cancellation.
//!
//! A cell starts out pending and is settled at most once: the first call to
//! `resolve`, `reject`, or `cancel` wins, and every later settlement attempt
//! is silently ignored. Two variants share the [`Settle`] contract and differ
//! only in what cancellation *means*:
//!
//! - [`Promise`] folds cancellation into rejection: after `cancel()` the cell
//!   reads as rejected with the synthesized reason, and a separate flag
//!   remembers that cancellation is what rejected it.
//! - [`CancellablePromise`] keeps `Cancelled` as its own terminal state,
//!   sibling to `Rejected`, and adds a one-shot cancellation handler plus an
//!   opaque timer token so an external driver can tear down whatever pending
//!   operation the cell was waiting on.
//!
//! Handles are cheap clones of one shared cell; any clone may settle, observe,
//! or await it.
//!
//! # Examples
//!
//! ```
//! use promise_cell::{CancellablePromise, Settle};
//!
//! let promise = CancellablePromise::<String, String>::new();
//! promise.set_timer_id("timer-3");
//! promise.set_cancel_handler(|| {
//!     // the driver would clear timer-3 here
//! });
//!
//! promise.cancel();
//! assert!(promise.is_cancelled());
//! assert!(!promise.is_rejected());
//! assert_eq!(promise.reason().unwrap().to_string(), "Promise cancelled");
//! ```

pub mod cancellable;
pub mod promise;

pub use cancellable::CancellablePromise;
pub use promise::Promise;

use thiserror::Error;

/// Why a promise failed to produce a value.
///
/// There are exactly two failure shapes: a rejection carrying whatever reason
/// a collaborator supplied, and the fixed reason synthesized when a pending
/// promise is cancelled. The cancelled reason displays as `Promise cancelled`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Reason<E> {
    /// A collaborator rejected the promise.
    #[error("{0}")]
    Rejected(E),
    /// The promise was cancelled before it settled.
    #[error("Promise cancelled")]
    Cancelled,
}

impl<E> Reason<E> {
    /// True if this is the synthesized cancellation reason.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The collaborator-supplied rejection reason, if there is one.
    pub fn rejected(&self) -> Option<&E> {
        match self {
            Self::Rejected(reason) => Some(reason),
            Self::Cancelled => None,
        }
    }
}

/// The settlement contract shared by every promise variant.
///
/// A cell is settled by the first of `resolve`/`reject`/`cancel` to find it
/// pending; the rest are no-ops, never errors. Misuse such as double-resolve
/// or resolving after cancellation is deliberately absorbed: collaborators
/// race to settle, and losing the race is not a fault.
pub trait Settle {
    /// The success value stored on resolution.
    type Output;
    /// The collaborator-supplied rejection reason.
    type Error;

    /// Settles the promise with a success value. No-op unless pending.
    fn resolve(&self, value: Self::Output);

    /// Settles the promise with a failure reason. No-op unless pending.
    fn reject(&self, reason: Self::Error);

    /// Cancels the promise. No-op unless pending.
    ///
    /// What cancellation means is variant policy: [`Promise`] records it as a
    /// rejection with [`Reason::Cancelled`], while [`CancellablePromise`]
    /// moves to its own `Cancelled` state and runs the registered handler.
    fn cancel(&self);

    /// True while no settlement has been accepted.
    fn is_pending(&self) -> bool;
    /// True once resolved with a value.
    fn is_resolved(&self) -> bool;
    /// True once rejected. Variants disagree on whether cancellation counts.
    fn is_rejected(&self) -> bool;
    /// True once cancellation has been accepted.
    fn is_cancelled(&self) -> bool;

    /// A copy of the resolved value, or `None` while absent.
    fn value(&self) -> Option<Self::Output>
    where
        Self::Output: Clone;

    /// A copy of the failure reason, or `None` while absent.
    fn reason(&self) -> Option<Reason<Self::Error>>
    where
        Self::Error: Clone;
}
