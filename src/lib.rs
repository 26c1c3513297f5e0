//! Single-threaded deferred values.
//!
//! A [`Deferred`] stands for a value that is not available yet. It settles
//! exactly once, fulfilled or rejected, and notifies the continuation attached
//! to it with [`Deferred::then`], [`Deferred::map`], [`Deferred::catch`] and
//! friends. Asynchrony comes from the per-thread task queue in [`event_loop`]:
//! nothing runs concurrently, work is only ever put off until the current call
//! stack is done.
//!
//! Settling a value notifies its continuation in the same call, and that
//! continuation settles the next value down the chain in turn. Resolving the
//! head of a long chain built while it was pending therefore recurses once
//! per link; chains tens of thousands of links deep can exhaust the stack.
//! Chains attached to an already-settled value start on a fresh turn instead.
//!
//! ```
//! use promised::{event_loop, Deferred, State};
//!
//! let greeting = Deferred::<i32, String>::resolve(34)
//!     .then(|_| "Hola Mundo".to_string(), |err| err)
//!     .map(|s| s.len());
//! let both = Deferred::all([Deferred::<i32, ()>::resolve(23), Deferred::resolve(34)]);
//!
//! event_loop::run_until_idle();
//! assert_eq!(greeting.state(), State::Fulfilled(10));
//! assert_eq!(both.state(), State::Fulfilled(vec![23, 34]));
//! ```
mod combinators;
mod deferred;
pub mod event_loop;
pub mod registry;
mod settled;

pub use deferred::{Deferred, Executor, Reject, Resolve, State};
pub use event_loop::LoopConfig;
pub use settled::Settled;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("value is still pending and the event loop is idle")]
    Stalled,
    #[error("event loop still has work after {turns} turns")]
    TurnBudgetExhausted { turns: usize },
}
