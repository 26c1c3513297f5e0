//! A per-thread FIFO queue of deferred tasks.
//!
//! Tasks handed to [`defer`] never run synchronously; they run when the
//! thread drives the queue with [`turn`], [`run_until_idle`] or
//! [`LoopConfig::run`]. Each thread has its own queue.
use crate::Error;
use std::{cell::RefCell, collections::VecDeque};
use tracing::trace;

type Task = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<VecDeque<Task>> = RefCell::new(VecDeque::new());
}

/// Schedules `task` to run after everything already queued.
pub fn defer(task: impl FnOnce() + 'static) {
    let pending = QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        queue.push_back(Box::new(task));
        queue.len()
    });
    trace!(pending, "deferred a task");
}

/// Number of tasks waiting on this thread.
pub fn pending() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

/// Runs the oldest queued task. Returns `false` if the queue was empty.
pub fn turn() -> bool {
    // The borrow ends before the task runs so it can defer more work.
    let task = QUEUE.with(|queue| queue.borrow_mut().pop_front());
    match task {
        Some(task) => {
            trace!("running a deferred task");
            task();
            true
        }
        None => false,
    }
}

/// Runs tasks until the queue is empty and returns how many ran.
///
/// # Examples
///
/// ```
/// use promised::event_loop;
///
/// event_loop::defer(|| event_loop::defer(|| ()));
/// assert_eq!(event_loop::pending(), 1);
/// assert_eq!(event_loop::run_until_idle(), 2);
/// ```
pub fn run_until_idle() -> usize {
    let mut turns = 0;
    while turn() {
        turns += 1;
    }
    trace!(turns, "event loop idle");
    turns
}

/// Settings for draining the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopConfig {
    max_turns: Option<usize>,
}

impl LoopConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps how many tasks a single [`LoopConfig::run`] may execute.
    pub fn max_turns(mut self, limit: usize) -> Self {
        self.max_turns = Some(limit);
        self
    }

    /// Drains the queue, failing if work remains once the turn budget is spent.
    pub fn run(&self) -> Result<usize, Error> {
        let mut turns = 0;
        loop {
            if self.max_turns.is_some_and(|limit| turns >= limit) && pending() > 0 {
                return Err(Error::TurnBudgetExhausted { turns });
            }
            if !turn() {
                trace!(turns, "event loop idle");
                return Ok(turns);
            }
            turns += 1;
        }
    }
}
