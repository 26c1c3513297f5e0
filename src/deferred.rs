use crate::{
    event_loop,
    registry::{Event, Listener, Registry},
    settled::Settled,
    Error,
};
use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};
use tracing::{debug, trace, warn};

/// Settles a [`Deferred`] as fulfilled. Only the first settlement call counts.
pub type Resolve<T> = Rc<dyn Fn(T)>;
/// Settles a [`Deferred`] as rejected. Only the first settlement call counts.
pub type Reject<E> = Rc<dyn Fn(E)>;
/// A boxed executor, for [`Deferred::from_executor`].
pub type Executor<T, E> = Box<dyn FnOnce(Resolve<T>, Reject<E>)>;

/// Where a deferred value is in its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

/// A value that is not available yet.
///
/// A `Deferred` starts pending and settles at most once, either fulfilled
/// with a `T` or rejected with an `E`. Continuations attached with
/// [`then`](Self::then) and friends run once that happens, and each returns a
/// new `Deferred` for the continuation's result. Cloning a `Deferred` clones
/// the handle, not the value.
///
/// # Examples
///
/// ```
/// use promised::{event_loop, Deferred, State};
///
/// let doubled = Deferred::<i32, String>::resolve(21).map(|v| v * 2);
/// assert!(doubled.is_pending());
/// event_loop::run_until_idle();
/// assert_eq!(doubled.state(), State::Fulfilled(42));
/// ```
pub struct Deferred<T, E> {
    inner: Rc<Inner<T, E>>,
}

struct Inner<T, E> {
    state: RefCell<State<T, E>>,
    registry: Registry<T, E>,
    handled: Cell<bool>,
}

/// What a continuation wants done with the downstream value.
pub(crate) enum Next<U, E> {
    Fulfill(U),
    Reject(E),
    Follow(Deferred<U, E>),
}

impl<U, E> From<Result<U, E>> for Next<U, E> {
    fn from(result: Result<U, E>) -> Self {
        match result {
            Ok(value) => Next::Fulfill(value),
            Err(reason) => Next::Reject(reason),
        }
    }
}

impl<U: Clone + 'static, E: Clone + 'static> Next<U, E> {
    fn settle(self, resolve: &Resolve<U>, reject: &Reject<E>) {
        match self {
            Next::Fulfill(value) => resolve(value),
            Next::Reject(reason) => reject(reason),
            Next::Follow(source) => {
                let (resolve, reject) = (resolve.clone(), reject.clone());
                source.subscribe(move |value| resolve(value), move |reason| reject(reason));
            }
        }
    }
}

impl<T, E> Inner<T, E> {
    fn new() -> Self {
        Self {
            state: RefCell::new(State::Pending),
            registry: Registry::new(),
            handled: Cell::new(false),
        }
    }
}

impl<T: Clone, E: Clone> Inner<T, E> {
    fn settle(&self, outcome: Result<T, E>) {
        let event = Event::of(&outcome);
        {
            let mut state = self.state.borrow_mut();
            if !matches!(*state, State::Pending) {
                debug!(%event, "ignoring settlement of an already settled value");
                return;
            }
            *state = match &outcome {
                Ok(value) => State::Fulfilled(value.clone()),
                Err(reason) => State::Rejected(reason.clone()),
            };
        }
        trace!(%event, "settled");
        if !self.registry.fire(outcome) {
            debug!(%event, "no listener waiting");
        }
        self.registry.clear(event.other());
    }
}

impl<T, E> Drop for Inner<T, E> {
    fn drop(&mut self) {
        if matches!(self.state.get_mut(), State::Rejected(_)) && !self.handled.get() {
            warn!("a rejected value was dropped without any rejection handler");
        }
    }
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("state", &*self.inner.state.borrow())
            .field("registry", &self.inner.registry)
            .finish()
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Deferred<T, E> {
    /// Creates a deferred value and runs `executor` right away with its
    /// settlement handles.
    ///
    /// The executor may settle synchronously or keep the handles and settle
    /// later, e.g. from a task passed to [`event_loop::defer`].
    pub fn new<X>(executor: X) -> Self
    where
        X: FnOnce(Resolve<T>, Reject<E>),
    {
        let (deferred, resolve, reject) = Self::with_resolvers();
        executor(resolve, reject);
        deferred
    }

    /// Like [`Deferred::new`], but an absent executor is an error.
    pub fn from_executor(executor: Option<Executor<T, E>>) -> Result<Self, Error> {
        let executor =
            executor.ok_or(Error::InvalidArgument("an executor function is required"))?;
        Ok(Self::new(executor))
    }

    /// A pending value together with the handles that settle it.
    pub fn with_resolvers() -> (Self, Resolve<T>, Reject<E>) {
        let inner = Rc::new(Inner::new());
        let resolve: Resolve<T> = {
            let inner = inner.clone();
            Rc::new(move |value: T| inner.settle(Ok(value)))
        };
        let reject: Reject<E> = {
            let inner = inner.clone();
            Rc::new(move |reason: E| inner.settle(Err(reason)))
        };
        (Self { inner }, resolve, reject)
    }

    /// A value that fulfills with `value` on the next turn of the event loop.
    pub fn resolve(value: T) -> Self {
        Self::new(move |resolve, _| event_loop::defer(move || resolve(value)))
    }

    /// A value that rejects with `reason` on the next turn of the event loop.
    pub fn reject(reason: E) -> Self {
        Self::new(move |_, reject| event_loop::defer(move || reject(reason)))
    }

    pub fn state(&self) -> State<T, E> {
        self.inner.state.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.inner.state.borrow(), State::Pending)
    }

    /// The settled value, or `None` while pending.
    pub fn outcome(&self) -> Option<Result<T, E>> {
        match self.state() {
            State::Pending => None,
            State::Fulfilled(value) => Some(Ok(value)),
            State::Rejected(reason) => Some(Err(reason)),
        }
    }

    /// Whether both handles refer to the same value.
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A future that drives the event loop until this value settles.
    pub fn settled(&self) -> Settled<T, E> {
        self.inner.handled.set(true);
        Settled::new(self.clone())
    }

    /// Attaches both continuations. The returned value fulfills with whatever
    /// the handler that ran returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use promised::{event_loop, Deferred, State};
    ///
    /// let recovered = Deferred::<i32, String>::reject("nope".into())
    ///     .then(|v| v.to_string(), |e| format!("recovered from {e}"));
    /// event_loop::run_until_idle();
    /// assert_eq!(recovered.state(), State::Fulfilled("recovered from nope".into()));
    /// ```
    pub fn then<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Deferred<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> U + 'static,
        R: FnOnce(E) -> U + 'static,
    {
        self.chain(
            move |value| Next::Fulfill(on_fulfilled(value)),
            move |reason| Next::Fulfill(on_rejected(reason)),
        )
    }

    /// Like [`then`](Self::then), but a handler returning `Err` rejects the
    /// returned value.
    pub fn try_then<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Deferred<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<U, E> + 'static,
        R: FnOnce(E) -> Result<U, E> + 'static,
    {
        self.chain(
            move |value| Next::from(on_fulfilled(value)),
            move |reason| Next::from(on_rejected(reason)),
        )
    }

    /// Transforms the fulfillment value. Rejections pass through untouched.
    pub fn map<U, F>(&self, on_fulfilled: F) -> Deferred<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> U + 'static,
    {
        self.chain(move |value| Next::Fulfill(on_fulfilled(value)), Next::Reject)
    }

    /// Continues with another deferred value; the returned value settles the
    /// way the one produced by `f` does.
    ///
    /// Following takes the listener slot of the value `f` returns. If that
    /// value is still pending, a continuation already waiting on it is
    /// replaced and never runs.
    pub fn and_then<U, F>(&self, f: F) -> Deferred<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Deferred<U, E> + 'static,
    {
        self.chain(move |value| Next::Follow(f(value)), Next::Reject)
    }

    /// Turns a rejection into a fulfillment. Fulfillments pass through.
    pub fn catch<R>(&self, on_rejected: R) -> Deferred<T, E>
    where
        R: FnOnce(E) -> T + 'static,
    {
        self.chain(Next::Fulfill, move |reason| Next::Fulfill(on_rejected(reason)))
    }

    pub(crate) fn chain<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Deferred<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Next<U, E> + 'static,
        R: FnOnce(E) -> Next<U, E> + 'static,
    {
        Deferred::<U, E>::new(|resolve, reject| {
            let (resolve_later, reject_later) = (resolve.clone(), reject.clone());
            self.subscribe(
                move |value| on_fulfilled(value).settle(&resolve, &reject),
                move |reason| on_rejected(reason).settle(&resolve_later, &reject_later),
            );
        })
    }

    /// Hands the eventual outcome to one of two callbacks.
    ///
    /// While pending the callbacks wait in the registry. Once settled the
    /// registry has already fired, so the matching callback is deferred to the
    /// next turn instead.
    pub(crate) fn subscribe<F, R>(&self, on_fulfilled: F, on_rejected: R)
    where
        F: FnOnce(T) + 'static,
        R: FnOnce(E) + 'static,
    {
        self.inner.handled.set(true);
        match self.state() {
            State::Pending => {
                self.inner.registry.register(Listener::resolve(on_fulfilled));
                self.inner.registry.register(Listener::reject(on_rejected));
            }
            State::Fulfilled(value) => event_loop::defer(move || on_fulfilled(value)),
            State::Rejected(reason) => event_loop::defer(move || on_rejected(reason)),
        }
    }
}
