//! Single-shot notification slots.
//!
//! A [`Registry`] holds at most one waiting callback per [`Event`]. Firing an
//! event hands the value to that callback once and empties the slot, so a
//! second fire is a no-op. Nothing is buffered: a fire with no listener drops
//! the value.
use std::{cell::RefCell, fmt};
use tracing::debug;

/// The two notifications a deferred value can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Resolve,
    Reject,
}

impl Event {
    /// The event an outcome is delivered under.
    pub fn of<T, E>(outcome: &Result<T, E>) -> Self {
        match outcome {
            Ok(_) => Event::Resolve,
            Err(_) => Event::Reject,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Event::Resolve => Event::Reject,
            Event::Reject => Event::Resolve,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Resolve => f.write_str("resolve"),
            Event::Reject => f.write_str("reject"),
        }
    }
}

/// A callback tagged with the event it listens for.
pub enum Listener<T, E> {
    Resolve(Box<dyn FnOnce(T)>),
    Reject(Box<dyn FnOnce(E)>),
}

impl<T, E> Listener<T, E> {
    pub fn resolve(callback: impl FnOnce(T) + 'static) -> Self {
        Listener::Resolve(Box::new(callback))
    }

    pub fn reject(callback: impl FnOnce(E) + 'static) -> Self {
        Listener::Reject(Box::new(callback))
    }

    pub fn event(&self) -> Event {
        match self {
            Listener::Resolve(_) => Event::Resolve,
            Listener::Reject(_) => Event::Reject,
        }
    }
}

impl<T, E> fmt::Debug for Listener<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener").field(&self.event()).finish()
    }
}

/// One optional callback per event.
///
/// # Examples
///
/// ```
/// use promised::registry::{Listener, Registry};
/// use std::{cell::Cell, rc::Rc};
///
/// let seen = Rc::new(Cell::new(0));
/// let registry = Registry::<i32, ()>::new();
/// let sink = seen.clone();
/// registry.register(Listener::resolve(move |v| sink.set(v)));
/// assert!(registry.fire(Ok(7)));
/// assert!(!registry.fire(Ok(8)));
/// assert_eq!(seen.get(), 7);
/// ```
pub struct Registry<T, E> {
    resolve: RefCell<Option<Box<dyn FnOnce(T)>>>,
    reject: RefCell<Option<Box<dyn FnOnce(E)>>>,
}

impl<T, E> Default for Registry<T, E> {
    fn default() -> Self {
        Self {
            resolve: RefCell::new(None),
            reject: RefCell::new(None),
        }
    }
}

impl<T, E> Registry<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `listener` in its event's slot, replacing whatever waited there.
    pub fn register(&self, listener: Listener<T, E>) {
        let event = listener.event();
        let replaced = match listener {
            Listener::Resolve(callback) => self.resolve.replace(Some(callback)).is_some(),
            Listener::Reject(callback) => self.reject.replace(Some(callback)).is_some(),
        };
        if replaced {
            debug!(%event, "replaced a waiting listener");
        }
    }

    /// Delivers `outcome` to the listener of its event and empties the slot.
    ///
    /// The slot is emptied before the callback runs, so the callback may use
    /// this registry again. Returns whether a callback ran.
    pub fn fire(&self, outcome: Result<T, E>) -> bool {
        match outcome {
            Ok(value) => {
                let callback = self.resolve.take();
                callback.map(|callback| callback(value)).is_some()
            }
            Err(reason) => {
                let callback = self.reject.take();
                callback.map(|callback| callback(reason)).is_some()
            }
        }
    }

    pub fn clear(&self, event: Event) {
        match event {
            Event::Resolve => drop(self.resolve.take()),
            Event::Reject => drop(self.reject.take()),
        }
    }

    pub fn is_registered(&self, event: Event) -> bool {
        match event {
            Event::Resolve => self.resolve.borrow().is_some(),
            Event::Reject => self.reject.borrow().is_some(),
        }
    }
}

impl<T, E> fmt::Debug for Registry<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("resolve", &self.is_registered(Event::Resolve))
            .field("reject", &self.is_registered(Event::Reject))
            .finish()
    }
}
