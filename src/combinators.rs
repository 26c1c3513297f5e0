use crate::{event_loop, Deferred};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};
use tracing::trace;

impl<T: Clone + 'static, E: Clone + 'static> Deferred<T, E> {
    /// Waits for every input to fulfill.
    ///
    /// The result holds the values in input order, whatever order the inputs
    /// settled in. The first rejection rejects the result with its reason.
    /// An empty input fulfills with an empty `Vec` on the next turn.
    ///
    /// `all` takes the listener slot of every pending input. A continuation
    /// that was already waiting on one of them is replaced and never runs;
    /// attach further continuations to the returned value instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use promised::{event_loop, Deferred, State};
    ///
    /// let (slow, finish, _) = Deferred::<i32, ()>::with_resolvers();
    /// let all = Deferred::all([slow, Deferred::resolve(2), Deferred::resolve(3)]);
    /// event_loop::run_until_idle();
    /// assert!(all.is_pending());
    ///
    /// finish(1);
    /// assert_eq!(all.state(), State::Fulfilled(vec![1, 2, 3]));
    /// ```
    pub fn all<I>(items: I) -> Deferred<Vec<T>, E>
    where
        I: IntoIterator<Item = Deferred<T, E>>,
    {
        let items: Vec<_> = items.into_iter().collect();
        Deferred::<Vec<T>, E>::new(move |resolve, reject| {
            if items.is_empty() {
                event_loop::defer(move || resolve(Vec::new()));
                return;
            }
            trace!(inputs = items.len(), "waiting on all inputs");
            let slots = Rc::new(RefCell::new(vec![None::<T>; items.len()]));
            let remaining = Rc::new(Cell::new(items.len()));
            // A value listed twice gets one listener that fills all its slots.
            let mut groups: Vec<(&Deferred<T, E>, Vec<usize>)> = Vec::new();
            for (index, item) in items.iter().enumerate() {
                match groups.iter_mut().find(|(seen, _)| seen.same_as(item)) {
                    Some((_, indices)) => indices.push(index),
                    None => groups.push((item, vec![index])),
                }
            }
            for (item, indices) in groups {
                let (slots, remaining, resolve, reject) =
                    (slots.clone(), remaining.clone(), resolve.clone(), reject.clone());
                item.subscribe(
                    move |value| {
                        {
                            let mut slots = slots.borrow_mut();
                            for &index in &indices {
                                slots[index] = Some(value.clone());
                            }
                        }
                        remaining.set(remaining.get() - indices.len());
                        if remaining.get() == 0 {
                            let values: Vec<T> =
                                slots.borrow_mut().drain(..).flatten().collect();
                            resolve(values);
                        }
                    },
                    move |reason| reject(reason),
                );
            }
        })
    }
}
