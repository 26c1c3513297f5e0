use futures::executor::block_on;
use promised::{event_loop, Deferred, Error, State};
use proptest::prelude::*;
use std::{cell::RefCell, rc::Rc};

#[test]
fn test_settle_once() {
    let deferred = Deferred::<&'static str, &'static str>::new(|resolve, reject| {
        resolve("first");
        resolve("second");
        reject("too late");
    });
    assert_eq!(deferred.state(), State::Fulfilled("first"));
}

#[test]
fn test_static_resolve_is_asynchronous() {
    let deferred = Deferred::<i32, ()>::resolve(7);
    assert_eq!(deferred.state(), State::Pending);
    assert!(event_loop::turn());
    assert_eq!(deferred.state(), State::Fulfilled(7));
}

#[test]
fn test_static_reject_is_asynchronous() {
    let deferred = Deferred::<(), &'static str>::reject("no");
    assert!(deferred.is_pending());
    event_loop::run_until_idle();
    assert_eq!(deferred.outcome(), Some(Err("no")));
}

#[test]
fn test_then_chains_fulfillment() {
    let next = Deferred::<i32, ()>::resolve(1).then(|x| x + 1, |_| 0);
    assert_eq!(block_on(next.settled()), Ok(Ok(2)));
}

#[test]
fn test_then_runs_rejection_handler() {
    let fulfilled_ran = Rc::new(RefCell::new(false));
    let flag = fulfilled_ran.clone();
    let next = Deferred::<i32, String>::reject("bad input".into()).then(
        move |x| {
            *flag.borrow_mut() = true;
            x
        },
        |e| e.len() as i32,
    );
    assert_eq!(block_on(next.settled()), Ok(Ok(9)));
    assert!(!*fulfilled_ran.borrow());
}

#[test]
fn test_try_then_rejects_on_err() {
    let next = Deferred::<i32, String>::resolve(5).try_then(
        |x| if x > 3 { Err(format!("{x} is too big")) } else { Ok(x) },
        Err,
    );
    assert_eq!(block_on(next.settled()), Ok(Err("5 is too big".to_string())));

    let rethrown = Deferred::<i32, String>::reject("io".into()).try_then(Ok, |e| Err(e + "!"));
    assert_eq!(block_on(rethrown.settled()), Ok(Err("io!".to_string())));
}

#[test]
fn test_rejection_skips_map_and_reaches_catch() {
    let mapped = Rc::new(RefCell::new(0));
    let counter = mapped.clone();
    let recovered = Deferred::<i32, i32>::reject(-1)
        .map(move |x| {
            *counter.borrow_mut() += 1;
            x * 2
        })
        .catch(|e| e * 100);
    assert_eq!(block_on(recovered.settled()), Ok(Ok(-100)));
    assert_eq!(*mapped.borrow(), 0);
}

#[test]
fn test_catch_passes_fulfillment_through() {
    let value = Deferred::<i32, i32>::resolve(4).catch(|_| 0);
    assert_eq!(block_on(value.settled()), Ok(Ok(4)));
}

#[test]
fn test_and_then_follows_returned_value() {
    let followed = Deferred::<i32, String>::resolve(2).and_then(|x| {
        Deferred::<i32, String>::new(move |resolve, _| event_loop::defer(move || resolve(x * 21)))
    });
    assert_eq!(block_on(followed.settled()), Ok(Ok(42)));

    let failed = Deferred::<i32, String>::resolve(2)
        .and_then(|_| Deferred::<i32, String>::reject("inner".into()));
    assert_eq!(block_on(failed.settled()), Ok(Err("inner".to_string())));
}

#[test]
fn test_then_on_settled_value_still_runs() {
    let source = Deferred::<i32, ()>::resolve(3);
    event_loop::run_until_idle();
    assert_eq!(source.state(), State::Fulfilled(3));

    let late = source.map(|x| x * 3);
    assert!(late.is_pending());
    event_loop::run_until_idle();
    assert_eq!(late.state(), State::Fulfilled(9));
}

#[test]
fn test_continuations_run_after_current_stack() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    let _done =
        Deferred::<(), ()>::resolve(()).map(move |_| sink.borrow_mut().push("continuation"));
    log.borrow_mut().push("synchronous");
    event_loop::run_until_idle();
    assert_eq!(*log.borrow(), vec!["synchronous", "continuation"]);
}

#[test]
fn test_chain_of_then() {
    let result = Deferred::<i32, String>::resolve(34)
        .then(|_| "Hola Mundo".to_string(), |err| err)
        .map(|s| format!("{s}!"));
    assert_eq!(block_on(result.settled()), Ok(Ok("Hola Mundo!".to_string())));
}

#[test]
fn test_all_preserves_input_order() {
    let (first, resolve_first, _) = Deferred::<i32, ()>::with_resolvers();
    let all = Deferred::all(vec![first, Deferred::resolve(2), Deferred::resolve(3)]);
    event_loop::defer(move || resolve_first(1));
    assert_eq!(block_on(all.settled()), Ok(Ok(vec![1, 2, 3])));
}

#[test]
fn test_all_empty() {
    let all = Deferred::<i32, ()>::all(Vec::new());
    assert_eq!(all.state(), State::Pending);
    assert_eq!(block_on(all.settled()), Ok(Ok(vec![])));
}

#[test]
fn test_all_rejection() {
    let all = Deferred::all([
        Deferred::<i32, &'static str>::resolve(1),
        Deferred::reject("second failed"),
    ]);
    assert_eq!(block_on(all.settled()), Ok(Err("second failed")));
}

#[test]
fn test_missing_executor() {
    let result = Deferred::<i32, ()>::from_executor(None);
    assert_eq!(
        result.map(|_| ()),
        Err(Error::InvalidArgument("an executor function is required"))
    );
    assert_eq!(event_loop::pending(), 0);
}

#[test]
fn test_pending_forever_stalls() {
    let (source, _resolve, _reject) = Deferred::<i32, ()>::with_resolvers();
    let mapped = source.map(|x| x + 1);
    assert_eq!(block_on(mapped.settled()), Err(Error::Stalled));
}

#[derive(Debug, Clone)]
enum Call {
    Resolve(u8),
    Reject(u8),
}

fn call() -> impl Strategy<Value = Call> {
    prop_oneof![any::<u8>().prop_map(Call::Resolve), any::<u8>().prop_map(Call::Reject)]
}

proptest! {
    #[test]
    fn prop_only_first_settlement_counts(calls in prop::collection::vec(call(), 1..16)) {
        let (deferred, resolve, reject) = Deferred::<u8, u8>::with_resolvers();
        for call in &calls {
            match *call {
                Call::Resolve(v) => resolve(v),
                Call::Reject(e) => reject(e),
            }
        }
        let expected = match calls[0] {
            Call::Resolve(v) => State::Fulfilled(v),
            Call::Reject(e) => State::Rejected(e),
        };
        prop_assert_eq!(deferred.state(), expected);
    }

    #[test]
    fn prop_all_keeps_input_order(order in Just((0..8usize).collect::<Vec<_>>()).prop_shuffle()) {
        let mut inputs = Vec::new();
        let mut resolvers = Vec::new();
        for _ in 0..order.len() {
            let (deferred, resolve, _) = Deferred::<usize, ()>::with_resolvers();
            inputs.push(deferred);
            resolvers.push(resolve);
        }
        let all = Deferred::all(inputs);
        for &index in &order {
            let resolve = resolvers[index].clone();
            event_loop::defer(move || resolve(index * 10));
        }
        event_loop::run_until_idle();
        prop_assert_eq!(all.state(), State::Fulfilled((0..8).map(|i| i * 10).collect::<Vec<_>>()));
    }
}
