#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use promise_cell::{CancellablePromise, Promise, Reason, Settle};
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::{thread, time::Duration};

    #[test]
    fn test_resolve_from_another_thread() {
        let promise = CancellablePromise::<i32, String>::default();
        let promise_clone = promise.clone();

        thread::spawn(move || {
            thread::sleep(Duration::from_millis(1000));
            promise_clone.resolve(42);
        });

        let result = block_on(promise).unwrap();
        assert_eq!(result, 42);
    }

    #[test]
    fn test_cancel_from_another_thread_wakes_the_waiter() {
        let promise = Promise::<i32, String>::default();
        let promise_clone = promise.clone();

        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            promise_clone.cancel();
        });

        assert_eq!(block_on(promise), Err(Reason::Cancelled));
    }

    #[derive(Clone, Copy, Debug)]
    enum Op {
        Resolve,
        Reject,
        Cancel,
    }

    const OPS: [Op; 3] = [Op::Resolve, Op::Reject, Op::Cancel];

    fn apply<P>(promise: &P, op: Op)
    where
        P: Settle<Output = i32, Error = String>,
    {
        match op {
            Op::Resolve => promise.resolve(7),
            Op::Reject => promise.reject("boom".into()),
            Op::Cancel => promise.cancel(),
        }
    }

    fn snapshot<P>(promise: &P) -> (bool, bool, bool, bool, Option<i32>, Option<Reason<String>>)
    where
        P: Settle<Output = i32, Error = String>,
    {
        (
            promise.is_pending(),
            promise.is_resolved(),
            promise.is_rejected(),
            promise.is_cancelled(),
            promise.value(),
            promise.reason(),
        )
    }

    /// Whatever settles first freezes every observable; the two calls after
    /// it must change nothing.
    fn assert_first_settlement_wins<P, F>(make: F)
    where
        P: Settle<Output = i32, Error = String>,
        F: Fn() -> P,
    {
        for first in OPS {
            for second in OPS {
                for third in OPS {
                    let promise = make();
                    apply(&promise, first);
                    let frozen = snapshot(&promise);

                    apply(&promise, second);
                    assert_eq!(snapshot(&promise), frozen, "{first:?} then {second:?}");

                    apply(&promise, third);
                    assert_eq!(
                        snapshot(&promise),
                        frozen,
                        "{first:?} then {second:?} then {third:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_first_settlement_wins_for_promise() {
        assert_first_settlement_wins(Promise::<i32, String>::new);
    }

    #[test]
    fn test_first_settlement_wins_for_cancellable_promise() {
        assert_first_settlement_wins(CancellablePromise::<i32, String>::new);
    }

    #[test]
    fn test_cancel_tears_down_a_registered_timer() {
        // A driver parks a timeout under a token, hands the token to the
        // promise, and relies on the cancel handler to clear the timer.
        let timers: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
        timers.lock().unwrap().insert("timer-7".into());

        let promise = CancellablePromise::<i32, String>::new();
        promise.set_timer_id("timer-7");

        let registry = Arc::clone(&timers);
        let handle = promise.clone();
        promise.set_cancel_handler(move || {
            if let Some(id) = handle.timer_id() {
                registry.lock().unwrap().remove(&id);
            }
        });

        promise.cancel();
        assert!(timers.lock().unwrap().is_empty());
        assert!(promise.is_cancelled());
    }

    #[test]
    fn test_resolve_leaves_the_timer_registered() {
        let timers: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
        timers.lock().unwrap().insert("timer-8".into());

        let promise = CancellablePromise::<i32, String>::new();
        promise.set_timer_id("timer-8");

        let registry = Arc::clone(&timers);
        let handle = promise.clone();
        promise.set_cancel_handler(move || {
            if let Some(id) = handle.timer_id() {
                registry.lock().unwrap().remove(&id);
            }
        });

        promise.resolve(3);
        promise.cancel();
        assert_eq!(timers.lock().unwrap().len(), 1);
        assert_eq!(promise.value(), Some(3));
    }
}
