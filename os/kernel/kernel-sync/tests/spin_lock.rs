use kernel_sync::{ArrivalCounter, SpinLock};
use std::sync::{Arc, Barrier};
use std::{panic, thread};

#[test]
fn basic_lock_and_raii() {
    let l = SpinLock::new(0_u32);

    {
        let mut g = l.lock();
        *g = 41;
        assert!(l.is_locked());
    }
    assert!(!l.is_locked());

    let mut g = l.lock();
    *g += 1;
    assert_eq!(*g, 42);
}

#[test]
fn try_lock_fails_while_held() {
    let l = SpinLock::new(1u8);

    let g1 = l.try_lock();
    assert!(g1.is_some());
    assert!(l.try_lock().is_none());

    drop(g1);
    assert!(l.try_lock().is_some());
}

#[test]
fn with_lock_returns_closure_result() {
    let l = SpinLock::new(vec![1, 2]);
    let len = l.with_lock(|v| {
        v.push(3);
        v.len()
    });
    assert_eq!(len, 3);
    assert_eq!(l.into_inner(), vec![1, 2, 3]);
}

#[test]
fn guard_released_on_panic() {
    let l = Arc::new(SpinLock::new(0u32));
    let l2 = Arc::clone(&l);

    let res = panic::catch_unwind(panic::AssertUnwindSafe(move || {
        let _g = l2.lock();
        panic!("boom");
    }));
    assert!(res.is_err());

    // The guard's Drop ran during unwinding.
    assert!(l.try_lock().is_some());
}

#[test]
fn contended_increments_are_not_lost() {
    const THREADS: usize = 8;
    const ITERS: usize = 10_000;

    let l = Arc::new(SpinLock::new(0usize));
    let start = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let l = Arc::clone(&l);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for _ in 0..ITERS {
                    *l.lock() += 1;
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*l.lock(), THREADS * ITERS);
}

#[test]
fn arrival_counter_releases_waiter_after_all_arrive() {
    const PARTICIPANTS: u32 = 6;

    let counter = Arc::new(ArrivalCounter::new());
    let handles: Vec<_> = (0..PARTICIPANTS)
        .map(|_| {
            let counter = Arc::clone(&counter);
            thread::spawn(move || counter.arrive())
        })
        .collect();

    counter.wait_for(PARTICIPANTS);
    assert_eq!(counter.arrived(), PARTICIPANTS);

    let mut tickets: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    tickets.sort_unstable();
    assert_eq!(tickets, (1..=PARTICIPANTS).collect::<Vec<_>>());
}
