//! Concurrency tests for the event bus and service registry.
//!
//! Tests cover:
//! - Subscribers racing a publisher always see well-formed snapshots
//! - Pruning a topic never loses a concurrent subscription
//! - `clear_all` racing subscribers leaves consistent tables
//! - Listeners publishing from many threads at once do not deadlock
//! - Racing registrations admit exactly one provider

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use wordsort_backbone::{EventBus, Listener, ServiceRegistry};
use wordsort_shared::{MultiplierChanged, TotalScoreChanged, TotalWordCards, WordCompleted};

const THREADS: usize = 8;
const PER_THREAD: usize = 50;

#[test]
fn test_subscribers_racing_publisher() {
    let bus = EventBus::new();
    let deliveries = Arc::new(AtomicUsize::new(0));
    let malformed = Arc::new(AtomicBool::new(false));
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..PER_THREAD {
                    let deliveries = Arc::clone(&deliveries);
                    let malformed = Arc::clone(&malformed);
                    bus.subscribe(Listener::new(move |evt: &TotalScoreChanged| {
                        if evt.total_score < 0 {
                            malformed.store(true, Ordering::SeqCst);
                        }
                        deliveries.fetch_add(1, Ordering::SeqCst);
                    }));
                }
            });
        }

        s.spawn(|| {
            let mut score = 0;
            while !done.load(Ordering::SeqCst) {
                let report = bus.dispatch(&TotalScoreChanged { total_score: score });
                assert!(report.is_clean());
                assert_eq!(report.delivered(), report.attempted());
                assert!(report.attempted() <= THREADS * PER_THREAD);
                score += 1;
                if bus.listener_count::<TotalScoreChanged>() == THREADS * PER_THREAD {
                    done.store(true, Ordering::SeqCst);
                }
            }
        });
    });

    assert!(!malformed.load(Ordering::SeqCst));
    assert_eq!(
        bus.listener_count::<TotalScoreChanged>(),
        THREADS * PER_THREAD
    );

    let before = deliveries.load(Ordering::SeqCst);
    let report = bus.dispatch(&TotalScoreChanged { total_score: 1 });
    assert_eq!(report.delivered(), THREADS * PER_THREAD);
    assert_eq!(
        deliveries.load(Ordering::SeqCst) - before,
        THREADS * PER_THREAD
    );
}

#[test]
fn test_pruning_never_loses_concurrent_subscription() {
    let bus = EventBus::new();
    let barrier = Barrier::new(THREADS * 2);

    thread::scope(|s| {
        // churners empty the topic over and over, forcing prunes
        for _ in 0..THREADS {
            s.spawn(|| {
                barrier.wait();
                for _ in 0..PER_THREAD {
                    let listener = bus.subscribe_fn(|_: &WordCompleted| {});
                    assert!(bus.unsubscribe(&listener));
                }
            });
        }
        // keepers subscribe once each and never leave
        for _ in 0..THREADS {
            s.spawn(|| {
                barrier.wait();
                for _ in 0..PER_THREAD {
                    bus.subscribe_fn(|_: &WordCompleted| {});
                    thread::yield_now();
                }
            });
        }
    });

    assert_eq!(bus.listener_count::<WordCompleted>(), THREADS * PER_THREAD);
    assert_eq!(bus.topic_count(), 1);
    assert_eq!(
        bus.dispatch(&WordCompleted).delivered(),
        THREADS * PER_THREAD
    );
}

#[test]
fn test_clear_all_racing_subscribers() {
    let bus = EventBus::new();
    let barrier = Barrier::new(THREADS + 1);

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                barrier.wait();
                for i in 0..PER_THREAD {
                    if i % 2 == 0 {
                        bus.subscribe_fn(|_: &MultiplierChanged| {});
                    } else {
                        bus.subscribe_fn(|_: &TotalWordCards| {});
                    }
                }
            });
        }
        s.spawn(|| {
            barrier.wait();
            for _ in 0..PER_THREAD {
                bus.clear_all();
                thread::yield_now();
            }
        });
    });

    // whatever survived is reachable and counted exactly once
    let multipliers = bus.listener_count::<MultiplierChanged>();
    let cards = bus.listener_count::<TotalWordCards>();
    assert_eq!(bus.total_listener_count(), multipliers + cards);
    assert_eq!(
        bus.dispatch(&MultiplierChanged { multiplier: 2.0 }).attempted(),
        multipliers
    );
    assert_eq!(
        bus.dispatch(&TotalWordCards { count: 12 }).attempted(),
        cards
    );

    // a subscription made after the last clear is always kept
    bus.clear_all();
    bus.subscribe_fn(|_: &MultiplierChanged| {});
    assert_eq!(bus.total_listener_count(), 1);
}

#[test]
fn test_reentrant_publish_from_many_threads() {
    let bus = Arc::new(EventBus::new());
    let scores = Arc::new(AtomicU32::new(0));

    let bus_clone = Arc::clone(&bus);
    bus.subscribe_fn(move |_: &WordCompleted| {
        bus_clone.publish(&TotalScoreChanged { total_score: 10 });
    });
    let scores_clone = Arc::clone(&scores);
    bus.subscribe_fn(move |_: &TotalScoreChanged| {
        scores_clone.fetch_add(1, Ordering::SeqCst);
    });

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..PER_THREAD {
                    bus.publish(&WordCompleted);
                }
            });
        }
    });

    assert_eq!(
        scores.load(Ordering::SeqCst) as usize,
        THREADS * PER_THREAD
    );
    assert_eq!(bus.stats().published as usize, THREADS * PER_THREAD * 2);
}

#[test]
fn test_racing_registrations_admit_one_provider() {
    #[derive(Debug)]
    struct WordBank {
        owner: usize,
    }

    let registry = ServiceRegistry::new();
    let barrier = Barrier::new(THREADS);
    let winners = AtomicUsize::new(0);
    let winner_owner = AtomicUsize::new(usize::MAX);

    thread::scope(|s| {
        for owner in 0..THREADS {
            let registry = &registry;
            let barrier = &barrier;
            let winners = &winners;
            let winner_owner = &winner_owner;
            s.spawn(move || {
                barrier.wait();
                if registry.register(Arc::new(WordBank { owner })).is_ok() {
                    winners.fetch_add(1, Ordering::SeqCst);
                    winner_owner.store(owner, Ordering::SeqCst);
                }
            });
        }
    });

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    let bank = registry.try_get::<WordBank>().unwrap();
    assert_eq!(bank.owner, winner_owner.load(Ordering::SeqCst));
}
