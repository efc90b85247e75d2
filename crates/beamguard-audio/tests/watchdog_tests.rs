//! Watchdog timer tests.
//!
//! Uses TestClock for deterministic timing: virtual time is advanced by
//! the test while the watchdog thread polls on a short real interval.

use beamguard_audio::WatchdogTimer;
use beamguard_foundation::clock::TestClock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn test_clock() -> Arc<TestClock> {
    Arc::new(TestClock::new())
}

#[test]
fn not_triggered_initially() {
    let wd = WatchdogTimer::new(Duration::from_secs(5));
    assert!(!wd.is_triggered());
}

#[test]
fn not_triggered_when_fed_regularly() {
    let clock = test_clock();
    let wd = WatchdogTimer::new_with_clock(Duration::from_secs(5), clock.clone());

    let running = Arc::new(AtomicBool::new(true));
    wd.start(running.clone(), || {});

    for _ in 0..5 {
        wd.feed();
        clock.advance(Duration::from_secs(1));
        std::thread::sleep(Duration::from_millis(50));
    }

    assert!(!wd.is_triggered());
    running.store(false, Ordering::SeqCst);
    wd.stop();
}

#[test]
fn triggers_when_starved_and_invokes_hook_once() {
    let clock = test_clock();
    let wd = WatchdogTimer::new_with_clock(Duration::from_secs(2), clock.clone());

    let running = Arc::new(AtomicBool::new(true));
    let fired = Arc::new(AtomicU64::new(0));
    let hook_fired = fired.clone();
    wd.start(running.clone(), move || {
        hook_fired.fetch_add(1, Ordering::SeqCst);
    });

    clock.advance(Duration::from_secs(5));
    std::thread::sleep(Duration::from_millis(200));

    assert!(wd.is_triggered(), "watchdog should trigger after timeout without feed");
    assert_eq!(fired.load(Ordering::SeqCst), 1, "hook must fire once per episode");

    running.store(false, Ordering::SeqCst);
    wd.stop();
}

#[test]
fn feed_resets_trigger_and_rearms_hook() {
    let clock = test_clock();
    let wd = WatchdogTimer::new_with_clock(Duration::from_secs(2), clock.clone());

    let running = Arc::new(AtomicBool::new(true));
    let fired = Arc::new(AtomicU64::new(0));
    let hook_fired = fired.clone();
    wd.start(running.clone(), move || {
        hook_fired.fetch_add(1, Ordering::SeqCst);
    });

    clock.advance(Duration::from_secs(5));
    std::thread::sleep(Duration::from_millis(200));
    assert!(wd.is_triggered());

    wd.feed();
    assert!(!wd.is_triggered());

    clock.advance(Duration::from_secs(5));
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(fired.load(Ordering::SeqCst), 2, "a new starvation episode re-fires the hook");

    running.store(false, Ordering::SeqCst);
    wd.stop();
}
