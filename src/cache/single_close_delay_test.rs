use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::*;
use crate::test_utils::CountingHelper;
use crate::test_utils::RecordingListener;
use crate::test_utils::TestItem;
use crate::utils::ManualClock;
use crate::CacheMisuseError;
use crate::Error;

const DELAY: Duration = Duration::from_secs(60);

type Engine = SingleItemCache<CountingHelper>;

fn fixture(delay: Duration) -> (Engine, Arc<ManualClock>, SingleDelayedCloseCache<TestItem, Engine>) {
    let engine = SingleItemCache::with_defaults("single_close_delay_test", CountingHelper::new());
    let clock = Arc::new(ManualClock::new());
    let cache = SingleDelayedCloseCache::with_clock(
        "single_close_delay_test",
        engine.clone(),
        delay,
        Duration::from_millis(1),
        clock.clone(),
    );
    (engine, clock, cache)
}

#[test]
fn reopen_during_pending_wipe_reuses_reference() {
    let (engine, clock, cache) = fixture(DELAY);

    let first = cache.open(None).unwrap();
    assert_eq!(engine.users(), 2);
    cache.close(None).unwrap();
    assert!(cache.has_pending_wipe());
    assert_eq!(engine.users(), 1);

    clock.advance(Duration::from_secs(30));
    let second = cache.open(None).unwrap();
    assert!(!cache.has_pending_wipe());
    assert_eq!(cache.active_users(), 1);
    assert_eq!(engine.users(), 2);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(engine.helper().opened(), 1);

    clock.advance(DELAY);
    assert!(!cache.run_pending_wipes().unwrap());
    assert!(engine.is_live());
}

#[test]
fn wipe_releases_slot_after_delay() {
    let (engine, clock, cache) = fixture(DELAY);

    cache.open(None).unwrap();
    cache.open(None).unwrap();
    cache.close(None).unwrap();
    assert!(!cache.has_pending_wipe());
    cache.close(None).unwrap();
    assert!(cache.has_pending_wipe());

    clock.advance(DELAY - Duration::from_secs(1));
    assert!(!cache.run_pending_wipes().unwrap());
    assert!(engine.is_live());

    clock.advance(Duration::from_secs(1));
    assert!(cache.run_pending_wipes().unwrap());
    assert!(!engine.is_live());
    assert!(!cache.has_pending_wipe());
    assert_eq!(engine.helper().disposed_count(), 1);
}

#[test]
fn listener_detaches_on_close() {
    let (engine, clock, cache) = fixture(DELAY);
    let listener = RecordingListener::new();
    let listener_ref: SingleListenerRef<TestItem> = listener.clone();

    cache.open(Some(listener_ref.clone())).unwrap();
    assert_eq!(engine.listener_count(), 1);
    cache.close(Some(&listener_ref)).unwrap();
    assert_eq!(engine.listener_count(), 0);

    clock.advance(DELAY);
    assert!(cache.run_pending_wipes().unwrap());
}

#[test]
fn zero_delay_is_identity() {
    let (engine, _clock, cache) = fixture(Duration::ZERO);
    assert!(cache.is_pass_through());

    cache.open(None).unwrap();
    assert_eq!(engine.users(), 1);
    cache.close(None).unwrap();
    assert!(!engine.is_live());
}

#[test]
fn close_without_open_is_misuse() {
    let (_engine, _clock, cache) = fixture(DELAY);
    assert!(matches!(
        cache.close(None),
        Err(Error::Misuse(CacheMisuseError::UnmatchedClose { .. }))
    ));
}

#[test]
fn background_timer_releases_slot() {
    let engine = SingleItemCache::with_defaults("single_close_delay_test", CountingHelper::new());
    let cache = SingleDelayedCloseCache::new(
        "single_close_delay_test",
        engine.clone(),
        Duration::from_millis(30),
        &crate::config::GateConfig::default(),
    );

    cache.open(None).unwrap();
    cache.close(None).unwrap();
    thread::sleep(Duration::from_millis(300));

    assert!(!engine.is_live());
    assert!(!cache.has_pending_wipe());
}
