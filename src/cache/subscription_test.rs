use std::sync::Arc;

use tracing_test::traced_test;

use super::*;
use crate::test_utils::item;
use crate::test_utils::CountingHelper;
use crate::test_utils::RecordingListener;
use crate::test_utils::TestItem;
use crate::test_utils::SINGLE_KEY;

#[test]
fn dropping_subscription_closes_key() {
    let cache = KeyedCache::with_defaults("subscription_test", CountingHelper::new());
    let listener = RecordingListener::new();
    let listener_ref: ListenerRef<String, TestItem> = listener.clone();

    let (subscription, value) = Subscription::open(cache.clone(), "u1".to_string(), listener_ref).unwrap();
    assert_eq!(value.version, 0);
    assert_eq!(subscription.key(), "u1");
    assert_eq!(cache.listener_count(&"u1".to_string()), 1);

    cache.helper().replace_next("u1", item("u1", 1));
    cache.refresh_all().unwrap();
    assert_eq!(listener.count(), 1);

    drop(subscription);
    assert!(cache.is_empty());
}

#[test]
fn explicit_close_reports_result() {
    let cache = KeyedCache::with_defaults("subscription_test", CountingHelper::new());
    let listener: ListenerRef<String, TestItem> = RecordingListener::new();

    let (subscription, _) = Subscription::open(cache.clone(), "u1".to_string(), listener).unwrap();
    subscription.close().unwrap();
    assert!(cache.is_empty());
}

#[test]
#[traced_test]
fn failed_close_on_drop_is_logged() {
    let cache = KeyedCache::with_defaults("subscription_test", CountingHelper::new());
    let listener = RecordingListener::new();
    let listener_ref: ListenerRef<String, TestItem> = listener.clone();

    let (subscription, _) = Subscription::open(cache.clone(), "u1".to_string(), listener_ref.clone()).unwrap();
    // someone else closed the key behind the subscription's back
    cache.close(&"u1".to_string(), Some(&listener_ref)).unwrap();

    drop(subscription);
    assert!(logs_contain("failed to close subscription"));
}

#[test]
fn failed_open_returns_error() {
    let cache = KeyedCache::with_defaults("subscription_test", CountingHelper::new());
    cache.helper().fail_open(true);

    let listener: ListenerRef<String, TestItem> = RecordingListener::new();
    let result = Subscription::open(cache.clone(), "u1".to_string(), listener);
    assert!(result.is_err());
    assert!(cache.is_empty());
}

#[test]
fn single_subscription_tracks_slot() {
    let cache = SingleItemCache::with_defaults("subscription_test", CountingHelper::new());
    let listener = RecordingListener::new();
    let listener_ref: SingleListenerRef<TestItem> = listener.clone();

    let (subscription, value) = SingleSubscription::open(cache.clone(), listener_ref).unwrap();
    assert_eq!(value.version, 0);
    assert!(cache.is_live());

    let replacement = item(SINGLE_KEY, 2);
    cache.helper().replace_next(SINGLE_KEY, replacement.clone());
    cache.refresh_all().unwrap();
    assert!(Arc::ptr_eq(&listener.events.lock()[0].2, &replacement));

    drop(subscription);
    assert!(!cache.is_live());
}

#[tokio::test]
async fn subscription_with_channel_listener_streams_changes() {
    let cache = KeyedCache::with_defaults("subscription_test", CountingHelper::new());
    let (listener, mut changes) = ChannelListener::<KeyedValueChange<String, TestItem>>::new();
    let listener: ListenerRef<String, TestItem> = listener;

    let (subscription, _) = Subscription::open(cache.clone(), "u1".to_string(), listener).unwrap();

    cache.helper().replace_next("u1", item("u1", 1));
    cache.refresh_all().unwrap();
    cache.helper().replace_next("u1", item("u1", 2));
    cache.refresh_all().unwrap();

    assert_eq!(changes.recv().await.unwrap().new_value.version, 1);
    assert_eq!(changes.recv().await.unwrap().new_value.version, 2);

    drop(subscription);
    assert!(cache.is_empty());
}
