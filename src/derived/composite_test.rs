use std::sync::Arc;

use super::*;
use crate::cache::ChannelListener;
use crate::cache::SingleListenerRef;
use crate::cache::ValueChange;
use crate::store::MemoryStore;
use crate::store::Table;
use crate::store::User;
use crate::test_utils::*;
use crate::CloseDelayConfig;
use crate::Settings;

type DeviceAndUserChange = ValueChange<Option<Arc<DeviceAndUserRelatedData>>>;

fn immediate(store: &Arc<MemoryStore>) -> DerivedData<MemoryStore> {
    let settings = Settings {
        close_delay: CloseDelayConfig::disabled(),
        ..Default::default()
    };
    DerivedData::new(store.clone(), &settings)
}

fn assert_all_released(data: &DerivedData<MemoryStore>) {
    assert!(data.user_related_data_cache().is_empty());
    assert!(!data.device_related_data_cache().is_live());
    assert!(data.user_login_related_data_cache().is_empty());
    assert!(!data.device_and_user_related_data_cache().is_live());
    assert!(data.complete_user_login_related_data_cache().is_empty());
}

#[test]
fn device_and_user_follows_the_signed_in_user() {
    let store = seeded_store();
    let data = immediate(&store);

    let (listener, mut changes) = ChannelListener::<DeviceAndUserChange>::new();
    let listener: SingleListenerRef<Option<Arc<DeviceAndUserRelatedData>>> = listener;
    let (subscription, initial) = data.subscribe_user_and_device_related_data(listener).unwrap();

    let initial = initial.unwrap();
    assert_eq!(initial.device_related_data.device.id, DEVICE);
    assert_eq!(initial.user_related_data.as_ref().unwrap().user.id, CHILD);
    assert_eq!(data.user_related_data_cache().users(&CHILD.to_string()), 1);
    assert_eq!(data.device_related_data_cache().users(), 1);

    store.write(|tx| {
        tx.update_device(DEVICE, |device| device.current_user_id = SECOND_CHILD.to_string());
    });

    let change = changes.try_recv().unwrap();
    assert!(Arc::ptr_eq(change.old_value.as_ref().unwrap(), &initial));
    let switched = change.new_value.unwrap();
    assert_eq!(switched.user_related_data.as_ref().unwrap().user.id, SECOND_CHILD);
    assert!(changes.try_recv().is_err());

    // the superseded composite released its reference on the first child
    assert_eq!(data.user_related_data_cache().users(&CHILD.to_string()), 0);
    assert_eq!(data.user_related_data_cache().users(&SECOND_CHILD.to_string()), 1);
    assert_eq!(data.device_related_data_cache().users(), 1);

    subscription.close().unwrap();
    assert_all_released(&data);
}

#[test]
fn nobody_signed_in() {
    let store = seeded_store();
    store.write(|tx| {
        tx.update_device(DEVICE, |device| device.current_user_id.clear());
    });
    let data = immediate(&store);

    let value = data.user_and_device_related_data().unwrap().unwrap();
    assert!(value.user_related_data.is_none());
    assert_all_released(&data);
}

#[test]
fn unrelated_commit_keeps_the_composite() {
    let store = seeded_store();
    let data = immediate(&store);

    let (listener, mut changes) = ChannelListener::<DeviceAndUserChange>::new();
    let listener: SingleListenerRef<Option<Arc<DeviceAndUserRelatedData>>> = listener;
    let (_subscription, _) = data.subscribe_user_and_device_related_data(listener).unwrap();

    store.write(|tx| tx.touch(Table::AllowedContact));

    assert!(changes.try_recv().is_err());
    assert_eq!(data.user_related_data_cache().users(&CHILD.to_string()), 1);
    assert_eq!(data.device_related_data_cache().users(), 1);
}

#[test]
fn other_users_writes_keep_the_composite() {
    let store = seeded_store();
    let data = immediate(&store);

    let (listener, mut changes) = ChannelListener::<DeviceAndUserChange>::new();
    let listener: SingleListenerRef<Option<Arc<DeviceAndUserRelatedData>>> = listener;
    let (_subscription, initial) = data.subscribe_user_and_device_related_data(listener).unwrap();

    store.write(|tx| {
        tx.put_used_time(used_time(SECOND_CHILD_CATEGORY, 19_000, 5 * 60 * 1000));
        tx.put_user(User::parent(PARENT, "Robert"));
    });
    assert!(changes.try_recv().is_err());

    let current = data.user_and_device_related_data().unwrap().unwrap();
    assert!(Arc::ptr_eq(initial.as_ref().unwrap(), &current));
}

#[test]
fn leaf_change_reaches_the_composite() {
    let store = seeded_store();
    let data = immediate(&store);

    let (listener, mut changes) = ChannelListener::<DeviceAndUserChange>::new();
    let listener: SingleListenerRef<Option<Arc<DeviceAndUserRelatedData>>> = listener;
    let (_subscription, initial) = data.subscribe_user_and_device_related_data(listener).unwrap();
    let initial = initial.unwrap();

    store.write(|tx| tx.put_used_time(used_time(GAMES, 19_000, 20 * 60 * 1000)));

    let updated = changes.try_recv().unwrap().new_value.unwrap();
    assert!(Arc::ptr_eq(&initial.device_related_data, &updated.device_related_data));

    let before = initial.user_related_data.as_ref().unwrap();
    let after = updated.user_related_data.as_ref().unwrap();
    assert_eq!(after.category_by_id(GAMES).unwrap().used_times[0].used_millis, 20 * 60 * 1000);
    assert!(Arc::ptr_eq(
        before.category_by_id(SCHOOL).unwrap(),
        after.category_by_id(SCHOOL).unwrap()
    ));
}

#[test]
fn complete_login_data_includes_the_limit_child() {
    let store = seeded_store();
    store.write(|tx| tx.set_limit_login_category(PARENT, Some(GAMES)));
    let data = immediate(&store);

    let value = data.user_login_related_data(PARENT).unwrap().unwrap();
    assert_eq!(value.login_related_data.user.id, PARENT);
    assert_eq!(value.device_related_data.device.id, DEVICE);
    assert_eq!(
        value.limit_login_category_user_related_data.as_ref().unwrap().user.id,
        CHILD
    );
    assert_all_released(&data);
}

#[test]
fn empty_complete_login_data_releases_what_it_opened() {
    let store = seeded_store();
    let data = immediate(&store);

    assert!(data.user_login_related_data("nobody").unwrap().is_none());
    assert_all_released(&data);

    // device missing while the user exists
    store.write(|tx| tx.set_own_device_id(None));
    assert!(data.user_login_related_data(PARENT).unwrap().is_none());
    assert_all_released(&data);
}

#[test]
fn store_failure_leaves_nothing_open() {
    let store = seeded_store();
    store.write(|tx| tx.set_limit_login_category(PARENT, Some(GAMES)));
    let data = immediate(&store);

    store.set_unavailable(true);
    assert!(data.user_login_related_data(PARENT).is_err());
    store.set_unavailable(false);

    assert_all_released(&data);
    assert!(data.user_login_related_data(PARENT).unwrap().is_some());
}
