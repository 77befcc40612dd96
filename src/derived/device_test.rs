use std::sync::Arc;

use super::*;
use crate::store::experimental_flags;
use crate::store::MemoryStore;
use crate::store::Table;
use crate::store::TemporarilyAllowedApp;
use crate::store::User;
use crate::test_utils::*;

#[test]
fn missing_own_device_yields_none() {
    let store = MemoryStore::new();
    assert!(DeviceRelatedData::load(&store).unwrap().is_none());

    store.write(|tx| tx.set_own_device_id(Some("nowhere")));
    assert!(DeviceRelatedData::load(&store).unwrap().is_none());
}

#[test]
fn load_reads_device_and_configuration() {
    let store = seeded_store();
    store.write(|tx| {
        tx.set_experimental_flags(experimental_flags::SYSTEM_LEVEL_BLOCKING | experimental_flags::HIDE_MANIPULATION_WARNING);
        tx.add_temporarily_allowed_app(TemporarilyAllowedApp {
            package_name: "com.phone".to_string(),
        });
    });

    let data = DeviceRelatedData::load(&*store).unwrap().unwrap();
    assert_eq!(data.device.id, DEVICE);
    assert!(data.has_valid_default_user);
    assert!(data.is_temporarily_allowed("com.phone"));
    assert!(!data.is_temporarily_allowed("com.game"));

    assert!(data.is_experimental_flag_set(experimental_flags::SYSTEM_LEVEL_BLOCKING));
    assert!(data.is_experimental_flag_set(
        experimental_flags::SYSTEM_LEVEL_BLOCKING | experimental_flags::HIDE_MANIPULATION_WARNING
    ));
    assert!(!data.is_experimental_flag_set(
        experimental_flags::SYSTEM_LEVEL_BLOCKING | experimental_flags::DISABLE_BLOCK_ON_MANIPULATION
    ));
}

#[test]
fn default_user_switch() {
    let store = seeded_store();
    let data = DeviceRelatedData::load(&*store).unwrap().unwrap();
    assert!(data.can_switch_to_default_user());

    store.write(|tx| {
        tx.update_device(DEVICE, |device| device.current_user_id = SECOND_CHILD.to_string());
    });
    let data = data.update(&*store).unwrap().unwrap();
    assert!(!data.can_switch_to_default_user());

    // default user deleted
    store.write(|tx| {
        tx.update_device(DEVICE, |device| device.current_user_id = CHILD.to_string());
        tx.remove_user(SECOND_CHILD);
    });
    let data = data.update(&*store).unwrap().unwrap();
    assert!(!data.has_valid_default_user);
    assert!(!data.can_switch_to_default_user());
}

#[test]
fn update_reloads_only_when_dirty() {
    let store = seeded_store();
    let data = DeviceRelatedData::load(&*store).unwrap().unwrap();

    store.write(|tx| tx.put_time_limit_rule(rule("rule-x", GAMES, 1)));
    let same = data.update(&*store).unwrap().unwrap();
    assert!(Arc::ptr_eq(&data, &same));

    store.write(|tx| tx.set_experimental_flags(experimental_flags::NETWORKTIME_AT_SYSTEMLEVEL));
    let reloaded = data.update(&*store).unwrap().unwrap();
    assert!(!Arc::ptr_eq(&data, &reloaded));
    assert_eq!(reloaded.experimental_flags, experimental_flags::NETWORKTIME_AT_SYSTEMLEVEL);
}

#[test]
fn unconfigured_device_is_gone() {
    let store = seeded_store();
    let data = DeviceRelatedData::load(&*store).unwrap().unwrap();

    store.write(|tx| tx.set_own_device_id(None));
    assert!(data.update(&*store).unwrap().is_none());
}

#[test]
fn reload_with_equal_content_keeps_the_instance() {
    let store = seeded_store();
    let data = DeviceRelatedData::load(&*store).unwrap().unwrap();

    // another user's row; the default user still exists
    store.write(|tx| tx.put_user(User::parent(PARENT, "Robert")));
    let same = data.update(&*store).unwrap().unwrap();
    assert!(Arc::ptr_eq(&data, &same));

    // the change was taken in, so the next update does not reload again
    store.reset_read_counts();
    let again = data.update(&*store).unwrap().unwrap();
    assert!(Arc::ptr_eq(&data, &again));
    assert_eq!(store.read_count(Table::Device), 0);
}
