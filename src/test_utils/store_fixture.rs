use std::sync::Arc;

use crate::store::Category;
use crate::store::CategoryApp;
use crate::store::CategoryNetworkId;
use crate::store::Device;
use crate::store::MemoryStore;
use crate::store::SessionDuration;
use crate::store::TimeLimitRule;
use crate::store::UsedTimeItem;
use crate::store::User;

pub(crate) const CHILD: &str = "c1";
pub(crate) const SECOND_CHILD: &str = "c2";
pub(crate) const PARENT: &str = "p1";
pub(crate) const DEVICE: &str = "d1";
pub(crate) const SCHOOL: &str = "cat-a";
pub(crate) const GAMES: &str = "cat-g";
pub(crate) const SECOND_CHILD_CATEGORY: &str = "cat-x";

pub(crate) fn rule(
    id: &str,
    category_id: &str,
    maximum_time_in_millis: i32,
) -> TimeLimitRule {
    TimeLimitRule {
        id: id.to_string(),
        ..TimeLimitRule::new(category_id, 0b111_1111, maximum_time_in_millis)
    }
}

pub(crate) fn used_time(
    category_id: &str,
    day_of_epoch: i32,
    used_millis: i64,
) -> UsedTimeItem {
    UsedTimeItem {
        day_of_epoch,
        used_millis,
        category_id: category_id.to_string(),
        start_time_of_day: TimeLimitRule::MIN_START_MINUTE,
        end_time_of_day: TimeLimitRule::MAX_END_MINUTE,
    }
}

/// Two children with two and one categories, a parent, and the own device
/// signed in as [`CHILD`] with [`SECOND_CHILD`] as default user.
pub(crate) fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.write(|tx| {
        tx.put_user(User::child(CHILD, "Alice"));
        tx.put_user(User::child(SECOND_CHILD, "Carol"));
        tx.put_user(User::parent(PARENT, "Bob"));

        tx.put_category(Category::new(SCHOOL, CHILD, "School"));
        tx.put_category(Category::new(GAMES, CHILD, "Games"));
        tx.put_category(Category::new(SECOND_CHILD_CATEGORY, SECOND_CHILD, "Everything"));

        tx.put_time_limit_rule(rule("rule-a", SCHOOL, 4 * 60 * 60 * 1000));
        tx.put_time_limit_rule(rule("rule-g", GAMES, 60 * 60 * 1000));
        tx.put_used_time(used_time(GAMES, 19_000, 15 * 60 * 1000));
        tx.put_session_duration(SessionDuration {
            category_id: GAMES.to_string(),
            max_session_duration: 30 * 60 * 1000,
            session_pause_duration: 10 * 60 * 1000,
            start_minute_of_day: TimeLimitRule::MIN_START_MINUTE,
            end_minute_of_day: TimeLimitRule::MAX_END_MINUTE,
            last_usage: 1_000,
            last_session_duration: 5 * 60 * 1000,
        });
        tx.put_network_id(CategoryNetworkId {
            category_id: SCHOOL.to_string(),
            network_item_id: "net1".to_string(),
            hashed_network_id: "5f4dcc3b".to_string(),
        });

        tx.put_category_app(CategoryApp::new(SCHOOL, "org.school.app"));
        tx.put_category_app(CategoryApp::new(GAMES, "com.game"));
        tx.put_category_app(CategoryApp::new(SECOND_CHILD_CATEGORY, "com.other"));

        tx.put_device(Device {
            current_user_id: CHILD.to_string(),
            default_user: SECOND_CHILD.to_string(),
            ..Device::new(DEVICE, "Tablet")
        });
        tx.set_own_device_id(Some(DEVICE));
    });
    store
}
