use std::sync::Arc;

use super::*;
use crate::store::Category;
use crate::store::DataStore;
use crate::store::Table;
use crate::store::TableSet;
use crate::test_utils::*;
use crate::CacheMisuseError;
use crate::Error;

fn games(store: &crate::store::MemoryStore) -> Category {
    store
        .categories_by_child_id(CHILD)
        .unwrap()
        .into_iter()
        .find(|category| category.id == GAMES)
        .unwrap()
}

#[test]
fn load_reads_every_sublist() {
    let store = seeded_store();
    let data = CategoryRelatedData::load(games(&store), &*store).unwrap();

    assert_eq!(data.rules.len(), 1);
    assert_eq!(data.used_times.len(), 1);
    assert_eq!(data.durations.len(), 1);
    assert!(data.networks.is_empty());
}

#[test]
fn clean_update_returns_the_same_instance() {
    let store = seeded_store();
    let data = CategoryRelatedData::load(games(&store), &*store).unwrap();
    store.reset_read_counts();

    let updated = data.update(games(&store), TableSet::empty(), &*store).unwrap();
    assert!(Arc::ptr_eq(&data, &updated));
    assert_eq!(store.read_count(Table::TimeLimitRule), 0);
}

#[test]
fn rereading_an_equal_list_keeps_its_arc() {
    let store = seeded_store();
    let data = CategoryRelatedData::load(games(&store), &*store).unwrap();

    let updated = data
        .update(games(&store), CategoryRelatedData::SUBLIST_TABLES, &*store)
        .unwrap();
    assert!(Arc::ptr_eq(&data, &updated));
    assert_eq!(store.read_count(Table::UsedTimeItem), 2);
}

#[test]
fn only_dirty_sublists_are_replaced() {
    let store = seeded_store();
    let data = CategoryRelatedData::load(games(&store), &*store).unwrap();

    store.write(|tx| {
        tx.put_time_limit_rule(rule("rule-g2", GAMES, 1000));
        tx.put_used_time(used_time(GAMES, 19_001, 1));
    });

    // used times changed too, but only rules were asked for
    let updated = data
        .update(games(&store), TableSet::TIME_LIMIT_RULE, &*store)
        .unwrap();
    assert!(!Arc::ptr_eq(&data, &updated));
    assert_eq!(updated.rules.len(), 2);
    assert!(Arc::ptr_eq(&data.used_times, &updated.used_times));
    assert!(Arc::ptr_eq(&data.durations, &updated.durations));
    assert!(Arc::ptr_eq(&data.networks, &updated.networks));
}

#[test]
fn changed_category_row_yields_a_new_instance() {
    let store = seeded_store();
    let data = CategoryRelatedData::load(games(&store), &*store).unwrap();

    let mut renamed = games(&store);
    renamed.title = "Fun".to_string();
    let updated = data.update(renamed, TableSet::empty(), &*store).unwrap();

    assert_eq!(updated.category.title, "Fun");
    assert!(Arc::ptr_eq(&data.rules, &updated.rules));
}

#[test]
fn update_with_another_category_is_misuse() {
    let store = seeded_store();
    let data = CategoryRelatedData::load(games(&store), &*store).unwrap();

    let err = data
        .update(Category::new(SCHOOL, CHILD, "School"), TableSet::empty(), &*store)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Misuse(CacheMisuseError::MismatchedSnapshot { .. })
    ));
}
