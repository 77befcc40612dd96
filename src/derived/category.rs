use std::sync::Arc;

use tracing::error;
use tracing::trace;

use crate::store::Category;
use crate::store::CategoryNetworkId;
use crate::store::DataStore;
use crate::store::SessionDuration;
use crate::store::TableSet;
use crate::store::TimeLimitRule;
use crate::store::UsedTimeItem;
use crate::CacheMisuseError;
use crate::Result;

/// One category with the rows hanging off it.
///
/// Each sublist is shared: an [`update`](Self::update) that leaves a list
/// untouched or re-reads an equal list keeps the very same `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRelatedData {
    pub category: Category,
    pub rules: Arc<Vec<TimeLimitRule>>,
    pub used_times: Arc<Vec<UsedTimeItem>>,
    pub durations: Arc<Vec<SessionDuration>>,
    pub networks: Arc<Vec<CategoryNetworkId>>,
}

impl CategoryRelatedData {
    /// Tables whose changes are applied by [`update`](Self::update)
    pub const SUBLIST_TABLES: TableSet = TableSet::TIME_LIMIT_RULE
        .union(TableSet::USED_TIME_ITEM)
        .union(TableSet::SESSION_DURATION)
        .union(TableSet::CATEGORY_NETWORK_ID);

    pub fn load<S: DataStore>(
        category: Category,
        store: &S,
    ) -> Result<Arc<Self>> {
        store.run_in_unobserved_transaction(|| {
            let id = category.id.as_str();
            let rules = Arc::new(store.time_limit_rules_by_category(id)?);
            let used_times = Arc::new(store.used_times_by_category(id)?);
            let durations = Arc::new(store.session_durations_by_category(id)?);
            let networks = Arc::new(store.networks_by_category(id)?);

            Ok(Arc::new(Self {
                category,
                rules,
                used_times,
                durations,
                networks,
            }))
        })
    }

    /// Rebuilds the sublists named in `dirty` against the current `category`
    /// row. Returns `self` when nothing differs.
    pub fn update<S: DataStore>(
        self: &Arc<Self>,
        category: Category,
        dirty: TableSet,
        store: &S,
    ) -> Result<Arc<Self>> {
        if category.id != self.category.id {
            let err = CacheMisuseError::MismatchedSnapshot {
                expected: self.category.id.clone(),
                actual: category.id,
            };
            error!("{}", err);
            return Err(err.into());
        }

        store.run_in_unobserved_transaction(|| {
            let id = self.category.id.as_str();
            let rules = reread(&self.rules, dirty.contains(TableSet::TIME_LIMIT_RULE), || {
                store.time_limit_rules_by_category(id)
            })?;
            let used_times = reread(&self.used_times, dirty.contains(TableSet::USED_TIME_ITEM), || {
                store.used_times_by_category(id)
            })?;
            let durations = reread(&self.durations, dirty.contains(TableSet::SESSION_DURATION), || {
                store.session_durations_by_category(id)
            })?;
            let networks = reread(&self.networks, dirty.contains(TableSet::CATEGORY_NETWORK_ID), || {
                store.networks_by_category(id)
            })?;

            let unchanged = category == self.category
                && Arc::ptr_eq(&rules, &self.rules)
                && Arc::ptr_eq(&used_times, &self.used_times)
                && Arc::ptr_eq(&durations, &self.durations)
                && Arc::ptr_eq(&networks, &self.networks);

            if unchanged {
                trace!(category = id, "category unchanged");
                return Ok(self.clone());
            }

            Ok(Arc::new(Self {
                category,
                rules,
                used_times,
                durations,
                networks,
            }))
        })
    }
}

/// Keeps `current` unless the re-read list differs from it
pub(super) fn reread<T, F>(
    current: &Arc<Vec<T>>,
    dirty: bool,
    query: F,
) -> Result<Arc<Vec<T>>>
where
    T: PartialEq,
    F: FnOnce() -> Result<Vec<T>>,
{
    if !dirty {
        return Ok(current.clone());
    }

    let fresh = query()?;
    if fresh == **current {
        Ok(current.clone())
    } else {
        Ok(Arc::new(fresh))
    }
}
