use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use parking_lot::ReentrantMutex;
use parking_lot::RwLock;
use tracing::debug;
use tracing::trace;

use super::*;
use crate::invalidation::InvalidationTracker;
use crate::Result;
use crate::StoreError;

type UsedTimeKey = (String, i32, i32, i32);
type SessionDurationKey = (String, i32, i32, i32, i32);

#[derive(Debug, Default)]
struct StoreData {
    users: BTreeMap<String, User>,
    categories: BTreeMap<String, Category>,
    rules: BTreeMap<String, TimeLimitRule>,
    used_times: BTreeMap<UsedTimeKey, UsedTimeItem>,
    session_durations: BTreeMap<SessionDurationKey, SessionDuration>,
    category_apps: BTreeMap<(String, String), CategoryApp>,
    networks: BTreeMap<(String, String), CategoryNetworkId>,
    devices: BTreeMap<String, Device>,
    limit_login_categories: BTreeMap<String, UserLimitLoginCategory>,
    temporarily_allowed_apps: BTreeSet<String>,
    own_device_id: Option<String>,
    experimental_flags: u64,
}

/// In-memory [`DataStore`].
///
/// Writes go through [`MemoryStore::write`]; the tables a write touched are
/// broadcast to the invalidation tracker on commit, after which every commit
/// listener runs inside an unobserved transaction.
pub struct MemoryStore {
    transaction: ReentrantMutex<()>,
    data: RwLock<StoreData>,
    tracker: InvalidationTracker,
    commit_listeners: RwLock<Vec<Arc<dyn Fn() + Send + Sync>>>,
    unavailable: AtomicBool,
    reads: Mutex<HashMap<Table, usize>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            transaction: ReentrantMutex::new(()),
            data: RwLock::new(StoreData::default()),
            tracker: InvalidationTracker::new(),
            commit_listeners: RwLock::new(Vec::new()),
            unavailable: AtomicBool::new(false),
            reads: Mutex::new(HashMap::new()),
        }
    }

    /// Applies `block` as one write transaction and commits it.
    ///
    /// `block` must not read from or write to this store itself.
    pub fn write<R, F>(
        &self,
        block: F,
    ) -> R
    where
        F: FnOnce(&mut WriteTransaction<'_>) -> R,
    {
        let _transaction = self.transaction.lock();

        let (result, touched) = {
            let mut data = self.data.write();
            let mut tx = WriteTransaction {
                data: &mut data,
                touched: TableSet::empty(),
            };
            let result = block(&mut tx);
            (result, tx.touched)
        };

        self.commit(touched);
        result
    }

    fn commit(
        &self,
        touched: TableSet,
    ) {
        if touched.is_empty() {
            return;
        }

        debug!(?touched, "commit");
        self.tracker.notify(touched);

        let listeners = self.commit_listeners.read().clone();
        for listener in listeners {
            listener();
        }
    }

    /// Makes every query fail until switched back
    pub fn set_unavailable(
        &self,
        unavailable: bool,
    ) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Queries served for `table` so far
    pub fn read_count(
        &self,
        table: Table,
    ) -> usize {
        self.reads.lock().get(&table).copied().unwrap_or(0)
    }

    pub fn reset_read_counts(&self) {
        self.reads.lock().clear();
    }

    fn read<R, F>(
        &self,
        table: Table,
        query: F,
    ) -> Result<R>
    where
        F: FnOnce(&StoreData) -> R,
    {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("query on {}", table)).into());
        }

        *self.reads.lock().entry(table).or_insert(0) += 1;
        trace!(%table, "query");
        Ok(query(&self.data.read()))
    }
}

impl DataStore for MemoryStore {
    fn user_by_id(
        &self,
        user_id: &str,
    ) -> Result<Option<User>> {
        self.read(Table::User, |data| data.users.get(user_id).cloned())
    }

    fn categories_by_child_id(
        &self,
        child_id: &str,
    ) -> Result<Vec<Category>> {
        self.read(Table::Category, |data| {
            data.categories
                .values()
                .filter(|category| category.child_id == child_id)
                .cloned()
                .collect()
        })
    }

    fn time_limit_rules_by_category(
        &self,
        category_id: &str,
    ) -> Result<Vec<TimeLimitRule>> {
        self.read(Table::TimeLimitRule, |data| {
            data.rules
                .values()
                .filter(|rule| rule.category_id == category_id)
                .cloned()
                .collect()
        })
    }

    fn used_times_by_category(
        &self,
        category_id: &str,
    ) -> Result<Vec<UsedTimeItem>> {
        self.read(Table::UsedTimeItem, |data| {
            data.used_times
                .values()
                .filter(|item| item.category_id == category_id)
                .cloned()
                .collect()
        })
    }

    fn session_durations_by_category(
        &self,
        category_id: &str,
    ) -> Result<Vec<SessionDuration>> {
        self.read(Table::SessionDuration, |data| {
            data.session_durations
                .values()
                .filter(|item| item.category_id == category_id)
                .cloned()
                .collect()
        })
    }

    fn networks_by_category(
        &self,
        category_id: &str,
    ) -> Result<Vec<CategoryNetworkId>> {
        self.read(Table::CategoryNetworkId, |data| {
            data.networks
                .values()
                .filter(|item| item.category_id == category_id)
                .cloned()
                .collect()
        })
    }

    fn category_apps_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<CategoryApp>> {
        self.read(Table::CategoryApp, |data| {
            data.category_apps
                .values()
                .filter(|app| {
                    data.categories
                        .get(&app.category_id)
                        .is_some_and(|category| category.child_id == user_id)
                })
                .cloned()
                .collect()
        })
    }

    fn own_device_id(&self) -> Result<Option<String>> {
        self.read(Table::ConfigurationItem, |data| data.own_device_id.clone())
    }

    fn device_by_id(
        &self,
        device_id: &str,
    ) -> Result<Option<Device>> {
        self.read(Table::Device, |data| data.devices.get(device_id).cloned())
    }

    fn temporarily_allowed_apps(&self) -> Result<Vec<String>> {
        self.read(Table::TemporarilyAllowedApp, |data| {
            data.temporarily_allowed_apps.iter().cloned().collect()
        })
    }

    fn experimental_flags(&self) -> Result<u64> {
        self.read(Table::ConfigurationItem, |data| data.experimental_flags)
    }

    fn limit_login_category_by_parent(
        &self,
        parent_id: &str,
    ) -> Result<Option<UserLimitLoginCategoryWithChildId>> {
        self.read(Table::UserLimitLoginCategory, |data| {
            let limit = data.limit_login_categories.get(parent_id)?;
            let category = data.categories.get(&limit.category_id)?;
            let child = data.users.get(&category.child_id)?;

            Some(UserLimitLoginCategoryWithChildId {
                child_id: child.id.clone(),
                child_title: child.name.clone(),
                category_id: category.id.clone(),
                category_title: category.title.clone(),
                selected: true,
            })
        })
    }

    fn run_in_unobserved_transaction<R, F>(
        &self,
        block: F,
    ) -> R
    where
        F: FnOnce() -> R,
    {
        let _transaction = self.transaction.lock();
        block()
    }

    fn invalidation_tracker(&self) -> &InvalidationTracker {
        &self.tracker
    }

    fn register_commit_listener(
        &self,
        listener: CommitListener,
    ) {
        self.commit_listeners.write().push(Arc::from(listener));
    }
}

/// Mutable view of a [`MemoryStore`] inside [`MemoryStore::write`].
/// Every mutation records its table for the commit.
pub struct WriteTransaction<'a> {
    data: &'a mut StoreData,
    touched: TableSet,
}

impl WriteTransaction<'_> {
    /// Invalidates `table` without changing it
    pub fn touch(
        &mut self,
        table: Table,
    ) {
        self.touched |= table.flag();
    }

    pub fn put_user(
        &mut self,
        user: User,
    ) {
        self.touch(Table::User);
        self.data.users.insert(user.id.clone(), user);
    }

    pub fn remove_user(
        &mut self,
        user_id: &str,
    ) -> Option<User> {
        self.touch(Table::User);
        self.data.users.remove(user_id)
    }

    pub fn put_category(
        &mut self,
        category: Category,
    ) {
        self.touch(Table::Category);
        self.data.categories.insert(category.id.clone(), category);
    }

    pub fn update_category<F>(
        &mut self,
        category_id: &str,
        change: F,
    ) -> bool
    where
        F: FnOnce(&mut Category),
    {
        let Some(category) = self.data.categories.get_mut(category_id) else {
            return false;
        };
        change(category);
        self.touch(Table::Category);
        true
    }

    pub fn remove_category(
        &mut self,
        category_id: &str,
    ) -> Option<Category> {
        self.touch(Table::Category);
        self.data.categories.remove(category_id)
    }

    pub fn put_time_limit_rule(
        &mut self,
        rule: TimeLimitRule,
    ) {
        self.touch(Table::TimeLimitRule);
        self.data.rules.insert(rule.id.clone(), rule);
    }

    pub fn remove_time_limit_rule(
        &mut self,
        rule_id: &str,
    ) -> Option<TimeLimitRule> {
        self.touch(Table::TimeLimitRule);
        self.data.rules.remove(rule_id)
    }

    pub fn put_used_time(
        &mut self,
        item: UsedTimeItem,
    ) {
        self.touch(Table::UsedTimeItem);
        let key = (
            item.category_id.clone(),
            item.day_of_epoch,
            item.start_time_of_day,
            item.end_time_of_day,
        );
        self.data.used_times.insert(key, item);
    }

    pub fn put_session_duration(
        &mut self,
        item: SessionDuration,
    ) {
        self.touch(Table::SessionDuration);
        let key = (
            item.category_id.clone(),
            item.max_session_duration,
            item.session_pause_duration,
            item.start_minute_of_day,
            item.end_minute_of_day,
        );
        self.data.session_durations.insert(key, item);
    }

    pub fn put_category_app(
        &mut self,
        app: CategoryApp,
    ) {
        self.touch(Table::CategoryApp);
        let key = (app.category_id.clone(), app.package_name.clone());
        self.data.category_apps.insert(key, app);
    }

    pub fn remove_category_app(
        &mut self,
        category_id: &str,
        package_name: &str,
    ) -> Option<CategoryApp> {
        self.touch(Table::CategoryApp);
        self.data
            .category_apps
            .remove(&(category_id.to_string(), package_name.to_string()))
    }

    pub fn put_network_id(
        &mut self,
        network: CategoryNetworkId,
    ) {
        self.touch(Table::CategoryNetworkId);
        let key = (network.category_id.clone(), network.network_item_id.clone());
        self.data.networks.insert(key, network);
    }

    pub fn put_device(
        &mut self,
        device: Device,
    ) {
        self.touch(Table::Device);
        self.data.devices.insert(device.id.clone(), device);
    }

    pub fn update_device<F>(
        &mut self,
        device_id: &str,
        change: F,
    ) -> bool
    where
        F: FnOnce(&mut Device),
    {
        let Some(device) = self.data.devices.get_mut(device_id) else {
            return false;
        };
        change(device);
        self.touch(Table::Device);
        true
    }

    pub fn set_own_device_id(
        &mut self,
        device_id: Option<&str>,
    ) {
        self.touch(Table::ConfigurationItem);
        self.data.own_device_id = device_id.map(str::to_string);
    }

    pub fn set_experimental_flags(
        &mut self,
        flags: u64,
    ) {
        self.touch(Table::ConfigurationItem);
        self.data.experimental_flags = flags;
    }

    pub fn add_temporarily_allowed_app(
        &mut self,
        app: TemporarilyAllowedApp,
    ) {
        self.touch(Table::TemporarilyAllowedApp);
        self.data.temporarily_allowed_apps.insert(app.package_name);
    }

    pub fn remove_temporarily_allowed_app(
        &mut self,
        package_name: &str,
    ) -> bool {
        self.touch(Table::TemporarilyAllowedApp);
        self.data.temporarily_allowed_apps.remove(package_name)
    }

    /// `None` lifts the restriction
    pub fn set_limit_login_category(
        &mut self,
        user_id: &str,
        category_id: Option<&str>,
    ) {
        self.touch(Table::UserLimitLoginCategory);
        match category_id {
            Some(category_id) => {
                self.data.limit_login_categories.insert(
                    user_id.to_string(),
                    UserLimitLoginCategory {
                        user_id: user_id.to_string(),
                        category_id: category_id.to_string(),
                    },
                );
            }
            None => {
                self.data.limit_login_categories.remove(user_id);
            }
        }
    }
}
