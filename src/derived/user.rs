use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;

use super::category::reread;
use super::CategoryRelatedData;
use super::UserTimeZone;
use crate::constants::CATEGORY_APP_LOOKUP_CACHE_SIZE;
use crate::invalidation::ObserverRegistration;
use crate::store::CategoryApp;
use crate::store::DataStore;
use crate::store::TableSet;
use crate::store::User;
use crate::Result;

/// Everything the limit logic needs to know about one child user.
pub struct UserRelatedData {
    pub user: User,
    /// Ordered by category id
    pub categories: Vec<Arc<CategoryRelatedData>>,
    pub category_apps: Arc<Vec<CategoryApp>>,
    category_by_id: OnceCell<HashMap<String, Arc<CategoryRelatedData>>>,
    time_zone: OnceCell<UserTimeZone>,
    /// Misses are cached as `None`
    category_app_lookup: Mutex<LruCache<String, Option<CategoryApp>>>,
    registration: ObserverRegistration,
}

impl UserRelatedData {
    pub const RELATED_TABLES: TableSet = TableSet::USER
        .union(TableSet::CATEGORY)
        .union(TableSet::CATEGORY_APP)
        .union(CategoryRelatedData::SUBLIST_TABLES);

    pub fn load<S: DataStore>(
        user: User,
        store: &S,
    ) -> Result<Arc<Self>> {
        store.run_in_unobserved_transaction(|| {
            // registered before reading so no commit in between is missed
            let registration = store.invalidation_tracker().register(Self::RELATED_TABLES);

            let categories = store
                .categories_by_child_id(&user.id)?
                .into_iter()
                .map(|category| CategoryRelatedData::load(category, store))
                .collect::<Result<Vec<_>>>()?;
            let category_apps = Arc::new(store.category_apps_by_user(&user.id)?);

            debug!(user = %user.id, categories = categories.len(), "user related data loaded");
            Ok(Arc::new(Self::assemble(user, categories, category_apps, registration)))
        })
    }

    fn assemble(
        user: User,
        categories: Vec<Arc<CategoryRelatedData>>,
        category_apps: Arc<Vec<CategoryApp>>,
        registration: ObserverRegistration,
    ) -> Self {
        let lookup_size = NonZeroUsize::new(CATEGORY_APP_LOOKUP_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            user,
            categories,
            category_apps,
            category_by_id: OnceCell::new(),
            time_zone: OnceCell::new(),
            category_app_lookup: Mutex::new(LruCache::new(lookup_size)),
            registration,
        }
    }

    /// Returns `self` while no related table changed, `None` once the user
    /// row is gone, and otherwise a new snapshot that reuses every part the
    /// changes did not reach.
    pub fn update<S: DataStore>(
        self: &Arc<Self>,
        store: &S,
    ) -> Result<Option<Arc<Self>>> {
        store.run_in_unobserved_transaction(|| {
            let dirty = self.registration.dirty();
            if dirty.is_empty() {
                return Ok(Some(self.clone()));
            }

            trace!(user = %self.user.id, ?dirty, "rebuilding user related data");
            let registration = store.invalidation_tracker().register(Self::RELATED_TABLES);

            let user = if dirty.contains(TableSet::USER) {
                match store.user_by_id(&self.user.id)? {
                    Some(user) => user,
                    None => {
                        debug!(user = %self.user.id, "user gone");
                        return Ok(None);
                    }
                }
            } else {
                self.user.clone()
            };

            let sublists = dirty & CategoryRelatedData::SUBLIST_TABLES;
            let categories = if dirty.contains(TableSet::CATEGORY) {
                let old_by_id = self.category_map();
                store
                    .categories_by_child_id(&user.id)?
                    .into_iter()
                    .map(|category| match old_by_id.get(&category.id) {
                        Some(old) => old.update(category, sublists, store),
                        None => CategoryRelatedData::load(category, store),
                    })
                    .collect::<Result<Vec<_>>>()?
            } else if !sublists.is_empty() {
                self.categories
                    .iter()
                    .map(|old| old.update(old.category.clone(), sublists, store))
                    .collect::<Result<Vec<_>>>()?
            } else {
                self.categories.clone()
            };

            let category_apps = reread(&self.category_apps, dirty.contains(TableSet::CATEGORY_APP), || {
                store.category_apps_by_user(&user.id)
            })?;

            let unchanged = user == self.user
                && Arc::ptr_eq(&category_apps, &self.category_apps)
                && categories.len() == self.categories.len()
                && categories.iter().zip(&self.categories).all(|(new, old)| Arc::ptr_eq(new, old));

            if unchanged {
                // changes belonged to other users; keep the snapshot and stop re-reading them
                trace!(user = %self.user.id, "user related data unchanged");
                self.registration.acknowledge(dirty);
                return Ok(Some(self.clone()));
            }

            Ok(Some(Arc::new(Self::assemble(
                user,
                categories,
                category_apps,
                registration,
            ))))
        })
    }

    fn category_map(&self) -> &HashMap<String, Arc<CategoryRelatedData>> {
        self.category_by_id.get_or_init(|| {
            self.categories
                .iter()
                .map(|category| (category.category.id.clone(), category.clone()))
                .collect()
        })
    }

    /// [`User::time_zone`] parsed on first use
    pub fn time_zone(&self) -> &UserTimeZone {
        self.time_zone.get_or_init(|| UserTimeZone::parse(&self.user.time_zone))
    }

    pub fn category_by_id(
        &self,
        category_id: &str,
    ) -> Option<&Arc<CategoryRelatedData>> {
        self.category_map().get(category_id)
    }

    /// Exact package name match against the assigned apps
    pub fn find_category_app(
        &self,
        package_name: &str,
    ) -> Option<CategoryApp> {
        let mut lookup = self.category_app_lookup.lock();
        if let Some(hit) = lookup.get(package_name) {
            return hit.clone();
        }

        let found = self
            .category_apps
            .iter()
            .find(|app| app.package_name == package_name)
            .cloned();
        lookup.put(package_name.to_string(), found.clone());
        found
    }

    /// Related tables changed since this snapshot was built
    pub fn dirty_tables(&self) -> TableSet {
        self.registration.dirty()
    }
}

impl fmt::Debug for UserRelatedData {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("UserRelatedData")
            .field("user", &self.user)
            .field("categories", &self.categories)
            .field("category_apps", &self.category_apps)
            .finish_non_exhaustive()
    }
}
