use std::fmt;
use std::sync::Arc;

use tracing::debug;
use tracing::trace;

use crate::invalidation::ObserverRegistration;
use crate::store::DataStore;
use crate::store::TableSet;
use crate::store::User;
use crate::store::UserLimitLoginCategoryWithChildId;
use crate::Result;

/// What the sign-in screen needs about one user.
pub struct UserLoginRelatedData {
    pub user: User,
    /// Category that must currently allow usage for the sign-in to succeed
    pub limit_login_category: Option<UserLimitLoginCategoryWithChildId>,
    registration: ObserverRegistration,
}

impl UserLoginRelatedData {
    pub const RELATED_TABLES: TableSet = TableSet::USER
        .union(TableSet::USER_LIMIT_LOGIN_CATEGORY)
        .union(TableSet::CATEGORY);

    /// Tables feeding [`limit_login_category`](Self::limit_login_category)
    const LIMIT_TABLES: TableSet = TableSet::USER_LIMIT_LOGIN_CATEGORY.union(TableSet::CATEGORY);

    pub fn load<S: DataStore>(
        user_id: &str,
        store: &S,
    ) -> Result<Option<Arc<Self>>> {
        store.run_in_unobserved_transaction(|| {
            let registration = store.invalidation_tracker().register(Self::RELATED_TABLES);

            let Some(user) = store.user_by_id(user_id)? else {
                return Ok(None);
            };
            let limit_login_category = store.limit_login_category_by_parent(user_id)?;

            Ok(Some(Arc::new(Self {
                user,
                limit_login_category,
                registration,
            })))
        })
    }

    pub fn update<S: DataStore>(
        self: &Arc<Self>,
        store: &S,
    ) -> Result<Option<Arc<Self>>> {
        store.run_in_unobserved_transaction(|| {
            let dirty = self.registration.dirty();
            if dirty.is_empty() {
                return Ok(Some(self.clone()));
            }

            let registration = store.invalidation_tracker().register(Self::RELATED_TABLES);
            let user_id = self.user.id.as_str();

            let user = if dirty.contains(TableSet::USER) {
                match store.user_by_id(user_id)? {
                    Some(user) => user,
                    None => {
                        debug!(user = %user_id, "user gone");
                        return Ok(None);
                    }
                }
            } else {
                self.user.clone()
            };

            let limit_login_category = if dirty.intersects(Self::LIMIT_TABLES) {
                store.limit_login_category_by_parent(user_id)?
            } else {
                self.limit_login_category.clone()
            };

            if user == self.user && limit_login_category == self.limit_login_category {
                trace!(user = %user_id, "user login related data unchanged");
                self.registration.acknowledge(dirty);
                return Ok(Some(self.clone()));
            }

            Ok(Some(Arc::new(Self {
                user,
                limit_login_category,
                registration,
            })))
        })
    }
}

impl fmt::Debug for UserLoginRelatedData {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("UserLoginRelatedData")
            .field("user", &self.user)
            .field("limit_login_category", &self.limit_login_category)
            .finish_non_exhaustive()
    }
}
