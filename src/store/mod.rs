//! Shape of the backing store the derived snapshots are built from.
//!
//! The cache layer only needs consistent reads, an invalidation tracker and
//! a hook that runs after every commit. [`MemoryStore`] is the in-process
//! implementation used by tests and embedders without a database.

mod mem_store;
mod model;
mod table;

pub use mem_store::*;
pub use model::*;
pub use table::*;


use crate::invalidation::InvalidationTracker;
use crate::Result;

/// Runs after a write transaction committed, inside an unobserved transaction
pub type CommitListener = Box<dyn Fn() + Send + Sync>;

pub trait DataStore: Send + Sync + 'static {
    fn user_by_id(
        &self,
        user_id: &str,
    ) -> Result<Option<User>>;

    /// Ordered by category id
    fn categories_by_child_id(
        &self,
        child_id: &str,
    ) -> Result<Vec<Category>>;

    fn time_limit_rules_by_category(
        &self,
        category_id: &str,
    ) -> Result<Vec<TimeLimitRule>>;

    fn used_times_by_category(
        &self,
        category_id: &str,
    ) -> Result<Vec<UsedTimeItem>>;

    fn session_durations_by_category(
        &self,
        category_id: &str,
    ) -> Result<Vec<SessionDuration>>;

    fn networks_by_category(
        &self,
        category_id: &str,
    ) -> Result<Vec<CategoryNetworkId>>;

    /// Apps of every category owned by `user_id`
    fn category_apps_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<CategoryApp>>;

    fn own_device_id(&self) -> Result<Option<String>>;

    fn device_by_id(
        &self,
        device_id: &str,
    ) -> Result<Option<Device>>;

    fn temporarily_allowed_apps(&self) -> Result<Vec<String>>;

    fn experimental_flags(&self) -> Result<u64>;

    fn limit_login_category_by_parent(
        &self,
        parent_id: &str,
    ) -> Result<Option<UserLimitLoginCategoryWithChildId>>;

    /// Runs `block` with a consistent view of the store. Nested calls on the
    /// same thread join the outer transaction.
    fn run_in_unobserved_transaction<R, F>(
        &self,
        block: F,
    ) -> R
    where
        F: FnOnce() -> R;

    fn invalidation_tracker(&self) -> &InvalidationTracker;

    fn register_commit_listener(
        &self,
        listener: CommitListener,
    );
}
