//! Cache helpers of the leaf snapshots.
//!
//! Every open and refresh runs inside one unobserved store transaction. A
//! live snapshot refreshes itself; an absent one (`None`) is simply loaded
//! again, so a user or device that appears later is picked up by the next
//! refresh.

use std::sync::Arc;

use super::DeviceRelatedData;
use super::UserLoginRelatedData;
use super::UserRelatedData;
use crate::cache::CacheHelper;
use crate::cache::SingleCacheHelper;
use crate::store::DataStore;
use crate::Result;

pub struct UserRelatedDataHelper<S> {
    store: Arc<S>,
}

impl<S: DataStore> UserRelatedDataHelper<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: DataStore> CacheHelper<String> for UserRelatedDataHelper<S> {
    type Internal = Option<Arc<UserRelatedData>>;
    type External = Option<Arc<UserRelatedData>>;

    fn open_item(
        &self,
        user_id: &String,
    ) -> Result<Self::Internal> {
        match self.store.user_by_id(user_id)? {
            Some(user) => UserRelatedData::load(user, &*self.store).map(Some),
            None => Ok(None),
        }
    }

    fn update_item(
        &self,
        user_id: &String,
        item: &Self::Internal,
    ) -> Result<Self::Internal> {
        match item {
            Some(data) => data.update(&*self.store),
            None => self.open_item(user_id),
        }
    }

    fn dispose_item(
        &self,
        _user_id: &String,
        _item: Self::Internal,
    ) -> Result<()> {
        Ok(())
    }

    fn prepare_for_user(
        &self,
        item: &Self::Internal,
    ) -> Self::External {
        item.clone()
    }

    fn wrap_open_or_update<R, F>(
        &self,
        block: F,
    ) -> R
    where
        F: FnOnce() -> R,
    {
        self.store.run_in_unobserved_transaction(block)
    }
}

pub struct DeviceRelatedDataHelper<S> {
    store: Arc<S>,
}

impl<S: DataStore> DeviceRelatedDataHelper<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: DataStore> SingleCacheHelper for DeviceRelatedDataHelper<S> {
    type Internal = Option<Arc<DeviceRelatedData>>;
    type External = Option<Arc<DeviceRelatedData>>;

    fn open_item(&self) -> Result<Self::Internal> {
        DeviceRelatedData::load(&*self.store)
    }

    fn update_item(
        &self,
        item: &Self::Internal,
    ) -> Result<Self::Internal> {
        match item {
            Some(data) => data.update(&*self.store),
            None => self.open_item(),
        }
    }

    fn dispose_item(
        &self,
        _item: Self::Internal,
    ) -> Result<()> {
        Ok(())
    }

    fn prepare_for_user(
        &self,
        item: &Self::Internal,
    ) -> Self::External {
        item.clone()
    }

    fn wrap_open_or_update<R, F>(
        &self,
        block: F,
    ) -> R
    where
        F: FnOnce() -> R,
    {
        self.store.run_in_unobserved_transaction(block)
    }
}

pub struct UserLoginRelatedDataHelper<S> {
    store: Arc<S>,
}

impl<S: DataStore> UserLoginRelatedDataHelper<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: DataStore> CacheHelper<String> for UserLoginRelatedDataHelper<S> {
    type Internal = Option<Arc<UserLoginRelatedData>>;
    type External = Option<Arc<UserLoginRelatedData>>;

    fn open_item(
        &self,
        user_id: &String,
    ) -> Result<Self::Internal> {
        UserLoginRelatedData::load(user_id, &*self.store)
    }

    fn update_item(
        &self,
        user_id: &String,
        item: &Self::Internal,
    ) -> Result<Self::Internal> {
        match item {
            Some(data) => data.update(&*self.store),
            None => self.open_item(user_id),
        }
    }

    fn dispose_item(
        &self,
        _user_id: &String,
        _item: Self::Internal,
    ) -> Result<()> {
        Ok(())
    }

    fn prepare_for_user(
        &self,
        item: &Self::Internal,
    ) -> Self::External {
        item.clone()
    }

    fn wrap_open_or_update<R, F>(
        &self,
        block: F,
    ) -> R
    where
        F: FnOnce() -> R,
    {
        self.store.run_in_unobserved_transaction(block)
    }
}
