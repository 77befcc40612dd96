//! Snapshots assembled from references into the leaf caches.
//!
//! A composite value holds one open reference per leaf snapshot it was
//! built from and records the key of each, so disposing it closes exactly
//! what it opened, even when the composite itself came out empty.

use std::sync::Arc;

use tracing::error;
use tracing::trace;

use super::DeviceRelatedData;
use super::DeviceRelatedDataConsumer;
use super::UserLoginRelatedData;
use super::UserLoginRelatedDataConsumer;
use super::UserRelatedData;
use super::UserRelatedDataConsumer;
use crate::cache::CacheConsumer;
use crate::cache::CacheHelper;
use crate::cache::CacheValue;
use crate::cache::SingleCacheConsumer;
use crate::cache::SingleCacheHelper;
use crate::store::DataStore;
use crate::Result;

/// The device snapshot and, while somebody is signed in, that user's snapshot.
#[derive(Debug)]
pub struct DeviceAndUserRelatedData {
    pub device_related_data: Arc<DeviceRelatedData>,
    pub user_related_data: Option<Arc<UserRelatedData>>,
}

/// Everything needed to decide whether a user may sign in on this device.
#[derive(Debug)]
pub struct CompleteUserLoginRelatedData {
    pub login_related_data: Arc<UserLoginRelatedData>,
    pub device_related_data: Arc<DeviceRelatedData>,
    /// Snapshot of the child owning the limit-login category, if one is set
    pub limit_login_category_user_related_data: Option<Arc<UserRelatedData>>,
}

/// An open reference on the user cache
#[derive(Debug)]
struct HeldUser {
    user_id: String,
    data: Option<Arc<UserRelatedData>>,
}

fn same_user(
    a: &Option<HeldUser>,
    b: &Option<HeldUser>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.user_id == b.user_id && a.data.same_instance(&b.data),
        _ => false,
    }
}

/// Cached value of the device-and-user engine
#[derive(Debug)]
pub struct DeviceAndUserHandle {
    device: Option<Arc<DeviceRelatedData>>,
    user: Option<HeldUser>,
    value: Option<Arc<DeviceAndUserRelatedData>>,
}

impl DeviceAndUserHandle {
    fn holds_same(
        &self,
        other: &Self,
    ) -> bool {
        self.device.same_instance(&other.device) && same_user(&self.user, &other.user)
    }
}

pub struct DeviceAndUserRelatedDataHelper<S: DataStore> {
    store: Arc<S>,
    device: DeviceRelatedDataConsumer<S>,
    users: UserRelatedDataConsumer<S>,
}

impl<S: DataStore> DeviceAndUserRelatedDataHelper<S> {
    pub fn new(
        store: Arc<S>,
        device: DeviceRelatedDataConsumer<S>,
        users: UserRelatedDataConsumer<S>,
    ) -> Self {
        Self { store, device, users }
    }
}

impl<S: DataStore> SingleCacheHelper for DeviceAndUserRelatedDataHelper<S> {
    type Internal = Arc<DeviceAndUserHandle>;
    type External = Option<Arc<DeviceAndUserRelatedData>>;

    fn open_item(&self) -> Result<Self::Internal> {
        let device = self.device.open(None)?;

        let current_user = device
            .as_ref()
            .map(|data| data.device.current_user_id.clone())
            .filter(|user_id| !user_id.is_empty());

        let user = match current_user {
            Some(user_id) => match self.users.open(&user_id, None) {
                Ok(data) => Some(HeldUser { user_id, data }),
                Err(e) => {
                    if let Err(close_error) = self.device.close(None) {
                        error!("failed to release device reference: {:?}", close_error);
                    }
                    return Err(e);
                }
            },
            None => None,
        };

        let value = device.as_ref().map(|device_related_data| {
            Arc::new(DeviceAndUserRelatedData {
                device_related_data: device_related_data.clone(),
                user_related_data: user.as_ref().and_then(|held| held.data.clone()),
            })
        });

        Ok(Arc::new(DeviceAndUserHandle { device, user, value }))
    }

    fn update_item(
        &self,
        item: &Self::Internal,
    ) -> Result<Self::Internal> {
        let fresh = self.open_item()?;
        if fresh.holds_same(item) {
            trace!("device and user related data unchanged");
            self.dispose_item(fresh)?;
            return Ok(item.clone());
        }

        Ok(fresh)
    }

    fn dispose_item(
        &self,
        item: Self::Internal,
    ) -> Result<()> {
        let device = self.device.close(None);
        let user = match &item.user {
            Some(held) => self.users.close(&held.user_id, None),
            None => Ok(()),
        };
        device.and(user)
    }

    fn prepare_for_user(
        &self,
        item: &Self::Internal,
    ) -> Self::External {
        item.value.clone()
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

/// Cached value of the complete-user-login engine
#[derive(Debug)]
pub struct CompleteUserLoginHandle {
    login: Option<Arc<UserLoginRelatedData>>,
    device: Option<Arc<DeviceRelatedData>>,
    limit_user: Option<HeldUser>,
    value: Option<Arc<CompleteUserLoginRelatedData>>,
}

impl CompleteUserLoginHandle {
    fn holds_same(
        &self,
        other: &Self,
    ) -> bool {
        self.login.same_instance(&other.login)
            && self.device.same_instance(&other.device)
            && same_user(&self.limit_user, &other.limit_user)
    }
}

pub struct CompleteUserLoginRelatedDataHelper<S: DataStore> {
    store: Arc<S>,
    logins: UserLoginRelatedDataConsumer<S>,
    device: DeviceRelatedDataConsumer<S>,
    users: UserRelatedDataConsumer<S>,
}

impl<S: DataStore> CompleteUserLoginRelatedDataHelper<S> {
    pub fn new(
        store: Arc<S>,
        logins: UserLoginRelatedDataConsumer<S>,
        device: DeviceRelatedDataConsumer<S>,
        users: UserRelatedDataConsumer<S>,
    ) -> Self {
        Self {
            store,
            logins,
            device,
            users,
        }
    }

    fn release_login(
        &self,
        user_id: &String,
    ) {
        if let Err(e) = self.logins.close(user_id, None) {
            error!(user = %user_id, "failed to release login reference: {:?}", e);
        }
    }
}

impl<S: DataStore> CacheHelper<String> for CompleteUserLoginRelatedDataHelper<S> {
    type Internal = Arc<CompleteUserLoginHandle>;
    type External = Option<Arc<CompleteUserLoginRelatedData>>;

    fn open_item(
        &self,
        user_id: &String,
    ) -> Result<Self::Internal> {
        let login = self.logins.open(user_id, None)?;

        let device = match self.device.open(None) {
            Ok(device) => device,
            Err(e) => {
                self.release_login(user_id);
                return Err(e);
            }
        };

        let limit_child = login
            .as_ref()
            .and_then(|data| data.limit_login_category.as_ref())
            .map(|category| category.child_id.clone());

        let limit_user = match limit_child {
            Some(child_id) => match self.users.open(&child_id, None) {
                Ok(data) => Some(HeldUser { user_id: child_id, data }),
                Err(e) => {
                    self.release_login(user_id);
                    if let Err(close_error) = self.device.close(None) {
                        error!("failed to release device reference: {:?}", close_error);
                    }
                    return Err(e);
                }
            },
            None => None,
        };

        let value = match (&login, &device) {
            (Some(login), Some(device)) => Some(Arc::new(CompleteUserLoginRelatedData {
                login_related_data: login.clone(),
                device_related_data: device.clone(),
                limit_login_category_user_related_data: limit_user.as_ref().and_then(|held| held.data.clone()),
            })),
            _ => None,
        };

        Ok(Arc::new(CompleteUserLoginHandle {
            login,
            device,
            limit_user,
            value,
        }))
    }

    fn update_item(
        &self,
        user_id: &String,
        item: &Self::Internal,
    ) -> Result<Self::Internal> {
        let fresh = self.open_item(user_id)?;
        if fresh.holds_same(item) {
            trace!(user = %user_id, "complete login data unchanged");
            self.dispose_item(user_id, fresh)?;
            return Ok(item.clone());
        }

        Ok(fresh)
    }

    fn dispose_item(
        &self,
        user_id: &String,
        item: Self::Internal,
    ) -> Result<()> {
        let login = self.logins.close(user_id, None);
        let device = self.device.close(None);
        let limit_user = match &item.limit_user {
            Some(held) => self.users.close(&held.user_id, None),
            None => Ok(()),
        };
        login.and(device).and(limit_user)
    }

    fn prepare_for_user(
        &self,
        item: &Self::Internal,
    ) -> Self::External {
        item.value.clone()
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
