use std::sync::Arc;

use tracing::debug;
use tracing::error;

use super::*;
use crate::cache::CacheConsumer;
use crate::cache::CacheOwner;
use crate::cache::ListenerRef;
use crate::cache::SingleCacheConsumer;
use crate::cache::SingleListenerRef;
use crate::cache::SingleSubscription;
use crate::cache::Subscription;
use crate::constants::COMPLETE_USER_LOGIN_RELATED_DATA_CACHE;
use crate::constants::DEVICE_AND_USER_RELATED_DATA_CACHE;
use crate::constants::DEVICE_RELATED_DATA_CACHE;
use crate::constants::USER_LOGIN_RELATED_DATA_CACHE;
use crate::constants::USER_RELATED_DATA_CACHE;
use crate::store::DataStore;
use crate::utils::Clock;
use crate::utils::MonotonicClock;
use crate::Result;
use crate::Settings;

pub type UserRelatedDataSubscription<S> =
    Subscription<String, Option<Arc<UserRelatedData>>, UserRelatedDataConsumer<S>>;
pub type DeviceAndUserRelatedDataSubscription<S> =
    SingleSubscription<Option<Arc<DeviceAndUserRelatedData>>, DeviceAndUserRelatedDataConsumer<S>>;
pub type CompleteUserLoginRelatedDataSubscription<S> =
    Subscription<String, Option<Arc<CompleteUserLoginRelatedData>>, CompleteUserLoginRelatedDataConsumer<S>>;

struct DerivedDataInner<S: DataStore> {
    store: Arc<S>,

    user_cache: UserRelatedDataCache<S>,
    device_cache: DeviceRelatedDataCache<S>,
    user_login_cache: UserLoginRelatedDataCache<S>,
    device_and_user_cache: DeviceAndUserRelatedDataCache<S>,
    complete_user_login_cache: CompleteUserLoginRelatedDataCache<S>,

    users: UserRelatedDataConsumer<S>,
    device: DeviceRelatedDataConsumer<S>,
    user_logins: UserLoginRelatedDataConsumer<S>,
    device_and_user: DeviceAndUserRelatedDataConsumer<S>,
    complete_user_logins: CompleteUserLoginRelatedDataConsumer<S>,
}

impl<S: DataStore> DerivedDataInner<S> {
    /// Leaves first, so the composites pick up the refreshed leaf values.
    /// Every engine is refreshed even if an earlier one fails; the first
    /// failure is returned.
    fn refresh_all(&self) -> Result<()> {
        let owners: [(&'static str, &dyn CacheOwner); 5] = [
            (USER_RELATED_DATA_CACHE, &self.user_cache),
            (DEVICE_RELATED_DATA_CACHE, &self.device_cache),
            (USER_LOGIN_RELATED_DATA_CACHE, &self.user_login_cache),
            (DEVICE_AND_USER_RELATED_DATA_CACHE, &self.device_and_user_cache),
            (COMPLETE_USER_LOGIN_RELATED_DATA_CACHE, &self.complete_user_login_cache),
        ];

        let mut first_error = None;
        for (name, owner) in owners {
            if let Err(e) = owner.refresh_all() {
                error!(cache = name, "refresh failed: {:?}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Owns every derived-data cache of one store.
///
/// Construct it once and share it; cloning yields another handle to the
/// same caches. The caches refresh themselves after each commit of the
/// store.
pub struct DerivedData<S: DataStore> {
    inner: Arc<DerivedDataInner<S>>,
}

impl<S: DataStore> Clone for DerivedData<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: DataStore> DerivedData<S> {
    pub fn new(
        store: Arc<S>,
        settings: &Settings,
    ) -> Self {
        Self::with_clock(store, settings, Arc::new(MonotonicClock))
    }

    /// `clock` drives the close-delay deadlines
    pub fn with_clock(
        store: Arc<S>,
        settings: &Settings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let gate = &settings.gate;
        let delays = &settings.close_delay;
        let floor = gate.wipe_timer_floor();

        let user_cache = KeyedCache::new(
            USER_RELATED_DATA_CACHE,
            UserRelatedDataHelper::new(store.clone()),
            gate,
        );
        let users = DelayedCloseCache::with_clock(
            USER_RELATED_DATA_CACHE,
            user_cache.clone(),
            delays.user_related_data(),
            floor,
            clock.clone(),
        );

        let device_cache = SingleItemCache::new(
            DEVICE_RELATED_DATA_CACHE,
            DeviceRelatedDataHelper::new(store.clone()),
            gate,
        );
        let device = SingleDelayedCloseCache::with_clock(
            DEVICE_RELATED_DATA_CACHE,
            device_cache.clone(),
            delays.device_related_data(),
            floor,
            clock.clone(),
        );

        let user_login_cache = KeyedCache::new(
            USER_LOGIN_RELATED_DATA_CACHE,
            UserLoginRelatedDataHelper::new(store.clone()),
            gate,
        );
        let user_logins = DelayedCloseCache::with_clock(
            USER_LOGIN_RELATED_DATA_CACHE,
            user_login_cache.clone(),
            delays.user_login_related_data(),
            floor,
            clock.clone(),
        );

        let device_and_user_cache = SingleItemCache::new(
            DEVICE_AND_USER_RELATED_DATA_CACHE,
            DeviceAndUserRelatedDataHelper::new(store.clone(), device.clone(), users.clone()),
            gate,
        );
        let device_and_user = SingleDelayedCloseCache::with_clock(
            DEVICE_AND_USER_RELATED_DATA_CACHE,
            device_and_user_cache.clone(),
            delays.composite(),
            floor,
            clock.clone(),
        );

        let complete_user_login_cache = KeyedCache::new(
            COMPLETE_USER_LOGIN_RELATED_DATA_CACHE,
            CompleteUserLoginRelatedDataHelper::new(store.clone(), user_logins.clone(), device.clone(), users.clone()),
            gate,
        );
        let complete_user_logins = DelayedCloseCache::with_clock(
            COMPLETE_USER_LOGIN_RELATED_DATA_CACHE,
            complete_user_login_cache.clone(),
            delays.composite(),
            floor,
            clock,
        );

        let inner = Arc::new(DerivedDataInner {
            store: store.clone(),
            user_cache,
            device_cache,
            user_login_cache,
            device_and_user_cache,
            complete_user_login_cache,
            users,
            device,
            user_logins,
            device_and_user,
            complete_user_logins,
        });

        let weak = Arc::downgrade(&inner);
        store.register_commit_listener(Box::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Err(e) = inner.refresh_all() {
                error!("refresh after commit failed: {:?}", e);
            }
        }));

        debug!("derived data caches ready");
        Self { inner }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.inner.store
    }

    /// Current device and signed-in user, without keeping them subscribed.
    /// Returns `None` while the own device is not configured.
    pub fn user_and_device_related_data(&self) -> Result<Option<Arc<DeviceAndUserRelatedData>>> {
        let consumer = &self.inner.device_and_user;
        let value = consumer.open(None)?;
        consumer.close(None)?;
        Ok(value)
    }

    /// Sign-in data of `user_id`, without keeping it subscribed. Returns
    /// `None` when the user or the own device is missing.
    pub fn user_login_related_data(
        &self,
        user_id: &str,
    ) -> Result<Option<Arc<CompleteUserLoginRelatedData>>> {
        let consumer = &self.inner.complete_user_logins;
        let key = user_id.to_string();
        let value = consumer.open(&key, None)?;
        consumer.close(&key, None)?;
        Ok(value)
    }

    pub fn subscribe_user_related_data(
        &self,
        user_id: &str,
        listener: ListenerRef<String, Option<Arc<UserRelatedData>>>,
    ) -> Result<(UserRelatedDataSubscription<S>, Option<Arc<UserRelatedData>>)> {
        Subscription::open(self.inner.users.clone(), user_id.to_string(), listener)
    }

    pub fn subscribe_user_and_device_related_data(
        &self,
        listener: SingleListenerRef<Option<Arc<DeviceAndUserRelatedData>>>,
    ) -> Result<(
        DeviceAndUserRelatedDataSubscription<S>,
        Option<Arc<DeviceAndUserRelatedData>>,
    )> {
        SingleSubscription::open(self.inner.device_and_user.clone(), listener)
    }

    pub fn subscribe_user_login_related_data(
        &self,
        user_id: &str,
        listener: ListenerRef<String, Option<Arc<CompleteUserLoginRelatedData>>>,
    ) -> Result<(
        CompleteUserLoginRelatedDataSubscription<S>,
        Option<Arc<CompleteUserLoginRelatedData>>,
    )> {
        Subscription::open(self.inner.complete_user_logins.clone(), user_id.to_string(), listener)
    }

    /// Refreshes every cache, leaves first
    pub fn refresh_all(&self) -> Result<()> {
        self.inner.refresh_all()
    }

    /// Releases every entry whose close delay has elapsed, composites first.
    /// Returns how many were released. The wipe timers do this on their own.
    pub fn run_pending_wipes(&self) -> Result<usize> {
        let inner = &self.inner;
        let mut released = inner.complete_user_logins.run_pending_wipes()?;
        released += usize::from(inner.device_and_user.run_pending_wipes()?);
        released += inner.user_logins.run_pending_wipes()?;
        released += inner.users.run_pending_wipes()?;
        released += usize::from(inner.device.run_pending_wipes()?);
        Ok(released)
    }

    pub fn user_related_data_cache(&self) -> &UserRelatedDataCache<S> {
        &self.inner.user_cache
    }

    pub fn device_related_data_cache(&self) -> &DeviceRelatedDataCache<S> {
        &self.inner.device_cache
    }

    pub fn user_login_related_data_cache(&self) -> &UserLoginRelatedDataCache<S> {
        &self.inner.user_login_cache
    }

    pub fn device_and_user_related_data_cache(&self) -> &DeviceAndUserRelatedDataCache<S> {
        &self.inner.device_and_user_cache
    }

    pub fn complete_user_login_related_data_cache(&self) -> &CompleteUserLoginRelatedDataCache<S> {
        &self.inner.complete_user_login_cache
    }
}

impl<S: DataStore> CacheOwner for DerivedData<S> {
    fn refresh_all(&self) -> Result<()> {
        self.inner.refresh_all()
    }
}
