//! Read models derived from the store, kept alive and current by the caches.
//!
//! Snapshots are immutable. Each registers with the store's invalidation
//! tracker before reading, collects the changed tables as dirty flags, and
//! rebuilds only the dirty parts when asked to update. An update of a clean
//! snapshot returns the same `Arc`, which the cache engines take as "no
//! change".
//!
//! [`DerivedData`] wires one engine per snapshot kind, wraps each in its
//! close-delay decorator and refreshes all of them after every commit.

mod category;
mod composite;
mod derived_data;
mod device;
mod helpers;
mod time_zone;
mod user;
mod user_login;

pub use category::*;
pub use composite::*;
pub use derived_data::*;
pub use device::*;
pub use helpers::*;
pub use time_zone::*;
pub use user::*;
pub use user_login::*;

#[cfg(test)]
mod category_test;
#[cfg(test)]
mod composite_test;
#[cfg(test)]
mod device_test;
#[cfg(test)]
mod time_zone_test;

use std::sync::Arc;

use crate::cache::DelayedCloseCache;
use crate::cache::KeyedCache;
use crate::cache::SingleDelayedCloseCache;
use crate::cache::SingleItemCache;

pub type UserRelatedDataCache<S> = KeyedCache<String, UserRelatedDataHelper<S>>;
pub type UserRelatedDataConsumer<S> = DelayedCloseCache<String, Option<Arc<UserRelatedData>>, UserRelatedDataCache<S>>;

pub type DeviceRelatedDataCache<S> = SingleItemCache<DeviceRelatedDataHelper<S>>;
pub type DeviceRelatedDataConsumer<S> = SingleDelayedCloseCache<Option<Arc<DeviceRelatedData>>, DeviceRelatedDataCache<S>>;

pub type UserLoginRelatedDataCache<S> = KeyedCache<String, UserLoginRelatedDataHelper<S>>;
pub type UserLoginRelatedDataConsumer<S> =
    DelayedCloseCache<String, Option<Arc<UserLoginRelatedData>>, UserLoginRelatedDataCache<S>>;

pub type DeviceAndUserRelatedDataCache<S> = SingleItemCache<DeviceAndUserRelatedDataHelper<S>>;
pub type DeviceAndUserRelatedDataConsumer<S> =
    SingleDelayedCloseCache<Option<Arc<DeviceAndUserRelatedData>>, DeviceAndUserRelatedDataCache<S>>;

pub type CompleteUserLoginRelatedDataCache<S> = KeyedCache<String, CompleteUserLoginRelatedDataHelper<S>>;
pub type CompleteUserLoginRelatedDataConsumer<S> =
    DelayedCloseCache<String, Option<Arc<CompleteUserLoginRelatedData>>, CompleteUserLoginRelatedDataCache<S>>;
