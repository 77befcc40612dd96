//! Reference-counted, invalidation-aware object caches.
//!
//! An engine keeps exactly one live value per key, shared by every consumer
//! that opened it, and hands that value back to a [`CacheHelper`] for
//! disposal when the last consumer closes it. [`CacheOwner::refresh_all`]
//! asks the helper to refresh every live value and notifies listeners of the
//! entries that actually changed.
//!
//! # Change detection is identity-based
//!
//! A refresh is considered a no-op exactly when the helper returns the *same
//! instance* it was given ([`CacheValue::same_instance`]). Structural equality
//! is never consulted: a helper that rebuilds an equal value must return the
//! old handle if it wants listeners to stay quiet, and a helper that returns a
//! new handle always triggers a notification.
//!
//! # Listener contract
//!
//! Listeners are invoked synchronously from the refreshing thread while the
//! engine holds that listener's delivery lock. A listener must not call back
//! into the engine that notified it; it should forward the change to another
//! scheduler (see [`ChannelListener`]).

mod close_delay;
mod keyed;
mod listener;
mod single;
mod single_close_delay;
mod subscription;
mod temp_lock;

pub use close_delay::*;
pub use keyed::*;
pub use listener::*;
pub use single::*;
pub use single_close_delay::*;
pub use subscription::*;
pub use temp_lock::*;

#[cfg(test)]
mod single_close_delay_test;
#[cfg(test)]
mod subscription_test;

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::Result;

/// Values stored inside an engine.
pub trait CacheValue: Clone + Send + Sync + 'static {
    /// `true` when both handles refer to the same materialized instance
    fn same_instance(
        &self,
        other: &Self,
    ) -> bool;
}

impl<T: ?Sized + Send + Sync + 'static> CacheValue for Arc<T> {
    #[inline]
    fn same_instance(
        &self,
        other: &Self,
    ) -> bool {
        Arc::ptr_eq(self, other)
    }
}

/// `None` counts as the same instance as `None`.
impl<T: ?Sized + Send + Sync + 'static> CacheValue for Option<Arc<T>> {
    #[inline]
    fn same_instance(
        &self,
        other: &Self,
    ) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Strategy that materializes, refreshes and disposes the values of a keyed engine.
///
/// `open_item`, `update_item` and `dispose_item` may block on store I/O; the
/// engine calls them outside its bookkeeping lock wherever it can.
pub trait CacheHelper<K>: Send + Sync + 'static {
    type Internal: CacheValue;
    type External: Clone + Send + Sync + 'static;

    fn open_item(
        &self,
        key: &K,
    ) -> Result<Self::Internal>;

    /// Must return `item` itself when nothing changed
    fn update_item(
        &self,
        key: &K,
        item: &Self::Internal,
    ) -> Result<Self::Internal>;

    fn dispose_item(
        &self,
        key: &K,
        item: Self::Internal,
    ) -> Result<()>;

    fn prepare_for_user(
        &self,
        item: &Self::Internal,
    ) -> Self::External;

    /// Mutual exclusion imposed by the helper around every open and refresh,
    /// e.g. a read transaction of the backing store.
    fn wrap_open_or_update<R, F>(
        &self,
        block: F,
    ) -> R
    where
        F: FnOnce() -> R,
    {
        block()
    }
}

/// [`CacheHelper`] for a single implicit key.
pub trait SingleCacheHelper: Send + Sync + 'static {
    type Internal: CacheValue;
    type External: Clone + Send + Sync + 'static;

    fn open_item(&self) -> Result<Self::Internal>;

    /// Must return `item` itself when nothing changed
    fn update_item(
        &self,
        item: &Self::Internal,
    ) -> Result<Self::Internal>;

    fn dispose_item(
        &self,
        item: Self::Internal,
    ) -> Result<()>;

    fn prepare_for_user(
        &self,
        item: &Self::Internal,
    ) -> Self::External;

    fn wrap_open_or_update<R, F>(
        &self,
        block: F,
    ) -> R
    where
        F: FnOnce() -> R,
    {
        block()
    }
}

#[cfg_attr(test, automock)]
pub trait CacheListener<K: Send + Sync + 'static, V: Send + Sync + 'static>: Send + Sync {
    fn on_element_updated(
        &self,
        key: &K,
        old_value: &V,
        new_value: &V,
    );
}

#[cfg_attr(test, automock)]
pub trait SingleCacheListener<V: Send + Sync + 'static>: Send + Sync {
    fn on_element_updated(
        &self,
        old_value: &V,
        new_value: &V,
    );
}

pub type ListenerRef<K, V> = Arc<dyn CacheListener<K, V>>;
pub type SingleListenerRef<V> = Arc<dyn SingleCacheListener<V>>;

/// Consumer-facing side of a keyed engine.
///
/// Every successful `open` must be balanced by exactly one `close` with the
/// same key and listener, issued after the open returned.
pub trait CacheConsumer<K: 'static, V: 'static>: Send + Sync {
    fn open(
        &self,
        key: &K,
        listener: Option<ListenerRef<K, V>>,
    ) -> Result<V>;

    fn close(
        &self,
        key: &K,
        listener: Option<&ListenerRef<K, V>>,
    ) -> Result<()>;
}

/// Consumer-facing side of a single-key engine.
pub trait SingleCacheConsumer<V: 'static>: Send + Sync {
    fn open(
        &self,
        listener: Option<SingleListenerRef<V>>,
    ) -> Result<V>;

    fn close(
        &self,
        listener: Option<&SingleListenerRef<V>>,
    ) -> Result<()>;
}

/// Owner-facing side of an engine, driven by whoever knows the store changed.
pub trait CacheOwner: Send + Sync {
    fn refresh_all(&self) -> Result<()>;
}

impl<K: 'static, V: 'static, T: CacheConsumer<K, V> + ?Sized> CacheConsumer<K, V> for Arc<T> {
    fn open(
        &self,
        key: &K,
        listener: Option<ListenerRef<K, V>>,
    ) -> Result<V> {
        (**self).open(key, listener)
    }

    fn close(
        &self,
        key: &K,
        listener: Option<&ListenerRef<K, V>>,
    ) -> Result<()> {
        (**self).close(key, listener)
    }
}

impl<V: 'static, T: SingleCacheConsumer<V> + ?Sized> SingleCacheConsumer<V> for Arc<T> {
    fn open(
        &self,
        listener: Option<SingleListenerRef<V>>,
    ) -> Result<V> {
        (**self).open(listener)
    }

    fn close(
        &self,
        listener: Option<&SingleListenerRef<V>>,
    ) -> Result<()> {
        (**self).close(listener)
    }
}
