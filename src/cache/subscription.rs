use std::fmt::Debug;
use std::marker::PhantomData;

use tracing::error;

use super::CacheConsumer;
use super::ListenerRef;
use super::SingleCacheConsumer;
use super::SingleListenerRef;
use crate::Result;

/// Keeps one key of a keyed cache open with a listener attached.
///
/// Dropping the guard closes the key with the same listener. Use
/// [`Subscription::close`] to observe the close result instead.
pub struct Subscription<K, V, C>
where
    K: Debug + 'static,
    V: 'static,
    C: CacheConsumer<K, V>,
{
    consumer: C,
    key: K,
    listener: ListenerRef<K, V>,
    open: bool,
}

impl<K, V, C> Subscription<K, V, C>
where
    K: Debug + 'static,
    V: 'static,
    C: CacheConsumer<K, V>,
{
    /// Returns the guard together with the value current at open time
    pub fn open(
        consumer: C,
        key: K,
        listener: ListenerRef<K, V>,
    ) -> Result<(Self, V)> {
        let value = consumer.open(&key, Some(listener.clone()))?;
        Ok((
            Self {
                consumer,
                key,
                listener,
                open: true,
            },
            value,
        ))
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.consumer.close(&self.key, Some(&self.listener))
    }
}

impl<K, V, C> Drop for Subscription<K, V, C>
where
    K: Debug + 'static,
    V: 'static,
    C: CacheConsumer<K, V>,
{
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            error!(key = ?self.key, "failed to close subscription: {:?}", e);
        }
    }
}

/// [`Subscription`] for a single-key cache.
pub struct SingleSubscription<V, C>
where
    V: 'static,
    C: SingleCacheConsumer<V>,
{
    consumer: C,
    listener: SingleListenerRef<V>,
    open: bool,
    _value: PhantomData<fn() -> V>,
}

impl<V, C> SingleSubscription<V, C>
where
    V: 'static,
    C: SingleCacheConsumer<V>,
{
    pub fn open(
        consumer: C,
        listener: SingleListenerRef<V>,
    ) -> Result<(Self, V)> {
        let value = consumer.open(Some(listener.clone()))?;
        Ok((
            Self {
                consumer,
                listener,
                open: true,
                _value: PhantomData,
            },
            value,
        ))
    }

    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.consumer.close(Some(&self.listener))
    }
}

impl<V, C> Drop for SingleSubscription<V, C>
where
    V: 'static,
    C: SingleCacheConsumer<V>,
{
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            error!("failed to close subscription: {:?}", e);
        }
    }
}
