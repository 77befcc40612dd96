use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

use super::CacheListener;
use super::SingleCacheListener;

/// How an engine calls back one registered listener of an entry.
pub(crate) trait EntryListener<K, V> {
    fn notify(
        &self,
        key: &K,
        old_value: &V,
        new_value: &V,
    );
}

impl<K, V> EntryListener<K, V> for dyn CacheListener<K, V>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn notify(
        &self,
        key: &K,
        old_value: &V,
        new_value: &V,
    ) {
        self.on_element_updated(key, old_value, new_value);
    }
}

/// Single-key engines run on the keyed engine with `()` as their only key
impl<V> EntryListener<(), V> for dyn SingleCacheListener<V>
where
    V: Send + Sync + 'static,
{
    fn notify(
        &self,
        _key: &(),
        old_value: &V,
        new_value: &V,
    ) {
        self.on_element_updated(old_value, new_value);
    }
}

/// Listener identity is the allocation, not the value.
#[inline]
pub(crate) fn same_listener<L: ?Sized>(
    a: &Arc<L>,
    b: &Arc<L>,
) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Registered listener plus its liveness flag.
///
/// Delivery and close both take the holder's own lock, so once `close`
/// returns no delivery to this listener is running or will start.
pub(crate) struct ListenerHolder<L: ?Sized> {
    listener: Arc<L>,
    closed: Mutex<bool>,
}

impl<L: ?Sized> ListenerHolder<L> {
    fn new(listener: Arc<L>) -> Self {
        Self {
            listener,
            closed: Mutex::new(false),
        }
    }

    fn is(
        &self,
        other: &Arc<L>,
    ) -> bool {
        same_listener(&self.listener, other)
    }

    fn close(&self) {
        *self.closed.lock() = true;
    }

    /// Returns whether the listener was still live
    pub(crate) fn deliver<F>(
        &self,
        f: F,
    ) -> bool
    where
        F: FnOnce(&L),
    {
        let closed = self.closed.lock();
        if *closed {
            return false;
        }
        f(&self.listener);
        true
    }
}

/// Ordered listener set of one cache entry; insertion is idempotent by identity.
pub(crate) struct ListenerRegistry<L: ?Sized> {
    holders: Vec<Arc<ListenerHolder<L>>>,
}

impl<L: ?Sized> ListenerRegistry<L> {
    pub(crate) fn new() -> Self {
        Self { holders: Vec::new() }
    }

    pub(crate) fn add(
        &mut self,
        listener: Arc<L>,
    ) {
        if !self.holders.iter().any(|h| h.is(&listener)) {
            self.holders.push(Arc::new(ListenerHolder::new(listener)));
        }
    }

    /// Marks matching holders dead before dropping them
    pub(crate) fn remove(
        &mut self,
        listener: &Arc<L>,
    ) {
        self.holders.retain(|holder| {
            if holder.is(listener) {
                holder.close();
                false
            } else {
                true
            }
        });
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<ListenerHolder<L>>> {
        self.holders.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.holders.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }
}

/// Change forwarded by a [`ChannelListener`] registered on a single-key engine
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange<V> {
    pub old_value: V,
    pub new_value: V,
}

/// Change forwarded by a [`ChannelListener`] registered on a keyed engine
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedValueChange<K, V> {
    pub key: K,
    pub old_value: V,
    pub new_value: V,
}

/// Listener that posts every change to an unbounded channel and returns
/// immediately. Changes sent after the receiver is gone are dropped.
pub struct ChannelListener<M> {
    sender: mpsc::UnboundedSender<M>,
}

impl<M: Send + 'static> ChannelListener<M> {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<M>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self { sender }), receiver)
    }

    fn post(
        &self,
        message: M,
    ) {
        if self.sender.send(message).is_err() {
            trace!("change dropped, receiver closed");
        }
    }
}

impl<V> SingleCacheListener<V> for ChannelListener<ValueChange<V>>
where
    V: Clone + Send + Sync + 'static,
{
    fn on_element_updated(
        &self,
        old_value: &V,
        new_value: &V,
    ) {
        self.post(ValueChange {
            old_value: old_value.clone(),
            new_value: new_value.clone(),
        });
    }
}

impl<K, V> CacheListener<K, V> for ChannelListener<KeyedValueChange<K, V>>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn on_element_updated(
        &self,
        key: &K,
        old_value: &V,
        new_value: &V,
    ) {
        self.post(KeyedValueChange {
            key: key.clone(),
            old_value: old_value.clone(),
            new_value: new_value.clone(),
        });
    }
}
