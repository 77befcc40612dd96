use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use tracing::error;
use tracing::trace;

use super::listener::EntryListener;
use super::listener::ListenerRegistry;
use super::CacheConsumer;
use super::CacheHelper;
use super::CacheListener;
use super::CacheOwner;
use super::CacheValue;
use super::ListenerRef;
use super::TempLock;
use crate::config::GateConfig;
use crate::metrics::CACHE_DISPOSE_TOTAL;
use crate::metrics::CACHE_NOTIFY_TOTAL;
use crate::metrics::CACHE_OPEN_TOTAL;
use crate::metrics::CACHE_STALE_UPDATE_TOTAL;
use crate::CacheMisuseError;
use crate::Result;

struct CacheElement<I, L: ?Sized> {
    /// Distinguishes this entry from a later one under the same key
    id: u64,
    value: I,
    users: usize,
    listeners: ListenerRegistry<L>,
}

struct KeyedCacheInner<K, H: CacheHelper<K>, L: ?Sized> {
    name: &'static str,
    helper: H,
    // refcount == 0 <=> key absent
    elements: Mutex<HashMap<K, CacheElement<H::Internal, L>>>,
    next_id: AtomicU64,
    gate: TempLock,
}

/// Keyed cache engine: `Key -> (value, refcount, listeners)`.
///
/// `L` is the kind of listener entries notify. Consumers of the public
/// engine register [`CacheListener`]s; [`SingleItemCache`](super::SingleItemCache)
/// runs this engine with `()` as key and its own listener kind.
///
/// Cloning is cheap and yields a handle to the same engine.
pub struct KeyedCache<K, H, L = dyn CacheListener<K, <H as CacheHelper<K>>::External>>
where
    K: Send + Sync + 'static,
    H: CacheHelper<K>,
    L: ?Sized + 'static,
{
    inner: Arc<KeyedCacheInner<K, H, L>>,
}

impl<K, H, L> Clone for KeyedCache<K, H, L>
where
    K: Send + Sync + 'static,
    H: CacheHelper<K>,
    L: ?Sized + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, H> KeyedCache<K, H>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    H: CacheHelper<K>,
{
    pub fn new(
        name: &'static str,
        helper: H,
        gate: &GateConfig,
    ) -> Self {
        Self::build(name, helper, gate)
    }

    pub fn with_defaults(
        name: &'static str,
        helper: H,
    ) -> Self {
        Self::new(name, helper, &GateConfig::default())
    }
}

impl<K, H, L> KeyedCache<K, H, L>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    H: CacheHelper<K>,
    L: EntryListener<K, H::External> + ?Sized + 'static,
{
    pub(crate) fn build(
        name: &'static str,
        helper: H,
        gate: &GateConfig,
    ) -> Self {
        Self {
            inner: Arc::new(KeyedCacheInner {
                name,
                helper,
                elements: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                gate: TempLock::new(name, gate),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn helper(&self) -> &H {
        &self.inner.helper
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.inner.elements.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Outstanding opens for `key`, 0 when absent
    pub fn users(
        &self,
        key: &K,
    ) -> usize {
        self.inner.elements.lock().get(key).map_or(0, |e| e.users)
    }

    pub fn listener_count(
        &self,
        key: &K,
    ) -> usize {
        self.inner
            .elements
            .lock()
            .get(key)
            .map_or(0, |e| e.listeners.len())
    }

    fn dispose(
        &self,
        key: &K,
        value: H::Internal,
    ) -> Result<()> {
        CACHE_DISPOSE_TOTAL.with_label_values(&[self.inner.name]).inc();
        self.inner.helper.dispose_item(key, value)
    }

    /// One refresh step for a single entry.
    ///
    /// `id` and `old_value` are what the caller observed under the lock; the
    /// helper result is only installed if both still match afterwards.
    fn refresh_entry(
        &self,
        key: &K,
        id: u64,
        old_value: H::Internal,
    ) -> Result<()> {
        let helper = &self.inner.helper;
        let new_value = helper.update_item(key, &old_value)?;

        if new_value.same_instance(&old_value) {
            return Ok(());
        }

        let listeners = {
            let mut elements = self.inner.elements.lock();
            match elements.get_mut(key) {
                Some(element) if element.id == id && element.value.same_instance(&old_value) => {
                    element.value = new_value.clone();
                    Some(element.listeners.snapshot())
                }
                _ => None,
            }
        };

        let Some(listeners) = listeners else {
            debug!(cache = self.inner.name, ?key, "entry changed during refresh, discarding result");
            CACHE_STALE_UPDATE_TOTAL.with_label_values(&[self.inner.name]).inc();
            return self.dispose(key, new_value);
        };

        trace!(cache = self.inner.name, ?key, listeners = listeners.len(), "value replaced");

        if !listeners.is_empty() {
            let old_external = helper.prepare_for_user(&old_value);
            let new_external = helper.prepare_for_user(&new_value);

            for holder in listeners {
                let delivered = holder.deliver(|listener| listener.notify(key, &old_external, &new_external));
                if delivered {
                    CACHE_NOTIFY_TOTAL.with_label_values(&[self.inner.name]).inc();
                }
            }
        }

        // superseded
        self.dispose(key, old_value)
    }

    pub(crate) fn open_with(
        &self,
        key: &K,
        listener: Option<Arc<L>>,
    ) -> Result<H::External> {
        let inner = &self.inner;
        inner
            .helper
            .wrap_open_or_update(|| inner.gate.with_shared(|| self.open_sync(key, listener)))
    }

    fn open_sync(
        &self,
        key: &K,
        listener: Option<Arc<L>>,
    ) -> Result<H::External> {
        let existing = {
            let mut elements = self.inner.elements.lock();
            elements.get_mut(key).map(|element| {
                element.users += 1;
                (element.id, element.value.clone())
            })
        };

        if let Some((id, value)) = existing {
            if let Err(e) = self.refresh_entry(key, id, value) {
                if let Err(close_error) = self.close_with(key, None) {
                    error!(cache = self.inner.name, ?key, "failed to release reference after refresh error: {:?}", close_error);
                }
                return Err(e);
            }

            let mut elements = self.inner.elements.lock();
            let element = match elements.get_mut(key) {
                Some(element) if element.id == id => element,
                _ => {
                    error!(cache = self.inner.name, ?key, "entry vanished while opening");
                    return Err(CacheMisuseError::EntryVanished { cache: self.inner.name }.into());
                }
            };

            if let Some(listener) = listener {
                element.listeners.add(listener);
            }
            CACHE_OPEN_TOTAL.with_label_values(&[self.inner.name, "hit"]).inc();
            return Ok(self.inner.helper.prepare_for_user(&element.value));
        }

        let value = self.inner.helper.open_item(key)?;

        let raced = {
            let mut elements = self.inner.elements.lock();
            if let Some(element) = elements.get_mut(key) {
                element.users += 1;
                if let Some(listener) = listener {
                    element.listeners.add(listener);
                }
                self.inner.helper.prepare_for_user(&element.value)
            } else {
                let mut listeners = ListenerRegistry::new();
                if let Some(listener) = listener {
                    listeners.add(listener);
                }
                let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                let external = self.inner.helper.prepare_for_user(&value);
                elements.insert(
                    key.clone(),
                    CacheElement {
                        id,
                        value,
                        users: 1,
                        listeners,
                    },
                );
                debug!(cache = self.inner.name, ?key, id, "entry created");
                CACHE_OPEN_TOTAL.with_label_values(&[self.inner.name, "new"]).inc();
                return Ok(external);
            }
        };

        // Another open created the entry while we were loading
        CACHE_OPEN_TOTAL.with_label_values(&[self.inner.name, "raced"]).inc();
        self.dispose(key, value)?;
        Ok(raced)
    }

    pub(crate) fn close_with(
        &self,
        key: &K,
        listener: Option<&Arc<L>>,
    ) -> Result<()> {
        let name = self.inner.name;
        let mut elements = self.inner.elements.lock();

        let Some(element) = elements.get_mut(key) else {
            error!(cache = name, ?key, "close without matching open");
            return Err(CacheMisuseError::UnmatchedClose { cache: name }.into());
        };

        if let Some(listener) = listener {
            element.listeners.remove(listener);
        }

        if element.users == 0 {
            debug_assert!(false, "[{}] entry with zero users was still stored", name);
            error!(cache = name, ?key, "refcount would become negative");
            return Err(CacheMisuseError::NegativeRefcount { cache: name }.into());
        }

        element.users -= 1;
        if element.users > 0 {
            return Ok(());
        }

        if !element.listeners.is_empty() {
            let listeners = element.listeners.len();
            // keep the entry alive rather than dispose a value someone still observes
            element.users = 1;
            error!(cache = name, ?key, listeners, "last close left listeners behind");
            return Err(CacheMisuseError::ListenersOnDispose { cache: name, listeners }.into());
        }

        let Some(element) = elements.remove(key) else {
            return Ok(());
        };
        debug!(cache = name, ?key, id = element.id, "entry disposed");
        self.dispose(key, element.value)
    }

    fn refresh_all_sync(&self) -> Result<()> {
        let snapshot: Vec<(K, u64, H::Internal)> = {
            let elements = self.inner.elements.lock();
            elements
                .iter()
                .filter(|(_, element)| element.users > 0)
                .map(|(key, element)| (key.clone(), element.id, element.value.clone()))
                .collect()
        };

        trace!(cache = self.inner.name, entries = snapshot.len(), "refreshing");

        for (key, id, value) in snapshot {
            self.refresh_entry(&key, id, value)?;
        }

        Ok(())
    }
}

impl<K, H> CacheConsumer<K, H::External> for KeyedCache<K, H>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    H: CacheHelper<K>,
{
    fn open(
        &self,
        key: &K,
        listener: Option<ListenerRef<K, H::External>>,
    ) -> Result<H::External> {
        self.open_with(key, listener)
    }

    fn close(
        &self,
        key: &K,
        listener: Option<&ListenerRef<K, H::External>>,
    ) -> Result<()> {
        self.close_with(key, listener)
    }
}

impl<K, H, L> CacheOwner for KeyedCache<K, H, L>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    H: CacheHelper<K>,
    L: EntryListener<K, H::External> + ?Sized + Send + Sync + 'static,
{
    fn refresh_all(&self) -> Result<()> {
        let inner = &self.inner;
        inner
            .helper
            .wrap_open_or_update(|| inner.gate.with_exclusive(|| self.refresh_all_sync()))
    }
}
