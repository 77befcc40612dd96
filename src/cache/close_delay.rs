use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;
use tracing::error;
use tracing::trace;

use super::CacheConsumer;
use super::CacheListener;
use super::ListenerRef;
use crate::config::GateConfig;
use crate::metrics::CACHE_DELAYED_WIPE_TOTAL;
use crate::utils::timer::WipeTimer;
use crate::utils::Clock;
use crate::utils::MonotonicClock;
use crate::CacheMisuseError;
use crate::Result;

/// Engine side of a close-delay decorator
pub(super) trait DelayedParent<K>: Send + Sync + 'static {
    type Value;
    type Listener: ?Sized;

    fn open_ref(
        &self,
        key: &K,
        listener: Option<Arc<Self::Listener>>,
    ) -> Result<Self::Value>;

    fn close_ref(
        &self,
        key: &K,
        listener: Option<&Arc<Self::Listener>>,
    ) -> Result<()>;
}

pub(super) struct KeyedParent<C, V> {
    consumer: C,
    _value: PhantomData<fn() -> V>,
}

impl<K, V, C> DelayedParent<K> for KeyedParent<C, V>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    C: CacheConsumer<K, V> + 'static,
{
    type Value = V;
    type Listener = dyn CacheListener<K, V>;

    fn open_ref(
        &self,
        key: &K,
        listener: Option<ListenerRef<K, V>>,
    ) -> Result<V> {
        self.consumer.open(key, listener)
    }

    fn close_ref(
        &self,
        key: &K,
        listener: Option<&ListenerRef<K, V>>,
    ) -> Result<()> {
        self.consumer.close(key, listener)
    }
}

/// A tracked key is in exactly one of the two maps.
#[derive(Debug)]
struct WipeSchedule<K> {
    /// Logical opens per key, never 0
    user_counters: HashMap<K, usize>,
    wipe_times: HashMap<K, Instant>,
    /// May lag behind a cancelled wipe; the timer recomputes it on fire
    min_wipe_time: Option<Instant>,
}

/// Wipe bookkeeping shared by the keyed and single-key decorators
pub(super) struct DelayedCore<K, P> {
    name: &'static str,
    parent: P,
    delay: Duration,
    clock: Arc<dyn Clock>,
    schedule: Mutex<WipeSchedule<K>>,
    timer: WipeTimer,
}

impl<K, P> DelayedCore<K, P>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    P: DelayedParent<K>,
{
    pub(super) fn spawn(
        name: &'static str,
        parent: P,
        delay: Duration,
        timer_floor: Duration,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let timer = WipeTimer::spawn(name, timer_floor, move || match weak.upgrade() {
                Some(core) => {
                    if let Err(e) = core.flush_expired() {
                        error!(cache = core.name, "delayed wipe failed: {:?}", e);
                    }
                    true
                }
                None => false,
            });

            Self {
                name,
                parent,
                delay,
                clock,
                schedule: Mutex::new(WipeSchedule {
                    user_counters: HashMap::new(),
                    wipe_times: HashMap::new(),
                    min_wipe_time: None,
                }),
                timer,
            }
        })
    }

    pub(super) fn parent(&self) -> &P {
        &self.parent
    }

    pub(super) fn pending_wipes(&self) -> usize {
        self.schedule.lock().wipe_times.len()
    }

    pub(super) fn active_users(
        &self,
        key: &K,
    ) -> usize {
        self.schedule.lock().user_counters.get(key).copied().unwrap_or(0)
    }

    pub(super) fn open(
        &self,
        key: &K,
        listener: Option<Arc<P::Listener>>,
    ) -> Result<P::Value> {
        let first_open = {
            let mut schedule = self.schedule.lock();
            if schedule.wipe_times.remove(key).is_some() {
                schedule.user_counters.insert(key.clone(), 1);
                debug!(cache = self.name, ?key, "pending wipe cancelled");
                false
            } else {
                let counter = schedule.user_counters.entry(key.clone()).or_insert(0);
                *counter += 1;
                *counter == 1
            }
        };

        if first_open {
            if let Err(e) = self.parent.open_ref(key, None) {
                self.rollback_open(key, false);
                return Err(e);
            }
        }

        match self.parent.open_ref(key, listener) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.rollback_open(key, true);
                Err(e)
            }
        }
    }

    fn rollback_open(
        &self,
        key: &K,
        extra_held: bool,
    ) {
        if let Err(e) = self.release_user(key, extra_held) {
            error!(cache = self.name, ?key, "failed to roll back open: {:?}", e);
        }
    }

    pub(super) fn close(
        &self,
        key: &K,
        listener: Option<&Arc<P::Listener>>,
    ) -> Result<()> {
        if !self.schedule.lock().user_counters.contains_key(key) {
            error!(cache = self.name, ?key, "delayed close without matching open");
            return Err(CacheMisuseError::UnmatchedClose { cache: self.name }.into());
        }

        // listener must be gone from the parent before the wipe can run
        self.parent.close_ref(key, listener)?;
        self.release_user(key, true)
    }

    /// Drops one logical user. At zero the extra parent reference is either
    /// scheduled for release or, if it was never taken, simply forgotten.
    fn release_user(
        &self,
        key: &K,
        extra_held: bool,
    ) -> Result<()> {
        let mut schedule = self.schedule.lock();

        let Some(counter) = schedule.user_counters.get_mut(key) else {
            error!(cache = self.name, ?key, "delayed close without matching open");
            return Err(CacheMisuseError::UnmatchedClose { cache: self.name }.into());
        };

        *counter -= 1;
        if *counter > 0 {
            return Ok(());
        }

        schedule.user_counters.remove(key);
        if !extra_held {
            return Ok(());
        }

        let deadline = self.clock.now() + self.delay;
        schedule.wipe_times.insert(key.clone(), deadline);
        debug!(cache = self.name, ?key, "wipe scheduled in {:?}", self.delay);

        if schedule.min_wipe_time.map_or(true, |min| deadline < min) {
            schedule.min_wipe_time = Some(deadline);
            self.timer.arm(self.delay);
        }

        Ok(())
    }

    pub(super) fn flush_expired(&self) -> Result<usize> {
        let expired: Vec<K> = {
            let mut schedule = self.schedule.lock();
            let now = self.clock.now();

            let expired: Vec<K> = schedule
                .wipe_times
                .iter()
                .filter(|(_, deadline)| **deadline <= now)
                .map(|(key, _)| key.clone())
                .collect();
            for key in &expired {
                schedule.wipe_times.remove(key);
            }

            schedule.min_wipe_time = schedule.wipe_times.values().min().copied();
            match schedule.min_wipe_time {
                Some(next) => self.timer.arm(next.saturating_duration_since(now)),
                None => self.timer.disarm(),
            }

            expired
        };

        trace!(cache = self.name, expired = expired.len(), "wipe pass");

        let mut first_error = None;
        for key in &expired {
            debug!(cache = self.name, ?key, "releasing after close delay");
            CACHE_DELAYED_WIPE_TOTAL.with_label_values(&[self.name]).inc();
            if let Err(e) = self.parent.close_ref(key, None) {
                error!(cache = self.name, ?key, "release after close delay failed: {:?}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(expired.len()),
        }
    }
}

enum DelayMode<K, V, C> {
    PassThrough(Arc<C>),
    Delayed(Arc<DelayedCore<K, KeyedParent<C, V>>>),
}

/// Defers the real release of a key by a fixed grace period.
///
/// The first logical open of a key takes one extra reference on the parent
/// engine. When the last logical user closes, that reference is released
/// only after `delay`, unless the key is opened again first, in which case
/// the pending release is cancelled and the extra reference reused.
pub struct DelayedCloseCache<K, V, C> {
    mode: DelayMode<K, V, C>,
}

impl<K, V, C> Clone for DelayedCloseCache<K, V, C> {
    fn clone(&self) -> Self {
        let mode = match &self.mode {
            DelayMode::PassThrough(parent) => DelayMode::PassThrough(parent.clone()),
            DelayMode::Delayed(core) => DelayMode::Delayed(core.clone()),
        };
        Self { mode }
    }
}

impl<K, V, C> DelayedCloseCache<K, V, C>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
    C: CacheConsumer<K, V> + 'static,
{
    pub fn new(
        name: &'static str,
        parent: C,
        delay: Duration,
        gate: &GateConfig,
    ) -> Self {
        Self::with_clock(name, parent, delay, gate.wipe_timer_floor(), Arc::new(MonotonicClock))
    }

    /// A zero `delay` yields a pass-through wrapper.
    pub fn with_clock(
        name: &'static str,
        parent: C,
        delay: Duration,
        timer_floor: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if delay.is_zero() {
            return Self {
                mode: DelayMode::PassThrough(Arc::new(parent)),
            };
        }

        let parent = KeyedParent {
            consumer: parent,
            _value: PhantomData,
        };
        Self {
            mode: DelayMode::Delayed(DelayedCore::spawn(name, parent, delay, timer_floor, clock)),
        }
    }

    pub fn parent(&self) -> &C {
        match &self.mode {
            DelayMode::PassThrough(parent) => parent,
            DelayMode::Delayed(core) => &core.parent().consumer,
        }
    }

    pub fn is_pass_through(&self) -> bool {
        matches!(self.mode, DelayMode::PassThrough(_))
    }

    /// Releases every key whose grace period has elapsed, returning how many
    /// were released. The background timer calls this on its own.
    pub fn run_pending_wipes(&self) -> Result<usize> {
        match &self.mode {
            DelayMode::PassThrough(_) => Ok(0),
            DelayMode::Delayed(core) => core.flush_expired(),
        }
    }

    pub fn pending_wipes(&self) -> usize {
        match &self.mode {
            DelayMode::PassThrough(_) => 0,
            DelayMode::Delayed(core) => core.pending_wipes(),
        }
    }

    /// Logical users of `key` as seen by this wrapper
    pub fn active_users(
        &self,
        key: &K,
    ) -> usize {
        match &self.mode {
            DelayMode::PassThrough(_) => 0,
            DelayMode::Delayed(core) => core.active_users(key),
        }
    }
}

impl<K, V, C> CacheConsumer<K, V> for DelayedCloseCache<K, V, C>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
    C: CacheConsumer<K, V> + 'static,
{
    fn open(
        &self,
        key: &K,
        listener: Option<ListenerRef<K, V>>,
    ) -> Result<V> {
        match &self.mode {
            DelayMode::PassThrough(parent) => parent.open(key, listener),
            DelayMode::Delayed(core) => core.open(key, listener),
        }
    }

    fn close(
        &self,
        key: &K,
        listener: Option<&ListenerRef<K, V>>,
    ) -> Result<()> {
        match &self.mode {
            DelayMode::PassThrough(parent) => parent.close(key, listener),
            DelayMode::Delayed(core) => core.close(key, listener),
        }
    }
}
