use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use super::close_delay::DelayedCore;
use super::close_delay::DelayedParent;
use super::SingleCacheConsumer;
use super::SingleCacheListener;
use super::SingleListenerRef;
use crate::config::GateConfig;
use crate::utils::Clock;
use crate::utils::MonotonicClock;
use crate::Result;

struct SingleParent<C, V> {
    consumer: C,
    _value: PhantomData<fn() -> V>,
}

impl<V, C> DelayedParent<()> for SingleParent<C, V>
where
    V: Send + Sync + 'static,
    C: SingleCacheConsumer<V> + 'static,
{
    type Value = V;
    type Listener = dyn SingleCacheListener<V>;

    fn open_ref(
        &self,
        _key: &(),
        listener: Option<SingleListenerRef<V>>,
    ) -> Result<V> {
        self.consumer.open(listener)
    }

    fn close_ref(
        &self,
        _key: &(),
        listener: Option<&SingleListenerRef<V>>,
    ) -> Result<()> {
        self.consumer.close(listener)
    }
}

enum SingleDelayMode<V, C> {
    PassThrough(Arc<C>),
    Delayed(Arc<DelayedCore<(), SingleParent<C, V>>>),
}

/// [`DelayedCloseCache`](super::DelayedCloseCache) for a single-key engine.
pub struct SingleDelayedCloseCache<V, C> {
    mode: SingleDelayMode<V, C>,
}

impl<V, C> Clone for SingleDelayedCloseCache<V, C> {
    fn clone(&self) -> Self {
        let mode = match &self.mode {
            SingleDelayMode::PassThrough(parent) => SingleDelayMode::PassThrough(parent.clone()),
            SingleDelayMode::Delayed(core) => SingleDelayMode::Delayed(core.clone()),
        };
        Self { mode }
    }
}

impl<V, C> SingleDelayedCloseCache<V, C>
where
    V: Send + Sync + 'static,
    C: SingleCacheConsumer<V> + 'static,
{
    pub fn new(
        name: &'static str,
        parent: C,
        delay: Duration,
        gate: &GateConfig,
    ) -> Self {
        Self::with_clock(name, parent, delay, gate.wipe_timer_floor(), Arc::new(MonotonicClock))
    }

    pub fn with_clock(
        name: &'static str,
        parent: C,
        delay: Duration,
        timer_floor: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if delay.is_zero() {
            return Self {
                mode: SingleDelayMode::PassThrough(Arc::new(parent)),
            };
        }

        let parent = SingleParent {
            consumer: parent,
            _value: PhantomData,
        };
        Self {
            mode: SingleDelayMode::Delayed(DelayedCore::spawn(name, parent, delay, timer_floor, clock)),
        }
    }

    pub fn parent(&self) -> &C {
        match &self.mode {
            SingleDelayMode::PassThrough(parent) => parent,
            SingleDelayMode::Delayed(core) => &core.parent().consumer,
        }
    }

    pub fn is_pass_through(&self) -> bool {
        matches!(self.mode, SingleDelayMode::PassThrough(_))
    }

    /// Returns whether the held reference was released
    pub fn run_pending_wipes(&self) -> Result<bool> {
        match &self.mode {
            SingleDelayMode::PassThrough(_) => Ok(false),
            SingleDelayMode::Delayed(core) => Ok(core.flush_expired()? > 0),
        }
    }

    pub fn has_pending_wipe(&self) -> bool {
        match &self.mode {
            SingleDelayMode::PassThrough(_) => false,
            SingleDelayMode::Delayed(core) => core.pending_wipes() > 0,
        }
    }

    pub fn active_users(&self) -> usize {
        match &self.mode {
            SingleDelayMode::PassThrough(_) => 0,
            SingleDelayMode::Delayed(core) => core.active_users(&()),
        }
    }
}

impl<V, C> SingleCacheConsumer<V> for SingleDelayedCloseCache<V, C>
where
    V: Send + Sync + 'static,
    C: SingleCacheConsumer<V> + 'static,
{
    fn open(
        &self,
        listener: Option<SingleListenerRef<V>>,
    ) -> Result<V> {
        match &self.mode {
            SingleDelayMode::PassThrough(parent) => parent.open(listener),
            SingleDelayMode::Delayed(core) => core.open(&(), listener),
        }
    }

    fn close(
        &self,
        listener: Option<&SingleListenerRef<V>>,
    ) -> Result<()> {
        match &self.mode {
            SingleDelayMode::PassThrough(parent) => parent.close(listener),
            SingleDelayMode::Delayed(core) => core.close(&(), listener),
        }
    }
}
