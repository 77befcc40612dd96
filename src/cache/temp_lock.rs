use std::time::Duration;
use std::time::Instant;

use parking_lot::Condvar;
use parking_lot::Mutex;
use tracing::warn;

use crate::config::GateConfig;

#[derive(Debug, Default)]
struct GateState {
    openers: usize,
    sweeping: bool,
    sweepers_waiting: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateMode {
    Shared,
    Exclusive,
}

/// Gate between bulk refresh sweeps and individual opens.
///
/// Any number of opens may be inside at once, or one sweep, never both.
/// A waiting sweep holds back new opens so it cannot starve. No acquisition
/// waits longer than `max_wait`: after that it proceeds unguarded and logs a
/// warning, relying on the engine's revalidation for correctness.
pub struct TempLock {
    name: &'static str,
    state: Mutex<GateState>,
    changed: Condvar,
    max_wait: Duration,
}

/// Releases whatever the acquisition actually obtained
struct TempLockGuard<'a> {
    lock: &'a TempLock,
    held: Option<GateMode>,
}

impl TempLock {
    pub fn new(
        name: &'static str,
        config: &GateConfig,
    ) -> Self {
        Self {
            name,
            state: Mutex::new(GateState::default()),
            changed: Condvar::new(),
            max_wait: config.max_wait(),
        }
    }

    /// Run an open inside the gate
    pub fn with_shared<R, F>(
        &self,
        block: F,
    ) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.enter(GateMode::Shared);
        block()
    }

    /// Run a sweep inside the gate
    pub fn with_exclusive<R, F>(
        &self,
        block: F,
    ) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.enter(GateMode::Exclusive);
        block()
    }

    fn enter(
        &self,
        mode: GateMode,
    ) -> TempLockGuard<'_> {
        let deadline = Instant::now() + self.max_wait;
        let mut state = self.state.lock();

        match mode {
            GateMode::Shared => {
                while state.sweeping || state.sweepers_waiting > 0 {
                    if self.changed.wait_until(&mut state, deadline).timed_out() {
                        warn!(cache = self.name, "open proceeds without gate after {:?}", self.max_wait);
                        return TempLockGuard { lock: self, held: None };
                    }
                }
                state.openers += 1;
            }
            GateMode::Exclusive => {
                state.sweepers_waiting += 1;
                while state.sweeping || state.openers > 0 {
                    if self.changed.wait_until(&mut state, deadline).timed_out() {
                        state.sweepers_waiting -= 1;
                        self.changed.notify_all();
                        warn!(cache = self.name, "refresh proceeds without gate after {:?}", self.max_wait);
                        return TempLockGuard { lock: self, held: None };
                    }
                }
                state.sweepers_waiting -= 1;
                state.sweeping = true;
            }
        }

        TempLockGuard {
            lock: self,
            held: Some(mode),
        }
    }

    #[cfg(test)]
    pub(crate) fn openers(&self) -> usize {
        self.state.lock().openers
    }

    #[cfg(test)]
    pub(crate) fn is_sweeping(&self) -> bool {
        self.state.lock().sweeping
    }
}

impl Drop for TempLockGuard<'_> {
    fn drop(&mut self) {
        let Some(mode) = self.held else {
            return;
        };

        let mut state = self.lock.state.lock();
        match mode {
            GateMode::Shared => state.openers -= 1,
            GateMode::Exclusive => state.sweeping = false,
        }
        self.lock.changed.notify_all();
    }
}
