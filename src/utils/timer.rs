use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Condvar;
use parking_lot::Mutex;
use parking_lot::MutexGuard;
use tracing::error;
use tracing::trace;

struct TimerState {
    deadline: Option<Instant>,
    shutdown: bool,
}

struct TimerShared {
    state: Mutex<TimerState>,
    wakeup: Condvar,
}

/// One re-armable deadline served by a dedicated thread.
///
/// Arming replaces any pending deadline. The callback runs without the
/// timer lock held; returning `false` from it stops the thread. Dropping
/// the timer stops the thread as well, without joining it.
pub(crate) struct WipeTimer {
    shared: Arc<TimerShared>,
    floor: Duration,
}

impl WipeTimer {
    pub(crate) fn spawn<F>(
        name: &'static str,
        floor: Duration,
        on_fire: F,
    ) -> Self
    where
        F: Fn() -> bool + Send + 'static,
    {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState {
                deadline: None,
                shutdown: false,
            }),
            wakeup: Condvar::new(),
        });

        let thread_shared = shared.clone();
        if let Err(e) = thread::Builder::new()
            .name(format!("{}-wipe", name))
            .spawn(move || Self::run(thread_shared, on_fire))
        {
            error!(cache = name, "failed to start wipe timer thread: {:?}", e);
        }

        Self { shared, floor }
    }

    fn run<F>(
        shared: Arc<TimerShared>,
        on_fire: F,
    ) where
        F: Fn() -> bool,
    {
        let mut state = shared.state.lock();
        loop {
            if state.shutdown {
                break;
            }

            match state.deadline {
                None => shared.wakeup.wait(&mut state),
                Some(deadline) if Instant::now() >= deadline => {
                    state.deadline = None;
                    let keep_running = MutexGuard::unlocked(&mut state, &on_fire);
                    if !keep_running {
                        break;
                    }
                }
                Some(deadline) => {
                    let _ = shared.wakeup.wait_until(&mut state, deadline);
                }
            }
        }
        trace!("wipe timer stopped");
    }

    /// Fire after `delay`, never sooner than the configured floor
    pub(crate) fn arm(
        &self,
        delay: Duration,
    ) {
        let mut state = self.shared.state.lock();
        state.deadline = Some(Instant::now() + delay.max(self.floor));
        self.shared.wakeup.notify_one();
    }

    pub(crate) fn disarm(&self) {
        let mut state = self.shared.state.lock();
        state.deadline = None;
        self.shared.wakeup.notify_one();
    }
}

impl Drop for WipeTimer {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.shutdown = true;
        self.shared.wakeup.notify_one();
    }
}
