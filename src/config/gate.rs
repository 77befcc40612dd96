use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::TEMP_LOCK_MAX_WAIT_MS;
use crate::constants::WIPE_TIMER_FLOOR_MS;
use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Longest wait (ms) of a TempLock acquisition before it proceeds unguarded
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// Minimum re-arm delay (ms) of the close-delay wipe timer
    #[serde(default = "default_wipe_timer_floor_ms")]
    pub wipe_timer_floor_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_wait_ms: default_max_wait_ms(),
            wipe_timer_floor_ms: default_wipe_timer_floor_ms(),
        }
    }
}

impl GateConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn wipe_timer_floor(&self) -> Duration {
        Duration::from_millis(self.wipe_timer_floor_ms)
    }

    pub(super) fn validate(&self) -> Result<()> {
        if self.max_wait_ms == 0 {
            return Err(Error::InvalidConfig("gate.max_wait_ms must be at least 1ms".into()));
        }

        if self.wipe_timer_floor_ms > self.max_wait_ms {
            return Err(Error::InvalidConfig(format!(
                "gate.wipe_timer_floor_ms ({}) must not exceed gate.max_wait_ms ({})",
                self.wipe_timer_floor_ms, self.max_wait_ms
            )));
        }

        Ok(())
    }
}

fn default_max_wait_ms() -> u64 {
    TEMP_LOCK_MAX_WAIT_MS
}
fn default_wipe_timer_floor_ms() -> u64 {
    WIPE_TIMER_FLOOR_MS
}
