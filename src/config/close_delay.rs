use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::COMPOSITE_CLOSE_DELAY_MS;
use crate::constants::DEVICE_RELATED_DATA_CLOSE_DELAY_MS;
use crate::constants::MAX_CLOSE_DELAY_MS;
use crate::constants::USER_LOGIN_RELATED_DATA_CLOSE_DELAY_MS;
use crate::constants::USER_RELATED_DATA_CLOSE_DELAY_MS;
use crate::Error;
use crate::Result;

/// Grace periods (milliseconds) between the last close and the real wipe.
/// A value of 0 turns the decorator into a pass-through.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CloseDelayConfig {
    #[serde(default = "default_user_related_data_ms")]
    pub user_related_data_ms: u64,

    #[serde(default = "default_device_related_data_ms")]
    pub device_related_data_ms: u64,

    #[serde(default = "default_user_login_related_data_ms")]
    pub user_login_related_data_ms: u64,

    /// Shared by both composite caches
    #[serde(default = "default_composite_ms")]
    pub composite_ms: u64,
}

impl Default for CloseDelayConfig {
    fn default() -> Self {
        Self {
            user_related_data_ms: default_user_related_data_ms(),
            device_related_data_ms: default_device_related_data_ms(),
            user_login_related_data_ms: default_user_login_related_data_ms(),
            composite_ms: default_composite_ms(),
        }
    }
}

impl CloseDelayConfig {
    /// Every delay disabled; used by tests that want immediate disposal
    pub fn disabled() -> Self {
        Self {
            user_related_data_ms: 0,
            device_related_data_ms: 0,
            user_login_related_data_ms: 0,
            composite_ms: 0,
        }
    }

    pub fn user_related_data(&self) -> Duration {
        Duration::from_millis(self.user_related_data_ms)
    }

    pub fn device_related_data(&self) -> Duration {
        Duration::from_millis(self.device_related_data_ms)
    }

    pub fn user_login_related_data(&self) -> Duration {
        Duration::from_millis(self.user_login_related_data_ms)
    }

    pub fn composite(&self) -> Duration {
        Duration::from_millis(self.composite_ms)
    }

    pub(super) fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("user_related_data_ms", self.user_related_data_ms),
            ("device_related_data_ms", self.device_related_data_ms),
            ("user_login_related_data_ms", self.user_login_related_data_ms),
            ("composite_ms", self.composite_ms),
        ] {
            if value > MAX_CLOSE_DELAY_MS {
                return Err(Error::InvalidConfig(format!(
                    "close_delay.{} = {} exceeds the maximum of {}ms",
                    name, value, MAX_CLOSE_DELAY_MS
                )));
            }
        }

        Ok(())
    }
}

fn default_user_related_data_ms() -> u64 {
    USER_RELATED_DATA_CLOSE_DELAY_MS
}
fn default_device_related_data_ms() -> u64 {
    DEVICE_RELATED_DATA_CLOSE_DELAY_MS
}
fn default_user_login_related_data_ms() -> u64 {
    USER_LOGIN_RELATED_DATA_CLOSE_DELAY_MS
}
fn default_composite_ms() -> u64 {
    COMPOSITE_CLOSE_DELAY_MS
}
