// -
// Close delays (milliseconds)

/// Keyed per-user snapshots survive this long after their last consumer leaves
pub(crate) const USER_RELATED_DATA_CLOSE_DELAY_MS: u64 = 15 * 1000;
pub(crate) const USER_LOGIN_RELATED_DATA_CLOSE_DELAY_MS: u64 = 15 * 1000;
/// The device snapshot is read by nearly every screen
pub(crate) const DEVICE_RELATED_DATA_CLOSE_DELAY_MS: u64 = 60 * 1000;
/// Composite snapshots only hold references into the leaf caches
pub(crate) const COMPOSITE_CLOSE_DELAY_MS: u64 = 5 * 1000;

/// Upper bound accepted for any configured close delay
pub(crate) const MAX_CLOSE_DELAY_MS: u64 = 60 * 60 * 1000;

// -
// Gate and timer

/// Longest time a TempLock acquisition waits before proceeding unguarded
pub(crate) const TEMP_LOCK_MAX_WAIT_MS: u64 = 1000;

/// Wipe timer never re-arms sooner than this
pub(crate) const WIPE_TIMER_FLOOR_MS: u64 = 10;

// -
// Snapshots

/// Entries kept by the per-snapshot package lookup memo
pub(crate) const CATEGORY_APP_LOOKUP_CACHE_SIZE: usize = 8;

// -
// Engine names (log field and metric label)

pub(crate) const USER_RELATED_DATA_CACHE: &str = "user_related_data";
pub(crate) const DEVICE_RELATED_DATA_CACHE: &str = "device_related_data";
pub(crate) const USER_LOGIN_RELATED_DATA_CACHE: &str = "user_login_related_data";
pub(crate) const DEVICE_AND_USER_RELATED_DATA_CACHE: &str = "device_and_user_related_data";
pub(crate) const COMPLETE_USER_LOGIN_RELATED_DATA_CACHE: &str = "complete_user_login_related_data";
