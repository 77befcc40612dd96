use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts, Registry};


lazy_static! {
    pub static ref CACHE_OPEN_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cache_open_total", "Number of open calls served, by cache and path"),
        &["cache", "path"]
    )
    .expect("metric can not be created");

    pub static ref CACHE_DISPOSE_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cache_dispose_total", "Number of values handed back to the helper for disposal"),
        &["cache"]
    )
    .expect("metric can not be created");

    pub static ref CACHE_NOTIFY_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cache_notify_total", "Number of listener deliveries"),
        &["cache"]
    )
    .expect("metric can not be created");

    pub static ref CACHE_STALE_UPDATE_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cache_stale_update_total", "Refresh results discarded because the entry changed meanwhile"),
        &["cache"]
    )
    .expect("metric can not be created");

    pub static ref CACHE_DELAYED_WIPE_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cache_delayed_wipe_total", "Entries released by a close-delay wipe"),
        &["cache"]
    )
    .expect("metric can not be created");
}

/// Registers every cache collector on a caller-owned registry
pub fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(CACHE_OPEN_TOTAL.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(CACHE_DISPOSE_TOTAL.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(CACHE_NOTIFY_TOTAL.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(CACHE_STALE_UPDATE_TOTAL.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(CACHE_DELAYED_WIPE_TOTAL.clone()))
        .expect("collector can be registered");
}
