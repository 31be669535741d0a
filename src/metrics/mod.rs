use lazy_static::lazy_static;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;

#[cfg(test)]
mod metrics_test;

lazy_static! {
    pub static ref CONNECT_FAILOVERS: IntCounter = IntCounter::new(
        "connect_failovers",
        "Connects redirected to a refreshed server after a network failure"
    )
    .expect("metric can not be created");

    pub static ref CONNECT_REJECTIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("connect_rejections", "Handshakes rejected by identity validation"),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref SUPPRESSED_CLOSE_FAILURES: IntCounter = IntCounter::new(
        "suppressed_close_failures",
        "Failures while closing an underlying client that were logged and swallowed"
    )
    .expect("metric can not be created");

    pub static ref POOL_LEASES: IntCounterVec = IntCounterVec::new(
        Opts::new("pool_leases", "Pooled connection leases"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref POOL_EVICTIONS: IntCounter = IntCounter::new(
        "pool_evictions",
        "Pooled connections closed instead of being kept idle"
    )
    .expect("metric can not be created");
}

/// Registers every write client collector with `registry`.
pub fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(CONNECT_FAILOVERS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(CONNECT_REJECTIONS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(SUPPRESSED_CLOSE_FAILURES.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(POOL_LEASES.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(POOL_EVICTIONS.clone()))
        .expect("collector can be registered");
}
