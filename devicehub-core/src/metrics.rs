//! Prometheus metrics collection
//!
//! All metrics are registered against [`REGISTRY`] and exposed via the
//! `/metrics` endpoint for Prometheus scraping.

use prometheus::{
    register_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, CounterVec, Encoder, IntCounter, IntGauge, Registry,
    TextEncoder,
};

/// Global metrics registry
pub static REGISTRY: std::sync::LazyLock<Registry> = std::sync::LazyLock::new(Registry::new);

/// HTTP request counter
pub static HTTP_REQUESTS_TOTAL: std::sync::LazyLock<CounterVec> = std::sync::LazyLock::new(|| {
    register_counter_vec_with_registry!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["endpoint", "method", "status"],
        REGISTRY.clone()
    )
    .expect("Failed to register HTTP_REQUESTS_TOTAL")
});

/// Notification broker
pub mod broker {
    use super::{
        register_counter_vec_with_registry, register_int_counter_with_registry,
        register_int_gauge_with_registry, CounterVec, IntCounter, IntGauge, REGISTRY,
    };

    /// Records handed to the broker, by event type
    pub static EVENTS_PUBLISHED: std::sync::LazyLock<CounterVec> = std::sync::LazyLock::new(|| {
        register_counter_vec_with_registry!(
            "broker_events_published_total",
            "Total number of records published to the broker",
            &["event_type"],
            REGISTRY.clone()
        )
        .expect("Failed to register EVENTS_PUBLISHED")
    });

    /// Successful pushes into a subscriber queue
    pub static EVENTS_DELIVERED: std::sync::LazyLock<IntCounter> = std::sync::LazyLock::new(|| {
        register_int_counter_with_registry!(
            "broker_events_delivered_total",
            "Total number of records pushed into subscriber queues",
            REGISTRY.clone()
        )
        .expect("Failed to register EVENTS_DELIVERED")
    });

    /// Deliveries skipped because the subscriber queue was full
    pub static EVENTS_DROPPED: std::sync::LazyLock<IntCounter> = std::sync::LazyLock::new(|| {
        register_int_counter_with_registry!(
            "broker_events_dropped_total",
            "Total number of deliveries dropped because a subscriber queue was full",
            REGISTRY.clone()
        )
        .expect("Failed to register EVENTS_DROPPED")
    });

    /// Subscriptions currently in the registry
    pub static ACTIVE_SUBSCRIPTIONS: std::sync::LazyLock<IntGauge> =
        std::sync::LazyLock::new(|| {
            register_int_gauge_with_registry!(
                "broker_active_subscriptions",
                "Current number of registered subscriptions",
                REGISTRY.clone()
            )
            .expect("Failed to register ACTIVE_SUBSCRIPTIONS")
        });

    /// Devices with at least one subscription
    pub static ACTIVE_DEVICES: std::sync::LazyLock<IntGauge> = std::sync::LazyLock::new(|| {
        register_int_gauge_with_registry!(
            "broker_active_devices",
            "Current number of devices with at least one subscriber",
            REGISTRY.clone()
        )
        .expect("Failed to register ACTIVE_DEVICES")
    });
}

/// Ingestion path
pub mod ingestion {
    use super::{register_counter_vec_with_registry, CounterVec, REGISTRY};

    /// Ingested records by kind and outcome
    pub static RECORDS_INGESTED: std::sync::LazyLock<CounterVec> = std::sync::LazyLock::new(|| {
        register_counter_vec_with_registry!(
            "ingestion_records_total",
            "Total number of ingestion attempts",
            &["kind", "outcome"],
            REGISTRY.clone()
        )
        .expect("Failed to register RECORDS_INGESTED")
    });
}

/// Render all registered metrics in the Prometheus text format
#[must_use]
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
