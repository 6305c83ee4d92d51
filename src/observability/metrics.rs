//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_resolutions_total` (counter): resolutions by outcome
//! - `router_cache_hits_total` (counter): resolutions served from cache
//! - `router_cache_misses_total` (counter): resolutions computed
//! - `router_cache_evictions_total` (counter): LRU evictions
//! - `router_routes` (gauge): registered routes by kind
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - The Prometheus exporter is opt-in from config

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Count one resolution outcome (`matched`, `not_found`, ...).
pub fn record_resolution(outcome: &'static str) {
    metrics::counter!("router_resolutions_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_hit() {
    metrics::counter!("router_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    metrics::counter!("router_cache_misses_total").increment(1);
}

pub fn record_cache_eviction() {
    metrics::counter!("router_cache_evictions_total").increment(1);
}

/// Route counts of the most recently finalized router.
pub fn record_route_count(static_routes: usize, dynamic_routes: usize) {
    metrics::gauge!("router_routes", "kind" => "static").set(static_routes as f64);
    metrics::gauge!("router_routes", "kind" => "dynamic").set(dynamic_routes as f64);
}

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}
