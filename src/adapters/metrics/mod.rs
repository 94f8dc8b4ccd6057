//! Metrics Adapters - Prometheus Export and Liveness
//!
//! - `prometheus`: Metric registry plus the `/metrics` and `/live`
//!   HTTP endpoints

pub mod prometheus;

pub use self::prometheus::MetricsRegistry;
