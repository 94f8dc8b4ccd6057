//! Prometheus Metrics Registry - Monitor Observability
//!
//! Registers the per-collection counters and gauges and serves them,
//! together with a liveness probe, on the configured address.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, GaugeVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

/// Centralized Prometheus metrics for the floor monitor.
///
/// All metrics follow the naming convention `floor_monitor_*` and
/// carry a `tick` label where they are per collection.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Polls by outcome (ok, empty, http_error, decode_error, transport_error).
    pub polls: IntCounterVec,
    /// Last observed floor unit price in sats.
    pub floor_price_sats: GaugeVec,
    /// Webhook deliveries by target and result (sent, failed).
    pub notifications: IntCounterVec,
    /// Retries consumed so far by each loop.
    pub retries_used: GaugeVec,
    /// Loops currently running.
    pub active_loops: IntGauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let polls = IntCounterVec::new(
            Opts::new("floor_monitor_polls_total", "Marketplace polls by outcome"),
            &["tick", "outcome"],
        )?;

        let floor_price_sats = GaugeVec::new(
            Opts::new(
                "floor_monitor_floor_price_sats",
                "Last observed floor unit price in sats",
            ),
            &["tick"],
        )?;

        let notifications = IntCounterVec::new(
            Opts::new(
                "floor_monitor_notifications_total",
                "Webhook deliveries by target and result",
            ),
            &["tick", "target", "result"],
        )?;

        let retries_used = GaugeVec::new(
            Opts::new(
                "floor_monitor_retries_used",
                "Retries consumed by the collection loop",
            ),
            &["tick"],
        )?;

        let active_loops = IntGauge::new(
            "floor_monitor_active_loops",
            "Collection loops currently running",
        )?;

        // Register all metrics
        registry.register(Box::new(polls.clone()))?;
        registry.register(Box::new(floor_price_sats.clone()))?;
        registry.register(Box::new(notifications.clone()))?;
        registry.register(Box::new(retries_used.clone()))?;
        registry.register(Box::new(active_loops.clone()))?;

        Ok(Self {
            registry,
            polls,
            floor_price_sats,
            notifications,
            retries_used,
            active_loops,
        })
    }

    /// Render the registry in the Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Serve `/metrics` and `/live` until the shutdown broadcast.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new()
            .route(
                "/metrics",
                get(move || {
                    let metrics = Arc::clone(&metrics_self);
                    async move { metrics.render() }
                }),
            )
            .route("/live", get(|| async { StatusCode::OK }));

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
