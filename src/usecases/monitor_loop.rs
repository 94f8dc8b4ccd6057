//! Monitor Loop - Per-collection Floor Polling
//!
//! The core use case. One instance runs per collection and:
//! 1. Waits the configured delay (interruptible by shutdown)
//! 2. Rotates to the next API key
//! 3. Polls the marketplace for the cheapest listings
//! 4. Folds the cheapest listing into its floor record
//! 5. Notifies every webhook target on a large enough drop
//!
//! Failure policy: transport errors end the loop at once; HTTP and
//! decode errors consume a retry from a budget of `max_retries`.
//! With the default `lifetime` policy that budget is never refilled.
//! Shutdown is checked at the top of every iteration and during the
//! delay; an in-flight poll or dispatch always runs to completion.
//! The delay wait goes further than a once-per-iteration check so a
//! stop request never sits out a full delay.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{error, info, instrument, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::config::{RetryReset, Settings};
use crate::domain::floor::{FloorListing, FloorUpdate, PriceChange, PriceChangeEvent, format_sats};
use crate::domain::keys::KeyRing;
use crate::domain::listing::PollResult;
use crate::errors::{MonitorError, PollError};
use crate::ports::notifier::Notifier;
use crate::ports::poll_client::PollClient;

/// Outcome of a single poll iteration that did not end the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
  /// HTTP or decode failure; `attempt` retries used so far.
  Retrying { attempt: u32, error: PollError },
  /// The marketplace returned no listings.
  Empty,
  /// First floor recorded; never notifies.
  Initialized { floor: f64 },
  /// Floor unchanged since the last poll.
  Unchanged { floor: f64 },
  /// Floor moved, but not enough to notify.
  BelowThreshold(PriceChange),
  /// Floor dropped past the threshold and targets were notified.
  Notified {
    change: PriceChange,
    delivered: usize,
    failed: usize,
  },
}

/// Holds the `active_loops` gauge up while a loop runs, including
/// when the loop unwinds from a panic.
struct ActiveLoop(Arc<MetricsRegistry>);

impl ActiveLoop {
  fn enter(metrics: Arc<MetricsRegistry>) -> Self {
    metrics.active_loops.inc();
    Self(metrics)
  }
}

impl Drop for ActiveLoop {
  fn drop(&mut self) {
    self.0.active_loops.dec();
  }
}

/// Polling loop for a single collection.
///
/// Owns its floor record, key cursor and retry counter; shares only
/// the read-only settings, the port adapters and the metrics.
pub struct MonitorLoop<P: PollClient, N: Notifier> {
  /// Collection ticker.
  tick: String,
  /// Validated settings shared by all loops.
  settings: Arc<Settings>,
  /// Marketplace poller.
  poller: Arc<P>,
  /// Webhook notifier.
  notifier: Arc<N>,
  /// Prometheus metrics.
  metrics: Arc<MetricsRegistry>,
  /// This loop's API key cursor.
  keys: KeyRing,
  /// Last known floor.
  floor: FloorListing,
  /// Retries consumed.
  retries: u32,
  /// Shutdown signal receiver.
  shutdown_rx: broadcast::Receiver<()>,
}

impl<P: PollClient, N: Notifier> MonitorLoop<P, N> {
  /// Create a loop for `tick` with an empty floor record.
  pub fn new(
    tick: impl Into<String>,
    settings: Arc<Settings>,
    poller: Arc<P>,
    notifier: Arc<N>,
    metrics: Arc<MetricsRegistry>,
    shutdown_rx: broadcast::Receiver<()>,
  ) -> Self {
    let keys = settings.api_keys.clone();
    Self {
      tick: tick.into(),
      settings,
      poller,
      notifier,
      metrics,
      keys,
      floor: FloorListing::default(),
      retries: 0,
      shutdown_rx,
    }
  }

  /// Collection this loop monitors.
  pub fn tick(&self) -> &str {
    &self.tick
  }

  /// Current floor record.
  pub fn floor(&self) -> &FloorListing {
    &self.floor
  }

  /// Retries consumed so far.
  pub const fn retries(&self) -> u32 {
    self.retries
  }

  /// Run until shutdown (`Ok`) or an unrecoverable error.
  #[instrument(skip(self), name = "monitor", fields(tick = %self.tick))]
  pub async fn run(&mut self) -> Result<(), MonitorError> {
    info!("Monitoring started");
    let _active = ActiveLoop::enter(Arc::clone(&self.metrics));
    self.run_iterations().await
  }

  async fn run_iterations(&mut self) -> Result<(), MonitorError> {
    let delay = self.settings.delay;
    loop {
      if self.shutdown_requested() {
        info!("Stopping monitoring for collection");
        return Ok(());
      }

      tokio::select! {
        biased;
        _ = self.shutdown_rx.recv() => {
          info!("Stopping monitoring for collection");
          return Ok(());
        }
        () = tokio::time::sleep(delay) => {}
      }

      self.step().await?;
    }
  }

  /// Perform one poll and act on its result.
  ///
  /// # Errors
  /// `MonitorError` when the loop must terminate.
  pub async fn step(&mut self) -> Result<Step, MonitorError> {
    let api_key = self.keys.next_key().to_owned();

    match self.poller.poll(&self.tick, &api_key).await {
      Ok(result) => {
        let outcome = if result.listings.is_empty() { "empty" } else { "ok" };
        self.record_poll(outcome);
        if self.settings.retry_reset == RetryReset::PerBurst && self.retries > 0 {
          self.retries = 0;
          self.record_retries();
        }
        Ok(self.evaluate(&result).await)
      }
      Err(error) if error.is_retryable() => {
        self.record_poll(error.label());
        self.register_failure(error)
      }
      Err(error) => {
        self.record_poll(error.label());
        error!(tick = %self.tick, error = %error, "Error sending request");
        Err(MonitorError::Transport {
          tick: self.tick.clone(),
          source: error,
        })
      }
    }
  }

  fn register_failure(&mut self, error: PollError) -> Result<Step, MonitorError> {
    if self.retries < self.settings.max_retries {
      self.retries += 1;
      self.record_retries();
      warn!(
        tick = %self.tick,
        error = %error,
        attempt = self.retries,
        max_retries = self.settings.max_retries,
        "Request unsuccessful, retrying"
      );
      return Ok(Step::Retrying {
        attempt: self.retries,
        error,
      });
    }

    error!(
      tick = %self.tick,
      error = %error,
      retries = self.retries,
      "Max retries exceeded"
    );
    Err(MonitorError::MaxRetriesExceeded {
      tick: self.tick.clone(),
      retries: self.retries,
      source: error,
    })
  }

  async fn evaluate(&mut self, result: &PollResult) -> Step {
    let Some(cheapest) = result.cheapest() else {
      warn!(tick = %self.tick, "Response returned no listings");
      return Step::Empty;
    };

    match self.floor.observe(cheapest) {
      FloorUpdate::Initialized { floor } => {
        self.record_floor(floor);
        info!(tick = %self.tick, floor = %format_sats(floor), "Current floor (sats)");
        Step::Initialized { floor }
      }
      FloorUpdate::Unchanged { floor } => {
        info!(tick = %self.tick, floor = %format_sats(floor), "Current floor (sats)");
        Step::Unchanged { floor }
      }
      FloorUpdate::Changed(change) => {
        self.record_floor(change.current);

        if !change.is_significant(self.settings.notify_threshold_pct) {
          info!(
            tick = %self.tick,
            floor = %format_sats(change.current),
            change = %change.signed_change(),
            "New floor (sats), skipping webhook"
          );
          return Step::BelowThreshold(change);
        }

        info!(
          tick = %self.tick,
          floor = %format_sats(change.current),
          change = %change.signed_change(),
          "New floor (sats), sending webhook"
        );

        self.floor.price.delta_usd = change.fiat_delta(self.settings.usd_per_btc);
        info!(
          tick = %self.tick,
          delta_usd = %format!("{:.2}", self.floor.price.delta_usd),
          "Price diff (USD)"
        );

        let endpoints = &self.settings.endpoints;
        let event = PriceChangeEvent::from_floor(
          &self.floor,
          &endpoints.collection_base_url,
          &endpoints.listing_base_url,
          Utc::now(),
        );
        let (delivered, failed) = self.dispatch(&event).await;

        Step::Notified {
          change,
          delivered,
          failed,
        }
      }
    }
  }

  /// Deliver to every target; one failure never stops the others.
  async fn dispatch(&self, event: &PriceChangeEvent) -> (usize, usize) {
    let mut delivered = 0;
    let mut failed = 0;

    for target in &self.settings.webhooks {
      match self.notifier.notify(target, event).await {
        Ok(()) => {
          delivered += 1;
          self
            .metrics
            .notifications
            .with_label_values(&[&self.tick, &target.name, "sent"])
            .inc();
          info!(tick = %self.tick, target = %target.name, "Webhook sent");
        }
        Err(e) => {
          failed += 1;
          self
            .metrics
            .notifications
            .with_label_values(&[&self.tick, &target.name, "failed"])
            .inc();
          error!(tick = %self.tick, target = %target.name, error = %e, "Error sending webhook");
        }
      }
    }

    (delivered, failed)
  }

  fn shutdown_requested(&mut self) -> bool {
    match self.shutdown_rx.try_recv() {
      Err(TryRecvError::Empty) => false,
      Ok(()) | Err(TryRecvError::Closed | TryRecvError::Lagged(_)) => true,
    }
  }

  fn record_poll(&self, outcome: &str) {
    self
      .metrics
      .polls
      .with_label_values(&[&self.tick, outcome])
      .inc();
  }

  fn record_floor(&self, floor: f64) {
    self
      .metrics
      .floor_price_sats
      .with_label_values(&[&self.tick])
      .set(floor);
  }

  fn record_retries(&self) {
    self
      .metrics
      .retries_used
      .with_label_values(&[&self.tick])
      .set(f64::from(self.retries));
  }
}
