//! Monitor Supervisor - Lifecycle Management for Collection Loops
//!
//! Spawns one `MonitorLoop` per configured collection, each in its own
//! tokio task with its own shutdown receiver. Loops never share
//! mutable state, so a failing collection stops only itself.
//! The supervisor returns once a shutdown is requested and every loop
//! has drained, or once every loop has ended on its own.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

use super::monitor_loop::MonitorLoop;
use crate::adapters::metrics::MetricsRegistry;
use crate::config::Settings;
use crate::errors::MonitorError;
use crate::ports::notifier::Notifier;
use crate::ports::poll_client::PollClient;

/// How a single collection loop ended.
#[derive(Debug)]
pub struct CollectionReport {
  pub tick: String,
  /// `Ok` when the loop stopped on shutdown.
  pub outcome: Result<(), MonitorError>,
}

/// Runs every collection loop and coordinates their shutdown.
pub struct Supervisor<P: PollClient, N: Notifier> {
  settings: Arc<Settings>,
  poller: Arc<P>,
  notifier: Arc<N>,
  metrics: Arc<MetricsRegistry>,
  /// Shutdown broadcaster; one receiver per loop.
  shutdown_tx: broadcast::Sender<()>,
}

impl<P: PollClient, N: Notifier> Supervisor<P, N> {
  pub fn new(
    settings: Arc<Settings>,
    poller: Arc<P>,
    notifier: Arc<N>,
    metrics: Arc<MetricsRegistry>,
    shutdown_tx: broadcast::Sender<()>,
  ) -> Self {
    Self {
      settings,
      poller,
      notifier,
      metrics,
      shutdown_tx,
    }
  }

  fn spawn_loops(&self) -> JoinSet<CollectionReport> {
    let mut set = JoinSet::new();

    for tick in &self.settings.collections {
      let mut monitor = MonitorLoop::new(
        tick.clone(),
        Arc::clone(&self.settings),
        Arc::clone(&self.poller),
        Arc::clone(&self.notifier),
        Arc::clone(&self.metrics),
        self.shutdown_tx.subscribe(),
      );

      set.spawn(async move {
        let outcome = monitor.run().await;
        CollectionReport {
          tick: monitor.tick().to_string(),
          outcome,
        }
      });
    }

    info!(loop_count = set.len(), "Monitoring routines started");
    set
  }

  /// Run all loops until `shutdown` resolves or every loop has ended.
  ///
  /// On shutdown the signal is broadcast and the call waits for each
  /// loop to finish its current iteration. Reports come back in
  /// completion order; a panicked loop is logged and has none.
  pub async fn run_until<F>(self, shutdown: F) -> Vec<CollectionReport>
  where
    F: Future<Output = ()>,
  {
    let mut set = self.spawn_loops();
    let mut reports = Vec::with_capacity(set.len());
    tokio::pin!(shutdown);

    loop {
      tokio::select! {
        () = &mut shutdown => {
          info!("Termination signal received, shutting down");
          // No receivers left only when every loop already returned.
          let _ = self.shutdown_tx.send(());
          break;
        }
        joined = set.join_next() => match joined {
          Some(result) => record(result, &mut reports),
          None => {
            warn!("All monitoring routines ended without a shutdown request");
            return reports;
          }
        },
      }
    }

    while let Some(result) = set.join_next().await {
      record(result, &mut reports);
    }
    info!("All monitoring routines completed");
    reports
  }
}

/// Tickers of the loops that ended with an error, in report order.
pub fn failed_ticks(reports: &[CollectionReport]) -> Vec<&str> {
  reports
    .iter()
    .filter(|r| r.outcome.is_err())
    .map(|r| r.tick.as_str())
    .collect()
}

fn record(result: Result<CollectionReport, JoinError>, reports: &mut Vec<CollectionReport>) {
  match result {
    Ok(report) => {
      match &report.outcome {
        Ok(()) => info!(tick = %report.tick, "Monitoring routine stopped"),
        Err(e) => error!(tick = %report.tick, error = %e, "Monitoring routine terminated"),
      }
      reports.push(report);
    }
    Err(e) => error!(error = %e, "Monitoring routine panicked"),
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use async_trait::async_trait;

  use super::*;
  use crate::config::{AppConfig, LoggingConfig, MetricsConfig, RetryReset, WebhookTarget};
  use crate::domain::floor::PriceChangeEvent;
  use crate::domain::listing::{Listing, PollResult};
  use crate::errors::{DeliveryError, PollError};

  /// Fails for "broken", answers a fixed floor otherwise.
  struct FixedPoller;

  #[async_trait]
  impl PollClient for FixedPoller {
    async fn poll(&self, tick: &str, _api_key: &str) -> Result<PollResult, PollError> {
      if tick == "broken" {
        return Err(PollError::Transport("connection refused".into()));
      }
      Ok(PollResult {
        listings: vec![Listing {
          tick: tick.to_string(),
          unit_price: 10.0,
          ..Default::default()
        }],
        total: 1,
        timestamp: 0,
      })
    }
  }

  struct NullNotifier;

  #[async_trait]
  impl Notifier for NullNotifier {
    async fn notify(
      &self,
      _target: &WebhookTarget,
      _event: &PriceChangeEvent,
    ) -> Result<(), DeliveryError> {
      Ok(())
    }
  }

  fn settings(collections: &[&str]) -> Arc<Settings> {
    let config = AppConfig {
      protocol: "brc20".into(),
      collections: collections.iter().map(ToString::to_string).collect(),
      api_keys: vec!["key".into()],
      timeout_ms: 2_000,
      delay_ms: 1_000,
      max_retries: 1,
      webhooks: [("main".to_string(), "https://hooks.example/x".to_string())]
        .into_iter()
        .collect(),
      api_base_url: "https://open-api.unisat.io".into(),
      notify_threshold: 5.0,
      usd_per_btc: 63_000.0,
      retry_reset: RetryReset::Lifetime,
      logging: LoggingConfig::default(),
      metrics: MetricsConfig::default(),
    };
    Arc::new(Settings::try_from(config).unwrap())
  }

  fn supervisor(collections: &[&str]) -> Supervisor<FixedPoller, NullNotifier> {
    let (shutdown_tx, _) = broadcast::channel(4);
    Supervisor::new(
      settings(collections),
      Arc::new(FixedPoller),
      Arc::new(NullNotifier),
      Arc::new(MetricsRegistry::new().unwrap()),
      shutdown_tx,
    )
  }

  #[tokio::test(start_paused = true)]
  async fn test_shutdown_stops_every_loop_cleanly() {
    let reports = supervisor(&["ordi", "sats"])
      .run_until(tokio::time::sleep(Duration::from_secs(5)))
      .await;

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.outcome.is_ok()));
    let mut ticks: Vec<_> = reports.iter().map(|r| r.tick.as_str()).collect();
    ticks.sort_unstable();
    assert_eq!(ticks, ["ordi", "sats"]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_failing_collection_does_not_stop_the_others() {
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let (shutdown_tx, _) = broadcast::channel(4);
    let supervisor = Supervisor::new(
      settings(&["broken", "ordi"]),
      Arc::new(FixedPoller),
      Arc::new(NullNotifier),
      Arc::clone(&metrics),
      shutdown_tx,
    );

    let reports = supervisor
      .run_until(tokio::time::sleep(Duration::from_secs(10)))
      .await;

    let broken = reports.iter().find(|r| r.tick == "broken").unwrap();
    assert!(matches!(broken.outcome, Err(MonitorError::Transport { .. })));
    let ordi = reports.iter().find(|r| r.tick == "ordi").unwrap();
    assert!(ordi.outcome.is_ok());
    // ordi kept polling after broken ended
    let polls = metrics.polls.with_label_values(&["ordi", "ok"]).get();
    assert!(polls >= 5, "ordi polled {polls} times");
    assert_eq!(metrics.active_loops.get(), 0);
  }

  #[test]
  fn test_failed_ticks_lists_only_errors() {
    let reports = vec![
      CollectionReport {
        tick: "ordi".into(),
        outcome: Ok(()),
      },
      CollectionReport {
        tick: "broken".into(),
        outcome: Err(MonitorError::Transport {
          tick: "broken".into(),
          source: PollError::Transport("connection refused".into()),
        }),
      },
    ];
    assert_eq!(failed_ticks(&reports), ["broken"]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_returns_when_all_loops_end() {
    let reports = supervisor(&["broken"])
      .run_until(std::future::pending())
      .await;
    assert_eq!(reports.len(), 1);
    assert!(reports[0].outcome.is_err());
  }
}
