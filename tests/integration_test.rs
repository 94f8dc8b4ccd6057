//! Integration Tests - Monitor Loop Against Mocked Ports
//!
//! Drives `MonitorLoop::run` end to end with mockall doubles for the
//! poll client and the notifier. Time is paused so the configured
//! delay between polls elapses instantly.

use std::sync::Arc;

use mockall::{Sequence, mock};
use tokio::sync::broadcast;
use tokio_test::{assert_err, assert_ok};

use unisat_floor_monitor::adapters::metrics::MetricsRegistry;
use unisat_floor_monitor::config::loader::{self, ConfigFormat};
use unisat_floor_monitor::config::{Settings, WebhookTarget};
use unisat_floor_monitor::domain::floor::PriceChangeEvent;
use unisat_floor_monitor::domain::listing::{Listing, PollResult};
use unisat_floor_monitor::errors::{DeliveryError, MonitorError, PollError};
use unisat_floor_monitor::usecases::MonitorLoop;

// ---- Mock Definitions ----

mock! {
    pub Poller {}

    #[async_trait::async_trait]
    impl unisat_floor_monitor::ports::poll_client::PollClient for Poller {
        async fn poll(&self, tick: &str, api_key: &str) -> Result<PollResult, PollError>;
    }
}

mock! {
    pub Hook {}

    #[async_trait::async_trait]
    impl unisat_floor_monitor::ports::notifier::Notifier for Hook {
        async fn notify(
            &self,
            target: &WebhookTarget,
            event: &PriceChangeEvent,
        ) -> Result<(), DeliveryError>;
    }
}

// ---- Helpers ----

fn settings(max_retries: u32, retry_reset: &str) -> Arc<Settings> {
    let raw = format!(
        r#"{{
            "protocol": "brc20",
            "collections": ["ordi"],
            "apiKeys": ["A", "B", "C"],
            "timeout": 5000,
            "delay": 1000,
            "maxRetries": {max_retries},
            "retryReset": "{retry_reset}",
            "webhooks": {{
                "alpha": "https://discord.com/api/webhooks/1/a",
                "beta": "https://discord.com/api/webhooks/2/b"
            }}
        }}"#
    );
    let config = loader::parse_config(&raw, ConfigFormat::Json).unwrap();
    Arc::new(Settings::try_from(config).unwrap())
}

fn listing_at(unit_price: f64) -> Result<PollResult, PollError> {
    Ok(PollResult {
        listings: vec![Listing {
            inscription_id: format!("{unit_price}i0"),
            tick: "ordi".to_string(),
            address: "bc1qseller".to_string(),
            unit_price,
            price: unit_price * 1000.0,
            ..Default::default()
        }],
        total: 1,
        timestamp: 1_717_243_200_000,
    })
}

fn transport() -> Result<PollResult, PollError> {
    Err(PollError::Transport("connection reset".into()))
}

fn monitor(
    settings: Arc<Settings>,
    poller: MockPoller,
    hook: MockHook,
) -> (MonitorLoop<MockPoller, MockHook>, broadcast::Sender<()>) {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let monitor = MonitorLoop::new(
        "ordi",
        settings,
        Arc::new(poller),
        Arc::new(hook),
        Arc::new(MetricsRegistry::new().unwrap()),
        shutdown_rx,
    );
    (monitor, shutdown_tx)
}

// ---- Retry budget ----

#[tokio::test(start_paused = true)]
async fn test_terminates_on_fourth_failure_with_three_retries() {
    let mut poller = MockPoller::new();
    poller
        .expect_poll()
        .times(4)
        .returning(|_, _| Err(PollError::Http { status: 500 }));

    let (mut monitor, _tx) = monitor(settings(3, "lifetime"), poller, MockHook::new());
    let err = monitor.run().await.unwrap_err();

    match err {
        MonitorError::MaxRetriesExceeded {
            tick,
            retries,
            source,
        } => {
            assert_eq!(tick, "ordi");
            assert_eq!(retries, 3);
            assert_eq!(source, PollError::Http { status: 500 });
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_ends_loop_without_retry() {
    let mut poller = MockPoller::new();
    poller.expect_poll().times(1).returning(|_, _| transport());

    let (mut monitor, _tx) = monitor(settings(3, "lifetime"), poller, MockHook::new());
    let err = monitor.run().await.unwrap_err();

    assert!(matches!(err, MonitorError::Transport { .. }));
    assert_eq!(monitor.retries(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_per_burst_reset_survives_scattered_failures() {
    let mut seq = Sequence::new();
    let mut poller = MockPoller::new();
    for _ in 0..3 {
        poller
            .expect_poll()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(PollError::Http { status: 429 }));
        poller
            .expect_poll()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| listing_at(100.0));
    }
    poller
        .expect_poll()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| transport());

    let (mut monitor, _tx) = monitor(settings(1, "perBurst"), poller, MockHook::new());
    let err = monitor.run().await.unwrap_err();

    // three failures against a budget of one, reached the transport error
    assert!(matches!(err, MonitorError::Transport { .. }));
}

// ---- Key rotation ----

#[tokio::test(start_paused = true)]
async fn test_keys_rotate_starting_from_second() {
    let mut seq = Sequence::new();
    let mut poller = MockPoller::new();
    for key in ["B", "C", "A"] {
        poller
            .expect_poll()
            .withf(move |tick, api_key| tick == "ordi" && api_key == key)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(PollResult::default()));
    }
    poller
        .expect_poll()
        .withf(|_, api_key| api_key == "B")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| transport());

    let (mut monitor, _tx) = monitor(settings(3, "lifetime"), poller, MockHook::new());
    assert_err!(monitor.run().await);
}

// ---- Notification ----

#[tokio::test(start_paused = true)]
async fn test_first_observation_never_notifies() {
    let mut seq = Sequence::new();
    let mut poller = MockPoller::new();
    poller
        .expect_poll()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| listing_at(1.0));
    poller
        .expect_poll()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| transport());

    let mut hook = MockHook::new();
    hook.expect_notify().never();

    let (mut monitor, _tx) = monitor(settings(3, "lifetime"), poller, hook);
    assert!(monitor.run().await.is_err());
    assert_eq!(monitor.floor().price.sats, 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_failing_target_does_not_block_the_next() {
    let mut seq = Sequence::new();
    let mut poller = MockPoller::new();
    poller
        .expect_poll()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| listing_at(100.0));
    poller
        .expect_poll()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| listing_at(94.0));
    poller
        .expect_poll()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| transport());

    let mut hook = MockHook::new();
    hook.expect_notify()
        .withf(|target, _| target.name == "alpha")
        .times(1)
        .returning(|_, _| Err(DeliveryError::Rejected { status: 404 }));
    hook.expect_notify()
        .withf(|target, event| {
            target.name == "beta"
                && event.old_floor == 100.0
                && event.new_floor == 94.0
                && (event.delta_pct - 6.0).abs() < 1e-9
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let (mut monitor, _tx) = monitor(settings(3, "lifetime"), poller, hook);
    assert!(monitor.run().await.is_err());
    assert_eq!(monitor.floor().prev_floor, 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_small_drop_and_rise_stay_silent() {
    let mut seq = Sequence::new();
    let mut poller = MockPoller::new();
    for price in [100.0, 96.0, 120.0] {
        poller
            .expect_poll()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, _| listing_at(price));
    }
    poller
        .expect_poll()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| transport());

    let mut hook = MockHook::new();
    hook.expect_notify().never();

    let (mut monitor, _tx) = monitor(settings(3, "lifetime"), poller, hook);
    assert!(monitor.run().await.is_err());
    assert_eq!(monitor.floor().price.sats, 120.0);
    assert_eq!(monitor.floor().prev_floor, 96.0);
}

// ---- Shutdown ----

#[tokio::test(start_paused = true)]
async fn test_shutdown_before_start_skips_polling() {
    let mut poller = MockPoller::new();
    poller.expect_poll().never();

    let (mut monitor, tx) = monitor(settings(3, "lifetime"), poller, MockHook::new());
    tx.send(()).unwrap();

    assert_ok!(monitor.run().await);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_delay_returns_ok() {
    let mut poller = MockPoller::new();
    poller
        .expect_poll()
        .returning(|_, _| Ok(PollResult::default()));

    let (mut monitor, tx) = monitor(settings(3, "lifetime"), poller, MockHook::new());
    let handle = tokio::spawn(async move { monitor.run().await });

    tokio::time::sleep(std::time::Duration::from_millis(3_500)).await;
    tx.send(()).unwrap();

    assert_ok!(handle.await.unwrap());
}

// ---- Config from disk ----

#[test]
fn test_load_settings_from_toml_file() {
    let path = std::env::temp_dir().join(format!(
        "unisat-floor-monitor-{}.toml",
        std::process::id()
    ));
    std::fs::write(
        &path,
        r#"
protocol = "brc20"
collections = ["ordi", "sats"]
apiKeys = ["k1"]
timeout = 3000
delay = 1000
maxRetries = 2

[webhooks]
main = "https://discord.com/api/webhooks/1/x"
"#,
    )
    .unwrap();

    let settings = loader::load_settings(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(settings.collections, ["ordi", "sats"]);
    assert_eq!(settings.max_retries, 2);
    assert_eq!(settings.webhooks.len(), 1);
    assert_eq!(
        settings.endpoints.monitoring_url,
        "https://open-api.unisat.io/v3/market/brc20/auction/list"
    );
}

#[test]
fn test_load_settings_missing_file() {
    let err = loader::load_settings("/nonexistent/config.json").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/config.json"));
}
