//! Configuration Module - File-based Monitor Configuration
//!
//! `AppConfig` is the raw document (JSON or TOML, camelCase keys).
//! `Settings` is the validated, immutable form the monitor loops
//! consume; it is only obtainable through `Settings::try_from`,
//! which runs every validation rule in `loader`.
//! All endpoints and tunables live here - nothing is hardcoded in
//! the use-case layer.

pub mod loader;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::keys::KeyRing;
use crate::errors::ConfigError;

/// Raw configuration document.
///
/// Loaded from disk at startup. Missing collections, keys, webhooks
/// and numbers default to empty/zero so validation can report the
/// precise rule that failed instead of a generic parse error.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
  /// Marketplace protocol ("brc20"; "runes" is recognised only).
  #[serde(default)]
  pub protocol: String,
  /// Collection tickers to monitor, one loop each.
  #[serde(default)]
  pub collections: Vec<String>,
  /// Bearer tokens rotated round-robin per loop.
  #[serde(default)]
  pub api_keys: Vec<String>,
  /// Poll request timeout (milliseconds).
  #[serde(default, rename = "timeout")]
  pub timeout_ms: u64,
  /// Delay before every poll (milliseconds).
  #[serde(default, rename = "delay")]
  pub delay_ms: u64,
  /// Retry budget for HTTP/decode failures.
  #[serde(default)]
  pub max_retries: u32,
  /// Webhook name -> URL.
  #[serde(default)]
  pub webhooks: BTreeMap<String, String>,
  /// Marketplace API base URL.
  #[serde(default = "default_api_base_url")]
  pub api_base_url: String,
  /// Minimum drop (percent) that triggers a notification.
  #[serde(default = "default_notify_threshold")]
  pub notify_threshold: f64,
  /// BTC -> USD rate used for the fiat delta.
  #[serde(default = "default_usd_per_btc")]
  pub usd_per_btc: f64,
  /// When the retry counter resets.
  #[serde(default)]
  pub retry_reset: RetryReset,
  /// Log output configuration.
  #[serde(default)]
  pub logging: LoggingConfig,
  /// Prometheus export configuration.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Retry counter reset policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RetryReset {
  /// The counter never resets; a loop tolerates `maxRetries`
  /// failures over its whole lifetime.
  #[default]
  Lifetime,
  /// The counter resets after every decoded 200 response, so only
  /// back-to-back failures count.
  PerBurst,
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
  /// Default filter when `RUST_LOG` is unset.
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Emit JSON lines on stdout instead of plain text.
  #[serde(default)]
  pub json: bool,
  /// Directory for timestamped log files; no file output if unset.
  #[serde(default)]
  pub directory: Option<String>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      json: false,
      directory: None,
    }
  }
}

/// Metrics and health endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsConfig {
  /// Serve `/metrics` and `/live`.
  #[serde(default)]
  pub enabled: bool,
  /// Bind address of the metrics server.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      bind_address: default_metrics_addr(),
    }
  }
}

/// Marketplace protocols the config may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
  Brc20,
  Runes,
}

impl Protocol {
  /// Wire name, also used as the `nftType` filter.
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Brc20 => "brc20",
      Self::Runes => "runes",
    }
  }
}

impl fmt::Display for Protocol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Protocol {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "brc20" => Ok(Self::Brc20),
      "runes" => Ok(Self::Runes),
      other => Err(ConfigError::InvalidProtocol(other.to_string())),
    }
  }
}

/// URLs derived from the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
  /// Auction-listing endpoint polled by every loop.
  pub monitoring_url: String,
  /// Prefix for collection links; the ticker is appended.
  pub collection_base_url: String,
  /// Prefix for listing links; the inscription id is appended.
  pub listing_base_url: String,
}

impl Endpoints {
  /// Derive endpoints for `protocol` against `api_base_url`.
  ///
  /// # Errors
  /// `ConfigError::UnsupportedProtocol` for protocols without a
  /// marketplace integration.
  pub fn for_protocol(protocol: Protocol, api_base_url: &str) -> Result<Self, ConfigError> {
    match protocol {
      Protocol::Brc20 => Ok(Self {
        monitoring_url: format!(
          "{}/v3/market/{}/auction/list",
          api_base_url.trim_end_matches('/'),
          protocol
        ),
        collection_base_url: "https://unisat.io/market/brc20?tick=".to_string(),
        listing_base_url: "https://unisat.io/inscription/".to_string(),
      }),
      Protocol::Runes => Err(ConfigError::UnsupportedProtocol(protocol.to_string())),
    }
  }
}

/// A named outbound webhook URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookTarget {
  pub name: String,
  pub url: String,
}

/// Validated, immutable settings shared read-only by every loop.
#[derive(Debug, Clone)]
pub struct Settings {
  pub protocol: Protocol,
  /// Unique tickers, in configuration order.
  pub collections: Vec<String>,
  /// Key ring template; each loop clones it for its own cursor.
  pub api_keys: KeyRing,
  pub delay: Duration,
  pub timeout: Duration,
  pub max_retries: u32,
  /// Targets ordered by name.
  pub webhooks: Vec<WebhookTarget>,
  pub endpoints: Endpoints,
  pub notify_threshold_pct: f64,
  pub usd_per_btc: f64,
  pub retry_reset: RetryReset,
  pub logging: LoggingConfig,
  pub metrics: MetricsConfig,
}

// Default value functions for serde

fn default_api_base_url() -> String {
  "https://open-api.unisat.io".to_string()
}

const fn default_notify_threshold() -> f64 {
  5.0
}

const fn default_usd_per_btc() -> f64 {
  63_000.0
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}
