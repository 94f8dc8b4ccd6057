//! Error Types - Typed Failures for Config, Polling and Delivery
//!
//! Each layer gets its own enum so callers can match on the failure
//! class instead of parsing strings:
//! - `ConfigError`: fatal, aborts startup before any loop runs
//! - `PollError`: one marketplace request; transport vs retryable
//! - `MonitorError`: why a single collection loop terminated
//! - `DeliveryError`: one webhook target, logged and never propagated

use thiserror::Error;

/// Invalid or unreadable configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Error reading config file {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("Error decoding config file: {0}")]
  Parse(String),

  #[error("Collections is empty")]
  EmptyCollections,

  #[error("Collection ticker at position {0} is blank")]
  BlankCollection(usize),

  #[error("Collection '{0}' is listed more than once")]
  DuplicateCollection(String),

  #[error("No API keys provided")]
  NoApiKeys,

  #[error("API key at position {0} is blank")]
  BlankApiKey(usize),

  #[error("Invalid protocol provided: '{0}'")]
  InvalidProtocol(String),

  #[error("Protocol '{0}' is recognised but not supported yet")]
  UnsupportedProtocol(String),

  #[error("No webhooks provided")]
  NoWebhooks,

  #[error("Webhook '{name}' has an invalid URL: {reason}")]
  InvalidWebhookUrl { name: String, reason: String },

  #[error("Invalid API base URL: {0}")]
  InvalidBaseUrl(String),

  #[error("{0} must be greater than 0")]
  NotPositive(&'static str),

  #[error("Timeout ({timeout_ms} ms) must be greater than Delay ({delay_ms} ms)")]
  TimeoutNotAboveDelay { timeout_ms: u64, delay_ms: u64 },

  #[error("notifyThreshold must be a finite, non-negative percentage, got {0}")]
  InvalidThreshold(f64),

  #[error("usdPerBtc must be a finite, positive rate, got {0}")]
  InvalidFiatRate(f64),
}

/// Failure of a single poll against the marketplace API.
///
/// Transport failures end the loop; HTTP and decode failures are
/// retried against the loop's retry budget.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
  #[error("transport failure: {0}")]
  Transport(String),

  #[error("request unsuccessful: HTTP {status}")]
  Http { status: u16 },

  #[error("error decoding response (HTTP {status}): {reason}")]
  Decode { status: u16, reason: String },
}

impl PollError {
  /// Whether this failure consumes a retry instead of ending the loop.
  pub const fn is_retryable(&self) -> bool {
    !matches!(self, Self::Transport(_))
  }

  /// Short label used for the `outcome` metric dimension.
  pub const fn label(&self) -> &'static str {
    match self {
      Self::Transport(_) => "transport_error",
      Self::Http { .. } => "http_error",
      Self::Decode { .. } => "decode_error",
    }
  }
}

/// Why a collection's monitoring loop stopped with an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
  #[error("[{tick}] Error sending request: {source}")]
  Transport {
    tick: String,
    #[source]
    source: PollError,
  },

  #[error("[{tick}] Max retries exceeded after {retries} retries: {source}")]
  MaxRetriesExceeded {
    tick: String,
    retries: u32,
    #[source]
    source: PollError,
  },
}

impl MonitorError {
  /// Collection ticker the failed loop was monitoring.
  pub fn tick(&self) -> &str {
    match self {
      Self::Transport { tick, .. } | Self::MaxRetriesExceeded { tick, .. } => tick,
    }
  }
}

/// Failure to deliver a notification to one webhook target.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
  #[error("webhook request error: {0}")]
  Transport(String),

  #[error("webhook request unsuccessful: HTTP {status}")]
  Rejected { status: u16 },
}
