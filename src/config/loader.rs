//! Configuration Loader - File Loading and Validation
//!
//! Handles loading the config file (JSON or TOML, picked by
//! extension), validating all parameters, and providing clear
//! error messages for misconfiguration.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use tracing::info;

use super::{AppConfig, Endpoints, Protocol, Settings, WebhookTarget};
use crate::domain::keys::KeyRing;
use crate::errors::ConfigError;

/// On-disk config formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
  Json,
  Toml,
}

impl ConfigFormat {
  /// `.toml` files are TOML; everything else is read as JSON.
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|ext| ext.to_str()) {
      Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
      _ => Self::Json,
    }
  }
}

/// Load, parse and validate the config file at `path`.
///
/// # Errors
/// Returns a `ConfigError` if:
/// - The file doesn't exist or can't be read
/// - Parsing fails
/// - Any validation rule is violated
pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
  let path = path.as_ref();

  let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
    path: path.display().to_string(),
    source,
  })?;

  let config = parse_config(&content, ConfigFormat::from_path(path))?;
  let settings = Settings::try_from(config)?;

  info!(
    path = %path.display(),
    protocol = %settings.protocol,
    collections = settings.collections.len(),
    api_keys = settings.api_keys.len(),
    webhooks = settings.webhooks.len(),
    "Configuration loaded successfully"
  );

  Ok(settings)
}

/// Parse a raw config document without validating it.
///
/// # Errors
/// `ConfigError::Parse` on malformed input.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<AppConfig, ConfigError> {
  match format {
    ConfigFormat::Json => {
      serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
    ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string())),
  }
}

impl TryFrom<AppConfig> for Settings {
  type Error = ConfigError;

  fn try_from(config: AppConfig) -> Result<Self, Self::Error> {
    let protocol = validate_config(&config)?;
    let endpoints = Endpoints::for_protocol(protocol, &config.api_base_url)?;
    let api_keys = KeyRing::new(config.api_keys)?;

    let webhooks = config
      .webhooks
      .into_iter()
      .map(|(name, url)| WebhookTarget { name, url })
      .collect();

    Ok(Self {
      protocol,
      collections: config.collections,
      api_keys,
      delay: Duration::from_millis(config.delay_ms),
      timeout: Duration::from_millis(config.timeout_ms),
      max_retries: config.max_retries,
      webhooks,
      endpoints,
      notify_threshold_pct: config.notify_threshold,
      usd_per_btc: config.usd_per_btc,
      retry_reset: config.retry_reset,
      logging: config.logging,
      metrics: config.metrics,
    })
  }
}

/// Validate all configuration parameters, in a fixed order.
///
/// Returns the parsed protocol on success.
fn validate_config(config: &AppConfig) -> Result<Protocol, ConfigError> {
  // Collections
  if config.collections.is_empty() {
    return Err(ConfigError::EmptyCollections);
  }
  let mut seen = HashSet::with_capacity(config.collections.len());
  for (i, tick) in config.collections.iter().enumerate() {
    if tick.trim().is_empty() {
      return Err(ConfigError::BlankCollection(i));
    }
    if !seen.insert(tick.as_str()) {
      return Err(ConfigError::DuplicateCollection(tick.clone()));
    }
  }

  // API keys
  if config.api_keys.is_empty() {
    return Err(ConfigError::NoApiKeys);
  }
  if let Some(i) = config.api_keys.iter().position(|k| k.trim().is_empty()) {
    return Err(ConfigError::BlankApiKey(i));
  }

  let protocol: Protocol = config.protocol.parse()?;

  // Webhooks
  if config.webhooks.is_empty() {
    return Err(ConfigError::NoWebhooks);
  }
  for (name, url) in &config.webhooks {
    check_http_url(url).map_err(|reason| ConfigError::InvalidWebhookUrl {
      name: name.clone(),
      reason,
    })?;
  }
  check_http_url(&config.api_base_url).map_err(ConfigError::InvalidBaseUrl)?;

  // Timing and retries
  if config.delay_ms == 0 {
    return Err(ConfigError::NotPositive("Delay"));
  }
  if config.max_retries == 0 {
    return Err(ConfigError::NotPositive("MaxRetries"));
  }
  if config.timeout_ms == 0 {
    return Err(ConfigError::NotPositive("Timeout"));
  }
  if config.timeout_ms <= config.delay_ms {
    return Err(ConfigError::TimeoutNotAboveDelay {
      timeout_ms: config.timeout_ms,
      delay_ms: config.delay_ms,
    });
  }

  // Notification tunables
  if !config.notify_threshold.is_finite() || config.notify_threshold < 0.0 {
    return Err(ConfigError::InvalidThreshold(config.notify_threshold));
  }
  if !config.usd_per_btc.is_finite() || config.usd_per_btc <= 0.0 {
    return Err(ConfigError::InvalidFiatRate(config.usd_per_btc));
  }

  Ok(protocol)
}

fn check_http_url(raw: &str) -> Result<(), String> {
  let url = Url::parse(raw).map_err(|e| e.to_string())?;
  match url.scheme() {
    "http" | "https" => Ok(()),
    other => Err(format!("unsupported scheme '{other}'")),
  }
}
