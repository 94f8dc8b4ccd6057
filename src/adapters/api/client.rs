//! UniSat HTTP Client - Auction-list Poller
//!
//! Wraps reqwest for the auction-list endpoint. One `poll` is exactly
//! one request: no retries and no backoff here, the monitor loop owns
//! the retry budget and needs each failure classified.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::types::{AuctionListRequest, AuctionListResponse};
use crate::config::{Protocol, Settings};
use crate::domain::listing::PollResult;
use crate::errors::PollError;
use crate::ports::poll_client::PollClient;

/// Configuration for the UniSat HTTP client.
#[derive(Debug, Clone)]
pub struct UnisatClientConfig {
  /// Full auction-list URL.
  pub monitoring_url: String,
  /// Protocol used as the `nftType` filter.
  pub protocol: Protocol,
  /// Per-request timeout.
  pub timeout: Duration,
}

impl From<&Settings> for UnisatClientConfig {
  fn from(settings: &Settings) -> Self {
    Self {
      monitoring_url: settings.endpoints.monitoring_url.clone(),
      protocol: settings.protocol,
      timeout: settings.timeout,
    }
  }
}

/// HTTP client for the UniSat auction-list API.
///
/// Shared by every loop; reqwest pools connections internally.
pub struct UnisatClient {
  /// Underlying HTTP client.
  http: Client,
  /// Client configuration.
  config: UnisatClientConfig,
}

impl UnisatClient {
  /// Create a new UniSat client.
  pub fn new(config: UnisatClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(5)
      .build()
      .context("Failed to build HTTP client")?;

    Ok(Self { http, config })
  }
}

#[async_trait]
impl PollClient for UnisatClient {
  async fn poll(&self, tick: &str, api_key: &str) -> Result<PollResult, PollError> {
    let body = AuctionListRequest::cheapest(self.config.protocol.as_str(), tick);

    let response = self
      .http
      .post(&self.config.monitoring_url)
      .bearer_auth(api_key)
      .header(ACCEPT, "application/json")
      .header(CONTENT_TYPE, "application/json")
      .json(&body)
      .send()
      .await
      .map_err(|e| PollError::Transport(e.to_string()))?;

    let status = response.status();
    if status != StatusCode::OK {
      // most likely the free-tier daily quota of the key ran out
      return Err(PollError::Http {
        status: status.as_u16(),
      });
    }

    let decoded: AuctionListResponse =
      response.json().await.map_err(|e| PollError::Decode {
        status: status.as_u16(),
        reason: e.to_string(),
      })?;

    let result = PollResult::from(decoded);
    debug!(
      tick,
      listings = result.listings.len(),
      total = result.total,
      server_ts = result.timestamp,
      "Auction list received"
    );

    Ok(result)
  }
}
