//! Poll Client Port - Marketplace Listing Interface
//!
//! Defines the trait the monitor loop uses to fetch the cheapest
//! active listings for one collection.

use async_trait::async_trait;

use crate::domain::listing::PollResult;
use crate::errors::PollError;

/// Trait for marketplace listing providers.
///
/// One call is one request/response cycle; implementors never retry
/// internally, the retry budget belongs to the caller. The error
/// variant tells the caller whether the failure is retryable
/// (`Http`, `Decode`) or ends the loop (`Transport`).
#[async_trait]
pub trait PollClient: Send + Sync + 'static {
  /// Fetch listings for `tick`, ascending by unit price, using
  /// `api_key` as the bearer credential.
  async fn poll(&self, tick: &str, api_key: &str) -> Result<PollResult, PollError>;
}
