//! Notifier Port - Floor-drop Alert Delivery
//!
//! Formatting belongs to the implementor: the loop only hands over
//! the event and the target it wants reached.

use async_trait::async_trait;

use crate::config::WebhookTarget;
use crate::domain::floor::PriceChangeEvent;
use crate::errors::DeliveryError;

/// Trait for notification channels.
///
/// Called once per configured target. A failure is reported for that
/// target only; the caller keeps going with the next one.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
  /// Format `event` and deliver it to `target`.
  async fn notify(
    &self,
    target: &WebhookTarget,
    event: &PriceChangeEvent,
  ) -> Result<(), DeliveryError>;
}
