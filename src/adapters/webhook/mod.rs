//! Webhook Notification Adapters
//!
//! Implements the `Notifier` port for chat webhooks.
//!
//! Sub-modules:
//! - `discord`: Discord embed formatting and delivery

pub mod discord;

pub use discord::DiscordNotifier;
