//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use-case layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `PollClient`: Marketplace auction-listing requests
//! - `Notifier`: Delivery of floor-drop alerts to webhook targets

pub mod notifier;
pub mod poll_client;

pub use notifier::Notifier;
pub use poll_client::PollClient;
