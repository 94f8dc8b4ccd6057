//! Domain layer - Core floor-tracking logic and models.
//!
//! Pure state and arithmetic for the monitor: listings, floor
//! records, delta computation and API key rotation. No I/O here
//! (hexagonal architecture inner ring); everything is testable in
//! isolation.

pub mod floor;
pub mod keys;
pub mod listing;

// Re-export core types for convenience
pub use floor::{FloorListing, FloorUpdate, PriceChange, PriceChangeEvent};
pub use keys::KeyRing;
pub use listing::{Listing, PollResult};
