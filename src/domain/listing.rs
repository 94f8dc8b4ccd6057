//! Marketplace listing types.
//!
//! Transport-independent view of an auction listing and of one poll
//! result. Adapters convert their wire types into these.

use serde::{Deserialize, Serialize};

/// Satoshis per bitcoin.
pub const SATS_PER_BTC: f64 = 1e8;

/// A single active auction listing for a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Marketplace auction identifier.
    pub auction_id: String,
    /// Inscription backing the listing; used to build the buy link.
    pub inscription_id: String,
    /// Inscription number, informational only.
    pub inscription_number: i64,
    /// Collection ticker.
    pub tick: String,
    /// Seller address.
    pub address: String,
    /// Listing status as reported by the marketplace.
    pub status: String,
    /// Market type (e.g. "brc20").
    pub market_type: String,
    /// Token amount in the listing.
    pub amount: f64,
    /// Price per token, in sats.
    pub unit_price: f64,
    /// Total price of the listing, in sats.
    pub price: f64,
}

impl Listing {
    /// Total listing price converted to BTC.
    pub fn price_btc(&self) -> f64 {
        self.price / SATS_PER_BTC
    }
}

/// Result of one successful poll.
///
/// `listings` keeps the API order, which is ascending by unit price,
/// so the floor is always element 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollResult {
    pub listings: Vec<Listing>,
    pub total: u64,
    pub timestamp: i64,
}

impl PollResult {
    /// Cheapest listing, if any were returned.
    pub fn cheapest(&self) -> Option<&Listing> {
        self.listings.first()
    }
}
