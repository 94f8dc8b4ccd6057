//! Floor-price state tracking.
//!
//! `FloorListing` is the per-collection record of the last observed
//! floor. Each loop owns exactly one and feeds it the cheapest listing
//! of every non-empty poll. An unset floor is represented by a zero
//! unit price, which is the state a freshly created record starts in.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::listing::{Listing, SATS_PER_BTC};

/// Prices attached to the current floor listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Price {
    /// Unit price in sats.
    pub sats: f64,
    /// Total listing price in BTC.
    pub btc: f64,
    /// Percentage drop from the previous floor (negative = rise).
    pub delta: f64,
    /// Fiat value of the per-unit drop; set only when notifying.
    pub delta_usd: f64,
}

/// Last known floor listing for one collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FloorListing {
    /// Inscription id of the floor listing.
    pub id: String,
    /// Seller address of the floor listing.
    pub collection: String,
    /// Collection ticker.
    pub tick: String,
    /// Current floor prices.
    pub price: Price,
    /// Unit price held by `price.sats` before the last update.
    pub prev_floor: f64,
}

/// A floor move between two consecutive observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceChange {
    pub previous: f64,
    pub current: f64,
    /// `(previous - current) / previous * 100`; positive means a drop.
    pub delta_pct: f64,
}

impl PriceChange {
    /// Whether the drop is large enough to notify about.
    pub fn is_significant(&self, threshold_pct: f64) -> bool {
        self.delta_pct >= threshold_pct
    }

    /// Per-unit drop converted to fiat at `usd_per_btc`.
    pub fn fiat_delta(&self, usd_per_btc: f64) -> f64 {
        (self.previous - self.current) / SATS_PER_BTC * usd_per_btc
    }

    /// Signed change as shown in logs: `-x.xxx %` for a drop,
    /// `+x.xxx %` for a rise.
    pub fn signed_change(&self) -> String {
        if self.delta_pct < 0.0 {
            format!("+{:.3} %", -self.delta_pct)
        } else {
            format!("-{:.3} %", self.delta_pct)
        }
    }
}

/// What a single observation did to the floor record.
#[derive(Debug, Clone, PartialEq)]
pub enum FloorUpdate {
    /// First observation; the record was empty and is now set.
    Initialized { floor: f64 },
    /// Cheapest price equals the stored one; nothing was mutated.
    Unchanged { floor: f64 },
    /// The floor moved and the record was updated.
    Changed(PriceChange),
}

/// Percentage drop from `previous` to `current`.
pub fn percentage_delta(previous: f64, current: f64) -> f64 {
    ((previous - current) / previous) * 100.0
}

impl FloorListing {
    /// Whether a first observation has been recorded.
    pub fn is_initialized(&self) -> bool {
        self.price.sats != 0.0
    }

    /// Fold the cheapest listing of a poll into the record.
    #[allow(clippy::float_cmp)]
    pub fn observe(&mut self, cheapest: &Listing) -> FloorUpdate {
        if !self.is_initialized() {
            self.set_from(cheapest);
            self.prev_floor = cheapest.unit_price;
            self.price.delta = 0.0;
            return FloorUpdate::Initialized {
                floor: cheapest.unit_price,
            };
        }

        let previous = self.price.sats;
        let current = cheapest.unit_price;
        if current == previous {
            return FloorUpdate::Unchanged { floor: current };
        }

        let delta_pct = percentage_delta(previous, current);
        self.set_from(cheapest);
        self.prev_floor = previous;
        self.price.delta = delta_pct;

        FloorUpdate::Changed(PriceChange {
            previous,
            current,
            delta_pct,
        })
    }

    fn set_from(&mut self, listing: &Listing) {
        self.id.clone_from(&listing.inscription_id);
        self.collection.clone_from(&listing.address);
        self.tick.clone_from(&listing.tick);
        self.price.sats = listing.unit_price;
        self.price.btc = listing.price_btc();
    }
}

/// Everything a notifier needs to describe a qualifying floor drop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceChangeEvent {
    pub tick: String,
    pub listing_id: String,
    pub old_floor: f64,
    pub new_floor: f64,
    pub price_btc: f64,
    pub delta_pct: f64,
    pub delta_usd: f64,
    pub collection_url: String,
    pub listing_url: String,
    pub observed_at: DateTime<Utc>,
}

impl PriceChangeEvent {
    /// Build the event from an updated floor record.
    pub fn from_floor(
        floor: &FloorListing,
        collection_base_url: &str,
        listing_base_url: &str,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tick: floor.tick.clone(),
            listing_id: floor.id.clone(),
            old_floor: floor.prev_floor,
            new_floor: floor.price.sats,
            price_btc: floor.price.btc,
            delta_pct: floor.price.delta,
            delta_usd: floor.price.delta_usd,
            collection_url: format!("{collection_base_url}{}", floor.tick),
            listing_url: format!("{listing_base_url}{}", floor.id),
            observed_at,
        }
    }
}

/// Render a sat amount the way the logs and embeds show it:
/// whole numbers without decimals, fractions with three.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
pub fn format_sats(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.3}")
    }
}
