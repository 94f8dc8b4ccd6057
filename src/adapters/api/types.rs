//! UniSat API Request/Response Types
//!
//! Defines the serialization types for the auction-list endpoint of
//! the UniSat open API. The response side is lenient: absent or
//! `null` fields fall back to their defaults, matching how the
//! marketplace omits data for sparse listings.

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::listing::{Listing, PollResult};

/// Number of listings requested per poll; only the first is used.
pub const PAGE_LIMIT: u32 = 5;

/// Auction-list request payload.
#[derive(Debug, Clone, Serialize)]
pub struct AuctionListRequest {
  pub filter: AuctionFilter,
  pub sort: AuctionSort,
  pub start: u32,
  pub limit: u32,
}

/// Listing filter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionFilter {
  /// Protocol name ("brc20").
  pub nft_type: String,
  /// Collection ticker.
  pub tick: String,
  pub min_price: u64,
  /// Only active (not ended) auctions.
  pub is_end: bool,
}

/// Sort order; `1` = ascending.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSort {
  pub unit_price: i32,
}

impl AuctionListRequest {
  /// Cheapest-first page of active listings for `tick`.
  pub fn cheapest(nft_type: &str, tick: &str) -> Self {
    Self {
      filter: AuctionFilter {
        nft_type: nft_type.to_string(),
        tick: tick.to_string(),
        min_price: 0,
        is_end: false,
      },
      sort: AuctionSort { unit_price: 1 },
      start: 0,
      limit: PAGE_LIMIT,
    }
  }
}

/// Auction-list response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct AuctionListResponse {
  /// Numeric or string status code, informational only.
  #[serde(default)]
  pub code: serde_json::Value,
  #[serde(default, deserialize_with = "null_as_default")]
  pub msg: String,
  #[serde(default)]
  pub data: Option<AuctionListData>,
}

/// Payload of a successful auction-list response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuctionListData {
  #[serde(default, deserialize_with = "null_as_default")]
  pub list: Vec<AuctionItem>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub total: u64,
  #[serde(default, deserialize_with = "null_as_default")]
  pub timestamp: i64,
}

/// A single auction entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionItem {
  #[serde(default, deserialize_with = "null_as_default")]
  pub auction_id: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub amount: f64,
  #[serde(default, deserialize_with = "null_as_default")]
  pub inscription_id: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub inscription_number: i64,
  #[serde(default, deserialize_with = "null_as_default")]
  pub market_type: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub nft_type: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub status: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub tick: String,
  /// Sats per token.
  #[serde(default, deserialize_with = "null_as_default")]
  pub unit_price: f64,
  /// Total sats for the listing.
  #[serde(default, deserialize_with = "null_as_default")]
  pub price: f64,
  /// Seller address.
  #[serde(default, deserialize_with = "null_as_default")]
  pub address: String,
}

impl From<AuctionItem> for Listing {
  fn from(item: AuctionItem) -> Self {
    Self {
      auction_id: item.auction_id,
      inscription_id: item.inscription_id,
      inscription_number: item.inscription_number,
      tick: item.tick,
      address: item.address,
      status: item.status,
      market_type: item.market_type,
      amount: item.amount,
      unit_price: item.unit_price,
      price: item.price,
    }
  }
}

impl From<AuctionListResponse> for PollResult {
  fn from(response: AuctionListResponse) -> Self {
    let data = response.data.unwrap_or_default();
    Self {
      listings: data.list.into_iter().map(Listing::from).collect(),
      total: data.total,
      timestamp: data.timestamp,
    }
  }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
