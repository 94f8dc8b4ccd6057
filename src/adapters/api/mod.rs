//! UniSat Marketplace API Adapter
//!
//! Implements the `PollClient` port against the UniSat open API
//! auction-list endpoint.
//!
//! Sub-modules:
//! - `client`: HTTP client issuing one request per poll
//! - `types`: API request/response type definitions

pub mod client;
pub mod types;

pub use client::{UnisatClient, UnisatClientConfig};
