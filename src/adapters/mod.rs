//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, metrics export). Each
//! sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `api`: UniSat auction-list REST client
//! - `metrics`: Prometheus metrics export and liveness probe
//! - `webhook`: Discord webhook notifier

pub mod api;
pub mod metrics;
pub mod webhook;
