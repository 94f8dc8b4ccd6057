//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with the port interfaces.
//!
//! Use cases:
//! - `MonitorLoop`: Per-collection poll, floor tracking and notification
//! - `Supervisor`: Spawns the loops and coordinates shutdown

pub mod monitor_loop;
pub mod supervisor;

pub use monitor_loop::{MonitorLoop, Step};
pub use supervisor::{CollectionReport, Supervisor, failed_ticks};
