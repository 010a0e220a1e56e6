//! verdant-service — composition root for the Verdant garden graph.
//!
//! Builds the domain model, store manager, synchronization adapter,
//! and spatial engine into one explicitly-constructed service object
//! that collaborators (HTTP handlers, CLI commands) hold a handle to.
//! No component in this workspace is reachable through global state.

pub mod config;
pub mod service;

pub use config::{GardenSettings, ServiceConfig, StoreSettings};
pub use service::{GardenService, GardenStats, Health};
