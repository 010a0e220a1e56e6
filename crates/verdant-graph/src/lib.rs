//! verdant-graph — Neo4j-backed persistence for the garden graph.
//!
//! This crate is the single mutation point for the garden's graph
//! store. All store reads and writes flow through it, and every
//! operation degrades gracefully when the store is unreachable: writes
//! become best-effort no-ops, reads fall back to the in-memory garden
//! map.

pub mod client;
pub mod schema;
pub mod spatial;
pub mod sync;

pub use client::{GraphConfig, GraphError, Param, RowCursor, StoreConnection, StoreManager};
pub use spatial::{CropHit, CropRecord, SpatialEngine};
pub use sync::GraphSync;
