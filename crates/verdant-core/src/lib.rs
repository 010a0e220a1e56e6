//! verdant-core: Shared types and the in-memory garden model for Verdant.
//!
//! This crate provides the foundation used across all Verdant components:
//! - Domain types (VegetableType, PlacedCrop, Structure, Annotation)
//! - Pure 2-D geometry (point-in-polygon, distance)
//! - The reference-data catalog loaded from TOML
//! - The authoritative in-memory garden map with collision checking
//! - Common error types

pub mod catalog;
pub mod error;
pub mod garden;
pub mod geometry;
pub mod types;

pub use catalog::Catalog;
pub use error::GardenError;
pub use garden::GardenMap;
pub use types::{
    Annotation, AnnotationKind, AnnotationTarget, Coord, CropStatus, Garden, PlacedCrop,
    Specificity, Structure, VegetableType,
};
