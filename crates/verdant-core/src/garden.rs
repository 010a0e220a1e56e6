//! The authoritative in-memory garden model.
//!
//! `GardenMap` holds the crops, structures, annotations, and reference
//! vegetable data for one garden and enforces the collision and
//! annotation-target invariants. It owns no external resources;
//! persistence is the synchronization adapter's job, and every
//! mutation here is visible to subsequent reads immediately.
//!
//! Callers that share a map across threads wrap it in `RwLock`
//! (writers exclusive, readers shared).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::error::GardenError;
use crate::geometry::within_radius;
use crate::types::{
    Annotation, AnnotationTarget, Coord, CropStatus, Garden, PlacedCrop, Structure, VegetableType,
};

/// Minimum allowed distance between two crops' coordinates.
pub const DEFAULT_COLLISION_RADIUS: f64 = 25.0;

/// Default pick-up tolerance for coordinate lookups.
pub const DEFAULT_FIND_TOLERANCE: f64 = 20.0;

/// Entity counts, used by health checks and store-less statistics.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GardenCounts {
    pub crops: usize,
    pub structures: usize,
    pub annotations: usize,
    pub vegetable_types: usize,
}

pub struct GardenMap {
    garden: Garden,
    vegetable_types: BTreeMap<u32, VegetableType>,
    crops: Vec<PlacedCrop>,
    structures: Vec<Structure>,
    annotations: Vec<Annotation>,
    collision_radius: f64,
    crop_seq: u64,
    structure_seq: u64,
}

impl GardenMap {
    /// Build a map from the reference catalog.
    pub fn new(garden: Garden, catalog: &Catalog, collision_radius: f64) -> Self {
        let vegetable_types = catalog
            .vegetables
            .iter()
            .map(|v| (v.id, v.clone()))
            .collect();
        let structures = catalog.structures();
        let structure_seq = structures.len() as u64;

        Self {
            garden,
            vegetable_types,
            crops: Vec::new(),
            structures,
            annotations: Vec::new(),
            collision_radius,
            crop_seq: 0,
            structure_seq,
        }
    }

    pub fn garden(&self) -> &Garden {
        &self.garden
    }

    pub fn collision_radius(&self) -> f64 {
        self.collision_radius
    }

    pub fn vegetable_type(&self, id: u32) -> Option<&VegetableType> {
        self.vegetable_types.get(&id)
    }

    pub fn vegetable_types(&self) -> impl Iterator<Item = &VegetableType> {
        self.vegetable_types.values()
    }

    pub fn crops(&self) -> &[PlacedCrop] {
        &self.crops
    }

    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    pub fn counts(&self) -> GardenCounts {
        GardenCounts {
            crops: self.crops.len(),
            structures: self.structures.len(),
            annotations: self.annotations.len(),
            vegetable_types: self.vegetable_types.len(),
        }
    }

    // ── Crops ─────────────────────────────────────────────────────

    /// Place a crop, assigning the next sequential id.
    ///
    /// Fails if the vegetable type is unknown or any active crop lies
    /// within the collision radius of `position`.
    pub fn place_crop(
        &mut self,
        vegetable_type_id: u32,
        position: Coord,
        sown_on: NaiveDate,
    ) -> Result<String, GardenError> {
        self.check_placement(vegetable_type_id, position)?;

        self.crop_seq += 1;
        let id = format!("crop_{}", self.crop_seq);
        self.crops.push(PlacedCrop {
            id: id.clone(),
            vegetable_type_id,
            position,
            sown_on,
            status: CropStatus::Active,
        });
        Ok(id)
    }

    /// Insert a crop with a caller-supplied id (hydration, admin tools).
    /// The same invariants apply as for `place_crop`.
    pub fn restore_crop(&mut self, crop: PlacedCrop) -> Result<String, GardenError> {
        self.check_placement(crop.vegetable_type_id, crop.position)?;

        // Keep the generator ahead of restored sequential ids so a
        // later place_crop cannot collide with them.
        if let Some(n) = crop
            .id
            .strip_prefix("crop_")
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.crop_seq = self.crop_seq.max(n);
        }

        let id = crop.id.clone();
        self.crops.push(crop);
        Ok(id)
    }

    fn check_placement(&self, vegetable_type_id: u32, position: Coord) -> Result<(), GardenError> {
        if !self.vegetable_types.contains_key(&vegetable_type_id) {
            return Err(GardenError::UnknownVegetableType(vegetable_type_id));
        }
        for crop in &self.crops {
            if crop.status == CropStatus::Active
                && within_radius(crop.position, position, self.collision_radius)
            {
                return Err(GardenError::Collision {
                    x: position.x,
                    y: position.y,
                    existing: crop.id.clone(),
                    radius: self.collision_radius,
                });
            }
        }
        Ok(())
    }

    /// First crop within `tolerance` of `position`, if any.
    pub fn find_crop_at(&self, position: Coord, tolerance: f64) -> Option<&PlacedCrop> {
        self.crops
            .iter()
            .find(|c| within_radius(c.position, position, tolerance))
    }

    pub fn crop(&self, id: &str) -> Option<&PlacedCrop> {
        self.crops.iter().find(|c| c.id == id)
    }

    /// Remove a crop, returning it if it was present.
    pub fn remove_crop(&mut self, id: &str) -> Option<PlacedCrop> {
        let idx = self.crops.iter().position(|c| c.id == id)?;
        Some(self.crops.remove(idx))
    }

    /// Transition a crop's lifecycle state — the only in-place mutation.
    pub fn set_crop_status(&mut self, id: &str, status: CropStatus) -> Result<(), GardenError> {
        let crop = self
            .crops
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| GardenError::CropNotFound(id.to_string()))?;
        crop.status = status;
        Ok(())
    }

    // ── Structures ────────────────────────────────────────────────

    /// Add a structure (administrative operation). An id is assigned
    /// when the caller leaves it empty.
    pub fn add_structure(&mut self, mut structure: Structure) -> String {
        if structure.id.is_empty() {
            self.structure_seq += 1;
            structure.id = format!("structure_{}", self.structure_seq);
        }
        let id = structure.id.clone();
        self.structures.push(structure);
        id
    }

    // ── Annotations ───────────────────────────────────────────────

    /// Append an annotation. No uniqueness check on content.
    pub fn add_annotation(&mut self, annotation: Annotation) -> String {
        let id = annotation.id.clone();
        self.annotations.push(annotation);
        id
    }

    /// Annotations with exactly this target, in insertion order.
    pub fn annotations_for(&self, target: &AnnotationTarget) -> Vec<&Annotation> {
        self.annotations
            .iter()
            .filter(|a| &a.target == target)
            .collect()
    }
}
