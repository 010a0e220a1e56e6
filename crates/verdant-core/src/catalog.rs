//! Reference-data catalog loaded from a TOML file.
//!
//! The catalog carries the two read-mostly collections the garden is
//! configured with at startup: vegetable types and fixed structures.
//! Structures declare their polygon as an ordered list of `[x, y]`
//! pairs in the same coordinate space as crops.

use std::path::Path;

use chrono::Utc;
use serde::Deserialize;

use crate::error::GardenError;
use crate::types::{Coord, Structure, VegetableType};

/// A structure as written in the catalog file.
#[derive(Debug, Clone, Deserialize)]
pub struct StructureSpec {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub polygon: Vec<[f64; 2]>,
}

impl StructureSpec {
    fn into_structure(self) -> Structure {
        Structure {
            id: self.id,
            name: self.name,
            category: self.category,
            description: self.description,
            polygon: self.polygon.into_iter().map(Coord::from).collect(),
            created_at: Utc::now(),
        }
    }
}

/// The parsed reference-data catalog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub vegetables: Vec<VegetableType>,
    #[serde(default)]
    pub structures: Vec<StructureSpec>,
}

impl Catalog {
    /// Load and validate a catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GardenError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::parse(&text)?;
        tracing::info!(
            path = %path.as_ref().display(),
            vegetables = catalog.vegetables.len(),
            structures = catalog.structures.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Parse catalog TOML and check its invariants.
    pub fn parse(text: &str) -> Result<Self, GardenError> {
        let catalog: Catalog = toml::from_str(text)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), GardenError> {
        for v in &self.vegetables {
            if !(1..=12).contains(&v.sowing_start_month) || !(1..=12).contains(&v.sowing_end_month)
            {
                return Err(GardenError::Catalog(format!(
                    "vegetable {} ({}): sowing months must be 1-12",
                    v.id, v.name
                )));
            }
            if self.vegetables.iter().filter(|o| o.id == v.id).count() > 1 {
                return Err(GardenError::Catalog(format!(
                    "duplicate vegetable id: {}",
                    v.id
                )));
            }
        }
        for s in &self.structures {
            if self.structures.iter().filter(|o| o.id == s.id).count() > 1 {
                return Err(GardenError::Catalog(format!(
                    "duplicate structure id: {}",
                    s.id
                )));
            }
            // A degenerate polygon is allowed — it just never blocks
            // anything — but it is almost certainly a data entry error.
            if s.polygon.len() < 3 {
                tracing::warn!(
                    structure = %s.id,
                    vertices = s.polygon.len(),
                    "Structure polygon has fewer than 3 vertices; it will never contain a point"
                );
            }
        }
        Ok(())
    }

    pub fn vegetable(&self, id: u32) -> Option<&VegetableType> {
        self.vegetables.iter().find(|v| v.id == id)
    }

    /// Materialize the configured structures with creation timestamps.
    pub fn structures(&self) -> Vec<Structure> {
        self.structures
            .iter()
            .cloned()
            .map(StructureSpec::into_structure)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [[vegetables]]
        id = 1
        name = "Tomato"
        description = "Indeterminate vine tomato"
        cycle_days = 120
        sowing_start_month = 3
        sowing_end_month = 6
        footprint = 0.5
        min_spacing = 40.0
        pests = ["aphid", "whitefly"]
        care_notes = ["stake when 30cm tall"]

        [[vegetables]]
        id = 2
        name = "Lamb's lettuce"
        description = "Cold-hardy salad green"
        cycle_days = 50
        sowing_start_month = 11
        sowing_end_month = 2

        [[structures]]
        id = "shed"
        name = "Tool shed"
        category = "building"
        description = "Brick shed in the north corner"
        polygon = [[700.0, 20.0], [780.0, 20.0], [780.0, 100.0], [700.0, 100.0]]
    "#;

    #[test]
    fn parses_vegetables_and_structures() {
        let catalog = Catalog::parse(SAMPLE).unwrap();
        assert_eq!(catalog.vegetables.len(), 2);
        assert_eq!(catalog.structures.len(), 1);

        let tomato = catalog.vegetable(1).unwrap();
        assert_eq!(tomato.name, "Tomato");
        assert_eq!(tomato.cycle_days, 120);
        assert_eq!(tomato.pests, vec!["aphid", "whitefly"]);

        let structures = catalog.structures();
        assert_eq!(structures[0].polygon.len(), 4);
        assert_eq!(structures[0].polygon[0], Coord::new(700.0, 20.0));
    }

    #[test]
    fn defaults_applied_to_optional_fields() {
        let catalog = Catalog::parse(SAMPLE).unwrap();
        let lettuce = catalog.vegetable(2).unwrap();
        assert!(lettuce.pests.is_empty());
        assert_eq!(lettuce.footprint, 1.0);
        assert_eq!(lettuce.min_spacing, 25.0);
    }

    #[test]
    fn wrapping_sowing_season_kept_as_configured() {
        let catalog = Catalog::parse(SAMPLE).unwrap();
        let lettuce = catalog.vegetable(2).unwrap();
        assert_eq!(lettuce.sowing_start_month, 11);
        assert_eq!(lettuce.sowing_end_month, 2);
    }

    #[test]
    fn rejects_out_of_range_month() {
        let bad = r#"
            [[vegetables]]
            id = 1
            name = "Broken"
            description = ""
            cycle_days = 10
            sowing_start_month = 0
            sowing_end_month = 5
        "#;
        assert!(matches!(
            Catalog::parse(bad),
            Err(GardenError::Catalog(_))
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let bad = r#"
            [[vegetables]]
            id = 1
            name = "A"
            description = ""
            cycle_days = 10
            sowing_start_month = 1
            sowing_end_month = 2

            [[vegetables]]
            id = 1
            name = "B"
            description = ""
            cycle_days = 10
            sowing_start_month = 1
            sowing_end_month = 2
        "#;
        assert!(matches!(Catalog::parse(bad), Err(GardenError::Catalog(_))));
    }

    #[test]
    fn missing_vegetable_lookup_is_none() {
        let catalog = Catalog::parse(SAMPLE).unwrap();
        assert!(catalog.vegetable(99).is_none());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garden.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.vegetables.len(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            Catalog::load("/nonexistent/garden.toml"),
            Err(GardenError::Io(_))
        ));
    }
}
