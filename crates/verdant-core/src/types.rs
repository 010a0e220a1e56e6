//! Core domain types for the Verdant garden graph.
//!
//! These types describe the nodes of the garden graph — the singleton
//! garden canvas, reference vegetable types, placed crops, blocked
//! structures, and annotations — shared across all Verdant components.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Coordinates ───────────────────────────────────────────────────

/// A position on the garden canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Coord {
    fn from(pair: [f64; 2]) -> Self {
        Self {
            x: pair[0],
            y: pair[1],
        }
    }
}

// ── Garden ────────────────────────────────────────────────────────

/// The singleton spatial canvas that contains every placed crop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Garden {
    pub id: String,
    pub name: String,
    pub width: f64,
    pub height: f64,
}

impl Default for Garden {
    fn default() -> Self {
        Self {
            id: "garden_main".to_string(),
            name: "Main plot".to_string(),
            width: 800.0,
            height: 600.0,
        }
    }
}

// ── Reference data ────────────────────────────────────────────────

/// Reference data for a species/cultivar: growth cycle and care needs.
///
/// Loaded once at startup from the catalog file; immutable thereafter.
/// The sowing season may wrap across the year boundary
/// (e.g. start month 11, end month 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VegetableType {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub cycle_days: u32,
    pub sowing_start_month: u8,
    pub sowing_end_month: u8,
    #[serde(default = "default_footprint")]
    pub footprint: f64,
    #[serde(default = "default_min_spacing")]
    pub min_spacing: f64,
    #[serde(default)]
    pub pests: Vec<String>,
    #[serde(default)]
    pub care_notes: Vec<String>,
}

fn default_footprint() -> f64 {
    1.0
}

fn default_min_spacing() -> f64 {
    25.0
}

// ── Crops ─────────────────────────────────────────────────────────

/// Lifecycle state of a placed crop. Crops are created `Active`;
/// the other states are transition targets only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CropStatus {
    Active,
    Harvested,
    Removed,
}

impl CropStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Harvested => "harvested",
            Self::Removed => "removed",
        }
    }

    /// Parse the stored string form; unknown values fall back to `Active`.
    pub fn parse(s: &str) -> Self {
        match s {
            "harvested" => Self::Harvested,
            "removed" => Self::Removed,
            _ => Self::Active,
        }
    }
}

/// A single planted instance of a vegetable type at a coordinate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedCrop {
    pub id: String,
    pub vegetable_type_id: u32,
    pub position: Coord,
    pub sown_on: NaiveDate,
    pub status: CropStatus,
}

// ── Structures ────────────────────────────────────────────────────

/// A fixed polygonal area that blocks planting (building, path, pond).
///
/// Polygons with fewer than three vertices are kept but never contain
/// any point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub polygon: Vec<Coord>,
    pub created_at: DateTime<Utc>,
}

// ── Annotations ───────────────────────────────────────────────────

/// What kind of note an annotation carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Note,
    Pest,
    Harvest,
    Task,
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Pest => "pest",
            Self::Harvest => "harvest",
            Self::Task => "task",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pest" => Self::Pest,
            "harvest" => Self::Harvest,
            "task" => Self::Task,
            _ => Self::Note,
        }
    }
}

/// How broadly an annotation applies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Specificity {
    Individual,
    Species,
    TimeWindow,
    Season,
}

impl Specificity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Species => "species",
            Self::TimeWindow => "time_window",
            Self::Season => "season",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "individual" => Self::Individual,
            "species" => Self::Species,
            "time_window" => Self::TimeWindow,
            _ => Self::Season,
        }
    }
}

/// The one thing an annotation is attached to.
///
/// A note targets a single crop, a whole vegetable type, or the garden
/// as a whole — never more than one of these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "target", content = "id", rename_all = "snake_case")]
pub enum AnnotationTarget {
    Crop(String),
    VegetableType(u32),
    Garden,
}

/// A free-text note with optional photo references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub kind: AnnotationKind,
    pub specificity: Specificity,
    pub at: DateTime<Utc>,
    pub note: String,
    #[serde(default)]
    pub photos: Vec<String>,
    pub target: AnnotationTarget,
}

impl Annotation {
    /// Build an annotation with a fresh id and the current timestamp.
    pub fn new(
        kind: AnnotationKind,
        specificity: Specificity,
        target: AnnotationTarget,
        note: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            specificity,
            at: Utc::now(),
            note: note.into(),
            photos: Vec::new(),
            target,
        }
    }
}
