//! Proximity and point-in-polygon queries over the garden graph.
//!
//! Every query asks the store first and falls back to scanning the
//! in-memory garden map with the same distance/sort/limit logic, so
//! collaborators never need to know whether the store is reachable.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use neo4rs::{query, Row};
use serde::Serialize;

use verdant_core::geometry::{distance, point_in_polygon};
use verdant_core::{Coord, CropStatus, GardenMap, Structure};

use crate::client::{GraphError, StoreConnection, StoreManager};

/// Default result cap for nearest-crop queries.
pub const DEFAULT_NEAREST_LIMIT: usize = 5;

/// A crop row as returned from spatial queries.
#[derive(Debug, Clone, Serialize)]
pub struct CropRecord {
    pub id: String,
    pub vegetable_type_id: u32,
    pub type_name: String,
    pub position: Coord,
    pub sown_on: NaiveDate,
    pub status: CropStatus,
}

/// A crop row ranked by distance from a query point.
#[derive(Debug, Clone, Serialize)]
pub struct CropHit {
    #[serde(flatten)]
    pub crop: CropRecord,
    pub distance: f64,
}

/// Store-first spatial queries with an in-memory fallback.
pub struct SpatialEngine {
    store: Arc<StoreManager>,
    garden: Arc<RwLock<GardenMap>>,
}

impl SpatialEngine {
    pub fn new(store: Arc<StoreManager>, garden: Arc<RwLock<GardenMap>>) -> Self {
        Self { store, garden }
    }

    /// Crops within an axis-aligned box of `radius` around the point,
    /// ranked by true Euclidean distance, capped at `limit`.
    pub async fn nearest_crops(&self, x: f64, y: f64, radius: f64, limit: usize) -> Vec<CropHit> {
        if let Some(conn) = self.store.open().await {
            match store_nearest(&conn, x, y, radius, limit).await {
                Ok(hits) => return hits,
                Err(e) => {
                    tracing::warn!(x, y, error = %e, "Store nearest-crop query failed; using memory");
                }
            }
        }
        self.memory_nearest(x, y, radius, limit)
    }

    fn memory_nearest(&self, x: f64, y: f64, radius: f64, limit: usize) -> Vec<CropHit> {
        let map = self.garden.read().unwrap_or_else(|e| e.into_inner());
        let origin = Coord::new(x, y);

        let mut hits: Vec<CropHit> = map
            .crops()
            .iter()
            .filter(|c| (c.position.x - x).abs() <= radius && (c.position.y - y).abs() <= radius)
            .map(|c| CropHit {
                distance: distance(c.position, origin),
                crop: CropRecord {
                    id: c.id.clone(),
                    vegetable_type_id: c.vegetable_type_id,
                    type_name: map
                        .vegetable_type(c.vegetable_type_id)
                        .map(|v| v.name.clone())
                        .unwrap_or_default(),
                    position: c.position,
                    sown_on: c.sown_on,
                    status: c.status,
                },
            })
            .collect();

        rank_hits(&mut hits, limit);
        hits
    }

    /// Every structure whose polygon contains the point; a point may
    /// lie in several overlapping structures.
    pub async fn structures_intersecting(&self, x: f64, y: f64) -> Vec<Structure> {
        let point = Coord::new(x, y);
        let structures = self.all_structures().await;
        structures
            .into_iter()
            .filter(|s| point_in_polygon(point, &s.polygon))
            .collect()
    }

    /// Whether the point is plantable — no structure blocks it.
    pub async fn is_usable(&self, x: f64, y: f64) -> bool {
        self.structures_intersecting(x, y).await.is_empty()
    }

    /// All crops of one vegetable type, newest sowing first.
    pub async fn crops_of_type(&self, type_id: u32) -> Vec<CropRecord> {
        if let Some(conn) = self.store.open().await {
            match store_crops_of_type(&conn, type_id).await {
                Ok(records) => return records,
                Err(e) => {
                    tracing::warn!(type_id, error = %e, "Store crops-of-type query failed; using memory");
                }
            }
        }

        let map = self.garden.read().unwrap_or_else(|e| e.into_inner());
        let type_name = map
            .vegetable_type(type_id)
            .map(|v| v.name.clone())
            .unwrap_or_default();
        let mut records: Vec<CropRecord> = map
            .crops()
            .iter()
            .filter(|c| c.vegetable_type_id == type_id)
            .map(|c| CropRecord {
                id: c.id.clone(),
                vegetable_type_id: c.vegetable_type_id,
                type_name: type_name.clone(),
                position: c.position,
                sown_on: c.sown_on,
                status: c.status,
            })
            .collect();
        records.sort_by(|a, b| b.sown_on.cmp(&a.sown_on));
        records
    }

    async fn all_structures(&self) -> Vec<Structure> {
        if let Some(conn) = self.store.open().await {
            match store_structures(&conn).await {
                Ok(structures) if !structures.is_empty() => return structures,
                Ok(_) => {
                    // An empty store answer usually means seeding never
                    // ran; the config-loaded set is more trustworthy.
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Store structure query failed; using memory");
                }
            }
        }
        let map = self.garden.read().unwrap_or_else(|e| e.into_inner());
        map.structures().to_vec()
    }
}

fn rank_hits(hits: &mut Vec<CropHit>, limit: usize) {
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits.truncate(limit);
}

// ── Store queries ────────────────────────────────────────────────

/// Bounding-box candidate fetch; distance ranking happens client-side.
pub(crate) async fn store_nearest(
    conn: &StoreConnection,
    x: f64,
    y: f64,
    radius: f64,
    limit: usize,
) -> Result<Vec<CropHit>, GraphError> {
    let rows = conn
        .query_rows(
            query(
                "MATCH (c:Crop)-[:OF_TYPE]->(v:VegetableType)
                 WHERE abs(c.x - $x) <= $radius AND abs(c.y - $y) <= $radius
                 RETURN c.id AS id, c.x AS x, c.y AS y, c.sown_on AS sown_on,
                        c.status AS status, v.id AS type_id, v.name AS type_name",
            )
            .param("x", x)
            .param("y", y)
            .param("radius", radius),
        )
        .await?;

    let origin = Coord::new(x, y);
    let mut hits: Vec<CropHit> = rows
        .iter()
        .filter_map(crop_record_from_row)
        .map(|crop| CropHit {
            distance: distance(crop.position, origin),
            crop,
        })
        .collect();

    rank_hits(&mut hits, limit);
    Ok(hits)
}

async fn store_crops_of_type(
    conn: &StoreConnection,
    type_id: u32,
) -> Result<Vec<CropRecord>, GraphError> {
    let rows = conn
        .query_rows(
            query(
                "MATCH (c:Crop)-[:OF_TYPE]->(v:VegetableType {id: $type_id})
                 RETURN c.id AS id, c.x AS x, c.y AS y, c.sown_on AS sown_on,
                        c.status AS status, v.id AS type_id, v.name AS type_name
                 ORDER BY c.sown_on DESC",
            )
            .param("type_id", type_id as i64),
        )
        .await?;

    Ok(rows.iter().filter_map(crop_record_from_row).collect())
}

async fn store_structures(conn: &StoreConnection) -> Result<Vec<Structure>, GraphError> {
    let rows = conn
        .query_rows(query(
            "MATCH (s:Structure)
             RETURN s.id AS id, s.name AS name, s.category AS category,
                    s.description AS description, s.polygon_json AS polygon_json,
                    s.created_at AS created_at",
        ))
        .await?;

    let mut structures = Vec::with_capacity(rows.len());
    for row in &rows {
        match structure_from_row(row) {
            Some(s) => structures.push(s),
            None => tracing::warn!("Skipping malformed structure row"),
        }
    }
    Ok(structures)
}

fn crop_record_from_row(row: &Row) -> Option<CropRecord> {
    let id = row.get::<String>("id").ok()?;
    let x = row.get::<f64>("x").ok()?;
    let y = row.get::<f64>("y").ok()?;
    let type_id = row.get::<i64>("type_id").ok()?;
    let type_name = row.get::<String>("type_name").unwrap_or_default();
    let sown_raw = row.get::<String>("sown_on").ok()?;
    let sown_on = NaiveDate::parse_from_str(&sown_raw, "%Y-%m-%d").ok()?;
    let status = CropStatus::parse(&row.get::<String>("status").unwrap_or_default());

    Some(CropRecord {
        id,
        vegetable_type_id: type_id as u32,
        type_name,
        position: Coord::new(x, y),
        sown_on,
        status,
    })
}

fn structure_from_row(row: &Row) -> Option<Structure> {
    let id = row.get::<String>("id").ok()?;
    let name = row.get::<String>("name").unwrap_or_default();
    let category = row.get::<String>("category").unwrap_or_default();
    let description = row.get::<String>("description").unwrap_or_default();

    let polygon_json = row.get::<String>("polygon_json").ok()?;
    let vertices: Vec<[f64; 2]> = serde_json::from_str(&polygon_json).ok()?;
    let polygon = vertices.into_iter().map(Coord::from).collect();

    let created_at = row
        .get::<String>("created_at")
        .ok()
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Some(Structure {
        id,
        name,
        category,
        description,
        polygon,
        created_at,
    })
}
