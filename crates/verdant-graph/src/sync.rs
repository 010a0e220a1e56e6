//! Best-effort synchronization of domain entities into the store.
//!
//! Every public operation here is write-through with the in-memory
//! garden map as the authority: a store failure is caught, logged at
//! warn, and converted to `false`/`None`. Nothing in this module may
//! propagate an error into the domain write path.

use std::sync::Arc;

use neo4rs::query;

use verdant_core::{Annotation, AnnotationTarget, CropStatus, PlacedCrop, Structure, VegetableType};

use crate::client::{GraphError, StoreConnection, StoreManager};
use crate::spatial::{store_nearest, CropHit};

/// Translates domain entities to store writes and opportunistic reads.
pub struct GraphSync {
    store: Arc<StoreManager>,
    garden_id: String,
}

impl GraphSync {
    pub fn new(store: Arc<StoreManager>, garden_id: impl Into<String>) -> Self {
        Self {
            store,
            garden_id: garden_id.into(),
        }
    }

    /// Persist a crop with its type and location edges. Returns false
    /// when the store is unavailable or the write failed — the memory
    /// copy remains authoritative either way.
    pub async fn create_crop(&self, crop: &PlacedCrop) -> bool {
        let Some(conn) = self.store.open().await else {
            return false;
        };
        match self.try_create_crop(&conn, crop).await {
            Ok(created) => {
                if created {
                    tracing::debug!(crop = %crop.id, "Crop synced to store");
                }
                true
            }
            Err(e) => {
                tracing::warn!(crop = %crop.id, error = %e, "Crop sync failed");
                false
            }
        }
    }

    async fn try_create_crop(
        &self,
        conn: &StoreConnection,
        crop: &PlacedCrop,
    ) -> Result<bool, GraphError> {
        if node_exists(conn, "Crop", &crop.id).await? {
            return Ok(false);
        }

        conn.run(
            query(
                "CREATE (:Crop {id: $id, x: $x, y: $y, sown_on: $sown_on, status: $status})",
            )
            .param("id", crop.id.clone())
            .param("x", crop.position.x)
            .param("y", crop.position.y)
            .param("sown_on", crop.sown_on.to_string())
            .param("status", crop.status.as_str().to_string()),
        )
        .await?;

        conn.run(
            query(
                "MATCH (c:Crop {id: $id}), (v:VegetableType {id: $type_id})
                 CREATE (c)-[:OF_TYPE {linked_at: $sown_on}]->(v)",
            )
            .param("id", crop.id.clone())
            .param("type_id", crop.vegetable_type_id as i64)
            .param("sown_on", crop.sown_on.to_string()),
        )
        .await?;

        // Location edges are bidirectional: crop→garden and garden→crop.
        conn.run(
            query(
                "MATCH (c:Crop {id: $id}), (g:Garden {id: $garden_id})
                 CREATE (c)-[:PLANTED_IN {planted_at: $sown_on}]->(g),
                        (g)-[:CONTAINS]->(c)",
            )
            .param("id", crop.id.clone())
            .param("garden_id", self.garden_id.clone())
            .param("sown_on", crop.sown_on.to_string()),
        )
        .await?;

        Ok(true)
    }

    /// Delete a crop and all its edges.
    pub async fn remove_crop(&self, crop_id: &str) -> bool {
        let Some(conn) = self.store.open().await else {
            return false;
        };
        let result = conn
            .run(
                query("MATCH (c:Crop {id: $id}) DETACH DELETE c")
                    .param("id", crop_id.to_string()),
            )
            .await;
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(crop = crop_id, error = %e, "Crop removal sync failed");
                false
            }
        }
    }

    /// Mirror a lifecycle transition.
    pub async fn update_crop_status(&self, crop_id: &str, status: CropStatus) -> bool {
        let Some(conn) = self.store.open().await else {
            return false;
        };
        let result = conn
            .run(
                query("MATCH (c:Crop {id: $id}) SET c.status = $status")
                    .param("id", crop_id.to_string())
                    .param("status", status.as_str().to_string()),
            )
            .await;
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(crop = crop_id, error = %e, "Crop status sync failed");
                false
            }
        }
    }

    /// Persist an annotation and exactly one target edge, chosen by
    /// the annotation's target kind.
    pub async fn create_annotation(&self, annotation: &Annotation) -> bool {
        let Some(conn) = self.store.open().await else {
            return false;
        };
        match self.try_create_annotation(&conn, annotation).await {
            Ok(created) => {
                if created {
                    tracing::debug!(annotation = %annotation.id, "Annotation synced to store");
                }
                true
            }
            Err(e) => {
                tracing::warn!(annotation = %annotation.id, error = %e, "Annotation sync failed");
                false
            }
        }
    }

    async fn try_create_annotation(
        &self,
        conn: &StoreConnection,
        annotation: &Annotation,
    ) -> Result<bool, GraphError> {
        if node_exists(conn, "Annotation", &annotation.id).await? {
            return Ok(false);
        }

        conn.run(
            query(
                "CREATE (:Annotation {id: $id, kind: $kind, specificity: $specificity,
                         at: $at, note: $note, photos: $photos})",
            )
            .param("id", annotation.id.clone())
            .param("kind", annotation.kind.as_str().to_string())
            .param("specificity", annotation.specificity.as_str().to_string())
            .param("at", annotation.at.to_rfc3339())
            .param("note", annotation.note.clone())
            .param("photos", annotation.photos.clone()),
        )
        .await?;

        let edge = match &annotation.target {
            AnnotationTarget::Crop(crop_id) => query(
                "MATCH (a:Annotation {id: $id}), (c:Crop {id: $target})
                 CREATE (a)-[:NOTES_CROP {noted_at: $at}]->(c)",
            )
            .param("target", crop_id.clone()),
            AnnotationTarget::VegetableType(type_id) => query(
                "MATCH (a:Annotation {id: $id}), (v:VegetableType {id: $target})
                 CREATE (a)-[:NOTES_TYPE {noted_at: $at}]->(v)",
            )
            .param("target", *type_id as i64),
            AnnotationTarget::Garden => query(
                "MATCH (a:Annotation {id: $id}), (g:Garden {id: $target})
                 CREATE (a)-[:NOTES_GARDEN {noted_at: $at}]->(g)",
            )
            .param("target", self.garden_id.clone()),
        };

        conn.run(
            edge.param("id", annotation.id.clone())
                .param("at", annotation.at.to_rfc3339()),
        )
        .await?;

        Ok(true)
    }

    /// Closest crop to a point, straight from the store. Opportunistic:
    /// the in-memory lookup remains the fallback of record.
    pub async fn query_by_coordinate(&self, x: f64, y: f64, radius: f64) -> Option<CropHit> {
        let conn = self.store.open().await?;
        match store_nearest(&conn, x, y, radius, 1).await {
            Ok(hits) => hits.into_iter().next(),
            Err(e) => {
                tracing::warn!(x, y, error = %e, "Coordinate query failed");
                None
            }
        }
    }

    /// One-time bulk load of reference data, guarded per id against
    /// duplicates. Intended to run once at startup.
    pub async fn migrate_reference_data(&self, types: &[VegetableType]) -> bool {
        let Some(conn) = self.store.open().await else {
            return false;
        };

        let mut ok = true;
        let mut created = 0;
        for vegetable in types {
            match ensure_vegetable_type(&conn, vegetable).await {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(type_id = vegetable.id, error = %e, "Reference migration failed");
                    ok = false;
                }
            }
        }
        tracing::info!(created, total = types.len(), "Reference data migrated");
        ok
    }

    /// Same per-id guard for structures, wiring each to the garden.
    pub async fn migrate_structures(&self, structures: &[Structure]) -> bool {
        let Some(conn) = self.store.open().await else {
            return false;
        };

        let mut ok = true;
        let mut created = 0;
        for structure in structures {
            match ensure_structure(&conn, &self.garden_id, structure).await {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(structure = %structure.id, error = %e, "Structure migration failed");
                    ok = false;
                }
            }
        }
        tracing::info!(created, total = structures.len(), "Structures migrated");
        ok
    }
}

// ── Shared write helpers ─────────────────────────────────────────
// Used by both the adapter and the seed loader so the two startup
// paths cannot drift apart.

/// Whether a node with this label and string or numeric id exists.
pub(crate) async fn node_exists(
    conn: &StoreConnection,
    label: &str,
    id: &str,
) -> Result<bool, GraphError> {
    let cypher = format!("MATCH (n:{label} {{id: $id}}) RETURN n.id LIMIT 1");
    conn.exists(query(&cypher).param("id", id.to_string())).await
}

async fn node_exists_numeric(
    conn: &StoreConnection,
    label: &str,
    id: i64,
) -> Result<bool, GraphError> {
    let cypher = format!("MATCH (n:{label} {{id: $id}}) RETURN n.id LIMIT 1");
    conn.exists(query(&cypher).param("id", id)).await
}

/// Create a vegetable type node unless it already exists.
/// Returns whether a node was created.
pub(crate) async fn ensure_vegetable_type(
    conn: &StoreConnection,
    vegetable: &VegetableType,
) -> Result<bool, GraphError> {
    if node_exists_numeric(conn, "VegetableType", vegetable.id as i64).await? {
        return Ok(false);
    }

    conn.run(
        query(
            "CREATE (:VegetableType {id: $id, name: $name, description: $description,
                     cycle_days: $cycle_days, sowing_start_month: $start_month,
                     sowing_end_month: $end_month, footprint: $footprint,
                     min_spacing: $min_spacing, pests: $pests, care_notes: $care_notes})",
        )
        .param("id", vegetable.id as i64)
        .param("name", vegetable.name.clone())
        .param("description", vegetable.description.clone())
        .param("cycle_days", vegetable.cycle_days as i64)
        .param("start_month", vegetable.sowing_start_month as i64)
        .param("end_month", vegetable.sowing_end_month as i64)
        .param("footprint", vegetable.footprint)
        .param("min_spacing", vegetable.min_spacing)
        .param("pests", vegetable.pests.clone())
        .param("care_notes", vegetable.care_notes.clone()),
    )
    .await?;

    Ok(true)
}

/// Create a structure node and its garden edge unless it already
/// exists. The polygon is stored as a JSON-encoded vertex list since
/// the store cannot hold nested lists.
pub(crate) async fn ensure_structure(
    conn: &StoreConnection,
    garden_id: &str,
    structure: &Structure,
) -> Result<bool, GraphError> {
    if node_exists(conn, "Structure", &structure.id).await? {
        return Ok(false);
    }

    let vertices: Vec<[f64; 2]> = structure.polygon.iter().map(|c| [c.x, c.y]).collect();
    let polygon_json =
        serde_json::to_string(&vertices).map_err(|e| GraphError::Serialization(e.to_string()))?;

    conn.run(
        query(
            "CREATE (:Structure {id: $id, name: $name, category: $category,
                     description: $description, polygon_json: $polygon_json,
                     created_at: $created_at})",
        )
        .param("id", structure.id.clone())
        .param("name", structure.name.clone())
        .param("category", structure.category.clone())
        .param("description", structure.description.clone())
        .param("polygon_json", polygon_json)
        .param("created_at", structure.created_at.to_rfc3339()),
    )
    .await?;

    conn.run(
        query(
            "MATCH (s:Structure {id: $id}), (g:Garden {id: $garden_id})
             CREATE (s)-[:PART_OF]->(g)",
        )
        .param("id", structure.id.clone())
        .param("garden_id", garden_id.to_string()),
    )
    .await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use verdant_core::Coord;

    fn sample_crop() -> PlacedCrop {
        PlacedCrop {
            id: "crop_1".to_string(),
            vegetable_type_id: 1,
            position: Coord::new(100.0, 100.0),
            sown_on: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            status: CropStatus::Active,
        }
    }

    #[tokio::test]
    async fn offline_store_makes_writes_best_effort_noops() {
        let sync = GraphSync::new(Arc::new(StoreManager::offline()), "garden_main");

        assert!(!sync.create_crop(&sample_crop()).await);
        assert!(!sync.remove_crop("crop_1").await);
        assert!(!sync.update_crop_status("crop_1", CropStatus::Harvested).await);
        assert!(!sync.migrate_reference_data(&[]).await);
        assert!(!sync.migrate_structures(&[]).await);
    }

    #[tokio::test]
    async fn offline_store_makes_reads_empty() {
        let sync = GraphSync::new(Arc::new(StoreManager::offline()), "garden_main");
        assert!(sync.query_by_coordinate(100.0, 100.0, 20.0).await.is_none());
    }

    #[tokio::test]
    async fn offline_annotation_sync_is_false() {
        let sync = GraphSync::new(Arc::new(StoreManager::offline()), "garden_main");
        let annotation = Annotation::new(
            verdant_core::AnnotationKind::Note,
            verdant_core::Specificity::Season,
            AnnotationTarget::Garden,
            "mulch the beds",
        );
        assert!(!sync.create_annotation(&annotation).await);
    }
}
