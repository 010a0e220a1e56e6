//! The garden service: collaborator-facing facade over the domain
//! model, the store, and the spatial engine.
//!
//! Writes land in the in-memory map first (the authority), then sync
//! to the store best-effort — a store failure is visible in logs and
//! health output, never to the immediate caller. Reads go store-first
//! and silently degrade to possibly-incomplete in-memory answers, so
//! callers never need to know whether the store is reachable.

use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use serde::Serialize;

use verdant_core::garden::GardenCounts;
use verdant_core::{
    Annotation, AnnotationTarget, Catalog, Coord, CropStatus, Garden, GardenError, GardenMap,
    PlacedCrop, Structure,
};
use verdant_graph::{CropHit, CropRecord, GraphSync, SpatialEngine, StoreConnection, StoreManager};

use crate::config::{GardenSettings, ServiceConfig};

/// Availability signal for collaborators deciding how much to trust
/// store-backed answers.
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub store_available: bool,
    pub schema_ready: bool,
    pub counts: GardenCounts,
}

/// Per-kind entity counts, from the store when reachable.
#[derive(Debug, Clone, Serialize)]
pub struct GardenStats {
    pub gardens: i64,
    pub crops: i64,
    pub vegetable_types: i64,
    pub structures: i64,
    pub annotations: i64,
    pub from_store: bool,
}

pub struct GardenService {
    garden: Arc<RwLock<GardenMap>>,
    store: Arc<StoreManager>,
    sync: GraphSync,
    spatial: SpatialEngine,
    catalog: Arc<Catalog>,
    settings: GardenSettings,
}

impl GardenService {
    /// Build the full service from configuration: catalog, domain
    /// model, store handshake, and the startup reference migration.
    pub async fn start(config: ServiceConfig) -> Result<Self, GardenError> {
        let catalog = Catalog::load(&config.garden.catalog_path)?;

        let store = if config.store.enabled {
            Arc::new(StoreManager::connect(config.store.graph_config()).await)
        } else {
            tracing::info!("Store disabled by configuration; running memory-only");
            Arc::new(StoreManager::offline())
        };

        let service = Self::with_store(config.garden, catalog, store).await;

        // One-time reference migration; a cold store just means the
        // catalog stays memory-only until `init` is run.
        if service.store.is_available() {
            service
                .sync
                .migrate_reference_data(&service.catalog.vegetables)
                .await;
            service
                .sync
                .migrate_structures(&service.catalog.structures())
                .await;
        }

        Ok(service)
    }

    /// Assemble from parts. Used by `start` and by tests that inject
    /// an offline store.
    pub async fn with_store(
        settings: GardenSettings,
        catalog: Catalog,
        store: Arc<StoreManager>,
    ) -> Self {
        let garden = Garden {
            id: settings.id.clone(),
            name: settings.name.clone(),
            width: settings.width,
            height: settings.height,
        };
        let map = GardenMap::new(garden, &catalog, settings.collision_radius);
        let garden = Arc::new(RwLock::new(map));

        let sync = GraphSync::new(store.clone(), settings.id.clone());
        let spatial = SpatialEngine::new(store.clone(), garden.clone());

        Self {
            garden,
            store,
            sync,
            spatial,
            catalog: Arc::new(catalog),
            settings,
        }
    }

    pub fn settings(&self) -> &GardenSettings {
        &self.settings
    }

    // ── Writes ────────────────────────────────────────────────────

    /// Place a crop. The memory write is authoritative; persistence is
    /// a best-effort side effect observable via logs and health.
    pub async fn plant(
        &self,
        vegetable_type_id: u32,
        x: f64,
        y: f64,
        sown_on: NaiveDate,
    ) -> Result<String, GardenError> {
        let id = {
            let mut map = self.garden.write().unwrap_or_else(|e| e.into_inner());
            map.place_crop(vegetable_type_id, Coord::new(x, y), sown_on)?
        };

        let crop = PlacedCrop {
            id: id.clone(),
            vegetable_type_id,
            position: Coord::new(x, y),
            sown_on,
            status: CropStatus::Active,
        };
        self.sync.create_crop(&crop).await;
        Ok(id)
    }

    /// Remove a crop from the garden and, best-effort, from the store.
    pub async fn uproot(&self, crop_id: &str) -> Result<PlacedCrop, GardenError> {
        let removed = {
            let mut map = self.garden.write().unwrap_or_else(|e| e.into_inner());
            map.remove_crop(crop_id)
        };
        let crop = removed.ok_or_else(|| GardenError::CropNotFound(crop_id.to_string()))?;
        self.sync.remove_crop(crop_id).await;
        Ok(crop)
    }

    /// Transition a crop's lifecycle state.
    pub async fn set_status(&self, crop_id: &str, status: CropStatus) -> Result<(), GardenError> {
        {
            let mut map = self.garden.write().unwrap_or_else(|e| e.into_inner());
            map.set_crop_status(crop_id, status)?;
        }
        self.sync.update_crop_status(crop_id, status).await;
        Ok(())
    }

    /// Record an annotation against its single target.
    pub async fn annotate(&self, annotation: Annotation) -> String {
        let id = {
            let mut map = self.garden.write().unwrap_or_else(|e| e.into_inner());
            map.add_annotation(annotation.clone())
        };
        self.sync.create_annotation(&annotation).await;
        id
    }

    // ── Reads — never fail on store unavailability ────────────────

    /// What is planted at (x, y)? Store-backed when possible, with the
    /// in-memory scan as the fallback of record.
    pub async fn find_crop_at(&self, x: f64, y: f64) -> Option<PlacedCrop> {
        if let Some(hit) = self
            .sync
            .query_by_coordinate(x, y, self.settings.find_tolerance)
            .await
        {
            if hit.distance < self.settings.find_tolerance {
                return Some(PlacedCrop {
                    id: hit.crop.id,
                    vegetable_type_id: hit.crop.vegetable_type_id,
                    position: hit.crop.position,
                    sown_on: hit.crop.sown_on,
                    status: hit.crop.status,
                });
            }
        }

        let map = self.garden.read().unwrap_or_else(|e| e.into_inner());
        map.find_crop_at(Coord::new(x, y), self.settings.find_tolerance)
            .cloned()
    }

    pub async fn nearest_crops(&self, x: f64, y: f64, radius: f64, limit: usize) -> Vec<CropHit> {
        self.spatial.nearest_crops(x, y, radius, limit).await
    }

    pub async fn structures_intersecting(&self, x: f64, y: f64) -> Vec<Structure> {
        self.spatial.structures_intersecting(x, y).await
    }

    pub async fn is_usable(&self, x: f64, y: f64) -> bool {
        self.spatial.is_usable(x, y).await
    }

    pub async fn crops_of_type(&self, vegetable_type_id: u32) -> Vec<CropRecord> {
        self.spatial.crops_of_type(vegetable_type_id).await
    }

    pub fn annotations_for(&self, target: &AnnotationTarget) -> Vec<Annotation> {
        let map = self.garden.read().unwrap_or_else(|e| e.into_inner());
        map.annotations_for(target).into_iter().cloned().collect()
    }

    // ── Administration ────────────────────────────────────────────

    /// Schema init plus idempotent seeding. False when the store is
    /// unreachable or validation found missing kinds — the caller
    /// decides whether to retry or run memory-only.
    pub async fn bootstrap_store(&self) -> bool {
        let Some(conn) = self.store.open().await else {
            tracing::warn!("Store unavailable; bootstrap skipped");
            return false;
        };

        let schema_ok = self.store.initialize_schema(&conn).await;
        let data_ok = self
            .store
            .load_initial_data(&conn, &self.catalog, &self.settings.id)
            .await;
        self.store.close(Some(conn));

        schema_ok && data_ok
    }

    pub fn health(&self) -> Health {
        let counts = {
            let map = self.garden.read().unwrap_or_else(|e| e.into_inner());
            map.counts()
        };
        Health {
            store_available: self.store.is_available(),
            schema_ready: self.store.schema_ready(),
            counts,
        }
    }

    /// Per-kind entity counts from the store, falling back to the
    /// in-memory mirror when the store can't answer.
    pub async fn stats(&self) -> GardenStats {
        if let Some(stats) = self.try_store_stats().await {
            return stats;
        }

        let map = self.garden.read().unwrap_or_else(|e| e.into_inner());
        let counts = map.counts();
        GardenStats {
            gardens: 1,
            crops: counts.crops as i64,
            vegetable_types: counts.vegetable_types as i64,
            structures: counts.structures as i64,
            annotations: counts.annotations as i64,
            from_store: false,
        }
    }

    async fn try_store_stats(&self) -> Option<GardenStats> {
        let conn = self.store.open().await?;
        let stats = GardenStats {
            gardens: store_count(&self.store, &conn, "Garden").await?,
            crops: store_count(&self.store, &conn, "Crop").await?,
            vegetable_types: store_count(&self.store, &conn, "VegetableType").await?,
            structures: store_count(&self.store, &conn, "Structure").await?,
            annotations: store_count(&self.store, &conn, "Annotation").await?,
            from_store: true,
        };
        Some(stats)
    }
}

async fn store_count(store: &StoreManager, conn: &StoreConnection, label: &str) -> Option<i64> {
    let cypher = format!("MATCH (n:{label}) RETURN count(n) AS cnt");
    let mut cursor = store.execute_query(&cypher, &[], Some(conn)).await.ok()??;
    cursor.next_row()?.get::<i64>("cnt").ok()
}
