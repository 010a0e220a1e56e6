//! End-to-end exercise of the service facade with the store offline.
//!
//! Everything here must behave identically whether or not a store is
//! reachable — reads degrade to the in-memory mirror, writes succeed
//! with persistence skipped.

use std::sync::Arc;

use chrono::NaiveDate;

use verdant_core::{
    Annotation, AnnotationKind, AnnotationTarget, Catalog, CropStatus, GardenError, Specificity,
};
use verdant_graph::StoreManager;
use verdant_service::{GardenService, GardenSettings, ServiceConfig, StoreSettings};

fn catalog() -> Catalog {
    Catalog::parse(
        r#"
        [[vegetables]]
        id = 1
        name = "Tomato"
        description = "Indeterminate vine tomato"
        cycle_days = 120
        sowing_start_month = 3
        sowing_end_month = 6

        [[vegetables]]
        id = 2
        name = "Carrot"
        description = "Root vegetable"
        cycle_days = 70
        sowing_start_month = 2
        sowing_end_month = 7

        [[structures]]
        id = "shed"
        name = "Tool shed"
        category = "building"
        polygon = [[700.0, 20.0], [780.0, 20.0], [780.0, 100.0], [700.0, 100.0]]
    "#,
    )
    .unwrap()
}

async fn offline_service() -> GardenService {
    GardenService::with_store(
        GardenSettings::default(),
        catalog(),
        Arc::new(StoreManager::offline()),
    )
    .await
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn plant_find_and_collide() {
    let service = offline_service().await;

    let id = service.plant(1, 100.0, 100.0, date(2024, 1, 15)).await.unwrap();

    let found = service.find_crop_at(100.0, 100.0).await.unwrap();
    assert_eq!(found.id, id);
    assert_eq!(found.vegetable_type_id, 1);
    assert_eq!(found.sown_on, date(2024, 1, 15));

    assert!(service.find_crop_at(500.0, 500.0).await.is_none());

    let err = service
        .plant(1, 105.0, 105.0, date(2024, 1, 16))
        .await
        .unwrap_err();
    assert!(matches!(err, GardenError::Collision { .. }));
}

#[tokio::test]
async fn uproot_removes_from_reads() {
    let service = offline_service().await;
    let id = service.plant(1, 100.0, 100.0, date(2024, 1, 15)).await.unwrap();

    let removed = service.uproot(&id).await.unwrap();
    assert_eq!(removed.id, id);
    assert!(service.find_crop_at(100.0, 100.0).await.is_none());

    let err = service.uproot(&id).await.unwrap_err();
    assert!(matches!(err, GardenError::CropNotFound(_)));
}

#[tokio::test]
async fn status_transition_is_visible_and_frees_space() {
    let service = offline_service().await;
    let id = service.plant(1, 100.0, 100.0, date(2024, 1, 15)).await.unwrap();

    service.set_status(&id, CropStatus::Harvested).await.unwrap();
    let crop = service.find_crop_at(100.0, 100.0).await.unwrap();
    assert_eq!(crop.status, CropStatus::Harvested);

    // Harvested crops no longer collide.
    service.plant(2, 105.0, 105.0, date(2024, 6, 1)).await.unwrap();

    let err = service
        .set_status("crop_404", CropStatus::Removed)
        .await
        .unwrap_err();
    assert!(matches!(err, GardenError::CropNotFound(_)));
}

#[tokio::test]
async fn garden_annotation_only_visible_via_garden_target() {
    let service = offline_service().await;

    let note = Annotation::new(
        AnnotationKind::Task,
        Specificity::Season,
        AnnotationTarget::Garden,
        "mulch all beds before frost",
    );
    let note_id = service.annotate(note).await;

    let garden_notes = service.annotations_for(&AnnotationTarget::Garden);
    assert_eq!(garden_notes.len(), 1);
    assert_eq!(garden_notes[0].id, note_id);

    assert!(service
        .annotations_for(&AnnotationTarget::Crop("crop_1".to_string()))
        .is_empty());
    assert!(service
        .annotations_for(&AnnotationTarget::VegetableType(1))
        .is_empty());
}

#[tokio::test]
async fn spatial_reads_degrade_to_memory() {
    let service = offline_service().await;
    service.plant(1, 100.0, 100.0, date(2024, 3, 1)).await.unwrap();
    service.plant(1, 160.0, 100.0, date(2024, 4, 1)).await.unwrap();

    let hits = service.nearest_crops(105.0, 100.0, 100.0, 5).await;
    assert_eq!(hits.len(), 2);
    assert!(hits[0].distance < hits[1].distance);
    assert_eq!(hits[0].crop.type_name, "Tomato");

    assert!(!service.is_usable(740.0, 60.0).await);
    assert!(service.is_usable(400.0, 400.0).await);

    let blocking = service.structures_intersecting(740.0, 60.0).await;
    assert_eq!(blocking.len(), 1);
    assert_eq!(blocking[0].id, "shed");

    let tomatoes = service.crops_of_type(1).await;
    assert_eq!(tomatoes.len(), 2);
    assert_eq!(tomatoes[0].sown_on, date(2024, 4, 1));
}

#[tokio::test]
async fn start_with_disabled_store_reads_catalog_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("garden.toml");
    std::fs::write(
        &catalog_path,
        r#"
        [[vegetables]]
        id = 1
        name = "Tomato"
        description = "Vine tomato"
        cycle_days = 120
        sowing_start_month = 3
        sowing_end_month = 6
    "#,
    )
    .unwrap();

    let config = ServiceConfig {
        store: StoreSettings {
            enabled: false,
            ..StoreSettings::default()
        },
        garden: GardenSettings {
            catalog_path: catalog_path.to_string_lossy().into_owned(),
            ..GardenSettings::default()
        },
    };

    let service = GardenService::start(config).await.unwrap();
    let id = service.plant(1, 100.0, 100.0, date(2024, 1, 15)).await.unwrap();
    assert_eq!(service.find_crop_at(100.0, 100.0).await.unwrap().id, id);
    assert!(!service.health().store_available);
}

#[tokio::test]
async fn start_with_missing_catalog_is_an_error() {
    let config = ServiceConfig {
        store: StoreSettings {
            enabled: false,
            ..StoreSettings::default()
        },
        garden: GardenSettings {
            catalog_path: "/nonexistent/garden.toml".to_string(),
            ..GardenSettings::default()
        },
    };
    assert!(GardenService::start(config).await.is_err());
}

#[tokio::test]
async fn health_and_stats_reflect_offline_store() {
    let service = offline_service().await;
    service.plant(1, 100.0, 100.0, date(2024, 3, 1)).await.unwrap();

    let health = service.health();
    assert!(!health.store_available);
    assert!(!health.schema_ready);
    assert_eq!(health.counts.crops, 1);
    assert_eq!(health.counts.structures, 1);
    assert_eq!(health.counts.vegetable_types, 2);

    let stats = service.stats().await;
    assert!(!stats.from_store);
    assert_eq!(stats.crops, 1);
    assert_eq!(stats.gardens, 1);

    assert!(!service.bootstrap_store().await);
}
