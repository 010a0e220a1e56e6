//! Runtime configuration for the Verdant service.
//!
//! Loaded from `verdant.toml` (sections `[store]` and `[garden]`) and
//! `VERDANT_`-prefixed environment variables, with defaults suitable
//! for local development. The reference-data catalog is a separate
//! file pointed to by `garden.catalog_path` — it is data, not
//! settings, and is parsed by `verdant_core::Catalog`.

use serde::Deserialize;

use verdant_graph::GraphConfig;

/// Graph store connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    /// Set false to run memory-only without attempting a connection.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_password")]
    pub password: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

impl StoreSettings {
    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            uri: self.uri.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            max_connections: self.max_connections,
            fetch_size: self.fetch_size,
        }
    }
}

/// Garden canvas and query tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct GardenSettings {
    #[serde(default = "default_garden_id")]
    pub id: String,

    #[serde(default = "default_garden_name")]
    pub name: String,

    #[serde(default = "default_width")]
    pub width: f64,

    #[serde(default = "default_height")]
    pub height: f64,

    /// Path to the reference-data catalog file.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Minimum allowed distance between two crops.
    #[serde(default = "default_collision_radius")]
    pub collision_radius: f64,

    /// Pick-up tolerance for coordinate lookups.
    #[serde(default = "default_find_tolerance")]
    pub find_tolerance: f64,

    /// Result cap for nearest-crop queries.
    #[serde(default = "default_nearest_limit")]
    pub nearest_limit: usize,
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub garden: GardenSettings,
}

impl ServiceConfig {
    /// Load from `<file_prefix>.toml` and `VERDANT_` environment
    /// variables; falls back to defaults when neither is present.
    pub fn load(file_prefix: &str) -> Self {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("VERDANT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build();

        match cfg {
            Ok(c) => c.try_deserialize().unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "verdant-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_garden_id() -> String {
    "garden_main".to_string()
}

fn default_garden_name() -> String {
    "Main plot".to_string()
}

fn default_width() -> f64 {
    800.0
}

fn default_height() -> f64 {
    600.0
}

fn default_catalog_path() -> String {
    "config/garden.toml".to_string()
}

fn default_collision_radius() -> f64 {
    25.0
}

fn default_find_tolerance() -> f64 {
    20.0
}

fn default_nearest_limit() -> usize {
    5
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

impl Default for GardenSettings {
    fn default() -> Self {
        Self {
            id: default_garden_id(),
            name: default_garden_name(),
            width: default_width(),
            height: default_height(),
            catalog_path: default_catalog_path(),
            collision_radius: default_collision_radius(),
            find_tolerance: default_find_tolerance(),
            nearest_limit: default_nearest_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServiceConfig::default();
        assert!(config.store.enabled);
        assert_eq!(config.store.uri, "bolt://localhost:7687");
        assert_eq!(config.garden.id, "garden_main");
        assert_eq!(config.garden.collision_radius, 25.0);
        assert_eq!(config.garden.find_tolerance, 20.0);
        assert_eq!(config.garden.nearest_limit, 5);
    }

    #[test]
    fn graph_config_mirrors_store_settings() {
        let mut settings = StoreSettings::default();
        settings.uri = "bolt://db.internal:7687".to_string();
        settings.fetch_size = 64;

        let graph = settings.graph_config();
        assert_eq!(graph.uri, "bolt://db.internal:7687");
        assert_eq!(graph.fetch_size, 64);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let config = ServiceConfig::load("does-not-exist");
        assert_eq!(config.garden.width, 800.0);
    }
}
