use thiserror::Error;

/// Top-level error type for domain operations.
#[derive(Error, Debug)]
pub enum GardenError {
    #[error("collision at ({x:.1}, {y:.1}): crop {existing} is within {radius:.1} units")]
    Collision {
        x: f64,
        y: f64,
        existing: String,
        radius: f64,
    },

    #[error("unknown vegetable type: {0}")]
    UnknownVegetableType(u32),

    #[error("crop not found: {0}")]
    CropNotFound(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
