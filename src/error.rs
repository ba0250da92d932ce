// src/error.rs
use thiserror::Error;

/// Error types for fire index processing
#[derive(Debug, Error)]
pub enum FireError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Band {band} not found in image {image}")]
    MissingBand { band: String, image: String },

    #[error("No images left in collection {collection} after filtering by region and date")]
    EmptyCollection { collection: String },

    #[error("Band {band} has no valid pixel; every observation is masked or out of domain")]
    NoValidPixels { band: String },

    #[error("Grid mismatch: {0}")]
    GridMismatch(String),

    #[error(
        "Export of {requested} pixels exceeds the maximum of {max_pixels}; \
         increase max_pixels or the export scale"
    )]
    ExportTooLarge { requested: u64, max_pixels: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "geotiff")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

impl FireError {
    pub fn config(message: impl Into<String>) -> Self {
        FireError::Config(message.into())
    }
}

/// Result type for fire index operations
pub type FireResult<T> = Result<T, FireError>;
