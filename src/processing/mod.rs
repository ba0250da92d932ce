// src/processing/mod.rs
pub mod cloud_mask;
pub mod composite;
pub mod indices;
pub mod parallel;
pub mod stack;

// Re-export main components
pub use cloud_mask::CloudMask;
pub use composite::{median_composite, MaskedCollection};
pub use parallel::{RasterEngine, TileGrid, TiledEngine};
pub use stack::{StackedImage, NODATA_VALUE_FLOAT};
