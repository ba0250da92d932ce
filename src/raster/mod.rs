// src/raster/mod.rs
pub mod band;
pub mod buffer;
pub mod geometry;
pub mod image;

pub use band::{Band, COMPOSITE_BANDS};
pub use buffer::{PixelType, TypedBuffer};
pub use geometry::{BoundingBox, GeoTransform, Region, REGION_CRS};
pub use image::{Image, RasterBand};
