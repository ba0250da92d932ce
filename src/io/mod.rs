// src/io/mod.rs
pub mod reader;
pub mod writer;

pub use reader::GdalCatalog;
pub use writer::{write_preview_png, GeoTiffSink};
