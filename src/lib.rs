// src/lib.rs
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
#[cfg(feature = "geotiff")]
pub mod io;
pub mod pipeline;
pub mod processing;
pub mod raster;
pub mod viz;

pub use error::{FireError, FireResult};

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
