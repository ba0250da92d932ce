// src/processing/indices/mod.rs
pub mod bais2;
pub mod csi;
pub mod expression;
pub mod mirbi;
pub mod msavi;
pub mod ndi;
pub mod vari;

// Re-export indices
pub use bais2::BAIS2;
pub use csi::CSI;
pub use expression::ExpressionIndex;
pub use mirbi::MIRBI;
pub use msavi::MSAVI;
pub use ndi::NDI;
pub use vari::VARI;

use crate::error::{FireError, FireResult};
use crate::processing::parallel::{evaluate_index, TileGrid, DEFAULT_TILE_SIZE};
use crate::raster::{Band, Image, RasterBand};

/// Output order of the stacked fire indices
pub const FIRE_INDEX_NAMES: [&str; 9] = [
    "NBR", "NBR2", "NDVI", "NDWI", "VARI", "MSAVI", "BAIS2", "MIRBI", "CSI",
];

/// Trait for spectral index calculators
pub trait IndexCalculator: Send + Sync {
    /// Name of the output band
    fn name(&self) -> &str;

    /// Bands read by `evaluate`, in the order its inputs are passed
    fn required_bands(&self) -> &[Band];

    /// Human readable formula
    fn formula(&self) -> String;

    /// Evaluate one pixel from reflectances ordered as `required_bands`.
    /// `None` marks a pixel outside the formula's numeric domain.
    fn evaluate(&self, values: &[f64]) -> Option<f64>;

    /// Reject formulas reading bands the composite does not carry
    fn validate(&self) -> FireResult<()> {
        match self.required_bands().iter().find(|b| !b.is_composite()) {
            Some(band) => Err(FireError::config(format!(
                "index {} references band {band}, which is not part of the composite",
                self.name()
            ))),
            None => Ok(()),
        }
    }

    /// Evaluate the index over a whole composite
    fn calculate(&self, image: &Image) -> FireResult<RasterBand>
    where
        Self: Sized,
    {
        evaluate_index(self, image, &TileGrid::new(image.shape, DEFAULT_TILE_SIZE))
    }
}

/// The nine fire indices in stacking order
pub fn fire_indices() -> Vec<Box<dyn IndexCalculator>> {
    vec![
        Box::new(NDI::nbr()),
        Box::new(NDI::nbr2()),
        Box::new(NDI::ndvi()),
        Box::new(NDI::ndwi()),
        Box::new(VARI::new(None)),
        Box::new(MSAVI::new(None)),
        Box::new(BAIS2::new(None)),
        Box::new(MIRBI::new(None)),
        Box::new(CSI::new(None)),
    ]
}

/// `numerator / denominator`, or `None` when the denominator is zero
pub(crate) fn checked_div(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator != 0.0).then(|| numerator / denominator)
}

/// Square root restricted to non-negative arguments
pub(crate) fn checked_sqrt(value: f64) -> Option<f64> {
    (value >= 0.0).then(|| value.sqrt())
}
