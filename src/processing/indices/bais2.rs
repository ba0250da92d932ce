// src/processing/indices/bais2.rs
use super::{checked_div, checked_sqrt, IndexCalculator};
use crate::raster::Band;

/// Burned Area Index for Sentinel-2 (BAIS2) calculator
///
/// BAIS2 = (1 - sqrt((B6 * B7 * B8A) / B4)) * ((B12 - B8A) / sqrt(B12 + B8A) + 1)
///
/// Red-edge products are divided by the red band, so a zero red reflectance
/// or a negative radicand masks the pixel instead of producing NaN.
pub struct BAIS2 {
    bands: [Band; 5],
    name: String,
}

impl BAIS2 {
    pub fn new(name: Option<String>) -> Self {
        Self {
            bands: [Band::B4, Band::B6, Band::B7, Band::B8A, Band::B12],
            name: name.unwrap_or_else(|| "BAIS2".to_string()),
        }
    }
}

impl IndexCalculator for BAIS2 {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_bands(&self) -> &[Band] {
        &self.bands
    }

    fn formula(&self) -> String {
        "(1 - sqrt((B6 * B7 * B8A) / B4)) * ((B12 - B8A) / sqrt(B12 + B8A) + 1)".to_string()
    }

    fn evaluate(&self, values: &[f64]) -> Option<f64> {
        let [b4, b6, b7, b8a, b12] = [values[0], values[1], values[2], values[3], values[4]];
        let red_edge = checked_sqrt(checked_div(b6 * b7 * b8a, b4)?)?;
        let swir = checked_div(b12 - b8a, checked_sqrt(b12 + b8a)?)?;
        Some((1.0 - red_edge) * (swir + 1.0))
    }
}
