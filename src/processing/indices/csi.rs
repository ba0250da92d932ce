// src/processing/indices/csi.rs
use super::{checked_div, IndexCalculator};
use crate::raster::Band;

/// Char Soil Index: NIR / SWIR1, masked where SWIR1 is zero
pub struct CSI {
    bands: [Band; 2],
    name: String,
}

impl CSI {
    pub fn new(name: Option<String>) -> Self {
        Self {
            bands: [Band::B8, Band::B11],
            name: name.unwrap_or_else(|| "CSI".to_string()),
        }
    }
}

impl IndexCalculator for CSI {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_bands(&self) -> &[Band] {
        &self.bands
    }

    fn formula(&self) -> String {
        "B8 / B11".to_string()
    }

    fn evaluate(&self, values: &[f64]) -> Option<f64> {
        checked_div(values[0], values[1])
    }
}
