// src/processing/indices/vari.rs
use super::{checked_div, IndexCalculator};
use crate::raster::Band;

/// Offset keeping the denominator away from zero on dark pixels
const VARI_EPSILON: f64 = 0.0001;

/// Visible Atmospherically Resistant Index: (G - R) / (G + R + 0.0001)
pub struct VARI {
    bands: [Band; 2],
    name: String,
}

impl VARI {
    pub fn new(name: Option<String>) -> Self {
        Self {
            bands: [Band::B3, Band::B4],
            name: name.unwrap_or_else(|| "VARI".to_string()),
        }
    }
}

impl IndexCalculator for VARI {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_bands(&self) -> &[Band] {
        &self.bands
    }

    fn formula(&self) -> String {
        "(B3 - B4) / (B3 + B4 + 0.0001)".to_string()
    }

    fn evaluate(&self, values: &[f64]) -> Option<f64> {
        let (green, red) = (values[0], values[1]);
        checked_div(green - red, green + red + VARI_EPSILON)
    }
}
