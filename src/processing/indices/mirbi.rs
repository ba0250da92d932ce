// src/processing/indices/mirbi.rs
use super::IndexCalculator;
use crate::raster::Band;

/// Mid-Infrared Burn Index: 10 + B12 + 9.8 * B11
pub struct MIRBI {
    bands: [Band; 2],
    name: String,
}

impl MIRBI {
    pub fn new(name: Option<String>) -> Self {
        Self {
            bands: [Band::B11, Band::B12],
            name: name.unwrap_or_else(|| "MIRBI".to_string()),
        }
    }
}

impl IndexCalculator for MIRBI {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_bands(&self) -> &[Band] {
        &self.bands
    }

    fn formula(&self) -> String {
        "10 + B12 + 9.8 * B11".to_string()
    }

    fn evaluate(&self, values: &[f64]) -> Option<f64> {
        let (swir1, swir2) = (values[0], values[1]);
        Some(10.0 + swir2 + 9.8 * swir1)
    }
}
