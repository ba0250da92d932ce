// src/processing/indices/msavi.rs
use super::{checked_sqrt, IndexCalculator};
use crate::raster::Band;

/// Modified Soil Adjusted Vegetation Index (MSAVI) calculator
/// MSAVI = (2 * NIR + 1 - sqrt((2 * NIR + 1)^2 - 8 * (NIR - RED))) / 2
pub struct MSAVI {
    bands: [Band; 2],
    name: String,
}

impl MSAVI {
    pub fn new(name: Option<String>) -> Self {
        Self {
            bands: [Band::B8, Band::B4],
            name: name.unwrap_or_else(|| "MSAVI".to_string()),
        }
    }
}

impl IndexCalculator for MSAVI {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_bands(&self) -> &[Band] {
        &self.bands
    }

    fn formula(&self) -> String {
        "((2 * B8 + 1) - sqrt((2 * B8 + 1)^2 - 8 * (B8 - B4))) / 2".to_string()
    }

    fn evaluate(&self, values: &[f64]) -> Option<f64> {
        let (nir, red) = (values[0], values[1]);
        let two_nir_plus_one = 2.0 * nir + 1.0;
        let discriminant = two_nir_plus_one * two_nir_plus_one - 8.0 * (nir - red);
        Some((two_nir_plus_one - checked_sqrt(discriminant)?) / 2.0)
    }
}
