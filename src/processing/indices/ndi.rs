// src/processing/indices/ndi.rs
use super::{checked_div, IndexCalculator};
use crate::raster::Band;

/// Normalized Difference Index (NDI) calculator: (A - B) / (A + B)
pub struct NDI {
    bands: [Band; 2],
    name: String,
}

impl NDI {
    pub fn new(band_a: Band, band_b: Band, name: Option<String>) -> Self {
        Self {
            bands: [band_a, band_b],
            name: name.unwrap_or_else(|| "NDI".to_string()),
        }
    }

    /// Normalized Burn Ratio
    pub fn nbr() -> Self {
        Self::new(Band::B8, Band::B11, Some("NBR".to_string()))
    }

    /// Normalized Burn Ratio 2
    pub fn nbr2() -> Self {
        Self::new(Band::B8A, Band::B12, Some("NBR2".to_string()))
    }

    pub fn ndvi() -> Self {
        Self::new(Band::B8, Band::B4, Some("NDVI".to_string()))
    }

    /// NIR/SWIR water index. This is the same band pair as NBR, so the two
    /// outputs are always identical; downstream products rely on that.
    pub fn ndwi() -> Self {
        Self::new(Band::B8, Band::B11, Some("NDWI".to_string()))
    }
}

impl IndexCalculator for NDI {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_bands(&self) -> &[Band] {
        &self.bands
    }

    fn formula(&self) -> String {
        let [a, b] = self.bands;
        format!("({a} - {b}) / ({a} + {b})")
    }

    fn evaluate(&self, values: &[f64]) -> Option<f64> {
        let (a, b) = (values[0], values[1]);
        checked_div(a - b, a + b)
    }
}
