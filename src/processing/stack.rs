// src/processing/stack.rs
use crate::error::{FireError, FireResult};
use crate::raster::{GeoTransform, Image, PixelType, RasterBand};

/// Value written for masked pixels in float outputs
pub const NODATA_VALUE_FLOAT: f32 = -999.0;

/// One float32 output band
#[derive(Debug, Clone, PartialEq)]
pub struct StackedBand {
    pub name: String,
    /// Masked pixels hold `NODATA_VALUE_FLOAT`
    pub data: Vec<f32>,
    pub mask: Vec<bool>,
}

impl StackedBand {
    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    pub fn value(&self, index: usize) -> Option<f32> {
        self.mask[index].then(|| self.data[index])
    }

    pub fn values(&self) -> Vec<Option<f32>> {
        (0..self.data.len()).map(|i| self.value(i)).collect()
    }
}

/// Multi-band float32 raster ready for export
#[derive(Debug, Clone, PartialEq)]
pub struct StackedImage {
    pub shape: (usize, usize),
    pub geo_transform: GeoTransform,
    pub crs: String,
    bands: Vec<StackedBand>,
}

impl StackedImage {
    pub fn new(shape: (usize, usize), geo_transform: GeoTransform, crs: impl Into<String>) -> Self {
        Self {
            shape,
            geo_transform,
            crs: crs.into(),
            bands: Vec::new(),
        }
    }

    /// Concatenate `bands` in the given order, cast to float32.
    ///
    /// Values that do not fit a finite f32 are masked.
    pub fn from_bands(template: &Image, bands: Vec<RasterBand>) -> FireResult<Self> {
        let mut stacked = Self::new(template.shape, template.geo_transform, template.crs.clone());
        for band in bands {
            let (data, mask) = (0..band.len())
                .map(|i| match band.value(i).map(|v| v as f32) {
                    Some(v) if v.is_finite() => (v, true),
                    _ => (NODATA_VALUE_FLOAT, false),
                })
                .unzip();
            stacked.push_band(StackedBand {
                name: band.name,
                data,
                mask,
            })?;
        }
        Ok(stacked)
    }

    pub fn push_band(&mut self, band: StackedBand) -> FireResult<()> {
        let expected = self.shape.0 * self.shape.1;
        if band.data.len() != expected || band.mask.len() != expected {
            return Err(FireError::GridMismatch(format!(
                "band {} has {} pixels, stack expects {expected}",
                band.name,
                band.data.len()
            )));
        }
        if self.bands.iter().any(|b| b.name == band.name) {
            return Err(FireError::config(format!("duplicate output band {}", band.name)));
        }
        self.bands.push(band);
        Ok(())
    }

    pub fn pixel_type(&self) -> PixelType {
        PixelType::Float32
    }

    pub fn bands(&self) -> &[StackedBand] {
        &self.bands
    }

    pub fn band(&self, name: &str) -> FireResult<&StackedBand> {
        self.bands
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| FireError::MissingBand {
                band: name.to_string(),
                image: "stacked output".to_string(),
            })
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casts_and_masks_out_of_range_values() {
        let template = Image::new("c", (3, 1), GeoTransform::new(0.0, 1.0, 1.0, -1.0), "EPSG:4326");
        let band = RasterBand::from_values("MIRBI", vec![Some(10.5), None, Some(1e300)]);
        let stacked = StackedImage::from_bands(&template, vec![band]).unwrap();
        let out = stacked.band("MIRBI").unwrap();
        assert_eq!(out.values(), vec![Some(10.5), None, None]);
        assert_eq!(out.data[1], NODATA_VALUE_FLOAT);
        assert_eq!(stacked.pixel_type(), PixelType::Float32);
    }
}
