// src/raster/image.rs
use chrono::NaiveDate;

use crate::error::{FireError, FireResult};
use crate::raster::{BoundingBox, GeoTransform, TypedBuffer};

/// One named band with its per-pixel validity mask
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBand {
    pub name: String,
    pub data: TypedBuffer,
    /// `true` where the pixel holds a value
    pub mask: Vec<bool>,
}

impl RasterBand {
    /// Band with every pixel valid
    pub fn new(name: impl Into<String>, data: TypedBuffer) -> Self {
        let mask = vec![true; data.len()];
        Self {
            name: name.into(),
            data,
            mask,
        }
    }

    pub fn with_mask(name: impl Into<String>, data: TypedBuffer, mask: Vec<bool>) -> FireResult<Self> {
        let name = name.into();
        if mask.len() != data.len() {
            return Err(FireError::GridMismatch(format!(
                "band {name}: mask has {} pixels, data has {}",
                mask.len(),
                data.len()
            )));
        }
        Ok(Self { name, data, mask })
    }

    /// Masked values become `None`; stored value is kept as 0.0 underneath
    pub fn from_values(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        let mask = values.iter().map(Option::is_some).collect();
        let data = values.into_iter().map(|v| v.unwrap_or(0.0)).collect();
        Self {
            name: name.into(),
            data: TypedBuffer::F64(data),
            mask,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.mask[index].then(|| self.data.get(index))
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        (0..self.len()).map(|i| self.value(i)).collect()
    }

    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Multi-band raster on a regular north-up grid
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub id: String,
    pub date: Option<NaiveDate>,
    /// (width, height) in pixels
    pub shape: (usize, usize),
    pub geo_transform: GeoTransform,
    pub crs: String,
    bands: Vec<RasterBand>,
}

impl Image {
    pub fn new(
        id: impl Into<String>,
        shape: (usize, usize),
        geo_transform: GeoTransform,
        crs: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            date: None,
            shape,
            geo_transform,
            crs: crs.into(),
            bands: Vec::new(),
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_band(mut self, band: RasterBand) -> FireResult<Self> {
        self.push_band(band)?;
        Ok(self)
    }

    /// Empty copy carrying the same grid, id and date
    pub fn like(&self) -> Self {
        Self {
            id: self.id.clone(),
            date: self.date,
            shape: self.shape,
            geo_transform: self.geo_transform,
            crs: self.crs.clone(),
            bands: Vec::new(),
        }
    }

    pub fn push_band(&mut self, band: RasterBand) -> FireResult<()> {
        if band.len() != self.pixel_count() {
            return Err(FireError::GridMismatch(format!(
                "band {} has {} pixels, image {} expects {}",
                band.name,
                band.len(),
                self.id,
                self.pixel_count()
            )));
        }
        if self.bands.iter().any(|b| b.name == band.name) {
            return Err(FireError::config(format!(
                "duplicate band {} in image {}",
                band.name, self.id
            )));
        }
        self.bands.push(band);
        Ok(())
    }

    pub fn band(&self, name: &str) -> FireResult<&RasterBand> {
        self.bands
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| FireError::MissingBand {
                band: name.to_string(),
                image: self.id.clone(),
            })
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.bands.iter().any(|b| b.name == name)
    }

    pub fn bands(&self) -> &[RasterBand] {
        &self.bands
    }

    pub fn into_bands(self) -> Vec<RasterBand> {
        self.bands
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn pixel_count(&self) -> usize {
        self.shape.0 * self.shape.1
    }

    pub fn bounds(&self) -> BoundingBox {
        self.geo_transform.bounds(self.shape)
    }

    pub fn same_grid(&self, other: &Image) -> bool {
        self.shape == other.shape && self.geo_transform == other.geo_transform && self.crs == other.crs
    }
}
