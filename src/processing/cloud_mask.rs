// src/processing/cloud_mask.rs
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{FireError, FireResult};
use crate::raster::{Band, Image, PixelType, RasterBand, TypedBuffer, COMPOSITE_BANDS};

/// Digital number to surface reflectance divisor for Level-2A products
pub const REFLECTANCE_SCALE: f64 = 10000.0;

/// SCL classes removed by default: cloud shadow (3), cloud medium/high
/// probability (8, 9), thin cirrus (10) and unclassified (7)
pub const DEFAULT_EXCLUDED_CLASSES: [u8; 5] = [3, 7, 8, 9, 10];

/// Scene-classification cloud mask and reflectance scaling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudMask {
    pub excluded_classes: Vec<u8>,
    pub scale: f64,
}

impl Default for CloudMask {
    fn default() -> Self {
        Self {
            excluded_classes: DEFAULT_EXCLUDED_CLASSES.to_vec(),
            scale: REFLECTANCE_SCALE,
        }
    }
}

impl CloudMask {
    pub fn new(excluded_classes: Vec<u8>) -> Self {
        Self {
            excluded_classes,
            ..Self::default()
        }
    }

    pub fn is_clear(&self, scl: f64) -> bool {
        let class = scl.round();
        !self
            .excluded_classes
            .iter()
            .any(|&excluded| f64::from(excluded) == class)
    }

    /// Select the composite bands, scale to reflectance and mask cloudy pixels.
    ///
    /// A missing SCL band is an error rather than a fully masked image, so a
    /// misconfigured catalog cannot silently produce an empty composite.
    /// Inputs must be UInt16 digital numbers; already scaled bands are rejected.
    pub fn apply(&self, image: &Image) -> FireResult<Image> {
        let scl = raw_band(image, Band::Scl)?;
        let clear: Vec<bool> = (0..scl.len())
            .map(|i| scl.value(i).is_some_and(|class| self.is_clear(class)))
            .collect();

        debug!(
            "Cloud mask on {}: {}/{} pixels clear",
            image.id,
            clear.iter().filter(|&&c| c).count(),
            clear.len()
        );

        let mut masked = image.like();
        for band in COMPOSITE_BANDS {
            let source = raw_band(image, band)?;
            let data: Vec<f64> = source
                .data
                .to_f64()
                .into_iter()
                .map(|dn| dn / self.scale)
                .collect();
            let mask = source
                .mask
                .iter()
                .zip(&clear)
                .map(|(&valid, &clear)| valid && clear)
                .collect();
            masked.push_band(RasterBand::with_mask(band.as_str(), TypedBuffer::F64(data), mask)?)?;
        }
        Ok(masked)
    }
}

fn raw_band(image: &Image, band: Band) -> FireResult<&RasterBand> {
    let raster = image.band(band.as_str())?;
    match raster.data.pixel_type() {
        PixelType::UInt16 => Ok(raster),
        other => Err(FireError::config(format!(
            "band {band} of {} holds {other:?} values, expected UInt16 digital numbers",
            image.id
        ))),
    }
}
