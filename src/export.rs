// src/export.rs
use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{FireError, FireResult};
use crate::processing::parallel::{map_tiles, TileGrid};
use crate::processing::stack::{StackedBand, StackedImage, NODATA_VALUE_FLOAT};
use crate::raster::{GeoTransform, Region, REGION_CRS};

/// Metres per degree of longitude at the equator
pub const METERS_PER_DEGREE: f64 = 111_319.490_793_273_57;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    #[default]
    GeoTIFF,
}

impl FileFormat {
    /// GDAL driver short name
    pub fn driver_name(&self) -> &'static str {
        match self {
            FileFormat::GeoTIFF => "GTiff",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::GeoTIFF => "tif",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::GeoTIFF => f.write_str("GeoTIFF"),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    pub description: String,
    pub folder: String,
    /// Ground sample distance in metres
    pub scale: f64,
    pub crs: String,
    pub file_format: FileFormat,
    pub max_pixels: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            description: "Fire_Indices_Composite".to_string(),
            folder: "Fire_Export".to_string(),
            scale: 10.0,
            crs: "EPSG:4326".to_string(),
            file_format: FileFormat::GeoTIFF,
            max_pixels: 1e13,
        }
    }
}

/// Export parameters bound to the clip region
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub config: ExportConfig,
    pub region: Region,
}

/// Output grid of an export
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportGrid {
    pub shape: (usize, usize),
    pub geo_transform: GeoTransform,
}

impl ExportGrid {
    /// `None` when the count does not fit in a u64
    pub fn pixel_count(&self) -> Option<u64> {
        (self.shape.0 as u64).checked_mul(self.shape.1 as u64)
    }
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ',' | ':' | ';' | '_' | '-'))
}

impl ExportRequest {
    pub fn new(config: ExportConfig, region: Region) -> Self {
        Self { config, region }
    }

    pub fn validate(&self) -> FireResult<()> {
        let config = &self.config;
        if !is_safe_name(&config.description) {
            return Err(FireError::config(format!(
                "export description '{}' must be non-empty and use only letters, digits and .,:;_-",
                config.description
            )));
        }
        if !is_safe_name(&config.folder) {
            return Err(FireError::config(format!(
                "export folder '{}' must be non-empty and use only letters, digits and .,:;_-",
                config.folder
            )));
        }
        if !(config.scale.is_finite() && config.scale > 0.0) {
            return Err(FireError::config(format!(
                "export scale must be a positive number of metres, got {}",
                config.scale
            )));
        }
        if !(config.max_pixels.is_finite() && config.max_pixels >= 1.0) {
            return Err(FireError::config(format!(
                "max_pixels must be at least 1, got {}",
                config.max_pixels
            )));
        }
        let valid_crs = config
            .crs
            .strip_prefix("EPSG:")
            .is_some_and(|code| !code.is_empty() && code.chars().all(|c| c.is_ascii_digit()));
        if !valid_crs {
            return Err(FireError::config(format!(
                "CRS '{}' is not of the form EPSG:<code>",
                config.crs
            )));
        }
        Ok(())
    }

    /// Grid covering the region bounding box at `scale` metres per pixel
    pub fn grid(&self) -> FireResult<ExportGrid> {
        let step = self.config.scale / METERS_PER_DEGREE;
        let bounds = self.region.bounds();
        let width = (bounds.width() / step).ceil().max(1.0);
        let height = (bounds.height() / step).ceil().max(1.0);
        if width > usize::MAX as f64 || height > usize::MAX as f64 {
            return Err(FireError::ExportTooLarge {
                requested: u64::MAX,
                max_pixels: self.config.max_pixels as u64,
            });
        }
        Ok(ExportGrid {
            shape: (width as usize, height as usize),
            geo_transform: GeoTransform::new(bounds.min_x, step, bounds.max_y, -step),
        })
    }

    /// Fail before any pixel is written when the grid exceeds `max_pixels`
    pub fn check_size(&self, grid: &ExportGrid) -> FireResult<()> {
        match grid.pixel_count() {
            Some(requested) if requested as f64 <= self.config.max_pixels => Ok(()),
            requested => Err(FireError::ExportTooLarge {
                requested: requested.unwrap_or(u64::MAX),
                max_pixels: self.config.max_pixels as u64,
            }),
        }
    }

    /// Every check that needs only the request: parameters, CRS and size.
    /// Returns the output grid.
    pub fn prepare(&self) -> FireResult<ExportGrid> {
        self.validate()?;
        // The grid is laid out in degrees over the lon/lat region
        if self.config.crs != REGION_CRS {
            return Err(FireError::config(format!(
                "export CRS {} is not supported; exports are written in {REGION_CRS}",
                self.config.crs
            )));
        }
        let grid = self.grid()?;
        self.check_size(&grid)?;
        Ok(grid)
    }
}

/// Fail when a band of a clipped export holds no valid pixel
pub fn ensure_valid_pixels(image: &StackedImage) -> FireResult<()> {
    match image.bands().iter().find(|band| band.valid_count() == 0) {
        Some(band) => Err(FireError::NoValidPixels {
            band: band.name.clone(),
        }),
        None => Ok(()),
    }
}

/// Nearest-neighbour sample of `image` onto `grid`, masking pixels whose
/// centre is outside `region` or outside the source image.
pub fn resample_to_grid(
    image: &StackedImage,
    grid: &ExportGrid,
    region: &Region,
    tiles: &TileGrid,
) -> FireResult<StackedImage> {
    if !image.geo_transform.is_north_up() {
        return Err(FireError::config("rotated geo-transforms are not supported"));
    }
    let out_width = grid.shape.0;
    let (src_width, src_height) = image.shape;

    let sources = map_tiles(tiles, None, |i| {
        let (x, y) = grid.geo_transform.pixel_center(i % out_width, i / out_width);
        if !region.contains(x, y) {
            return None;
        }
        let (col, row) = image.geo_transform.to_pixel(x, y);
        if col < 0.0 || row < 0.0 || col >= src_width as f64 || row >= src_height as f64 {
            return None;
        }
        Some(row as usize * src_width + col as usize)
    });

    let mut clipped = StackedImage::new(grid.shape, grid.geo_transform, image.crs.clone());
    for band in image.bands() {
        let (data, mask) = sources
            .iter()
            .map(|source| match source.and_then(|s| band.value(s)) {
                Some(v) => (v, true),
                None => (NODATA_VALUE_FLOAT, false),
            })
            .unzip();
        clipped.push_band(StackedBand {
            name: band.name.clone(),
            data,
            mask,
        })?;
    }
    Ok(clipped)
}

/// Summary of a finished export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    pub location: String,
    pub shape: (usize, usize),
    pub band_names: Vec<String>,
}

/// Destination for a stacked image
pub trait ExportSink: Send + Sync {
    fn write(&self, image: &StackedImage, request: &ExportRequest) -> FireResult<ExportReport>;
}

/// Sink keeping exports in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    exports: Mutex<Vec<(String, StackedImage)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.exports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.lock().is_empty()
    }

    pub fn get(&self, location: &str) -> Option<StackedImage> {
        self.exports
            .lock()
            .iter()
            .find(|(l, _)| l == location)
            .map(|(_, image)| image.clone())
    }
}

impl ExportSink for MemorySink {
    fn write(&self, image: &StackedImage, request: &ExportRequest) -> FireResult<ExportReport> {
        let location = format!("{}/{}", request.config.folder, request.config.description);
        self.exports.lock().push((location.clone(), image.clone()));
        Ok(ExportReport {
            location,
            shape: image.shape,
            band_names: image.band_names().into_iter().map(String::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::BoundingBox;

    fn square(size: f64) -> Region {
        Region::from_bbox(BoundingBox {
            min_x: 0.0,
            min_y: 0.0,
            max_x: size,
            max_y: size,
        })
        .unwrap()
    }

    #[test]
    fn grid_matches_scale_in_degrees() {
        let request = ExportRequest::new(
            ExportConfig {
                scale: METERS_PER_DEGREE * 0.125,
                ..ExportConfig::default()
            },
            square(1.0),
        );
        let grid = request.grid().unwrap();
        assert_eq!(grid.shape, (8, 8));
        assert_eq!(grid.geo_transform.origin(), (0.0, 1.0));
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let request = ExportRequest::new(
            ExportConfig {
                max_pixels: 63.0,
                scale: METERS_PER_DEGREE * 0.125,
                ..ExportConfig::default()
            },
            square(1.0),
        );
        let grid = request.grid().unwrap();
        let err = request.check_size(&grid).unwrap_err();
        assert!(matches!(err, FireError::ExportTooLarge { requested: 64, max_pixels: 63 }));
    }

    #[test]
    fn overflowing_grid_is_rejected() {
        let request = ExportRequest::new(
            ExportConfig {
                scale: 1e-6,
                ..ExportConfig::default()
            },
            square(1.0),
        );
        assert!(request.validate().is_ok());
        let grid = request.grid().unwrap();
        assert_eq!(grid.pixel_count(), None);
        assert!(matches!(
            request.check_size(&grid),
            Err(FireError::ExportTooLarge { requested: u64::MAX, .. })
        ));

        let unbounded = ExportRequest::new(
            ExportConfig {
                scale: 1e-6,
                max_pixels: f64::MAX,
                ..ExportConfig::default()
            },
            square(1.0),
        );
        assert!(matches!(unbounded.prepare(), Err(FireError::ExportTooLarge { .. })));
    }

    #[test]
    fn prepare_rejects_projected_crs() {
        let request = ExportRequest::new(
            ExportConfig {
                crs: "EPSG:32610".into(),
                ..ExportConfig::default()
            },
            square(1.0),
        );
        assert!(request.validate().is_ok());
        assert!(matches!(request.prepare(), Err(FireError::Config(_))));
    }

    #[test]
    fn all_masked_band_is_reported() {
        let mut image = StackedImage::new((2, 1), GeoTransform::new(0.0, 1.0, 1.0, -1.0), "EPSG:4326");
        for (name, mask) in [("NBR", vec![true, false]), ("CSI", vec![false, false])] {
            image
                .push_band(StackedBand {
                    name: name.into(),
                    data: vec![0.5, NODATA_VALUE_FLOAT],
                    mask,
                })
                .unwrap();
        }
        match ensure_valid_pixels(&image) {
            Err(FireError::NoValidPixels { band }) => assert_eq!(band, "CSI"),
            other => panic!("expected no valid pixels, got {other:?}"),
        }
    }

    #[test]
    fn validates_names_scale_and_crs() {
        let bad = [
            ExportConfig { description: "a b".into(), ..ExportConfig::default() },
            ExportConfig { folder: String::new(), ..ExportConfig::default() },
            ExportConfig { scale: 0.0, ..ExportConfig::default() },
            ExportConfig { crs: "WGS84".into(), ..ExportConfig::default() },
            ExportConfig { max_pixels: f64::NAN, ..ExportConfig::default() },
        ];
        for config in bad {
            let request = ExportRequest::new(config.clone(), square(1.0));
            assert!(matches!(request.validate(), Err(FireError::Config(_))), "{config:?}");
        }
        assert!(ExportRequest::new(ExportConfig::default(), square(1.0)).validate().is_ok());
    }

    #[test]
    fn resample_clips_to_region() {
        let mut image = StackedImage::new((2, 2), GeoTransform::new(0.0, 0.5, 1.0, -0.5), "EPSG:4326");
        image
            .push_band(StackedBand {
                name: "NBR".into(),
                data: vec![1.0, 2.0, 3.0, 4.0],
                mask: vec![true; 4],
            })
            .unwrap();
        // Leaves out the upper-right pixel centre only
        let region = Region::new(vec![(0.0, 0.0), (1.2, 0.0), (0.0, 1.2)]).unwrap();
        let grid = ExportGrid {
            shape: (2, 2),
            geo_transform: GeoTransform::new(0.0, 0.5, 1.0, -0.5),
        };
        let clipped = resample_to_grid(&image, &grid, &region, &TileGrid::new((2, 2), 1)).unwrap();
        assert_eq!(
            clipped.band("NBR").unwrap().values(),
            vec![Some(1.0), None, Some(3.0), Some(4.0)]
        );
    }

    #[test]
    fn memory_sink_records_exports() {
        let sink = MemorySink::new();
        let image = StackedImage::new((1, 1), GeoTransform::new(0.0, 1.0, 1.0, -1.0), "EPSG:4326");
        let report = sink
            .write(&image, &ExportRequest::new(ExportConfig::default(), square(1.0)))
            .unwrap();
        assert_eq!(report.location, "Fire_Export/Fire_Indices_Composite");
        assert!(sink.get(&report.location).is_some());
        assert_eq!(sink.len(), 1);
    }
}
