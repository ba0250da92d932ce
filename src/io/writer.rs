// src/io/writer.rs
use std::fs;
use std::path::{Path, PathBuf};

use gdal::raster::{Buffer, RasterCreationOptions};
use gdal::spatial_ref::SpatialRef;
use gdal::{DriverManager, Metadata};
use log::{info, warn};

use crate::error::FireResult;
use crate::export::{ExportReport, ExportRequest, ExportSink};
use crate::processing::stack::{StackedImage, NODATA_VALUE_FLOAT};
use crate::viz::RgbaImage;

/// Writes exports as `<root>/<folder>/<description>.<ext>`
pub struct GeoTiffSink {
    root: PathBuf,
}

impl GeoTiffSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn output_path(&self, request: &ExportRequest) -> PathBuf {
        let config = &request.config;
        self.root.join(&config.folder).join(format!(
            "{}.{}",
            config.description,
            config.file_format.extension()
        ))
    }
}

fn write_stack(image: &StackedImage, request: &ExportRequest, path: &Path) -> FireResult<()> {
    let driver = DriverManager::get_driver_by_name(request.config.file_format.driver_name())?;
    let creation_options = RasterCreationOptions::from_iter([
        "COMPRESS=DEFLATE",
        "TILED=YES",
        "BIGTIFF=IF_SAFER",
        "NUM_THREADS=ALL_CPUS",
    ]);

    let (width, height) = image.shape;
    let mut output = driver.create_with_band_type_with_options::<f32, _>(
        path,
        width,
        height,
        image.band_count(),
        &creation_options,
    )?;
    output.set_geo_transform(&image.geo_transform.0)?;
    output.set_spatial_ref(&SpatialRef::from_definition(&image.crs)?)?;

    for (i, band) in image.bands().iter().enumerate() {
        let mut output_band = output.rasterband(i + 1)?;
        output_band.set_no_data_value(Some(NODATA_VALUE_FLOAT as f64))?;
        output_band.set_description(&band.name)?;
        let mut buffer = Buffer::new(image.shape, band.data.clone());
        output_band.write((0, 0), image.shape, &mut buffer)?;
    }

    output.flush_cache()?;
    Ok(())
}

impl ExportSink for GeoTiffSink {
    fn write(&self, image: &StackedImage, request: &ExportRequest) -> FireResult<ExportReport> {
        let path = self.output_path(request);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        if let Err(e) = write_stack(image, request, &path) {
            // Never leave a truncated raster behind
            if path.exists() && fs::remove_file(&path).is_err() {
                warn!("Could not remove partial export {}", path.display());
            }
            return Err(e);
        }

        info!("Wrote {}", path.display());
        Ok(ExportReport {
            location: path.to_string_lossy().into_owned(),
            shape: image.shape,
            band_names: image.band_names().into_iter().map(String::from).collect(),
        })
    }
}

/// Write a rendered preview layer as an RGBA PNG
pub fn write_preview_png(preview: &RgbaImage, path: &Path) -> FireResult<()> {
    let (width, height) = preview.shape;
    let mem = DriverManager::get_driver_by_name("MEM")?;
    let mut dataset = mem.create_with_band_type::<u8, _>("", width, height, 4)?;

    for channel in 0..4 {
        let data = preview.pixels.iter().map(|px| px[channel]).collect();
        let mut buffer = Buffer::new(preview.shape, data);
        let mut band = dataset.rasterband(channel + 1)?;
        band.write((0, 0), preview.shape, &mut buffer)?;
    }

    let png = DriverManager::get_driver_by_name("PNG")?;
    dataset.create_copy(&png, path, &RasterCreationOptions::new())?;
    Ok(())
}
