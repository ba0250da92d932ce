// src/config.rs
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::{DateRange, SENTINEL2_SR};
use crate::error::FireResult;
use crate::export::ExportConfig;
use crate::pipeline::PipelineSettings;
use crate::processing::cloud_mask::{CloudMask, DEFAULT_EXCLUDED_CLASSES};
use crate::processing::indices::{fire_indices, ExpressionIndex, IndexCalculator};
use crate::processing::parallel::DEFAULT_TILE_SIZE;
use crate::raster::Region;
use crate::viz::{default_layers, VisParams};

/// JSON description of one compositing run
#[derive(Deserialize, Debug)]
pub struct RunConfig {
    pub region: Region,
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Scene manifest read by the GeoTIFF catalog
    pub catalog: Option<PathBuf>,
    #[serde(default = "default_mask_classes")]
    pub mask_classes: Vec<u8>,
    #[serde(default)]
    pub export: ExportConfig,
    /// Directory under which the export folder is created
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    #[serde(default)]
    pub custom_indices: Vec<CustomIndex>,
    #[serde(default = "default_layers")]
    pub previews: Vec<VisParams>,
    #[serde(default = "default_tile_size")]
    pub tile_size: usize,
    pub threads: Option<usize>,
}

/// Extra band-math index appended after the fire indices
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CustomIndex {
    pub name: String,
    pub expression: String,
}

fn default_collection() -> String {
    SENTINEL2_SR.to_string()
}

fn default_mask_classes() -> Vec<u8> {
    DEFAULT_EXCLUDED_CLASSES.to_vec()
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_tile_size() -> usize {
    DEFAULT_TILE_SIZE
}

impl RunConfig {
    pub fn from_path(path: &Path) -> FireResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> FireResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn date_range(&self) -> FireResult<DateRange> {
        DateRange::parse(&self.start_date, &self.end_date)
    }

    /// Fixed indices followed by the custom ones, every expression parsed
    pub fn indices(&self) -> FireResult<Vec<Box<dyn IndexCalculator>>> {
        let mut indices = fire_indices();
        for custom in &self.custom_indices {
            indices.push(Box::new(ExpressionIndex::parse(&custom.name, &custom.expression)?));
        }
        Ok(indices)
    }

    pub fn settings(&self) -> FireResult<PipelineSettings> {
        let mut settings =
            PipelineSettings::new(self.collection.clone(), self.region.clone(), self.date_range()?);
        settings.cloud_mask = CloudMask::new(self.mask_classes.clone());
        settings.indices = self.indices()?;
        settings.export = self.export.clone();
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FireError;
    use crate::export::FileFormat;

    const MINIMAL: &str = r#"{
        "region": {"coordinates": [[-120.5, 38.0], [-120.0, 38.0], [-120.0, 38.5], [-120.5, 38.5]]},
        "start_date": "2023-01-01",
        "end_date": "2023-12-31"
    }"#;

    #[test]
    fn defaults_match_reference_export() {
        let config = RunConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.collection, "COPERNICUS/S2_SR");
        assert_eq!(config.mask_classes, vec![3, 7, 8, 9, 10]);
        assert_eq!(config.export.description, "Fire_Indices_Composite");
        assert_eq!(config.export.folder, "Fire_Export");
        assert_eq!(config.export.scale, 10.0);
        assert_eq!(config.export.crs, "EPSG:4326");
        assert_eq!(config.export.file_format, FileFormat::GeoTIFF);
        assert_eq!(config.export.max_pixels, 1e13);
        assert_eq!(config.previews.len(), 3);
        assert_eq!(config.tile_size, 256);
        assert_eq!(config.settings().unwrap().indices.len(), 9);
    }

    #[test]
    fn custom_indices_are_appended() {
        let json = MINIMAL.replacen(
            "\"start_date\"",
            r#""custom_indices": [{"name": "GNDVI", "expression": "(B8 - B3) / (B8 + B3)"}], "start_date""#,
            1,
        );
        let config = RunConfig::from_json(&json).unwrap();
        let names: Vec<String> = config.indices().unwrap().iter().map(|i| i.name().to_string()).collect();
        assert_eq!(names.last().map(String::as_str), Some("GNDVI"));
        assert_eq!(names.len(), 10);
    }

    #[test]
    fn bad_export_fails_before_any_raster() {
        for export in [
            r#"{"crs": "WGS84"}"#,
            r#"{"scale": -5}"#,
            r#"{"crs": "EPSG:32610"}"#,
            r#"{"scale": 1e-6}"#,
            r#"{"max_pixels": 100}"#,
        ] {
            let json = MINIMAL.replacen("\"start_date\"", &format!(r#""export": {export}, "start_date""#), 1);
            let config = RunConfig::from_json(&json).unwrap();
            assert!(
                matches!(config.settings(), Err(FireError::Config(_) | FireError::ExportTooLarge { .. })),
                "{export}"
            );
        }
    }

    #[test]
    fn bad_region_or_dates_fail_fast() {
        let bad_region = MINIMAL.replace(", [-120.0, 38.5], [-120.5, 38.5]", "");
        assert!(RunConfig::from_json(&bad_region).is_err());

        let bad_dates = MINIMAL.replace("2023-12-31", "2022-12-31");
        let config = RunConfig::from_json(&bad_dates).unwrap();
        assert!(matches!(config.settings(), Err(FireError::Config(_))));
    }
}
