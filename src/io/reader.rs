// src/io/reader.rs
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use gdal::{Dataset, Metadata};
use log::debug;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Deserialize;

use crate::catalog::{ImageSource, SceneInfo};
use crate::error::{FireError, FireResult};
use crate::raster::{Band, BoundingBox, GeoTransform, Image, RasterBand, TypedBuffer};

/// Scene manifest: collection id -> scenes stored as multi-band GeoTIFFs
#[derive(Deserialize, Debug)]
pub struct Manifest {
    pub collections: HashMap<String, Vec<ManifestScene>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ManifestScene {
    pub id: String,
    pub date: NaiveDate,
    /// Relative to the manifest's directory
    pub path: PathBuf,
    /// Band names in file order; band descriptions are used when absent
    #[serde(default)]
    pub bands: Vec<String>,
}

/// Footprint and CRS of one file, read from its header only
#[derive(Debug, Clone)]
struct Footprint {
    bounds: BoundingBox,
    crs: String,
}

/// Catalog reading scenes through GDAL, footprints cached per file.
///
/// Scenes keep the CRS of their files. Regions are lon/lat, so a manifest
/// of projected (e.g. UTM) scenes is rejected when a run starts instead of
/// filtering every scene out.
pub struct GdalCatalog {
    root: PathBuf,
    manifest: Manifest,
    footprints: Mutex<HashMap<PathBuf, Footprint>>,
}

impl GdalCatalog {
    pub fn open(manifest_path: &Path) -> FireResult<Self> {
        let content = fs::read_to_string(manifest_path)?;
        let manifest: Manifest = serde_json::from_str(&content)?;
        let root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Self {
            root,
            manifest,
            footprints: Mutex::new(HashMap::new()),
        })
    }

    fn entries(&self, collection_id: &str) -> FireResult<&[ManifestScene]> {
        self.manifest
            .collections
            .get(collection_id)
            .map(Vec::as_slice)
            .ok_or_else(|| FireError::config(format!("unknown collection '{collection_id}'")))
    }

    fn footprint(&self, path: &Path) -> FireResult<Footprint> {
        if let Some(footprint) = self.footprints.lock().get(path) {
            return Ok(footprint.clone());
        }
        let dataset = Dataset::open(path)?;
        let footprint = Footprint {
            bounds: GeoTransform(dataset.geo_transform()?).bounds(dataset.raster_size()),
            crs: crs_of(&dataset, path)?,
        };
        self.footprints.lock().insert(path.to_path_buf(), footprint.clone());
        Ok(footprint)
    }
}

/// "AUTH:CODE" of the dataset's spatial reference
fn crs_of(dataset: &Dataset, path: &Path) -> FireResult<String> {
    let srs = dataset.spatial_ref()?;
    match (srs.auth_name(), srs.auth_code()) {
        (Ok(name), Ok(code)) => Ok(format!("{name}:{code}")),
        _ => Err(FireError::config(format!(
            "{} has no authority code for its CRS",
            path.display()
        ))),
    }
}

impl ImageSource for GdalCatalog {
    fn scenes(&self, collection_id: &str) -> FireResult<Vec<SceneInfo>> {
        self.entries(collection_id)?
            .par_iter()
            .map(|entry| {
                let path = self.root.join(&entry.path);
                let footprint = self.footprint(&path)?;
                Ok(SceneInfo {
                    id: entry.id.clone(),
                    date: entry.date,
                    bounds: footprint.bounds,
                    crs: footprint.crs,
                    location: path.to_string_lossy().into_owned(),
                })
            })
            .collect()
    }

    fn read(&self, collection_id: &str, scene: &SceneInfo) -> FireResult<Image> {
        let entry = self
            .entries(collection_id)?
            .iter()
            .find(|e| e.id == scene.id)
            .ok_or_else(|| {
                FireError::config(format!("scene {} not in collection {collection_id}", scene.id))
            })?;
        let path = self.root.join(&entry.path);
        let dataset = Dataset::open(&path)?;
        let (width, height) = dataset.raster_size();

        let mut image = Image::new(
            entry.id.clone(),
            (width, height),
            GeoTransform(dataset.geo_transform()?),
            crs_of(&dataset, &path)?,
        )
        .with_date(entry.date);

        for index in 1..=dataset.raster_count() {
            let band = dataset.rasterband(index)?;
            let name = match entry.bands.get(index - 1) {
                Some(name) => name.clone(),
                None => band.description()?,
            };
            // Unknown band names are kept out of the image rather than failing the scene
            let name = match name.parse::<Band>() {
                Ok(parsed) => parsed.as_str().to_string(),
                Err(_) => {
                    debug!("Skipping band {index} ('{name}') of {}", path.display());
                    continue;
                }
            };

            let buffer = band.read_as::<u16>((0, 0), (width, height), (width, height), None)?;
            let data = buffer.data().to_vec();
            let mask = match band.no_data_value() {
                Some(nodata) => data.iter().map(|&v| f64::from(v) != nodata).collect(),
                None => vec![true; data.len()],
            };
            image.push_band(RasterBand::with_mask(name, TypedBuffer::U16(data), mask)?)?;
        }

        debug!("Read scene {} with bands {:?}", image.id, image.band_names());
        Ok(image)
    }
}
