// src/catalog.rs
use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{FireError, FireResult};
use crate::raster::{BoundingBox, Image, Region};

pub const SENTINEL2_SR: &str = "COPERNICUS/S2_SR";

/// Half-open acquisition window: `start <= date < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> FireResult<Self> {
        if start >= end {
            return Err(FireError::config(format!(
                "date range start {start} must be before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse ISO-8601 calendar dates (YYYY-MM-DD)
    pub fn parse(start: &str, end: &str) -> FireResult<Self> {
        let parse = |label: &str, value: &str| {
            NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
                FireError::config(format!("invalid {label} date '{value}': {e}"))
            })
        };
        Self::new(parse("start", start)?, parse("end", end)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// Catalog entry for one acquisition, known before any pixel is read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub id: String,
    pub date: NaiveDate,
    pub bounds: BoundingBox,
    /// "AUTH:CODE" of the scene grid; `bounds` are in these units
    pub crs: String,
    /// Source-specific location (file path, key)
    #[serde(default)]
    pub location: String,
}

/// Date-ordered set of scenes from one catalog collection
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCollection {
    pub id: String,
    scenes: Vec<SceneInfo>,
}

impl ImageCollection {
    pub fn new(id: impl Into<String>, mut scenes: Vec<SceneInfo>) -> Self {
        scenes.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Self {
            id: id.into(),
            scenes,
        }
    }

    pub fn filter_bounds(mut self, region: &Region) -> Self {
        let bounds = region.bounds();
        self.scenes.retain(|s| s.bounds.intersects(&bounds));
        self
    }

    /// Footprints are only comparable with a region in the same CRS
    pub fn check_crs(&self, crs: &str) -> FireResult<()> {
        match self.scenes.iter().find(|s| s.crs != crs) {
            Some(scene) => Err(FireError::config(format!(
                "scene {} of collection {} is in {}, regions are {crs}; reprojection is not supported",
                scene.id, self.id, scene.crs
            ))),
            None => Ok(()),
        }
    }

    pub fn filter_date(mut self, range: &DateRange) -> Self {
        self.scenes.retain(|s| range.contains(s.date));
        self
    }

    pub fn scenes(&self) -> &[SceneInfo] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

/// Provider of scene metadata and pixel data
pub trait ImageSource: Send + Sync {
    /// All scenes of a collection; unknown collections are a configuration error
    fn scenes(&self, collection_id: &str) -> FireResult<Vec<SceneInfo>>;

    /// Read the raw bands (including SCL) of one scene
    fn read(&self, collection_id: &str, scene: &SceneInfo) -> FireResult<Image>;
}

/// Catalog holding already-decoded images
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    collections: HashMap<String, Vec<Image>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every image must carry an acquisition date
    pub fn with_collection(mut self, id: impl Into<String>, images: Vec<Image>) -> FireResult<Self> {
        let id = id.into();
        if let Some(image) = images.iter().find(|i| i.date.is_none()) {
            return Err(FireError::config(format!(
                "image {} in collection {id} has no acquisition date",
                image.id
            )));
        }
        self.collections.insert(id, images);
        Ok(self)
    }
}

impl ImageSource for MemoryCatalog {
    fn scenes(&self, collection_id: &str) -> FireResult<Vec<SceneInfo>> {
        let images = self
            .collections
            .get(collection_id)
            .ok_or_else(|| FireError::config(format!("unknown collection '{collection_id}'")))?;

        Ok(images
            .iter()
            .filter_map(|image| {
                image.date.map(|date| SceneInfo {
                    id: image.id.clone(),
                    date,
                    bounds: image.bounds(),
                    crs: image.crs.clone(),
                    location: String::new(),
                })
            })
            .collect())
    }

    fn read(&self, collection_id: &str, scene: &SceneInfo) -> FireResult<Image> {
        self.collections
            .get(collection_id)
            .and_then(|images| images.iter().find(|i| i.id == scene.id))
            .cloned()
            .ok_or_else(|| {
                FireError::config(format!(
                    "scene {} not found in collection {collection_id}",
                    scene.id
                ))
            })
    }
}
