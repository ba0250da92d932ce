// src/pipeline.rs
use std::sync::Arc;

use itertools::Itertools;
use log::{debug, info, warn};

use crate::catalog::DateRange;
use crate::error::{FireError, FireResult};
use crate::export::{ExportConfig, ExportReport, ExportRequest, ExportSink};
use crate::processing::indices::{fire_indices, IndexCalculator};
use crate::processing::{CloudMask, RasterEngine, StackedImage};
use crate::raster::{Image, Region, REGION_CRS};

/// Everything a run needs besides the engine
pub struct PipelineSettings {
    pub collection_id: String,
    pub region: Region,
    pub dates: DateRange,
    pub cloud_mask: CloudMask,
    /// Stacked in this order
    pub indices: Vec<Box<dyn IndexCalculator>>,
    pub export: ExportConfig,
}

impl PipelineSettings {
    /// The nine fire indices over the default cloud mask, default export
    pub fn new(collection_id: impl Into<String>, region: Region, dates: DateRange) -> Self {
        Self {
            collection_id: collection_id.into(),
            region,
            dates,
            cloud_mask: CloudMask::default(),
            indices: fire_indices(),
            export: ExportConfig::default(),
        }
    }

    pub fn export_request(&self) -> ExportRequest {
        ExportRequest::new(self.export.clone(), self.region.clone())
    }

    /// Checks needing no raster: index formulas, unique names, export
    /// parameters and size
    pub fn validate(&self) -> FireResult<()> {
        if self.indices.is_empty() {
            return Err(FireError::config("no indices configured"));
        }
        for index in &self.indices {
            index.validate()?;
        }
        let mut names: Vec<&str> = self.indices.iter().map(|i| i.name()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(FireError::config(format!("index {} is configured twice", pair[0])));
        }
        self.export_request().prepare()?;
        Ok(())
    }
}

/// Result of one run; every stacked band derives from `composite`
pub struct PipelineOutput {
    pub composite: Arc<Image>,
    pub stacked: StackedImage,
    pub scene_count: usize,
}

/// Load → cloud mask → median → indices → stack
pub struct FirePipeline<E: RasterEngine> {
    engine: E,
    settings: PipelineSettings,
}

impl<E: RasterEngine> FirePipeline<E> {
    /// Validates the settings before any raster is touched
    pub fn new(engine: E, settings: PipelineSettings) -> FireResult<Self> {
        settings.validate()?;
        // NBR and NDWI share (B8 - B11) / (B8 + B11)
        for (a, b) in settings.indices.iter().tuple_combinations() {
            if a.formula() == b.formula() {
                warn!(
                    "Indices {} and {} share the formula {}; their bands will be identical",
                    a.name(),
                    b.name(),
                    a.formula()
                );
            }
        }
        Ok(Self { engine, settings })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Cloud-masked temporal median over the region and date window
    pub fn composite(&self) -> FireResult<(Image, usize)> {
        let settings = &self.settings;
        let collection = self.engine.load_collection(&settings.collection_id)?;
        let collection = self.engine.filter_date(collection, &settings.dates);
        collection.check_crs(REGION_CRS)?;
        let collection = self.engine.filter_bounds(collection, &settings.region);
        info!(
            "{} scenes between {} and {} intersect the region",
            collection.len(),
            settings.dates.start,
            settings.dates.end
        );
        if collection.is_empty() {
            return Err(FireError::EmptyCollection {
                collection: collection.id,
            });
        }

        let mask = &settings.cloud_mask;
        let masked = self.engine.map(&collection, &|image: &Image| mask.apply(image))?;
        let composite = self.engine.reduce_median(&masked)?;
        Ok((composite, collection.len()))
    }

    pub fn run(&self) -> FireResult<PipelineOutput> {
        let (composite, scene_count) = self.composite()?;
        let composite = Arc::new(composite);

        let mut bands = Vec::with_capacity(self.settings.indices.len());
        for index in &self.settings.indices {
            let band = self.engine.expression(&composite, index.as_ref())?;
            if band.valid_count() == 0 {
                return Err(FireError::NoValidPixels {
                    band: index.name().to_string(),
                });
            }
            let masked = band.len() - band.valid_count();
            if masked > 0 {
                debug!("Index {}: {masked} of {} pixels masked", index.name(), band.len());
            }
            bands.push(band);
        }
        let stacked = StackedImage::from_bands(&composite, bands)?;
        info!("Stacked {} bands: {}", stacked.band_count(), stacked.band_names().join(", "));

        Ok(PipelineOutput {
            composite,
            stacked,
            scene_count,
        })
    }

    /// Stacked output on the export grid, masked outside the run region
    pub fn clip(&self, output: &PipelineOutput) -> FireResult<StackedImage> {
        self.engine.clip(&output.stacked, &self.settings.export_request())
    }

    /// Clip the stacked output to the run region and hand it to `sink`
    pub fn export(&self, output: &PipelineOutput, sink: &dyn ExportSink) -> FireResult<ExportReport> {
        self.engine
            .export(&output.stacked, &self.settings.export_request(), sink)
    }
}
