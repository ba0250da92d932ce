// src/processing/parallel.rs
use std::num::NonZero;

use itertools::iproduct;
use log::{debug, info};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::catalog::{DateRange, ImageCollection, ImageSource};
use crate::error::{FireError, FireResult};
use crate::export::{ensure_valid_pixels, resample_to_grid, ExportReport, ExportRequest, ExportSink};
use crate::processing::composite::{median_composite, MaskedCollection};
use crate::processing::indices::IndexCalculator;
use crate::processing::stack::StackedImage;
use crate::raster::{Image, RasterBand, Region};

pub const DEFAULT_TILE_SIZE: usize = 256;

/// One rectangular window of a tile grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub x_off: usize,
    pub y_off: usize,
    pub width: usize,
    pub height: usize,
}

/// Partition of a raster into independent tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub shape: (usize, usize),
    pub region_size: (usize, usize),
    pub blocks: (usize, usize),
}

impl TileGrid {
    pub fn new(shape: (usize, usize), tile_size: usize) -> Self {
        let tile_size = tile_size.max(1);
        // Never use a region larger than the raster itself
        let region_size = (tile_size.min(shape.0.max(1)), tile_size.min(shape.1.max(1)));
        let blocks = (
            shape.0.div_ceil(region_size.0),
            shape.1.div_ceil(region_size.1),
        );
        Self {
            shape,
            region_size,
            blocks,
        }
    }

    pub fn tile(&self, x: usize, y: usize) -> Tile {
        let x_off = x * self.region_size.0;
        let y_off = y * self.region_size.1;
        Tile {
            x_off,
            y_off,
            width: self.region_size.0.min(self.shape.0 - x_off),
            height: self.region_size.1.min(self.shape.1 - y_off),
        }
    }

    pub fn tiles(&self) -> Vec<Tile> {
        iproduct!(0..self.blocks.1, 0..self.blocks.0)
            .map(|(y, x)| self.tile(x, y))
            .collect()
    }
}

/// Evaluate `per_pixel` for every pixel, one tile per task, and merge the
/// tiles back into a row-major vector.
pub fn map_tiles<T, F>(grid: &TileGrid, fill: T, per_pixel: F) -> Vec<T>
where
    T: Send + Clone,
    F: Fn(usize) -> T + Sync,
{
    let width = grid.shape.0;
    let (tx, rx) = flume::unbounded();

    grid.tiles().into_par_iter().for_each_with(tx, |tx, tile| {
        let values: Vec<T> = (tile.y_off..tile.y_off + tile.height)
            .flat_map(|row| (tile.x_off..tile.x_off + tile.width).map(move |col| row * width + col))
            .map(&per_pixel)
            .collect();
        // The receiver lives until every sender is dropped
        let _ = tx.send((tile, values));
    });

    let mut output = vec![fill; grid.shape.0 * grid.shape.1];
    for (tile, values) in rx.iter() {
        for (i, value) in values.into_iter().enumerate() {
            let row = tile.y_off + i / tile.width;
            let col = tile.x_off + i % tile.width;
            output[row * width + col] = value;
        }
    }
    output
}

/// Evaluate one index over `image`, masking any pixel where an input is
/// masked or the formula has no finite value.
pub fn evaluate_index(
    calculator: &dyn IndexCalculator,
    image: &Image,
    grid: &TileGrid,
) -> FireResult<RasterBand> {
    calculator.validate()?;
    let inputs = calculator
        .required_bands()
        .iter()
        .map(|band| image.band(band.as_str()))
        .collect::<FireResult<Vec<_>>>()?;

    let values = map_tiles(grid, None, |i| {
        let mut pixel = Vec::with_capacity(inputs.len());
        for band in &inputs {
            pixel.push(band.value(i)?);
        }
        calculator.evaluate(&pixel).filter(|v| v.is_finite())
    });

    Ok(RasterBand::from_values(calculator.name(), values))
}

/// Operations the fire pipeline needs from a raster backend
pub trait RasterEngine: Send + Sync {
    fn load_collection(&self, collection_id: &str) -> FireResult<ImageCollection>;

    fn filter_bounds(&self, collection: ImageCollection, region: &Region) -> ImageCollection {
        collection.filter_bounds(region)
    }

    fn filter_date(&self, collection: ImageCollection, range: &DateRange) -> ImageCollection {
        collection.filter_date(range)
    }

    /// Read every scene and apply `f` to it
    fn map(
        &self,
        collection: &ImageCollection,
        f: &(dyn Fn(&Image) -> FireResult<Image> + Sync),
    ) -> FireResult<MaskedCollection>;

    fn reduce_median(&self, collection: &MaskedCollection) -> FireResult<Image>;

    fn expression(&self, image: &Image, calculator: &dyn IndexCalculator) -> FireResult<RasterBand>;

    /// Resample `image` onto the export grid, masked outside the region.
    /// A band left without valid pixels is an error.
    fn clip(&self, image: &StackedImage, request: &ExportRequest) -> FireResult<StackedImage>;

    /// Clip, then hand the result to `sink`; nothing is written on failure
    fn export(
        &self,
        image: &StackedImage,
        request: &ExportRequest,
        sink: &dyn ExportSink,
    ) -> FireResult<ExportReport> {
        let clipped = self.clip(image, request)?;
        sink.write(&clipped, request)
    }
}

/// In-memory engine evaluating every operation tile by tile on a rayon pool
pub struct TiledEngine<S: ImageSource> {
    source: S,
    pool: ThreadPool,
    tile_size: usize,
}

impl<S: ImageSource> TiledEngine<S> {
    pub fn new(source: S, threads: Option<usize>, tile_size: usize) -> FireResult<Self> {
        let threads = threads
            .and_then(NonZero::new)
            .map(NonZero::get)
            .unwrap_or_else(num_cpus::get);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| FireError::config(format!("failed to build thread pool: {e}")))?;
        debug!("Tiled engine with {threads} threads, tile size {tile_size}");

        Ok(Self {
            source,
            pool,
            tile_size: tile_size.max(1),
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn tile_grid(&self, shape: (usize, usize)) -> TileGrid {
        TileGrid::new(shape, self.tile_size)
    }
}

impl<S: ImageSource> RasterEngine for TiledEngine<S> {
    fn load_collection(&self, collection_id: &str) -> FireResult<ImageCollection> {
        let scenes = self.source.scenes(collection_id)?;
        info!("Collection {collection_id}: {} scenes in catalog", scenes.len());
        Ok(ImageCollection::new(collection_id, scenes))
    }

    fn map(
        &self,
        collection: &ImageCollection,
        f: &(dyn Fn(&Image) -> FireResult<Image> + Sync),
    ) -> FireResult<MaskedCollection> {
        let images = self.pool.install(|| {
            collection
                .scenes()
                .par_iter()
                .map(|scene| {
                    let raw = self.source.read(&collection.id, scene)?;
                    f(&raw)
                })
                .collect::<FireResult<Vec<_>>>()
        })?;
        Ok(MaskedCollection::new(collection.id.clone(), images))
    }

    fn reduce_median(&self, collection: &MaskedCollection) -> FireResult<Image> {
        let first = collection.images.first().ok_or_else(|| FireError::EmptyCollection {
            collection: collection.id.clone(),
        })?;
        let grid = self.tile_grid(first.shape);
        self.pool.install(|| median_composite(collection, &grid))
    }

    fn expression(&self, image: &Image, calculator: &dyn IndexCalculator) -> FireResult<RasterBand> {
        let grid = self.tile_grid(image.shape);
        self.pool.install(|| evaluate_index(calculator, image, &grid))
    }

    fn clip(&self, image: &StackedImage, request: &ExportRequest) -> FireResult<StackedImage> {
        let grid = request.prepare()?;
        if image.crs != request.config.crs {
            return Err(FireError::config(format!(
                "export CRS {} differs from image CRS {}; reprojection is not supported",
                request.config.crs, image.crs
            )));
        }

        let tiles = self.tile_grid(grid.shape);
        let clipped = self
            .pool
            .install(|| resample_to_grid(image, &grid, &request.region, &tiles))?;
        ensure_valid_pixels(&clipped)?;
        info!(
            "Clipped {} to {}x{} pixels, {} bands",
            request.config.description,
            grid.shape.0,
            grid.shape.1,
            clipped.band_count()
        );
        Ok(clipped)
    }
}
