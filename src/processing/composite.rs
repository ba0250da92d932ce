// src/processing/composite.rs
use log::info;

use crate::error::{FireError, FireResult};
use crate::processing::parallel::{map_tiles, TileGrid};
use crate::raster::{Image, RasterBand};

/// Scenes of one collection after per-image masking
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedCollection {
    pub id: String,
    pub images: Vec<Image>,
}

impl MaskedCollection {
    pub fn new(id: impl Into<String>, images: Vec<Image>) -> Self {
        Self {
            id: id.into(),
            images,
        }
    }
}

/// Median of the given observations; the mean of the two middle values for
/// even counts, `None` for an empty set.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Per-pixel, per-band temporal median over unmasked observations.
///
/// Every image must share the grid and band list of the first one. Pixels
/// with no unmasked observation stay masked in the composite.
pub fn median_composite(collection: &MaskedCollection, grid: &TileGrid) -> FireResult<Image> {
    let first = collection
        .images
        .first()
        .ok_or_else(|| FireError::EmptyCollection {
            collection: collection.id.clone(),
        })?;

    for image in &collection.images[1..] {
        if !image.same_grid(first) {
            return Err(FireError::GridMismatch(format!(
                "image {} does not share the grid of {} in collection {}",
                image.id, first.id, collection.id
            )));
        }
    }

    let band_names = first.band_names();
    // stacks[b][k] is band b of image k
    let stacks = band_names
        .iter()
        .map(|name| {
            collection
                .images
                .iter()
                .map(|image| image.band(name))
                .collect::<FireResult<Vec<&RasterBand>>>()
        })
        .collect::<FireResult<Vec<_>>>()?;

    let pixels = map_tiles(grid, Vec::new(), |i| {
        stacks
            .iter()
            .map(|observations| {
                let mut values: Vec<f64> = observations.iter().filter_map(|b| b.value(i)).collect();
                median(&mut values)
            })
            .collect::<Vec<Option<f64>>>()
    });

    let mut composite = first.like();
    composite.id = format!("{}/median", collection.id);
    composite.date = None;
    for (b, name) in band_names.iter().enumerate() {
        let values = pixels.iter().map(|pixel| pixel[b]).collect();
        composite.push_band(RasterBand::from_values(*name, values))?;
    }

    info!(
        "Median composite of {} images over {} bands",
        collection.images.len(),
        composite.band_count()
    );
    Ok(composite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{GeoTransform, TypedBuffer};

    fn single_band(id: &str, values: Vec<Option<f64>>) -> Image {
        Image::new(id, (values.len(), 1), GeoTransform::new(0.0, 1.0, 1.0, -1.0), "EPSG:4326")
            .with_band(RasterBand::from_values("B8", values))
            .unwrap()
    }

    #[test]
    fn median_of_odd_even_and_empty_sets() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn ignores_masked_observations() {
        let collection = MaskedCollection::new(
            "s2",
            vec![
                single_band("a", vec![Some(0.1), None, None]),
                single_band("b", vec![Some(0.9), Some(0.4), None]),
                single_band("c", vec![Some(0.2), None, None]),
            ],
        );
        let grid = TileGrid::new((3, 1), 2);
        let composite = median_composite(&collection, &grid).unwrap();
        assert_eq!(composite.band("B8").unwrap().values(), vec![Some(0.2), Some(0.4), None]);
    }

    #[test]
    fn empty_collection_is_an_error() {
        let grid = TileGrid::new((1, 1), 1);
        let err = median_composite(&MaskedCollection::new("s2", vec![]), &grid).unwrap_err();
        assert!(matches!(err, FireError::EmptyCollection { ref collection } if collection == "s2"));
    }

    #[test]
    fn rejects_mismatched_grids() {
        let a = single_band("a", vec![Some(0.1)]);
        let b = Image::new("b", (1, 1), GeoTransform::new(5.0, 1.0, 1.0, -1.0), "EPSG:4326")
            .with_band(RasterBand::new("B8", TypedBuffer::F64(vec![0.3])))
            .unwrap();
        let grid = TileGrid::new((1, 1), 1);
        let err = median_composite(&MaskedCollection::new("s2", vec![a, b]), &grid).unwrap_err();
        assert!(matches!(err, FireError::GridMismatch(_)));
    }
}
