// src/raster/geometry.rs
use serde::{Deserialize, Serialize};

use crate::error::{FireError, FireResult};

/// Axis-aligned extent in CRS units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// GDAL-ordered affine transform, north-up only
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    pub fn new(origin_x: f64, pixel_width: f64, origin_y: f64, pixel_height: f64) -> Self {
        Self([origin_x, pixel_width, 0.0, origin_y, 0.0, pixel_height])
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.0[0], self.0[3])
    }

    pub fn pixel_size(&self) -> (f64, f64) {
        (self.0[1], self.0[5])
    }

    pub fn is_north_up(&self) -> bool {
        self.0[2] == 0.0 && self.0[4] == 0.0
    }

    /// CRS coordinates of the centre of pixel (col, row)
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        let [x0, dx, _, y0, _, dy] = self.0;
        (
            x0 + (col as f64 + 0.5) * dx,
            y0 + (row as f64 + 0.5) * dy,
        )
    }

    /// Fractional pixel coordinates of a CRS point
    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let [x0, dx, _, y0, _, dy] = self.0;
        ((x - x0) / dx, (y - y0) / dy)
    }

    pub fn bounds(&self, shape: (usize, usize)) -> BoundingBox {
        let [x0, dx, _, y0, _, dy] = self.0;
        let x1 = x0 + shape.0 as f64 * dx;
        let y1 = y0 + shape.1 as f64 * dy;
        BoundingBox {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }
}

#[derive(Deserialize)]
struct RegionDef {
    coordinates: Vec<[f64; 2]>,
}

/// CRS of region coordinates
pub const REGION_CRS: &str = "EPSG:4326";

/// Polygon of interest in lon/lat, used for filtering and clipping
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RegionDef")]
pub struct Region {
    ring: Vec<(f64, f64)>,
    bounds: BoundingBox,
}

impl TryFrom<RegionDef> for Region {
    type Error = FireError;

    fn try_from(def: RegionDef) -> Result<Self, Self::Error> {
        Region::new(def.coordinates.into_iter().map(|[x, y]| (x, y)).collect())
    }
}

impl Region {
    /// Build a region from a polygon ring; closing vertex is optional
    pub fn new(mut ring: Vec<(f64, f64)>) -> FireResult<Self> {
        if ring.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(FireError::config("region has non-finite coordinates"));
        }
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        let mut distinct = ring.clone();
        distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        distinct.dedup();
        if distinct.len() < 3 {
            return Err(FireError::config(
                "region polygon needs at least three distinct vertices",
            ));
        }

        let bounds = ring.iter().fold(
            BoundingBox {
                min_x: f64::INFINITY,
                min_y: f64::INFINITY,
                max_x: f64::NEG_INFINITY,
                max_y: f64::NEG_INFINITY,
            },
            |b, &(x, y)| BoundingBox {
                min_x: b.min_x.min(x),
                min_y: b.min_y.min(y),
                max_x: b.max_x.max(x),
                max_y: b.max_y.max(y),
            },
        );
        let doubled_area: f64 = ring
            .iter()
            .zip(ring.iter().cycle().skip(1))
            .map(|(&(x0, y0), &(x1, y1))| x0 * y1 - x1 * y0)
            .sum();
        if doubled_area == 0.0 {
            return Err(FireError::config("region polygon has zero area"));
        }

        Ok(Self { ring, bounds })
    }

    pub fn from_bbox(bbox: BoundingBox) -> FireResult<Self> {
        Self::new(vec![
            (bbox.min_x, bbox.min_y),
            (bbox.max_x, bbox.min_y),
            (bbox.max_x, bbox.max_y),
            (bbox.min_x, bbox.max_y),
        ])
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.ring
    }

    /// Even-odd point-in-polygon test
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let mut inside = false;
        let n = self.ring.len();
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.ring[i];
            let (xj, yj) = self.ring[j];
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}
