// src/raster/band.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FireError;

/// Sentinel-2 Level-2A band identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Band {
    B1,
    B2,
    B3,
    B4,
    B5,
    B6,
    B7,
    B8,
    B8A,
    B9,
    B11,
    B12,
    /// Scene classification layer
    #[serde(rename = "SCL")]
    Scl,
}

/// Bands kept by the cloud mask, in composite order
pub const COMPOSITE_BANDS: [Band; 10] = [
    Band::B2,
    Band::B3,
    Band::B4,
    Band::B6,
    Band::B7,
    Band::B8,
    Band::B8A,
    Band::B9,
    Band::B11,
    Band::B12,
];

impl Band {
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::B1 => "B1",
            Band::B2 => "B2",
            Band::B3 => "B3",
            Band::B4 => "B4",
            Band::B5 => "B5",
            Band::B6 => "B6",
            Band::B7 => "B7",
            Band::B8 => "B8",
            Band::B8A => "B8A",
            Band::B9 => "B9",
            Band::B11 => "B11",
            Band::B12 => "B12",
            Band::Scl => "SCL",
        }
    }

    pub fn is_composite(&self) -> bool {
        COMPOSITE_BANDS.contains(self)
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Band {
    type Err = FireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Catalogs disagree on zero padding ("B04" vs "B4")
        let upper = s.trim().to_uppercase();
        let normalized = match upper.strip_prefix("B0") {
            Some(rest) => format!("B{rest}"),
            None => upper,
        };
        let band = match normalized.as_str() {
            "B1" => Band::B1,
            "B2" => Band::B2,
            "B3" => Band::B3,
            "B4" => Band::B4,
            "B5" => Band::B5,
            "B6" => Band::B6,
            "B7" => Band::B7,
            "B8" => Band::B8,
            "B8A" => Band::B8A,
            "B9" => Band::B9,
            "B11" => Band::B11,
            "B12" => Band::B12,
            "SCL" => Band::Scl,
            _ => return Err(FireError::config(format!("unknown band name '{s}'"))),
        };
        Ok(band)
    }
}
