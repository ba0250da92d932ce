// src/viz.rs
use serde::{Deserialize, Serialize};

use crate::error::{FireError, FireResult};
use crate::processing::stack::StackedImage;

/// Band, stretch range and colour ramp for one preview layer
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct VisParams {
    pub band: String,
    pub min: f64,
    pub max: f64,
    pub palette: Vec<String>,
}

impl VisParams {
    pub fn new(band: &str, min: f64, max: f64, palette: &[&str]) -> Self {
        Self {
            band: band.to_string(),
            min,
            max,
            palette: palette.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Preview layers drawn when a configuration does not list its own
pub fn default_layers() -> Vec<VisParams> {
    vec![
        VisParams::new("NBR", -1.0, 1.0, &["white", "black", "red"]),
        VisParams::new("NDVI", -1.0, 1.0, &["blue", "white", "green"]),
        VisParams::new("BAIS2", 0.0, 1.0, &["blue", "yellow", "red"]),
    ]
}

/// Parse a CSS colour name or `#rrggbb`/`rrggbb` hex triplet
pub fn parse_color(color: &str) -> FireResult<[u8; 3]> {
    let named = match color.trim().to_lowercase().as_str() {
        "white" => Some([255, 255, 255]),
        "black" => Some([0, 0, 0]),
        "red" => Some([255, 0, 0]),
        "green" => Some([0, 128, 0]),
        "blue" => Some([0, 0, 255]),
        "yellow" => Some([255, 255, 0]),
        "orange" => Some([255, 165, 0]),
        "gray" | "grey" => Some([128, 128, 128]),
        _ => None,
    };
    if let Some(rgb) = named {
        return Ok(rgb);
    }

    let hex = color.trim().trim_start_matches('#');
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
        if let (Ok(r), Ok(g), Ok(b)) = (channel(0), channel(2), channel(4)) {
            return Ok([r, g, b]);
        }
    }
    Err(FireError::config(format!("unrecognised colour '{color}'")))
}

/// RGBA raster, row-major, masked pixels fully transparent
#[derive(Debug, Clone, PartialEq)]
pub struct RgbaImage {
    pub shape: (usize, usize),
    pub pixels: Vec<[u8; 4]>,
}

/// Stretch one band of `image` over `[min, max]` and map it onto the palette
pub fn render(image: &StackedImage, params: &VisParams) -> FireResult<RgbaImage> {
    if params.palette.is_empty() {
        return Err(FireError::config(format!("palette for {} is empty", params.band)));
    }
    if !(params.max > params.min) {
        return Err(FireError::config(format!(
            "visualisation range for {} must have max > min",
            params.band
        )));
    }
    let colors = params
        .palette
        .iter()
        .map(|c| parse_color(c))
        .collect::<FireResult<Vec<_>>>()?;
    let band = image.band(&params.band)?;

    let pixels = band
        .values()
        .into_iter()
        .map(|value| match value {
            Some(v) => {
                let t = ((f64::from(v) - params.min) / (params.max - params.min)).clamp(0.0, 1.0);
                let [r, g, b] = interpolate(&colors, t);
                [r, g, b, 255]
            }
            None => [0, 0, 0, 0],
        })
        .collect();

    Ok(RgbaImage {
        shape: image.shape,
        pixels,
    })
}

fn interpolate(colors: &[[u8; 3]], t: f64) -> [u8; 3] {
    if colors.len() == 1 {
        return colors[0];
    }
    let position = t * (colors.len() - 1) as f64;
    let lower = (position.floor() as usize).min(colors.len() - 2);
    let frac = position - lower as f64;
    let (a, b) = (colors[lower], colors[lower + 1]);
    let mut out = [0u8; 3];
    for c in 0..3 {
        out[c] = (f64::from(a[c]) + (f64::from(b[c]) - f64::from(a[c])) * frac).round() as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::stack::StackedBand;
    use crate::raster::GeoTransform;

    #[test]
    fn parses_names_and_hex() {
        assert_eq!(parse_color("Red").unwrap(), [255, 0, 0]);
        assert_eq!(parse_color("#00ff80").unwrap(), [0, 255, 128]);
        assert!(parse_color("#00ff8").is_err());
        assert!(parse_color("chartreuse").is_err());
    }

    #[test]
    fn renders_ramp_and_transparent_nodata() {
        let mut image = StackedImage::new((4, 1), GeoTransform::new(0.0, 1.0, 1.0, -1.0), "EPSG:4326");
        image
            .push_band(StackedBand {
                name: "NBR".into(),
                data: vec![-1.0, 0.0, 5.0, -999.0],
                mask: vec![true, true, true, false],
            })
            .unwrap();
        let rgba = render(&image, &default_layers()[0]).unwrap();
        assert_eq!(
            rgba.pixels,
            vec![[255, 255, 255, 255], [0, 0, 0, 255], [255, 0, 0, 255], [0, 0, 0, 0]]
        );
    }

    #[test]
    fn rejects_empty_palette_and_inverted_range() {
        let image = StackedImage::new((1, 1), GeoTransform::new(0.0, 1.0, 1.0, -1.0), "EPSG:4326");
        assert!(render(&image, &VisParams::new("NBR", 0.0, 1.0, &[])).is_err());
        assert!(render(&image, &VisParams::new("NBR", 1.0, 1.0, &["red"])).is_err());
    }
}
