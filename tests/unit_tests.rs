// tests/unit_tests.rs
use approx::assert_relative_eq;
use fire_calc::processing::indices::{
    fire_indices, IndexCalculator, BAIS2, CSI, MIRBI, MSAVI, NDI, VARI,
};
use fire_calc::raster::{Band, GeoTransform, Image, RasterBand, TypedBuffer, COMPOSITE_BANDS};
use fire_calc::FireError;

/// Helper function to build a composite where every pixel takes the listed
/// band values (repeating pattern), other composite bands set to 0.1
fn create_test_composite(width: usize, height: usize, bands: &[(Band, &[f64])]) -> Image {
    let mut image = Image::new(
        "composite",
        (width, height),
        GeoTransform::new(0.0, 1.0, height as f64, -1.0),
        "EPSG:4326",
    );
    for band in COMPOSITE_BANDS {
        let pattern: &[f64] = bands
            .iter()
            .find(|(b, _)| *b == band)
            .map(|(_, values)| *values)
            .unwrap_or(&[0.1]);
        let data = (0..width * height).map(|i| pattern[i % pattern.len()]).collect();
        image
            .push_band(RasterBand::new(band.as_str(), TypedBuffer::F64(data)))
            .unwrap();
    }
    image
}

/// Helper function to evaluate one pixel directly
fn eval(index: &dyn IndexCalculator, values: &[f64]) -> Option<f64> {
    index.evaluate(values)
}

/// Test NDVI calculation with known values
#[test]
fn test_ndvi_calculation() {
    let test_cases = [
        // NIR (B8), RED (B4), Expected NDVI
        (0.5, 0.1, Some(0.6667)),
        (0.3, 0.3, Some(0.0)),
        (0.1, 0.5, Some(-0.6667)),
        (0.0, 0.0, None), // zero denominator is masked
    ];

    let ndvi = NDI::ndvi();
    for (nir, red, expected) in test_cases {
        match (eval(&ndvi, &[nir, red]), expected) {
            (Some(actual), Some(expected)) => assert!(
                (actual - expected).abs() < 0.0001,
                "Expected {expected}, got {actual} for NIR={nir}, RED={red}"
            ),
            (actual, expected) => assert_eq!(actual, expected),
        }
    }
}

#[test]
fn test_ndvi_stays_within_unit_range() {
    let steps: Vec<f64> = (0..=20).map(|i| i as f64 * 0.05).collect();
    let ndvi = NDI::ndvi();
    for &nir in &steps {
        for &red in &steps {
            if let Some(value) = eval(&ndvi, &[nir, red]) {
                assert!((-1.0..=1.0).contains(&value), "NDVI {value} for {nir}/{red}");
            }
        }
    }
}

#[test]
fn test_nbr_and_ndwi_are_identical() {
    let nir = [0.0, 0.05, 0.3, 0.41, 0.9];
    let swir = [0.0, 0.2, 0.3, 0.07, 0.9];
    let composite = create_test_composite(5, 5, &[(Band::B8, &nir), (Band::B11, &swir)]);

    let nbr = NDI::nbr().calculate(&composite).unwrap();
    let ndwi = NDI::ndwi().calculate(&composite).unwrap();
    assert_eq!(nbr.values(), ndwi.values());
    assert_eq!(NDI::nbr().formula(), NDI::ndwi().formula());
}

#[test]
fn test_zero_denominator_is_masked_not_nan() {
    let composite = create_test_composite(2, 1, &[(Band::B8, &[0.0, 0.4]), (Band::B11, &[0.0, 0.2])]);
    for index in [NDI::nbr(), NDI::ndwi()] {
        let band = index.calculate(&composite).unwrap();
        assert_eq!(band.value(0), None, "{} should mask 0/0", band.name);
        assert!(band.value(1).is_some_and(f64::is_finite));
    }
}

#[test]
fn test_nbr2_calculation() {
    let nbr2 = NDI::nbr2();
    assert_eq!(nbr2.required_bands(), &[Band::B8A, Band::B12]);
    assert_relative_eq!(eval(&nbr2, &[0.3, 0.1]).unwrap(), 0.5, epsilon = 1e-12);
    assert_eq!(eval(&nbr2, &[0.0, 0.0]), None);
}

#[test]
fn test_csi_calculation() {
    let csi = CSI::new(None);
    assert_eq!(eval(&csi, &[0.4, 0.2]), Some(2.0));
    assert_eq!(eval(&csi, &[0.4, 0.0]), None);
    assert_eq!(eval(&csi, &[0.0, 0.3]), Some(0.0));
}

#[test]
fn test_vari_calculation() {
    let vari = VARI::new(None);
    assert_relative_eq!(eval(&vari, &[0.2, 0.1]).unwrap(), 0.1 / 0.3001, epsilon = 1e-12);
    // The offset keeps an all-dark pixel defined
    assert_eq!(eval(&vari, &[0.0, 0.0]), Some(0.0));
    assert_eq!(eval(&vari, &[0.0, -0.0001]), None);
}

#[test]
fn test_msavi_calculation() {
    let msavi = MSAVI::new(None);
    // (2 - sqrt(4 - 8 * 0.4)) / 2
    assert_relative_eq!(eval(&msavi, &[0.5, 0.1]).unwrap(), (2.0 - 0.8f64.sqrt()) / 2.0, epsilon = 1e-12);
    // Negative discriminant is masked
    assert_eq!(eval(&msavi, &[0.5, -0.5]), None);
}

#[test]
fn test_bais2_calculation() {
    let bais2 = BAIS2::new(None);
    // B4, B6, B7, B8A, B12
    let expected = (1.0 - 0.15f64.sqrt()) * ((0.2 - 0.3) / 0.5f64.sqrt() + 1.0);
    assert_relative_eq!(eval(&bais2, &[0.1, 0.2, 0.25, 0.3, 0.2]).unwrap(), expected, epsilon = 1e-12);

    assert_eq!(eval(&bais2, &[0.0, 0.2, 0.25, 0.3, 0.2]), None, "zero red band");
    assert_eq!(eval(&bais2, &[0.1, -0.2, 0.25, 0.3, 0.2]), None, "negative radicand");
    assert_eq!(eval(&bais2, &[0.1, 0.2, 0.25, 0.0, 0.0]), None, "zero SWIR sum");
}

#[test]
fn test_mirbi_calculation() {
    let mirbi = MIRBI::new(None);
    assert_relative_eq!(eval(&mirbi, &[0.2, 0.3]).unwrap(), 10.0 + 0.3 + 9.8 * 0.2, epsilon = 1e-12);
    assert_eq!(mirbi.required_bands(), &[Band::B11, Band::B12]);
}

#[test]
fn test_masked_inputs_propagate() {
    let mut composite = create_test_composite(2, 1, &[(Band::B8, &[0.5]), (Band::B4, &[0.1])]);
    let bands: Vec<RasterBand> = composite.bands().to_vec();
    let mut rebuilt = composite.like();
    for band in bands {
        let band = if band.name == "B4" {
            RasterBand::with_mask("B4", band.data, vec![true, false]).unwrap()
        } else {
            band
        };
        rebuilt.push_band(band).unwrap();
    }
    composite = rebuilt;

    let ndvi = NDI::ndvi().calculate(&composite).unwrap();
    assert!(ndvi.value(0).is_some());
    assert_eq!(ndvi.value(1), None);
}

/// Test that custom names are properly set
#[test]
fn test_custom_index_names() {
    let custom_name = "Custom NDI Name";
    let ndi = NDI::new(Band::B8, Band::B4, Some(custom_name.to_string()));
    assert_eq!(ndi.name(), custom_name);
    assert_eq!(NDI::new(Band::B8, Band::B4, None).name(), "NDI");
    assert_eq!(CSI::new(Some("Char".to_string())).name(), "Char");
}

#[test]
fn test_required_bands() {
    let expected: [(&str, &[Band]); 9] = [
        ("NBR", &[Band::B8, Band::B11]),
        ("NBR2", &[Band::B8A, Band::B12]),
        ("NDVI", &[Band::B8, Band::B4]),
        ("NDWI", &[Band::B8, Band::B11]),
        ("VARI", &[Band::B3, Band::B4]),
        ("MSAVI", &[Band::B8, Band::B4]),
        ("BAIS2", &[Band::B4, Band::B6, Band::B7, Band::B8A, Band::B12]),
        ("MIRBI", &[Band::B11, Band::B12]),
        ("CSI", &[Band::B8, Band::B11]),
    ];
    for (index, (name, bands)) in fire_indices().iter().zip(expected) {
        assert_eq!(index.name(), name);
        assert_eq!(index.required_bands(), bands);
    }
}

#[test]
fn test_formula_outside_composite_is_rejected() {
    let composite = create_test_composite(1, 1, &[]);
    let red_edge = NDI::new(Band::B5, Band::B4, Some("NDRE".to_string()));
    match red_edge.calculate(&composite) {
        Err(FireError::Config(message)) => {
            assert!(message.contains("NDRE") && message.contains("B5"), "{message}")
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
}
