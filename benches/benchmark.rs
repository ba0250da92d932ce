use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fire_calc::processing::composite::{median_composite, MaskedCollection};
use fire_calc::processing::indices::{fire_indices, IndexCalculator};
use fire_calc::processing::parallel::{evaluate_index, TileGrid, DEFAULT_TILE_SIZE};
use fire_calc::raster::{GeoTransform, Image, RasterBand, TypedBuffer, COMPOSITE_BANDS};

const SIZE: (usize, usize) = (1024, 1024);

/// Synthetic reflectance scene; `seed` shifts the pattern between dates
fn synthetic_scene(seed: usize) -> Image {
    let mut image = Image::new(
        format!("scene-{seed}"),
        SIZE,
        GeoTransform::new(0.0, 10.0, 10240.0, -10.0),
        "EPSG:32610",
    );
    for (b, band) in COMPOSITE_BANDS.iter().enumerate() {
        let data = (0..SIZE.0 * SIZE.1)
            .map(|i| 0.05 + ((i + seed * 7 + b * 13) % 100) as f64 / 250.0)
            .collect();
        image
            .push_band(RasterBand::new(band.as_str(), TypedBuffer::F64(data)))
            .unwrap();
    }
    image
}

/// Benchmark the nine fire indices over one composite
fn benchmark_fire_indices(c: &mut Criterion) {
    let composite = synthetic_scene(0);
    let grid = TileGrid::new(SIZE, DEFAULT_TILE_SIZE);

    for index in fire_indices() {
        c.bench_function(&format!("index_{}", index.name().to_lowercase()), |b| {
            b.iter(|| evaluate_index(index.as_ref(), black_box(&composite), &grid))
        });
    }
}

/// Benchmark the temporal median over a short collection
fn benchmark_median_composite(c: &mut Criterion) {
    let collection = MaskedCollection::new("bench", (0..5).map(synthetic_scene).collect());
    let grid = TileGrid::new(SIZE, DEFAULT_TILE_SIZE);

    c.bench_function("median_composite_5_scenes", |b| {
        b.iter(|| median_composite(black_box(&collection), &grid))
    });
}

criterion_group!(benches, benchmark_fire_indices, benchmark_median_composite);
criterion_main!(benches);
