// src/main.rs
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use fire_calc::cli::{Cli, Commands};
use fire_calc::config::RunConfig;
use fire_calc::processing::indices::{fire_indices, IndexCalculator};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match &cli.command {
        Commands::Run {
            config,
            manifest,
            dry_run,
            preview_dir,
        } => run(
            config,
            manifest.as_deref(),
            *dry_run,
            preview_dir.as_deref(),
            cli.threads,
        ),
        Commands::Indices { config } => list_indices(config.as_deref()),
    }
}

fn list_indices(config_path: Option<&Path>) -> Result<()> {
    let indices = match config_path {
        Some(path) => RunConfig::from_path(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
            .indices()?,
        None => fire_indices(),
    };
    for (band, index) in indices.iter().enumerate() {
        println!("{:>2}  {:<8} {}", band + 1, index.name(), index.formula());
    }
    Ok(())
}

#[cfg(feature = "geotiff")]
fn run(
    config_path: &Path,
    manifest: Option<&Path>,
    dry_run: bool,
    preview_dir: Option<&Path>,
    threads: Option<usize>,
) -> Result<()> {
    use fire_calc::io::{write_preview_png, GdalCatalog, GeoTiffSink};
    use fire_calc::pipeline::FirePipeline;
    use fire_calc::processing::TiledEngine;
    use fire_calc::viz::render;

    let config = RunConfig::from_path(config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let settings = config.settings().context("Invalid run configuration")?;

    let manifest = manifest
        .or(config.catalog.as_deref())
        .context("No scene manifest: set `catalog` in the configuration or pass --manifest")?;
    let catalog = GdalCatalog::open(manifest)
        .with_context(|| format!("Failed to open manifest {}", manifest.display()))?;

    let engine = TiledEngine::new(catalog, threads.or(config.threads), config.tile_size)?;
    let pipeline = FirePipeline::new(engine, settings)?;
    let output = pipeline.run()?;

    println!(
        "Composited {} scenes into {} bands ({}x{})",
        output.scene_count,
        output.stacked.band_count(),
        output.stacked.shape.0,
        output.stacked.shape.1
    );

    if let Some(dir) = preview_dir {
        std::fs::create_dir_all(dir)?;
        let clipped = pipeline.clip(&output)?;
        for layer in &config.previews {
            let path = dir.join(format!("{}.png", layer.band));
            let preview = render(&clipped, layer)?;
            write_preview_png(&preview, &path)
                .with_context(|| format!("Failed to write preview {}", path.display()))?;
            println!("Preview: {}", path.display());
        }
    }

    if dry_run {
        println!("Dry run: export skipped");
        return Ok(());
    }

    let sink = GeoTiffSink::new(&config.output_root);
    let report = pipeline.export(&output, &sink)?;
    println!("Export complete: {}", report.location);
    Ok(())
}

#[cfg(not(feature = "geotiff"))]
fn run(
    _config_path: &Path,
    _manifest: Option<&Path>,
    _dry_run: bool,
    _preview_dir: Option<&Path>,
    _threads: Option<usize>,
) -> Result<()> {
    anyhow::bail!("fire-calc was built without the `geotiff` feature; scenes cannot be read")
}
