//! Generate command - render a map configuration to PNG.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use tracing::info;
use wallmap::config::MapConfig;
use wallmap::render::{BasemapStatus, GenerationReport, MapGenerator};

use super::cache;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the generate command.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Path to the YAML map configuration
    #[arg(short, long, required_unless_present_any = ["cache_info", "clear_cache"])]
    pub config: Option<PathBuf>,

    /// Output PNG path (defaults to <output_dir>/<name>.png)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print tile cache statistics
    #[arg(long)]
    pub cache_info: bool,

    /// Clear the tile cache before rendering
    #[arg(long)]
    pub clear_cache: bool,

    /// Tile cache directory (defaults to the configured one)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

/// Run the generate command.
///
/// Cache flags are handled first; without `--config` the command stops there.
pub fn run(runner: &CliRunner, args: GenerateArgs) -> Result<(), CliError> {
    let tile_cache = runner.tile_cache(args.cache_dir.as_deref());

    if args.clear_cache {
        cache::clear(&tile_cache)?;
    }
    if args.cache_info {
        cache::show_info(&tile_cache)?;
    }

    let Some(config_path) = args.config else {
        if args.cache_info || args.clear_cache {
            return Ok(());
        }
        return Err(CliError::Usage(
            "--config is required unless only cache flags are given".to_string(),
        ));
    };

    let config = MapConfig::load(&config_path)?;
    info!(config = %config_path.display(), name = %config.name, "Loaded map configuration");

    let settings = runner.settings();
    let output = args
        .output
        .unwrap_or_else(|| settings.paths.output_dir.join(format!("{}.png", config.name)));

    println!("Generating map '{}'", config.name);
    let start = Instant::now();

    let generator = MapGenerator::new(
        config,
        &settings.paths.data_dir,
        output,
        tile_cache,
        runner.http_client()?,
    );
    let report = generator.generate()?;

    print_report(&report);
    println!("Done in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn print_report(report: &GenerationReport) {
    println!(
        "Saved {} ({}x{} px)",
        report.output.display(),
        report.width,
        report.height
    );
    println!(
        "  Layers: {} loaded, {} drawn",
        report.layers_loaded.len(),
        report.layers_drawn
    );
    if !report.layers_skipped.is_empty() {
        println!("  Skipped: {}", report.layers_skipped.join(", "));
    }
    println!("  Labels: {}", report.labels_drawn);
    match &report.basemap {
        BasemapStatus::NotConfigured => {}
        BasemapStatus::Drawn(basemap) => println!(
            "  Basemap: {} at zoom {} ({} tiles, {} from cache)",
            basemap.provider, basemap.zoom, basemap.tiles, basemap.cache_hits
        ),
        BasemapStatus::Failed(reason) => println!("  Basemap: skipped ({})", reason),
    }
}
