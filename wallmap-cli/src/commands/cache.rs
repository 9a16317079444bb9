//! Tile cache management CLI commands.

use std::path::PathBuf;

use clap::Subcommand;
use wallmap::cache::{CacheInfo, TileCache};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show the number of cached tiles and their size
    Info {
        /// Cache directory (defaults to the configured one)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Remove every cached tile
    Clear {
        /// Cache directory (defaults to the configured one)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

/// Run a cache subcommand.
pub fn run(runner: &CliRunner, action: CacheAction) -> Result<(), CliError> {
    match action {
        CacheAction::Info { cache_dir } => show_info(&runner.tile_cache(cache_dir.as_deref())),
        CacheAction::Clear { cache_dir } => clear(&runner.tile_cache(cache_dir.as_deref())),
    }
}

/// Print cache statistics.
pub fn show_info(cache: &TileCache) -> Result<(), CliError> {
    let info = cache.info()?;
    println!("Tile cache: {}", cache.root().display());
    match info {
        CacheInfo::Populated { files, .. } => {
            println!("  Files: {}", files);
            println!("  Size:  {:.2} MB", info.megabytes());
        }
        other => println!("  {}", other),
    }
    Ok(())
}

/// Empty the cache and report what was removed.
pub fn clear(cache: &TileCache) -> Result<(), CliError> {
    println!("Clearing tile cache at: {}", cache.root().display());
    let removed = cache.clear()?;
    match removed {
        CacheInfo::Populated { files, .. } => {
            println!("Deleted {} files, freed {:.2} MB", files, removed.megabytes())
        }
        _ => println!("Nothing to delete"),
    }
    Ok(())
}
