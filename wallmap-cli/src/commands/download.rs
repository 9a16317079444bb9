//! Download command - fetch the source datasets.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use clap::Args;
use wallmap::prepare::{run_download, DownloadOptions, HttpDownloader, ProgressCallback};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the download command.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Skip the large OpenStreetMap extracts
    #[arg(long)]
    pub skip_osm: bool,

    /// Only download Spain-specific data (skips Natural Earth)
    #[arg(long)]
    pub spain_only: bool,
}

/// Prints a percentage line per 10% step, or per 10 MB when the size is unknown.
fn progress_printer() -> ProgressCallback {
    let last_step = AtomicU64::new(u64::MAX);
    Box::new(move |downloaded, total| {
        let step = if total > 0 {
            downloaded * 10 / total
        } else {
            downloaded / (10 * 1024 * 1024)
        };
        if last_step.swap(step, Ordering::Relaxed) == step {
            return;
        }
        if total > 0 {
            print!("\r  {:>3}% of {:.1} MB", step * 10, total as f64 / 1_048_576.0);
        } else {
            print!("\r  {:.1} MB", downloaded as f64 / 1_048_576.0);
        }
        if total > 0 && downloaded >= total {
            println!();
        }
        let _ = io::stdout().flush();
    })
}

/// Run the download command.
pub fn run(runner: &CliRunner, args: DownloadArgs) -> Result<(), CliError> {
    let paths = runner.data_paths();
    let downloader = HttpDownloader::new(runner.http_client()?);
    let options = DownloadOptions {
        skip_osm: args.skip_osm,
        spain_only: args.spain_only,
    };

    println!("Downloading datasets into {}", paths.raw().display());
    let summary = run_download(&paths, &downloader, options, &progress_printer())?;

    println!();
    println!("Downloaded: {}", summary.downloaded.len());
    for name in &summary.downloaded {
        println!("  {}", name);
    }
    if !summary.skipped.is_empty() {
        println!("Already present: {}", summary.skipped.len());
    }
    if !summary.failed.is_empty() {
        println!("Failed (optional): {}", summary.failed.join(", "));
    }
    for path in &summary.placeholders {
        println!("Wrote placeholder {}", path.display());
    }
    Ok(())
}
