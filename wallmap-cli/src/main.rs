//! Wallmap CLI - Command-line interface
//!
//! Renders wall and TV maps from YAML configurations and prepares the
//! geodata they use.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::bounds::BoundsArgs;
use commands::cache::CacheAction;
use commands::communities::CommunitiesArgs;
use commands::download::DownloadArgs;
use commands::generate::GenerateArgs;
use commands::process::ProcessArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "wallmap")]
#[command(version = wallmap::VERSION)]
#[command(about = "Static wall and TV map generation from open geodata", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to ~/.wallmap/config.ini)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a map configuration to PNG
    Generate(GenerateArgs),

    /// Manage the basemap tile cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Download the source datasets into the data directory
    Download(DownloadArgs),

    /// Create Spanish autonomous communities from provinces
    Communities(CommunitiesArgs),

    /// Extract mainland Spanish provinces
    Provinces,

    /// Process regions and the Asturias/Gijón detail layers
    Process(ProcessArgs),

    /// Analyze Spain's extents and print recommended map bounds
    Bounds(BoundsArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Generate(_) => "generate",
            Commands::Cache { .. } => "cache",
            Commands::Download(_) => "download",
            Commands::Communities(_) => "communities",
            Commands::Provinces => "provinces",
            Commands::Process(_) => "process",
            Commands::Bounds(_) => "bounds",
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let runner = CliRunner::new(cli.settings.as_deref(), cli.verbose)?;
    runner.log_startup(cli.command.name());

    match cli.command {
        Commands::Generate(args) => commands::generate::run(&runner, args),
        Commands::Cache { action } => commands::cache::run(&runner, action),
        Commands::Download(args) => commands::download::run(&runner, args),
        Commands::Communities(args) => commands::communities::run(&runner, args),
        Commands::Provinces => commands::provinces::run(&runner),
        Commands::Process(args) => commands::process::run(&runner, args),
        Commands::Bounds(args) => commands::bounds::run(&runner, args),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}
