//! Process command - regions and the Asturias/Gijón detail layers.

use clap::Args;
use wallmap::prepare::{run_process, ProcessOptions};

use crate::error::CliError;
use crate::runner::CliRunner;

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Run every processing step
    #[arg(long)]
    pub all: bool,

    /// Spanish regions with local names
    #[arg(long)]
    pub regions: bool,

    /// Provinces (see the provinces command)
    #[arg(long)]
    pub provinces: bool,

    /// Asturias municipalities
    #[arg(long)]
    pub asturias: bool,

    /// Gijón districts
    #[arg(long)]
    pub gijon: bool,
}

impl From<ProcessArgs> for ProcessOptions {
    fn from(args: ProcessArgs) -> Self {
        ProcessOptions {
            all: args.all,
            regions: args.regions,
            provinces: args.provinces,
            asturias: args.asturias,
            gijon: args.gijon,
        }
    }
}

pub fn run(runner: &CliRunner, args: ProcessArgs) -> Result<(), CliError> {
    let options = ProcessOptions::from(args);
    if options.is_empty() {
        println!("Nothing to do. Use --all or select steps, see `wallmap process --help`.");
    }

    let summary = run_process(&runner.data_paths(), options)?;
    for path in &summary.written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
