//! Bounds command - print extents and recommended map bounds for Spain.

use clap::Args;
use wallmap::prepare::analyze_spain;

use crate::error::CliError;
use crate::runner::CliRunner;

#[derive(Debug, Args)]
pub struct BoundsArgs {
    /// Restrict the analysis to mainland Spain and print config bounds
    #[arg(long)]
    pub mainland_only: bool,
}

pub fn run(runner: &CliRunner, args: BoundsArgs) -> Result<(), CliError> {
    let analysis = analyze_spain(&runner.data_paths(), args.mainland_only)?;
    println!("{}", analysis);
    Ok(())
}
