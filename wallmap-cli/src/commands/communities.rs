//! Communities command - dissolve provinces into autonomous communities.

use clap::Args;
use wallmap::prepare::run_communities;

use crate::error::CliError;
use crate::runner::CliRunner;

#[derive(Debug, Args)]
pub struct CommunitiesArgs {
    /// Also write a mainland-only file (no Canary Islands, Ceuta or Melilla)
    #[arg(long)]
    pub mainland_only: bool,
}

pub fn run(runner: &CliRunner, args: CommunitiesArgs) -> Result<(), CliError> {
    let summary = run_communities(&runner.data_paths(), args.mainland_only)?;

    println!("{}", summary);
    if !summary.excluded.is_empty() {
        println!();
        println!("Excluded from mainland: {}", summary.excluded.join(", "));
    }
    Ok(())
}
