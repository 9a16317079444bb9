//! Provinces command - extract mainland Spanish provinces.

use wallmap::prepare::run_provinces;

use crate::error::CliError;
use crate::runner::CliRunner;

pub fn run(runner: &CliRunner) -> Result<(), CliError> {
    let summary = run_provinces(&runner.data_paths())?;

    println!(
        "Created {} ({:.1} KB) from {} ({:.1} MB)",
        summary.output.display(),
        summary.output_bytes as f64 / 1024.0,
        summary.input.display(),
        summary.input_bytes as f64 / 1_048_576.0
    );
    println!("Mainland provinces: {}", summary.provinces.len());
    for name in &summary.provinces {
        println!("  - {}", name);
    }
    Ok(())
}
