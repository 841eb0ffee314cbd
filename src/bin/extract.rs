use clap::Parser;
use color_eyre::eyre::{Report, Result};
use strainset::extract::Args;

fn main() -> Result<(), Report> {
    // Parse CLI parameters
    let args = Args::parse();

    // initialize colorized error reports and logging
    strainset::cli::init(&args.verbosity)?;

    strainset::extract::extract_all(&args)?;

    Ok(())
}
