use clap::Parser;
use color_eyre::eyre::{Report, Result};
use strainset::manifest::Args;

fn main() -> Result<(), Report> {
    // Parse CLI parameters
    let args = Args::parse();

    // initialize colorized error reports and logging
    strainset::cli::init(&args.verbosity)?;

    strainset::manifest::generate(&args)?;

    Ok(())
}
