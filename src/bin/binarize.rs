use clap::Parser;
use color_eyre::eyre::{Report, Result};
use strainset::tree::BinarizeArgs;

fn main() -> Result<(), Report> {
    // Parse CLI parameters
    let args = BinarizeArgs::parse();

    // initialize colorized error reports and logging
    strainset::cli::init(&args.verbosity)?;

    strainset::tree::binarize(&args)?;

    Ok(())
}
