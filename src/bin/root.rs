use clap::Parser;
use color_eyre::eyre::{Report, Result};
use strainset::tree::RootArgs;

fn main() -> Result<(), Report> {
    // Parse CLI parameters
    let args = RootArgs::parse();

    // initialize colorized error reports and logging
    strainset::cli::init(&args.verbosity)?;

    strainset::tree::root(&args)?;

    Ok(())
}
