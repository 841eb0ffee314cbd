//! Logging and error-report setup shared by the command-line tools.

use clap::ValueEnum;
use color_eyre::eyre::{Report, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

// -----------------------------------------------------------------------------
// Verbosity
// -----------------------------------------------------------------------------

/// The output verbosity level.
#[derive(Clone, Debug, Default, Deserialize, Serialize, ValueEnum)]
pub enum Verbosity {
    #[default]
    Info,
    Warn,
    Debug,
    Error,
}

impl Display for Verbosity {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        // Convert to lowercase for RUST_LOG env var compatibility
        let lowercase = format!("{:?}", self).to_lowercase();
        write!(f, "{lowercase}")
    }
}

/// Install colorized error reports and initialize logging at `verbosity`.
pub fn init(verbosity: &Verbosity) -> Result<(), Report> {
    // initialize color_eyre crate for colorized logs
    color_eyre::install()?;

    // Set logging/verbosity level via RUST_LOG
    std::env::set_var("RUST_LOG", verbosity.to_string());

    // initialize env_logger crate for logging/verbosity level
    env_logger::init();

    Ok(())
}
