//! Randomly sample the filtered catalog and persist the final genome selection.

use crate::catalog::{self, GenomeRecord};
use crate::cli::Verbosity;
use crate::utils;
use clap::Parser;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Select a diverse, non-redundant set of genomes from an ncbi-datasets catalog.
#[derive(Clone, Debug, Deserialize, Parser, Serialize)]
#[clap(name = "strainset-select", author, version)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    /// Genome catalog, one JSON record per line.
    #[clap(short = 'f', long, required = true)]
    pub catalog: PathBuf,

    /// Number of genomes to select.
    #[clap(short = 'n', long, required = true)]
    pub number: usize,

    /// Output TSV: accession, taxId, organismName.
    #[clap(short = 'o', long, required = true)]
    pub output: PathBuf,

    /// Maximum number of genomes per strain.
    #[clap(short = 'm', long, default_value_t = Args::default().max_per_strain)]
    pub max_per_strain: usize,

    /// Random seed, for a reproducible selection.
    ///
    /// If not provided, the selection is seeded from system entropy.
    #[clap(short = 's', long)]
    pub seed: Option<u64>,

    /// Set the output verbosity level.
    #[clap(short = 'v', long, value_enum, default_value_t = Verbosity::default())]
    #[serde(skip)]
    pub verbosity: Verbosity,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            catalog: PathBuf::new(),
            number: 0,
            output: PathBuf::new(),
            max_per_strain: catalog::MAX_PER_STRAIN,
            seed: None,
            verbosity: Verbosity::default(),
        }
    }
}

/// Filter the catalog, then sample and write the selection.
pub fn run(args: &Args) -> Result<Vec<GenomeRecord>, Report> {
    let filtered = catalog::filter(&args.catalog, args.max_per_strain)?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    select(filtered.records, args.number, &args.output, &mut rng)
}

/// Shuffle the genomes and keep the first `n`.
///
/// Fails without touching the genomes if `n` exceeds their number.
///
/// ```rust
/// use rand::{rngs::StdRng, SeedableRng};
/// use strainset::{catalog::GenomeRecord, select};
/// let records = vec![
///     GenomeRecord::new("GCA_1.1", "wMel", 163164)?,
///     GenomeRecord::new("GCA_2.1", "wRi", 66084)?,
///     GenomeRecord::new("GCA_3.1", "wPip", 955)?,
/// ];
/// let mut rng = StdRng::seed_from_u64(42);
/// assert_eq!(select::sample(records.clone(), 2, &mut rng)?.len(), 2);
/// assert!(select::sample(records, 4, &mut rng).is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn sample<R>(mut records: Vec<GenomeRecord>, n: usize, rng: &mut R) -> Result<Vec<GenomeRecord>, Report>
where
    R: Rng + ?Sized,
{
    if n > records.len() {
        return Err(eyre!(
            "Requested {n} genomes, but only {} passed the catalog filter.",
            records.len()
        )
        .suggestion("Lower --number, or raise --max-per-strain to keep more genomes per strain."));
    }

    records.shuffle(rng);
    records.truncate(n);
    Ok(records)
}

/// Sample `n` genomes and write them to `output` as `accession<TAB>taxId<TAB>organismName`.
pub fn select<P, R>(
    records: Vec<GenomeRecord>,
    n: usize,
    output: &P,
    rng: &mut R,
) -> Result<Vec<GenomeRecord>, Report>
where
    P: AsRef<Path> + Debug,
    R: Rng + ?Sized,
{
    let selection = sample(records, n, rng)?;
    write(&selection, output)?;
    info!("Selected {} genomes: {output:?}", selection.len());
    Ok(selection)
}

/// Write a genome selection as headerless TSV.
pub fn write<P>(selection: &[GenomeRecord], output: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    utils::create_parent_dir(output)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .has_headers(false)
        .from_path(output)
        .wrap_err_with(|| format!("Unable to create file: {output:?}"))?;

    for record in selection {
        writer
            .write_record([
                record.accession.as_str(),
                record.tax_id.to_string().as_str(),
                record.organism_name.as_str(),
            ])
            .wrap_err_with(|| format!("Unable to write selection: {output:?}"))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests;
