//! Merge per-genome predictor outputs into one fasta, relabeled by accession.

use crate::cli::Verbosity;
use crate::utils::{self, FailurePolicy, GenomeStatus, Status};
use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Report, Result, WrapErr};
use itertools::Itertools;
use log::{debug, info, warn};
use noodles::fasta;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Which marker records of a genome are merged.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, ValueEnum)]
pub enum CopyPolicy {
    /// The first marker record, in file order.
    #[default]
    First,
    /// Every marker record, numbered `<accession>_1..k` when there is more than one.
    All,
    /// The longest marker record, the first wins ties.
    Longest,
}

/// Merge per-genome predicted sequences into a single fasta.
#[derive(Clone, Debug, Deserialize, Parser, Serialize)]
#[clap(name = "strainset-merge", author, version)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    /// Predictor output directory, with one subdirectory per accession.
    #[clap(short = 'd', long, required = true)]
    pub output_dir: PathBuf,

    /// Accession list, the first column is used.
    #[clap(short = 'l', long, required = true)]
    pub accessions: PathBuf,

    /// Extension of predicted sequence files.
    #[clap(short = 'e', long, default_value_t = Args::default().extension)]
    pub extension: String,

    /// Prefix of the record names to merge.
    #[clap(short = 'm', long, default_value_t = Args::default().marker)]
    pub marker: String,

    /// Which marker records of each genome are merged.
    #[clap(short = 'c', long, value_enum, default_value_t = CopyPolicy::default())]
    pub copies: CopyPolicy,

    /// File name of the merged fasta, written inside the output directory.
    #[clap(short = 'n', long, default_value_t = Args::default().name)]
    pub name: String,

    /// What to do when a genome's predictor output is missing.
    #[clap(long, value_enum, default_value_t = FailurePolicy::Abort)]
    pub on_missing: FailurePolicy,

    /// Optional per-genome status report (TSV).
    #[clap(short = 'r', long)]
    pub report: Option<PathBuf>,

    /// Set the output verbosity level.
    #[clap(short = 'v', long, value_enum, default_value_t = Verbosity::default())]
    #[serde(skip)]
    pub verbosity: Verbosity,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            output_dir: PathBuf::new(),
            accessions: PathBuf::new(),
            extension: "fna".to_string(),
            marker: "16S".to_string(),
            copies: CopyPolicy::default(),
            name: "all_16S.fasta".to_string(),
            on_missing: FailurePolicy::Abort,
            report: None,
            verbosity: Verbosity::default(),
        }
    }
}

/// Read the sequences of the records whose name starts with `marker`.
///
/// With [`CopyPolicy::First`] the file is only read up to the first match.
pub fn marker_records<P>(path: &P, marker: &str, copies: CopyPolicy) -> Result<Vec<Vec<u8>>, Report>
where
    P: AsRef<Path> + Debug,
{
    let mut reader = File::open(path)
        .map(BufReader::new)
        .map(fasta::Reader::new)
        .wrap_err_with(|| format!("Failed to read predicted sequences: {path:?}"))?;

    let mut matches = reader.records().filter_map_ok(|record| {
        record
            .name()
            .starts_with(marker)
            .then(|| record.sequence().as_ref().to_vec())
    });

    let sequences = match copies {
        CopyPolicy::First => matches.next().transpose()?.into_iter().collect_vec(),
        CopyPolicy::All => matches.collect::<Result<Vec<_>, _>>()?,
        CopyPolicy::Longest => {
            let mut longest: Option<Vec<u8>> = None;
            for sequence in matches {
                let sequence = sequence?;
                if longest.as_ref().map_or(true, |l| sequence.len() > l.len()) {
                    longest = Some(sequence);
                }
            }
            longest.into_iter().collect_vec()
        }
    };

    Ok(sequences)
}

/// Merge the marker records of every listed genome.
///
/// Genomes are merged in accession list order. Each record is relabeled with
/// its accession and its sequence written on a single line. The merged file
/// is only created once every genome has been read, so an aborted merge
/// leaves no partial output.
///
/// Returns the merged fasta path and a status per genome.
pub fn merge(args: &Args) -> Result<(PathBuf, Vec<GenomeStatus>), Report> {
    let accessions = utils::read_accessions(&args.accessions)?;
    info!("Merging {} records of {} genomes.", args.marker, accessions.len());

    let mut statuses = Vec::new();
    let mut merged = Vec::new();
    for accession in &accessions {
        let (status, sequences) = merge_genome(accession, args)?;
        statuses.push(status);
        if !sequences.is_empty() {
            merged.push((accession.as_str(), sequences));
        }
    }

    let path = args.output_dir.join(&args.name);
    utils::create_parent_dir(&path)?;
    let file = File::create(&path).wrap_err_with(|| format!("Unable to create file: {path:?}"))?;
    let mut writer = BufWriter::new(file);
    for (accession, sequences) in &merged {
        let numbered = sequences.len() > 1;
        for (i, sequence) in sequences.iter().enumerate() {
            match numbered {
                true => writeln!(writer, ">{accession}_{}", i + 1)?,
                false => writeln!(writer, ">{accession}")?,
            }
            writer.write_all(sequence)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;

    info!("Merged {}/{} genomes: {path:?}", merged.len(), accessions.len());
    if let Some(report) = &args.report {
        utils::write_status_report(&statuses, report)?;
    }

    Ok((path, statuses))
}

fn merge_genome(accession: &str, args: &Args) -> Result<(GenomeStatus, Vec<Vec<u8>>), Report> {
    let genome_dir = args.output_dir.join(accession);
    if !genome_dir.is_dir() {
        let detail = format!("Output directory does not exist: {genome_dir:?}");
        return Ok((GenomeStatus::failed(accession, Status::MissingOutput, detail, args.on_missing)?, Vec::new()));
    }
    let Some(path) = utils::find_file(&genome_dir, &args.extension)? else {
        let detail = format!("No .{} file in {genome_dir:?}", args.extension);
        return Ok((GenomeStatus::failed(accession, Status::MissingOutput, detail, args.on_missing)?, Vec::new()));
    };

    let sequences = marker_records(&path, &args.marker, args.copies)?;
    if sequences.is_empty() {
        warn!("No {} record for genome {accession}: {path:?}", args.marker);
        let detail = format!("No {} record in {path:?}", args.marker);
        return Ok((GenomeStatus::new(accession, Status::NoMatch, detail), sequences));
    }

    debug!("Merging {} {} record(s) of {accession}", sequences.len(), args.marker);
    Ok((GenomeStatus::new(accession, Status::Completed, ""), sequences))
}

#[cfg(test)]
mod tests;
