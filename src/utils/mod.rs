//! Shared helpers for locating per-genome files and reporting per-genome outcomes.

use clap::ValueEnum;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use strum::Display;
use walkdir::WalkDir;

// ----------------------------------------------------------------------------
// Failure Policy
// ----------------------------------------------------------------------------

/// What a batch step does when one genome's inputs are missing.
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize, ValueEnum)]
#[strum(serialize_all = "kebab-case")]
pub enum FailurePolicy {
    /// Log the genome, record it in the status report and continue.
    #[default]
    Skip,
    /// Stop the whole batch with an error.
    Abort,
}

// ----------------------------------------------------------------------------
// Genome Status
// ----------------------------------------------------------------------------

/// Outcome of one genome in a batch step.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[strum(serialize_all = "snake_case")]
pub enum Status {
    Completed,
    AlreadyComplete,
    MissingSequence,
    MissingAnnotation,
    MissingOutput,
    NoMatch,
    Failed,
}

/// One row of a batch status report.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GenomeStatus {
    pub accession: String,
    pub status: Status,
    pub detail: String,
}

impl GenomeStatus {
    pub fn new(accession: &str, status: Status, detail: impl ToString) -> Self {
        GenomeStatus { accession: accession.to_string(), status, detail: detail.to_string() }
    }

    /// Apply a [`FailurePolicy`] to a genome that could not be processed.
    ///
    /// With [`FailurePolicy::Skip`] the status is logged and returned, with
    /// [`FailurePolicy::Abort`] it becomes an error.
    pub fn failed(
        accession: &str,
        status: Status,
        detail: impl ToString,
        policy: FailurePolicy,
    ) -> Result<Self, Report> {
        let status = GenomeStatus::new(accession, status, detail);
        match policy {
            FailurePolicy::Skip => {
                log::error!("Skipping genome {accession}: {}", status.detail);
                Ok(status)
            }
            FailurePolicy::Abort => Err(eyre!("Genome {accession} failed: {}", status.detail)
                .suggestion("Use --on-missing skip to continue past incomplete genomes.")),
        }
    }
}

/// Write a batch status report as TSV: `accession`, `status`, `detail`.
pub fn write_status_report<P>(statuses: &[GenomeStatus], path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    create_parent_dir(path)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_path(path)
        .wrap_err_with(|| format!("Unable to create status report: {path:?}"))?;
    writer.write_record(["accession", "status", "detail"])?;
    for status in statuses {
        writer
            .write_record([
                status.accession.as_str(),
                status.status.to_string().as_str(),
                status.detail.as_str(),
            ])
            .wrap_err_with(|| format!("Unable to write status report: {path:?}"))?;
    }
    writer.flush()?;
    Ok(())
}

// ----------------------------------------------------------------------------
// Files
// ----------------------------------------------------------------------------

/// Returns the files directly inside `dir`, in lexical order.
///
/// A missing directory has no files.
pub fn list_files<P>(dir: &P) -> Result<Vec<PathBuf>, Report>
where
    P: AsRef<Path> + Debug,
{
    list_entries(dir, |p| p.is_file())
}

/// Returns the subdirectories directly inside `dir`, in lexical order.
pub fn list_dirs<P>(dir: &P) -> Result<Vec<PathBuf>, Report>
where
    P: AsRef<Path> + Debug,
{
    if !dir.as_ref().is_dir() {
        return Err(eyre!("Directory does not exist: {dir:?}"));
    }
    list_entries(dir, |p| p.is_dir())
}

fn list_entries<P, F>(dir: &P, keep: F) -> Result<Vec<PathBuf>, Report>
where
    P: AsRef<Path> + Debug,
    F: Fn(&Path) -> bool,
{
    if !dir.as_ref().is_dir() {
        return Ok(Vec::new());
    }
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| -> Result<PathBuf, Report> {
            let entry = entry.wrap_err_with(|| format!("Failed to read directory: {dir:?}"))?;
            Ok(entry.into_path())
        })
        .filter_ok(|path| keep(path))
        .collect()
}

/// Returns the first file in `dir` (lexical order) with the given extension.
///
/// When more than one file matches, the first wins and a warning is logged.
pub fn find_file<P>(dir: &P, extension: &str) -> Result<Option<PathBuf>, Report>
where
    P: AsRef<Path> + Debug,
{
    let matches = list_files(dir)?
        .into_iter()
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(extension))
        .collect_vec();

    if matches.len() > 1 {
        warn!(
            "Found {} .{extension} files in {dir:?}, using the first: {:?}",
            matches.len(),
            matches[0]
        );
    }
    Ok(matches.into_iter().next())
}

/// Read accessions from a whitespace-delimited text file.
///
/// The first token of each non-empty line is the accession, so the
/// selection TSV can be used directly.
///
/// ## Examples
///
/// ```rust
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("selection.tsv");
/// std::fs::write(&path, "GCF_000008025.1\t163164\twMel\n\nGCA_000376585.1 1236908\n")?;
/// let accessions = strainset::utils::read_accessions(&path)?;
/// assert_eq!(accessions, ["GCF_000008025.1", "GCA_000376585.1"]);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn read_accessions<P>(path: &P) -> Result<Vec<String>, Report>
where
    P: AsRef<Path> + Debug,
{
    let file = File::open(path).wrap_err_with(|| format!("Failed to read accessions: {path:?}"))?;
    let mut accessions = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.wrap_err_with(|| format!("Failed to read line of {path:?}"))?;
        if let Some(accession) = line.split_whitespace().next() {
            accessions.push(accession.to_string());
        }
    }
    Ok(accessions)
}

/// Create the parent directory of a file path, if needed.
pub fn create_parent_dir<P>(path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directory: {parent:?}"))?;
        }
    }
    Ok(())
}
