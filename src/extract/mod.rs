//! Locate a named gene in a genome's annotation and slice it out of the genome sequence.

use crate::catalog::Accession;
use crate::cli::Verbosity;
use crate::utils::{self, FailurePolicy, GenomeStatus, Status};
use clap::{Parser, ValueEnum};
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::{debug, info, warn};
use noodles::{core::Position, fasta};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

// ----------------------------------------------------------------------------
// Gene Matching
// ----------------------------------------------------------------------------

/// How a gene name is compared with the name attribute of an annotation record.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, ValueEnum)]
pub enum MatchStrategy {
    /// The gene name occurs anywhere in the attribute (ex. `rrs` matches `rrsA`).
    #[default]
    Substring,
    /// The attribute, or one of its comma-separated values, equals the gene name.
    Exact,
    /// The gene name is a regular expression searched for in the attribute.
    Regex,
}

/// A gene name compiled with its [`MatchStrategy`].
#[derive(Clone, Debug)]
pub struct GeneMatcher {
    pub name: String,
    pub strategy: MatchStrategy,
    regex: Option<Regex>,
}

impl GeneMatcher {
    pub fn new(name: &str, strategy: MatchStrategy) -> Result<Self, Report> {
        let regex = match strategy {
            MatchStrategy::Regex => Some(
                Regex::new(name)
                    .wrap_err_with(|| format!("Invalid gene name regex: {name:?}"))?,
            ),
            _ => None,
        };
        Ok(GeneMatcher { name: name.to_string(), strategy, regex })
    }

    /// Returns true if the annotation's name attribute matches this gene.
    ///
    /// ```rust
    /// use strainset::extract::{GeneMatcher, MatchStrategy};
    /// let loose = GeneMatcher::new("rrs", MatchStrategy::Substring)?;
    /// assert!(loose.is_match("rrsA"));
    /// let exact = GeneMatcher::new("rrs", MatchStrategy::Exact)?;
    /// assert!(!exact.is_match("rrsA"));
    /// let regex = GeneMatcher::new("^rrs[A-H]?$", MatchStrategy::Regex)?;
    /// assert!(regex.is_match("rrsB"));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn is_match(&self, attribute: &str) -> bool {
        match (&self.strategy, &self.regex) {
            (MatchStrategy::Regex, Some(regex)) => regex.is_match(attribute),
            (MatchStrategy::Exact, _) => attribute.split(',').any(|value| value == self.name),
            _ => attribute.contains(&self.name),
        }
    }
}

// ----------------------------------------------------------------------------
// Gene Interval
// ----------------------------------------------------------------------------

/// Genomic interval of an annotated gene, 1-based and inclusive.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GeneInterval {
    pub contig: String,
    pub start: usize,
    pub end: usize,
}

impl Display for GeneInterval {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.contig, self.start, self.end)
    }
}

impl GeneInterval {
    /// Returns the bases of this interval from a contig record.
    pub fn slice(&self, record: &fasta::Record) -> Result<Vec<u8>, Report> {
        let start = Position::try_from(self.start)
            .wrap_err_with(|| format!("Invalid start coordinate in {self}"))?;
        let end = Position::try_from(self.end)
            .wrap_err_with(|| format!("Invalid end coordinate in {self}"))?;
        let bases = record.sequence().get(start..=end).ok_or_else(|| {
            eyre!("Interval {self} is outside contig of length {}", record.sequence().len())
        })?;
        Ok(bases.to_vec())
    }
}

/// Returns the gene name attribute of a GFF attribute column.
///
/// The `Name` attribute is preferred. Without one, the value of the second
/// attribute is used, which is where NCBI annotations keep the gene name.
///
/// ```rust
/// use strainset::extract::gene_name;
/// assert_eq!(gene_name("ID=gene-WD_RS00005;Name=rrs;gbkey=Gene"), Some("rrs"));
/// assert_eq!(gene_name("ID=gene-1;locus=rrl;gbkey=Gene"), Some("rrl"));
/// assert_eq!(gene_name("ID=gene-1"), None);
/// ```
pub fn gene_name(attributes: &str) -> Option<&str> {
    let pairs = attributes
        .trim()
        .split(';')
        .filter(|a| !a.is_empty())
        .filter_map(|a| a.split_once('='))
        .collect_vec();
    pairs
        .iter()
        .find(|(key, _)| *key == "Name")
        .or_else(|| pairs.get(1))
        .map(|(_, value)| *value)
}

/// Scan an annotation file for `gene` records matching `matcher`.
///
/// Intervals are returned in file order. Comment lines are skipped and an
/// embedded `##FASTA` section ends the scan. A record with fewer than 9
/// columns or unparsable coordinates aborts the scan.
pub fn locate_gene<P>(annotation: &P, matcher: &GeneMatcher) -> Result<Vec<GeneInterval>, Report>
where
    P: AsRef<Path> + Debug,
{
    let file = File::open(annotation)
        .wrap_err_with(|| format!("Failed to read annotation: {annotation:?}"))?;

    let mut intervals = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.wrap_err_with(|| format!("Failed to read line {} of {annotation:?}", i + 1))?;
        if line.starts_with("##FASTA") {
            break;
        }
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        let fields = line.split('\t').collect_vec();
        if fields.len() < 9 {
            return Err(eyre!(
                "Annotation record on line {} of {annotation:?} has {} columns, expected 9.",
                i + 1,
                fields.len()
            )
            .suggestion("Is this a tab-delimited GFF file?"));
        }
        if fields[2] != "gene" || !gene_name(fields[8]).is_some_and(|name| matcher.is_match(name)) {
            continue;
        }

        let coordinate = |field: &str| {
            field.parse::<usize>().wrap_err_with(|| {
                format!("Invalid coordinate {field:?} on line {} of {annotation:?}", i + 1)
            })
        };
        let interval = GeneInterval {
            contig: fields[0].to_string(),
            start: coordinate(fields[3])?,
            end: coordinate(fields[4])?,
        };
        debug!("Found {} at {interval}", matcher.name);
        intervals.push(interval);
    }

    Ok(intervals)
}

/// Read all records of a FASTA file, keyed by record name.
pub fn read_sequences<P>(path: &P) -> Result<HashMap<String, fasta::Record>, Report>
where
    P: AsRef<Path> + Debug,
{
    let mut reader = File::open(path)
        .map(BufReader::new)
        .map(fasta::Reader::new)
        .wrap_err_with(|| format!("Failed to read sequences: {path:?}"))?;

    reader
        .records()
        .map(|record| -> Result<(String, fasta::Record), Report> {
            let record = record.wrap_err_with(|| format!("Failed to parse fasta record: {path:?}"))?;
            Ok((record.name().to_string(), record))
        })
        .collect()
}

/// Extract the sequence of a gene from a genome.
///
/// Contigs are visited in the order they first appear in the annotation;
/// the first one present in the sequence file supplies its first matching
/// interval. Returns [`None`] if no matching interval lies on a known contig.
pub fn extract_gene<P, Q>(sequence: &P, annotation: &Q, matcher: &GeneMatcher) -> Result<Option<Vec<u8>>, Report>
where
    P: AsRef<Path> + Debug,
    Q: AsRef<Path> + Debug,
{
    let sequences = read_sequences(sequence)?;
    let intervals = locate_gene(annotation, matcher)?;

    let contigs = intervals.iter().map(|i| i.contig.as_str()).unique();
    for contig in contigs {
        let Some(record) = sequences.get(contig) else {
            debug!("Contig {contig} is not in {sequence:?}");
            continue;
        };
        if let Some(interval) = intervals.iter().find(|i| i.contig == contig) {
            return interval.slice(record).map(Some);
        }
    }

    Ok(None)
}

// ----------------------------------------------------------------------------
// Batch Extraction
// ----------------------------------------------------------------------------

/// Extract a named gene from every genome of an accession list.
#[derive(Clone, Debug, Deserialize, Parser, Serialize)]
#[clap(name = "strainset-extract", author, version)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    /// Genome directory, with one subdirectory of sequences per accession.
    #[clap(short = 'g', long, required = true)]
    pub genomes: PathBuf,

    /// Annotation directory, with one subdirectory of annotations per accession.
    #[clap(short = 'f', long, required = true)]
    pub annotations: PathBuf,

    /// Gene name to extract (ex. rrs).
    #[clap(short = 'i', long, required = true)]
    pub gene: String,

    /// How the gene name is compared with annotation names.
    #[clap(long, value_enum, default_value_t = MatchStrategy::default())]
    pub strategy: MatchStrategy,

    /// Accession list, the first column is used.
    #[clap(short = 'l', long, required = true)]
    pub accessions: PathBuf,

    /// Output fasta of extracted genes.
    #[clap(short = 'o', long, required = true)]
    pub output: PathBuf,

    /// Extension of genome sequence files.
    #[clap(long, default_value_t = Args::default().sequence_extension)]
    pub sequence_extension: String,

    /// Extension of annotation files.
    #[clap(long, default_value_t = Args::default().annotation_extension)]
    pub annotation_extension: String,

    /// What to do when a genome's sequence or annotation is missing.
    #[clap(long, value_enum, default_value_t = FailurePolicy::Skip)]
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
            genomes: PathBuf::new(),
            annotations: PathBuf::new(),
            gene: String::new(),
            strategy: MatchStrategy::default(),
            accessions: PathBuf::new(),
            output: PathBuf::new(),
            sequence_extension: "fna".to_string(),
            annotation_extension: "gff".to_string(),
            on_missing: FailurePolicy::Skip,
            report: None,
            verbosity: Verbosity::default(),
        }
    }
}

/// Extract the gene from each listed genome into one fasta, headers are accessions.
pub fn extract_all(args: &Args) -> Result<Vec<GenomeStatus>, Report> {
    let matcher = GeneMatcher::new(&args.gene, args.strategy)?;
    let accessions = utils::read_accessions(&args.accessions)?;
    info!("Extracting {} from {} genomes.", args.gene, accessions.len());

    utils::create_parent_dir(&args.output)?;
    let file = File::create(&args.output)
        .wrap_err_with(|| format!("Unable to create file: {:?}", args.output))?;
    let mut writer = BufWriter::new(file);

    let mut statuses = Vec::new();
    for accession in &accessions {
        let (status, bases) = extract_genome(accession, args, &matcher)?;
        if let Some(bases) = bases {
            writeln!(writer, ">{accession}")?;
            writer.write_all(&bases)?;
            writeln!(writer)?;
        }
        statuses.push(status);
    }
    writer.flush()?;

    let extracted = statuses.iter().filter(|s| s.status == Status::Completed).count();
    info!("Extracted {extracted}/{} genes: {:?}", accessions.len(), args.output);
    if let Some(report) = &args.report {
        utils::write_status_report(&statuses, report)?;
    }

    Ok(statuses)
}

/// Find the files of one genome and extract its gene.
fn extract_genome(
    accession: &str,
    args: &Args,
    matcher: &GeneMatcher,
) -> Result<(GenomeStatus, Option<Vec<u8>>), Report> {
    let genome_dir = args.genomes.join(accession);
    let Some(sequence) = utils::find_file(&genome_dir, &args.sequence_extension)? else {
        let detail = format!("No .{} file in {genome_dir:?}", args.sequence_extension);
        return Ok((GenomeStatus::failed(accession, Status::MissingSequence, detail, args.on_missing)?, None));
    };

    let Some(annotation) = find_annotation(accession, args)? else {
        let detail = format!("No .{} file for {accession} in {:?}", args.annotation_extension, args.annotations);
        return Ok((GenomeStatus::failed(accession, Status::MissingAnnotation, detail, args.on_missing)?, None));
    };

    match extract_gene(&sequence, &annotation, matcher)? {
        Some(bases) => Ok((GenomeStatus::new(accession, Status::Completed, ""), Some(bases))),
        None => {
            warn!("Gene {} was not found in genome {accession}", matcher.name);
            Ok((GenomeStatus::new(accession, Status::NoMatch, format!("{} not found", matcher.name)), None))
        }
    }
}

/// Annotation of a genome, falling back to the directory of its GenBank/RefSeq twin.
fn find_annotation(accession: &str, args: &Args) -> Result<Option<PathBuf>, Report> {
    let accession: Accession = accession.parse()?;
    let candidates = std::iter::once(accession.clone()).chain(accession.twin());
    for candidate in candidates {
        let dir = args.annotations.join(candidate.as_str());
        if let Some(path) = utils::find_file(&dir, &args.annotation_extension)? {
            if candidate != accession {
                debug!("Using annotation of {candidate} for {accession}");
            }
            return Ok(Some(path));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests;
