//! Run an external rRNA predictor on every genome of a batch, resuming where a previous run stopped.

use crate::cli::Verbosity;
use crate::merge::{self, CopyPolicy};
use crate::utils::{self, FailurePolicy, GenomeStatus, Status};
use clap::Parser;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// File name of the predicted feature sequences.
pub const SEQUENCE_OUTPUT: &str = "output_rrna.fna";
/// File name of the predicted feature annotations.
pub const ANNOTATION_OUTPUT: &str = "output_rrna.gff";

// ----------------------------------------------------------------------------
// Predictor
// ----------------------------------------------------------------------------

/// The two files a predictor writes for one genome.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PredictionOutputPair {
    /// Fasta of predicted features.
    pub sequence: PathBuf,
    /// Annotation of predicted features.
    pub annotation: PathBuf,
}

impl PredictionOutputPair {
    pub fn new<P>(output_dir: &P) -> Self
    where
        P: AsRef<Path>,
    {
        PredictionOutputPair {
            sequence: output_dir.as_ref().join(SEQUENCE_OUTPUT),
            annotation: output_dir.as_ref().join(ANNOTATION_OUTPUT),
        }
    }

    /// Delete whichever of the two files exist.
    pub fn remove(&self) -> Result<(), Report> {
        for path in [&self.sequence, &self.annotation] {
            if path.exists() {
                std::fs::remove_file(path).wrap_err_with(|| format!("Failed to remove: {path:?}"))?;
            }
        }
        Ok(())
    }
}

/// An external program that predicts features of a genome sequence.
pub trait Predictor {
    /// Predict features of `sequence`, writing both files of `outputs`.
    fn predict(&self, sequence: &Path, outputs: &PredictionOutputPair) -> Result<(), Report>;
}

/// The [barrnap](https://github.com/tseemann/barrnap) rRNA predictor.
///
/// The genome is piped to stdin, the annotation is captured from stdout and
/// the predicted sequences are written with `--outseq`. Diagnostics on
/// stderr are discarded.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Barrnap {
    pub program: String,
    pub kingdom: String,
    pub threads: usize,
}

impl Default for Barrnap {
    fn default() -> Self {
        Barrnap { program: "barrnap".to_string(), kingdom: "bac".to_string(), threads: 20 }
    }
}

impl From<&Args> for Barrnap {
    fn from(args: &Args) -> Self {
        Barrnap { program: args.program.clone(), kingdom: args.kingdom.clone(), threads: args.threads }
    }
}

impl Predictor for Barrnap {
    fn predict(&self, sequence: &Path, outputs: &PredictionOutputPair) -> Result<(), Report> {
        let stdin = File::open(sequence).wrap_err_with(|| format!("Failed to read genome: {sequence:?}"))?;
        let stdout = File::create(&outputs.annotation)
            .wrap_err_with(|| format!("Unable to create file: {:?}", outputs.annotation))?;

        debug!("Running {} on {sequence:?}", self.program);
        let threads = self.threads.to_string();
        let status = Command::new(&self.program)
            .args(["--kingdom", self.kingdom.as_str(), "--threads", threads.as_str()])
            .arg("--outseq")
            .arg(&outputs.sequence)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::null())
            .status()
            .wrap_err_with(|| format!("Failed to run predictor: {}", self.program))
            .suggestion(format!("Is {} installed and on the PATH?", self.program))?;

        if !status.success() {
            return Err(eyre!("{} exited with {status} on {sequence:?}", self.program));
        }
        Ok(())
    }
}

/// Predict the features of one genome sequence into `output_dir`, creating it if needed.
pub fn predict<P, Q>(predictor: &impl Predictor, sequence: &P, output_dir: &Q) -> Result<PredictionOutputPair, Report>
where
    P: AsRef<Path> + Debug,
    Q: AsRef<Path> + Debug,
{
    std::fs::create_dir_all(output_dir)
        .wrap_err_with(|| format!("Failed to create directory: {output_dir:?}"))?;
    let outputs = PredictionOutputPair::new(output_dir);
    predictor.predict(sequence.as_ref(), &outputs)?;
    Ok(outputs)
}

/// Returns true if a genome's output directory already holds exactly two files.
pub fn is_complete<P>(output_dir: &P) -> Result<bool, Report>
where
    P: AsRef<Path> + Debug,
{
    Ok(utils::list_files(output_dir)?.len() == 2)
}

// ----------------------------------------------------------------------------
// Batch
// ----------------------------------------------------------------------------

/// Predict rRNA genes of every genome, then optionally merge the 16S records.
#[derive(Clone, Debug, Deserialize, Parser, Serialize)]
#[clap(name = "strainset-predict", author, version)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    /// Genome directory, with one subdirectory of sequences per accession.
    #[clap(short = 'g', long, required = true)]
    pub genomes: PathBuf,

    /// Output directory, one subdirectory per accession is created.
    #[clap(short = 'o', long, required = true)]
    pub output_dir: PathBuf,

    /// Accession list, the first column is used.
    ///
    /// If provided, only these genomes are predicted and their records are
    /// merged afterwards. Otherwise every subdirectory of the genome directory
    /// is predicted.
    #[clap(short = 'l', long)]
    pub accessions: Option<PathBuf>,

    /// Extension of genome sequence files.
    #[clap(short = 'e', long, default_value_t = Args::default().extension)]
    pub extension: String,

    /// Predictor program.
    #[clap(long, default_value_t = Args::default().program)]
    pub program: String,

    /// Predictor kingdom.
    #[clap(short = 'k', long, default_value_t = Args::default().kingdom)]
    pub kingdom: String,

    /// Number of predictor threads.
    #[clap(short = 't', long, default_value_t = Args::default().threads)]
    pub threads: usize,

    /// Prefix of the record names to merge.
    #[clap(short = 'm', long, default_value_t = Args::default().marker)]
    pub marker: String,

    /// Which marker records of each genome are merged.
    #[clap(short = 'c', long, value_enum, default_value_t = CopyPolicy::default())]
    pub copies: CopyPolicy,

    /// What to do when a genome's sequence is missing or its prediction fails.
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
        let barrnap = Barrnap::default();
        let merge = merge::Args::default();
        Args {
            genomes: PathBuf::new(),
            output_dir: PathBuf::new(),
            accessions: None,
            extension: "fna".to_string(),
            program: barrnap.program,
            kingdom: barrnap.kingdom,
            threads: barrnap.threads,
            marker: merge.marker,
            copies: merge.copies,
            on_missing: FailurePolicy::Skip,
            report: None,
            verbosity: Verbosity::default(),
        }
    }
}

impl Args {
    /// Reads [`Args`] from a JSON file.
    pub fn read<P>(path: &P) -> Result<Args, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let input = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read predictor arguments: {path:?}."))?;
        let args = serde_json::from_str(&input)
            .wrap_err_with(|| format!("Failed to deserialize predictor arguments: {input}"))?;
        Ok(args)
    }

    /// Write [`Args`] to a JSON file.
    pub fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        utils::create_parent_dir(path)?;
        let output = serde_json::to_string_pretty(self)
            .wrap_err(format!("Failed to serialize predictor arguments: {self:?}"))?;
        std::fs::write(path, output)
            .wrap_err(format!("Failed to write predictor arguments: {path:?}"))?;
        Ok(())
    }
}

/// Predict every genome with barrnap.
pub fn run(args: &Args) -> Result<Vec<GenomeStatus>, Report> {
    predict_all(&Barrnap::from(args), args)
}

/// Predict every genome, skipping genomes whose outputs are already complete.
///
/// Run parameters are written to `predict_args.json` in the output directory.
/// When an accession list is given, the marker records are merged into
/// `all_16S.fasta` afterwards.
pub fn predict_all(predictor: &impl Predictor, args: &Args) -> Result<Vec<GenomeStatus>, Report> {
    args.write(&args.output_dir.join("predict_args.json"))?;

    let accessions = match &args.accessions {
        Some(path) => utils::read_accessions(path)?,
        None => utils::list_dirs(&args.genomes)?
            .iter()
            .filter_map(|dir| dir.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .collect(),
    };
    info!("Predicting {} genomes: {:?}", accessions.len(), args.genomes);

    let mut statuses = Vec::new();
    for accession in &accessions {
        statuses.push(predict_genome(predictor, accession, args)?);
    }

    let count = |status: Status| statuses.iter().filter(|s| s.status == status).count();
    info!(
        "Predicted {} genomes, {} already complete, {} failed.",
        count(Status::Completed),
        count(Status::AlreadyComplete),
        statuses.len() - count(Status::Completed) - count(Status::AlreadyComplete),
    );
    if let Some(report) = &args.report {
        utils::write_status_report(&statuses, report)?;
    }

    if let Some(accessions) = &args.accessions {
        let merge_args = merge::Args {
            output_dir: args.output_dir.clone(),
            accessions: accessions.clone(),
            marker: args.marker.clone(),
            copies: args.copies,
            on_missing: args.on_missing,
            ..Default::default()
        };
        let (merged, merge_statuses) = merge::merge(&merge_args)?;
        let unmerged = merge_statuses.iter().filter(|s| s.status != Status::Completed).count();
        if unmerged > 0 {
            warn!("{unmerged} genomes have no merged {} record: {merged:?}", args.marker);
        }
    }

    Ok(statuses)
}

/// Predict one genome, unless its outputs are already complete.
pub fn predict_genome(predictor: &impl Predictor, accession: &str, args: &Args) -> Result<GenomeStatus, Report> {
    let output_dir = args.output_dir.join(accession);
    if is_complete(&output_dir)? {
        debug!("Skipping complete genome {accession}: {output_dir:?}");
        return Ok(GenomeStatus::new(accession, Status::AlreadyComplete, ""));
    }

    let genome_dir = args.genomes.join(accession);
    let Some(sequence) = utils::find_file(&genome_dir, &args.extension)? else {
        let detail = format!("No .{} file in {genome_dir:?}", args.extension);
        return GenomeStatus::failed(accession, Status::MissingSequence, detail, args.on_missing);
    };

    match predict(predictor, &sequence, &output_dir) {
        Ok(_) => {
            debug!("Predicted genome {accession}: {output_dir:?}");
            Ok(GenomeStatus::new(accession, Status::Completed, ""))
        }
        Err(e) => {
            // partial outputs would count as complete on the next run
            PredictionOutputPair::new(&output_dir).remove()?;
            GenomeStatus::failed(accession, Status::Failed, e, args.on_missing)
        }
    }
}
