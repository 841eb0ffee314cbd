//! Write the input manifest of a whole-genome aligner: a guide tree followed by one genome path per accession.

use crate::cli::Verbosity;
use crate::utils::{self, FailurePolicy, GenomeStatus, Status};
use clap::Parser;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use strainset_phylo::{FromNewick, Phylogeny};

/// Generate a Cactus input file from a genome selection and a guide tree.
#[derive(Clone, Debug, Deserialize, Parser, Serialize)]
#[clap(name = "strainset-manifest", author, version)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    /// Accession list, the first column is used.
    #[clap(short = 'a', long, required = true)]
    pub accessions: PathBuf,

    /// Guide tree (newick), only the first line is used.
    #[clap(short = 'n', long, required = true)]
    pub tree: PathBuf,

    /// Genome directory, with one subdirectory of sequences per accession.
    #[clap(short = 'g', long, required = true)]
    pub genomes: PathBuf,

    /// Output manifest.
    #[clap(short = 'o', long, default_value = "cactus_input.txt")]
    pub output: PathBuf,

    /// Extension of genome sequence files.
    #[clap(short = 'e', long, default_value_t = Args::default().extension)]
    pub extension: String,

    /// What to do when a genome's sequence is missing.
    #[clap(long, value_enum, default_value_t = FailurePolicy::Skip)]
    pub on_missing: FailurePolicy,

    /// Set the output verbosity level.
    #[clap(short = 'v', long, value_enum, default_value_t = Verbosity::default())]
    #[serde(skip)]
    pub verbosity: Verbosity,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            accessions: PathBuf::new(),
            tree: PathBuf::new(),
            genomes: PathBuf::new(),
            output: PathBuf::from("cactus_input.txt"),
            extension: "fna".to_string(),
            on_missing: FailurePolicy::Skip,
            verbosity: Verbosity::default(),
        }
    }
}

/// Read the first line of a tree file, checking that it is a valid newick tree.
pub fn read_guide_tree<P>(path: &P) -> Result<(String, Phylogeny), Report>
where
    P: AsRef<Path> + Debug,
{
    let file = File::open(path).wrap_err_with(|| format!("Failed to read guide tree: {path:?}"))?;
    let line = BufReader::new(file)
        .lines()
        .next()
        .transpose()
        .wrap_err_with(|| format!("Failed to read guide tree: {path:?}"))?
        .ok_or_else(|| eyre!("Guide tree is empty: {path:?}"))?;
    let line = line.trim().to_string();

    let phylogeny = Phylogeny::from_newick(&line)
        .wrap_err_with(|| format!("Guide tree is not a valid newick tree: {path:?}"))
        .suggestion("The tree must be written on a single line.")?;
    Ok((line, phylogeny))
}

/// Write the manifest, returning the number of genomes left out.
///
/// Genomes without a sequence file are omitted under [`FailurePolicy::Skip`],
/// so a non-zero count means the manifest is incomplete.
pub fn generate(args: &Args) -> Result<usize, Report> {
    let (newick, phylogeny) = read_guide_tree(&args.tree)?;
    let accessions = utils::read_accessions(&args.accessions)?;

    let leaves: HashSet<&str> = phylogeny.get_leaves().into_iter().collect();
    accessions
        .iter()
        .filter(|a| !leaves.contains(a.as_str()))
        .for_each(|a| warn!("Genome {a} is not a leaf of the guide tree: {:?}", args.tree));

    let mut rows = Vec::new();
    let mut statuses = Vec::new();
    for accession in &accessions {
        let genome_dir = args.genomes.join(accession);
        match utils::find_file(&genome_dir, &args.extension)? {
            Some(path) => rows.push((accession, path)),
            None => {
                let detail = format!("Genome not found: no .{} file in {genome_dir:?}", args.extension);
                statuses.push(GenomeStatus::failed(accession, Status::MissingSequence, detail, args.on_missing)?);
            }
        }
    }

    utils::create_parent_dir(&args.output)?;
    let file = File::create(&args.output)
        .wrap_err_with(|| format!("Unable to create file: {:?}", args.output))?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{newick}")?;
    for (accession, path) in &rows {
        writeln!(writer, "{accession}\t{}", path.display())?;
    }
    writer.flush()?;

    let omitted = statuses.len();
    info!("Wrote {}/{} genomes to manifest: {:?}", rows.len(), accessions.len(), args.output);
    if omitted > 0 {
        let missing = statuses.iter().map(|s| s.accession.as_str()).join(", ");
        warn!("Manifest is incomplete, {omitted} genomes were omitted: {missing}");
    }
    Ok(omitted)
}
