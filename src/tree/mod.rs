//! Post-process inferred trees: reroot at the longest branch, or binarize a clade.

use crate::cli::Verbosity;
use clap::Parser;
use color_eyre::eyre::{Report, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strainset_phylo::Phylogeny;

/// Root a tree on its longest branch.
#[derive(Clone, Debug, Default, Deserialize, Parser, Serialize)]
#[clap(name = "strainset-root", author, version)]
#[clap(verbatim_doc_comment)]
pub struct RootArgs {
    /// Input tree (newick), ex. an IQ-TREE `.treefile`.
    #[clap(short = 't', long, required = true)]
    pub tree: PathBuf,

    /// Output tree, defaults to `<tree>_rooted.newick`.
    #[clap(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Set the output verbosity level.
    #[clap(short = 'v', long, value_enum, default_value_t = Verbosity::default())]
    #[serde(skip)]
    pub verbosity: Verbosity,
}

/// Resolve the polytomies of a tree's clade into bifurcations.
#[derive(Clone, Debug, Default, Deserialize, Parser, Serialize)]
#[clap(name = "strainset-binarize", author, version)]
#[clap(verbatim_doc_comment)]
pub struct BinarizeArgs {
    /// Input tree (newick), ex. an IQ-TREE `.fa.treefile`.
    #[clap(short = 't', long, required = true)]
    pub tree: PathBuf,

    /// Label of the node whose clade is binarized.
    #[clap(short = 'n', long, required = true)]
    pub node: String,

    /// Output tree, defaults to `<tree>_binarized.newick`.
    #[clap(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Set the output verbosity level.
    #[clap(short = 'v', long, value_enum, default_value_t = Verbosity::default())]
    #[serde(skip)]
    pub verbosity: Verbosity,
}

/// Returns the path of a post-processed tree, next to its input.
///
/// The first of `suffixes` that ends the file name is replaced by
/// `_<label>.newick`, otherwise the label is appended.
///
/// ```rust
/// use strainset::tree::derive_output;
/// use std::path::PathBuf;
/// let rooted = derive_output(&PathBuf::from("trees/16S.treefile"), &[".treefile"], "rooted");
/// assert_eq!(rooted, PathBuf::from("trees/16S_rooted.newick"));
/// let binarized = derive_output(&PathBuf::from("16S.fa.treefile"), &[".fa.treefile", ".treefile"], "binarized");
/// assert_eq!(binarized, PathBuf::from("16S_binarized.newick"));
/// ```
pub fn derive_output(tree: &Path, suffixes: &[&str], label: &str) -> PathBuf {
    let name = tree.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let stem = suffixes
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(&name);
    tree.with_file_name(format!("{stem}_{label}.newick"))
}

/// Root the first tree of a file at its longest branch and write it.
pub fn root(args: &RootArgs) -> Result<PathBuf, Report> {
    let mut phylogeny = Phylogeny::read(&args.tree)?;
    if let Some(outgroup) = phylogeny.root_at_longest_branch()? {
        info!("Rooted tree on the branch to {outgroup:?}");
    }

    let output = match &args.output {
        Some(output) => output.clone(),
        None => derive_output(&args.tree, &[".treefile"], "rooted"),
    };
    crate::utils::create_parent_dir(&output)?;
    phylogeny.write(&output)?;
    info!("Wrote rooted tree: {output:?}");
    Ok(output)
}

/// Binarize the clade of a node in the first tree of a file and write it.
pub fn binarize(args: &BinarizeArgs) -> Result<PathBuf, Report> {
    let mut phylogeny = Phylogeny::read(&args.tree)?;
    let resolved = phylogeny.binarize(&args.node)?;
    info!("Resolved {resolved} polytomies below node {:?}", args.node);

    let output = match &args.output {
        Some(output) => output.clone(),
        None => derive_output(&args.tree, &[".fa.treefile", ".treefile"], "binarized"),
    };
    crate::utils::create_parent_dir(&output)?;
    phylogeny.write(&output)?;
    info!("Wrote binarized tree: {output:?}");
    Ok(output)
}
