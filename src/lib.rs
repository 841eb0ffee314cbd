//! `strainset` prepares a diverse, non-redundant set of bacterial genomes for comparative genomics.
//!
//! The pipeline tools each cover one step:
//!
//! 1. `strainset-select`: filter an [ncbi-datasets](https://www.ncbi.nlm.nih.gov/datasets/) genome
//!    catalog down to unique assemblies, at most two per strain, and randomly sample it.
//! 1. `strainset-extract`: slice an annotated gene out of every selected genome.
//! 1. `strainset-predict`: predict rRNA genes of every genome with `barrnap`, resuming interrupted runs.
//! 1. `strainset-merge`: merge the predicted 16S records into one fasta, labelled by accession.
//! 1. `strainset-manifest`: join the selection with a guide tree for whole-genome alignment.
//! 1. `strainset-root` and `strainset-binarize`: post-process inferred trees.

pub mod catalog;
pub mod cli;
pub mod extract;
pub mod manifest;
pub mod merge;
pub mod predict;
pub mod select;
pub mod tree;
pub mod utils;
