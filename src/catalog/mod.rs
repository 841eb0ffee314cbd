//! Filter a genome metadata catalog down to a deduplicated, diversity-capped candidate list.

use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Display, Formatter};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

/// Default maximum number of genomes kept per strain.
pub const MAX_PER_STRAIN: usize = 2;

// ----------------------------------------------------------------------------
// Accession
// ----------------------------------------------------------------------------

/// An assembly accession, such as `GCF_000008025.1`.
///
/// The same physical assembly is often published twice, under a GenBank
/// (`GCA_`) and a RefSeq (`GCF_`) prefix. [`Accession::key`] strips the
/// prefix so both variants compare equal.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Accession(String);

impl Display for Accession {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self, Report> {
        let s = s.trim();
        if s.is_empty() {
            return Err(eyre!("Accession is empty."));
        }
        Ok(Accession(s.to_string()))
    }
}

impl Accession {
    /// Returns the full accession string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the source-repository prefix (ex. `GCF`), if there is one.
    pub fn prefix(&self) -> Option<&str> {
        self.0.split_once('_').map(|(prefix, _)| prefix)
    }

    /// Returns the accession without its source-repository prefix.
    ///
    /// ```rust
    /// use strainset::catalog::Accession;
    /// let gcf: Accession = "GCF_000008025.1".parse()?;
    /// let gca: Accession = "GCA_000008025.1".parse()?;
    /// assert_eq!(gcf.key(), "000008025.1");
    /// assert_eq!(gcf.key(), gca.key());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn key(&self) -> &str {
        self.0.split_once('_').map(|(_, key)| key).unwrap_or(&self.0)
    }

    /// Returns the same assembly under the other source repository (`GCA_` <-> `GCF_`).
    pub fn twin(&self) -> Option<Accession> {
        let prefix = match self.prefix()? {
            "GCA" => "GCF",
            "GCF" => "GCA",
            _ => return None,
        };
        Some(Accession(format!("{prefix}_{}", self.key())))
    }
}

// ----------------------------------------------------------------------------
// Genome Record
// ----------------------------------------------------------------------------

/// Raw catalog line, as written by `ncbi-datasets` (extra fields are ignored).
#[derive(Debug, Deserialize)]
struct CatalogLine {
    accession: Accession,
    organism: Organism,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Organism {
    organism_name: String,
    tax_id: u64,
}

/// One genome of the catalog.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GenomeRecord {
    pub accession: Accession,
    /// Organism name, genomes sharing a name belong to the same strain.
    pub organism_name: String,
    pub tax_id: u64,
}

impl GenomeRecord {
    pub fn new(accession: &str, organism_name: &str, tax_id: u64) -> Result<Self, Report> {
        Ok(GenomeRecord {
            accession: accession.parse()?,
            organism_name: organism_name.to_string(),
            tax_id,
        })
    }

    /// Parse one JSON line of the catalog.
    ///
    /// ```rust
    /// use strainset::catalog::GenomeRecord;
    /// let line = r#"{"accession":"GCF_000008025.1","organism":{"organismName":"Wolbachia endosymbiont of Drosophila melanogaster","taxId":163164}}"#;
    /// let record = GenomeRecord::from_json(line)?;
    /// assert_eq!(record.accession.key(), "000008025.1");
    /// assert_eq!(record.tax_id, 163164);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn from_json(line: &str) -> Result<Self, Report> {
        let raw: CatalogLine = serde_json::from_str(line)
            .wrap_err("Catalog record is missing accession, organism.organismName or organism.taxId.")?;
        Ok(GenomeRecord {
            accession: raw.accession,
            organism_name: raw.organism.organism_name,
            tax_id: raw.organism.tax_id,
        })
    }
}

// ----------------------------------------------------------------------------
// Filter
// ----------------------------------------------------------------------------

/// Result of filtering a catalog, with the state that produced it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filtered {
    /// Retained genomes, in catalog order.
    pub records: Vec<GenomeRecord>,
    /// Occurrences of each strain among unique accessions, including genomes beyond the cap.
    pub strain_counts: HashMap<String, usize>,
    /// Accession keys seen so far.
    pub seen: HashSet<String>,
}

impl Filtered {
    pub fn new() -> Self {
        Filtered::default()
    }

    /// Consider one genome, keeping it if its assembly is new and its strain is under the cap.
    ///
    /// Returns true if the genome was kept.
    pub fn push(&mut self, record: GenomeRecord, max_per_strain: usize) -> bool {
        if !self.seen.insert(record.accession.key().to_string()) {
            debug!("Skipping duplicate assembly: {}", record.accession);
            return false;
        }

        let count = self.strain_counts.entry(record.organism_name.clone()).or_insert(0);
        let keep = *count < max_per_strain;
        *count += 1;

        if keep {
            self.records.push(record);
        }
        keep
    }
}

/// Filter genomes, dropping repeated assemblies and capping genomes per strain.
///
/// ```rust
/// use strainset::catalog::{self, GenomeRecord};
/// let records = [
///     GenomeRecord::new("GCA_1.1", "wMel", 163164)?,
///     GenomeRecord::new("GCF_1.1", "wMel", 163164)?,
///     GenomeRecord::new("GCA_2.1", "wMel", 163164)?,
///     GenomeRecord::new("GCA_3.1", "wMel", 163164)?,
///     GenomeRecord::new("GCA_4.1", "wRi", 66084)?,
/// ];
/// let filtered = catalog::filter_records(records, 2);
/// let kept: Vec<_> = filtered.records.iter().map(|r| r.accession.as_str()).collect();
/// assert_eq!(kept, ["GCA_1.1", "GCA_2.1", "GCA_4.1"]);
/// assert_eq!(filtered.strain_counts["wMel"], 3);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn filter_records<I>(records: I, max_per_strain: usize) -> Filtered
where
    I: IntoIterator<Item = GenomeRecord>,
{
    let mut filtered = Filtered::new();
    records.into_iter().for_each(|record| {
        filtered.push(record, max_per_strain);
    });
    filtered
}

/// Stream a newline-delimited JSON catalog and filter its genomes.
///
/// Blank lines are ignored. Any other line that cannot be parsed aborts the
/// whole run.
pub fn filter<P>(path: &P, max_per_strain: usize) -> Result<Filtered, Report>
where
    P: AsRef<Path> + Debug,
{
    info!("Filtering catalog: {path:?}");
    let file = File::open(path).wrap_err_with(|| format!("Failed to read catalog: {path:?}"))?;

    let mut filtered = Filtered::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.wrap_err_with(|| format!("Failed to read line {} of {path:?}", i + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = GenomeRecord::from_json(&line)
            .wrap_err_with(|| format!("Malformed catalog record on line {} of {path:?}", i + 1))
            .suggestion("Was the catalog written with `datasets summary genome ... --as-json-lines`?")?;
        filtered.push(record, max_per_strain);
    }

    info!(
        "Kept {} genomes from {} unique assemblies of {} strains.",
        filtered.records.len(),
        filtered.seen.len(),
        filtered.strain_counts.len()
    );
    Ok(filtered)
}

#[cfg(test)]
mod tests;
