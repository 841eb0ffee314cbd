use crate::catalog::{self, Accession, GenomeRecord};
use color_eyre::eyre::{Report, Result};
use indoc::indoc;
use itertools::Itertools;
use std::fs;

const CATALOG: &str = indoc! {r#"
    {"accession":"GCA_000008025.1","organism":{"organismName":"wMel","taxId":163164},"assemblyInfo":{"assemblyLevel":"Complete Genome"}}
    {"accession":"GCF_000008025.1","organism":{"organismName":"wMel","taxId":163164}}
    {"accession":"GCA_000022285.1","organism":{"organismName":"wMel","taxId":163164}}
    {"accession":"GCA_000376585.1","organism":{"organismName":"wMel","taxId":163164}}

    {"accession":"GCA_000953315.1","organism":{"organismName":"wRi","taxId":66084}}
"#};

#[test]
fn accession_twin_swaps_prefix() -> Result<(), Report> {
    let gca: Accession = "GCA_000953315.1".parse()?;
    assert_eq!(gca.prefix(), Some("GCA"));
    assert_eq!(gca.twin().map(|a| a.to_string()), Some("GCF_000953315.1".to_string()));

    let other: Accession = "ASM1234v1".parse()?;
    assert_eq!(other.key(), "ASM1234v1");
    assert_eq!(other.twin(), None);
    Ok(())
}

#[test]
fn filter_catalog_dedups_and_caps() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("catalog.jsonl");
    fs::write(&path, CATALOG)?;

    let filtered = catalog::filter(&path, catalog::MAX_PER_STRAIN)?;
    let observed = filtered.records.iter().map(|r| r.accession.as_str()).collect_vec();
    assert_eq!(observed, ["GCA_000008025.1", "GCA_000022285.1", "GCA_000953315.1"]);

    // the RefSeq twin is not counted, the capped genome is
    assert_eq!(filtered.strain_counts["wMel"], 3);
    assert_eq!(filtered.strain_counts["wRi"], 1);
    assert_eq!(filtered.seen.len(), 4);
    Ok(())
}

#[test]
fn filter_invariants_hold() -> Result<(), Report> {
    let records = (0..50)
        .map(|i| GenomeRecord::new(&format!("GC{}_{:09}.1", ["A", "F"][i % 2], i / 3), &format!("strain_{}", i % 7), i as u64))
        .collect::<Result<Vec<_>, Report>>()?;
    let filtered = catalog::filter_records(records.clone(), 2);

    // no assembly twice
    assert!(filtered.records.iter().map(|r| r.accession.key()).all_unique());
    // no strain more than twice
    let counts = filtered.records.iter().counts_by(|r| r.organism_name.as_str());
    assert!(counts.values().all(|c| *c <= 2));
    // output keeps catalog order
    let positions = filtered
        .records
        .iter()
        .map(|r| records.iter().position(|o| o == r))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default();
    assert_eq!(positions.len(), filtered.records.len());
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    Ok(())
}

#[test]
fn singleton_strain_is_always_kept() -> Result<(), Report> {
    let records = vec![
        GenomeRecord::new("GCA_1.1", "wPip", 1)?,
        GenomeRecord::new("GCA_2.1", "wPip", 1)?,
        GenomeRecord::new("GCA_3.1", "wPip", 1)?,
        GenomeRecord::new("GCA_4.1", "wAlbB", 2)?,
    ];
    let filtered = catalog::filter_records(records, 2);
    assert!(filtered.records.iter().any(|r| r.organism_name == "wAlbB"));
    Ok(())
}

#[test]
fn record_missing_tax_id_aborts() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("catalog.jsonl");
    fs::write(&path, "{\"accession\":\"GCA_1.1\",\"organism\":{\"organismName\":\"wMel\"}}\n")?;

    let result = catalog::filter(&path, 2);
    assert!(result.is_err());
    let message = format!("{:?}", result.err().unwrap_or_else(|| color_eyre::eyre::eyre!("")));
    assert!(message.contains("line 1"));
    Ok(())
}
