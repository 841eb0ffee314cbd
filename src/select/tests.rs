use crate::catalog::{self, GenomeRecord};
use crate::select::{self, Args};
use color_eyre::eyre::{Report, Result};
use indoc::indoc;
use itertools::Itertools;
use rand::{rngs::StdRng, SeedableRng};
use std::fs;

fn records(n: usize) -> Result<Vec<GenomeRecord>, Report> {
    (0..n).map(|i| GenomeRecord::new(&format!("GCA_{i:09}.1"), &format!("strain {i}"), i as u64)).collect()
}

#[test]
fn full_sample_is_a_permutation() -> Result<(), Report> {
    let input = records(20)?;
    let mut rng = StdRng::seed_from_u64(7);
    let observed = select::sample(input.clone(), input.len(), &mut rng)?;

    assert_eq!(observed.len(), input.len());
    assert!(observed.iter().map(|r| r.accession.as_str()).all_unique());
    let mut sorted = observed.clone();
    sorted.sort_by(|a, b| a.accession.cmp(&b.accession));
    assert_eq!(sorted, input);
    Ok(())
}

#[test]
fn same_seed_same_selection() -> Result<(), Report> {
    let input = records(20)?;
    let first = select::sample(input.clone(), 5, &mut StdRng::seed_from_u64(1234))?;
    let second = select::sample(input, 5, &mut StdRng::seed_from_u64(1234))?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn oversized_request_writes_nothing() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("selection.tsv");
    let result = select::select(records(3)?, 4, &output, &mut StdRng::seed_from_u64(0));

    assert!(result.is_err());
    assert!(!output.exists());
    Ok(())
}

#[test]
fn selection_is_written_as_tsv() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("selection.tsv");
    let input = vec![GenomeRecord::new("GCF_000008025.1", "Wolbachia endosymbiont of Drosophila melanogaster", 163164)?];
    select::select(input, 1, &output, &mut StdRng::seed_from_u64(0))?;

    let observed = fs::read_to_string(&output)?;
    assert_eq!(observed, "GCF_000008025.1\t163164\tWolbachia endosymbiont of Drosophila melanogaster\n");
    Ok(())
}

#[test]
fn catalog_to_selection() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let catalog = dir.path().join("catalog.jsonl");
    fs::write(
        &catalog,
        indoc! {r#"
            {"accession":"GCA_1.1","organism":{"organismName":"A","taxId":1}}
            {"accession":"GCA_2.1","organism":{"organismName":"A","taxId":1}}
            {"accession":"GCA_3.1","organism":{"organismName":"A","taxId":1}}
            {"accession":"GCA_4.1","organism":{"organismName":"B","taxId":2}}
        "#},
    )?;

    let filtered = catalog::filter(&catalog, 2)?;
    assert_eq!(filtered.records.len(), 3);

    let args = Args {
        catalog,
        number: 2,
        output: dir.path().join("out").join("selection.tsv"),
        seed: Some(99),
        ..Default::default()
    };
    let selection = select::run(&args)?;
    assert_eq!(selection.len(), 2);
    assert!(selection.iter().all(|r| filtered.records.contains(r)));
    assert!(selection.iter().map(|r| r.accession.as_str()).all_unique());
    assert_eq!(fs::read_to_string(&args.output)?.lines().count(), 2);
    Ok(())
}

#[test]
fn organism_name_is_written_verbatim() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("selection.tsv");
    let input = vec![GenomeRecord::new("GCA_1.1", "Wolbachia sp. \"wAna\"", 1)?];
    select::select(input, 1, &output, &mut StdRng::seed_from_u64(0))?;

    assert_eq!(fs::read_to_string(&output)?, "GCA_1.1\t1\tWolbachia sp. \"wAna\"\n");
    Ok(())
}
