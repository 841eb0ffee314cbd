use crate::merge::{self, Args, CopyPolicy};
use crate::utils::{FailurePolicy, Status};
use color_eyre::eyre::{Report, Result};
use indoc::indoc;
use itertools::Itertools;
use std::fs;
use std::path::Path;

const PREDICTED: &str = indoc! {"
    >23S_rRNA::NZ_CP042444.1:100-2900(+)
    GGGGGGGG
    >16S_rRNA::NZ_CP042444.1:3000-4500(+)
    ACGTAC
    >5S_rRNA::NZ_CP042444.1:5000-5110(+)
    TTTT
    >16S_rRNA::NZ_CP042444.1:9000-10600(-)
    ACGTACGTAA
"};

fn write_output(dir: &Path, accession: &str, text: &str) -> Result<(), Report> {
    fs::create_dir_all(dir.join(accession))?;
    fs::write(dir.join(accession).join("output_rrna.fna"), text)?;
    fs::write(dir.join(accession).join("output_rrna.gff"), "##gff-version 3\n")?;
    Ok(())
}

fn args(dir: &Path, accessions: &[&str]) -> Result<Args, Report> {
    let list = dir.join("accessions.txt");
    fs::write(&list, accessions.iter().map(|a| format!("{a}\t1234\tWolbachia\n")).join(""))?;
    Ok(Args { output_dir: dir.to_path_buf(), accessions: list, ..Default::default() })
}

#[test]
fn merge_two_genomes_in_list_order() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    write_output(dir.path(), "GCF_000000001.1", PREDICTED)?;
    write_output(dir.path(), "GCA_000000002.1", ">16S_rRNA::chr:1-5(+)\nCCCCC\n")?;

    let args = args(dir.path(), &["GCA_000000002.1", "GCF_000000001.1"])?;
    let (path, statuses) = merge::merge(&args)?;

    assert_eq!(path, dir.path().join("all_16S.fasta"));
    let expected = indoc! {"
        >GCA_000000002.1
        CCCCC
        >GCF_000000001.1
        ACGTAC
    "};
    assert_eq!(fs::read_to_string(&path)?, expected);
    assert!(statuses.iter().all(|s| s.status == Status::Completed));
    Ok(())
}

#[test]
fn copy_policies() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("output_rrna.fna");
    fs::write(&path, PREDICTED)?;

    let first = merge::marker_records(&path, "16S", CopyPolicy::First)?;
    assert_eq!(first, [b"ACGTAC".to_vec()]);
    let all = merge::marker_records(&path, "16S", CopyPolicy::All)?;
    assert_eq!(all, [b"ACGTAC".to_vec(), b"ACGTACGTAA".to_vec()]);
    let longest = merge::marker_records(&path, "16S", CopyPolicy::Longest)?;
    assert_eq!(longest, [b"ACGTACGTAA".to_vec()]);
    Ok(())
}

#[test]
fn merge_all_copies_are_numbered() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    write_output(dir.path(), "GCF_000000001.1", PREDICTED)?;

    let args = Args { copies: CopyPolicy::All, ..args(dir.path(), &["GCF_000000001.1"])? };
    let (path, _) = merge::merge(&args)?;
    let expected = indoc! {"
        >GCF_000000001.1_1
        ACGTAC
        >GCF_000000001.1_2
        ACGTACGTAA
    "};
    assert_eq!(fs::read_to_string(path)?, expected);
    Ok(())
}

#[test]
fn missing_output_follows_policy() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    write_output(dir.path(), "GCF_000000001.1", PREDICTED)?;
    let args = args(dir.path(), &["GCA_000000009.1", "GCF_000000001.1"])?;

    // abort is the default, and nothing is written
    assert!(merge::merge(&args).is_err());
    assert!(!dir.path().join("all_16S.fasta").exists());

    let args = Args { on_missing: FailurePolicy::Skip, ..args };
    let (path, statuses) = merge::merge(&args)?;
    let observed = statuses.iter().map(|s| s.status).collect_vec();
    assert_eq!(observed, [Status::MissingOutput, Status::Completed]);
    assert_eq!(fs::read_to_string(path)?, ">GCF_000000001.1\nACGTAC\n");
    Ok(())
}

#[test]
fn genome_without_marker_is_no_match() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    write_output(dir.path(), "GCF_000000001.1", ">23S_rRNA::chr:1-5(+)\nGGGGG\n")?;
    let args = args(dir.path(), &["GCF_000000001.1"])?;

    let (path, statuses) = merge::merge(&args)?;
    assert_eq!(statuses[0].status, Status::NoMatch);
    assert_eq!(fs::read_to_string(path)?, "");
    Ok(())
}
