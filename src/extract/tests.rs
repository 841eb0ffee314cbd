use crate::extract::{self, Args, GeneMatcher, MatchStrategy};
use crate::utils::{FailurePolicy, Status};
use color_eyre::eyre::{Report, Result};
use indoc::{formatdoc, indoc};
use itertools::Itertools;
use std::fs;
use std::path::Path;

fn chr1() -> String {
    "ACGT".repeat(25)
}

fn annotation(records: &[(&str, usize, usize, &str)]) -> String {
    let mut text = "##gff-version 3\n".to_string();
    for (contig, start, end, attributes) in records {
        text.push_str(&format!("{contig}\tRefSeq\tgene\t{start}\t{end}\t.\t+\t.\t{attributes}\n"));
    }
    text
}

fn write_genome(dir: &Path, accession: &str, sequence: &str, gff: &str) -> Result<(), Report> {
    fs::create_dir_all(dir.join("genomes").join(accession))?;
    fs::write(dir.join("genomes").join(accession).join("genome.fna"), sequence)?;
    if !gff.is_empty() {
        fs::create_dir_all(dir.join("annotations").join(accession))?;
        fs::write(dir.join("annotations").join(accession).join("genomic.gff"), gff)?;
    }
    Ok(())
}

#[test]
fn extract_gene_interval() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let sequence = dir.path().join("genome.fna");
    let gff = dir.path().join("genomic.gff");
    fs::write(&sequence, format!(">chr1\n{}\n", chr1()))?;
    fs::write(&gff, annotation(&[(
        "chr1", 10, 20, "ID=gene-1;Name=rrs;gbkey=Gene",
    )]))?;

    let matcher = GeneMatcher::new("rrs", MatchStrategy::Substring)?;
    let observed = extract::extract_gene(&sequence, &gff, &matcher)?;
    let expected = chr1().as_bytes()[9..20].to_vec();
    assert_eq!(observed.as_ref().map(|s| s.len()), Some(11));
    assert_eq!(observed, Some(expected));
    Ok(())
}

#[test]
fn extract_gene_skips_unknown_contigs() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let sequence = dir.path().join("genome.fna");
    let gff = dir.path().join("genomic.gff");
    fs::write(&sequence, indoc! {"
        >chr1
        AAAAAAAAAA
        >plasmid
        CCCCCGGGGG
    "})?;
    fs::write(&gff, annotation(&[
        ("chr9", 1, 5, "ID=gene-1;Name=rrs"),
        ("plasmid", 4, 7, "ID=gene-2;Name=rrs"),
        ("chr1", 1, 3, "ID=gene-3;Name=rrs"),
        ("plasmid", 1, 2, "ID=gene-4;Name=rrs"),
    ]))?;

    let matcher = GeneMatcher::new("rrs", MatchStrategy::Substring)?;
    let observed = extract::extract_gene(&sequence, &gff, &matcher)?;
    assert_eq!(observed, Some(b"CCGG".to_vec()));

    let missing = GeneMatcher::new("rrl", MatchStrategy::Substring)?;
    assert_eq!(extract::extract_gene(&sequence, &gff, &missing)?, None);
    Ok(())
}

#[test]
fn locate_gene_strategies() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let gff = dir.path().join("genomic.gff");
    let mut text = annotation(&[
        ("chr1", 1, 10, "ID=gene-1;Name=rrsA"),
        ("chr1", 20, 30, "ID=gene-2;Name=rrs"),
        ("chr1", 40, 50, "ID=gene-3;locus=rrs;gbkey=Gene"),
    ]);
    // only gene features are considered
    text.push_str("chr1\tRefSeq\trRNA\t20\t30\t.\t+\t.\tID=rna-1;Name=rrs\n");
    fs::write(&gff, text)?;

    let starts = |matcher: GeneMatcher| -> Result<Vec<usize>, Report> {
        Ok(extract::locate_gene(&gff, &matcher)?.iter().map(|i| i.start).collect_vec())
    };
    assert_eq!(starts(GeneMatcher::new("rrs", MatchStrategy::Substring)?)?, [1, 20, 40]);
    assert_eq!(starts(GeneMatcher::new("rrs", MatchStrategy::Exact)?)?, [20, 40]);
    assert_eq!(starts(GeneMatcher::new("^rrs[A-Z]$", MatchStrategy::Regex)?)?, [1]);
    Ok(())
}

#[test]
fn malformed_annotation_reports_line() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let gff = dir.path().join("genomic.gff");
    fs::write(&gff, "##gff-version 3\nchr1\tRefSeq\tgene\t10\n")?;

    let matcher = GeneMatcher::new("rrs", MatchStrategy::Substring)?;
    let result = extract::locate_gene(&gff, &matcher);
    let message = result.err().map(|e| e.to_string()).unwrap_or_default();
    assert!(message.contains("line 2"), "{message}");
    Ok(())
}

#[test]
fn out_of_range_interval_is_an_error() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let sequence = dir.path().join("genome.fna");
    let gff = dir.path().join("genomic.gff");
    fs::write(&sequence, format!(">chr1\n{}\n", chr1()))?;
    fs::write(&gff, annotation(&[("chr1", 90, 120, "ID=gene-1;Name=rrs")]))?;

    let matcher = GeneMatcher::new("rrs", MatchStrategy::Substring)?;
    assert!(extract::extract_gene(&sequence, &gff, &matcher).is_err());
    Ok(())
}

#[test]
fn extract_all_uses_twin_annotation() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let gff = annotation(&[("chr1", 1, 8, "ID=gene-1;Name=rrs")]);
    write_genome(dir.path(), "GCA_000000001.1", ">chr1\nACGTACGTACGT\n", "")?;
    fs::create_dir_all(dir.path().join("annotations/GCF_000000001.1"))?;
    fs::write(dir.path().join("annotations/GCF_000000001.1/genomic.gff"), &gff)?;
    write_genome(dir.path(), "GCA_000000002.1", ">chr1\nTTTTGGGGCCCC\n", &gff)?;

    let accessions = dir.path().join("accessions.txt");
    fs::write(&accessions, "GCA_000000002.1\nGCA_000000001.1\nGCA_000000003.1\n")?;

    let args = Args {
        genomes: dir.path().join("genomes"),
        annotations: dir.path().join("annotations"),
        gene: "rrs".to_string(),
        accessions,
        output: dir.path().join("out").join("rrs.fasta"),
        report: Some(dir.path().join("out").join("report.tsv")),
        ..Default::default()
    };
    let statuses = extract::extract_all(&args)?;
    let observed = statuses.iter().map(|s| s.status).collect_vec();
    assert_eq!(observed, [Status::Completed, Status::Completed, Status::MissingSequence]);

    let expected = formatdoc! {"
        >GCA_000000002.1
        TTTTGGGG
        >GCA_000000001.1
        ACGTACGT
    "};
    assert_eq!(fs::read_to_string(&args.output)?, expected);
    assert!(fs::read_to_string(dir.path().join("out/report.tsv"))?.contains("GCA_000000003.1\tmissing_sequence"));

    let abort = Args { on_missing: FailurePolicy::Abort, ..args };
    assert!(extract::extract_all(&abort).is_err());
    Ok(())
}
