//! Integration tests for the confusion command.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use bcqc_lib::base::decode;
use tempfile::TempDir;

use crate::helpers::{
    ParsedReport, assert_rate, create_header, mapped_record, parse_report, reference_sequence,
    unmapped_record, write_bam, write_fasta, write_fasta_dir,
};

fn run_confusion(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bcqc"))
        .arg("confusion")
        .args(args)
        .output()
        .expect("Failed to run confusion command")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

/// Builds the report expected from `(cycle, reference base, read base)` observations.
fn expected_report(observations: &[(usize, u8, u8)], max_cycles: usize) -> ParsedReport {
    let mut joint: HashMap<(usize, usize, usize), u64> = HashMap::new();
    let mut total: HashMap<(usize, usize), u64> = HashMap::new();
    for &(cycle, ref_base, read_base) in observations {
        let r = decode(ref_base).unwrap();
        let e = decode(read_base).unwrap();
        *joint.entry((r, e, cycle)).or_default() += 1;
        *total.entry((r, cycle)).or_default() += 1;
    }

    let mut expected = HashMap::new();
    for (r, ref_char) in ['A', 'C', 'G', 'T'].into_iter().enumerate() {
        for (e, read_char) in ['A', 'C', 'G', 'T', 'N'].into_iter().enumerate() {
            let rates = (0..max_cycles)
                .map(|c| {
                    let t = total.get(&(r, c)).copied().unwrap_or(0);
                    (t > 0).then(|| joint.get(&(r, e, c)).copied().unwrap_or(0) as f64 / t as f64)
                })
                .collect();
            expected.insert((ref_char, read_char), rates);
        }
    }
    expected
}

fn assert_reports_match(actual: &ParsedReport, expected: &ParsedReport) {
    for (key, expected_rates) in expected {
        let actual_rates = &actual[key];
        assert_eq!(actual_rates.len(), expected_rates.len(), "cycle count for {key:?}");
        for (cycle, (a, e)) in actual_rates.iter().zip(expected_rates).enumerate() {
            match e {
                Some(value) => assert_rate(*a, *value),
                None => assert!(a.is_none(), "{key:?} cycle {cycle} should be NaN, got {a:?}"),
            }
        }
    }
}

/// Reads a single-row TSV into a column -> value map.
fn read_single_row_tsv(path: &Path) -> HashMap<String, String> {
    let text = fs::read_to_string(path).expect("Failed to read TSV");
    let mut lines = text.lines();
    let header: Vec<&str> = lines.next().expect("header").split('\t').collect();
    let values: Vec<&str> = lines.next().expect("row").split('\t').collect();
    header.into_iter().map(String::from).zip(values.into_iter().map(String::from)).collect()
}

struct MultiFixture {
    dir: TempDir,
    chr1: Vec<u8>,
    chr2: Vec<u8>,
}

impl MultiFixture {
    /// chr1 and chr2 have FASTA files; chr1_random does not.
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let chr1 = reference_sequence(1000, 0);
        let chr2 = reference_sequence(600, 3);
        fs::create_dir(dir.path().join("refs")).unwrap();
        write_fasta_dir(&dir.path().join("refs"), &[("chr1", &chr1), ("chr2", &chr2)]);
        Self { dir, chr1, chr2 }
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    /// Writes the standard mix of walked and skipped records, returning the observations
    /// the walked ones should contribute.
    fn write_mixed_bam(&self) -> Vec<(usize, u8, u8)> {
        let header = create_header(&[("chr1", 1000), ("chr1_random", 500), ("chr2", 600)]);

        let mut r1_bases = self.chr1[200..210].to_vec();
        r1_bases[0] = b'N';
        let r2_bases = self.chr1[300..310].to_vec();
        let r6_bases = self.chr2[400..410].to_vec();

        let records = vec![
            mapped_record("r1", 0, 201, false, "10M", &r1_bases),
            mapped_record("r2", 0, 301, true, "10M", &r2_bases),
            unmapped_record("r3", b"ACGTACGTAC"),
            mapped_record("r4", 1, 100, false, "10M", b"ACGTACGTAC"),
            mapped_record("r5", 0, 11, false, "10M", &self.chr1[10..20]),
            mapped_record("r6", 2, 401, false, "10M", &r6_bases),
            mapped_record("r7", 2, 591, false, "10M", &self.chr2[590..600]),
        ];
        write_bam(&self.path("input.bam"), &header, &records);

        let mut observations = Vec::new();
        for c in 0..10 {
            observations.push((c, self.chr1[200 + c], r1_bases[c]));
            // reverse strand: cycle 0 is the rightmost base
            observations.push((c, self.chr1[309 - c], r2_bases[9 - c]));
            observations.push((c, self.chr2[400 + c], r6_bases[c]));
        }
        observations
    }
}

#[test]
fn test_confusion_multi_chromosome() {
    let fixture = MultiFixture::new();
    let observations = fixture.write_mixed_bam();
    let report = fixture.path("report.txt");
    let prefix = fixture.path("sample");

    let output = run_confusion(&[
        "-i",
        path_str(&fixture.path("input.bam")),
        "-d",
        path_str(&fixture.path("refs")),
        "-l",
        "12",
        "-o",
        path_str(&report),
        "-m",
        path_str(&prefix),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let actual = parse_report(&fs::read_to_string(&report).unwrap());
    assert_reports_match(&actual, &expected_report(&observations, 12));

    // cycles past the end of every read have no coverage
    for rates in actual.values() {
        assert!(rates[10].is_none());
        assert!(rates[11].is_none());
    }

    let filters = read_single_row_tsv(&fixture.path("sample.filters.txt"));
    assert_eq!(filters["total_records"], "7");
    assert_eq!(filters["unmapped"], "1");
    assert_eq!(filters["alternate_contig"], "1");
    assert_eq!(filters["near_reference_start"], "1");
    assert_eq!(filters["near_reference_end"], "1");
    assert_eq!(filters["hard_clipped"], "0");
    assert_eq!(filters["forward"], "2");
    assert_eq!(filters["reverse"], "1");
    assert_eq!(filters["observations"], "30");

    let cycle_errors = fs::read_to_string(fixture.path("sample.cycle_errors.txt")).unwrap();
    let mut lines = cycle_errors.lines();
    let header: Vec<&str> = lines.next().unwrap().split('\t').collect();
    assert_eq!(header[..4], ["cycle", "bases", "mismatches", "no_calls"]);
    let first: Vec<&str> = lines.next().unwrap().split('\t').collect();
    assert_eq!(first[..4], ["0", "3", "0", "1"]);
    assert_eq!(cycle_errors.lines().count(), 13);

    let confusion = fs::read_to_string(fixture.path("sample.confusion.txt")).unwrap();
    // header plus 12 cycles x 4 reference bases x 5 called bases
    assert_eq!(confusion.lines().count(), 1 + 12 * 4 * 5);
}

#[test]
fn test_confusion_report_to_stdout() {
    let fixture = MultiFixture::new();
    let observations = fixture.write_mixed_bam();

    let output = run_confusion(&[
        "-i",
        path_str(&fixture.path("input.bam")),
        "-d",
        path_str(&fixture.path("refs")),
        "-l",
        "10",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let actual = parse_report(&String::from_utf8(output.stdout).unwrap());
    assert_reports_match(&actual, &expected_report(&observations, 10));
}

#[test]
fn test_confusion_single_reference() {
    let dir = TempDir::new().unwrap();
    let amplicon = reference_sequence(400, 5);
    write_fasta(&dir.path().join("amplicon.fa"), "amp", &amplicon);

    let mut bases = amplicon[150..170].to_vec();
    let substituted = if bases[5] == b'A' { b'C' } else { b'A' };
    bases[5] = substituted;

    let header = create_header(&[("amp", 400)]);
    let records = vec![
        mapped_record("walked", 0, 151, false, "20M", &bases),
        // within the default single-reference margin of 100
        mapped_record("near_start", 0, 51, false, "20M", &amplicon[50..70]),
        mapped_record("near_end", 0, 290, true, "20M", &amplicon[289..309]),
    ];
    let bam = dir.path().join("input.bam");
    write_bam(&bam, &header, &records);

    let report = dir.path().join("report.txt");
    let prefix = dir.path().join("amp");
    let output = run_confusion(&[
        "-i",
        path_str(&bam),
        "-d",
        path_str(dir.path()),
        "-f",
        "amplicon.fa",
        "-l",
        "20",
        "-o",
        path_str(&report),
        "-m",
        path_str(&prefix),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let observations: Vec<(usize, u8, u8)> =
        (0..20).map(|c| (c, amplicon[150 + c], bases[c])).collect();
    let actual = parse_report(&fs::read_to_string(&report).unwrap());
    assert_reports_match(&actual, &expected_report(&observations, 20));

    let filters = read_single_row_tsv(&dir.path().join("amp.filters.txt"));
    assert_eq!(filters["near_reference_start"], "1");
    assert_eq!(filters["near_reference_end"], "1");
    assert_eq!(filters["forward"], "1");
}

#[test]
fn test_confusion_soft_clip_policy() {
    let fixture = MultiFixture::new();
    let header = create_header(&[("chr1", 1000)]);
    // footprint starts two bases before the alignment start
    let bases = fixture.chr1[200..210].to_vec();
    write_bam(
        &fixture.path("input.bam"),
        &header,
        &[mapped_record("clipped", 0, 203, false, "2S8M", &bases)],
    );

    let included = fixture.path("included.txt");
    let output = run_confusion(&[
        "-i",
        path_str(&fixture.path("input.bam")),
        "-d",
        path_str(&fixture.path("refs")),
        "-l",
        "10",
        "-o",
        path_str(&included),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let observations: Vec<(usize, u8, u8)> =
        (0..10).map(|c| (c, fixture.chr1[200 + c], bases[c])).collect();
    let actual = parse_report(&fs::read_to_string(&included).unwrap());
    assert_reports_match(&actual, &expected_report(&observations, 10));

    let excluded = fixture.path("excluded.txt");
    let output = run_confusion(&[
        "-i",
        path_str(&fixture.path("input.bam")),
        "-d",
        path_str(&fixture.path("refs")),
        "-l",
        "10",
        "--skip-soft-clipped",
        "-o",
        path_str(&excluded),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let actual = parse_report(&fs::read_to_string(&excluded).unwrap());
    assert!(actual.values().all(|rates| rates.iter().all(Option::is_none)));
}

#[test]
fn test_confusion_insertions_deletions_and_hard_clips() {
    let fixture = MultiFixture::new();
    let chr1 = &fixture.chr1;
    let header = create_header(&[("chr1", 1000)]);

    // 5M3I5M: the inserted bases use cycles 5..8 without being counted
    let mut ins_bases = chr1[400..405].to_vec();
    ins_bases.extend_from_slice(b"TTT");
    ins_bases.extend_from_slice(&chr1[405..410]);
    // 5M2D5M: the second run resumes two reference bases later
    let mut del_bases = chr1[500..505].to_vec();
    del_bases.extend_from_slice(&chr1[507..512]);

    write_bam(
        &fixture.path("input.bam"),
        &header,
        &[
            mapped_record("ins", 0, 401, false, "5M3I5M", &ins_bases),
            mapped_record("del", 0, 501, false, "5M2D5M", &del_bases),
            mapped_record("hard", 0, 601, false, "5H10M", &chr1[600..610]),
        ],
    );

    let report = fixture.path("report.txt");
    let prefix = fixture.path("indel");
    let output = run_confusion(&[
        "-i",
        path_str(&fixture.path("input.bam")),
        "-d",
        path_str(&fixture.path("refs")),
        "-l",
        "14",
        "-o",
        path_str(&report),
        "-m",
        path_str(&prefix),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let mut observations = Vec::new();
    for c in 0..5 {
        observations.push((c, chr1[400 + c], chr1[400 + c]));
        observations.push((c + 8, chr1[405 + c], chr1[405 + c]));
        observations.push((c, chr1[500 + c], chr1[500 + c]));
        observations.push((c + 5, chr1[507 + c], chr1[507 + c]));
    }
    let actual = parse_report(&fs::read_to_string(&report).unwrap());
    assert_reports_match(&actual, &expected_report(&observations, 14));

    let filters = read_single_row_tsv(&fixture.path("indel.filters.txt"));
    assert_eq!(filters["hard_clipped"], "1");
    assert_eq!(filters["observations"], "20");
}

#[test]
fn test_confusion_interim_report() {
    let fixture = MultiFixture::new();
    fixture.write_mixed_bam();
    let interim = fixture.path("interim.txt");

    let output = run_confusion(&[
        "-i",
        path_str(&fixture.path("input.bam")),
        "-d",
        path_str(&fixture.path("refs")),
        "-l",
        "10",
        "-o",
        path_str(&fixture.path("report.txt")),
        "--interim-report",
        path_str(&interim),
        "--interim-interval",
        "2",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    parse_report(&fs::read_to_string(&interim).unwrap());
}

#[test]
fn test_confusion_missing_chromosome_file_fails() {
    let fixture = MultiFixture::new();
    let header = create_header(&[("chr3", 1000)]);
    write_bam(
        &fixture.path("input.bam"),
        &header,
        &[mapped_record("r1", 0, 201, false, "10M", b"ACGTACGTAC")],
    );

    let output = run_confusion(&[
        "-i",
        path_str(&fixture.path("input.bam")),
        "-d",
        path_str(&fixture.path("refs")),
        "-o",
        path_str(&fixture.path("report.txt")),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("chr3"), "{stderr}");
}

#[test]
fn test_confusion_missing_input_fails() {
    let fixture = MultiFixture::new();
    let output = run_confusion(&[
        "-i",
        path_str(&fixture.path("missing.bam")),
        "-d",
        path_str(&fixture.path("refs")),
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_confusion_zero_max_cycles_fails() {
    let fixture = MultiFixture::new();
    fixture.write_mixed_bam();
    let output = run_confusion(&[
        "-i",
        path_str(&fixture.path("input.bam")),
        "-d",
        path_str(&fixture.path("refs")),
        "-l",
        "0",
    ]);
    assert!(!output.status.success());
}
