//! Integration tests for the cif command.

use std::fs;
use std::process::{Command, Output};

use tempfile::TempDir;

use crate::helpers::write_cif;

fn run_cif(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bcqc"))
        .arg("cif")
        .args(args)
        .output()
        .expect("Failed to run cif command")
}

#[test]
fn test_cif_prints_header_and_intensities() {
    let dir = TempDir::new().unwrap();
    let cif = dir.path().join("s_1_1101.cif");
    write_cif(&cif, 3, 2, 2, |cycle, channel, cluster| {
        (i16::try_from(cycle).unwrap() * 100 + channel as i16 * 10 + cluster as i16) - 5
    });
    let out = dir.path().join("dump.txt");

    let output = run_cif(&["-i", cif.to_str().unwrap(), "-o", out.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let text = fs::read_to_string(&out).unwrap();
    let expected = "CIF\n\
                    \tVersion:     1\n\
                    \tData size:   2\n\
                    \tFirst cycle: 3\n\
                    \t# cycles:    2\n\
                    \t# clusters:  2\n\
                    0\n\
                    \t0\t-5 95 \n\
                    \t1\t5 105 \n\
                    \t2\t15 115 \n\
                    \t3\t25 125 \n\
                    1\n\
                    \t0\t-4 96 \n\
                    \t1\t6 106 \n\
                    \t2\t16 116 \n\
                    \t3\t26 126 \n\
                    \n";
    assert_eq!(text, expected);
}

#[test]
fn test_cif_header_only_to_stdout() {
    let dir = TempDir::new().unwrap();
    let cif = dir.path().join("tile.cif");
    write_cif(&cif, 1, 4, 3, |_, _, _| 0);

    let output = run_cif(&["-i", cif.to_str().unwrap(), "--header-only"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("CIF\n"));
    assert!(stdout.contains("\t# cycles:    4\n"));
    assert!(stdout.contains("\t# clusters:  3\n"));
    assert_eq!(stdout.lines().count(), 6);
}

#[test]
fn test_cif_truncated_file_fails() {
    let dir = TempDir::new().unwrap();
    let cif = dir.path().join("tile.cif");
    write_cif(&cif, 1, 2, 2, |_, _, _| 1);
    let mut bytes = fs::read(&cif).unwrap();
    bytes.truncate(bytes.len() - 3);
    fs::write(&cif, bytes).unwrap();

    let output = run_cif(&["-i", cif.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("truncated intensities"));
}

#[test]
fn test_cif_bad_magic_fails() {
    let dir = TempDir::new().unwrap();
    let cif = dir.path().join("tile.cif");
    fs::write(&cif, b"BAM\x01\x02\x01\x00\x01\x00\x01\x00\x00\x00").unwrap();

    let output = run_cif(&["-i", cif.to_str().unwrap(), "--header-only"]);
    assert!(!output.status.success());
}
