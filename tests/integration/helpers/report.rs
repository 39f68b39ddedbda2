//! Parsing of the text confusion report.

use std::collections::HashMap;

/// Rates per `(reference base, called base)`, one value per cycle (`None` for NaN).
pub type ParsedReport = HashMap<(char, char), Vec<Option<f64>>>;

/// Parses a confusion report, checking its layout along the way.
pub fn parse_report(text: &str) -> ParsedReport {
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 24, "report should have 4 blocks of 6 lines");

    let mut parsed = HashMap::new();
    for (block, ref_base) in lines.chunks(6).zip(['A', 'C', 'G', 'T']) {
        assert_eq!(block[0], ref_base.to_string());
        for (line, read_base) in block[1..].iter().zip(['A', 'C', 'G', 'T', 'N']) {
            let values = line
                .strip_prefix(&format!("\t-> {read_base}"))
                .unwrap_or_else(|| panic!("unexpected row label in {line:?}"));
            let rates = values
                .split(' ')
                .skip(1)
                .map(|v| if v == "NaN" { None } else { Some(v.parse::<f64>().expect("float")) })
                .collect();
            parsed.insert((ref_base, read_base), rates);
        }
    }
    parsed
}

/// Asserts that `actual` is `Some(expected)` to six decimal places.
pub fn assert_rate(actual: Option<f64>, expected: f64) {
    let value = actual.unwrap_or_else(|| panic!("expected {expected}, got NaN"));
    assert!((value - expected).abs() < 1e-6, "expected {expected}, got {value}");
}
