//! Integration tests for bcqc.
//!
//! These tests build BAM, FASTA and CIF fixtures on disk and run the `bcqc` binary against
//! them end to end.

mod helpers;
mod test_cif_command;
mod test_confusion_command;
