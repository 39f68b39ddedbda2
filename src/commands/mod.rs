//! CLI command implementations for bcqc.
//!
//! - [`confusion`] - Build the per-cycle base-calling confusion matrix from aligned reads
//! - [`cif`] - Print the header and intensities of a cluster intensity file

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::uninlined_format_args
)]

pub mod cif;
pub mod command;
pub mod common;
pub mod confusion;
