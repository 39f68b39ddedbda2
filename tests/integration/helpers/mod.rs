//! Helper utilities for integration tests.

pub mod bam_generator;
pub mod report;

pub use bam_generator::*;
pub use report::*;
