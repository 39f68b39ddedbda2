//! Custom error types for bcqc operations.

use thiserror::Error;

/// Result type alias for bcqc operations
pub type Result<T> = std::result::Result<T, BcqcError>;

/// Error type for bcqc operations
#[derive(Error, Debug)]
pub enum BcqcError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// A base character outside of A/C/G/T/N (case-insensitive)
    #[error("Invalid base '{shown}' (0x{base:02x}) in: {context}", shown = char::from(*.base))]
    InvalidBase {
        /// The offending byte
        base: u8,
        /// Surrounding sequence to help locate the problem
        context: String,
    },

    /// A dense base index outside of 0..5
    #[error("Invalid base index {index}")]
    InvalidBaseIndex {
        /// The offending index
        index: usize,
    },

    /// CIGAR operation that cannot be interpreted
    #[error("Invalid CIGAR operation '{op}' in record {record}")]
    InvalidCigarOperation {
        /// Display form of the operation (e.g. `N`, `=`)
        op: String,
        /// Read name or other identifier of the record
        record: String,
    },

    /// A walk cursor left the bounds of the reference or the read
    #[error("{what} coordinate {coordinate} is outside [0, {length}) for record {record}")]
    CoordinateOutOfBounds {
        /// Which sequence was being indexed ("Reference" or "Query")
        what: &'static str,
        /// The offending coordinate
        coordinate: i64,
        /// Length of the sequence being indexed
        length: usize,
        /// Read name or other identifier of the record
        record: String,
    },

    /// File format error
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "BAM", "CIF")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// Required reference sequence not found
    #[error("Reference sequence '{ref_name}' not found")]
    ReferenceNotFound {
        /// The reference sequence name
        ref_name: String,
    },
}
