//! Base codec.
//!
//! Maps nucleotide characters to dense indices used to address the confusion matrix and
//! back again. The index order is `A`, `C`, `G`, `T`, `N`.

use crate::errors::{BcqcError, Result};

/// Number of distinct bases tracked, including the no-call `N`.
pub const NUM_BASES: usize = 5;

/// Number of bases that appear as reference rows in the report (`N` is excluded).
pub const NUM_REF_BASES: usize = 4;

/// Bases in index order.
pub const BASES: [u8; NUM_BASES] = *b"ACGTN";

/// Index of the no-call base.
pub const NO_CALL_INDEX: usize = 4;

/// Number of bases either side of an invalid base included in the error context.
const CONTEXT_FLANK: usize = 10;

/// Returns the dense index of a base, or `None` if it is not one of A/C/G/T/N.
///
/// Matching is case-insensitive.
#[inline]
#[must_use]
pub const fn try_decode(base: u8) -> Option<usize> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        b'N' | b'n' => Some(4),
        _ => None,
    }
}

/// Decodes a base to its dense index.
///
/// # Errors
///
/// Returns [`BcqcError::InvalidBase`] if `base` is not one of A/C/G/T/N in either case.
///
/// # Examples
///
/// ```
/// use bcqc_lib::base::decode;
///
/// assert_eq!(decode(b'A').unwrap(), 0);
/// assert_eq!(decode(b'g').unwrap(), 2);
/// assert!(decode(b'R').is_err());
/// ```
pub fn decode(base: u8) -> Result<usize> {
    try_decode(base)
        .ok_or_else(|| BcqcError::InvalidBase { base, context: char::from(base).to_string() })
}

/// Decodes the base at `offset` of `seq`, reporting nearby bases if it is invalid.
///
/// `offset` must be within `seq`.
///
/// # Errors
///
/// Returns [`BcqcError::InvalidBase`] with up to ten flanking bases on each side as context.
pub fn decode_at(seq: &[u8], offset: usize) -> Result<usize> {
    let base = seq[offset];
    try_decode(base).ok_or_else(|| {
        let start = offset.saturating_sub(CONTEXT_FLANK);
        let end = (offset + CONTEXT_FLANK + 1).min(seq.len());
        BcqcError::InvalidBase {
            base,
            context: format!(
                "{} (offset {offset})",
                String::from_utf8_lossy(&seq[start..end]).into_owned()
            ),
        }
    })
}

/// Encodes a dense index back to its uppercase base.
///
/// # Errors
///
/// Returns [`BcqcError::InvalidBaseIndex`] if `index >= NUM_BASES`.
///
/// # Examples
///
/// ```
/// use bcqc_lib::base::encode;
///
/// assert_eq!(encode(3).unwrap(), b'T');
/// assert!(encode(5).is_err());
/// ```
pub fn encode(index: usize) -> Result<u8> {
    BASES.get(index).copied().ok_or(BcqcError::InvalidBaseIndex { index })
}
