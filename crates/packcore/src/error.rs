//! Errors raised while building a catalogue snapshot.
//!
//! A malformed catalogue entry fails the whole request: defaulting a bad
//! capacity or price would silently corrupt every downstream number.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogueError {
    #[error("{entry}: field `{field}` must be {expected}, got {value}")]
    InvalidField {
        entry: String,
        field: &'static str,
        expected: &'static str,
        value: f64,
    },

    #[error("{entry}: `{low_field}` ({low}) exceeds `{high_field}` ({high})")]
    InvertedRange {
        entry: String,
        low_field: &'static str,
        low: f64,
        high_field: &'static str,
        high: f64,
    },

    #[error("catalogue contains no cells")]
    NoCells,
}

/// Checks that `value` is finite and strictly positive.
pub(crate) fn require_positive(entry: &str, field: &'static str, value: f64) -> Result<(), CatalogueError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CatalogueError::InvalidField {
            entry: entry.to_string(),
            field,
            expected: "a finite positive number",
            value,
        })
    }
}

/// Checks that `value` is finite and not negative.
pub(crate) fn require_non_negative(entry: &str, field: &'static str, value: f64) -> Result<(), CatalogueError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CatalogueError::InvalidField {
            entry: entry.to_string(),
            field,
            expected: "a finite non-negative number",
            value,
        })
    }
}

pub(crate) fn require_ordered(
    entry: &str,
    low_field: &'static str,
    low: f64,
    high_field: &'static str,
    high: f64,
) -> Result<(), CatalogueError> {
    if low <= high {
        Ok(())
    } else {
        Err(CatalogueError::InvertedRange {
            entry: entry.to_string(),
            low_field,
            low,
            high_field,
            high,
        })
    }
}
