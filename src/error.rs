//! Error types for sn-fatigue.
//!
//! Every failure is raised at the point of detection and halts the current
//! operation. Messages are written to be shown to the user verbatim.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Slot;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, SnError>;

/// Errors raised by loading, fitting and comparing S-N data.
#[derive(Debug, Error)]
pub enum SnError {
    /// The data file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The delimited reader failed on the data section.
    #[error("Failed to read delimited data: {0}")]
    Csv(#[from] csv::Error),

    /// Runout marker outside the supported set.
    #[error(
        "Unsupported runout indicator '{0}'. Supported indicators are '*', '^' and '&'"
    )]
    UnsupportedRunoutMarker(char),

    /// Delimiter that cannot be told apart from numeric syntax.
    #[error("Invalid delimiter {0:?}: {1}")]
    InvalidDelimiter(char, &'static str),

    /// Engine or loader setting outside its valid range.
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    /// A data row could not be parsed.
    #[error("Line {line}: {message}")]
    Parse { line: u64, message: String },

    /// A negative value, which usually means the runout marker is wrong.
    #[error(
        "Line {line}: a negative number was detected. Please check that you have set the \
         correct runout indicator (currently '{marker}')"
    )]
    NegativeValue { line: u64, marker: char },

    /// A zero stress or cycle count, which has no logarithm.
    #[error("Line {line}: stress and cycles must be greater than zero")]
    ZeroValue { line: u64 },

    /// The input parsed but holds no observations.
    #[error("No observations found in {origin}")]
    NoObservations { origin: String },

    /// The requested slot has not been loaded.
    #[error("A dataset matching id '{0}' has not yet been loaded")]
    SlotEmpty(Slot),

    /// Merge is active but one of the two slots is empty.
    #[error("Cannot merge data sets: dataset '{0}' has not yet been loaded")]
    MergePartnerEmpty(Slot),

    /// Comparison requested against a single slot.
    #[error("Cannot compare dataset '{0}' with itself")]
    SameSlot(Slot),

    /// Not enough non-runout points for the requested fit.
    #[error("Not enough data: {points} non-runout point(s) cannot support a fit with {dof} free parameter(s)")]
    InsufficientData { points: usize, dof: usize },

    /// Fitted or fixed slope too close to zero for a reference-life stress.
    #[error("Degenerate fit: slope {0} is too close to zero")]
    DegenerateSlope(f64),

    /// All stress values coincide, so no slope can be estimated.
    #[error("Degenerate fit: all stress values are identical")]
    ConstantStress,

    /// All cycle values coincide, so R squared is undefined.
    #[error("Degenerate fit: all cycle counts are identical")]
    ConstantCycles,

    /// A result field came out as NaN or infinity.
    #[error("Degenerate fit: '{0}' is not a finite number")]
    NonFinite(&'static str),

    /// A distribution could not be constructed for a quantile.
    #[error("Quantile evaluation failed: {0}")]
    Quantile(String),
}
