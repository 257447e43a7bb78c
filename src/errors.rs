//! Definition of errors.

use core::fmt;

#[cfg(feature = "std")]
use std::error::Error;

/// The error type for chaincrf.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CrfError {
    /// Error used when a label is not present in the label index.
    UnknownLabel,

    /// Error used when a position has no allowed tags.
    EmptyConstraint {
        /// Position whose allowed-tag set is empty.
        position: usize,
    },

    /// Error used when no labeling reaches past a position under the
    /// current constraints and scores.
    Infeasible {
        /// First position at which every tag is unreachable.
        position: usize,
    },

    /// Error used when posterior mass falls on a transition that has no
    /// feature vector.
    MissingFeatures {
        /// Position of the offending transition.
        position: usize,
    },

    /// Error used when two collaborating vectors disagree on their length.
    DimensionMismatch {
        /// Length required by the receiver.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },
}

impl fmt::Display for CrfError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnknownLabel => {
                write!(f, "UnknownLabel: label is not present in the label index")
            }
            Self::EmptyConstraint { position } => {
                write!(f, "EmptyConstraint: no allowed tags at position {position}")
            }
            Self::Infeasible { position } => {
                write!(f, "Infeasible: no labeling reaches past position {position}")
            }
            Self::MissingFeatures { position } => {
                write!(
                    f,
                    "MissingFeatures: posterior mass on a featureless transition at position {position}"
                )
            }
            Self::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "DimensionMismatch: expected length {expected}, got {actual}"
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl Error for CrfError {}

/// A specialized Result type.
pub type Result<T, E = CrfError> = core::result::Result<T, E>;
