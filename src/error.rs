// src/error.rs

//! Error types for the PCA engine.

use std::fmt;

/// Errors that can occur while validating input or computing a PCA result.
///
/// A failed computation never yields a partially populated result.
#[derive(Debug, Clone, PartialEq)]
pub enum PcaError {
    /// The dataset has no samples or no features.
    EmptyInput,

    /// A row does not have the same length as the first row.
    RaggedRows {
        /// Index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },

    /// Fewer than two samples; the `n - 1` divisor is undefined.
    InsufficientSamples {
        /// Number of samples supplied.
        found: usize,
    },

    /// The dataset contains NaN or an infinity.
    NonFiniteValue {
        /// Row of the first non-finite value.
        row: usize,
        /// Column of the first non-finite value.
        column: usize,
    },

    /// The requested component count cannot be satisfied.
    InvalidComponents {
        /// Number of components requested.
        requested: usize,
        /// Number of independent directions available.
        available: usize,
    },

    /// The data carries no usable variance for the requested operation.
    DegenerateInput {
        /// Description of the degeneracy.
        message: String,
    },

    /// Invalid configuration parameter.
    InvalidConfig {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why it's invalid.
        message: String,
    },

    /// An array had the wrong shape for the operation.
    DimensionMismatch {
        /// Expected size.
        expected: usize,
        /// Size found.
        found: usize,
        /// What was being measured.
        context: String,
    },

    /// Saving or loading a result snapshot failed.
    Persistence {
        /// Description of what went wrong.
        message: String,
    },
}

impl fmt::Display for PcaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PcaError::EmptyInput => {
                write!(f, "Input dataset must have at least one sample and one feature")
            }
            PcaError::RaggedRows { row, expected, found } => {
                write!(
                    f,
                    "Row {} has {} values but the first row has {}; all rows must have equal length",
                    row, found, expected
                )
            }
            PcaError::InsufficientSamples { found } => {
                write!(
                    f,
                    "PCA requires at least 2 samples to estimate variance, got {}",
                    found
                )
            }
            PcaError::NonFiniteValue { row, column } => {
                write!(f, "Non-finite value at row {}, column {}", row, column)
            }
            PcaError::InvalidComponents { requested, available } => {
                write!(
                    f,
                    "Cannot extract {} components: must be between 1 and {}",
                    requested, available
                )
            }
            PcaError::DegenerateInput { message } => {
                write!(f, "Degenerate input: {}", message)
            }
            PcaError::InvalidConfig { parameter, message } => {
                write!(f, "Invalid configuration for '{}': {}", parameter, message)
            }
            PcaError::DimensionMismatch {
                expected,
                found,
                context,
            } => {
                write!(
                    f,
                    "Dimension mismatch for {}: expected {}, found {}",
                    context, expected, found
                )
            }
            PcaError::Persistence { message } => {
                write!(f, "Persistence error: {}", message)
            }
        }
    }
}

impl std::error::Error for PcaError {}

impl From<std::io::Error> for PcaError {
    fn from(err: std::io::Error) -> Self {
        PcaError::Persistence {
            message: err.to_string(),
        }
    }
}

/// Convenience type alias for Results with PcaError.
pub type Result<T> = std::result::Result<T, PcaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_violated_precondition() {
        let err = PcaError::RaggedRows {
            row: 3,
            expected: 4,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "Row 3 has 2 values but the first row has 4; all rows must have equal length"
        );

        let err = PcaError::InvalidComponents {
            requested: 0,
            available: 5,
        };
        assert!(err.to_string().contains("between 1 and 5"));
    }

    #[test]
    fn io_errors_become_persistence_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing snapshot");
        let err: PcaError = io.into();
        assert!(matches!(err, PcaError::Persistence { ref message } if message.contains("missing snapshot")));
    }
}
