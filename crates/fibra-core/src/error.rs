//! Unified error type for fibra storage operations
//!
//! Every fallible operation in the storage engine (insert, pack, traversal
//! construction, CSR/CSC interop) reports a [`FibraError`]. All failures are
//! local and synchronous: the engine performs no I/O and never retries.
//!
//! # Examples
//!
//! ```
//! use fibra_core::error::{FibraError, FibraResult};
//!
//! fn check_arity(coordinate: &[usize], order: usize) -> FibraResult<()> {
//!     if coordinate.len() != order {
//!         return Err(FibraError::DimensionMismatch {
//!             expected: order,
//!             got: coordinate.len(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_arity(&[0, 1], 2).is_ok());
//! assert!(check_arity(&[0], 2).is_err());
//! ```

use thiserror::Error;

use crate::format::ModeType;
use crate::types::DataType;

/// Top-level error type for all storage operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FibraError {
    /// Coordinate arity differs from the tensor order
    #[error("Dimension mismatch: expected {expected} coordinates, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Element kind differs from the tensor component type
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: DataType, got: DataType },

    /// Coordinate exceeds the declared dimensions
    #[error("Index out of bounds: coordinate {coordinate:?} exceeds dimensions {dimensions:?}")]
    OutOfBounds {
        coordinate: Vec<usize>,
        dimensions: Vec<usize>,
    },

    /// Index array requested outside what the mode exposes
    #[error("Invalid mode access: array {array} requested, mode exposes {available}")]
    InvalidModeAccess { array: usize, available: usize },

    /// A level uses a mode type the engine does not pack or traverse
    #[error("Unsupported mode type {mode_type} at level {level}")]
    UnsupportedModeType { mode_type: ModeType, level: usize },

    /// Format is malformed or does not match the tensor
    #[error("Invalid format: {reason}")]
    InvalidFormat { reason: String },

    /// Externally supplied index arrays violate the level invariants
    #[error("Invalid index: {reason}")]
    InvalidIndex { reason: String },

    /// Tensor dimensions cannot be represented
    #[error("Invalid shape: {reason}")]
    InvalidShape { reason: String },

    /// Two inserts hit the same coordinate under the rejecting policy
    #[error("Duplicate coordinate {coordinate:?}")]
    DuplicateCoordinate { coordinate: Vec<usize> },

    /// A position or extent no longer fits the 32-bit index arrays
    #[error("Index overflow: {count} exceeds the index range")]
    IndexOverflow { count: usize },

    /// Storage requested before the first pack
    #[error("Tensor '{name}' has not been packed")]
    NotPacked { name: String },
}

/// Result type alias for storage operations
pub type FibraResult<T> = Result<T, FibraError>;

impl FibraError {
    /// Create a type mismatch error
    pub fn type_mismatch(expected: DataType, got: DataType) -> Self {
        FibraError::TypeMismatch { expected, got }
    }

    /// Create an invalid format error with a message
    pub fn invalid_format(reason: impl Into<String>) -> Self {
        FibraError::InvalidFormat {
            reason: reason.into(),
        }
    }

    /// Create an invalid index error with a message
    pub fn invalid_index(reason: impl Into<String>) -> Self {
        FibraError::InvalidIndex {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = FibraError::DimensionMismatch {
            expected: 3,
            got: 2,
        };
        assert_eq!(
            err.to_string(),
            "Dimension mismatch: expected 3 coordinates, got 2"
        );
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = FibraError::type_mismatch(DataType::Int32, DataType::Float64);
        assert_eq!(err.to_string(), "Type mismatch: expected int32, got float64");
    }

    #[test]
    fn test_out_of_bounds_message() {
        let err = FibraError::OutOfBounds {
            coordinate: vec![1, 5],
            dimensions: vec![3, 3],
        };
        assert_eq!(
            err.to_string(),
            "Index out of bounds: coordinate [1, 5] exceeds dimensions [3, 3]"
        );
    }

    #[test]
    fn test_unsupported_mode_type_message() {
        let err = FibraError::UnsupportedModeType {
            mode_type: ModeType::Singleton,
            level: 1,
        };
        assert_eq!(err.to_string(), "Unsupported mode type singleton at level 1");
    }
}
