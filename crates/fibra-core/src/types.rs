//! Core type definitions for fibra tensors.
//!
//! - [`DataType`]: runtime tag for the component kind of a tensor
//! - [`Shape`]: dimension list, inline for the common low-order case
//! - Complex element aliases re-exported from `scirs2_core`
//!
//! # Examples
//!
//! ```
//! use fibra_core::DataType;
//!
//! let dtype = DataType::Float64;
//! assert_eq!(dtype.size_of(), 8);
//! assert!(dtype.is_float());
//! assert_eq!(dtype.to_string(), "float64");
//! ```

use std::fmt;

use smallvec::SmallVec;

/// Complex number with `f64` parts.
pub use scirs2_core::numeric::Complex64;

/// Complex number with `f32` parts.
pub type Complex32 = scirs2_core::num_complex::Complex<f32>;

/// Tensor dimensions.
///
/// Inline for tensors with up to 6 modes, heap allocated beyond that.
pub type Shape = SmallVec<[usize; 6]>;

/// Component type of a tensor.
///
/// Chosen once at tensor construction. Every value inserted into the tensor
/// and every value slot of its storage must agree with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit IEEE float
    Float32,
    /// 64-bit IEEE float
    Float64,
    /// Complex number with `f32` parts
    Complex32,
    /// Complex number with `f64` parts
    Complex64,
}

impl DataType {
    /// All supported component types.
    pub const ALL: [DataType; 6] = [
        DataType::Int32,
        DataType::Int64,
        DataType::Float32,
        DataType::Float64,
        DataType::Complex32,
        DataType::Complex64,
    ];

    /// Size of one component in bytes.
    #[inline]
    pub fn size_of(&self) -> usize {
        match self {
            DataType::Int32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::Float64 | DataType::Complex32 => 8,
            DataType::Complex64 => 16,
        }
    }

    /// Returns true for integer component types
    #[inline]
    pub fn is_integral(&self) -> bool {
        matches!(self, DataType::Int32 | DataType::Int64)
    }

    /// Returns true for real floating-point component types
    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Returns true for complex component types
    #[inline]
    pub fn is_complex(&self) -> bool {
        matches!(self, DataType::Complex32 | DataType::Complex64)
    }

    /// Lower-case name of the type
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Complex32 => "complex32",
            DataType::Complex64 => "complex64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(DataType::Int32.size_of(), 4);
        assert_eq!(DataType::Int64.size_of(), 8);
        assert_eq!(DataType::Complex32.size_of(), 8);
        assert_eq!(DataType::Complex64.size_of(), 16);
    }

    #[test]
    fn test_kind_predicates() {
        for dtype in DataType::ALL {
            let kinds = [dtype.is_integral(), dtype.is_float(), dtype.is_complex()];
            assert_eq!(kinds.iter().filter(|&&k| k).count(), 1, "{dtype}");
        }
    }
}
