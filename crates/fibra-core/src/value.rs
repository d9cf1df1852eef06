//! Typed value cell
//!
//! [`Value`] is a tagged union over every supported component kind. It lets
//! the coordinate buffer, the packer and the traversal engine be written once
//! and operate on any tensor component type: operations dispatch on the tag
//! at the call site and reject mismatched kinds with
//! [`FibraError::TypeMismatch`] instead of reinterpreting memory.
//!
//! [`Element`] connects a Rust scalar type to its [`DataType`] tag and to the
//! typed value arrays of [`crate::array`].
//!
//! # Examples
//!
//! ```
//! use fibra_core::{DataType, Element, Value};
//!
//! let a = 2.5f64.into_value();
//! let b = Value::Float64(0.5);
//! assert_eq!(a.checked_add(b).unwrap(), Value::Float64(3.0));
//!
//! // Kinds never mix silently
//! assert!(a.checked_add(Value::Int32(1)).is_err());
//! assert_eq!(f64::from_value(a), Some(2.5));
//! assert_eq!(i32::from_value(a), None);
//! assert_eq!(Value::zero(DataType::Int64), Value::Int64(0));
//! ```

use std::fmt;

use crate::array::{Buffer, ValueArray};
use crate::error::{FibraError, FibraResult};
use crate::types::{Complex32, Complex64, DataType};

/// A single tensor component of any supported kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Complex32(Complex32),
    Complex64(Complex64),
}

impl Value {
    /// Component type tag of this value
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::Float32(_) => DataType::Float32,
            Value::Float64(_) => DataType::Float64,
            Value::Complex32(_) => DataType::Complex32,
            Value::Complex64(_) => DataType::Complex64,
        }
    }

    /// The additive identity of `dtype`
    pub fn zero(dtype: DataType) -> Self {
        match dtype {
            DataType::Int32 => Value::Int32(0),
            DataType::Int64 => Value::Int64(0),
            DataType::Float32 => Value::Float32(0.0),
            DataType::Float64 => Value::Float64(0.0),
            DataType::Complex32 => Value::Complex32(Complex32::new(0.0, 0.0)),
            DataType::Complex64 => Value::Complex64(Complex64::new(0.0, 0.0)),
        }
    }

    /// Returns true if the value equals the zero of its kind
    pub fn is_zero(&self) -> bool {
        *self == Value::zero(self.data_type())
    }

    /// Adds two values of the same kind.
    ///
    /// Integer addition wraps, matching fixed-width kernel arithmetic.
    ///
    /// # Errors
    ///
    /// [`FibraError::TypeMismatch`] if the kinds differ.
    pub fn checked_add(self, other: Value) -> FibraResult<Value> {
        let sum = match (self, other) {
            (Value::Int32(a), Value::Int32(b)) => Value::Int32(a.wrapping_add(b)),
            (Value::Int64(a), Value::Int64(b)) => Value::Int64(a.wrapping_add(b)),
            (Value::Float32(a), Value::Float32(b)) => Value::Float32(a + b),
            (Value::Float64(a), Value::Float64(b)) => Value::Float64(a + b),
            (Value::Complex32(a), Value::Complex32(b)) => Value::Complex32(a + b),
            (Value::Complex64(a), Value::Complex64(b)) => Value::Complex64(a + b),
            (a, b) => return Err(FibraError::type_mismatch(a.data_type(), b.data_type())),
        };
        Ok(sum)
    }

    /// Extracts the typed scalar.
    ///
    /// # Errors
    ///
    /// [`FibraError::TypeMismatch`] if `T` is not the kind held.
    pub fn get<T: Element>(self) -> FibraResult<T> {
        T::from_value(self).ok_or_else(|| FibraError::type_mismatch(T::DATA_TYPE, self.data_type()))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Complex32(v) => write!(f, "{v}"),
            Value::Complex64(v) => write!(f, "{v}"),
        }
    }
}

/// Rust scalar types that can be stored in a tensor
///
/// Implemented for `i32`, `i64`, `f32`, `f64`, [`Complex32`] and
/// [`Complex64`]. The associated [`DATA_TYPE`](Element::DATA_TYPE) is the
/// compile-time side of the runtime tag check performed on insert.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + 'static {
    /// Runtime tag of this type
    const DATA_TYPE: DataType;

    /// Wraps the scalar in a [`Value`]
    fn into_value(self) -> Value;

    /// Unwraps a [`Value`] of the same kind
    fn from_value(value: Value) -> Option<Self>;

    /// Typed view of a value array, if it holds this kind
    fn slice<'s>(values: &'s ValueArray<'_>) -> Option<&'s [Self]>;

    /// Mutable typed view of a value array, if it holds this kind
    fn slice_mut<'s>(values: &'s mut ValueArray<'_>) -> Option<&'s mut [Self]>;

    /// Wraps a buffer into a value array of this kind
    fn wrap<'a>(buffer: Buffer<'a, Self>) -> ValueArray<'a>;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const DATA_TYPE: DataType = DataType::$variant;

            #[inline]
            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            #[inline]
            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn slice<'s>(values: &'s ValueArray<'_>) -> Option<&'s [Self]> {
                match values {
                    ValueArray::$variant(buf) => Some(buf.as_slice()),
                    _ => None,
                }
            }

            fn slice_mut<'s>(values: &'s mut ValueArray<'_>) -> Option<&'s mut [Self]> {
                match values {
                    ValueArray::$variant(buf) => Some(buf.as_mut_slice()),
                    _ => None,
                }
            }

            fn wrap<'a>(buffer: Buffer<'a, Self>) -> ValueArray<'a> {
                ValueArray::$variant(buffer)
            }
        }
    };
}

impl_element!(i32, Int32);
impl_element!(i64, Int64);
impl_element!(f32, Float32);
impl_element!(f64, Float64);
impl_element!(Complex32, Complex32);
impl_element!(Complex64, Complex64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_tags() {
        assert_eq!(1i32.into_value().data_type(), DataType::Int32);
        assert_eq!(1i64.into_value().data_type(), DataType::Int64);
        assert_eq!(1f32.into_value().data_type(), DataType::Float32);
        assert_eq!(
            Complex64::new(1.0, 2.0).into_value().data_type(),
            DataType::Complex64
        );
    }

    #[test]
    fn test_zero_for_every_kind() {
        for dtype in DataType::ALL {
            let zero = Value::zero(dtype);
            assert_eq!(zero.data_type(), dtype);
            assert!(zero.is_zero());
        }
        assert!(!Value::Int32(3).is_zero());
    }

    #[test]
    fn test_checked_add() {
        assert_eq!(
            Value::Int32(2).checked_add(Value::Int32(3)).unwrap(),
            Value::Int32(5)
        );
        let c = Value::Complex32(Complex32::new(1.0, 1.0))
            .checked_add(Value::Complex32(Complex32::new(0.5, -1.0)))
            .unwrap();
        assert_eq!(c, Value::Complex32(Complex32::new(1.5, 0.0)));
    }

    #[test]
    fn test_checked_add_rejects_mixed_kinds() {
        let err = Value::Int32(1)
            .checked_add(Value::Float64(1.0))
            .unwrap_err();
        assert_eq!(
            err,
            FibraError::TypeMismatch {
                expected: DataType::Int32,
                got: DataType::Float64
            }
        );
    }

    #[test]
    fn test_typed_get() {
        assert_eq!(Value::Int64(7).get::<i64>().unwrap(), 7);
        assert!(Value::Int64(7).get::<f64>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int32(-4).to_string(), "-4");
        assert_eq!(Value::Float64(1.5).to_string(), "1.5");
    }
}
