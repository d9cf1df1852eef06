//! Typed storage arrays with explicit ownership
//!
//! Every array held by a storage is either allocated by the engine
//! ([`Ownership::Owned`], freed exactly once when the array drops) or lent by
//! the caller ([`Ownership::UserOwned`], a `&mut` slice the engine reads and
//! writes but never frees). The borrow keeps the caller's buffer alive for at
//! least as long as the storage that aliases it.
//!
//! - [`Buffer`]: one homogeneous array, owned or borrowed
//! - [`IndexArray`]: position/coordinate arrays (`i32`, C-compatible)
//! - [`ValueArray`]: component array, tagged with its [`DataType`]
//!
//! # Examples
//!
//! ```
//! use fibra_core::{Buffer, Ownership, Value, ValueArray};
//!
//! let mut caller_vals = vec![1.0f64, 2.0, 3.0];
//! {
//!     let mut values = ValueArray::from_slice(&mut caller_vals);
//!     assert_eq!(values.ownership(), Ownership::UserOwned);
//!     values.set(1, Value::Float64(20.0)).unwrap();
//! }
//! // The engine wrote through, and the caller's vector is still alive.
//! assert_eq!(caller_vals, vec![1.0, 20.0, 3.0]);
//!
//! let owned: Buffer<'static, i32> = Buffer::from(vec![0, 2, 3]);
//! assert_eq!(owned.ownership(), Ownership::Owned);
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::error::{FibraError, FibraResult};
use crate::types::{Complex32, Complex64, DataType};
use crate::value::{Element, Value};

/// Who frees an array's memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Allocated by the engine; released when the array drops
    Owned,
    /// Lent by the caller; never released by the engine
    UserOwned,
}

/// A homogeneous array, either engine-owned or borrowed from the caller
pub enum Buffer<'a, T> {
    Owned(Vec<T>),
    Borrowed(&'a mut [T]),
}

impl<'a, T> Buffer<'a, T> {
    /// Ownership tag of this buffer
    #[inline]
    pub fn ownership(&self) -> Ownership {
        match self {
            Buffer::Owned(_) => Ownership::Owned,
            Buffer::Borrowed(_) => Ownership::UserOwned,
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        match self {
            Buffer::Owned(v) => v,
            Buffer::Borrowed(s) => s,
        }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self {
            Buffer::Owned(v) => v,
            Buffer::Borrowed(s) => s,
        }
    }
}

impl<T> Deref for Buffer<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for Buffer<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T> From<Vec<T>> for Buffer<'static, T> {
    fn from(v: Vec<T>) -> Self {
        Buffer::Owned(v)
    }
}

impl<'a, T> From<&'a mut [T]> for Buffer<'a, T> {
    fn from(s: &'a mut [T]) -> Self {
        Buffer::Borrowed(s)
    }
}

impl<T: fmt::Debug> fmt::Debug for Buffer<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("ownership", &self.ownership())
            .field("data", &self.as_slice())
            .finish()
    }
}

/// Position or coordinate array of one level
pub type IndexArray<'a> = Buffer<'a, i32>;

/// Component array of a storage, tagged with its [`DataType`]
#[derive(Debug)]
pub enum ValueArray<'a> {
    Int32(Buffer<'a, i32>),
    Int64(Buffer<'a, i64>),
    Float32(Buffer<'a, f32>),
    Float64(Buffer<'a, f64>),
    Complex32(Buffer<'a, Complex32>),
    Complex64(Buffer<'a, Complex64>),
}

/// Applies `$body` to the buffer inside any variant.
macro_rules! with_buffer {
    ($array:expr, $buf:ident => $body:expr) => {
        match $array {
            ValueArray::Int32($buf) => $body,
            ValueArray::Int64($buf) => $body,
            ValueArray::Float32($buf) => $body,
            ValueArray::Float64($buf) => $body,
            ValueArray::Complex32($buf) => $body,
            ValueArray::Complex64($buf) => $body,
        }
    };
}

impl ValueArray<'static> {
    /// Engine-owned array of `len` zeros
    pub fn zeros(dtype: DataType, len: usize) -> Self {
        match dtype {
            DataType::Int32 => ValueArray::Int32(vec![0; len].into()),
            DataType::Int64 => ValueArray::Int64(vec![0; len].into()),
            DataType::Float32 => ValueArray::Float32(vec![0.0; len].into()),
            DataType::Float64 => ValueArray::Float64(vec![0.0; len].into()),
            DataType::Complex32 => ValueArray::Complex32(vec![Complex32::default(); len].into()),
            DataType::Complex64 => ValueArray::Complex64(vec![Complex64::default(); len].into()),
        }
    }

    /// Engine-owned array taking over `values`
    pub fn from_vec<T: Element>(values: Vec<T>) -> Self {
        T::wrap(Buffer::Owned(values))
    }
}

impl<'a> ValueArray<'a> {
    /// Caller-owned array aliasing `values`
    pub fn from_slice<T: Element>(values: &'a mut [T]) -> Self {
        T::wrap(Buffer::Borrowed(values))
    }

    /// Component type of the array
    pub fn data_type(&self) -> DataType {
        match self {
            ValueArray::Int32(_) => DataType::Int32,
            ValueArray::Int64(_) => DataType::Int64,
            ValueArray::Float32(_) => DataType::Float32,
            ValueArray::Float64(_) => DataType::Float64,
            ValueArray::Complex32(_) => DataType::Complex32,
            ValueArray::Complex64(_) => DataType::Complex64,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        with_buffer!(self, buf => buf.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ownership tag of the underlying buffer
    pub fn ownership(&self) -> Ownership {
        with_buffer!(self, buf => buf.ownership())
    }

    /// Reads slot `i`, or `None` past the end
    pub fn get(&self, i: usize) -> Option<Value> {
        with_buffer!(self, buf => buf.get(i).map(|v| v.into_value()))
    }

    /// Writes slot `i`.
    ///
    /// # Errors
    ///
    /// - [`FibraError::TypeMismatch`] if `value` is of another kind
    /// - [`FibraError::OutOfBounds`] if `i >= len`
    pub fn set(&mut self, i: usize, value: Value) -> FibraResult<()> {
        let expected = self.data_type();
        let len = self.len();
        let out_of_bounds = || FibraError::OutOfBounds {
            coordinate: vec![i],
            dimensions: vec![len],
        };
        let stored = with_buffer!(self, buf => {
            let slot = buf.get_mut(i).ok_or_else(out_of_bounds)?;
            assign(slot, value)
        });
        stored.map_err(|_| FibraError::type_mismatch(expected, value.data_type()))
    }

    /// Overwrites every slot with zero
    pub fn fill_zero(&mut self) {
        with_buffer!(self, buf => buf.iter_mut().for_each(|v| *v = Default::default()))
    }

    /// Typed view of the components.
    ///
    /// # Errors
    ///
    /// [`FibraError::TypeMismatch`] if `T` is not the array's kind.
    pub fn as_slice<T: Element>(&self) -> FibraResult<&[T]> {
        let got = self.data_type();
        T::slice(self).ok_or(FibraError::type_mismatch(T::DATA_TYPE, got))
    }

    /// Mutable typed view of the components.
    ///
    /// # Errors
    ///
    /// [`FibraError::TypeMismatch`] if `T` is not the array's kind.
    pub fn as_mut_slice<T: Element>(&mut self) -> FibraResult<&mut [T]> {
        let got = self.data_type();
        T::slice_mut(self).ok_or(FibraError::type_mismatch(T::DATA_TYPE, got))
    }

    /// Untyped pointer to the first component, for kernel descriptors
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        with_buffer!(self, buf => buf.as_mut_ptr().cast::<u8>())
    }
}

fn assign<T: Element>(slot: &mut T, value: Value) -> FibraResult<()> {
    *slot = value.get::<T>()?;
    Ok(())
}
