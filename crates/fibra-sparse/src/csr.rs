//! CSR/CSC interop
//!
//! Factories build matrices directly over existing segment arrays, either
//! taking ownership of vectors or borrowing caller slices without copying.
//! Both produce the same index: a dense outer level sized by rows (CSR) or
//! columns (CSC) and a compressed inner level whose position array is the
//! row/column pointer.
//!
//! The `*_arrays` accessors export a packed matrix's arrays without copying.
//!
//! # Examples
//!
//! ```
//! use fibra_sparse::csr::{csr_arrays, make_csr_borrowed};
//!
//! let mut rowptr = vec![0, 2, 2, 3];
//! let mut colidx = vec![0, 2, 1];
//! let mut vals = vec![1.0f64, 2.0, 3.0];
//! {
//!     let a = make_csr_borrowed("A", &[3, 3], &mut rowptr, &mut colidx, &mut vals).unwrap();
//!     let arrays = csr_arrays::<f64>(&a).unwrap();
//!     assert_eq!(arrays.ptr(), &[0, 2, 2, 3]);
//!     assert_eq!(arrays.values(), &[1.0, 2.0, 3.0]);
//! }
//! // The caller's arrays outlive the tensor untouched
//! assert_eq!(colidx, vec![0, 2, 1]);
//! ```

use std::cell::Ref;
use std::marker::PhantomData;

use fibra_core::{Element, FibraError, FibraResult, Format, IndexArray, ValueArray};

use crate::index::{make_csc_index, make_csr_index, TensorIndex};
use crate::storage::Storage;
use crate::tensor::Tensor;

type IndexBuilder<'a> = fn(IndexArray<'a>, IndexArray<'a>) -> FibraResult<TensorIndex<'a>>;

fn assemble<'a, T: Element>(
    name: String,
    dimensions: &[usize],
    format: Format,
    build: IndexBuilder<'a>,
    ptr: IndexArray<'a>,
    idx: IndexArray<'a>,
    values: ValueArray<'a>,
) -> FibraResult<Tensor<'a>> {
    if dimensions.len() != 2 {
        return Err(FibraError::DimensionMismatch {
            expected: 2,
            got: dimensions.len(),
        });
    }
    let storage = Storage::new(build(ptr, idx)?, values)?;
    let tensor = Tensor::new(name, T::DATA_TYPE, dimensions, format)?;
    tensor.set_storage(storage)?;
    Ok(tensor)
}

/// CSR matrix taking ownership of its arrays.
///
/// # Errors
///
/// - [`FibraError::DimensionMismatch`] unless `dimensions` has two entries
/// - [`FibraError::InvalidIndex`] if `rowptr.len() != rows + 1`, the
///   pointers are not a valid segmentation of `colidx`, a column is out of
///   range, or `values.len() != colidx.len()`
pub fn make_csr<T: Element>(
    name: impl Into<String>,
    dimensions: &[usize],
    rowptr: Vec<i32>,
    colidx: Vec<i32>,
    values: Vec<T>,
) -> FibraResult<Tensor<'static>> {
    assemble::<T>(
        name.into(),
        dimensions,
        Format::csr(),
        make_csr_index,
        rowptr.into(),
        colidx.into(),
        ValueArray::from_vec(values),
    )
}

/// CSR matrix over caller-owned arrays, without copying. Same errors as
/// [`make_csr`].
pub fn make_csr_borrowed<'a, T: Element>(
    name: impl Into<String>,
    dimensions: &[usize],
    rowptr: &'a mut [i32],
    colidx: &'a mut [i32],
    values: &'a mut [T],
) -> FibraResult<Tensor<'a>> {
    assemble::<T>(
        name.into(),
        dimensions,
        Format::csr(),
        make_csr_index,
        rowptr.into(),
        colidx.into(),
        ValueArray::from_slice(values),
    )
}

/// CSC matrix taking ownership of its arrays.
///
/// # Errors
///
/// As [`make_csr`], with columns as the outer level.
pub fn make_csc<T: Element>(
    name: impl Into<String>,
    dimensions: &[usize],
    colptr: Vec<i32>,
    rowidx: Vec<i32>,
    values: Vec<T>,
) -> FibraResult<Tensor<'static>> {
    assemble::<T>(
        name.into(),
        dimensions,
        Format::csc(),
        make_csc_index,
        colptr.into(),
        rowidx.into(),
        ValueArray::from_vec(values),
    )
}

/// CSC matrix over caller-owned arrays, without copying
pub fn make_csc_borrowed<'a, T: Element>(
    name: impl Into<String>,
    dimensions: &[usize],
    colptr: &'a mut [i32],
    rowidx: &'a mut [i32],
    values: &'a mut [T],
) -> FibraResult<Tensor<'a>> {
    assemble::<T>(
        name.into(),
        dimensions,
        Format::csc(),
        make_csc_index,
        colptr.into(),
        rowidx.into(),
        ValueArray::from_slice(values),
    )
}

/// Zero-copy view of a packed CSR or CSC matrix
///
/// For CSR `ptr` holds row pointers and `idx` column indices; for CSC the
/// roles swap. The view keeps the tensor's storage borrowed.
pub struct SegmentArrays<'t, 'a, T> {
    storage: Ref<'t, Storage<'a>>,
    _marker: PhantomData<T>,
}

impl<T: Element> SegmentArrays<'_, '_, T> {
    fn inner(&self, array: usize) -> &[i32] {
        self.storage
            .index()
            .mode_index(1)
            .and_then(|mode| mode.index_array(array))
            .map(|a| a.as_slice())
            .unwrap_or(&[])
    }

    /// Outer pointer array, `outer + 1` entries
    pub fn ptr(&self) -> &[i32] {
        self.inner(0)
    }

    /// Inner coordinates, one per stored entry
    pub fn idx(&self) -> &[i32] {
        self.inner(1)
    }

    /// Stored values, aligned with [`SegmentArrays::idx`]
    pub fn values(&self) -> &[T] {
        T::slice(self.storage.values()).unwrap_or(&[])
    }
}

fn segment_arrays<'t, 'a, T: Element>(
    tensor: &'t Tensor<'a>,
    expected: Format,
) -> FibraResult<SegmentArrays<'t, 'a, T>> {
    let format = tensor.format();
    if format != expected {
        return Err(FibraError::invalid_format(format!(
            "tensor '{}' is stored as {}, expected {}",
            tensor.name(),
            format,
            expected
        )));
    }
    let dtype = tensor.data_type();
    if dtype != T::DATA_TYPE {
        return Err(FibraError::type_mismatch(dtype, T::DATA_TYPE));
    }
    Ok(SegmentArrays {
        storage: tensor.storage()?,
        _marker: PhantomData,
    })
}

/// Exports the arrays of a CSR matrix.
///
/// # Errors
///
/// - [`FibraError::InvalidFormat`] if the tensor is not stored as CSR
/// - [`FibraError::TypeMismatch`] if `T` is not the component type
/// - [`FibraError::NotPacked`] before the first pack
pub fn csr_arrays<'t, 'a, T: Element>(tensor: &'t Tensor<'a>) -> FibraResult<SegmentArrays<'t, 'a, T>> {
    segment_arrays(tensor, Format::csr())
}

/// Exports the arrays of a CSC matrix. Same errors as [`csr_arrays`].
pub fn csc_arrays<'t, 'a, T: Element>(tensor: &'t Tensor<'a>) -> FibraResult<SegmentArrays<'t, 'a, T>> {
    segment_arrays(tensor, Format::csc())
}
