//! C-compatible kernel descriptor
//!
//! Generated kernels read and write packed storage through a flat
//! [`TensorDescriptor`]: order, dimensions, mode ordering, per-level mode type
//! tags, per-level index array pointers and the value array. The layout and
//! the numeric tag encodings are fixed, so a kernel compiled against one
//! packing stays valid for the next as long as it re-reads the descriptor.
//!
//! [`KernelDescriptor`] owns the side arrays the descriptor points into and
//! mutably borrows the storage, so the pointers cannot outlive the arrays or
//! observe a concurrent re-pack.
//!
//! # Examples
//!
//! ```
//! use fibra_core::{DataType, Format};
//! use fibra_sparse::descriptor::{KernelDescriptor, ModeTypeTag};
//! use fibra_sparse::tensor::Tensor;
//!
//! let a = Tensor::new("A", DataType::Float64, &[3, 3], Format::csr()).unwrap();
//! a.insert(&[1, 2], 4.0f64).unwrap();
//! a.pack().unwrap();
//!
//! let (format, dims) = (a.format(), a.dimensions());
//! let mut storage = a.storage_mut().unwrap();
//! let desc = KernelDescriptor::new(&mut storage, &format, &dims).unwrap();
//! let raw = desc.descriptor();
//! assert_eq!(raw.order, 2);
//! assert_eq!(raw.vals_size, 1);
//! assert_eq!(desc.mode_types(), &[ModeTypeTag::Dense, ModeTypeTag::Compressed]);
//! ```

use std::marker::PhantomData;
use std::ptr;

use fibra_core::{DataType, FibraError, FibraResult, Format, ModeType};

use crate::storage::Storage;

/// Stable numeric encoding of [`ModeType`]
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeTypeTag {
    Dense = 0,
    Compressed = 1,
    Singleton = 2,
}

impl From<ModeType> for ModeTypeTag {
    fn from(mode_type: ModeType) -> Self {
        match mode_type {
            ModeType::Dense => ModeTypeTag::Dense,
            ModeType::Compressed => ModeTypeTag::Compressed,
            ModeType::Singleton => ModeTypeTag::Singleton,
        }
    }
}

/// Stable numeric encoding of [`DataType`]
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataTypeTag {
    Int32 = 0,
    Int64 = 1,
    Float32 = 2,
    Float64 = 3,
    Complex32 = 4,
    Complex64 = 5,
}

impl From<DataType> for DataTypeTag {
    fn from(dtype: DataType) -> Self {
        match dtype {
            DataType::Int32 => DataTypeTag::Int32,
            DataType::Int64 => DataTypeTag::Int64,
            DataType::Float32 => DataTypeTag::Float32,
            DataType::Float64 => DataTypeTag::Float64,
            DataType::Complex32 => DataTypeTag::Complex32,
            DataType::Complex64 => DataTypeTag::Complex64,
        }
    }
}

/// Flat tensor view read by compiled kernels
///
/// `indices[level][i]` points to index array `i` of `level` (dense levels
/// expose their one-element extent array). `vals` points to `vals_size`
/// components of `csize` bytes each.
#[repr(C)]
#[derive(Debug)]
pub struct TensorDescriptor {
    pub order: i32,
    pub dimensions: *const i32,
    pub csize: i32,
    pub mode_ordering: *const i32,
    pub mode_types: *const ModeTypeTag,
    pub indices: *const *const *mut u8,
    pub vals: *mut u8,
    pub vals_size: i32,
    pub data_type: DataTypeTag,
}

/// Owner of a [`TensorDescriptor`] and the arrays it points into
#[derive(Debug)]
pub struct KernelDescriptor<'s> {
    dimensions: Vec<i32>,
    mode_ordering: Vec<i32>,
    mode_types: Vec<ModeTypeTag>,
    level_arrays: Vec<Vec<*mut u8>>,
    levels: Vec<*const *mut u8>,
    raw: TensorDescriptor,
    _storage: PhantomData<&'s mut ()>,
}

fn to_i32(n: usize) -> FibraResult<i32> {
    i32::try_from(n).map_err(|_| FibraError::IndexOverflow { count: n })
}

impl<'s> KernelDescriptor<'s> {
    /// Describes `storage`, laid out by `format`, of a tensor with
    /// `dimensions`.
    ///
    /// # Errors
    ///
    /// - [`FibraError::InvalidFormat`] if the format, index and dimensions
    ///   disagree on the order
    /// - [`FibraError::IndexOverflow`] if a size does not fit an `i32`
    pub fn new(storage: &'s mut Storage<'_>, format: &Format, dimensions: &[usize]) -> FibraResult<Self> {
        let order = format.order();
        if storage.index().order() != order || dimensions.len() != order {
            return Err(FibraError::invalid_format(format!(
                "format order {}, index order {} and {} dimensions disagree",
                order,
                storage.index().order(),
                dimensions.len()
            )));
        }

        let dimensions = dimensions.iter().map(|&d| to_i32(d)).collect::<FibraResult<Vec<_>>>()?;
        let mode_ordering = format
            .mode_ordering()
            .iter()
            .map(|&m| to_i32(m))
            .collect::<FibraResult<Vec<_>>>()?;
        let mode_types: Vec<ModeTypeTag> = format.mode_types().iter().map(|&mt| mt.into()).collect();

        let dtype = storage.data_type();
        let vals_size = to_i32(storage.values().len())?;
        let mut level_arrays: Vec<Vec<*mut u8>> = Vec::with_capacity(order);
        for mode in storage.index_mut().mode_indices_mut() {
            let mut arrays = Vec::with_capacity(mode.num_index_arrays());
            for i in 0..mode.num_index_arrays() {
                arrays.push(mode.index_array_mut(i)?.as_mut_ptr().cast::<u8>());
            }
            level_arrays.push(arrays);
        }
        let levels: Vec<*const *mut u8> = level_arrays.iter().map(|a| a.as_ptr()).collect();

        let raw = TensorDescriptor {
            order: to_i32(order)?,
            dimensions: dimensions.as_ptr(),
            csize: to_i32(dtype.size_of())?,
            mode_ordering: mode_ordering.as_ptr(),
            mode_types: mode_types.as_ptr(),
            indices: if levels.is_empty() { ptr::null() } else { levels.as_ptr() },
            vals: storage.values_mut().as_mut_ptr(),
            vals_size,
            data_type: dtype.into(),
        };

        Ok(Self {
            dimensions,
            mode_ordering,
            mode_types,
            level_arrays,
            levels,
            raw,
            _storage: PhantomData,
        })
    }

    /// The C view
    #[inline]
    pub fn descriptor(&self) -> &TensorDescriptor {
        &self.raw
    }

    /// Pointer handed to kernels
    #[inline]
    pub fn as_ptr(&self) -> *const TensorDescriptor {
        &self.raw
    }

    #[inline]
    pub fn dimensions(&self) -> &[i32] {
        &self.dimensions
    }

    #[inline]
    pub fn mode_ordering(&self) -> &[i32] {
        &self.mode_ordering
    }

    #[inline]
    pub fn mode_types(&self) -> &[ModeTypeTag] {
        &self.mode_types
    }

    /// Number of index arrays exposed at `level`
    pub fn num_index_arrays(&self, level: usize) -> usize {
        self.level_arrays.get(level).map_or(0, Vec::len)
    }
}
