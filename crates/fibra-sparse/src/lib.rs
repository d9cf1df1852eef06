//! # fibra-sparse
//!
//! Format-generic tensor storage for fibra.
//!
//! This crate provides:
//! - Per-level index structures ([`ModeIndex`], [`TensorIndex`]) and
//!   [`Storage`] over engine-owned or caller-owned arrays
//! - The coordinate buffer and the packer that compiles unordered inserts
//!   into any mix of dense and compressed levels
//! - The traversal engine enumerating stored entries in storage order
//! - The [`Tensor`] handle tying it together
//! - CSR/CSC factories with zero-copy import and export
//! - A C-compatible [`KernelDescriptor`] for compiled kernels
//!
//! ## Quick Start
//!
//! ```
//! use fibra_core::{DataType, Format};
//! use fibra_sparse::{csr_arrays, Tensor};
//!
//! let a = Tensor::new("A", DataType::Float64, &[3, 3], Format::csr())?;
//! a.insert(&[0, 0], 1.0f64)?;
//! a.insert(&[0, 2], 2.0f64)?;
//! a.insert(&[2, 1], 3.0f64)?;
//! a.pack()?;
//!
//! let csr = csr_arrays::<f64>(&a)?;
//! assert_eq!(csr.ptr(), &[0, 2, 2, 3]);
//! assert_eq!(csr.idx(), &[0, 2, 1]);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Features
//!
//! - `serde`: serialization of [`TensorOptions`] and [`DuplicatePolicy`]

pub mod buffer;
pub mod config;
pub mod csr;
pub mod descriptor;
pub mod index;
pub mod pack;
pub mod storage;
pub mod tensor;
pub mod traverse;

// Re-exports
pub use buffer::CoordinateBuffer;
pub use config::{DuplicatePolicy, TensorOptions};
pub use csr::{
    csc_arrays, csr_arrays, make_csc, make_csc_borrowed, make_csr, make_csr_borrowed, SegmentArrays,
};
pub use descriptor::{DataTypeTag, KernelDescriptor, ModeTypeTag, TensorDescriptor};
pub use index::{make_csc_index, make_csr_index, ModeIndex, TensorIndex};
pub use pack::Packer;
pub use storage::Storage;
pub use tensor::{unique_name, Tensor, TensorIter, TypedTensorIter};
pub use traverse::{Traversal, TypedTraversal};
