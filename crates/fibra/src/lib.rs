//! # fibra
//!
//! **Format-generic tensor storage.** Tensors whose modes are each stored
//! dense or compressed, in any level order, built from unordered inserts and
//! enumerated in storage order.
//!
//! This is the **meta crate** that re-exports the fibra components for
//! convenient access.
//!
//! ## Quick Start
//!
//! ```
//! use fibra::prelude::*;
//!
//! let a = Tensor::new("A", DataType::Float64, &[3, 3], Format::csr())?;
//! a.insert(&[2, 1], 3.0f64)?;
//! a.insert(&[0, 0], 1.0f64)?;
//! a.pack()?;
//!
//! for (coordinate, value) in a.iter()? {
//!     println!("{coordinate:?} = {value}");
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Components
//!
//! ### Core types ([`core`])
//!
//! Component types, the typed value cell, typed arrays with ownership tags,
//! formats and errors.
//!
//! ### Storage engine ([`sparse`])
//!
//! Index structures, packing, traversal, the tensor handle, CSR/CSC interop
//! and kernel descriptors.
//!
//! ```
//! use fibra::sparse::make_csr;
//!
//! let a = make_csr("A", &[2, 2], vec![0, 1, 2], vec![1, 0], vec![5i32, 6])?;
//! assert_eq!(a.iter()?.count(), 2);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Features
//!
//! - `tracing`: install a `tracing-subscriber` through
//!   [`tracing_support::init_tracing`]
//! - `serde`: serialization of formats, data types and options

pub use fibra_core as core;
pub use fibra_sparse as sparse;

pub mod tracing_support;

pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! # Example
    //!
    //! ```
    //! use fibra::prelude::*;
    //!
    //! let t = Tensor::with_mode_type("B", DataType::Int32, &[4, 4], ModeType::Dense).unwrap();
    //! assert_eq!(t.format(), Format::dense(2));
    //! ```

    // Core types
    pub use crate::core::{DataType, Element, FibraError, FibraResult, Format, ModeType, Value};

    // Storage engine
    pub use crate::sparse::{
        csc_arrays, csr_arrays, make_csc, make_csr, DuplicatePolicy, Storage, Tensor, TensorOptions,
        Traversal,
    };
}
