//! # fibra-core
//!
//! Core element types, typed arrays, storage formats and errors for fibra.
//!
//! This crate provides the type-erased building blocks the storage engine in
//! `fibra-sparse` is written against:
//!
//! - **Component types** ([`DataType`]) and the typed value cell ([`Value`],
//!   [`Element`]) that lets one engine serve every numeric kind
//! - **Typed arrays** ([`IndexArray`], [`ValueArray`]) tagged with
//!   [`Ownership`] for zero-copy interop with caller buffers
//! - **Formats** ([`Format`], [`ModeType`]): per-level storage discipline and
//!   level ordering
//! - **Errors** ([`FibraError`])
//!
//! ## Quick Start
//!
//! ```
//! use fibra_core::{DataType, Element, Format, ModeType, Value};
//!
//! let format = Format::new(
//!     vec![ModeType::Dense, ModeType::Compressed],
//!     vec![0, 1],
//! ).unwrap();
//! assert_eq!(format, Format::csr());
//!
//! let v = 3i32.into_value();
//! assert_eq!(v.data_type(), DataType::Int32);
//! assert_eq!(v.checked_add(Value::Int32(4)).unwrap(), Value::Int32(7));
//! ```
//!
//! ## Features
//!
//! - `serde`: serialization support for [`DataType`], [`ModeType`], [`Format`]

pub mod array;
pub mod error;
pub mod format;
pub mod types;
pub mod value;

pub use array::{Buffer, IndexArray, Ownership, ValueArray};
pub use error::{FibraError, FibraResult};
pub use format::{Format, ModeType};
pub use types::{Complex32, Complex64, DataType, Shape};
pub use value::{Element, Value};
